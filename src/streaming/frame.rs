//! Outbound display frame
//!
//! # Layout (little-endian)
//!
//! ```text
//! offset  size  field
//! ──────  ────  ─────────────────────────────────────
//!  0      2     total length (2 + 19 + payload)
//!  2      1     round rect (1 = circular screen)
//!  3      2     screen width
//!  5      2     screen height
//!  7      2     cell count
//!  9      1     grid gap           (clamped to u8)
//! 10      4     cell aspect ratio  (f32)
//! 14      1     allow cut
//! 15      1     cols               (clamped to u8)
//! 16      1     rows               (clamped to u8)
//! 17      1     cell pixel width   (clamped to u8)
//! 18      1     cell pixel height  (clamped to u8)
//! 19      1     theme
//! 20      1     brightness         (0..=100)
//! 21      n     payload, one byte per cell (0..=100)
//! ```
//!
//! The legacy format drops the header entirely: `[0][payload…]`.

use crate::error::{Error, Result};
use crate::grid::{GridLayout, GridSpec};
use serde::{Deserialize, Serialize};

/// Size of the u16 length prefix
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Header size after the length prefix
pub const HEADER_SIZE: usize = 19;

/// Largest frame the u16 length prefix can describe
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

/// First byte of a legacy frame
pub const LEGACY_IDENTIFIER: u8 = 0;

/// Which frame layout is sent to the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    /// Length prefix, header and payload
    #[default]
    Full,
    /// Identifier byte followed by the payload
    Legacy,
}

/// Grid description carried in every full frame header
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetadata {
    pub round_rect: bool,
    pub screen_width: u16,
    pub screen_height: u16,
    pub cell_count: u16,
    pub gap: u32,
    pub aspect_ratio: f32,
    pub allow_cut: u8,
    pub cols: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl GridMetadata {
    /// Metadata for a generated layout
    pub fn from_layout(spec: &GridSpec, layout: &GridLayout) -> Self {
        Self {
            round_rect: spec.screen.is_round(),
            screen_width: saturate_u16(spec.screen.width as usize),
            screen_height: saturate_u16(spec.screen.height as usize),
            cell_count: saturate_u16(layout.cell_count()),
            gap: spec.gap,
            aspect_ratio: spec.aspect_ratio,
            allow_cut: spec.allow_cut,
            cols: layout.cols,
            rows: layout.rows,
            cell_width: layout.cell_w,
            cell_height: layout.cell_h,
        }
    }
}

/// Full frame header
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameHeader {
    pub grid: GridMetadata,
    pub theme: u8,
    /// Clamped to 100 on encode
    pub brightness: u8,
}

impl FrameHeader {
    pub fn new(grid: GridMetadata, theme: u8, brightness: u8) -> Self {
        Self {
            grid,
            theme,
            brightness,
        }
    }

    /// Append the 19 header bytes
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let g = &self.grid;
        buf.push(g.round_rect as u8);
        buf.extend_from_slice(&g.screen_width.to_le_bytes());
        buf.extend_from_slice(&g.screen_height.to_le_bytes());
        buf.extend_from_slice(&g.cell_count.to_le_bytes());
        buf.push(saturate_u8(g.gap));
        buf.extend_from_slice(&g.aspect_ratio.to_le_bytes());
        buf.push(g.allow_cut);
        buf.push(saturate_u8(g.cols));
        buf.push(saturate_u8(g.rows));
        buf.push(saturate_u8(g.cell_width));
        buf.push(saturate_u8(g.cell_height));
        buf.push(self.theme);
        buf.push(self.brightness.min(100));
    }

    /// Decode the 19 header bytes that follow the length prefix
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::Protocol(format!(
                "header needs {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }
        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let grid = GridMetadata {
            round_rect: bytes[0] != 0,
            screen_width: u16_at(1),
            screen_height: u16_at(3),
            cell_count: u16_at(5),
            gap: bytes[7] as u32,
            aspect_ratio: f32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            allow_cut: bytes[12],
            cols: bytes[13] as u32,
            rows: bytes[14] as u32,
            cell_width: bytes[15] as u32,
            cell_height: bytes[16] as u32,
        };
        Ok(Self {
            grid,
            theme: bytes[17],
            brightness: bytes[18],
        })
    }
}

/// Build an outbound frame.
///
/// Fails with [`Error::FrameTooLarge`] when a full frame would not fit the
/// u16 length prefix; nothing is produced in that case.
pub fn build_frame(format: FrameFormat, header: &FrameHeader, payload: &[u8]) -> Result<Vec<u8>> {
    match format {
        FrameFormat::Full => {
            let len = LENGTH_PREFIX_SIZE + HEADER_SIZE + payload.len();
            if len > MAX_FRAME_LEN {
                return Err(Error::FrameTooLarge { len });
            }
            let mut buf = Vec::with_capacity(len);
            buf.extend_from_slice(&(len as u16).to_le_bytes());
            header.encode_into(&mut buf);
            buf.extend_from_slice(payload);
            Ok(buf)
        }
        FrameFormat::Legacy => {
            let len = 1 + payload.len();
            if len > MAX_FRAME_LEN {
                return Err(Error::FrameTooLarge { len });
            }
            let mut buf = Vec::with_capacity(len);
            buf.push(LEGACY_IDENTIFIER);
            buf.extend_from_slice(payload);
            Ok(buf)
        }
    }
}

/// Split a full frame into header and payload, checking the length prefix
pub fn parse_frame(bytes: &[u8]) -> Result<(FrameHeader, &[u8])> {
    if bytes.len() < LENGTH_PREFIX_SIZE + HEADER_SIZE {
        return Err(Error::Protocol(format!("frame too short: {} bytes", bytes.len())));
    }
    let declared = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
    if declared != bytes.len() {
        return Err(Error::Protocol(format!(
            "length prefix {} does not match frame size {}",
            declared,
            bytes.len()
        )));
    }
    let header = FrameHeader::decode(&bytes[LENGTH_PREFIX_SIZE..])?;
    Ok((header, &bytes[LENGTH_PREFIX_SIZE + HEADER_SIZE..]))
}

/// Map field values to payload bytes: `round(clamp(v / max, 0, 1) · 100)`
pub fn normalize_payload(values: &[f32], max_value: f32) -> Vec<u8> {
    if max_value.is_nan() || max_value <= 0.0 {
        return vec![0; values.len()];
    }
    values
        .iter()
        .map(|&v| {
            let ratio = v / max_value;
            if ratio.is_nan() {
                0
            } else {
                (ratio.clamp(0.0, 1.0) * 100.0).round() as u8
            }
        })
        .collect()
}

fn saturate_u8(value: u32) -> u8 {
    value.min(u8::MAX as u32) as u8
}

fn saturate_u16(value: usize) -> u16 {
    value.min(u16::MAX as usize) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn metadata() -> GridMetadata {
        GridMetadata {
            round_rect: true,
            screen_width: 240,
            screen_height: 240,
            cell_count: 341,
            gap: 1,
            aspect_ratio: 1.0,
            allow_cut: 1,
            cols: 23,
            rows: 23,
            cell_width: 9,
            cell_height: 9,
        }
    }

    #[test]
    fn test_header_size() {
        let mut buf = Vec::new();
        FrameHeader::new(metadata(), 3, 80).encode_into(&mut buf);
        assert_eq!(buf.len(), HEADER_SIZE);
    }

    #[test]
    fn test_full_frame_layout() {
        let header = FrameHeader::new(metadata(), 4, 55);
        let frame = build_frame(FrameFormat::Full, &header, &[10, 20, 30]).unwrap();

        assert_eq!(frame.len(), 2 + 19 + 3);
        assert_eq!(u16::from_le_bytes([frame[0], frame[1]]), 24);
        assert_eq!(frame[2], 1);
        assert_eq!(u16::from_le_bytes([frame[7], frame[8]]), 341);
        assert_eq!(frame[19], 4);
        assert_eq!(frame[20], 55);
        assert_eq!(&frame[21..], &[10, 20, 30]);
    }

    #[test]
    fn test_header_clamps_wide_fields() {
        let mut grid = metadata();
        grid.gap = 300;
        grid.cols = 1000;
        grid.cell_height = 256;
        let header = FrameHeader::new(grid, 0, 150);
        let frame = build_frame(FrameFormat::Full, &header, &[]).unwrap();

        let (decoded, payload) = parse_frame(&frame).unwrap();
        assert!(payload.is_empty());
        assert_eq!(decoded.grid.gap, 255);
        assert_eq!(decoded.grid.cols, 255);
        assert_eq!(decoded.grid.cell_height, 255);
        assert_eq!(decoded.brightness, 100);
        assert_eq!(decoded.grid.rows, 23);
        assert_relative_eq!(decoded.grid.aspect_ratio, 1.0);
        assert_eq!(decoded.grid.screen_width, 240);
    }

    #[test]
    fn test_legacy_frame() {
        let header = FrameHeader::new(metadata(), 0, 0);
        let frame = build_frame(FrameFormat::Legacy, &header, &[7, 8]).unwrap();
        assert_eq!(frame, vec![LEGACY_IDENTIFIER, 7, 8]);
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let header = FrameHeader::new(metadata(), 0, 0);
        let payload = vec![0u8; MAX_FRAME_LEN - LENGTH_PREFIX_SIZE - HEADER_SIZE + 1];
        match build_frame(FrameFormat::Full, &header, &payload) {
            Err(Error::FrameTooLarge { len }) => assert_eq!(len, MAX_FRAME_LEN + 1),
            other => panic!("expected FrameTooLarge, got {:?}", other.map(|f| f.len())),
        }

        // Exactly at the limit still fits
        let payload = vec![0u8; MAX_FRAME_LEN - LENGTH_PREFIX_SIZE - HEADER_SIZE];
        assert_eq!(
            build_frame(FrameFormat::Full, &header, &payload).unwrap().len(),
            MAX_FRAME_LEN
        );
    }

    #[test]
    fn test_parse_rejects_bad_length() {
        let header = FrameHeader::new(metadata(), 0, 0);
        let mut frame = build_frame(FrameFormat::Full, &header, &[1, 2]).unwrap();
        frame.push(3);
        assert!(matches!(parse_frame(&frame), Err(Error::Protocol(_))));
        assert!(parse_frame(&frame[..5]).is_err());
    }

    #[test]
    fn test_normalize_payload() {
        let bytes = normalize_payload(&[0.0, 1.05, 2.1, 5.0, -1.0, f32::NAN], 2.1);
        assert_eq!(bytes, vec![0, 50, 100, 100, 0, 0]);
        assert_eq!(normalize_payload(&[1.0, 2.0], 0.0), vec![0, 0]);
    }
}
