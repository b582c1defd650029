//! Core data types for particle snapshots and inbound sensor frames.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One particle of the simulation snapshot.
///
/// Coordinates are normalized to `[0, 1]` with `y` pointing up. Pixel space
/// flips the vertical axis, see [`Particle::to_pixel`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub vx: f32,
    #[serde(default)]
    pub vy: f32,
    /// Rendered diameter in pixels
    #[serde(default = "default_particle_size")]
    pub size: f32,
}

fn default_particle_size() -> f32 {
    8.0
}

impl Particle {
    pub fn new(x: f32, y: f32, vx: f32, vy: f32, size: f32) -> Self {
        Self { x, y, vx, vy, size }
    }

    /// Position in screen pixels (`px = x·W`, `py = (1−y)·H`)
    #[inline]
    pub fn to_pixel(&self, width: f32, height: f32) -> (f32, f32) {
        (self.x * width, (1.0 - self.y) * height)
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vx.hypot(self.vy)
    }
}

/// Relative pointer movement reported by the hardware (4-byte frame)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseDelta {
    pub dx: i16,
    pub dy: i16,
}

impl MouseDelta {
    pub const WIRE_SIZE: usize = 4;

    /// Decode two little-endian i16 values
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::WIRE_SIZE {
            return None;
        }
        Some(Self {
            dx: i16::from_le_bytes([bytes[0], bytes[1]]),
            dy: i16::from_le_bytes([bytes[2], bytes[3]]),
        })
    }
}

/// Raw 13-byte EMU frame as received from the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmuFrame(pub [u8; EmuFrame::WIRE_SIZE]);

impl EmuFrame {
    pub const WIRE_SIZE: usize = 13;

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; Self::WIRE_SIZE] = bytes.try_into().ok()?;
        Some(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decode the accelerometer triple carried in the first 12 bytes
    pub fn reading(&self) -> EmuReading {
        let axis = |i: usize| {
            f32::from_le_bytes([self.0[i], self.0[i + 1], self.0[i + 2], self.0[i + 3]])
        };
        EmuReading {
            x: axis(0),
            y: axis(4),
            z: axis(8),
            spare: self.0[12],
        }
    }
}

/// Decoded EMU accelerometer reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmuReading {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Trailing byte, passed through undecoded
    pub spare: u8,
}

impl EmuReading {
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        EmuFrame::from_bytes(bytes).map(|frame| frame.reading())
    }
}

/// Transport carrying the outbound stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Message-oriented socket link
    #[default]
    #[serde(alias = "network")]
    Socket,
    /// Byte-stream serial link
    Serial,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Socket => write!(f, "network"),
            ChannelKind::Serial => write!(f, "serial"),
        }
    }
}

impl FromStr for ChannelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "network" | "socket" => Ok(ChannelKind::Socket),
            "serial" => Ok(ChannelKind::Serial),
            other => Err(Error::InvalidChannel(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pixel_mapping_flips_y() {
        let p = Particle::new(0.25, 0.75, 0.0, 0.0, 4.0);
        let (px, py) = p.to_pixel(240.0, 200.0);
        assert_relative_eq!(px, 60.0);
        assert_relative_eq!(py, 50.0);
    }

    #[test]
    fn test_mouse_delta_decode() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(-3i16).to_le_bytes());
        bytes.extend_from_slice(&512i16.to_le_bytes());
        let delta = MouseDelta::from_bytes(&bytes).unwrap();
        assert_eq!(delta, MouseDelta { dx: -3, dy: 512 });
        assert!(MouseDelta::from_bytes(&bytes[..3]).is_none());
    }

    #[test]
    fn test_emu_reading_decode() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0.5f32.to_le_bytes());
        bytes.extend_from_slice(&(-1.25f32).to_le_bytes());
        bytes.extend_from_slice(&9.81f32.to_le_bytes());
        bytes.push(7);

        let reading = EmuReading::from_bytes(&bytes).unwrap();
        assert_relative_eq!(reading.x, 0.5);
        assert_relative_eq!(reading.y, -1.25);
        assert_relative_eq!(reading.z, 9.81);
        assert_eq!(reading.spare, 7);

        assert!(EmuReading::from_bytes(&bytes[..12]).is_none());
    }

    #[test]
    fn test_channel_kind_parse() {
        assert_eq!("network".parse::<ChannelKind>().unwrap(), ChannelKind::Socket);
        assert_eq!("serial".parse::<ChannelKind>().unwrap(), ChannelKind::Serial);
        assert!(matches!(
            "bluetooth".parse::<ChannelKind>(),
            Err(Error::InvalidChannel(_))
        ));
    }

    #[test]
    fn test_particle_json_defaults() {
        let p: Particle = serde_json::from_str(r#"{"x":0.1,"y":0.2}"#).unwrap();
        assert_eq!(p.vx, 0.0);
        assert_eq!(p.size, 8.0);
    }
}
