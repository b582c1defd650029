//! Socket link message framing
//!
//! The socket link carries discrete messages over a TCP stream. Each message
//! is a kind byte followed by a length-prefixed payload:
//!
//! ```text
//! ┌────────────┬──────────────────┬──────────────────────────┐
//! │ Kind (1)   │ Length (4 bytes) │ Payload (variable)       │
//! │ 0x01 / 02  │ Big-endian u32   │ binary frame or UTF-8    │
//! └────────────┴──────────────────┴──────────────────────────┘
//! ```
//!
//! - **Binary (0x01)**: display frames and commands outbound, mouse/EMU
//!   frames inbound
//! - **Text (0x02)**: JSON status messages inbound
//! - **Maximum message size**: 1MB; larger lengths close the connection
//!
//! A clean EOF on a message boundary ends the stream. EOF inside a message
//! is an error.

use crate::error::{Error, Result};
use std::io::{ErrorKind, Read, Write};

/// Maximum accepted payload length
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

const KIND_BINARY: u8 = 0x01;
const KIND_TEXT: u8 = 0x02;

/// One message on the socket link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketMessage {
    Binary(Vec<u8>),
    Text(String),
}

impl SocketMessage {
    fn kind(&self) -> u8 {
        match self {
            SocketMessage::Binary(_) => KIND_BINARY,
            SocketMessage::Text(_) => KIND_TEXT,
        }
    }

    fn payload(&self) -> &[u8] {
        match self {
            SocketMessage::Binary(bytes) => bytes,
            SocketMessage::Text(text) => text.as_bytes(),
        }
    }
}

/// Write one message and flush
pub fn write_message<W: Write>(writer: &mut W, message: &SocketMessage) -> Result<()> {
    let payload = message.payload();
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(Error::Protocol(format!(
            "message too large: {} bytes",
            payload.len()
        )));
    }

    let mut header = [0u8; 5];
    header[0] = message.kind();
    header[1..].copy_from_slice(&(payload.len() as u32).to_be_bytes());
    writer.write_all(&header)?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one message.
///
/// Returns `Ok(None)` when the peer closed the stream between messages.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Option<SocketMessage>> {
    let mut kind = [0u8; 1];
    match reader.read_exact(&mut kind) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(Error::Protocol(format!("message too large: {} bytes", len)));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;

    match kind[0] {
        KIND_BINARY => Ok(Some(SocketMessage::Binary(payload))),
        KIND_TEXT => String::from_utf8(payload)
            .map(|text| Some(SocketMessage::Text(text)))
            .map_err(|e| Error::Protocol(format!("text message is not UTF-8: {}", e))),
        other => Err(Error::Protocol(format!("unknown message kind 0x{:02X}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_binary_message_layout() {
        let mut buf = Vec::new();
        write_message(&mut buf, &SocketMessage::Binary(vec![7, 50])).unwrap();
        assert_eq!(buf, vec![0x01, 0, 0, 0, 2, 7, 50]);
    }

    #[test]
    fn test_read_sequence_then_eof() {
        let mut buf = Vec::new();
        write_message(&mut buf, &SocketMessage::Text("{\"ok\":true}".into())).unwrap();
        write_message(&mut buf, &SocketMessage::Binary(vec![1, 2, 3, 4])).unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(
            read_message(&mut cursor).unwrap(),
            Some(SocketMessage::Text("{\"ok\":true}".into()))
        );
        assert_eq!(
            read_message(&mut cursor).unwrap(),
            Some(SocketMessage::Binary(vec![1, 2, 3, 4]))
        );
        assert_eq!(read_message(&mut cursor).unwrap(), None);
    }

    #[test]
    fn test_truncated_message_is_error() {
        let mut cursor = Cursor::new(vec![0x01, 0, 0, 0, 9, 1, 2]);
        assert!(read_message(&mut cursor).is_err());
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut bytes = vec![0x01];
        bytes.extend_from_slice(&((MAX_MESSAGE_SIZE as u32) + 1).to_be_bytes());
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(read_message(&mut cursor), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut cursor = Cursor::new(vec![0x09, 0, 0, 0, 0]);
        assert!(matches!(read_message(&mut cursor), Err(Error::Protocol(_))));
    }
}
