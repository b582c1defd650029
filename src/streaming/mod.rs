//! Outbound frame layout and socket message framing
//!
//! - [`frame`]: display frame header, legacy frames and payload normalization
//! - [`wire`]: kind-tagged, length-prefixed messages on the socket link

pub mod frame;
pub mod wire;

pub use frame::{
    build_frame, normalize_payload, parse_frame, FrameFormat, FrameHeader, GridMetadata,
    MAX_FRAME_LEN,
};
pub use wire::{read_message, write_message, SocketMessage};
