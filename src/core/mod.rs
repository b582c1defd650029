//! Core data types shared by the field engine and the transports.
//!
//! - [`types::Particle`]: one particle of the external simulation snapshot
//! - [`types::MouseDelta`] / [`types::EmuReading`]: decoded inbound sensor frames
//! - [`types::ChannelKind`]: which transport carries the stream

pub mod types;
