//! TarangIO - Particle field streaming for LED display hardware
//!
//! This library turns a 2D particle simulation into a per-cell scalar field
//! and streams it to display hardware over a socket or serial link.
//!
//! ## Pipeline
//!
//! ```text
//! particles ──► FieldAggregator ──► normalize_payload ──► TransportManager ──► hardware
//!                    ▲                                          │
//!                 CellMap ◄── CellGridBuilder               inbound mouse/EMU
//! ```
//!
//! ## Modules
//!
//! - [`grid`]: tiles the display surface into classified cells
//! - [`field`]: per-cell aggregation modes with temporal smoothing
//! - [`streaming`]: outbound frame layout and socket message framing
//! - [`transport`]: socket and serial channels behind one manager

pub mod config;
pub mod core;
pub mod error;
pub mod field;
pub mod grid;
pub mod streaming;
pub mod transport;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
