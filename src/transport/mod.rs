//! Hardware links
//!
//! ```text
//!                      ┌──────────────────────┐
//!  send_data ────────► │   TransportManager   │ ◄──── poll() once per frame
//!  send_command        └──────┬────────┬──────┘
//!                             │        │  exactly one active
//!                ┌────────────▼──┐  ┌──▼────────────┐
//!                │ SocketChannel │  │ SerialChannel │
//!                └──┬─────────▲──┘  └──┬─────────▲──┘
//!      connect/reader threads │        │  reader / prompt threads
//!                   ▼  events ┘        ▼  events ┘
//!                 TCP link            serial port
//! ```
//!
//! Blocking I/O runs on helper threads that report back over crossbeam
//! channels. All state changes and subscriber callbacks happen inside
//! `poll()` on the caller's thread. Each opened link carries a generation
//! number so events from a link that was already torn down are dropped.

use crate::error::{Error, Result};

pub mod command;
pub mod manager;
pub mod mock;
pub mod observer;
mod port;
pub mod serial;
pub mod socket;

pub use command::{Command, CommandDebouncer, CommandSpec};
pub use manager::TransportManager;
pub use observer::{HandlerResult, Subscribers, SubscriptionId};
pub use port::{NativeSerialBackend, SerialTransport};
pub use serial::{PortInfo, PortPrompt, SerialBackend, SerialChannel, SerialLink, SerialStatus};
pub use socket::{ChannelEvent, SocketChannel, SocketConnector, SocketLink, TcpConnector};

/// Byte stream used by the serial channel
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read (0 on timeout)
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write data from buffer, returns number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any pending writes (blocking until complete)
    fn flush(&mut self) -> Result<()>;

    /// Write the whole buffer and flush
    fn write_all(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            match self.write(data)? {
                0 => {
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::WriteZero,
                        "transport accepted no bytes",
                    )))
                }
                n => data = &data[n..],
            }
        }
        self.flush()
    }

    /// Check if data is available to read
    fn available(&mut self) -> Result<usize> {
        Ok(0)
    }
}
