//! Serial port transport and backend

use super::serial::{SerialBackend, SerialLink};
use super::Transport;
use crate::error::Result;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::time::Duration;

/// Serial transport for UART communication
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open a serial port, 8N1 without flow control
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyACM0")
    /// * `baud_rate` - Baud rate (250000 for the display controller)
    /// * `timeout` - Blocking read timeout
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()?;

        log::info!("Opened serial port: {} at {} baud", path, baud_rate);
        Ok(SerialTransport { port })
    }

    /// Second handle to the same port, used by the reader thread
    pub fn try_clone(&self) -> Result<Self> {
        Ok(SerialTransport {
            port: self.port.try_clone()?,
        })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.port.write(data)?)
    }

    fn flush(&mut self) -> Result<()> {
        self.port.flush()?;
        Ok(())
    }

    fn available(&mut self) -> Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }
}

/// Backend opening real ports through `serialport`
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeSerialBackend;

impl SerialBackend for NativeSerialBackend {
    fn open(&self, path: &str, baud_rate: u32, read_timeout: Duration) -> Result<SerialLink> {
        let writer = SerialTransport::open(path, baud_rate, read_timeout)?;
        let reader = writer.try_clone()?;
        Ok(SerialLink {
            reader: Box::new(reader),
            writer: Box::new(writer),
        })
    }

    fn list_ports(&self) -> Result<Vec<String>> {
        Ok(serialport::available_ports()?
            .into_iter()
            .map(|info| info.port_name)
            .collect())
    }
}
