//! Transport manager
//!
//! Owns both channels, keeps exactly one of them active and turns field
//! payloads into display frames for it.
//!
//! The manager is constructed once by the application root and passed
//! around by reference. It is driven from a single thread: call `poll()`
//! once per frame so queued link events, reconnect timers and command
//! resends are applied.

use super::command::Command;
use super::observer::{HandlerResult, SubscriptionId};
use super::serial::{PortInfo, SerialChannel, SerialStatus};
use super::socket::{ChannelEvent, SocketChannel};
use crate::config::TransportConfig;
use crate::core::types::{ChannelKind, EmuFrame, MouseDelta};
use crate::error::{Error, Result};
use crate::streaming::{build_frame, FrameFormat, FrameHeader, GridMetadata};

/// Routes frames and commands to the active channel
pub struct TransportManager {
    socket: SocketChannel,
    serial: SerialChannel,
    active: ChannelKind,
    streaming: bool,
    grid: Option<GridMetadata>,
    brightness: u8,
    frame_format: FrameFormat,
    frames_sent: u64,
}

impl TransportManager {
    /// Create the manager with `config.channel` marked active.
    ///
    /// Nothing connects until [`set_active_channel`](Self::set_active_channel)
    /// or a channel's own `connect` is called.
    pub fn new(socket: SocketChannel, serial: SerialChannel, config: &TransportConfig) -> Self {
        Self {
            socket,
            serial,
            active: config.channel,
            streaming: config.send_data,
            grid: None,
            brightness: config.brightness.min(100),
            frame_format: config.frame_format,
            frames_sent: 0,
        }
    }

    pub fn active_channel(&self) -> ChannelKind {
        self.active
    }

    /// Switch the active channel.
    ///
    /// Selecting the current channel only re-requests the socket connection
    /// when it is down. A real switch disconnects the outgoing channel first.
    /// Serial connections stay user-driven.
    pub fn set_active_channel(&mut self, channel: ChannelKind) {
        if channel == self.active {
            if channel == ChannelKind::Socket && !self.socket.is_connected() {
                self.socket.connect();
            }
            return;
        }

        log::info!("Transport: switching {} -> {}", self.active, channel);
        match self.active {
            ChannelKind::Socket => self.socket.disconnect(),
            ChannelKind::Serial => self.serial.disconnect(),
        }
        self.active = channel;
        if channel == ChannelKind::Socket {
            self.socket.connect();
        }
    }

    /// Apply a named control: `network`, `serial`, `sendData` or `stopData`
    pub fn apply_control(&mut self, control: &str) -> bool {
        match control {
            "sendData" => self.set_streaming(true),
            "stopData" => self.set_streaming(false),
            "network" => self.set_active_channel(ChannelKind::Socket),
            "serial" => self.set_active_channel(ChannelKind::Serial),
            _ => {
                log::error!(
                    "Transport: {}",
                    Error::InvalidChannel(format!("unknown control: {}", control))
                );
                return false;
            }
        }
        true
    }

    pub fn set_streaming(&mut self, enabled: bool) {
        if self.streaming != enabled {
            log::info!("Transport: streaming {}", if enabled { "on" } else { "off" });
        }
        self.streaming = enabled;
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Grid description used for frame headers
    pub fn set_grid_metadata(&mut self, grid: GridMetadata) {
        self.grid = Some(grid);
    }

    pub fn grid_metadata(&self) -> Option<&GridMetadata> {
        self.grid.as_ref()
    }

    /// Header brightness, clamped to 0..=100
    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness.min(100);
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn set_frame_format(&mut self, format: FrameFormat) {
        self.frame_format = format;
    }

    pub fn frame_format(&self) -> FrameFormat {
        self.frame_format
    }

    /// Frames handed to a channel since creation
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Frame the cell payload and send it on the active channel.
    ///
    /// Returns `false` without writing when streaming is off, the channel is
    /// down (a down socket is asked to connect), no grid is known or the
    /// frame would not fit its length prefix.
    pub fn send_data(&mut self, cell_bytes: &[u8], theme: u8) -> bool {
        if !self.streaming {
            return false;
        }
        if !self.is_connected() {
            if self.active == ChannelKind::Socket {
                self.socket.connect();
            }
            log::trace!("Transport: frame dropped: {}", Error::NotConnected);
            return false;
        }

        let frame = match self.frame(cell_bytes, theme) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Transport: frame dropped: {}", e);
                return false;
            }
        };

        let sent = match self.active {
            ChannelKind::Socket => self.socket.send_raw(&frame),
            ChannelKind::Serial => self.serial.send_raw(&frame),
        };
        if sent {
            self.frames_sent += 1;
            log::trace!("Transport: sent {} byte frame", frame.len());
        }
        sent
    }

    fn frame(&self, cell_bytes: &[u8], theme: u8) -> Result<Vec<u8>> {
        let grid = self.grid.ok_or(Error::GridUnavailable)?;
        let header = FrameHeader::new(grid, theme, self.brightness);
        build_frame(self.frame_format, &header, cell_bytes)
    }

    /// Send a command on the active channel
    pub fn send_command(&mut self, command: Command, value: i32) -> bool {
        if !command.supported_on(self.active) {
            log::error!("Transport: {} is not supported on {}", command, self.active);
            return false;
        }
        match self.active {
            ChannelKind::Socket => self.socket.send_command(command, value),
            ChannelKind::Serial => self.serial.send_command(command, value),
        }
    }

    pub fn send_color(&mut self, value: i32) -> bool {
        self.send_command(Command::Color, value)
    }

    pub fn send_brightness(&mut self, value: i32) -> bool {
        self.send_command(Command::Brightness, value)
    }

    pub fn send_power(&mut self, value: i32) -> bool {
        self.send_command(Command::Power, value)
    }

    /// Whether the active channel has an open link
    pub fn is_connected(&self) -> bool {
        match self.active {
            ChannelKind::Socket => self.socket.is_connected(),
            ChannelKind::Serial => self.serial.is_connected(),
        }
    }

    /// Apply queued link events and due timers on both channels
    pub fn poll(&mut self) {
        self.socket.poll();
        self.serial.poll();
    }

    pub fn socket(&self) -> &SocketChannel {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut SocketChannel {
        &mut self.socket
    }

    pub fn serial(&self) -> &SerialChannel {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut SerialChannel {
        &mut self.serial
    }

    pub fn on_message<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&ChannelEvent) -> HandlerResult + Send + 'static,
    {
        self.socket.on_message(handler)
    }

    pub fn on_mouse<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&MouseDelta) -> HandlerResult + Send + 'static,
    {
        self.socket.on_mouse(handler)
    }

    pub fn on_emu<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&EmuFrame) -> HandlerResult + Send + 'static,
    {
        self.socket.on_emu(handler)
    }

    pub fn on_serial_status<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&SerialStatus) -> HandlerResult + Send + 'static,
    {
        self.serial.on_status(handler)
    }

    pub fn on_serial_ports<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&Vec<PortInfo>) -> HandlerResult + Send + 'static,
    {
        self.serial.on_ports(handler)
    }

    /// Close both channels
    pub fn shutdown(&mut self) {
        log::info!("Transport: shutting down after {} frames", self.frames_sent);
        self.socket.disconnect();
        self.serial.disconnect();
    }
}
