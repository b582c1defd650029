//! Serial channel
//!
//! Drives a display controller over a serial port at 250000 baud.
//!
//! Ports are addressed by id, an index into the authorized port list. The
//! list starts with the configured ports and grows when a port is granted
//! through [`PortPrompt`].
//!
//! Connect attempts are rate limited: after any attempt, further attempts
//! are rejected until the cooldown elapses. A reader thread forwards inbound
//! bytes; a read error or unexpected exit of the thread forces a disconnect
//! on the next `poll()`. Serial ports have no end-of-stream: a zero-byte read
//! is a read timeout and leaves the port connected.

use super::command::{Command, CommandDebouncer};
use super::observer::{HandlerResult, Subscribers, SubscriptionId};
use super::Transport;
use crate::config::SerialConfig;
use crate::core::types::ChannelKind;
use crate::error::{Error, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Opens serial ports
pub trait SerialBackend: Send + Sync {
    fn open(&self, path: &str, baud_rate: u32, read_timeout: Duration) -> Result<SerialLink>;

    /// Ports currently present on the system
    fn list_ports(&self) -> Result<Vec<String>>;
}

/// An opened port split into independent read and write handles
pub struct SerialLink {
    pub reader: Box<dyn Transport>,
    pub writer: Box<dyn Transport>,
}

/// Asks the operator to grant access to a port
pub trait PortPrompt: Send + Sync {
    /// Returns the chosen port, `None` when the request was dismissed
    fn choose_port(&self, available: &[String]) -> Option<String>;
}

/// Authorized port as reported to port subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub id: usize,
    pub name: String,
}

/// Connection status as reported to status subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialStatus {
    pub connected: bool,
    pub port_id: Option<usize>,
}

enum SerialEvent {
    Data { generation: u64, bytes: Vec<u8> },
    ReadFailed { generation: u64, error: String },
    ReaderExited { generation: u64 },
    PromptFinished { port: Option<String> },
}

struct OpenPort {
    generation: u64,
    port_id: usize,
    writer: Box<dyn Transport>,
    keep_reading: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl OpenPort {
    /// Stop the reader thread and release both handles
    fn close(mut self) {
        self.keep_reading.store(false, Ordering::Relaxed);
        if let Some(handle) = self.reader.take() {
            if handle.join().is_err() {
                log::error!("Serial reader thread panicked");
            }
        }
    }
}

/// Serial channel with cooldown-limited connects and command debounce
pub struct SerialChannel {
    config: SerialConfig,
    backend: Arc<dyn SerialBackend>,
    prompt: Option<Arc<dyn PortPrompt>>,
    authorized: Vec<String>,
    port: Option<OpenPort>,
    generation: u64,
    last_attempt: Option<Instant>,
    prompt_pending: bool,
    debouncer: CommandDebouncer,
    events_tx: Sender<SerialEvent>,
    events_rx: Receiver<SerialEvent>,
    status: Subscribers<SerialStatus>,
    ports: Subscribers<Vec<PortInfo>>,
    data: Subscribers<Vec<u8>>,
}

impl SerialChannel {
    pub fn new(
        config: SerialConfig,
        backend: Arc<dyn SerialBackend>,
        prompt: Option<Arc<dyn PortPrompt>>,
    ) -> Self {
        let (events_tx, events_rx) = unbounded();
        let debouncer = CommandDebouncer::new(config.debounce());
        let authorized = config.authorized_ports.clone();
        Self {
            config,
            backend,
            prompt,
            authorized,
            port: None,
            generation: 0,
            last_attempt: None,
            prompt_pending: false,
            debouncer,
            events_tx,
            events_rx,
            status: Subscribers::new("serial status"),
            ports: Subscribers::new("serial ports"),
            data: Subscribers::new("serial data"),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    /// Id of the connected port
    pub fn active_port(&self) -> Option<usize> {
        self.port.as_ref().map(|p| p.port_id)
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn is_prompt_pending(&self) -> bool {
        self.prompt_pending
    }

    pub fn authorized_ports(&self) -> &[String] {
        &self.authorized
    }

    /// Enable or disable the channel; disabling closes the port
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
        if !enabled {
            self.disconnect();
        }
    }

    /// Add a port to the authorized list, returning its id
    pub fn authorize_port(&mut self, path: &str) -> usize {
        if let Some(id) = self.authorized.iter().position(|p| p == path) {
            return id;
        }
        self.authorized.push(path.to_string());
        log::info!("Serial: authorized port {}", path);
        self.authorized.len() - 1
    }

    /// Publish the authorized port list to port subscribers
    pub fn refresh_ports(&mut self) -> Vec<PortInfo> {
        let ports: Vec<PortInfo> = self
            .authorized
            .iter()
            .enumerate()
            .map(|(id, name)| PortInfo {
                id,
                name: name.clone(),
            })
            .collect();
        log::debug!("Serial: {} authorized port(s)", ports.len());
        self.ports.broadcast(&ports);
        ports
    }

    /// Ask the operator for a port on a helper thread.
    ///
    /// Returns `false` if no prompt is configured or a request is already
    /// pending. The granted port is added during `poll()`.
    pub fn request_port(&mut self) -> bool {
        let Some(prompt) = self.prompt.clone() else {
            log::error!("Serial: no port prompt available");
            return false;
        };
        if self.prompt_pending {
            log::warn!("Serial: port request already pending");
            return false;
        }

        let backend = Arc::clone(&self.backend);
        let events = self.events_tx.clone();
        let spawned = thread::Builder::new()
            .name("serial-prompt".to_string())
            .spawn(move || {
                let available = backend.list_ports().unwrap_or_else(|e| {
                    log::warn!("Serial: failed to list ports: {}", e);
                    Vec::new()
                });
                let port = prompt.choose_port(&available);
                let _ = events.send(SerialEvent::PromptFinished { port });
            });

        match spawned {
            Ok(_) => {
                self.prompt_pending = true;
                true
            }
            Err(e) => {
                log::error!("Serial: failed to spawn prompt thread: {}", e);
                false
            }
        }
    }

    /// Open an authorized port and start reading.
    ///
    /// Returns `true` when already connected to the same port.
    pub fn connect(&mut self, port_id: usize) -> bool {
        if !self.config.enabled {
            log::warn!("Serial: channel disabled, not connecting");
            return false;
        }
        let Some(path) = self.authorized.get(port_id).cloned() else {
            log::error!("Serial: invalid port id {}", port_id);
            return false;
        };
        if self.active_port() == Some(port_id) {
            log::debug!("Serial: already connected to {}", path);
            return true;
        }

        let now = Instant::now();
        if let Some(last) = self.last_attempt {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.config.cooldown() {
                let remaining_ms = (self.config.cooldown() - elapsed).as_millis() as u64;
                log::warn!("Serial: {}", Error::CooldownActive { remaining_ms });
                return false;
            }
        }
        self.last_attempt = Some(now);

        if self.port.is_some() {
            self.disconnect();
        }

        let link = match self
            .backend
            .open(&path, self.config.baud_rate, self.config.read_timeout())
        {
            Ok(link) => link,
            Err(e) => {
                log::error!("Serial: failed to open {}: {}", path, e);
                return false;
            }
        };

        self.generation += 1;
        let generation = self.generation;
        let keep_reading = Arc::new(AtomicBool::new(true));
        let reader = {
            let keep_reading = Arc::clone(&keep_reading);
            let events = self.events_tx.clone();
            let transport = link.reader;
            thread::Builder::new()
                .name("serial-reader".to_string())
                .spawn(move || read_loop(transport, keep_reading, generation, events))
        };
        let reader = match reader {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("Serial: failed to spawn reader thread: {}", e);
                return false;
            }
        };

        self.port = Some(OpenPort {
            generation,
            port_id,
            writer: link.writer,
            keep_reading,
            reader: Some(reader),
        });
        self.debouncer.clear();
        log::info!("Serial: connected to {}", path);
        self.status.broadcast(&SerialStatus {
            connected: true,
            port_id: Some(port_id),
        });
        true
    }

    /// Stop the reader and close the port
    pub fn disconnect(&mut self) {
        let Some(port) = self.port.take() else {
            return;
        };
        let port_id = port.port_id;
        port.close();
        log::info!("Serial: disconnected from port {}", port_id);
        self.status.broadcast(&SerialStatus {
            connected: false,
            port_id: None,
        });
    }

    /// Apply reader and prompt events
    pub fn poll(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                SerialEvent::Data { generation, bytes } => {
                    if self.is_current(generation) {
                        self.data.broadcast(&bytes);
                    }
                }
                SerialEvent::ReadFailed { generation, error } => {
                    if self.is_current(generation) {
                        log::error!("Serial: read failed: {}", error);
                        self.disconnect();
                    }
                }
                SerialEvent::ReaderExited { generation } => {
                    if self.is_current(generation) {
                        log::warn!("Serial: reader stopped unexpectedly");
                        self.disconnect();
                    }
                }
                SerialEvent::PromptFinished { port } => {
                    self.prompt_pending = false;
                    match port {
                        Some(path) => {
                            self.authorize_port(&path);
                            self.refresh_ports();
                        }
                        None => log::info!("Serial: port request dismissed"),
                    }
                }
            }
        }
    }

    /// Send a validated, debounced command. A write failure closes the port.
    pub fn send_command(&mut self, command: Command, value: i32) -> bool {
        if self.port.is_none() {
            log::warn!("Serial: {} not sent: {}", command, Error::NotConnected);
            return false;
        }
        if !command.supported_on(ChannelKind::Serial) {
            log::error!("Serial: {} is not supported on this channel", command);
            return false;
        }
        let value = match command.validate(value) {
            Ok(v) => v,
            Err(e) => {
                log::error!("Serial: {}", e);
                return false;
            }
        };
        if !self.debouncer.admit(command, value, Instant::now()) {
            log::trace!("Serial: {} {} debounced", command, value);
            return false;
        }

        let frame = command.encode(value);
        let result = match self.port.as_mut() {
            Some(port) => port.writer.write_all(&frame),
            None => Err(Error::NotConnected),
        };
        match result {
            Ok(()) => {
                log::debug!("Serial: sent {} = {}", command, value);
                true
            }
            Err(e) => {
                log::error!("Serial: write failed: {}", e);
                self.disconnect();
                false
            }
        }
    }

    /// Write raw bytes; failures are logged but keep the port open
    pub fn send_raw(&mut self, bytes: &[u8]) -> bool {
        let Some(port) = self.port.as_mut() else {
            return false;
        };
        match port.writer.write_all(bytes) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Serial: raw write failed: {}", e);
                false
            }
        }
    }

    pub fn on_status<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&SerialStatus) -> HandlerResult + Send + 'static,
    {
        self.status.subscribe(handler)
    }

    pub fn remove_status_handler(&mut self, id: SubscriptionId) -> bool {
        self.status.unsubscribe(id)
    }

    pub fn on_ports<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&Vec<PortInfo>) -> HandlerResult + Send + 'static,
    {
        self.ports.subscribe(handler)
    }

    pub fn remove_ports_handler(&mut self, id: SubscriptionId) -> bool {
        self.ports.unsubscribe(id)
    }

    pub fn on_data<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&Vec<u8>) -> HandlerResult + Send + 'static,
    {
        self.data.subscribe(handler)
    }

    pub fn remove_data_handler(&mut self, id: SubscriptionId) -> bool {
        self.data.unsubscribe(id)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.port
            .as_ref()
            .is_some_and(|p| p.generation == generation)
    }
}

impl Drop for SerialChannel {
    fn drop(&mut self) {
        if let Some(port) = self.port.take() {
            port.close();
        }
    }
}

/// Reader thread body.
///
/// `Ok(0)` always means the read timed out with nothing pending, never that
/// the device went away. The loop ends only when `keep_reading` is cleared,
/// a read fails, or the event receiver is gone. Only the latter two report
/// back, and only while the port is still wanted.
fn read_loop(
    mut transport: Box<dyn Transport>,
    keep_reading: Arc<AtomicBool>,
    generation: u64,
    events: Sender<SerialEvent>,
) {
    let mut buffer = [0u8; 512];
    log::debug!("Serial reader thread started");

    while keep_reading.load(Ordering::Relaxed) {
        match transport.read(&mut buffer) {
            Ok(0) => thread::sleep(Duration::from_millis(2)),
            Ok(n) => {
                let bytes = buffer[..n].to_vec();
                if events.send(SerialEvent::Data { generation, bytes }).is_err() {
                    break;
                }
            }
            Err(e) => {
                if keep_reading.load(Ordering::Relaxed) {
                    let _ = events.send(SerialEvent::ReadFailed {
                        generation,
                        error: e.to_string(),
                    });
                }
                break;
            }
        }
    }

    if keep_reading.load(Ordering::Relaxed) {
        let _ = events.send(SerialEvent::ReaderExited { generation });
    }
    log::debug!("Serial reader thread exiting");
}
