//! Socket channel
//!
//! A message link to the display bridge with automatic reconnection.
//!
//! # Connection lifecycle
//!
//! ```text
//!   Closed ──connect()──► Connecting ──opened──► Open
//!     ▲                      │                    │
//!     │◄──── open failed ────┘                    │
//!     │◄──────────── link closed / disconnect() ──┘
//! ```
//!
//! When an open link drops without `disconnect()`, a reconnect is scheduled
//! after `reconnect_delay`. Failed reconnects keep the chain going until
//! `max_retries` attempts were made, after which the counter resets and the
//! channel stays closed until the next explicit `connect()`.
//!
//! # Inbound dispatch
//!
//! | Message          | Delivered to                        |
//! |------------------|-------------------------------------|
//! | binary, 4 bytes  | mouse handlers as [`MouseDelta`]    |
//! | binary, 13 bytes | EMU handlers as [`EmuFrame`]        |
//! | other binary     | dropped                             |
//! | text             | message handlers as parsed JSON     |

use super::command::{Command, CommandDebouncer};
use super::observer::{HandlerResult, Subscribers, SubscriptionId};
use crate::config::SocketConfig;
use crate::core::types::{ChannelKind, EmuFrame, MouseDelta};
use crate::error::{Error, Result};
use crate::streaming::wire::{read_message, write_message, SocketMessage};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::io::BufReader;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Receiving half of a socket link
pub trait MessageReader: Send {
    /// Block for the next message, `Ok(None)` once the peer closed the link
    fn recv(&mut self) -> Result<Option<SocketMessage>>;
}

/// Sending half of a socket link
pub trait MessageWriter: Send {
    fn send(&mut self, message: &SocketMessage) -> Result<()>;

    /// Close the link; a blocked reader must return afterwards
    fn close(&mut self);
}

/// An opened link split into reader and writer
pub struct SocketLink {
    pub reader: Box<dyn MessageReader>,
    pub writer: Box<dyn MessageWriter>,
}

/// Opens socket links (blocking, called on the connect thread)
pub trait SocketConnector: Send + Sync {
    fn open(&self) -> Result<SocketLink>;

    /// Human readable target for logs
    fn describe(&self) -> String;
}

/// Connection and message events for generic subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connect,
    Disconnect,
    Error(String),
    Message(serde_json::Value),
}

/// Events reported by helper threads
enum LinkEvent {
    Opened { generation: u64, link: SocketLink },
    OpenFailed { generation: u64, error: String },
    Message { generation: u64, message: SocketMessage },
    ReadFailed { generation: u64, error: String },
    Closed { generation: u64 },
}

enum LinkState {
    Closed,
    Connecting {
        generation: u64,
    },
    Open {
        generation: u64,
        writer: Box<dyn MessageWriter>,
        reader: Option<JoinHandle<()>>,
    },
}

struct PendingResend {
    due: Instant,
    frame: [u8; 2],
}

/// Socket channel with reconnection, command debounce and inbound dispatch
pub struct SocketChannel {
    config: SocketConfig,
    connector: Arc<dyn SocketConnector>,
    state: LinkState,
    generation: u64,
    retry_count: u32,
    reconnect_at: Option<Instant>,
    resends: Vec<PendingResend>,
    debouncer: CommandDebouncer,
    events_tx: Sender<LinkEvent>,
    events_rx: Receiver<LinkEvent>,
    messages: Subscribers<ChannelEvent>,
    mouse: Subscribers<MouseDelta>,
    emu: Subscribers<EmuFrame>,
    connect_attempts: u64,
}

impl SocketChannel {
    pub fn new(config: SocketConfig, connector: Arc<dyn SocketConnector>) -> Self {
        let (events_tx, events_rx) = unbounded();
        let debouncer = CommandDebouncer::new(config.debounce());
        Self {
            config,
            connector,
            state: LinkState::Closed,
            generation: 0,
            retry_count: 0,
            reconnect_at: None,
            resends: Vec::new(),
            debouncer,
            events_tx,
            events_rx,
            messages: Subscribers::new("socket message"),
            mouse: Subscribers::new("mouse"),
            emu: Subscribers::new("emu"),
            connect_attempts: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, LinkState::Open { .. })
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self.state, LinkState::Connecting { .. })
    }

    /// Automatic reconnects made since the link was last up
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Deadline of the scheduled reconnect, if any
    pub fn pending_reconnect(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Connect attempts started since creation
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts
    }

    /// Start connecting unless a link is already open or being opened
    pub fn connect(&mut self) {
        self.reconnect_at = None;
        match self.state {
            LinkState::Closed => {}
            LinkState::Connecting { .. } => {
                log::debug!("Socket: {}", Error::ConnectInProgress);
                return;
            }
            LinkState::Open { .. } => {
                log::debug!("Socket: already connected");
                return;
            }
        }

        self.generation += 1;
        self.connect_attempts += 1;
        let generation = self.generation;
        let connector = Arc::clone(&self.connector);
        let events = self.events_tx.clone();
        log::info!("Socket: connecting to {}", connector.describe());

        let spawned = thread::Builder::new()
            .name("socket-connect".to_string())
            .spawn(move || {
                let event = match connector.open() {
                    Ok(link) => LinkEvent::Opened { generation, link },
                    Err(e) => LinkEvent::OpenFailed {
                        generation,
                        error: e.to_string(),
                    },
                };
                let _ = events.send(event);
            });

        match spawned {
            Ok(_) => self.state = LinkState::Connecting { generation },
            Err(e) => log::error!("Socket: failed to spawn connect thread: {}", e),
        }
    }

    /// Close the link without scheduling a reconnect
    pub fn disconnect(&mut self) {
        if self.reconnect_at.take().is_some() {
            log::debug!("Socket: cleared pending reconnect");
        }
        self.retry_count = 0;
        self.resends.clear();

        match std::mem::replace(&mut self.state, LinkState::Closed) {
            LinkState::Closed => {
                log::debug!("Socket: already disconnected");
            }
            LinkState::Connecting { .. } => {
                log::info!("Socket: connect abandoned");
            }
            LinkState::Open {
                mut writer, reader, ..
            } => {
                writer.close();
                join_reader(reader);
                log::info!("Socket: disconnected");
                self.messages.broadcast(&ChannelEvent::Disconnect);
            }
        }
    }

    /// Apply helper-thread events and due timers
    pub fn poll(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }

        let now = Instant::now();
        if self.reconnect_at.is_some_and(|at| now >= at) {
            log::info!(
                "Socket: reconnect attempt {} of {}",
                self.retry_count,
                self.config.max_retries
            );
            self.connect();
        }
        self.flush_resends(now);
    }

    /// Send a binary message if the link is open
    pub fn send_raw(&mut self, bytes: &[u8]) -> bool {
        let LinkState::Open { writer, .. } = &mut self.state else {
            return false;
        };
        match writer.send(&SocketMessage::Binary(bytes.to_vec())) {
            Ok(()) => {
                log::trace!("Socket: sent {} bytes", bytes.len());
                true
            }
            Err(e) => {
                log::warn!("Socket: send failed: {}", e);
                false
            }
        }
    }

    /// Send a validated, debounced command with one delayed resend.
    ///
    /// The debounce state is updated even when the link is down.
    pub fn send_command(&mut self, command: Command, value: i32) -> bool {
        if !command.supported_on(ChannelKind::Socket) {
            log::error!("Socket: {} is not supported on this channel", command);
            return false;
        }
        let value = match command.validate(value) {
            Ok(v) => v,
            Err(e) => {
                log::error!("Socket: {}", e);
                return false;
            }
        };

        let now = Instant::now();
        if !self.debouncer.admit(command, value, now) {
            log::trace!("Socket: {} {} debounced", command, value);
            return false;
        }
        if !self.is_connected() {
            log::warn!("Socket: {} not sent: {}", command, Error::NotConnected);
            return false;
        }

        let frame = command.encode(value);
        if !self.send_raw(&frame) {
            return false;
        }
        self.resends.push(PendingResend {
            due: now + self.config.resend_delay(),
            frame,
        });
        log::debug!("Socket: sent {} = {}", command, value);
        true
    }

    pub fn on_message<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&ChannelEvent) -> HandlerResult + Send + 'static,
    {
        self.messages.subscribe(handler)
    }

    pub fn remove_message_handler(&mut self, id: SubscriptionId) -> bool {
        self.messages.unsubscribe(id)
    }

    pub fn on_mouse<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&MouseDelta) -> HandlerResult + Send + 'static,
    {
        self.mouse.subscribe(handler)
    }

    pub fn remove_mouse_handler(&mut self, id: SubscriptionId) -> bool {
        self.mouse.unsubscribe(id)
    }

    pub fn on_emu<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&EmuFrame) -> HandlerResult + Send + 'static,
    {
        self.emu.subscribe(handler)
    }

    pub fn remove_emu_handler(&mut self, id: SubscriptionId) -> bool {
        self.emu.unsubscribe(id)
    }

    fn handle_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Opened {
                generation,
                mut link,
            } => {
                if !self.is_connecting_generation(generation) {
                    log::debug!("Socket: dropping stale link (generation {})", generation);
                    link.writer.close();
                    return;
                }
                let Some(reader) = self.spawn_reader(generation, link.reader) else {
                    link.writer.close();
                    self.state = LinkState::Closed;
                    self.messages
                        .broadcast(&ChannelEvent::Error("reader thread failed".to_string()));
                    self.messages.broadcast(&ChannelEvent::Disconnect);
                    return;
                };
                self.state = LinkState::Open {
                    generation,
                    writer: link.writer,
                    reader: Some(reader),
                };
                self.retry_count = 0;
                self.reconnect_at = None;
                log::info!("Socket: connected to {}", self.connector.describe());
                self.messages.broadcast(&ChannelEvent::Connect);
            }
            LinkEvent::OpenFailed { generation, error } => {
                if !self.is_connecting_generation(generation) {
                    return;
                }
                log::warn!("Socket: connect failed: {}", error);
                self.state = LinkState::Closed;
                self.messages.broadcast(&ChannelEvent::Error(error));
                self.handle_close(false);
            }
            LinkEvent::Message {
                generation,
                message,
            } => {
                if self.is_open_generation(generation) {
                    self.dispatch(message);
                }
            }
            LinkEvent::ReadFailed { generation, error } => {
                if self.is_open_generation(generation) {
                    log::warn!("Socket: read failed: {}", error);
                    self.messages.broadcast(&ChannelEvent::Error(error));
                }
            }
            LinkEvent::Closed { generation } => {
                if !self.is_open_generation(generation) {
                    return;
                }
                if let LinkState::Open { reader, .. } =
                    std::mem::replace(&mut self.state, LinkState::Closed)
                {
                    join_reader(reader);
                }
                log::info!("Socket: connection closed by peer");
                self.resends.clear();
                self.handle_close(true);
            }
        }
    }

    /// Reconnect policy after a link closed on its own
    fn handle_close(&mut self, was_connected: bool) {
        let retrying = was_connected || self.retry_count > 0;
        let max_retries = self.config.max_retries;

        if retrying && self.reconnect_at.is_none() && self.retry_count < max_retries {
            self.retry_count += 1;
            self.reconnect_at = Some(Instant::now() + self.config.reconnect_delay());
            log::info!(
                "Socket: retry {} of {} in {:?}",
                self.retry_count,
                max_retries,
                self.config.reconnect_delay()
            );
        } else if retrying && self.retry_count >= max_retries {
            log::warn!("Socket: max retry attempts reached, giving up");
            self.retry_count = 0;
        }

        self.messages.broadcast(&ChannelEvent::Disconnect);
    }

    fn dispatch(&mut self, message: SocketMessage) {
        match message {
            SocketMessage::Binary(bytes) => match bytes.len() {
                MouseDelta::WIRE_SIZE => {
                    if let Some(delta) = MouseDelta::from_bytes(&bytes) {
                        log::trace!("Socket: mouse {:?}", delta);
                        self.mouse.broadcast(&delta);
                    }
                }
                EmuFrame::WIRE_SIZE => {
                    if let Some(frame) = EmuFrame::from_bytes(&bytes) {
                        log::trace!("Socket: EMU frame");
                        self.emu.broadcast(&frame);
                    }
                }
                len => log::trace!("Socket: ignoring {} byte binary message", len),
            },
            SocketMessage::Text(text) => match serde_json::from_str(&text) {
                Ok(value) => {
                    self.messages.broadcast(&ChannelEvent::Message(value));
                }
                Err(e) => log::error!("Socket: dropped text message: {}", Error::from(e)),
            },
        }
    }

    fn flush_resends(&mut self, now: Instant) {
        if self.resends.is_empty() {
            return;
        }
        let (due, pending): (Vec<_>, Vec<_>) =
            self.resends.drain(..).partition(|r| r.due <= now);
        self.resends = pending;
        for resend in due {
            self.send_raw(&resend.frame);
        }
    }

    fn spawn_reader(
        &self,
        generation: u64,
        mut reader: Box<dyn MessageReader>,
    ) -> Option<JoinHandle<()>> {
        let events = self.events_tx.clone();
        thread::Builder::new()
            .name("socket-reader".to_string())
            .spawn(move || {
                loop {
                    match reader.recv() {
                        Ok(Some(message)) => {
                            if events.send(LinkEvent::Message { generation, message }).is_err() {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            let _ = events.send(LinkEvent::ReadFailed {
                                generation,
                                error: e.to_string(),
                            });
                            break;
                        }
                    }
                }
                let _ = events.send(LinkEvent::Closed { generation });
                log::debug!("Socket reader thread exiting");
            })
            .map_err(|e| log::error!("Socket: failed to spawn reader thread: {}", e))
            .ok()
    }

    fn is_connecting_generation(&self, generation: u64) -> bool {
        matches!(self.state, LinkState::Connecting { generation: g } if g == generation)
    }

    fn is_open_generation(&self, generation: u64) -> bool {
        matches!(self.state, LinkState::Open { generation: g, .. } if g == generation)
    }
}

impl Drop for SocketChannel {
    fn drop(&mut self) {
        if let LinkState::Open {
            mut writer, reader, ..
        } = std::mem::replace(&mut self.state, LinkState::Closed)
        {
            writer.close();
            join_reader(reader);
        }
    }
}

fn join_reader(reader: Option<JoinHandle<()>>) {
    if let Some(handle) = reader {
        if handle.join().is_err() {
            log::error!("Socket reader thread panicked");
        }
    }
}

/// TCP connector using the kind-tagged message framing
pub struct TcpConnector {
    address: String,
    timeout: Duration,
}

impl TcpConnector {
    pub fn new(config: &SocketConfig) -> Self {
        Self {
            address: config.address.clone(),
            timeout: config.connect_timeout(),
        }
    }
}

impl SocketConnector for TcpConnector {
    fn open(&self) -> Result<SocketLink> {
        let mut last_error = None;
        for addr in self.address.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    let read_half = stream.try_clone()?;
                    return Ok(SocketLink {
                        reader: Box::new(TcpMessageReader {
                            stream: BufReader::new(read_half),
                        }),
                        writer: Box::new(TcpMessageWriter { stream }),
                    });
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(match last_error {
            Some(e) => e.into(),
            None => Error::Config(format!("address {} did not resolve", self.address)),
        })
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.address)
    }
}

struct TcpMessageReader {
    stream: BufReader<TcpStream>,
}

impl MessageReader for TcpMessageReader {
    fn recv(&mut self) -> Result<Option<SocketMessage>> {
        read_message(&mut self.stream)
    }
}

struct TcpMessageWriter {
    stream: TcpStream,
}

impl MessageWriter for TcpMessageWriter {
    fn send(&mut self, message: &SocketMessage) -> Result<()> {
        write_message(&mut self.stream, message)
    }

    fn close(&mut self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            log::debug!("Socket: shutdown: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockSocketConnector;
    use std::sync::Mutex;

    fn config() -> SocketConfig {
        SocketConfig {
            reconnect_delay_ms: 0,
            resend_delay_ms: 20,
            ..SocketConfig::default()
        }
    }

    fn channel(config: SocketConfig) -> (SocketChannel, MockSocketConnector) {
        let connector = MockSocketConnector::new();
        let channel = SocketChannel::new(config, Arc::new(connector.clone()));
        (channel, connector)
    }

    fn poll_until(channel: &mut SocketChannel, mut done: impl FnMut(&SocketChannel) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done(channel) && Instant::now() < deadline {
            channel.poll();
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn connected(config: SocketConfig) -> (SocketChannel, MockSocketConnector) {
        let (mut socket, connector) = channel(config);
        socket.connect();
        poll_until(&mut socket, |s| s.is_connected());
        assert!(socket.is_connected());
        (socket, connector)
    }

    fn record_events(socket: &mut SocketChannel) -> Arc<Mutex<Vec<ChannelEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        socket.on_message(move |event| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        });
        events
    }

    #[test]
    fn test_connect_notifies_subscribers() {
        let (mut socket, connector) = channel(config());
        let events = record_events(&mut socket);

        socket.connect();
        assert!(socket.is_connecting());
        socket.connect();
        poll_until(&mut socket, |s| s.is_connected());

        assert_eq!(connector.open_count(), 1);
        assert_eq!(*events.lock().unwrap(), vec![ChannelEvent::Connect]);
    }

    #[test]
    fn test_connect_while_open_is_noop() {
        let (mut socket, connector) = connected(config());
        socket.connect();
        socket.poll();
        assert_eq!(connector.open_count(), 1);
        assert!(socket.is_connected());
    }

    #[test]
    fn test_send_command_resends_once() {
        let (mut socket, connector) = connected(config());
        let peer = connector.last_peer().unwrap();

        assert!(socket.send_command(Command::Brightness, 40));
        assert_eq!(peer.sent_binary(), vec![vec![7, 40]]);

        thread::sleep(Duration::from_millis(30));
        socket.poll();
        socket.poll();
        assert_eq!(peer.sent_binary(), vec![vec![7, 40], vec![7, 40]]);
    }

    #[test]
    fn test_send_command_debounce() {
        let (mut socket, connector) = connected(SocketConfig {
            debounce_ms: 60_000,
            ..config()
        });
        let peer = connector.last_peer().unwrap();

        assert!(socket.send_command(Command::Color, 12));
        assert!(!socket.send_command(Command::Color, 12));
        assert!(socket.send_command(Command::Color, 13));
        assert_eq!(peer.sent_binary(), vec![vec![6, 12], vec![6, 13]]);
    }

    #[test]
    fn test_send_command_rejects_out_of_range() {
        let (mut socket, connector) = connected(config());
        let peer = connector.last_peer().unwrap();

        assert!(!socket.send_command(Command::Power, 101));
        assert!(!socket.send_command(Command::Color, -1));
        assert!(peer.sent_binary().is_empty());
    }

    #[test]
    fn test_debounce_recorded_while_disconnected() {
        let (mut socket, _connector) = channel(SocketConfig {
            debounce_ms: 60_000,
            ..config()
        });
        assert!(!socket.send_command(Command::Power, 30));

        socket.connect();
        poll_until(&mut socket, |s| s.is_connected());
        assert!(!socket.send_command(Command::Power, 30));
    }

    #[test]
    fn test_send_raw_requires_link() {
        let (mut socket, _connector) = channel(config());
        assert!(!socket.send_raw(&[1, 2]));
    }

    #[test]
    fn test_inbound_dispatch() {
        let (mut socket, connector) = connected(config());
        let peer = connector.last_peer().unwrap();
        let events = record_events(&mut socket);

        let mouse = Arc::new(Mutex::new(Vec::new()));
        let mouse_sink = Arc::clone(&mouse);
        socket.on_mouse(move |delta| {
            mouse_sink.lock().unwrap().push(*delta);
            Ok(())
        });
        let emu = Arc::new(Mutex::new(0usize));
        let emu_sink = Arc::clone(&emu);
        socket.on_emu(move |_| {
            *emu_sink.lock().unwrap() += 1;
            Ok(())
        });

        peer.push(SocketMessage::Binary(vec![0x05, 0x00, 0xFB, 0xFF]));
        peer.push(SocketMessage::Binary(vec![0u8; 13]));
        peer.push(SocketMessage::Binary(vec![0u8; 5]));
        peer.push(SocketMessage::Text("not json".to_string()));
        peer.push(SocketMessage::Text(r#"{"status":"ok"}"#.to_string()));

        poll_until(&mut socket, |_| !events.lock().unwrap().is_empty());

        assert_eq!(*mouse.lock().unwrap(), vec![MouseDelta { dx: 5, dy: -5 }]);
        assert_eq!(*emu.lock().unwrap(), 1);
        assert_eq!(
            *events.lock().unwrap(),
            vec![ChannelEvent::Message(serde_json::json!({"status": "ok"}))]
        );
    }

    #[test]
    fn test_peer_close_schedules_reconnect() {
        let (mut socket, connector) = connected(SocketConfig {
            reconnect_delay_ms: 60_000,
            ..config()
        });
        let events = record_events(&mut socket);

        connector.last_peer().unwrap().hang_up();
        poll_until(&mut socket, |s| !s.is_connected());

        assert_eq!(socket.retry_count(), 1);
        assert!(socket.pending_reconnect().is_some());
        assert_eq!(*events.lock().unwrap(), vec![ChannelEvent::Disconnect]);
    }

    #[test]
    fn test_reconnect_succeeds_and_resets_retries() {
        let (mut socket, connector) = connected(config());

        connector.last_peer().unwrap().hang_up();
        poll_until(&mut socket, |s| connector.open_count() == 2 && s.is_connected());

        assert!(socket.is_connected());
        assert_eq!(socket.retry_count(), 0);
    }

    #[test]
    fn test_retries_exhaust_after_three_failures() {
        let (mut socket, connector) = connected(config());
        connector.set_fail(true);

        connector.last_peer().unwrap().hang_up();
        poll_until(&mut socket, |_| connector.open_count() >= 4);
        for _ in 0..20 {
            socket.poll();
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(connector.open_count(), 4);
        assert_eq!(socket.retry_count(), 0);
        assert!(socket.pending_reconnect().is_none());
        assert!(!socket.is_connected());
    }

    #[test]
    fn test_initial_failure_does_not_retry() {
        let (mut socket, connector) = channel(config());
        connector.set_fail(true);
        let events = record_events(&mut socket);

        socket.connect();
        poll_until(&mut socket, |s| !s.is_connecting());

        assert_eq!(socket.retry_count(), 0);
        assert!(socket.pending_reconnect().is_none());
        let events = events.lock().unwrap();
        assert!(matches!(events[0], ChannelEvent::Error(_)));
        assert_eq!(events[1], ChannelEvent::Disconnect);
    }

    #[test]
    fn test_explicit_disconnect_suppresses_reconnect() {
        let (mut socket, connector) = connected(config());
        let events = record_events(&mut socket);
        let peer = connector.last_peer().unwrap();

        socket.disconnect();
        assert!(peer.is_closed());
        for _ in 0..10 {
            socket.poll();
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(connector.open_count(), 1);
        assert!(!socket.is_connected());
        assert_eq!(*events.lock().unwrap(), vec![ChannelEvent::Disconnect]);
    }
}
