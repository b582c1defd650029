//! In-memory transports for tests
//!
//! Compiled unconditionally so integration tests and downstream crates can
//! drive both channels without hardware or a display bridge.

use super::serial::{PortPrompt, SerialBackend, SerialLink};
use super::socket::{MessageReader, MessageWriter, SocketConnector, SocketLink};
use super::Transport;
use crate::error::{Error, Result};
use crate::streaming::wire::SocketMessage;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Byte transport backed by shared buffers
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    read_buffer: VecDeque<u8>,
    write_buffer: Vec<u8>,
    fail_writes: bool,
    hung_up: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the reader
    pub fn inject_read(&self, data: &[u8]) {
        self.inner.lock().read_buffer.extend(data);
    }

    /// Everything written so far
    pub fn get_written(&self) -> Vec<u8> {
        self.inner.lock().write_buffer.clone()
    }

    pub fn clear_written(&self) {
        self.inner.lock().write_buffer.clear();
    }

    /// Make subsequent writes fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Make subsequent reads fail, as if the device was unplugged
    pub fn hang_up(&self) {
        self.inner.lock().hung_up = true;
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        if inner.hung_up {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device disconnected",
            )));
        }
        let count = inner.read_buffer.len().min(buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(inner.read_buffer.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "write rejected",
            )));
        }
        inner.write_buffer.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn available(&mut self) -> Result<usize> {
        Ok(self.inner.lock().read_buffer.len())
    }
}

/// Serial backend handing out [`MockTransport`]s
#[derive(Clone)]
pub struct MockSerialBackend {
    inner: Arc<Mutex<MockSerialInner>>,
}

struct MockSerialInner {
    ports: Vec<String>,
    open_attempts: usize,
    opened: Vec<(String, MockTransport)>,
    fail_open: bool,
}

impl MockSerialBackend {
    pub fn new(ports: &[&str]) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockSerialInner {
                ports: ports.iter().map(|p| p.to_string()).collect(),
                open_attempts: 0,
                opened: Vec::new(),
                fail_open: false,
            })),
        }
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.inner.lock().fail_open = fail;
    }

    /// Number of open attempts, failed ones included
    pub fn open_count(&self) -> usize {
        self.inner.lock().open_attempts
    }

    /// Transport of the most recent successful open
    pub fn last_transport(&self) -> Option<MockTransport> {
        self.inner
            .lock()
            .opened
            .last()
            .map(|(_, t)| t.clone())
    }

    /// Paths opened so far, in order
    pub fn opened_paths(&self) -> Vec<String> {
        self.inner
            .lock()
            .opened
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }
}

impl SerialBackend for MockSerialBackend {
    fn open(&self, path: &str, _baud_rate: u32, _read_timeout: Duration) -> Result<SerialLink> {
        let mut inner = self.inner.lock();
        inner.open_attempts += 1;
        if inner.fail_open {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such port: {}", path),
            )));
        }
        let transport = MockTransport::new();
        inner.opened.push((path.to_string(), transport.clone()));
        Ok(SerialLink {
            reader: Box::new(transport.clone()),
            writer: Box::new(transport),
        })
    }

    fn list_ports(&self) -> Result<Vec<String>> {
        Ok(self.inner.lock().ports.clone())
    }
}

/// Port prompt with a fixed answer
pub struct MockPortPrompt {
    answer: Option<String>,
    asked: AtomicUsize,
}

impl MockPortPrompt {
    pub fn choosing(answer: Option<&str>) -> Self {
        Self {
            answer: answer.map(str::to_string),
            asked: AtomicUsize::new(0),
        }
    }

    pub fn times_asked(&self) -> usize {
        self.asked.load(Ordering::Relaxed)
    }
}

impl PortPrompt for MockPortPrompt {
    fn choose_port(&self, available: &[String]) -> Option<String> {
        self.asked.fetch_add(1, Ordering::Relaxed);
        self.answer
            .as_ref()
            .filter(|answer| available.contains(answer))
            .cloned()
    }
}

/// Socket connector producing in-memory links
#[derive(Clone, Default)]
pub struct MockSocketConnector {
    inner: Arc<Mutex<MockConnectorInner>>,
}

#[derive(Default)]
struct MockConnectorInner {
    open_count: usize,
    fail: bool,
    peers: Vec<MockSocketPeer>,
}

impl MockSocketConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent opens fail
    pub fn set_fail(&self, fail: bool) {
        self.inner.lock().fail = fail;
    }

    /// Number of open attempts, failed ones included
    pub fn open_count(&self) -> usize {
        self.inner.lock().open_count
    }

    /// Remote end of the most recent link
    pub fn last_peer(&self) -> Option<MockSocketPeer> {
        self.inner.lock().peers.last().cloned()
    }
}

impl SocketConnector for MockSocketConnector {
    fn open(&self) -> Result<SocketLink> {
        let mut inner = self.inner.lock();
        inner.open_count += 1;
        if inner.fail {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }

        let (inbound_tx, inbound_rx) = unbounded();
        let peer = MockSocketPeer {
            sent: Arc::new(Mutex::new(Vec::new())),
            inbound: inbound_tx,
            closed: Arc::new(AtomicBool::new(false)),
        };
        inner.peers.push(peer.clone());

        Ok(SocketLink {
            reader: Box::new(MockReader {
                inbound: inbound_rx,
                closed: Arc::clone(&peer.closed),
            }),
            writer: Box::new(MockWriter {
                sent: Arc::clone(&peer.sent),
                closed: Arc::clone(&peer.closed),
            }),
        })
    }

    fn describe(&self) -> String {
        "mock://display".to_string()
    }
}

/// Remote end of a mock socket link
#[derive(Clone)]
pub struct MockSocketPeer {
    sent: Arc<Mutex<Vec<SocketMessage>>>,
    inbound: Sender<SocketMessage>,
    closed: Arc<AtomicBool>,
}

impl MockSocketPeer {
    /// Messages the channel sent to this peer
    pub fn sent(&self) -> Vec<SocketMessage> {
        self.sent.lock().clone()
    }

    /// Binary payloads the channel sent to this peer
    pub fn sent_binary(&self) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .iter()
            .filter_map(|m| match m {
                SocketMessage::Binary(bytes) => Some(bytes.clone()),
                SocketMessage::Text(_) => None,
            })
            .collect()
    }

    /// Deliver a message to the channel
    pub fn push(&self, message: SocketMessage) {
        let _ = self.inbound.send(message);
    }

    /// Close the link from the remote side
    pub fn hang_up(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

struct MockReader {
    inbound: Receiver<SocketMessage>,
    closed: Arc<AtomicBool>,
}

impl MessageReader for MockReader {
    fn recv(&mut self) -> Result<Option<SocketMessage>> {
        loop {
            if self.closed.load(Ordering::Relaxed) {
                return Ok(None);
            }
            match self.inbound.recv_timeout(Duration::from_millis(10)) {
                Ok(message) => return Ok(Some(message)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
    }
}

struct MockWriter {
    sent: Arc<Mutex<Vec<SocketMessage>>>,
    closed: Arc<AtomicBool>,
}

impl MessageWriter for MockWriter {
    fn send(&mut self, message: &SocketMessage) -> Result<()> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(Error::NotConnected);
        }
        self.sent.lock().push(message.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_transport_read_write() {
        let mut transport = MockTransport::new();
        transport.inject_read(&[1, 2, 3]);
        assert_eq!(transport.available().unwrap(), 3);

        let mut buffer = [0u8; 2];
        assert_eq!(transport.read(&mut buffer).unwrap(), 2);
        assert_eq!(buffer, [1, 2]);
        assert_eq!(transport.read(&mut buffer).unwrap(), 1);
        assert_eq!(transport.read(&mut buffer).unwrap(), 0);

        transport.write_all(&[9, 8]).unwrap();
        assert_eq!(transport.get_written(), vec![9, 8]);
    }

    #[test]
    fn test_mock_transport_failures() {
        let mut transport = MockTransport::new();
        transport.set_fail_writes(true);
        assert!(transport.write(&[1]).is_err());

        transport.hang_up();
        let mut buffer = [0u8; 4];
        assert!(transport.read(&mut buffer).is_err());
    }

    #[test]
    fn test_mock_socket_link_closes_reader() {
        let connector = MockSocketConnector::new();
        let mut link = connector.open().unwrap();
        let peer = connector.last_peer().unwrap();

        peer.push(SocketMessage::Text("{}".to_string()));
        assert_eq!(
            link.reader.recv().unwrap(),
            Some(SocketMessage::Text("{}".to_string()))
        );

        link.writer.send(&SocketMessage::Binary(vec![7, 1])).unwrap();
        assert_eq!(peer.sent_binary(), vec![vec![7, 1]]);

        link.writer.close();
        assert!(peer.is_closed());
        assert_eq!(link.reader.recv().unwrap(), None);
    }

    #[test]
    fn test_mock_prompt_only_picks_available_port() {
        let prompt = MockPortPrompt::choosing(Some("/dev/ttyACM0"));
        assert_eq!(prompt.choose_port(&[]), None);
        assert_eq!(
            prompt.choose_port(&["/dev/ttyACM0".to_string()]),
            Some("/dev/ttyACM0".to_string())
        );
        assert_eq!(prompt.times_asked(), 2);
    }
}
