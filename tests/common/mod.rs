//! Shared helpers for integration tests

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tarang_io::config::{SerialConfig, SocketConfig, TransportConfig};
use tarang_io::core::types::ChannelKind;
use tarang_io::grid::{CellGridBuilder, GridSpec};
use tarang_io::streaming::GridMetadata;
use tarang_io::transport::mock::{MockSerialBackend, MockSocketConnector};
use tarang_io::transport::{SerialChannel, SocketChannel, TransportManager};

pub const SERIAL_PORT: &str = "/dev/ttyACM0";

/// Call `step` until `done` holds or two seconds pass
#[allow(dead_code)]
pub fn wait_until<T>(
    state: &mut T,
    mut step: impl FnMut(&mut T),
    mut done: impl FnMut(&T) -> bool,
) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        step(state);
        if done(state) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Metadata of the default 341-cell round grid
#[allow(dead_code)]
pub fn default_metadata() -> GridMetadata {
    let spec = GridSpec::default();
    let layout = CellGridBuilder::generate(&spec, spec.screen.boundary_radius());
    GridMetadata::from_layout(&spec, &layout)
}

/// Manager wired to in-memory links
#[allow(dead_code)]
pub struct MockRig {
    pub manager: TransportManager,
    pub connector: MockSocketConnector,
    pub backend: MockSerialBackend,
}

#[allow(dead_code)]
pub fn mock_rig(channel: ChannelKind, socket: SocketConfig, serial: SerialConfig) -> MockRig {
    let connector = MockSocketConnector::new();
    let backend = MockSerialBackend::new(&[SERIAL_PORT]);
    let serial = SerialChannel::new(
        SerialConfig {
            authorized_ports: vec![SERIAL_PORT.to_string()],
            ..serial
        },
        Arc::new(backend.clone()),
        None,
    );
    let socket = SocketChannel::new(socket, Arc::new(connector.clone()));
    let config = TransportConfig {
        channel,
        ..TransportConfig::default()
    };
    MockRig {
        manager: TransportManager::new(socket, serial, &config),
        connector,
        backend,
    }
}
