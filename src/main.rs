//! TarangIO - particle field streaming daemon
//!
//! Reads particle snapshots from stdin, aggregates them into the display's
//! cell field and streams frames over the configured channel.
//!
//! ## Input (one JSON value per line)
//!
//! | Line                                   | Effect                       |
//! |----------------------------------------|------------------------------|
//! | `[{"x":0.5,"y":0.5,"vx":0,"vy":0}]`    | new particle snapshot        |
//! | `{"control":"serial"}`                 | network / serial / sendData / stopData |
//! | `{"mode":"Velocity"}`                  | switch field mode            |
//! | `{"command":"BRIGHTNESS","value":40}`  | hardware command             |

use crossbeam_channel::{unbounded, Receiver};
use serde::Deserialize;
use std::env;
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tarang_io::config::Config;
use tarang_io::core::types::{ChannelKind, Particle};
use tarang_io::error::{Error, Result};
use tarang_io::field::{FieldAggregator, FieldMode, UniformCollisionGrid};
use tarang_io::grid::{CellGridBuilder, CellMap};
use tarang_io::streaming::{normalize_payload, GridMetadata};
use tarang_io::transport::{
    Command, NativeSerialBackend, SerialChannel, SocketChannel, TcpConnector, TransportManager,
};

const DEFAULT_CONFIG_PATH: &str = "tarang.toml";

/// One line of stdin input
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputLine {
    Snapshot(Vec<Particle>),
    Control { control: String },
    Mode { mode: String },
    Command { command: String, value: i32 },
}

/// Parse config path from command line arguments.
///
/// Supports `tarang-io <path>`, `tarang-io --config <path>` and
/// `tarang-io -c <path>`. Without one, `tarang.toml` is used if present.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    Path::new(DEFAULT_CONFIG_PATH)
        .exists()
        .then(|| DEFAULT_CONFIG_PATH.to_string())
}

fn spawn_stdin_reader(running: Arc<AtomicBool>) -> Result<Receiver<InputLine>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::error!("stdin read failed: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<InputLine>(&line) {
                    Ok(input) => {
                        if tx.send(input).is_err() {
                            break;
                        }
                    }
                    Err(e) => log::warn!("Ignoring input line: {}", e),
                }
            }
            log::info!("stdin closed");
        })
        .map_err(|e| Error::Other(format!("Failed to spawn stdin reader: {}", e)))?;
    Ok(rx)
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("TarangIO v{} starting...", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => log::info!("Using config: {}", path),
        None => log::info!("No config file, using defaults"),
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    // Grid
    let spec = config.grid;
    let layout = CellGridBuilder::generate(&spec, spec.screen.boundary_radius());
    if layout.is_empty() {
        log::warn!("Grid is empty, frames will carry no payload");
    }
    log::info!(
        "Grid: {} cells ({}x{} lattice, {}x{} px)",
        layout.cell_count(),
        layout.cols,
        layout.rows,
        layout.cell_w,
        layout.cell_h
    );
    let map = CellMap::new(&layout);

    let mut aggregator = FieldAggregator::new(config.field.clone());
    aggregator.set_grid(&map);
    let max_value = config.field.max_value;
    let mut collisions = UniformCollisionGrid::new(config.field.collision_grid_size);

    // Transport
    let socket = SocketChannel::new(
        config.socket.clone(),
        Arc::new(TcpConnector::new(&config.socket)),
    );
    let serial = SerialChannel::new(config.serial.clone(), Arc::new(NativeSerialBackend), None);
    let mut manager = TransportManager::new(socket, serial, &config.transport);
    manager.set_grid_metadata(GridMetadata::from_layout(&spec, &layout));
    manager.on_mouse(|delta| {
        log::debug!("Mouse: dx={} dy={}", delta.dx, delta.dy);
        Ok(())
    });
    manager.on_emu(|frame| {
        let reading = frame.reading();
        log::debug!("EMU: x={:.3} y={:.3} z={:.3}", reading.x, reading.y, reading.z);
        Ok(())
    });

    manager.set_active_channel(config.transport.channel);
    if config.transport.channel == ChannelKind::Serial {
        manager.serial_mut().refresh_ports();
        if !manager.serial().authorized_ports().is_empty() {
            manager.serial_mut().connect(0);
        }
    }

    let inputs = spawn_stdin_reader(Arc::clone(&running))?;
    let interval = config.transport.frame_interval();
    let theme = config.transport.theme;
    let mut particles: Vec<Particle> = Vec::new();

    log::info!("Streaming on {} channel", manager.active_channel());

    while running.load(Ordering::Relaxed) {
        let started = Instant::now();
        manager.poll();

        while let Ok(input) = inputs.try_recv() {
            match input {
                InputLine::Snapshot(snapshot) => particles = snapshot,
                InputLine::Control { control } => {
                    manager.apply_control(&control);
                }
                InputLine::Mode { mode } => match mode.parse::<FieldMode>() {
                    Ok(mode) => aggregator.set_mode(mode),
                    Err(e) => log::error!("{}", e),
                },
                InputLine::Command { command, value } => match command.parse::<Command>() {
                    Ok(command) => {
                        manager.send_command(command, value);
                    }
                    Err(e) => log::error!("{}", e),
                },
            }
        }

        if aggregator.mode() == FieldMode::Collision {
            collisions.rebuild(&particles);
        }
        let values = aggregator.compute_frame(&particles, Some(&collisions));
        let payload = normalize_payload(values, max_value);
        manager.send_data(&payload, theme);

        if let Some(remaining) = interval.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
    }

    manager.shutdown();
    log::info!("TarangIO stopped");
    Ok(())
}
