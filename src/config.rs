//! Configuration for the TarangIO daemon
//!
//! Loads configuration from a TOML file. Every field has a default, so a
//! partial file (or none at all) yields a usable configuration.
//!
//! ```toml
//! [grid]
//! target_cell_count = 341
//! gap = 1
//!
//! [grid.screen]
//! width = 240
//! height = 240
//! shape = "circular"
//!
//! [field]
//! mode = "Density"
//!
//! [socket]
//! address = "127.0.0.1:5501"
//!
//! [serial]
//! authorized_ports = ["/dev/ttyACM0"]
//!
//! [transport]
//! channel = "serial"
//! ```

use crate::core::types::ChannelKind;
use crate::error::{Error, Result};
use crate::field::FieldTuning;
use crate::grid::GridSpec;
use crate::streaming::FrameFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Widest cell shape accepted by [`Config::validate`]
pub const MAX_ASPECT_RATIO: f32 = 100.0;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub grid: GridSpec,
    #[serde(default)]
    pub field: FieldTuning,
    #[serde(default)]
    pub socket: SocketConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Socket link configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SocketConfig {
    /// Address of the display bridge
    #[serde(default = "default_socket_address")]
    pub address: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Delay before an automatic reconnect
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Automatic reconnects before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay of the redundant command resend
    #[serde(default = "default_resend_delay_ms")]
    pub resend_delay_ms: u64,

    /// Identical command values inside this window are dropped
    #[serde(default = "default_socket_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_socket_address() -> String {
    "127.0.0.1:5501".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_max_retries() -> u32 {
    3
}

fn default_resend_delay_ms() -> u64 {
    50
}

fn default_socket_debounce_ms() -> u64 {
    500
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            address: default_socket_address(),
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_retries: default_max_retries(),
            resend_delay_ms: default_resend_delay_ms(),
            debounce_ms: default_socket_debounce_ms(),
        }
    }
}

impl SocketConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn resend_delay(&self) -> Duration {
        Duration::from_millis(self.resend_delay_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Serial link configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialConfig {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Minimum time between connect attempts
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    #[serde(default = "default_serial_debounce_ms")]
    pub debounce_ms: u64,

    /// Blocking read timeout of the reader thread
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Port paths the daemon may open, indexed by port id
    #[serde(default)]
    pub authorized_ports: Vec<String>,

    /// Disabling the channel closes any open port
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_baud_rate() -> u32 {
    250_000
}

fn default_cooldown_ms() -> u64 {
    1000
}

fn default_serial_debounce_ms() -> u64 {
    100
}

fn default_read_timeout_ms() -> u64 {
    50
}

fn default_true() -> bool {
    true
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            cooldown_ms: default_cooldown_ms(),
            debounce_ms: default_serial_debounce_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            authorized_ports: Vec::new(),
            enabled: true,
        }
    }
}

impl SerialConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }
}

/// Stream configuration shared by both channels
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Channel activated at start-up
    #[serde(default)]
    pub channel: ChannelKind,

    #[serde(default)]
    pub frame_format: FrameFormat,

    /// Header brightness byte (0..=100)
    #[serde(default = "default_brightness")]
    pub brightness: u8,

    /// Header theme byte
    #[serde(default)]
    pub theme: u8,

    /// Start streaming immediately
    #[serde(default = "default_true")]
    pub send_data: bool,

    /// Target time between frames
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

fn default_brightness() -> u8 {
    100
}

fn default_frame_interval_ms() -> u64 {
    33
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            channel: ChannelKind::default(),
            frame_format: FrameFormat::default(),
            brightness: default_brightness(),
            theme: 0,
            send_data: true,
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

impl TransportConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter (trace, debug, info, warn, error), `RUST_LOG` wins
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    ///
    /// # Example
    /// ```no_run
    /// use tarang_io::config::Config;
    ///
    /// let config = Config::load("tarang.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without validation
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let screen = &self.grid.screen;
        if screen.width == 0 || screen.height == 0 {
            return Err(Error::Config(format!(
                "screen size must be non-zero, got {}x{}",
                screen.width, screen.height
            )));
        }
        let aspect = self.grid.aspect_ratio;
        if !(aspect.is_finite() && aspect > 0.0 && aspect <= MAX_ASPECT_RATIO) {
            return Err(Error::Config(format!(
                "aspect_ratio must be in (0, {}], got {}",
                MAX_ASPECT_RATIO, aspect
            )));
        }
        let longest = screen.width.max(screen.height);
        if self.grid.gap >= longest {
            return Err(Error::Config(format!(
                "gap must be below the longest screen side ({}), got {}",
                longest, self.grid.gap
            )));
        }
        if !(self.grid.scale.is_finite() && self.grid.scale >= 0.0) {
            return Err(Error::Config(format!(
                "scale must be finite and non-negative, got {}",
                self.grid.scale
            )));
        }
        if let Some(radius) = screen.boundary_radius {
            if !(radius.is_finite() && radius >= 0.0) {
                return Err(Error::Config(format!(
                    "boundary_radius must be finite and non-negative, got {}",
                    radius
                )));
            }
        }
        if !(self.field.max_value.is_finite() && self.field.max_value > 0.0) {
            return Err(Error::Config(format!(
                "field.max_value must be positive, got {}",
                self.field.max_value
            )));
        }
        if self.transport.brightness > 100 {
            return Err(Error::Config(format!(
                "brightness must be 0..=100, got {}",
                self.transport.brightness
            )));
        }
        if self.socket.address.is_empty() {
            return Err(Error::Config("socket.address is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldMode;
    use crate::grid::ScreenShape;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.grid.target_cell_count, 341);
        assert_eq!(config.serial.baud_rate, 250_000);
        assert_eq!(config.socket.max_retries, 3);
        assert_eq!(config.socket.debounce(), Duration::from_millis(500));
        assert_eq!(config.serial.debounce(), Duration::from_millis(100));
        assert_eq!(config.transport.channel, ChannelKind::Socket);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_serialization() {
        let toml_string = toml::to_string_pretty(&Config::default()).unwrap();

        assert!(toml_string.contains("[grid]"));
        assert!(toml_string.contains("[grid.screen]"));
        assert!(toml_string.contains("[field]"));
        assert!(toml_string.contains("[socket]"));
        assert!(toml_string.contains("[serial]"));
        assert!(toml_string.contains("[transport]"));
        assert!(toml_string.contains("baud_rate = 250000"));
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[grid]
target_cell_count = 200
allow_cut = 0

[grid.screen]
width = 320
height = 240
shape = "rectangular"

[field]
mode = "Vorticity"
max_value = 4.0

[serial]
authorized_ports = ["/dev/ttyACM0", "/dev/ttyUSB1"]

[transport]
channel = "network"
frame_format = "legacy"

[logging]
level = "debug"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.grid.target_cell_count, 200);
        assert_eq!(config.grid.allow_cut, 0);
        assert_eq!(config.grid.gap, 1);
        assert_eq!(config.grid.screen.shape, ScreenShape::Rectangular);
        assert_eq!(config.field.mode, FieldMode::Vorticity);
        assert_eq!(config.serial.authorized_ports.len(), 2);
        assert_eq!(config.transport.channel, ChannelKind::Socket);
        assert_eq!(config.transport.frame_format, FrameFormat::Legacy);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.socket.address, "127.0.0.1:5501");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.transport.brightness, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.field.max_value = 0.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.transport.brightness = 101;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.grid.screen.width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_degenerate_grid() {
        let mut config = Config::default();
        config.grid.aspect_ratio = 1e10;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.grid.gap = u32::MAX;
        assert!(config.validate().is_err());

        for scale in [f32::INFINITY, f32::NAN, -1.0] {
            let mut config = Config::default();
            config.grid.scale = scale;
            assert!(config.validate().is_err(), "scale {}", scale);
        }

        for radius in [f32::INFINITY, f32::NAN, -5.0] {
            let mut config = Config::default();
            config.grid.screen.boundary_radius = Some(radius);
            assert!(config.validate().is_err(), "radius {}", radius);
        }

        // Zero scale is legal and simply yields an empty grid
        let mut config = Config::default();
        config.grid.scale = 0.0;
        config.grid.aspect_ratio = MAX_ASPECT_RATIO;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bundled_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tarang.toml");
        let config = Config::load(path).unwrap();
        let defaults = Config::default();

        assert_eq!(config.grid, defaults.grid);
        assert_eq!(config.field, defaults.field);
        assert_eq!(config.socket.address, defaults.socket.address);
        assert_eq!(config.serial.cooldown_ms, defaults.serial.cooldown_ms);
        assert_eq!(config.transport.frame_interval_ms, defaults.transport.frame_interval_ms);
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("tarang-config-{}.toml", std::process::id()));
        let mut config = Config::default();
        config.serial.authorized_ports.push("/dev/ttyACM0".to_string());
        config.to_file(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.serial.authorized_ports, vec!["/dev/ttyACM0".to_string()]);
        let _ = fs::remove_file(&path);
    }
}
