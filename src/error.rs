//! Error types for TarangIO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// TarangIO error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown channel or control name
    #[error("Invalid channel: {0}")]
    InvalidChannel(String),

    /// Command value outside its valid range
    #[error("Invalid value {value} for command {command}")]
    InvalidCommand {
        /// Command name
        command: &'static str,
        /// Rejected value
        value: i32,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration file could not be interpreted
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse failure
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Link is not open
    #[error("Not connected")]
    NotConnected,

    /// A connect attempt is already running
    #[error("Connect already in progress")]
    ConnectInProgress,

    /// Serial connect attempted inside the cooldown window
    #[error("Connect cooldown active ({remaining_ms}ms remaining)")]
    CooldownActive {
        /// Time left before another attempt is allowed
        remaining_ms: u64,
    },

    /// Outbound frame does not fit the u16 length prefix
    #[error("Frame too large: {len} bytes (max 65535)")]
    FrameTooLarge {
        /// Total frame length that was requested
        len: usize,
    },

    /// No grid metadata has been published yet
    #[error("Grid metadata unavailable")]
    GridUnavailable,

    /// Malformed wire data
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON decode failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
