//! Discrete hardware commands
//!
//! Commands travel as two bytes, `[index, value]`:
//!
//! | Command    | Index | Values   | Channels        |
//! |------------|-------|----------|-----------------|
//! | Color      | 6     | 0..=255  | socket          |
//! | Brightness | 7     | 0..=100  | socket, serial  |
//! | Power      | 8     | 0..=100  | socket, serial  |

use crate::core::types::ChannelKind;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Hardware command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Color,
    Brightness,
    Power,
}

/// Wire index and valid range of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub index: u8,
    pub max: u8,
}

impl Command {
    pub const ALL: [Command; 3] = [Command::Color, Command::Brightness, Command::Power];

    pub fn spec(self) -> CommandSpec {
        match self {
            Command::Color => CommandSpec {
                name: "COLOR",
                index: 6,
                max: 255,
            },
            Command::Brightness => CommandSpec {
                name: "BRIGHTNESS",
                index: 7,
                max: 100,
            },
            Command::Power => CommandSpec {
                name: "POWER",
                index: 8,
                max: 100,
            },
        }
    }

    /// Whether the channel's firmware understands this command
    pub fn supported_on(self, channel: ChannelKind) -> bool {
        match self {
            Command::Color => channel == ChannelKind::Socket,
            Command::Brightness | Command::Power => true,
        }
    }

    /// Range-check a requested value
    pub fn validate(self, value: i32) -> Result<u8> {
        let spec = self.spec();
        if (0..=spec.max as i32).contains(&value) {
            Ok(value as u8)
        } else {
            Err(Error::InvalidCommand {
                command: spec.name,
                value,
            })
        }
    }

    /// Two-byte wire form
    pub fn encode(self, value: u8) -> [u8; 2] {
        [self.spec().index, value]
    }

    fn slot(self) -> usize {
        match self {
            Command::Color => 0,
            Command::Brightness => 1,
            Command::Power => 2,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().name)
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Command::ALL
            .iter()
            .copied()
            .find(|cmd| cmd.spec().name.eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidParameter(format!("unknown command: {}", s)))
    }
}

/// Drops repeats of the same value inside a time window.
///
/// State is per command; each channel owns its own debouncer.
#[derive(Debug, Clone)]
pub struct CommandDebouncer {
    window: Duration,
    last_sent: [Option<(u8, Instant)>; 3],
}

impl CommandDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_sent: [None; 3],
        }
    }

    /// Record the command unless it repeats the last value within the window.
    ///
    /// Returns `false` for a suppressed repeat.
    pub fn admit(&mut self, command: Command, value: u8, now: Instant) -> bool {
        let slot = &mut self.last_sent[command.slot()];
        if let Some((last_value, at)) = *slot {
            if last_value == value && now.saturating_duration_since(at) < self.window {
                return false;
            }
        }
        *slot = Some((value, now));
        true
    }

    /// Forget all recorded commands
    pub fn clear(&mut self) {
        self.last_sent = [None; 3];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_table() {
        assert_eq!(Command::Color.encode(200), [6, 200]);
        assert_eq!(Command::Brightness.encode(50), [7, 50]);
        assert_eq!(Command::Power.encode(0), [8, 0]);
    }

    #[test]
    fn test_validation_ranges() {
        assert_eq!(Command::Color.validate(255).unwrap(), 255);
        assert!(Command::Color.validate(256).is_err());
        assert!(Command::Brightness.validate(101).is_err());
        assert!(matches!(
            Command::Power.validate(-1),
            Err(Error::InvalidCommand { command: "POWER", value: -1 })
        ));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("BRIGHTNESS".parse::<Command>().unwrap(), Command::Brightness);
        assert_eq!("color".parse::<Command>().unwrap(), Command::Color);
        assert!("VOLUME".parse::<Command>().is_err());
    }

    #[test]
    fn test_color_is_socket_only() {
        assert!(Command::Color.supported_on(ChannelKind::Socket));
        assert!(!Command::Color.supported_on(ChannelKind::Serial));
        assert!(Command::Power.supported_on(ChannelKind::Serial));
    }

    #[test]
    fn test_debounce_window() {
        let mut debouncer = CommandDebouncer::new(Duration::from_millis(500));
        let t0 = Instant::now();

        assert!(debouncer.admit(Command::Brightness, 50, t0));
        assert!(!debouncer.admit(Command::Brightness, 50, t0 + Duration::from_millis(100)));
        // Different value goes through immediately
        assert!(debouncer.admit(Command::Brightness, 60, t0 + Duration::from_millis(120)));
        // Other commands have their own state
        assert!(debouncer.admit(Command::Power, 60, t0 + Duration::from_millis(130)));
        // Same value after the window
        assert!(debouncer.admit(Command::Brightness, 60, t0 + Duration::from_millis(700)));
    }
}
