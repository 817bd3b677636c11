//! Unified error types for the signal controller.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform.  All variants are `Copy` so they
//! can be passed through the command path and event sinks without
//! allocation.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};
use crate::signal::Color;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A command or configuration value was rejected.  Nothing was applied.
    InvalidCommand(CommandError),
    /// A configuration field read from the transport was absent or
    /// malformed.  The last-known-good value stays in force.
    StaleConfiguration(&'static str),
    /// No heartbeat within the online timeout.
    LivenessLoss { silent_for_ms: u64 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCommand(e) => write!(f, "invalid command: {e}"),
            Self::StaleConfiguration(field) => {
                write!(f, "stale configuration: {field} absent or malformed")
            }
            Self::LivenessLoss { silent_for_ms } => {
                write!(f, "liveness lost: no heartbeat for {silent_for_ms} ms")
            }
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Manual light command issued while the controller is in Auto.
    NotInManualMode,
    /// Manual command would show a proceed colour on both approaches.
    ConflictingLights { light1: Color, light2: Color },
    /// A configuration value is outside its sane range.
    OutOfRange(&'static str),
    /// A value could not be interpreted (unknown colour, mode, ...).
    UnknownValue(&'static str),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInManualMode => write!(f, "manual override is not active"),
            Self::ConflictingLights { light1, light2 } => {
                write!(f, "conflicting lights {light1}/{light2}")
            }
            Self::OutOfRange(msg) => write!(f, "out of range: {msg}"),
            Self::UnknownValue(field) => write!(f, "unknown value for {field}"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::InvalidCommand(e)
    }
}

// ---------------------------------------------------------------------------
// Port error conversions
// ---------------------------------------------------------------------------

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::InvalidCommand(CommandError::OutOfRange(msg)),
            ConfigError::NotFound | ConfigError::Corrupted | ConfigError::IoError => {
                Self::StaleConfiguration("config")
            }
        }
    }
}

impl From<StorageError> for Error {
    fn from(_: StorageError) -> Self {
        Self::StaleConfiguration("storage")
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Controller-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
