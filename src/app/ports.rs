//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SignalController (domain)
//! ```
//!
//! Driven adapters (demand inputs, signal heads, event sinks, storage,
//! transport fields, clocks) implement these traits.  The
//! [`SignalController`](super::controller::SignalController) consumes them
//! via generics, so the domain core never touches I/O directly.
//!
//! All port errors are typed; callers must handle every variant explicitly.

use core::fmt;

use crate::config::SystemConfig;
use crate::fields::FieldValue;
use crate::fsm::context::DemandInputs;
use crate::scheduler::TaskKind;
use crate::signal::Color;

// ───────────────────────────────────────────────────────────────
// Demand port (driven adapter: detectors → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the controller samples demand once per cycle.
pub trait DemandPort {
    fn sample(&mut self) -> DemandInputs;
}

// ───────────────────────────────────────────────────────────────
// Signal head port (driven adapter: domain → lamps)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the controller drives both heads every cycle.
pub trait SignalHeadPort {
    /// Show `light1` on approach 1 and `light2` on approach 2.
    fn set_heads(&mut self, light1: Color, light2: Color);

    /// Both heads Red.
    fn all_red(&mut self) {
        self.set_heads(Color::Red, Color::Red);
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / transport)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (log, status fields,
/// test recorders).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

pub trait TimePort {
    /// Monotonic milliseconds since an arbitrary origin.
    fn now_ms(&self) -> u64;

    /// Local minutes after midnight, `None` while wall-clock time is unknown.
    fn minute_of_day(&self) -> Option<u16>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate before persisting.  Invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], never clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ key-value store)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage (phase snapshot, misc blobs).
///
/// Keys are namespaced to prevent collisions between subsystems.  Writes
/// MUST be atomic: no partial value is ever observable.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Field store port (driven adapter: domain ↔ shared key-value database)
// ───────────────────────────────────────────────────────────────

/// Path-addressed scalar fields shared with the presentation layer.
///
/// There is no cross-field consistency: every field is read and written
/// on its own.
pub trait FieldStore {
    fn read(&self, path: &str) -> Result<FieldValue, FieldError>;

    fn write(&mut self, path: &str, value: FieldValue) -> Result<(), FieldError>;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from the controller)
// ───────────────────────────────────────────────────────────────

/// Callback the [`Scheduler`](crate::scheduler::Scheduler) invokes when a
/// periodic task comes due.  The scheduler itself knows nothing about
/// what the task does.
pub trait SchedulerDelegate {
    fn on_task_due(&mut self, kind: TaskKind, now_ms: u64);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage is full, or the caller's buffer is too small.
    Full,
    /// Generic I/O error.
    IoError,
}

/// Errors from [`FieldStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    /// Field has never been written.
    NotFound,
    /// Input could not be decoded into a field update.
    Malformed,
    /// Transport unreachable.
    Unavailable,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "field not found"),
            Self::Malformed => write!(f, "malformed field update"),
            Self::Unavailable => write!(f, "field store unavailable"),
        }
    }
}
