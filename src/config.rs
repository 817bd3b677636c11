//! System configuration parameters
//!
//! All tunable parameters for the signal controller.  Loaded at start-up
//! through the [`ConfigPort`](crate::app::ports::ConfigPort) (or from a
//! JSON file by the host binary) and replaced only by explicit save
//! operations.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::scheduler::PeakWindow;

/// Control loop period.  One tick of the phase clock is one second.
pub const CONTROL_PERIOD_MS: u64 = 1000;

/// Longest any single phase may be configured to last (seconds).
pub const MAX_GREEN_SECS: u32 = 600;
/// Longest amber or all-red interval (seconds).
pub const MAX_CLEARANCE_SECS: u32 = 30;

/// Phase durations in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingProfile {
    pub normal_green: u32,
    pub peak_green: u32,
    pub rain_green: u32,
    pub amber: u32,
    pub all_red: u32,
    /// Floor applied to every green selection.
    #[serde(default)]
    pub min_green: Option<u32>,
}

impl Default for TimingProfile {
    fn default() -> Self {
        Self {
            normal_green: 5,
            peak_green: 10,
            rain_green: 7,
            amber: 2,
            all_red: 1,
            min_green: None,
        }
    }
}

impl TimingProfile {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_GREEN_SECS).contains(&self.normal_green) {
            return Err(ConfigError::ValidationFailed(
                "normal_green must be 1-600 s",
            ));
        }
        if !(1..=MAX_GREEN_SECS).contains(&self.peak_green) {
            return Err(ConfigError::ValidationFailed("peak_green must be 1-600 s"));
        }
        if !(1..=MAX_GREEN_SECS).contains(&self.rain_green) {
            return Err(ConfigError::ValidationFailed("rain_green must be 1-600 s"));
        }
        if !(1..=MAX_CLEARANCE_SECS).contains(&self.amber) {
            return Err(ConfigError::ValidationFailed("amber must be 1-30 s"));
        }
        // A zero all-red would remove the clearance interval entirely.
        if !(1..=MAX_CLEARANCE_SECS).contains(&self.all_red) {
            return Err(ConfigError::ValidationFailed("all_red must be 1-30 s"));
        }
        if let Some(floor) = self.min_green {
            if !(1..=MAX_GREEN_SECS).contains(&floor) {
                return Err(ConfigError::ValidationFailed("min_green must be 1-600 s"));
            }
        }
        Ok(())
    }
}

/// What the controller does with the lamps while liveness is lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailSafePolicy {
    /// Force both heads Red and freeze the cycle until liveness returns.
    #[default]
    AllRedHold,
    /// Freeze the cycle and keep showing the last outputs.
    Freeze,
    /// Keep cycling as if online.
    RunBlind,
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Phase timing ---
    pub timing: TimingProfile,
    /// Scheduled peak hours; `None` leaves peak to the manual override.
    #[serde(default)]
    pub peak_window: Option<PeakWindow>,

    // --- Liveness ---
    /// Heartbeat evaluation cadence (milliseconds)
    pub heartbeat_eval_interval_ms: u32,
    /// Heartbeat age beyond which the controller is considered offline (milliseconds)
    pub online_timeout_ms: u32,
    /// Lamp behaviour while offline
    #[serde(default)]
    pub fail_safe: FailSafePolicy,

    // --- Clock ---
    /// Offset of local time from UTC, used to evaluate the peak window
    #[serde(default)]
    pub utc_offset_minutes: i16,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            timing: TimingProfile::default(),
            peak_window: None,

            heartbeat_eval_interval_ms: 2_000, // 0.5 Hz
            online_timeout_ms: 15_000,
            fail_safe: FailSafePolicy::AllRedHold,

            utc_offset_minutes: 0,
        }
    }
}

impl SystemConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing.validate()?;
        if let Some(window) = self.peak_window {
            if !window.is_valid() {
                return Err(ConfigError::ValidationFailed(
                    "peak window bounds must be 00:00-23:59",
                ));
            }
        }
        if !(2_000..=10_000).contains(&self.heartbeat_eval_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "heartbeat_eval_interval_ms must be 2000-10000",
            ));
        }
        if !(5_000..=60_000).contains(&self.online_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "online_timeout_ms must be 5000-60000",
            ));
        }
        if self.heartbeat_eval_interval_ms >= self.online_timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "heartbeat evaluation must run more often than the online timeout",
            ));
        }
        if !(-14 * 60..=14 * 60).contains(&self.utc_offset_minutes) {
            return Err(ConfigError::ValidationFailed(
                "utc_offset_minutes must be within +/-14 h",
            ));
        }
        Ok(())
    }
}
