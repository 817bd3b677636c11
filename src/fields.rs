//! Transport field bridge.
//!
//! The dashboard and the controller share a path-addressed key-value
//! store.  Inputs live under `traffic/state/…` and `traffic/system/…`.
//! The controller publishes phase and lamps next to them as
//! `traffic/state/{current_phase,light1,light2}`, and the rest of its
//! state under `traffic/status/…`.
//!
//! ```text
//!   "traffic/state/yellow_delay=3"
//!            │  decode_line()
//!            ▼
//!      FieldUpdate { path, value }
//!            │  FieldBridge::apply()
//!            ▼
//!   merge into last-known-good ──▶ AppCommand ──▶ SignalController
//! ```
//!
//! Every field arrives on its own; there is no cross-field consistency.
//! A single timing field is merged into the current profile and the
//! whole profile is revalidated before it is adopted.

use core::str::FromStr;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::commands::AppCommand;
use crate::app::controller::SignalController;
use crate::app::ports::{DemandPort, EventSink, FieldError, FieldStore};
use crate::config::TimingProfile;
use crate::error::{CommandError, Error, Result};
use crate::fsm::context::DemandInputs;
use crate::scheduler::{PeakWindow, parse_clock_minutes};
use crate::signal::{Approach, Color, OperatingMode};

// ═══════════════════════════════════════════════════════════════
//  Field paths
// ═══════════════════════════════════════════════════════════════

pub mod paths {
    pub const MODE: &str = "traffic/state/mode";
    pub const MANUAL_LIGHT1: &str = "traffic/state/manualLight1";
    pub const MANUAL_LIGHT2: &str = "traffic/state/manualLight2";
    pub const PEAK_ACTIVE: &str = "traffic/state/peak_active";
    pub const RAIN: &str = "traffic/state/rain";
    pub const IR1: &str = "traffic/state/ir1";
    pub const IR2: &str = "traffic/state/ir2";
    pub const NORMAL_GREEN: &str = "traffic/state/normal_green_delay";
    pub const PEAK_GREEN: &str = "traffic/state/peak_green_delay";
    pub const RAIN_GREEN: &str = "traffic/state/rain_green_delay";
    pub const AMBER: &str = "traffic/state/yellow_delay";
    pub const ALL_RED: &str = "traffic/state/all_red_delay";
    pub const MIN_GREEN: &str = "traffic/state/min_green_delay";
    pub const PEAK_START: &str = "traffic/state/peak_start";
    pub const PEAK_END: &str = "traffic/state/peak_end";
    pub const HEARTBEAT: &str = "traffic/system/heartbeat_ms";

    // Phase and lamps are read by the dashboard from the state subtree;
    // the bridge never consumes them.
    pub const STATUS_PHASE: &str = "traffic/state/current_phase";
    pub const STATUS_LIGHT1: &str = "traffic/state/light1";
    pub const STATUS_LIGHT2: &str = "traffic/state/light2";
    pub const STATUS_TIMER: &str = "traffic/status/timer";
    pub const STATUS_MODE: &str = "traffic/status/mode";
    pub const STATUS_ONLINE: &str = "traffic/status/online";
    pub const STATUS_PEAK: &str = "traffic/status/peak_active";

    /// Every path the bridge consumes, in start-up sync order.  Timing
    /// and mode come before lights so manual lights land in Manual.
    pub const INPUTS: [&str; 16] = [
        NORMAL_GREEN,
        PEAK_GREEN,
        RAIN_GREEN,
        AMBER,
        ALL_RED,
        MIN_GREEN,
        PEAK_START,
        PEAK_END,
        PEAK_ACTIVE,
        RAIN,
        IR1,
        IR2,
        MODE,
        MANUAL_LIGHT1,
        MANUAL_LIGHT2,
        HEARTBEAT,
    ];
}

/// Final path segment, used to name a field in errors.
fn leaf(path: &'static str) -> &'static str {
    path.rsplit('/').next().unwrap_or(path)
}

// ═══════════════════════════════════════════════════════════════
//  Field values
// ═══════════════════════════════════════════════════════════════

/// Longest text scalar carried in a field.
pub const MAX_TEXT_LEN: usize = 32;
/// Longest field path.
pub const MAX_PATH_LEN: usize = 64;

/// A scalar stored at one path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(heapless::String<MAX_TEXT_LEN>),
}

impl FieldValue {
    /// Text value, truncated to [`MAX_TEXT_LEN`] bytes.
    pub fn text(s: &str) -> Self {
        let mut out = heapless::String::new();
        for c in s.chars() {
            if out.push(c).is_err() {
                break;
            }
        }
        Self::Text(out)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Whole seconds.  Negative or fractional values are out of range;
    /// anything that is not a number is stale.
    pub fn as_seconds(&self, field: &'static str) -> Result<u32> {
        let n = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::StaleConfiguration(field))?,
            Self::Null | Self::Bool(_) => return Err(Error::StaleConfiguration(field)),
        };
        if !n.is_finite() {
            return Err(Error::StaleConfiguration(field));
        }
        if n < 0.0 || n.fract() != 0.0 || n > f64::from(u32::MAX) {
            return Err(CommandError::OutOfRange(field).into());
        }
        Ok(n as u32)
    }

    /// Boolean flag; accepts `true/false`, `1/0` and `on/off`.
    pub fn as_flag(&self, field: &'static str) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Number(n) if *n == 0.0 => Ok(false),
            Self::Number(n) if *n == 1.0 => Ok(true),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" => Ok(true),
                "false" | "0" | "off" => Ok(false),
                _ => Err(Error::StaleConfiguration(field)),
            },
            _ => Err(Error::StaleConfiguration(field)),
        }
    }

    fn parse_text<T: FromStr>(&self, field: &'static str) -> Result<T> {
        let text = self.as_text().ok_or(Error::StaleConfiguration(field))?;
        text.parse()
            .map_err(|_| CommandError::UnknownValue(field).into())
    }
}

/// One field change delivered by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub path: heapless::String<MAX_PATH_LEN>,
    pub value: FieldValue,
}

/// Decode a `path=value` line.
///
/// The value is read as a JSON scalar when it parses as one (`12`,
/// `true`, `null`, `"GREEN"`); otherwise the raw text is taken verbatim,
/// so `mode=MANUAL` works without quotes.  An empty value is `Null`.
pub fn decode_line(line: &str) -> core::result::Result<FieldUpdate, FieldError> {
    let (path, raw) = line.split_once('=').ok_or(FieldError::Malformed)?;
    let path = path.trim();
    if path.is_empty() {
        return Err(FieldError::Malformed);
    }
    let path = heapless::String::try_from(path).map_err(|_| FieldError::Malformed)?;

    let raw = raw.trim();
    let value = if raw.is_empty() {
        FieldValue::Null
    } else {
        match serde_json::from_str::<FieldValue>(raw) {
            Ok(v) => v,
            Err(_) => {
                let text = heapless::String::try_from(raw).map_err(|_| FieldError::Malformed)?;
                FieldValue::Text(text)
            }
        }
    };
    Ok(FieldUpdate { path, value })
}

// ═══════════════════════════════════════════════════════════════
//  Bridge
// ═══════════════════════════════════════════════════════════════

/// Whether an update touched anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOutcome {
    Applied,
    /// Path is not one the controller consumes.
    Ignored,
}

/// Applies transport field updates to the controller and latches the
/// demand inputs the controller samples each cycle.
#[derive(Debug, Default)]
pub struct FieldBridge {
    demand: DemandInputs,
}

impl FieldBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn demand(&self) -> DemandInputs {
        self.demand
    }

    /// Apply one update.
    ///
    /// On error nothing changes: the controller keeps its last-known-good
    /// value for the field.
    pub fn apply(
        &mut self,
        update: &FieldUpdate,
        controller: &mut SignalController,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Result<FieldOutcome> {
        let result = self.dispatch(update, controller, now_ms, sink);
        match &result {
            Ok(FieldOutcome::Ignored) => debug!("Field {} ignored", update.path),
            Ok(FieldOutcome::Applied) => {}
            Err(e @ Error::StaleConfiguration(_)) => {
                warn!("Field {}: {}; keeping last-known-good", update.path, e)
            }
            Err(e) => warn!("Field {} rejected: {}", update.path, e),
        }
        result
    }

    /// Read every input path from `store` and apply what is there.
    /// Returns the number of fields applied.
    pub fn sync_from(
        &mut self,
        store: &impl FieldStore,
        controller: &mut SignalController,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> usize {
        let mut applied = 0;
        for path in paths::INPUTS {
            let value = match store.read(path) {
                Ok(v) => v,
                Err(FieldError::NotFound) => continue,
                Err(e) => {
                    warn!("Field {path}: read failed ({e}); keeping last-known-good");
                    continue;
                }
            };
            let Ok(path_buf) = heapless::String::try_from(path) else {
                continue;
            };
            let update = FieldUpdate {
                path: path_buf,
                value,
            };
            if let Ok(FieldOutcome::Applied) = self.apply(&update, controller, now_ms, sink) {
                applied += 1;
            }
        }
        info!("Field sync: {applied} fields applied");
        applied
    }

    fn dispatch(
        &mut self,
        update: &FieldUpdate,
        controller: &mut SignalController,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Result<FieldOutcome> {
        let value = &update.value;
        let cmd = match update.path.as_str() {
            paths::MODE => {
                let mode: OperatingMode = value.parse_text(leaf(paths::MODE))?;
                AppCommand::SetMode(mode)
            }
            paths::MANUAL_LIGHT1 => AppCommand::SetManualLight {
                approach: Approach::One,
                color: value.parse_text::<Color>(leaf(paths::MANUAL_LIGHT1))?,
            },
            paths::MANUAL_LIGHT2 => AppCommand::SetManualLight {
                approach: Approach::Two,
                color: value.parse_text::<Color>(leaf(paths::MANUAL_LIGHT2))?,
            },
            paths::PEAK_ACTIVE => {
                AppCommand::SetPeakOverride(value.as_flag(leaf(paths::PEAK_ACTIVE))?)
            }
            paths::RAIN => {
                self.demand.rain_detected = value.as_flag(leaf(paths::RAIN))?;
                return Ok(FieldOutcome::Applied);
            }
            paths::IR1 => {
                self.demand.presence1 = value.as_flag(leaf(paths::IR1))?;
                return Ok(FieldOutcome::Applied);
            }
            paths::IR2 => {
                self.demand.presence2 = value.as_flag(leaf(paths::IR2))?;
                return Ok(FieldOutcome::Applied);
            }
            paths::NORMAL_GREEN
            | paths::PEAK_GREEN
            | paths::RAIN_GREEN
            | paths::AMBER
            | paths::ALL_RED
            | paths::MIN_GREEN => {
                let profile = merge_timing(controller.timing(), update.path.as_str(), value)?;
                AppCommand::SaveTimingProfile(profile)
            }
            paths::PEAK_START | paths::PEAK_END => {
                let window = merge_window(controller.peak_window(), update.path.as_str(), value)?;
                AppCommand::SavePeakWindow(Some(window))
            }
            paths::HEARTBEAT => {
                if *value == FieldValue::Null {
                    return Err(Error::StaleConfiguration(leaf(paths::HEARTBEAT)));
                }
                controller.liveness().record_heartbeat(now_ms);
                return Ok(FieldOutcome::Applied);
            }
            _ => return Ok(FieldOutcome::Ignored),
        };
        controller.handle_command(cmd, sink)?;
        Ok(FieldOutcome::Applied)
    }
}

impl DemandPort for FieldBridge {
    fn sample(&mut self) -> DemandInputs {
        self.demand
    }
}

/// Copy of `current` with the one field at `path` replaced.
fn merge_timing(
    mut current: TimingProfile,
    path: &str,
    value: &FieldValue,
) -> Result<TimingProfile> {
    match path {
        paths::NORMAL_GREEN => current.normal_green = value.as_seconds(leaf(paths::NORMAL_GREEN))?,
        paths::PEAK_GREEN => current.peak_green = value.as_seconds(leaf(paths::PEAK_GREEN))?,
        paths::RAIN_GREEN => current.rain_green = value.as_seconds(leaf(paths::RAIN_GREEN))?,
        paths::AMBER => current.amber = value.as_seconds(leaf(paths::AMBER))?,
        paths::ALL_RED => current.all_red = value.as_seconds(leaf(paths::ALL_RED))?,
        paths::MIN_GREEN => {
            // 0 switches the floor off.
            let floor = value.as_seconds(leaf(paths::MIN_GREEN))?;
            current.min_green = (floor > 0).then_some(floor);
        }
        _ => {}
    }
    Ok(current)
}

/// Copy of `current` with one bound replaced.  With no window yet, the
/// other bound starts equal, which is an empty window.
fn merge_window(current: Option<PeakWindow>, path: &str, value: &FieldValue) -> Result<PeakWindow> {
    let field = if path == paths::PEAK_START {
        leaf(paths::PEAK_START)
    } else {
        leaf(paths::PEAK_END)
    };
    let text = value.as_text().ok_or(Error::StaleConfiguration(field))?;
    let minute = parse_clock_minutes(text).ok_or(CommandError::OutOfRange(field))?;

    let mut window = current.unwrap_or(PeakWindow::new(minute, minute));
    if path == paths::PEAK_START {
        window.start_minute = minute;
    } else {
        window.end_minute = minute;
    }
    Ok(window)
}
