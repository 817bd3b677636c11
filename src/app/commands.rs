//! Inbound commands to the signal controller.
//!
//! These represent actions requested by the outside world (operator
//! dashboard, field bridge, host console) that the
//! [`SignalController`](super::controller::SignalController) validates and
//! applies between control ticks.

use crate::config::TimingProfile;
use crate::scheduler::PeakWindow;
use crate::signal::{Approach, Color, ManualCommand, OperatingMode};

/// Commands that external adapters can send into the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Switch between the automatic cycle and manual override.
    SetMode(OperatingMode),

    /// Replace both manual colours at once.  Rejected unless in Manual.
    SetManualCommand(ManualCommand),

    /// Replace one approach's manual colour.  Rejected unless in Manual.
    SetManualLight { approach: Approach, color: Color },

    /// Force peak timing on or off regardless of the peak window.
    SetPeakOverride(bool),

    /// Validate and adopt a new timing profile.
    SaveTimingProfile(TimingProfile),

    /// Validate and adopt a new peak window (`None` disables it).
    SavePeakWindow(Option<PeakWindow>),
}
