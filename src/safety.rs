//! Safety supervisor.
//!
//! The supervisor runs **every control tick after the lamp outputs have
//! been decided and before they are driven**.  It keeps a fault bitmask
//! that the controller consults to override the outputs.
//!
//! ## Fault lifecycle
//!
//! 1. A condition triggers a fault (e.g. both heads showing proceed).
//! 2. The supervisor sets the corresponding bit.
//! 3. The controller drives Red/Red instead of the requested outputs.
//! 4. Each tick the supervisor re-evaluates; when the condition clears
//!    it unsets the bit and normal outputs resume.
//!
//! Several faults may be active at once; outputs stay forced until the
//! mask is empty.

use core::fmt;

use log::{error, info};

use crate::signal::Color;

/// Individual safety conditions, one bit each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SafetyFault {
    /// A proceed colour was requested on both approaches.
    ConflictingOutputs = 0,
    /// The heartbeat went silent past the online timeout.
    LivenessLost = 1,
}

impl SafetyFault {
    pub const fn mask(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConflictingOutputs => f.write_str("conflicting outputs"),
            Self::LivenessLost => f.write_str("liveness lost"),
        }
    }
}

/// Safety supervisor.
#[derive(Debug, Default)]
pub struct SafetySupervisor {
    /// Latched fault bitmask.
    faults: u8,
}

impl SafetySupervisor {
    pub fn new() -> Self {
        Self { faults: 0 }
    }

    /// Evaluate all conditions against the outputs about to be driven.
    /// Returns the updated fault bitmask.
    pub fn evaluate(&mut self, lights: (Color, Color), online: bool) -> u8 {
        let (l1, l2) = lights;
        self.eval_fault(
            SafetyFault::ConflictingOutputs,
            l1.is_proceed() && l2.is_proceed(),
        );
        self.eval_fault(SafetyFault::LivenessLost, !online);
        self.faults
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    /// True if **any** fault is active.
    pub fn has_faults(&self) -> bool {
        self.faults != 0
    }

    /// Check if a specific fault is active.
    pub fn has_fault(&self, fault: SafetyFault) -> bool {
        self.faults & fault.mask() != 0
    }

    fn eval_fault(&mut self, fault: SafetyFault, condition: bool) {
        if condition {
            if self.faults & fault.mask() == 0 {
                error!("SAFETY FAULT SET: {fault}");
            }
            self.faults |= fault.mask();
        } else {
            if self.faults & fault.mask() != 0 {
                info!("SAFETY FAULT CLEARED: {fault}");
            }
            self.faults &= !fault.mask();
        }
    }
}
