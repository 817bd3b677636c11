//! Phase snapshot persisted for restart recovery.
//!
//! Only `(phase, remaining)` is kept.  Mode is not part of it: a
//! restarted controller always comes back in Auto.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{MAX_CLEARANCE_SECS, MAX_GREEN_SECS};
use crate::fsm::{Phase, PhaseKind};

use super::ports::{StorageError, StoragePort};

pub const SNAPSHOT_NAMESPACE: &str = "signal";
pub const SNAPSHOT_KEY: &str = "phase";

/// Postcard encoding of a snapshot is a 1-byte tag plus a varint.
const MAX_SNAPSHOT_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSnapshot {
    pub phase: Phase,
    pub remaining: u32,
}

impl PhaseSnapshot {
    /// `remaining` fits the longest duration the phase's kind can be
    /// configured to.
    pub fn is_plausible(&self) -> bool {
        let limit = match self.phase.kind() {
            PhaseKind::Green => MAX_GREEN_SECS,
            PhaseKind::Amber | PhaseKind::AllRed => MAX_CLEARANCE_SECS,
        };
        self.remaining <= limit
    }

    /// Read the stored snapshot.
    ///
    /// A missing key is `Ok(None)`.  An undecodable or implausible blob is
    /// logged and also treated as absent, so a corrupt store never blocks
    /// start-up.
    pub fn load(storage: &impl StoragePort) -> Result<Option<Self>, StorageError> {
        let mut buf = [0u8; MAX_SNAPSHOT_BYTES];
        let len = match storage.read(SNAPSHOT_NAMESPACE, SNAPSHOT_KEY, &mut buf) {
            Ok(len) => len,
            Err(StorageError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        match postcard::from_bytes::<Self>(&buf[..len]) {
            Ok(snap) if snap.is_plausible() => {
                info!("Snapshot: restored {} with {}s", snap.phase, snap.remaining);
                Ok(Some(snap))
            }
            Ok(snap) => {
                warn!("Snapshot: implausible remaining {}s, ignoring", snap.remaining);
                Ok(None)
            }
            Err(_) => {
                warn!("Snapshot: stored blob corrupted, ignoring");
                Ok(None)
            }
        }
    }

    pub fn store(&self, storage: &mut impl StoragePort) -> Result<(), StorageError> {
        let mut buf = [0u8; MAX_SNAPSHOT_BYTES];
        let bytes = postcard::to_slice(self, &mut buf).map_err(|_| StorageError::Full)?;
        storage.write(SNAPSHOT_NAMESPACE, SNAPSHOT_KEY, bytes)
    }
}
