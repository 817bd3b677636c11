//! Inter-task channel for transport field updates.
//!
//! Uses an `embassy-sync` bounded channel to bridge the field ingest task
//! (stdin reader, transport listener) with the synchronous control loop.
//! Updates are drained between ticks, so a tick always sees either the
//! old or the new value of a field, never a half-applied one.
//!
//! ```text
//! ┌──────────────┐  FieldUpdate  ┌──────────────┐
//! │ Ingest task  │──────────────▶│ Control loop │
//! └──────────────┘               └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};

use crate::fields::FieldUpdate;

/// Channel depth for inbound field updates.
pub const FIELD_DEPTH: usize = 16;

pub type FieldChannel = Channel<CriticalSectionRawMutex, FieldUpdate, FIELD_DEPTH>;

/// Inbound field channel: ingest task → control loop.
pub static FIELD_CHANNEL: FieldChannel = Channel::new();

/// Non-blocking send.  Hands the update back if the channel is full.
pub fn try_forward(channel: &FieldChannel, update: FieldUpdate) -> Result<(), FieldUpdate> {
    channel.try_send(update).map_err(|TrySendError::Full(u)| u)
}

/// Drain everything queued, oldest first.
pub fn drain(channel: &FieldChannel, mut f: impl FnMut(FieldUpdate)) -> usize {
    let mut n = 0;
    while let Ok(update) = channel.try_receive() {
        f(update);
        n += 1;
    }
    n
}
