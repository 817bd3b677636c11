//! Status publisher.
//!
//! Implements [`EventSink`] by mirroring each telemetry snapshot into the
//! status fields of a [`FieldStore`] (see [`paths`]).  A field is written only
//! when its value differs from what was last published successfully.

use log::warn;

use crate::app::events::{AppEvent, SignalState};
use crate::app::ports::{EventSink, FieldStore};
use crate::fields::{FieldValue, paths};

const STATUS_FIELDS: usize = 7;

pub struct FieldPublisher<S> {
    store: S,
    last: [Option<FieldValue>; STATUS_FIELDS],
}

impl<S: FieldStore> FieldPublisher<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            last: Default::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Publish every changed status field.  Returns the number written.
    pub fn publish(&mut self, state: &SignalState) -> usize {
        let values: [(&str, FieldValue); STATUS_FIELDS] = [
            (paths::STATUS_PHASE, FieldValue::text(state.phase.as_str())),
            (paths::STATUS_LIGHT1, FieldValue::text(state.light1.as_str())),
            (paths::STATUS_LIGHT2, FieldValue::text(state.light2.as_str())),
            (paths::STATUS_TIMER, FieldValue::Number(f64::from(state.remaining))),
            (paths::STATUS_MODE, FieldValue::text(state.mode.as_str())),
            (paths::STATUS_ONLINE, FieldValue::Bool(state.online)),
            (paths::STATUS_PEAK, FieldValue::Bool(state.peak_active)),
        ];

        let mut written = 0;
        for (slot, (path, value)) in self.last.iter_mut().zip(values) {
            if slot.as_ref() == Some(&value) {
                continue;
            }
            match self.store.write(path, value.clone()) {
                Ok(()) => {
                    *slot = Some(value);
                    written += 1;
                }
                // Retried on the next snapshot.
                Err(e) => warn!("Status {path} not published: {e}"),
            }
        }
        written
    }
}

impl<S: FieldStore> EventSink for FieldPublisher<S> {
    fn emit(&mut self, event: &AppEvent) {
        if let AppEvent::Telemetry(state) = event {
            self.publish(state);
        }
    }
}
