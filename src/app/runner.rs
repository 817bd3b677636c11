//! Scheduler delegate that runs the controller's periodic work.
//!
//! A `ControlLoop` is a short-lived bundle of borrows: build one per
//! scheduler pass, hand it to [`Scheduler::tick`](crate::scheduler::Scheduler::tick),
//! drop it.  Between passes the caller is free to feed commands and field
//! updates to the controller.

use log::warn;

use crate::scheduler::TaskKind;

use super::controller::SignalController;
use super::ports::{
    ConfigPort, DemandPort, EventSink, SchedulerDelegate, SignalHeadPort, StoragePort, TimePort,
};

pub struct ControlLoop<'a, D, H, T, E, S> {
    pub controller: &'a mut SignalController,
    pub demand: &'a mut D,
    pub heads: &'a mut H,
    pub time: &'a T,
    pub sink: &'a mut E,
    /// Snapshot and config persistence.  One backend serves both ports.
    pub storage: &'a mut S,
}

impl<D, H, T, E, S> SchedulerDelegate for ControlLoop<'_, D, H, T, E, S>
where
    D: DemandPort,
    H: SignalHeadPort,
    T: TimePort,
    E: EventSink,
    S: StoragePort + ConfigPort,
{
    fn on_task_due(&mut self, kind: TaskKind, now_ms: u64) {
        match kind {
            TaskKind::ControlTick => {
                self.controller
                    .tick(self.demand, self.heads, self.time, self.sink);
                if let Err(e) = self.controller.persist_if_changed(self.storage) {
                    warn!("Snapshot write failed: {}", e);
                }
                self.controller.auto_save_if_needed(&*self.storage);
            }
            TaskKind::HeartbeatEval => {
                self.controller.evaluate_liveness(now_ms, self.sink);
            }
        }
    }
}
