//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per
//! application event to the `log` facade.  The status publisher
//! implements the same trait; [`Tee`] fans one event out to both.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(s) => {
                debug!(
                    "TELEM | phase={} | {}/{} | remaining={}s | mode={} | online={} | peak={}",
                    s.phase, s.light1, s.light2, s.remaining, s.mode, s.online, s.peak_active,
                );
            }
            AppEvent::PhaseChanged { from, to, duration } => {
                info!("PHASE | {} -> {} ({}s)", from, to, duration);
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE  | {} -> {}", from, to);
            }
            AppEvent::LivenessChanged { online } => {
                if *online {
                    info!("LIVE  | online");
                } else {
                    warn!("LIVE  | offline");
                }
            }
            AppEvent::FailSafeEngaged(policy) => {
                warn!("SAFE  | fail-safe engaged ({:?})", policy);
            }
            AppEvent::FailSafeReleased => {
                info!("SAFE  | fail-safe released");
            }
            AppEvent::FaultDetected(flags) => {
                warn!("FAULT | detected, flags=0b{:08b}", flags);
            }
            AppEvent::FaultCleared => {
                info!("FAULT | all cleared");
            }
            AppEvent::CommandRejected(e) => {
                warn!("CMD   | rejected: {}", e);
            }
            AppEvent::ConfigApplied => {
                info!("CFG   | applied");
            }
            AppEvent::Started { phase, remaining } => {
                info!("START | phase={} remaining={}s", phase, remaining);
            }
        }
    }
}

/// Forwards every event to two sinks in order.
pub struct Tee<A, B>(pub A, pub B);

impl<A: EventSink, B: EventSink> EventSink for Tee<A, B> {
    fn emit(&mut self, event: &AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}
