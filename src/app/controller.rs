//! Signal controller: the hexagonal core.
//!
//! [`SignalController`] owns the phase machine, the safety supervisor and
//! the shared context.  It exposes a hardware-agnostic API: all I/O flows
//! through port traits injected at call sites, so the whole controller is
//! testable with mock adapters.
//!
//! ```text
//!   DemandPort ──▶ ┌─────────────────────────┐ ──▶ EventSink
//!                  │    SignalController     │
//! SignalHeadPort ◀─│  FSM · Safety · Modes   │ ◀── HeartbeatMonitor
//!                  └─────────────────────────┘
//! ```
//!
//! ## Output arbitration (per tick)
//!
//! 1. Auto: the phase lamps.  Manual: the operator's command.
//! 2. Offline with `AllRedHold`: Red/Red regardless of mode.
//! 3. Conflict monitor: a pair with two proceed colours becomes Red/Red.

use std::sync::Arc;

use log::{info, warn};

use crate::config::{FailSafePolicy, SystemConfig, TimingProfile};
use crate::error::{CommandError, Error, Result};
use crate::fsm::context::{DemandContext, FsmContext};
use crate::fsm::states::build_phase_table;
use crate::fsm::{Fsm, Phase};
use crate::liveness::{HeartbeatMonitor, LivenessTransition};
use crate::safety::{SafetyFault, SafetySupervisor};
use crate::scheduler::PeakWindow;
use crate::signal::{Approach, Color, ManualCommand, OperatingMode};

use super::commands::AppCommand;
use super::events::{AppEvent, SignalState};
use super::ports::{ConfigPort, DemandPort, EventSink, SignalHeadPort, StoragePort, TimePort};
use super::snapshot::PhaseSnapshot;

/// Control ticks between the last config change and the auto-save.
const AUTO_SAVE_DELAY_TICKS: u64 = 5;

// ───────────────────────────────────────────────────────────────
// SignalController
// ───────────────────────────────────────────────────────────────

pub struct SignalController {
    fsm: Fsm,
    ctx: FsmContext,
    safety: SafetySupervisor,
    liveness: Arc<HeartbeatMonitor>,
    config: SystemConfig,
    mode: OperatingMode,
    /// Present only while in Manual.
    manual: Option<ManualCommand>,
    peak_override: bool,
    /// Pair last driven to the heads.
    outputs: (Color, Color),
    fail_safe_active: bool,
    tick_count: u64,
    config_dirty: bool,
    dirty_since_tick: u64,
    last_snapshot: Option<PhaseSnapshot>,
}

impl SignalController {
    /// Construct the controller from configuration.
    ///
    /// Does **not** start the phase machine; call [`start`](Self::start)
    /// or [`restore`](Self::restore) next.
    pub fn new(config: SystemConfig, liveness: Arc<HeartbeatMonitor>) -> Self {
        liveness.set_timeout_ms(config.online_timeout_ms);
        let ctx = FsmContext::new(config.timing);
        let fsm = Fsm::new(build_phase_table(), Phase::Approach1Green);

        Self {
            fsm,
            ctx,
            safety: SafetySupervisor::new(),
            liveness,
            config,
            mode: OperatingMode::Auto,
            manual: None,
            peak_override: false,
            outputs: (Color::Red, Color::Red),
            fail_safe_active: false,
            tick_count: 0,
            config_dirty: false,
            dirty_since_tick: 0,
            last_snapshot: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start a fresh cycle in `Approach1Green`.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        self.after_start(sink);
    }

    /// Continue the cycle from a persisted snapshot.
    pub fn restore(&mut self, snapshot: PhaseSnapshot, sink: &mut impl EventSink) {
        self.fsm
            .resume(snapshot.phase, snapshot.remaining, &mut self.ctx);
        self.last_snapshot = Some(snapshot);
        self.after_start(sink);
    }

    fn after_start(&mut self, sink: &mut impl EventSink) {
        let online = self.liveness.is_online();
        self.outputs = self.requested_outputs(online);
        sink.emit(&AppEvent::Started {
            phase: self.fsm.current_phase(),
            remaining: self.ctx.clock.remaining(),
        });
        info!(
            "SignalController started in {} ({}s)",
            self.fsm.current_phase(),
            self.ctx.clock.remaining()
        );

        if !online && self.config.fail_safe != FailSafePolicy::RunBlind {
            self.fail_safe_active = true;
            warn!("No heartbeat yet: fail-safe {:?} engaged", self.config.fail_safe);
            sink.emit(&AppEvent::FailSafeEngaged(self.config.fail_safe));
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: sample demand → advance phase → arbitrate
    /// outputs → safety → heads.
    pub fn tick(
        &mut self,
        demand: &mut impl DemandPort,
        heads: &mut impl SignalHeadPort,
        time: &impl TimePort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;

        // 1. Demand sample for this cycle
        let peak_active = self.peak_override || self.in_peak_window(time.minute_of_day());
        self.ctx.demand = DemandContext::from_inputs(demand.sample(), peak_active);

        // 2. Phase machine (frozen in Manual and, unless running blind, offline)
        let online = self.liveness.is_online();
        let cycle_runs = online || self.config.fail_safe == FailSafePolicy::RunBlind;
        if self.mode == OperatingMode::Auto && cycle_runs {
            let from = self.fsm.current_phase();
            if let Some(to) = self.fsm.tick(&mut self.ctx) {
                sink.emit(&AppEvent::PhaseChanged {
                    from,
                    to,
                    duration: self.ctx.clock.duration(),
                });
            }
        }

        // 3. Output arbitration + safety
        let requested = self.requested_outputs(online);
        let prev_faults = self.safety.faults();
        let faults = self.safety.evaluate(requested, online);
        let lights = if self.safety.has_fault(SafetyFault::ConflictingOutputs) {
            (Color::Red, Color::Red)
        } else {
            requested
        };

        if faults & !prev_faults != 0 {
            warn!("Safety fault! flags=0b{:08b}", faults);
            sink.emit(&AppEvent::FaultDetected(faults));
        } else if faults == 0 && prev_faults != 0 {
            sink.emit(&AppEvent::FaultCleared);
        }

        // 4. Drive the heads
        heads.set_heads(lights.0, lights.1);
        self.outputs = lights;

        sink.emit(&AppEvent::Telemetry(self.state()));
    }

    /// Re-derive liveness and apply the fail-safe policy on edges.
    pub fn evaluate_liveness(
        &mut self,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Option<LivenessTransition> {
        let transition = self.liveness.evaluate(now_ms)?;
        match transition {
            LivenessTransition::WentOnline => {
                sink.emit(&AppEvent::LivenessChanged { online: true });
                if self.fail_safe_active {
                    self.fail_safe_active = false;
                    info!("Fail-safe released, resuming {}", self.fsm.current_phase());
                    sink.emit(&AppEvent::FailSafeReleased);
                }
            }
            LivenessTransition::WentOffline { .. } => {
                sink.emit(&AppEvent::LivenessChanged { online: false });
                if self.config.fail_safe != FailSafePolicy::RunBlind {
                    self.fail_safe_active = true;
                    if let Err(e) = self.liveness.check(now_ms) {
                        warn!("Fail-safe {:?} engaged: {}", self.config.fail_safe, e);
                    }
                    sink.emit(&AppEvent::FailSafeEngaged(self.config.fail_safe));
                }
            }
        }
        Some(transition)
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply an external command.  A rejected command changes nothing and
    /// is reported through `sink` as well as the return value.
    pub fn handle_command(&mut self, cmd: AppCommand, sink: &mut impl EventSink) -> Result<()> {
        let prev_mode = self.mode;
        let result = match cmd {
            AppCommand::SetMode(mode) => {
                self.set_mode(mode);
                Ok(())
            }
            AppCommand::SetManualCommand(command) => self.set_manual_command(command),
            AppCommand::SetManualLight { approach, color } => {
                self.set_manual_light(approach, color)
            }
            AppCommand::SetPeakOverride(active) => {
                self.set_peak_override(active);
                Ok(())
            }
            AppCommand::SaveTimingProfile(profile) => self.save_timing_profile(profile),
            AppCommand::SavePeakWindow(window) => self.save_peak_window(window),
        };

        match result {
            Ok(()) => {
                if self.mode != prev_mode {
                    sink.emit(&AppEvent::ModeChanged {
                        from: prev_mode,
                        to: self.mode,
                    });
                }
                if matches!(
                    cmd,
                    AppCommand::SaveTimingProfile(_) | AppCommand::SavePeakWindow(_)
                ) {
                    sink.emit(&AppEvent::ConfigApplied);
                }
            }
            Err(e) => {
                warn!("Command {:?} rejected: {}", cmd, e);
                sink.emit(&AppEvent::CommandRejected(e));
            }
        }
        result
    }

    /// Switch mode; takes effect on the next tick.
    ///
    /// Entering Manual seeds the manual command from the lamps actually
    /// driven (Red/Red under an all-red hold), so the heads do not jump.  Leaving Manual discards it and the
    /// frozen phase resumes where it stopped.
    pub fn set_mode(&mut self, mode: OperatingMode) {
        if mode == self.mode {
            return;
        }
        self.manual = match mode {
            OperatingMode::Manual => {
                let (light1, light2) = self.outputs;
                Some(ManualCommand::new(light1, light2))
            }
            OperatingMode::Auto => None,
        };
        info!(
            "Mode {} -> {} (phase {} frozen at {}s)",
            self.mode,
            mode,
            self.fsm.current_phase(),
            self.ctx.clock.remaining()
        );
        self.mode = mode;
    }

    pub fn set_manual_command(&mut self, command: ManualCommand) -> Result<()> {
        if self.mode != OperatingMode::Manual {
            return Err(CommandError::NotInManualMode.into());
        }
        if command.is_conflicting() {
            return Err(CommandError::ConflictingLights {
                light1: command.light1,
                light2: command.light2,
            }
            .into());
        }
        info!("Manual lights {}/{}", command.light1, command.light2);
        self.manual = Some(command);
        Ok(())
    }

    /// Change one head, keeping the other as currently commanded.
    pub fn set_manual_light(&mut self, approach: Approach, color: Color) -> Result<()> {
        let current = match (self.mode, self.manual) {
            (OperatingMode::Manual, Some(cmd)) => cmd,
            (OperatingMode::Manual, None) => ManualCommand::ALL_RED,
            (OperatingMode::Auto, _) => return Err(CommandError::NotInManualMode.into()),
        };
        self.set_manual_command(current.with(approach, color))
    }

    pub fn set_peak_override(&mut self, active: bool) {
        if active != self.peak_override {
            info!("Peak override {}", if active { "on" } else { "off" });
        }
        self.peak_override = active;
    }

    /// Adopt a new timing profile.  The running countdown is untouched;
    /// new durations apply from the next phase entry.
    pub fn save_timing_profile(&mut self, profile: TimingProfile) -> Result<()> {
        profile.validate()?;
        self.ctx.timing = profile;
        self.config.timing = profile;
        self.mark_config_dirty();
        info!("Timing profile saved: {:?}", profile);
        Ok(())
    }

    pub fn save_peak_window(&mut self, window: Option<PeakWindow>) -> Result<()> {
        if window.is_some_and(|w| !w.is_valid()) {
            return Err(Error::InvalidCommand(CommandError::OutOfRange(
                "peak window bounds must be 00:00-23:59",
            )));
        }
        self.config.peak_window = window;
        self.mark_config_dirty();
        info!("Peak window saved: {:?}", window);
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// The authoritative state tuple.
    pub fn state(&self) -> SignalState {
        SignalState {
            phase: self.fsm.current_phase(),
            light1: self.outputs.0,
            light2: self.outputs.1,
            remaining: self.ctx.clock.remaining(),
            mode: self.mode,
            online: self.liveness.is_online(),
            peak_active: self.ctx.demand.peak_active,
        }
    }

    pub fn phase(&self) -> Phase {
        self.fsm.current_phase()
    }

    pub fn remaining(&self) -> u32 {
        self.ctx.clock.remaining()
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn manual_command(&self) -> Option<ManualCommand> {
        self.manual
    }

    /// Last-known-good timing profile.
    pub fn timing(&self) -> TimingProfile {
        self.ctx.timing
    }

    pub fn peak_window(&self) -> Option<PeakWindow> {
        self.config.peak_window
    }

    pub fn peak_override(&self) -> bool {
        self.peak_override
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn is_fail_safe_active(&self) -> bool {
        self.fail_safe_active
    }

    /// Current active fault bitmask (0 = no faults).
    pub fn fault_flags(&self) -> u8 {
        self.safety.faults()
    }

    /// Total control ticks executed since start.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn liveness(&self) -> &Arc<HeartbeatMonitor> {
        &self.liveness
    }

    // ── Persistence ───────────────────────────────────────────

    pub fn snapshot(&self) -> PhaseSnapshot {
        PhaseSnapshot {
            phase: self.fsm.current_phase(),
            remaining: self.ctx.clock.remaining(),
        }
    }

    /// Write the phase snapshot if it differs from the last one written.
    /// Returns `true` if a write happened.
    pub fn persist_if_changed(&mut self, storage: &mut impl StoragePort) -> Result<bool> {
        let snap = self.snapshot();
        if self.last_snapshot == Some(snap) {
            return Ok(false);
        }
        snap.store(storage)?;
        self.last_snapshot = Some(snap);
        Ok(true)
    }

    // ── Config dirty-flag management ──────────────────────────

    /// Mark the config as modified.  Each change restarts the save delay.
    pub fn mark_config_dirty(&mut self) {
        self.config_dirty = true;
        self.dirty_since_tick = self.tick_count;
    }

    /// Save once the config has been stable for 5 s.
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        let ticks_since_dirty = self.tick_count.saturating_sub(self.dirty_since_tick);
        if ticks_since_dirty < AUTO_SAVE_DELAY_TICKS {
            return false;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config auto-saved");
                true
            }
            Err(e) => {
                warn!("Config auto-save failed: {}", e);
                false
            }
        }
    }

    /// Force-save if dirty (call before shutdown).
    pub fn force_save_if_dirty(&mut self, storage: &impl ConfigPort) {
        if !self.config_dirty {
            return;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config force-saved before shutdown");
            }
            Err(e) => {
                warn!("Config force-save failed: {}", e);
            }
        }
    }

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }

    // ── Internal ──────────────────────────────────────────────

    fn in_peak_window(&self, minute_of_day: Option<u16>) -> bool {
        match (self.config.peak_window, minute_of_day) {
            (Some(window), Some(minute)) => window.contains(minute),
            _ => false,
        }
    }

    fn requested_outputs(&self, online: bool) -> (Color, Color) {
        if !online && self.config.fail_safe == FailSafePolicy::AllRedHold {
            return (Color::Red, Color::Red);
        }
        match self.mode {
            OperatingMode::Auto => self.ctx.lights,
            OperatingMode::Manual => {
                let cmd = self.manual.unwrap_or(ManualCommand::ALL_RED);
                (cmd.light1, cmd.light2)
            }
        }
    }
}
