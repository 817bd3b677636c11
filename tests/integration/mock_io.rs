//! Mock adapters for integration tests.
//!
//! Records every head write and every event so tests can assert on the
//! full history without real lamps or a real transport.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use trafficpilot::adapters::time::ManualClock;
use trafficpilot::app::controller::SignalController;
use trafficpilot::app::events::AppEvent;
use trafficpilot::app::ports::{
    ConfigError, ConfigPort, DemandPort, EventSink, SignalHeadPort, StorageError, StoragePort,
    TimePort,
};
use trafficpilot::config::SystemConfig;
use trafficpilot::fsm::context::DemandInputs;
use trafficpilot::liveness::HeartbeatMonitor;
use trafficpilot::signal::Color;

// ── Demand ────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockDemand {
    pub inputs: DemandInputs,
}

impl DemandPort for MockDemand {
    fn sample(&mut self) -> DemandInputs {
        self.inputs
    }
}

// ── Heads ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockHeads {
    pub writes: Vec<(Color, Color)>,
}

#[allow(dead_code)]
impl MockHeads {
    pub fn last(&self) -> Option<(Color, Color)> {
        self.writes.last().copied()
    }
}

impl SignalHeadPort for MockHeads {
    fn set_heads(&mut self, light1: Color, light2: Color) {
        self.writes.push((light1, light2));
    }
}

// ── Events ────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Storage ───────────────────────────────────────────────────

/// Key-value store plus config port.  `ConfigPort::save` takes `&self`,
/// so saved configs are recorded through a `RefCell`.
#[derive(Default)]
pub struct MockStorage {
    data: HashMap<String, Vec<u8>>,
    pub writes: usize,
    pub saved_configs: RefCell<Vec<SystemConfig>>,
}

impl StoragePort for MockStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let v = self
            .data
            .get(&format!("{namespace}::{key}"))
            .ok_or(StorageError::NotFound)?;
        if v.len() > buf.len() {
            return Err(StorageError::Full);
        }
        buf[..v.len()].copy_from_slice(v);
        Ok(v.len())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.writes += 1;
        self.data
            .insert(format!("{namespace}::{key}"), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&format!("{namespace}::{key}"));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.data.contains_key(&format!("{namespace}::{key}"))
    }
}

impl ConfigPort for MockStorage {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        Ok(self
            .saved_configs
            .borrow()
            .last()
            .cloned()
            .unwrap_or_default())
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.saved_configs.borrow_mut().push(config.clone());
        Ok(())
    }
}

// ── Test rig ──────────────────────────────────────────────────

/// A started controller plus every mock it talks to.  Time advances one
/// control period per [`tick`](Rig::tick).
pub struct Rig {
    pub controller: SignalController,
    pub monitor: Arc<HeartbeatMonitor>,
    pub demand: MockDemand,
    pub heads: MockHeads,
    pub clock: ManualClock,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    /// Started controller with a fresh heartbeat, already online.
    pub fn online(config: SystemConfig) -> Self {
        let mut rig = Self::offline(config);
        rig.heartbeat();
        rig.evaluate();
        rig.sink.clear();
        rig
    }

    /// Started controller that has never seen a heartbeat.
    pub fn offline(config: SystemConfig) -> Self {
        let monitor = Arc::new(HeartbeatMonitor::new(config.online_timeout_ms));
        let mut controller = SignalController::new(config, Arc::clone(&monitor));
        let mut sink = RecordingSink::default();
        controller.start(&mut sink);
        Self {
            controller,
            monitor,
            demand: MockDemand::default(),
            heads: MockHeads::default(),
            clock: ManualClock::new(),
            sink,
        }
    }

    pub fn heartbeat(&mut self) {
        self.monitor.record_heartbeat(self.clock.now_ms());
    }

    pub fn evaluate(&mut self) {
        let now = self.clock.now_ms();
        self.controller.evaluate_liveness(now, &mut self.sink);
    }

    /// One control period: advance time by 1 s, then tick.
    pub fn tick(&mut self) {
        self.clock.advance_ms(1_000);
        self.controller.tick(
            &mut self.demand,
            &mut self.heads,
            &self.clock,
            &mut self.sink,
        );
    }

    /// `n` ticks with a heartbeat and evaluation before each.
    pub fn run_online(&mut self, n: u32) {
        for _ in 0..n {
            self.heartbeat();
            self.evaluate();
            self.tick();
        }
    }

    pub fn lights(&self) -> (Color, Color) {
        let s = self.controller.state();
        (s.light1, s.light2)
    }
}
