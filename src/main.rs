//! TrafficPilot: host entry point.
//!
//! Runs the signal controller against simulated lamps, with transport
//! field updates typed (or piped) on stdin as `path=value` lines.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  GpioSignalHeads   LogEventSink + FieldPublisher   MemoryStore │
//! │  (SignalHead)      (EventSink)                     (Config+KV) │
//! │  HostClock         stdin reader ──▶ FIELD_CHANNEL ──▶ Bridge   │
//! │  (TimePort)                                        (Demand)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            SignalController (pure logic)               │    │
//! │  │  FSM · Safety · Modes · Liveness                       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (ControlTick 1 s · HeartbeatEval 2-10 s)            │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `trafficpilot [config.json]`, then e.g.
//!
//! ```text
//! traffic/system/heartbeat_ms=1
//! traffic/state/rain=true
//! traffic/state/mode=MANUAL
//! traffic/state/manualLight2=GREEN
//! quit
//! ```
//!
//! Until the first heartbeat arrives the controller is offline and the
//! configured fail-safe policy holds the heads.

#![deny(unused_must_use)]

use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::{info, warn};

use trafficpilot::adapters::field_publisher::FieldPublisher;
use trafficpilot::adapters::field_store::MemoryFieldStore;
use trafficpilot::adapters::gpio_heads::{GpioSignalHeads, HeadPins};
use trafficpilot::adapters::log_sink::{LogEventSink, Tee};
use trafficpilot::adapters::memory_store::MemoryStore;
use trafficpilot::adapters::time::HostClock;
use trafficpilot::app::controller::SignalController;
use trafficpilot::app::ports::{ConfigPort, TimePort};
use trafficpilot::app::runner::ControlLoop;
use trafficpilot::app::snapshot::PhaseSnapshot;
use trafficpilot::channels::{self, FIELD_CHANNEL};
use trafficpilot::config::SystemConfig;
use trafficpilot::fields::{FieldBridge, decode_line};
use trafficpilot::liveness::HeartbeatMonitor;
use trafficpilot::scheduler::Scheduler;

/// Upper bound on one idle sleep of the main loop.
const MAX_IDLE_MS: u64 = 50;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

fn load_config_file(path: &Path) -> Result<SystemConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: SystemConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

/// Read `path=value` lines from stdin and queue them for the control loop.
fn spawn_stdin_reader() -> Result<()> {
    std::thread::Builder::new()
        .name("field-ingest".into())
        .spawn(|| {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if line == "quit" {
                    break;
                }
                let mut update = match decode_line(line) {
                    Ok(u) => u,
                    Err(e) => {
                        warn!("stdin: {e}: {line}");
                        continue;
                    }
                };
                // Back-pressure: wait for the control loop to drain.
                while let Err(back) = channels::try_forward(&FIELD_CHANNEL, update) {
                    update = back;
                    std::thread::sleep(Duration::from_millis(5));
                }
            }
            info!("stdin closed, shutting down");
            SHUTDOWN.store(true, Ordering::Release);
        })
        .context("spawning stdin reader")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("╔══════════════════════════════════════╗");
    info!("║  TrafficPilot v{}                 ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 1. Configuration ──────────────────────────────────────
    let mut store = MemoryStore::new();
    let config = match std::env::args_os().nth(1) {
        Some(path) => load_config_file(Path::new(&path))?,
        None => store.load().map_err(|e| anyhow!("loading config: {e}"))?,
    };
    config
        .validate()
        .map_err(|e| anyhow!("invalid configuration: {e}"))?;
    info!("Config: {:?}", config);

    // ── 2. Adapters ───────────────────────────────────────────
    let clock = HostClock::new(config.utc_offset_minutes);
    let mut heads = GpioSignalHeads::new(HeadPins::simulated(), HeadPins::simulated());
    let mut sink = Tee(
        LogEventSink::new(),
        FieldPublisher::new(MemoryFieldStore::new()),
    );
    let mut bridge = FieldBridge::new();

    // ── 3. Controller ─────────────────────────────────────────
    let monitor = Arc::new(HeartbeatMonitor::new(config.online_timeout_ms));
    let mut controller = SignalController::new(config.clone(), monitor);
    match PhaseSnapshot::load(&store) {
        Ok(Some(snapshot)) => controller.restore(snapshot, &mut sink),
        Ok(None) => controller.start(&mut sink),
        Err(e) => {
            warn!("Snapshot unreadable ({e}), starting a fresh cycle");
            controller.start(&mut sink);
        }
    }

    // Pick up whatever the transport already holds before the first tick.
    bridge.sync_from(sink.1.store(), &mut controller, clock.now_ms(), &mut sink.0);

    let mut scheduler = Scheduler::for_controller(&config, clock.now_ms());
    info!("Scheduler: {} periodic tasks", scheduler.task_count());
    spawn_stdin_reader()?;
    let mut rejected_fields: u32 = 0;

    // ── 4. Main loop ──────────────────────────────────────────
    while !SHUTDOWN.load(Ordering::Acquire) {
        let now = clock.now_ms();

        // Commands and field updates land between ticks.
        channels::drain(&FIELD_CHANNEL, |update| {
            // Logged by the bridge; the loop never stops for a bad field.
            if bridge.apply(&update, &mut controller, now, &mut sink).is_err() {
                rejected_fields = rejected_fields.saturating_add(1);
            }
        });

        let mut control = ControlLoop {
            controller: &mut controller,
            demand: &mut bridge,
            heads: &mut heads,
            time: &clock,
            sink: &mut sink,
            storage: &mut store,
        };
        scheduler.tick(now, &mut control);

        let idle = scheduler.next_due_in(clock.now_ms()).unwrap_or(MAX_IDLE_MS);
        std::thread::sleep(Duration::from_millis(idle.min(MAX_IDLE_MS)));
    }

    controller.force_save_if_dirty(&store);
    info!(
        "Stopped after {} control ticks ({} field updates rejected)",
        controller.tick_count(),
        rejected_fields
    );
    Ok(())
}
