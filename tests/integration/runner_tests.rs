//! Scheduler + ControlLoop integration: cadence, liveness evaluation and
//! persistence driven the way the host binary drives them.

use trafficpilot::app::commands::AppCommand;
use trafficpilot::app::events::AppEvent;
use trafficpilot::app::ports::TimePort;
use trafficpilot::app::runner::ControlLoop;
use trafficpilot::app::snapshot::PhaseSnapshot;
use trafficpilot::config::{SystemConfig, TimingProfile};
use trafficpilot::fsm::Phase;
use trafficpilot::scheduler::Scheduler;
use trafficpilot::signal::Color;

use super::mock_io::{MockStorage, Rig};

const STEP_MS: u64 = 100;

/// Advance the rig clock in 100 ms steps up to `until_ms`, running one
/// scheduler pass per step.  With `heartbeats`, a heartbeat lands on
/// every whole second.
fn run_until(
    rig: &mut Rig,
    sched: &mut Scheduler,
    storage: &mut MockStorage,
    until_ms: u64,
    heartbeats: bool,
) {
    while rig.clock.now_ms() < until_ms {
        rig.clock.advance_ms(STEP_MS);
        let now = rig.clock.now_ms();
        if heartbeats && now % 1_000 == 0 {
            rig.monitor.record_heartbeat(now);
        }
        let mut control = ControlLoop {
            controller: &mut rig.controller,
            demand: &mut rig.demand,
            heads: &mut rig.heads,
            time: &rig.clock,
            sink: &mut rig.sink,
            storage: &mut *storage,
        };
        sched.tick(now, &mut control);
    }
}

#[test]
fn control_ticks_once_per_second() {
    let config = SystemConfig::default();
    let mut rig = Rig::online(config.clone());
    let mut sched = Scheduler::for_controller(&config, 0);
    let mut storage = MockStorage::default();

    run_until(&mut rig, &mut sched, &mut storage, 10_000, true);

    assert_eq!(rig.controller.tick_count(), 10);
    assert_eq!(rig.heads.writes.len(), 10);
    assert_eq!(rig.controller.phase(), Phase::Approach2Green);
    assert_eq!(rig.controller.remaining(), 3);
    assert_eq!(rig.heads.last(), Some((Color::Red, Color::Green)));
}

#[test]
fn heartbeat_loss_seen_on_evaluation_cadence() {
    let config = SystemConfig::default();
    let mut rig = Rig::online(config.clone());
    let mut sched = Scheduler::for_controller(&config, 0);
    let mut storage = MockStorage::default();

    // Last heartbeat at t=0; 14 s is still inside the 15 s timeout.
    run_until(&mut rig, &mut sched, &mut storage, 15_900, false);
    assert!(rig.controller.state().online);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::LivenessChanged { .. })),
        0
    );

    // The next evaluation at 16 s sees the loss.
    run_until(&mut rig, &mut sched, &mut storage, 16_000, false);
    assert!(!rig.controller.state().online);
    assert!(rig.controller.is_fail_safe_active());
    assert_eq!(
        rig.sink
            .count(|e| *e == AppEvent::LivenessChanged { online: false }),
        1
    );
    assert_eq!(rig.heads.last(), Some((Color::Red, Color::Red)));
}

#[test]
fn snapshot_written_while_cycling_and_not_while_frozen() {
    let config = SystemConfig::default();
    let mut rig = Rig::online(config.clone());
    let mut sched = Scheduler::for_controller(&config, 0);
    let mut storage = MockStorage::default();

    run_until(&mut rig, &mut sched, &mut storage, 6_000, true);
    assert_eq!(storage.writes, 6);
    assert_eq!(
        PhaseSnapshot::load(&storage).unwrap(),
        Some(rig.controller.snapshot())
    );

    // Heartbeats stop; once the hold engages the snapshot stops moving.
    run_until(&mut rig, &mut sched, &mut storage, 30_000, false);
    assert!(rig.controller.is_fail_safe_active());
    let frozen_writes = storage.writes;
    run_until(&mut rig, &mut sched, &mut storage, 40_000, false);
    assert_eq!(storage.writes, frozen_writes);
}

#[test]
fn timing_change_auto_saved_after_quiet_period() {
    let config = SystemConfig::default();
    let mut rig = Rig::online(config.clone());
    let mut sched = Scheduler::for_controller(&config, 0);
    let mut storage = MockStorage::default();

    let profile = TimingProfile {
        normal_green: 9,
        ..TimingProfile::default()
    };
    rig.controller
        .handle_command(AppCommand::SaveTimingProfile(profile), &mut rig.sink)
        .unwrap();

    run_until(&mut rig, &mut sched, &mut storage, 4_000, true);
    assert!(storage.saved_configs.borrow().is_empty());
    assert!(rig.controller.is_config_dirty());

    run_until(&mut rig, &mut sched, &mut storage, 5_000, true);
    let saved = storage.saved_configs.borrow();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].timing, profile);
    assert!(!rig.controller.is_config_dirty());
}
