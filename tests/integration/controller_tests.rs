//! Integration tests for the SignalController → FSM → heads pipeline.
//!
//! Time is driven by a manual clock, one control period per tick, so
//! every scenario is deterministic.

use trafficpilot::app::commands::AppCommand;
use trafficpilot::app::controller::SignalController;
use trafficpilot::app::events::AppEvent;
use trafficpilot::app::snapshot::PhaseSnapshot;
use trafficpilot::config::{FailSafePolicy, SystemConfig, TimingProfile};
use trafficpilot::error::{CommandError, Error};
use trafficpilot::fsm::Phase;
use trafficpilot::signal::{Approach, Color, ManualCommand, OperatingMode};

use super::mock_io::{MockStorage, RecordingSink, Rig};

fn config_5_2_1() -> SystemConfig {
    SystemConfig {
        timing: TimingProfile {
            normal_green: 5,
            peak_green: 10,
            rain_green: 7,
            amber: 2,
            all_red: 1,
            min_green: None,
        },
        ..Default::default()
    }
}

// ── Automatic cycle ───────────────────────────────────────────

#[test]
fn end_to_end_cycle_5_2_1() {
    let mut rig = Rig::online(config_5_2_1());
    assert_eq!(rig.controller.phase(), Phase::Approach1Green);
    assert_eq!(rig.controller.remaining(), 5);

    // Phase after each of 16 ticks.
    let expected = [
        Phase::Approach1Green, // 4
        Phase::Approach1Green, // 3
        Phase::Approach1Green, // 2
        Phase::Approach1Green, // 1
        Phase::Approach1Amber, // expired -> amber 2
        Phase::Approach1Amber,
        Phase::AllRed1,
        Phase::Approach2Green,
        Phase::Approach2Green,
        Phase::Approach2Green,
        Phase::Approach2Green,
        Phase::Approach2Green,
        Phase::Approach2Amber,
        Phase::Approach2Amber,
        Phase::AllRed2,
        Phase::Approach1Green,
    ];
    for (i, phase) in expected.iter().enumerate() {
        rig.run_online(1);
        assert_eq!(rig.controller.phase(), *phase, "after tick {}", i + 1);
        assert_eq!(rig.lights(), phase.lights());
    }
    assert_eq!(rig.controller.remaining(), 5);

    let changes: Vec<(Phase, u32)> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::PhaseChanged { to, duration, .. } => Some((*to, *duration)),
            _ => None,
        })
        .collect();
    assert_eq!(
        changes,
        vec![
            (Phase::Approach1Amber, 2),
            (Phase::AllRed1, 1),
            (Phase::Approach2Green, 5),
            (Phase::Approach2Amber, 2),
            (Phase::AllRed2, 1),
            (Phase::Approach1Green, 5),
        ]
    );
}

#[test]
fn rain_lengthens_next_green() {
    let mut rig = Rig::online(config_5_2_1());
    rig.demand.inputs.rain_detected = true;
    rig.run_online(8); // 5 + 2 + 1: enters approach 2 green
    assert_eq!(rig.controller.phase(), Phase::Approach2Green);
    assert_eq!(rig.controller.remaining(), 7);
}

#[test]
fn peak_override_beats_rain() {
    let mut rig = Rig::online(config_5_2_1());
    rig.demand.inputs.rain_detected = true;
    rig.controller
        .handle_command(AppCommand::SetPeakOverride(true), &mut rig.sink)
        .unwrap();
    rig.run_online(8);
    assert_eq!(rig.controller.remaining(), 10);
    assert!(rig.controller.state().peak_active);
}

#[test]
fn presence_is_inert() {
    let mut rig = Rig::online(config_5_2_1());
    rig.demand.inputs.presence2 = true;
    rig.run_online(8);
    assert_eq!(rig.controller.remaining(), 5);
}

#[test]
fn timing_save_applies_from_next_entry() {
    let mut rig = Rig::online(config_5_2_1());
    rig.run_online(2);
    assert_eq!(rig.controller.remaining(), 3);

    let longer = TimingProfile {
        normal_green: 9,
        ..rig.controller.timing()
    };
    rig.controller
        .handle_command(AppCommand::SaveTimingProfile(longer), &mut rig.sink)
        .unwrap();
    assert_eq!(rig.controller.remaining(), 3, "running countdown untouched");

    rig.run_online(3 + 2 + 1);
    assert_eq!(rig.controller.phase(), Phase::Approach2Green);
    assert_eq!(rig.controller.remaining(), 9);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::ConfigApplied), 1);
}

// ── Manual override ───────────────────────────────────────────

#[test]
fn manual_freezes_phase_and_remaining() {
    let config = SystemConfig {
        timing: TimingProfile {
            normal_green: 10,
            ..config_5_2_1().timing
        },
        ..Default::default()
    };
    let mut rig = Rig::online(config);
    rig.run_online(3);
    assert_eq!(rig.controller.remaining(), 7);

    rig.controller
        .handle_command(AppCommand::SetMode(OperatingMode::Manual), &mut rig.sink)
        .unwrap();
    rig.run_online(20);
    assert_eq!(rig.controller.phase(), Phase::Approach1Green);
    assert_eq!(rig.controller.remaining(), 7);

    rig.controller
        .handle_command(AppCommand::SetMode(OperatingMode::Auto), &mut rig.sink)
        .unwrap();
    rig.run_online(1);
    assert_eq!(rig.controller.remaining(), 6);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::ModeChanged { .. })),
        2
    );
}

#[test]
fn manual_outputs_follow_the_operator() {
    let mut rig = Rig::online(config_5_2_1());
    rig.run_online(1);
    rig.controller.set_mode(OperatingMode::Manual);
    rig.run_online(1);
    // Seeded from the automatic lamps: no jump on entry.
    assert_eq!(rig.heads.last(), Some((Color::Green, Color::Red)));

    rig.controller
        .handle_command(
            AppCommand::SetManualCommand(ManualCommand::new(Color::Red, Color::Red)),
            &mut rig.sink,
        )
        .unwrap();
    rig.controller
        .handle_command(
            AppCommand::SetManualLight {
                approach: Approach::Two,
                color: Color::Green,
            },
            &mut rig.sink,
        )
        .unwrap();
    rig.run_online(1);
    assert_eq!(rig.heads.last(), Some((Color::Red, Color::Green)));
}

#[test]
fn conflicting_manual_command_rejected_without_change() {
    let mut rig = Rig::online(config_5_2_1());
    rig.run_online(1);
    rig.controller.set_mode(OperatingMode::Manual);
    let before = rig.controller.manual_command();

    let err = rig
        .controller
        .handle_command(
            AppCommand::SetManualLight {
                approach: Approach::Two,
                color: Color::Amber,
            },
            &mut rig.sink,
        )
        .unwrap_err();
    assert_eq!(
        err,
        Error::InvalidCommand(CommandError::ConflictingLights {
            light1: Color::Green,
            light2: Color::Amber,
        })
    );
    assert_eq!(rig.controller.manual_command(), before);
    rig.run_online(1);
    assert_eq!(rig.heads.last(), Some((Color::Green, Color::Red)));
}

#[test]
fn manual_light_rejected_in_auto() {
    let mut rig = Rig::online(config_5_2_1());
    let result = rig.controller.handle_command(
        AppCommand::SetManualLight {
            approach: Approach::One,
            color: Color::Red,
        },
        &mut rig.sink,
    );
    assert_eq!(
        result,
        Err(Error::InvalidCommand(CommandError::NotInManualMode))
    );
}

// ── Liveness / fail-safe ──────────────────────────────────────

#[test]
fn never_seen_heartbeat_holds_all_red() {
    let mut rig = Rig::offline(config_5_2_1());
    assert!(rig.controller.is_fail_safe_active());
    assert_eq!(
        rig.sink
            .count(|e| *e == AppEvent::FailSafeEngaged(FailSafePolicy::AllRedHold)),
        1
    );

    for _ in 0..10 {
        rig.tick();
        assert_eq!(rig.heads.last(), Some((Color::Red, Color::Red)));
    }
    assert_eq!(rig.controller.phase(), Phase::Approach1Green);
    assert_eq!(rig.controller.remaining(), 5);
    assert!(!rig.controller.state().online);
}

#[test]
fn heartbeat_loss_engages_and_releases_fail_safe() {
    let mut rig = Rig::online(config_5_2_1());
    rig.run_online(2);

    // Silence: evaluate every 2 s without heartbeats until offline.
    while rig.controller.state().online {
        rig.tick();
        rig.tick();
        rig.evaluate();
    }
    assert_eq!(
        rig.sink
            .count(|e| *e == AppEvent::LivenessChanged { online: false }),
        1
    );
    assert!(rig.controller.is_fail_safe_active());

    let frozen = (rig.controller.phase(), rig.controller.remaining());
    for _ in 0..5 {
        rig.tick();
        assert_eq!(rig.heads.last(), Some((Color::Red, Color::Red)));
    }
    assert_eq!((rig.controller.phase(), rig.controller.remaining()), frozen);

    // Heartbeat returns: the cycle resumes where it stopped.
    rig.heartbeat();
    rig.evaluate();
    assert_eq!(rig.sink.count(|e| *e == AppEvent::FailSafeReleased), 1);
    rig.tick();
    assert_eq!(rig.controller.phase(), frozen.0);
    assert_eq!(rig.controller.remaining(), frozen.1 - 1);
    assert_eq!(rig.lights(), frozen.0.lights());
}

#[test]
fn freeze_policy_keeps_lamps() {
    let config = SystemConfig {
        fail_safe: FailSafePolicy::Freeze,
        ..config_5_2_1()
    };
    let mut rig = Rig::offline(config);
    for _ in 0..10 {
        rig.tick();
    }
    assert_eq!(rig.heads.last(), Some((Color::Green, Color::Red)));
    assert_eq!(rig.controller.remaining(), 5);
}

#[test]
fn run_blind_keeps_cycling() {
    let config = SystemConfig {
        fail_safe: FailSafePolicy::RunBlind,
        ..config_5_2_1()
    };
    let mut rig = Rig::offline(config);
    assert!(!rig.controller.is_fail_safe_active());
    for _ in 0..5 {
        rig.tick();
    }
    assert_eq!(rig.controller.phase(), Phase::Approach1Amber);
}

#[test]
fn fail_safe_overrides_manual() {
    let mut rig = Rig::offline(config_5_2_1());
    rig.controller.set_mode(OperatingMode::Manual);
    rig.controller
        .set_manual_command(ManualCommand::new(Color::Green, Color::Red))
        .unwrap();
    rig.tick();
    assert_eq!(rig.heads.last(), Some((Color::Red, Color::Red)));
}

#[test]
fn manual_entered_during_hold_stays_red_when_heartbeat_returns() {
    let mut rig = Rig::offline(config_5_2_1());
    rig.tick();
    assert_eq!(rig.heads.last(), Some((Color::Red, Color::Red)));

    rig.controller
        .handle_command(AppCommand::SetMode(OperatingMode::Manual), &mut rig.sink)
        .unwrap();
    assert_eq!(
        rig.controller.manual_command(),
        Some(ManualCommand::ALL_RED)
    );

    rig.heartbeat();
    rig.evaluate();
    rig.tick();
    assert!(rig.controller.state().online);
    assert_eq!(rig.heads.last(), Some((Color::Red, Color::Red)));
    // The frozen phase is untouched.
    assert_eq!(rig.controller.phase(), Phase::Approach1Green);
    assert_eq!(rig.controller.remaining(), 5);
}

// ── Persistence ───────────────────────────────────────────────

#[test]
fn snapshot_restores_phase_and_remaining() {
    let mut rig = Rig::online(config_5_2_1());
    let mut storage = MockStorage::default();
    rig.run_online(9); // approach 2 green, 4 s left
    rig.controller.persist_if_changed(&mut storage).unwrap();

    let snapshot = PhaseSnapshot::load(&storage).unwrap().unwrap();
    assert_eq!(
        snapshot,
        PhaseSnapshot {
            phase: Phase::Approach2Green,
            remaining: 4
        }
    );

    let mut restarted = Rig::online(config_5_2_1());
    let mut sink = RecordingSink::default();
    restarted.controller = SignalController::new(config_5_2_1(), restarted.monitor.clone());
    restarted.controller.restore(snapshot, &mut sink);
    assert_eq!(
        sink.events.first(),
        Some(&AppEvent::Started {
            phase: Phase::Approach2Green,
            remaining: 4
        })
    );
    restarted.run_online(4);
    assert_eq!(restarted.controller.phase(), Phase::Approach2Amber);
}

#[test]
fn snapshot_writes_are_idempotent() {
    let mut rig = Rig::online(config_5_2_1());
    let mut storage = MockStorage::default();
    rig.controller.persist_if_changed(&mut storage).unwrap();
    rig.controller.persist_if_changed(&mut storage).unwrap();
    assert_eq!(storage.writes, 1);

    rig.controller.set_mode(OperatingMode::Manual);
    rig.run_online(5);
    rig.controller.persist_if_changed(&mut storage).unwrap();
    assert_eq!(storage.writes, 1, "frozen phase produces no new writes");
}

#[test]
fn config_auto_saves_after_quiet_period() {
    let mut rig = Rig::online(config_5_2_1());
    let storage = MockStorage::default();

    rig.controller
        .handle_command(AppCommand::SetPeakOverride(true), &mut rig.sink)
        .unwrap();
    assert!(!rig.controller.is_config_dirty());

    rig.controller
        .save_peak_window(Some(trafficpilot::scheduler::PeakWindow::new(420, 540)))
        .unwrap();
    assert!(rig.controller.is_config_dirty());

    for _ in 0..4 {
        rig.run_online(1);
        assert!(!rig.controller.auto_save_if_needed(&storage));
    }
    rig.run_online(1);
    assert!(rig.controller.auto_save_if_needed(&storage));
    assert!(!rig.controller.is_config_dirty());
    assert_eq!(
        storage.saved_configs.borrow()[0].peak_window,
        rig.controller.peak_window()
    );
}
