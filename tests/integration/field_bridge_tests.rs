//! Integration tests for transport fields → bridge → controller, and
//! controller → publisher → status fields.

use trafficpilot::adapters::field_publisher::FieldPublisher;
use trafficpilot::adapters::field_store::MemoryFieldStore;
use trafficpilot::app::events::AppEvent;
use trafficpilot::config::{SystemConfig, TimingProfile};
use trafficpilot::error::{CommandError, Error};
use trafficpilot::fields::{FieldBridge, FieldOutcome, FieldUpdate, FieldValue, decode_line, paths};
use trafficpilot::fsm::Phase;
use trafficpilot::scheduler::PeakWindow;
use trafficpilot::signal::{Color, ManualCommand, OperatingMode};

use super::mock_io::Rig;

fn apply(bridge: &mut FieldBridge, rig: &mut Rig, line: &str) -> trafficpilot::Result<FieldOutcome> {
    let update = decode_line(line).expect("test line decodes");
    bridge.apply(&update, &mut rig.controller, 0, &mut rig.sink)
}

#[test]
fn single_timing_field_merges_into_profile() {
    let mut rig = Rig::online(SystemConfig::default());
    let mut bridge = FieldBridge::new();

    apply(&mut bridge, &mut rig, "traffic/state/yellow_delay=4").unwrap();
    assert_eq!(
        rig.controller.timing(),
        TimingProfile {
            amber: 4,
            ..TimingProfile::default()
        }
    );
}

#[test]
fn negative_duration_rejected_and_last_good_kept() {
    let mut rig = Rig::online(SystemConfig::default());
    let mut bridge = FieldBridge::new();

    let result = apply(&mut bridge, &mut rig, "traffic/state/all_red_delay=-1");
    assert_eq!(
        result,
        Err(Error::InvalidCommand(CommandError::OutOfRange(
            "all_red_delay"
        )))
    );
    assert_eq!(rig.controller.timing(), TimingProfile::default());
}

#[test]
fn zero_duration_never_reaches_the_policy() {
    let mut rig = Rig::online(SystemConfig::default());
    let mut bridge = FieldBridge::new();

    assert!(apply(&mut bridge, &mut rig, "traffic/state/normal_green_delay=0").is_err());
    assert_eq!(rig.controller.timing().normal_green, 5);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::CommandRejected(_))),
        1
    );
}

#[test]
fn missing_or_malformed_value_is_stale() {
    let mut rig = Rig::online(SystemConfig::default());
    let mut bridge = FieldBridge::new();

    assert_eq!(
        apply(&mut bridge, &mut rig, "traffic/state/peak_green_delay="),
        Err(Error::StaleConfiguration("peak_green_delay"))
    );
    assert_eq!(
        apply(&mut bridge, &mut rig, "traffic/state/rain_green_delay=later"),
        Err(Error::StaleConfiguration("rain_green_delay"))
    );
    assert_eq!(rig.controller.timing(), TimingProfile::default());
}

#[test]
fn mode_and_manual_lights() {
    let mut rig = Rig::online(SystemConfig::default());
    let mut bridge = FieldBridge::new();

    // Manual light in Auto is refused.
    assert_eq!(
        apply(&mut bridge, &mut rig, "traffic/state/manualLight1=RED"),
        Err(Error::InvalidCommand(CommandError::NotInManualMode))
    );

    apply(&mut bridge, &mut rig, "traffic/state/mode=MANUAL").unwrap();
    assert_eq!(rig.controller.mode(), OperatingMode::Manual);

    apply(&mut bridge, &mut rig, "traffic/state/manualLight1=RED").unwrap();
    apply(&mut bridge, &mut rig, "traffic/state/manualLight2=YELLOW").unwrap();
    assert_eq!(
        rig.controller.manual_command(),
        Some(ManualCommand::new(Color::Red, Color::Amber))
    );

    assert_eq!(
        apply(&mut bridge, &mut rig, "traffic/state/manualLight1=GREEN"),
        Err(Error::InvalidCommand(CommandError::ConflictingLights {
            light1: Color::Green,
            light2: Color::Amber
        }))
    );
    assert_eq!(
        apply(&mut bridge, &mut rig, "traffic/state/mode=BLINKING"),
        Err(Error::InvalidCommand(CommandError::UnknownValue("mode")))
    );
}

#[test]
fn demand_flags_are_latched() {
    let mut rig = Rig::online(SystemConfig::default());
    let mut bridge = FieldBridge::new();

    apply(&mut bridge, &mut rig, "traffic/state/rain=true").unwrap();
    apply(&mut bridge, &mut rig, "traffic/state/ir2=1").unwrap();
    let d = bridge.demand();
    assert!(d.rain_detected);
    assert!(!d.presence1);
    assert!(d.presence2);

    // The bridge is the controller's demand source.
    for _ in 0..8 {
        rig.heartbeat();
        rig.evaluate();
        rig.clock.advance_ms(1_000);
        rig.controller
            .tick(&mut bridge, &mut rig.heads, &rig.clock, &mut rig.sink);
    }
    assert_eq!(rig.controller.phase(), Phase::Approach2Green);
    assert_eq!(rig.controller.remaining(), 7);
}

#[test]
fn peak_window_bounds_merge() {
    let mut rig = Rig::online(SystemConfig::default());
    let mut bridge = FieldBridge::new();

    apply(&mut bridge, &mut rig, "traffic/state/peak_start=07:00").unwrap();
    apply(&mut bridge, &mut rig, "traffic/state/peak_end=09:00").unwrap();
    assert_eq!(
        rig.controller.peak_window(),
        Some(PeakWindow::new(420, 540))
    );
    assert!(apply(&mut bridge, &mut rig, "traffic/state/peak_end=9am").is_err());
    assert_eq!(
        rig.controller.peak_window(),
        Some(PeakWindow::new(420, 540))
    );
}

#[test]
fn heartbeat_field_stamps_arrival_time() {
    let mut rig = Rig::offline(SystemConfig::default());
    let mut bridge = FieldBridge::new();

    let update = decode_line("traffic/system/heartbeat_ms=1712345678901").unwrap();
    bridge
        .apply(&update, &mut rig.controller, 42_000, &mut rig.sink)
        .unwrap();
    assert_eq!(rig.monitor.last_heartbeat_ms(), Some(42_000));
}

#[test]
fn unknown_paths_ignored() {
    let mut rig = Rig::online(SystemConfig::default());
    let mut bridge = FieldBridge::new();
    assert_eq!(
        apply(&mut bridge, &mut rig, "traffic/state/sms_number=555"),
        Ok(FieldOutcome::Ignored)
    );
}

#[test]
fn published_status_does_not_loop_back() {
    let mut rig = Rig::online(SystemConfig::default());
    let mut bridge = FieldBridge::new();
    let mut publisher = FieldPublisher::new(MemoryFieldStore::new());
    rig.controller
        .tick(&mut rig.demand, &mut rig.heads, &rig.clock, &mut publisher);

    for path in [
        paths::STATUS_PHASE,
        paths::STATUS_LIGHT1,
        paths::STATUS_LIGHT2,
        paths::STATUS_TIMER,
        paths::STATUS_MODE,
        paths::STATUS_ONLINE,
        paths::STATUS_PEAK,
    ] {
        assert!(!paths::INPUTS.contains(&path), "{path} is also an input");
        let value = publisher.store().get(path).cloned().unwrap();
        let update = FieldUpdate {
            path: heapless::String::try_from(path).unwrap(),
            value,
        };
        assert_eq!(
            bridge.apply(&update, &mut rig.controller, 0, &mut rig.sink),
            Ok(FieldOutcome::Ignored)
        );
    }

    // Re-reading the whole store applies nothing from the status fields.
    assert_eq!(
        bridge.sync_from(publisher.store(), &mut rig.controller, 0, &mut rig.sink),
        0
    );
}

#[test]
fn sync_from_store_reads_every_input() {
    let mut rig = Rig::online(SystemConfig::default());
    let mut bridge = FieldBridge::new();
    let mut store = MemoryFieldStore::new();
    store.set(paths::NORMAL_GREEN, FieldValue::Number(12.0));
    store.set(paths::AMBER, FieldValue::text("3"));
    store.set(paths::RAIN, FieldValue::Bool(true));
    store.set(paths::MODE, FieldValue::text("AUTO"));
    store.set(paths::ALL_RED, FieldValue::Null);

    let applied = bridge.sync_from(&store, &mut rig.controller, 0, &mut rig.sink);
    assert_eq!(applied, 4);
    assert_eq!(rig.controller.timing().normal_green, 12);
    assert_eq!(rig.controller.timing().amber, 3);
    assert_eq!(rig.controller.timing().all_red, 1);
    assert!(bridge.demand().rain_detected);
}

#[test]
fn sync_from_unreachable_store_keeps_state() {
    let mut rig = Rig::online(SystemConfig::default());
    let mut bridge = FieldBridge::new();
    let mut store = MemoryFieldStore::new();
    store.set(paths::NORMAL_GREEN, FieldValue::Number(12.0));
    store.set_offline(true);

    assert_eq!(
        bridge.sync_from(&store, &mut rig.controller, 0, &mut rig.sink),
        0
    );
    assert_eq!(rig.controller.timing(), TimingProfile::default());
}

#[test]
fn status_published_idempotently() {
    let mut rig = Rig::online(SystemConfig::default());
    let mut publisher = FieldPublisher::new(MemoryFieldStore::new());

    rig.controller
        .tick(&mut rig.demand, &mut rig.heads, &rig.clock, &mut publisher);
    let after_first = publisher.store().write_count();
    assert_eq!(after_first, 7);
    assert_eq!(
        publisher
            .store()
            .get(paths::STATUS_LIGHT1)
            .and_then(FieldValue::as_text),
        Some("GREEN")
    );
    assert_eq!(
        publisher
            .store()
            .get("traffic/state/current_phase")
            .and_then(FieldValue::as_text),
        Some("R1_GREEN")
    );
    assert_eq!(
        publisher.store().get(paths::STATUS_ONLINE),
        Some(&FieldValue::Bool(true))
    );

    // Next tick only the countdown changes.
    rig.controller
        .tick(&mut rig.demand, &mut rig.heads, &rig.clock, &mut publisher);
    assert_eq!(publisher.store().write_count(), after_first + 1);
    assert_eq!(
        publisher.store().get(paths::STATUS_TIMER),
        Some(&FieldValue::Number(3.0))
    );
}
