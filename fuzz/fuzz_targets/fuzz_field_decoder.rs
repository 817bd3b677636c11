//! Fuzz target: `decode_line` + `FieldBridge::apply`
//!
//! Feeds arbitrary text as transport field lines into a running
//! controller and asserts that nothing panics and the heads never show
//! two proceed colours afterwards.
//!
//! cargo fuzz run fuzz_field_decoder

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use trafficpilot::adapters::log_sink::LogEventSink;
use trafficpilot::adapters::time::ManualClock;
use trafficpilot::app::controller::SignalController;
use trafficpilot::app::ports::SignalHeadPort;
use trafficpilot::config::SystemConfig;
use trafficpilot::fields::{FieldBridge, decode_line};
use trafficpilot::liveness::HeartbeatMonitor;
use trafficpilot::signal::Color;

struct Heads(Option<(Color, Color)>);

impl SignalHeadPort for Heads {
    fn set_heads(&mut self, light1: Color, light2: Color) {
        self.0 = Some((light1, light2));
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    let config = SystemConfig::default();
    let monitor = Arc::new(HeartbeatMonitor::new(config.online_timeout_ms));
    let mut controller = SignalController::new(config, monitor);
    let mut sink = LogEventSink::new();
    let mut bridge = FieldBridge::new();
    let mut heads = Heads(None);
    let clock = ManualClock::new();
    controller.start(&mut sink);

    for (i, line) in text.lines().enumerate() {
        let now = i as u64 * 1_000;
        clock.set_ms(now);
        if let Ok(update) = decode_line(line) {
            let _ = bridge.apply(&update, &mut controller, now, &mut sink);
        }
        controller.evaluate_liveness(now, &mut sink);
        controller.tick(&mut bridge, &mut heads, &clock, &mut sink);

        if let Some((l1, l2)) = heads.0 {
            assert!(!(l1.is_proceed() && l2.is_proceed()), "conflict {l1}/{l2}");
        }
        assert!(controller.timing().validate().is_ok());
    }
});
