//! End-to-end: source -> pipeline -> state machine -> dispatcher.

use breath_core::config::{DispatchCfg, SamplingCfg, WatchdogCfg};
use breath_core::error::MonitorError;
use breath_core::mocks::{FaultySource, Frame, MOVING, REST, RecordingDisplay, ScriptedSource, StillSource};
use breath_core::runner::{self, StopReason};
use breath_core::state_machine::AlertState;
use breath_core::{Monitor, MonitorBuilder, Set};
use breath_traits::SampleSource;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

fn fast_builder(
    source: impl SampleSource + Send + 'static,
    display: RecordingDisplay,
    timeout_ms: u64,
) -> MonitorBuilder<Set, Set> {
    Monitor::builder()
        .with_source(source)
        .with_display(display)
        .with_watchdog(WatchdogCfg {
            timeout: Duration::from_millis(timeout_ms),
        })
        .with_dispatch(DispatchCfg {
            blink_on: Duration::from_millis(5),
            blink_off: Duration::from_millis(5),
            handshake_capacity: 230,
        })
        .with_sampling(SamplingCfg {
            period: Duration::from_millis(1),
        })
}

fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(3) {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

#[test]
fn still_sensor_escalates_and_blinks() {
    let display = RecordingDisplay::new();
    let handle = fast_builder(StillSource, display.clone(), 50)
        .build()
        .unwrap()
        .start()
        .unwrap();
    assert_eq!(handle.state(), AlertState::Normal);
    assert!(wait_for(|| handle.state() == AlertState::Warning));
    assert!(wait_for(|| handle.snapshot().blinks >= 2));

    let snap = handle.snapshot();
    assert_eq!(snap.confirmations, 0);
    assert_eq!(snap.watchdog_expirations, 1);
    assert!(snap.samples > 0);
    drop(handle);

    let frames = display.frames();
    assert_eq!(frames.first(), Some(&Frame::Normal));
    assert!(frames.contains(&Frame::Alert));
}

#[test]
fn breathing_after_apnea_clears_warning() {
    // 150 still samples (>= 150 ms at 1 ms period), a burst of breathing,
    // then still again.
    let script = std::iter::repeat_n(REST, 150).chain(std::iter::repeat_n(MOVING, 20));
    let display = RecordingDisplay::new();
    let handle = fast_builder(ScriptedSource::new(script, REST), display.clone(), 40)
        .build()
        .unwrap()
        .start()
        .unwrap();
    // Warning is reached while still, then cleared by the confirmation.
    assert!(wait_for(|| handle.snapshot().confirmations == 1));
    assert!(handle.snapshot().watchdog_expirations >= 1);

    let normal_after_alert = || {
        let frames = display.frames();
        frames
            .iter()
            .position(|f| *f == Frame::Alert)
            .is_some_and(|i| frames[i..].contains(&Frame::Normal))
    };
    assert!(wait_for(normal_after_alert));
    drop(handle);
}

#[test]
fn override_toggles_through_handle() {
    let handle = fast_builder(StillSource, RecordingDisplay::new(), 60_000)
        .build()
        .unwrap()
        .start()
        .unwrap();
    handle.toggle_override();
    assert_eq!(handle.state(), AlertState::Warning);
    handle.machine().toggle_override();
    assert_eq!(handle.state(), AlertState::Normal);
    assert_eq!(handle.snapshot().overrides, 2);
}

#[test]
fn run_stops_at_duration() {
    let monitor = fast_builder(StillSource, RecordingDisplay::new(), 60_000)
        .build()
        .unwrap();
    let stop = AtomicBool::new(false);
    let summary = runner::run(monitor, &stop, Some(Duration::from_millis(80))).unwrap();
    assert_eq!(summary.reason, StopReason::Duration);
    assert!(summary.elapsed >= Duration::from_millis(80));
    assert_eq!(summary.snapshot.state, AlertState::Normal);
}

#[test]
fn run_honors_stop_flag() {
    let monitor = fast_builder(StillSource, RecordingDisplay::new(), 60_000)
        .build()
        .unwrap();
    let stop = AtomicBool::new(true);
    let summary = runner::run(monitor, &stop, None).unwrap();
    assert_eq!(summary.reason, StopReason::Interrupted);
}

#[test]
fn run_surfaces_device_fault() {
    let monitor = fast_builder(FaultySource::new(10), RecordingDisplay::new(), 60_000)
        .build()
        .unwrap();
    let stop = AtomicBool::new(false);
    let err = runner::run(monitor, &stop, Some(Duration::from_secs(5))).unwrap_err();
    match err.downcast_ref::<MonitorError>() {
        Some(MonitorError::DeviceFault(msg)) => assert!(msg.contains("device id")),
        other => panic!("expected DeviceFault, got: {other:?}"),
    }
}

#[test]
fn handle_drop_is_prompt() {
    let handle = fast_builder(StillSource, RecordingDisplay::new(), 10)
        .build()
        .unwrap()
        .start()
        .unwrap();
    std::thread::sleep(Duration::from_millis(40));
    let start = Instant::now();
    handle.shutdown();
    assert!(start.elapsed() < Duration::from_secs(2));
}
