//! Sampler thread behavior: confirmations, skipped reads, device faults, cleanup.

use breath_core::config::WatchdogCfg;
use breath_core::error::MonitorError;
use breath_core::mocks::{FaultySource, MOVING, REST, ScriptedSource, StillSource};
use breath_core::monitor::BreathMonitor;
use breath_core::sampler::Sampler;
use breath_core::state_machine::{AlertState, AlertStateMachine};
use breath_traits::clock::{MonotonicClock, TestClock};
use breath_traits::{BoxError, RawSample, SampleSource};
use crossbeam_channel as xch;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn machine(timeout: Duration) -> Arc<AlertStateMachine> {
    Arc::new(AlertStateMachine::start(WatchdogCfg { timeout }).unwrap())
}

fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(3) {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}

#[test]
fn sampler_thread_exits_on_drop() {
    let m = machine(Duration::from_secs(60));
    let sampler = Sampler::spawn(
        StillSource,
        BreathMonitor::default(),
        m,
        Duration::from_millis(10),
        MonotonicClock::new(),
        None,
    )
    .unwrap();
    std::thread::sleep(Duration::from_millis(30));
    assert!(sampler.is_running());
    let stats = sampler.stats();
    drop(sampler);
    let after = stats.samples();
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(stats.samples(), after, "thread kept sampling after drop");
}

#[test]
fn breathing_burst_confirms_once_and_refreshes_watchdog() {
    let m = machine(Duration::from_secs(60));
    let first = m.deadline().unwrap();
    let script = std::iter::repeat_n(MOVING, 100);
    let clock = TestClock::new();
    let sampler = Sampler::spawn(
        ScriptedSource::new(script, REST),
        BreathMonitor::default(),
        m.clone(),
        Duration::from_millis(10),
        clock.clone(),
        None,
    )
    .unwrap();
    let stats = sampler.stats();
    assert!(wait_for(|| stats.samples() >= 300));
    drop(sampler);

    assert_eq!(stats.confirmations(), 1);
    assert_eq!(stats.breath_like(), 100);
    assert_eq!(m.confirmations(), 1);
    let refreshed = m.deadline().unwrap();
    assert_eq!(refreshed.id, first.id + 1);
    assert_eq!(m.state(), AlertState::Normal);
}

#[test]
fn device_fault_halts_sampling_and_reports() {
    let m = machine(Duration::from_secs(60));
    let (tx, rx) = xch::unbounded();
    let sampler = Sampler::spawn(
        FaultySource::new(5),
        BreathMonitor::default(),
        m,
        Duration::from_millis(1),
        MonotonicClock::new(),
        Some(tx),
    )
    .unwrap();
    let err = rx.recv_timeout(Duration::from_secs(2)).expect("fault reported");
    assert!(matches!(err, MonitorError::DeviceFault(_)));
    let stats = sampler.stats();
    assert!(wait_for(|| !sampler.is_running()));
    assert!(stats.halted());
    assert_eq!(stats.samples(), 5);
}

/// Fails every other read with a transient bus error.
struct FlakySource {
    n: u32,
}

impl SampleSource for FlakySource {
    fn read(&mut self) -> Result<RawSample, BoxError> {
        self.n += 1;
        if self.n % 2 == 0 {
            Err(Box::new(std::io::Error::other("i2c nack")))
        } else {
            Ok(REST)
        }
    }
}

#[test]
fn transient_read_errors_are_skipped() {
    let m = machine(Duration::from_secs(60));
    let (tx, rx) = xch::unbounded();
    let sampler = Sampler::spawn(
        FlakySource { n: 0 },
        BreathMonitor::default(),
        m,
        Duration::from_millis(1),
        TestClock::new(),
        Some(tx),
    )
    .unwrap();
    let stats = sampler.stats();
    assert!(wait_for(|| stats.skipped() >= 10));
    assert!(sampler.is_running());
    drop(sampler);
    assert!(rx.try_recv().is_err());
    assert!(!stats.halted());
}

#[test]
fn stalled_for_tracks_last_good_read() {
    let m = machine(Duration::from_secs(60));
    let clock = TestClock::new();
    let sampler = Sampler::spawn(
        FaultySource::new(3),
        BreathMonitor::default(),
        m,
        Duration::from_millis(10),
        clock.clone(),
        None,
    )
    .unwrap();
    let stats = sampler.stats();
    assert!(wait_for(|| stats.halted()));
    // Three good reads at t = 0, 10, 20 ms.
    assert_eq!(sampler.stalled_for(20), 0);
    assert_eq!(sampler.stalled_for(120), 100);
}

#[test]
fn stalled_for_now_follows_the_injected_clock() {
    let m = machine(Duration::from_secs(60));
    let clock = TestClock::new();
    let sampler = Sampler::spawn(
        FaultySource::new(3),
        BreathMonitor::default(),
        m,
        Duration::from_millis(10),
        clock.clone(),
        None,
    )
    .unwrap();
    let stats = sampler.stats();
    assert!(wait_for(|| stats.halted()));
    let halted_at = clock.elapsed().as_millis() as u64;
    assert_eq!(sampler.stalled_for_now(), halted_at - 20);

    // Virtual time moves; the wall clock barely does.
    clock.advance(Duration::from_secs(5));
    assert_eq!(sampler.stalled_for_now(), halted_at - 20 + 5_000);
}

#[test]
fn multiple_samplers_dont_leak_threads() {
    for _ in 0..10 {
        let sampler = Sampler::spawn(
            StillSource,
            BreathMonitor::default(),
            machine(Duration::from_secs(60)),
            Duration::from_millis(2),
            MonotonicClock::new(),
            None,
        )
        .unwrap();
        std::thread::sleep(Duration::from_millis(5));
        drop(sampler);
    }
}
