//! Watchdog supersede semantics and the Normal/Warning transitions they drive.

use breath_core::config::WatchdogCfg;
use breath_core::state_machine::{AlertState, AlertStateMachine, Cause};
use breath_core::watchdog::WatchdogTimer;
use crossbeam_channel as xch;
use std::time::{Duration, Instant};

fn wait_for(mut cond: impl FnMut() -> bool, limit: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < limit {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

#[test]
fn second_reset_cancels_first() {
    let (tx, rx) = xch::unbounded();
    let wd = WatchdogTimer::spawn(move |d| {
        let _ = tx.send((d.id, Instant::now()));
    })
    .unwrap();
    let first = wd.reset(Duration::from_millis(60));
    std::thread::sleep(Duration::from_millis(20));
    let second = wd.reset(Duration::from_millis(120));

    let (id, at) = rx.recv_timeout(Duration::from_secs(2)).expect("expiry");
    assert_eq!(id, second.id);
    assert_ne!(id, first.id);
    assert!(at >= second.at, "fired before the rescheduled deadline");
    // Exactly one expiry for the two resets.
    assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
    assert_eq!(wd.expirations(), 1);
}

#[test]
fn continuous_resets_keep_it_quiet() {
    let (tx, rx) = xch::unbounded::<u64>();
    let wd = WatchdogTimer::spawn(move |d| {
        let _ = tx.send(d.id);
    })
    .unwrap();
    for _ in 0..20 {
        wd.reset(Duration::from_millis(40));
        std::thread::sleep(Duration::from_millis(5));
    }
    wd.cancel();
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn silence_escalates_to_warning() {
    let m = AlertStateMachine::start(WatchdogCfg {
        timeout: Duration::from_millis(40),
    })
    .unwrap();
    assert_eq!(m.state(), AlertState::Normal);
    assert!(wait_for(
        || m.state() == AlertState::Warning,
        Duration::from_secs(2)
    ));
    assert_eq!(m.expirations(), 1);
    // Warning holds with no deadline pending until a breath arrives.
    std::thread::sleep(Duration::from_millis(80));
    assert_eq!(m.state(), AlertState::Warning);
    assert!(m.deadline().is_none());
}

#[test]
fn breath_in_warning_returns_to_normal_with_fresh_deadline() {
    let timeout = Duration::from_millis(40);
    let m = AlertStateMachine::start(WatchdogCfg { timeout }).unwrap();
    assert!(wait_for(
        || m.state() == AlertState::Warning,
        Duration::from_secs(2)
    ));

    let before = Instant::now();
    let t = m.breath_confirmed();
    let after = Instant::now();
    assert_eq!(t.cause, Cause::BreathConfirmed);
    assert_eq!((t.from, t.to), (AlertState::Warning, AlertState::Normal));
    assert_eq!(m.state(), AlertState::Normal);

    let d = m.deadline().expect("re-armed");
    assert!(d.at >= before + timeout && d.at <= after + timeout);
    assert_eq!(m.confirmations(), 1);
}

#[test]
fn override_can_raise_and_breath_can_clear() {
    let m = AlertStateMachine::start(WatchdogCfg {
        timeout: Duration::from_secs(60),
    })
    .unwrap();
    let t = m.toggle_override();
    assert_eq!(t.cause, Cause::ManualOverride);
    assert_eq!(m.state(), AlertState::Warning);
    m.breath_confirmed();
    assert_eq!(m.state(), AlertState::Normal);
    assert_eq!(m.expirations(), 0);
}

#[test]
fn confirmation_racing_expiry_never_leaves_warning_armed() {
    let m = AlertStateMachine::start(WatchdogCfg {
        timeout: Duration::from_millis(1),
    })
    .unwrap();
    for _ in 0..500 {
        m.breath_confirmed();
        // Warning is only ever raised by the expiry that consumed the
        // latest deadline, so it can never coexist with a pending one.
        if m.state() == AlertState::Warning {
            assert!(m.deadline().is_none(), "warning with a live deadline");
        }
        std::thread::sleep(Duration::from_micros(500));
    }
}
