//! Level-triggered alert signal shared by the watchdog, the sampling loop,
//! the manual override and the dispatcher controller.
//!
//! The level lives in an atomic so readers never block; waiters park on a
//! condvar and re-check the level under the mutex, so a `set` that lands
//! between the check and the wait is never lost.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct AlertSignal {
    level: AtomicBool,
    closed: AtomicBool,
    lock: Mutex<()>,
    cv: Condvar,
}

impl AlertSignal {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raise the level; returns the previous level.
    pub(crate) fn set(&self) -> bool {
        let _g = self.guard();
        let prev = self.level.swap(true, Ordering::SeqCst);
        self.cv.notify_all();
        prev
    }

    /// Drop the level; returns the previous level.
    pub(crate) fn clear(&self) -> bool {
        let _g = self.guard();
        let prev = self.level.swap(false, Ordering::SeqCst);
        self.cv.notify_all();
        prev
    }

    /// Flip the level; returns the new level.
    pub(crate) fn toggle(&self) -> bool {
        let _g = self.guard();
        let next = !self.level.load(Ordering::SeqCst);
        self.level.store(next, Ordering::SeqCst);
        self.cv.notify_all();
        next
    }

    /// Wake every current and future waiter. Used at teardown only.
    pub fn close(&self) {
        let _g = self.guard();
        self.closed.store(true, Ordering::SeqCst);
        self.cv.notify_all();
    }

    /// Block until the level is set. Returns immediately if it already is.
    /// Returns `false` if the signal was closed instead.
    pub fn wait_set(&self) -> bool {
        let mut g = self.guard();
        loop {
            if self.is_closed() {
                return false;
            }
            if self.is_set() {
                return true;
            }
            g = self.cv.wait(g).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`wait_set`](Self::wait_set) but gives up after `timeout`.
    pub fn wait_set_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut g = self.guard();
        loop {
            if self.is_closed() {
                return false;
            }
            if self.is_set() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            g = self
                .cv
                .wait_timeout(g, deadline - now)
                .map(|(g, _)| g)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn wait_returns_immediately_when_already_set() {
        let s = AlertSignal::new();
        s.set();
        assert!(s.wait_set());
    }

    #[test]
    fn set_from_other_thread_wakes_waiter() {
        let s = Arc::new(AlertSignal::new());
        let s2 = s.clone();
        let h = thread::spawn(move || s2.wait_set());
        thread::sleep(Duration::from_millis(20));
        assert!(!s.set());
        assert!(h.join().unwrap());
    }

    #[test]
    fn close_releases_waiter_with_false() {
        let s = Arc::new(AlertSignal::new());
        let s2 = s.clone();
        let h = thread::spawn(move || s2.wait_set());
        thread::sleep(Duration::from_millis(20));
        s.close();
        assert!(!h.join().unwrap());
    }

    #[test]
    fn timeout_elapses_when_never_set() {
        let s = AlertSignal::new();
        let start = Instant::now();
        assert!(!s.wait_set_timeout(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn set_clear_toggle_report_levels() {
        let s = AlertSignal::new();
        assert!(!s.set());
        assert!(s.set());
        assert!(s.clear());
        assert!(s.toggle());
        assert!(!s.toggle());
        assert!(!s.is_set());
    }
}
