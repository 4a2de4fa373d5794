use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time source used to pace the sampling loop and the blink cadence.
///
/// Implementations decide whether `sleep` really blocks; the test clock only
/// advances its own notion of "now".
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let ms = self.now().saturating_duration_since(epoch).as_millis();
        ms.min(u128::from(u64::MAX)) as u64
    }
}

/// Wall-clock backed by `std::time::Instant` and `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, d: Duration) {
        (**self).sleep(d)
    }
}

/// Clock whose time only moves when told to.
///
/// `now()` is `origin + offset`; `sleep(d)` adds `d` to the offset and returns
/// immediately, so a paced loop runs as fast as the CPU allows while still
/// observing consistent timestamps. Clones share the same offset.
#[cfg(any(test, feature = "test-clock"))]
#[derive(Debug, Clone)]
pub struct TestClock {
    origin: Instant,
    offset: Arc<std::sync::Mutex<Duration>>,
    sleeps: Arc<std::sync::Mutex<u64>>,
}

#[cfg(any(test, feature = "test-clock"))]
impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-clock"))]
impl TestClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(std::sync::Mutex::new(Duration::ZERO)),
            sleeps: Arc::new(std::sync::Mutex::new(0)),
        }
    }

    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = off.saturating_add(d);
        }
    }

    /// Total time advanced so far.
    pub fn elapsed(&self) -> Duration {
        self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
    }

    /// Number of `sleep` calls observed (one per paced loop iteration).
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.lock().map(|g| *g).unwrap_or(0)
    }
}

#[cfg(any(test, feature = "test-clock"))]
impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, d: Duration) {
        if let Ok(mut n) = self.sleeps.lock() {
            *n = n.saturating_add(1);
        }
        // Yield so a paced thread driven by this clock cannot starve its peers.
        thread::yield_now();
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_sleep_advances_without_blocking() {
        let clock = TestClock::new();
        let epoch = clock.now();
        let wall = Instant::now();
        clock.sleep(Duration::from_secs(12));
        assert_eq!(clock.ms_since(epoch), 12_000);
        assert_eq!(clock.sleep_count(), 1);
        assert!(wall.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn clones_share_time() {
        let a = TestClock::new();
        let b = a.clone();
        a.advance(Duration::from_millis(10));
        assert_eq!(b.elapsed(), Duration::from_millis(10));
    }

    #[test]
    fn ms_since_saturates_for_future_epoch() {
        let clock = MonotonicClock::new();
        let future = Instant::now() + Duration::from_secs(5);
        assert_eq!(clock.ms_since(future), 0);
    }
}
