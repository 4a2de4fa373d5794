//! Restartable single-shot countdown.
//!
//! One background thread owns the expiry. At most one deadline is pending at
//! any time: `reset` replaces it under the same mutex the timer thread reads,
//! so a superseded deadline can never fire, even when `reset` races with the
//! timer waking up. The expiry callback runs on the timer thread while that
//! mutex is held, so a `reset` issued during the callback completes after
//! it. The callback must not block and must not call back into the timer.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{Builder, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::MonitorError;
use crate::spawn::spawn_with;

/// Handle describing a scheduled expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    /// Increases by one on every `reset`.
    pub id: u64,
    pub at: Instant,
}

#[derive(Debug, Default)]
struct TimerState {
    pending: Option<Deadline>,
    next_id: u64,
    fired: u64,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<TimerState>,
    cv: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct WatchdogTimer {
    shared: Arc<Shared>,
    join: Option<JoinHandle<()>>,
}

impl WatchdogTimer {
    /// Start the timer thread with nothing scheduled.
    pub fn spawn<F>(on_expire: F) -> Result<Self, MonitorError>
    where
        F: Fn(Deadline) + Send + 'static,
    {
        Self::spawn_on(Builder::new(), on_expire)
    }

    pub(crate) fn spawn_on<F>(builder: Builder, on_expire: F) -> Result<Self, MonitorError>
    where
        F: Fn(Deadline) + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let shared_bg = shared.clone();
        let join = spawn_with(builder, "watchdog", move || {
            timer_loop(&shared_bg, on_expire);
        })?;
        Ok(Self {
            shared,
            join: Some(join),
        })
    }

    /// Cancel any pending expiry and schedule a new one `after` from now.
    pub fn reset(&self, after: Duration) -> Deadline {
        self.reset_with(after, || ()).0
    }

    /// Run `f`, then reschedule, both under the timer lock.
    ///
    /// An expiry callback already running finishes before `f` starts; a
    /// deadline that is due but not yet taken is replaced and never fires.
    pub fn reset_with<R>(&self, after: Duration, f: impl FnOnce() -> R) -> (Deadline, R) {
        let mut st = self.shared.lock();
        let out = f();
        st.next_id = st.next_id.wrapping_add(1);
        let deadline = Deadline {
            id: st.next_id,
            at: Instant::now() + after,
        };
        if let Some(prev) = st.pending.replace(deadline) {
            tracing::trace!(superseded = prev.id, id = deadline.id, "watchdog rescheduled");
        }
        self.shared.cv.notify_all();
        (deadline, out)
    }

    /// Cancel the pending expiry, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut st = self.shared.lock();
        let had = st.pending.take().is_some();
        self.shared.cv.notify_all();
        had
    }

    pub fn pending(&self) -> Option<Deadline> {
        self.shared.lock().pending
    }

    /// Number of deadlines that have fired so far.
    pub fn expirations(&self) -> u64 {
        self.shared.lock().fired
    }
}

fn timer_loop<F: Fn(Deadline)>(shared: &Shared, on_expire: F) {
    let mut st = shared.lock();
    loop {
        if st.shutdown {
            break;
        }
        match st.pending {
            None => {
                st = shared.cv.wait(st).unwrap_or_else(PoisonError::into_inner);
            }
            Some(d) => {
                let now = Instant::now();
                if now >= d.at {
                    st.pending = None;
                    st.fired = st.fired.saturating_add(1);
                    tracing::debug!(id = d.id, "watchdog expired");
                    on_expire(d);
                } else {
                    st = shared
                        .cv
                        .wait_timeout(st, d.at - now)
                        .map(|(g, _)| g)
                        .unwrap_or_else(|e| e.into_inner().0);
                }
            }
        }
    }
    tracing::trace!("watchdog thread exiting");
}

impl Drop for WatchdogTimer {
    fn drop(&mut self) {
        {
            let mut st = self.shared.lock();
            st.shutdown = true;
            st.pending = None;
            self.shared.cv.notify_all();
        }
        if let Some(handle) = self.join.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!(?e, "watchdog thread panicked during shutdown");
        }
    }
}
