use crate::error::{MonitorError, Report, Result as CoreResult};
use crate::status::MonitorSnapshot;
use crate::{Monitor, MonitorHandle};
use crossbeam_channel as xch;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How often the supervisor looks at the stop flag and the run limit.
pub const SUPERVISE_TICK: Duration = Duration::from_millis(50);

/// Why a supervised run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured run duration elapsed.
    Duration,
    /// The stop flag was raised (e.g. Ctrl-C).
    Interrupted,
    /// Every background thread went away.
    Finished,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::Duration => "duration",
            StopReason::Interrupted => "interrupted",
            StopReason::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub elapsed: Duration,
    pub reason: StopReason,
    pub snapshot: MonitorSnapshot,
}

#[inline]
fn limit_reached(elapsed: Duration, limit: Option<Duration>) -> bool {
    limit.is_some_and(|l| elapsed >= l)
}

/// Block until `stop` is raised, `limit` elapses or a background thread
/// reports a fatal error. The monitor keeps running; dropping the handle
/// tears it down.
pub fn supervise(
    handle: &MonitorHandle,
    stop: &AtomicBool,
    limit: Option<Duration>,
) -> CoreResult<RunSummary> {
    let start = Instant::now();
    let fatal = handle.fatal();
    loop {
        let elapsed = start.elapsed();
        if stop.load(Ordering::Relaxed) {
            return Ok(finish(handle, elapsed, StopReason::Interrupted));
        }
        if limit_reached(elapsed, limit) {
            return Ok(finish(handle, elapsed, StopReason::Duration));
        }

        let wait = limit
            .map(|l| l.saturating_sub(elapsed).min(SUPERVISE_TICK))
            .unwrap_or(SUPERVISE_TICK);
        match fatal.recv_timeout(wait.max(Duration::from_millis(1))) {
            Ok(err) => return Err(fatal_report(err)),
            Err(xch::RecvTimeoutError::Timeout) => continue,
            Err(xch::RecvTimeoutError::Disconnected) => {
                return Ok(finish(handle, start.elapsed(), StopReason::Finished));
            }
        }
    }
}

/// Start `monitor` and supervise it; teardown happens before returning.
pub fn run(
    monitor: Monitor,
    stop: &AtomicBool,
    limit: Option<Duration>,
) -> CoreResult<RunSummary> {
    let handle = monitor.start()?;
    tracing::info!(
        limit_ms = limit.map(|d| d.as_millis() as u64),
        "monitor running"
    );
    let res = supervise(&handle, stop, limit);
    handle.shutdown();
    res
}

fn finish(handle: &MonitorHandle, elapsed: Duration, reason: StopReason) -> RunSummary {
    let snapshot = handle.snapshot();
    tracing::info!(
        reason = reason.as_str(),
        elapsed_ms = elapsed.as_millis() as u64,
        state = %snapshot.state,
        confirmations = snapshot.confirmations,
        expirations = snapshot.watchdog_expirations,
        "monitor stopped"
    );
    RunSummary {
        elapsed,
        reason,
        snapshot,
    }
}

fn fatal_report(err: MonitorError) -> Report {
    tracing::error!(error = %err, "monitor aborted");
    Report::new(err)
}
