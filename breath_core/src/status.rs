//! Point-in-time view of a running monitor.

use crate::state_machine::AlertState;

/// Counters and alert level read from a `MonitorHandle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSnapshot {
    pub state: AlertState,
    /// Readings that made it through the pipeline.
    pub samples: u64,
    pub breath_like: u64,
    /// Rising edges of the debounced verdict.
    pub confirmations: u64,
    /// Reads that failed and were skipped.
    pub skipped: u64,
    pub sampler_halted: bool,
    /// Milliseconds since the last successful read.
    pub since_last_read_ms: u64,
    pub watchdog_expirations: u64,
    pub overrides: u64,
    pub blinks: u64,
    pub steady_renders: u64,
    pub render_errors: u64,
}
