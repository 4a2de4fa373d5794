//! Tuning for the breath monitor.
//!
//! The constants are the reference tuning for an ADXL345 in full-resolution
//! mode sampled every 10 ms. The structs carry the same values and are what
//! the components are built from; they are separate from the TOML schema in
//! `breath_config` (see `conversions`).

use std::time::Duration;

/// Raw counts per g in full-resolution mode.
pub const SCALE_DIVISOR: f64 = 256.0;
/// Lower edge of the rest band around 1 g.
pub const LOWER_BOUND: f64 = 0.975;
/// Upper edge of the rest band around 1 g.
pub const UPPER_BOUND: f64 = 1.025;
/// Debounce window length in samples.
pub const WINDOW_CAPACITY: usize = 35;
/// Breath-like samples needed in the window, exclusive.
pub const BREATH_THRESHOLD: usize = 7;
pub const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(12);
pub const SAMPLE_PERIOD: Duration = Duration::from_millis(10);
pub const BLINK_ON: Duration = Duration::from_millis(500);
pub const BLINK_OFF: Duration = Duration::from_millis(200);
/// Pending signals a dispatcher worker may accumulate before it is fatal.
pub const HANDSHAKE_CAPACITY: usize = 230;

/// Magnitude normalization and rest band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierCfg {
    pub scale_divisor: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Default for ClassifierCfg {
    fn default() -> Self {
        Self {
            scale_divisor: SCALE_DIVISOR,
            lower: LOWER_BOUND,
            upper: UPPER_BOUND,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceCfg {
    pub window: usize,
    pub threshold: usize,
}

impl Default for DebounceCfg {
    fn default() -> Self {
        Self {
            window: WINDOW_CAPACITY,
            threshold: BREATH_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogCfg {
    /// No confirmed breath for this long raises the alert.
    pub timeout: Duration,
}

impl Default for WatchdogCfg {
    fn default() -> Self {
        Self {
            timeout: WATCHDOG_TIMEOUT,
        }
    }
}

/// Alert dispatcher timing and handshake bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchCfg {
    pub blink_on: Duration,
    pub blink_off: Duration,
    pub handshake_capacity: usize,
}

impl Default for DispatchCfg {
    fn default() -> Self {
        Self {
            blink_on: BLINK_ON,
            blink_off: BLINK_OFF,
            handshake_capacity: HANDSHAKE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingCfg {
    /// Fixed delay between reads.
    pub period: Duration,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self {
            period: SAMPLE_PERIOD,
        }
    }
}
