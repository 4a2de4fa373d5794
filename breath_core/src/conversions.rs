//! `From` implementations bridging `breath_config` types to `breath_core` types.

use crate::config::{ClassifierCfg, DebounceCfg, DispatchCfg, SamplingCfg, WatchdogCfg};
use std::time::Duration;

// ── ClassifierCfg ────────────────────────────────────────────────────────────

impl From<&breath_config::Config> for ClassifierCfg {
    fn from(c: &breath_config::Config) -> Self {
        Self {
            scale_divisor: c.sensor.scale_divisor,
            lower: c.classifier.lower,
            upper: c.classifier.upper,
        }
    }
}

// ── DebounceCfg ──────────────────────────────────────────────────────────────

impl From<&breath_config::DebounceCfg> for DebounceCfg {
    fn from(c: &breath_config::DebounceCfg) -> Self {
        Self {
            window: c.window,
            threshold: c.threshold,
        }
    }
}

// ── WatchdogCfg ──────────────────────────────────────────────────────────────

impl From<&breath_config::WatchdogCfg> for WatchdogCfg {
    fn from(c: &breath_config::WatchdogCfg) -> Self {
        Self {
            timeout: Duration::from_millis(c.timeout_ms),
        }
    }
}

// ── DispatchCfg ──────────────────────────────────────────────────────────────

impl From<&breath_config::DisplayCfg> for DispatchCfg {
    fn from(c: &breath_config::DisplayCfg) -> Self {
        Self {
            blink_on: Duration::from_millis(c.blink_on_ms),
            blink_off: Duration::from_millis(c.blink_off_ms),
            handshake_capacity: c.handshake_capacity,
        }
    }
}

// ── SamplingCfg ──────────────────────────────────────────────────────────────

impl From<&breath_config::SensorCfg> for SamplingCfg {
    fn from(c: &breath_config::SensorCfg) -> Self {
        Self {
            period: Duration::from_millis(c.sample_period_ms),
        }
    }
}
