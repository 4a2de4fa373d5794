#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the breath monitor.
//!
//! Every section is optional; an empty document yields the reference tuning
//! (ADXL345 at 256 LSB/g, ±2.5% rest band, 35-sample window, 12 s watchdog).
//! Values are read once at startup and never reloaded.
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorCfg {
    /// Raw counts per g; the vector magnitude is divided by this.
    pub scale_divisor: f64,
    /// Delay between consecutive reads.
    pub sample_period_ms: u64,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            scale_divisor: 256.0,
            sample_period_ms: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassifierCfg {
    /// Lower edge of the rest band (g). Magnitudes at or below are breath-like.
    pub lower: f64,
    /// Upper edge of the rest band (g). Magnitudes at or above are breath-like.
    pub upper: f64,
}

impl Default for ClassifierCfg {
    fn default() -> Self {
        Self {
            lower: 0.975,
            upper: 1.025,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DebounceCfg {
    /// Sliding window length in samples.
    pub window: usize,
    /// Verdict is "breathing" while more than this many window entries are breath-like.
    pub threshold: usize,
}

impl Default for DebounceCfg {
    fn default() -> Self {
        Self {
            window: 35,
            threshold: 7,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WatchdogCfg {
    pub timeout_ms: u64,
}

impl Default for WatchdogCfg {
    fn default() -> Self {
        Self { timeout_ms: 12_000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayCfg {
    pub blink_on_ms: u64,
    pub blink_off_ms: u64,
    /// Maximum pending work signals per dispatcher worker.
    pub handshake_capacity: usize,
}

impl Default for DisplayCfg {
    fn default() -> Self {
        Self {
            blink_on_ms: 500,
            blink_off_ms: 200,
            handshake_capacity: 230,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Hardware {
    /// Linux I2C adapter number (`/dev/i2c-N`).
    pub i2c_bus: u8,
    pub i2c_address: u16,
    /// Value written to the ADXL345 OFSZ register at bring-up.
    pub z_offset: u8,
    /// GPIO for the manual override button; `None` disables it.
    pub override_pin: Option<u8>,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            i2c_address: 0x53,
            z_offset: 0xF3,
            override_pin: None,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub sensor: SensorCfg,
    pub classifier: ClassifierCfg,
    pub debounce: DebounceCfg,
    pub watchdog: WatchdogCfg,
    pub display: DisplayCfg,
    pub hardware: Hardware,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sensor
        if !(self.sensor.scale_divisor.is_finite() && self.sensor.scale_divisor > 0.0) {
            eyre::bail!("sensor.scale_divisor must be a positive number");
        }
        if self.sensor.sample_period_ms == 0 {
            eyre::bail!("sensor.sample_period_ms must be >= 1");
        }

        // Classifier
        let (lo, hi) = (self.classifier.lower, self.classifier.upper);
        if !lo.is_finite() || !hi.is_finite() {
            eyre::bail!("classifier bounds must be finite");
        }
        if lo >= 1.0 {
            eyre::bail!("classifier.lower must be < 1.0");
        }
        if hi <= 1.0 {
            eyre::bail!("classifier.upper must be > 1.0");
        }

        // Debounce
        if self.debounce.window == 0 {
            eyre::bail!("debounce.window must be >= 1");
        }
        if self.debounce.threshold == 0 || self.debounce.threshold >= self.debounce.window {
            eyre::bail!("debounce.threshold must be in 1..window");
        }

        // Watchdog
        if self.watchdog.timeout_ms == 0 {
            eyre::bail!("watchdog.timeout_ms must be >= 1");
        }
        if self.watchdog.timeout_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("watchdog.timeout_ms is unreasonably large (>24h)");
        }

        // Display
        if self.display.blink_on_ms == 0 || self.display.blink_off_ms == 0 {
            eyre::bail!("display.blink_on_ms and display.blink_off_ms must be >= 1");
        }
        if self.display.handshake_capacity == 0 {
            eyre::bail!("display.handshake_capacity must be >= 1");
        }

        // Hardware
        if self.hardware.i2c_address > 0x7F {
            eyre::bail!("hardware.i2c_address must be a 7-bit address");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
