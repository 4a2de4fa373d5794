//! Per-sample classification: is this reading outside the rest band?
//!
//! At rest the sensor only sees gravity, so the normalized vector magnitude
//! sits near 1 g. Chest movement pushes it out of the `(lower, upper)` band.
//! The band edges themselves count as movement.

use breath_traits::RawSample;

use crate::config::ClassifierCfg;
use crate::error::BuildError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeClassifier {
    scale_divisor: f64,
    lower: f64,
    upper: f64,
}

impl MagnitudeClassifier {
    /// Validates `lower < 1.0 < upper` and a positive divisor.
    pub fn new(cfg: ClassifierCfg) -> Result<Self, BuildError> {
        if !(cfg.scale_divisor.is_finite() && cfg.scale_divisor > 0.0) {
            return Err(BuildError::InvalidConfig("scale_divisor must be > 0"));
        }
        if !(cfg.lower.is_finite() && cfg.upper.is_finite()) {
            return Err(BuildError::InvalidConfig("classifier bounds must be finite"));
        }
        if !(cfg.lower < 1.0 && 1.0 < cfg.upper) {
            return Err(BuildError::InvalidConfig(
                "classifier bounds must satisfy lower < 1.0 < upper",
            ));
        }
        Ok(Self {
            scale_divisor: cfg.scale_divisor,
            lower: cfg.lower,
            upper: cfg.upper,
        })
    }

    /// `sqrt(x² + y² + z²) / scale_divisor`, in g.
    #[inline]
    pub fn magnitude(&self, s: RawSample) -> f64 {
        let (x, y, z) = (f64::from(s.x), f64::from(s.y), f64::from(s.z));
        (x * x + y * y + z * z).sqrt() / self.scale_divisor
    }

    /// True when `magnitude` is breath-like (outside the open rest band).
    #[inline]
    pub fn is_breath_like(&self, magnitude: f64) -> bool {
        !(self.lower < magnitude && magnitude < self.upper)
    }

    #[inline]
    pub fn classify(&self, s: RawSample) -> bool {
        self.is_breath_like(self.magnitude(s))
    }
}

impl Default for MagnitudeClassifier {
    fn default() -> Self {
        let cfg = ClassifierCfg::default();
        Self {
            scale_divisor: cfg.scale_divisor,
            lower: cfg.lower,
            upper: cfg.upper,
        }
    }
}
