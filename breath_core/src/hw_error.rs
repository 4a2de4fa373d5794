//! Maps `Box<dyn Error>` from trait boundaries to typed `MonitorError`.
//!
//! The traits in `breath_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `breath_hardware::HwError` downcasting.

use crate::error::MonitorError;

/// Map a sample-source error to a typed `MonitorError`.
///
/// Identity mismatches become `DeviceFault`; everything else is a plain
/// `Hardware` error the sampling loop may skip past.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> MonitorError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<breath_hardware::error::HwError>() {
            return match hw {
                breath_hardware::error::HwError::DeviceId { .. } => {
                    MonitorError::DeviceFault(hw.to_string())
                }
                other => MonitorError::Hardware(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("device id") || lower.contains("devid") {
        MonitorError::DeviceFault(s)
    } else {
        MonitorError::Hardware(s)
    }
}
