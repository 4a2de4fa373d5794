//! Human-readable error descriptions and structured JSON error formatting.

use breath_core::error::{BuildError, MonitorError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSource => {
                "What happened: No accelerometer was provided to the monitor.\nLikely causes: The sensor failed to initialize or was not wired into the builder.\nHow to fix: Ensure the ADXL345 is opened successfully and passed via with_source(...).".to_string()
            }
            BuildError::MissingDisplay => {
                "What happened: No display was provided to the monitor.\nLikely causes: The display failed to initialize or was not wired into the builder.\nHow to fix: Pass a display via with_display(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/breath_config.toml for a sample."
            ),
        };
    }

    if let Some(me) = err.downcast_ref::<MonitorError>() {
        return match me {
            MonitorError::DeviceFault(msg) => format!(
                "What happened: The accelerometer failed its identity check ({msg}).\nLikely causes: Wrong I2C address, loose wiring, or a different sensor on the bus.\nHow to fix: Check [hardware] i2c_bus/i2c_address in the config and the SDA/SCL/power wiring, then run `breath self-check`."
            ),
            MonitorError::ResourceExhausted { worker, capacity } => format!(
                "What happened: The {worker} display worker fell {capacity} signals behind.\nLikely causes: The display is blocking or far slower than the blink cadence.\nHow to fix: Check the display driver; raise display.handshake_capacity only if the backlog is expected."
            ),
            MonitorError::Spawn { thread, reason } => format!(
                "What happened: The system refused to start the {thread} thread ({reason}).\nLikely causes: The process hit its thread or memory limit.\nHow to fix: Check `ulimit -u` and free memory, stop other heavy processes, then rerun."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("parse config") || lower.starts_with("read config") {
        return format!(
            "What happened: The config file could not be loaded ({msg}).\nLikely causes: Missing file, TOML syntax error, or a misspelled section.\nHow to fix: Compare against etc/breath_config.toml and rerun."
        );
    }

    if lower.contains("must be") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: An out-of-range value in the TOML.\nHow to fix: Edit the config file and try again."
        );
    }

    if lower.contains("i2c") || lower.contains("bus error") {
        return "What happened: Failed to talk to the accelerometer over I2C.\nLikely causes: I2C not enabled, wrong bus number, or insufficient permissions.\nHow to fix: Enable I2C, fix [hardware] i2c_bus in the config, and make sure the process can open /dev/i2c-*.".to_string();
    }

    if lower.contains("gpio") {
        return "What happened: Failed to arm the override button.\nLikely causes: Incorrect pin number or insufficient GPIO permissions.\nHow to fix: Fix hardware.override_pin in the config or run with --no-override-input.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: device fault 3, resource exhaustion 4, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<MonitorError>() {
        Some(MonitorError::DeviceFault(_)) => 3,
        Some(MonitorError::ResourceExhausted { .. }) => 4,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<MonitorError>() {
        Some(MonitorError::DeviceFault(_)) => "DeviceFault",
        Some(MonitorError::ResourceExhausted { .. }) => "ResourceExhausted",
        Some(MonitorError::Hardware(_)) => "Hardware",
        Some(MonitorError::Display(_)) => "Display",
        Some(MonitorError::Config(_)) => "Config",
        Some(MonitorError::Spawn { .. }) => "Spawn",
        None if err.downcast_ref::<BuildError>().is_some() => "Build",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let msg = humanize(err);
    if let Some(MonitorError::ResourceExhausted { worker, capacity }) =
        err.downcast_ref::<MonitorError>()
    {
        return json!({
            "reason": reason_name(err),
            "details": { "worker": worker.to_string(), "capacity": capacity },
            "message": msg,
        })
        .to_string();
    }
    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": msg,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use breath_core::error::Worker;

    #[test]
    fn exit_codes_are_stable() {
        let fault = eyre::Report::new(MonitorError::DeviceFault("devid 0x00".into()));
        let full = eyre::Report::new(MonitorError::ResourceExhausted {
            worker: Worker::Blink,
            capacity: 230,
        });
        let other = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&fault), 3);
        assert_eq!(exit_code_for_error(&full), 4);
        assert_eq!(exit_code_for_error(&other), 1);
    }

    #[test]
    fn json_error_carries_reason() {
        let fault = eyre::Report::new(MonitorError::DeviceFault("devid 0x00".into()));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&fault)).unwrap();
        assert_eq!(v["reason"], "DeviceFault");
        assert_eq!(v["exit_code"], 3);
        assert!(v["message"].as_str().unwrap().contains("identity"));
    }

    #[test]
    fn build_error_is_humanized() {
        let e = eyre::Report::new(BuildError::InvalidConfig("debounce window must be >= 1"));
        assert!(humanize(&e).contains("debounce window"));
    }

    #[test]
    fn refused_thread_is_named_in_message_and_json() {
        let e = eyre::Report::new(MonitorError::Spawn {
            thread: "blink-worker",
            reason: "Resource temporarily unavailable".into(),
        });
        assert!(humanize(&e).contains("blink-worker thread"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "Spawn");
        assert_eq!(v["exit_code"], 1);
    }
}
