use breath_config::{load_file, load_toml};
use rstest::rstest;
use std::fs;
use tempfile::tempdir;

#[rstest]
#[case("[classifier]\nlower = 1.0\n", "classifier.lower must be < 1.0")]
#[case("[classifier]\nupper = 0.99\n", "classifier.upper must be > 1.0")]
#[case("[classifier]\nlower = nan\n", "must be finite")]
#[case("[debounce]\nwindow = 0\nthreshold = 0\n", "debounce.window must be >= 1")]
#[case("[debounce]\nwindow = 8\nthreshold = 8\n", "threshold must be in 1..window")]
#[case("[debounce]\nthreshold = 0\n", "threshold must be in 1..window")]
#[case("[sensor]\nscale_divisor = 0.0\n", "scale_divisor must be a positive number")]
#[case("[sensor]\nsample_period_ms = 0\n", "sample_period_ms must be >= 1")]
#[case("[watchdog]\ntimeout_ms = 0\n", "timeout_ms must be >= 1")]
#[case("[display]\nhandshake_capacity = 0\n", "handshake_capacity must be >= 1")]
#[case("[display]\nblink_off_ms = 0\n", "blink_off_ms must be >= 1")]
#[case("[hardware]\ni2c_address = 256\n", "7-bit address")]
fn rejects_out_of_range_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "expected {needle:?} in {err}"
    );
}

#[test]
fn accepts_full_config() {
    let toml = r#"
[sensor]
scale_divisor = 256.0
sample_period_ms = 10

[classifier]
lower = 0.975
upper = 1.025

[debounce]
window = 35
threshold = 7

[watchdog]
timeout_ms = 12000

[display]
blink_on_ms = 500
blink_off_ms = 200
handshake_capacity = 230

[hardware]
i2c_bus = 1
i2c_address = 0x53
z_offset = 0xF3
override_pin = 17

[logging]
level = "debug"
rotation = "daily"
"#;

    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.hardware.override_pin, Some(17));
}

#[test]
fn load_file_reports_path_on_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[debounce\nwindow = 3").unwrap();
    let err = load_file(&path).expect_err("malformed TOML");
    assert!(format!("{err}").contains("bad.toml"));
}

#[test]
fn load_file_validates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(&path, "[debounce]\nwindow = 4\nthreshold = 5\n").unwrap();
    assert!(load_file(&path).is_err());
}
