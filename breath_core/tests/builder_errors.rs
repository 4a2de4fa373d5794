use breath_core::config::{DebounceCfg, DispatchCfg, WatchdogCfg};
use breath_core::error::BuildError;
use breath_core::mocks::{NullDisplay, StillSource};
use breath_core::{Monitor, MonitorBuilder, Missing};
use rstest::rstest;
use std::time::Duration;

#[rstest]
fn builder_missing_source_yields_typed_build_error() {
    let err = Monitor::builder()
        // missing with_source()
        .with_display(NullDisplay)
        .try_build()
        .expect_err("should fail with MissingSource");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingSource) => {}
        other => panic!("expected MissingSource, got: {other:?}"),
    }
}

#[rstest]
fn builder_missing_display_yields_typed_build_error() {
    let err = Monitor::builder()
        .with_source(StillSource)
        .try_build()
        .expect_err("should fail with MissingDisplay");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingDisplay) => {}
        other => panic!("expected MissingDisplay, got: {other:?}"),
    }
}

fn complete() -> MonitorBuilder<breath_core::Set, breath_core::Set> {
    let b: MonitorBuilder<Missing, Missing> = Monitor::builder();
    b.with_source(StillSource).with_display(NullDisplay)
}

#[rstest]
#[case::threshold_equals_window(DebounceCfg { window: 7, threshold: 7 })]
#[case::zero_threshold(DebounceCfg { window: 35, threshold: 0 })]
#[case::empty_window(DebounceCfg { window: 0, threshold: 0 })]
fn invalid_debounce_is_rejected(#[case] cfg: DebounceCfg) {
    let err = complete().with_debounce(cfg).build().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

#[rstest]
fn zero_watchdog_is_rejected() {
    let err = complete()
        .with_watchdog(WatchdogCfg {
            timeout: Duration::ZERO,
        })
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("watchdog"));
}

#[rstest]
fn zero_handshake_capacity_is_rejected() {
    let err = complete()
        .with_dispatch(DispatchCfg {
            handshake_capacity: 0,
            ..DispatchCfg::default()
        })
        .build()
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

#[rstest]
fn defaults_build_without_starting_threads() {
    let monitor = complete().build().expect("defaults are valid");
    // Dropping an unstarted monitor must not block.
    drop(monitor);
}

#[rstest]
fn config_file_defaults_build() {
    let cfg = breath_config::Config::default();
    complete().with_config(&cfg).build().expect("file defaults are valid");
}
