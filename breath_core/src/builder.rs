//! Type-state builder for `Monitor`.
//!
//! The builder enforces at compile time that a sample source and a display
//! are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use breath_traits::clock::{Clock, MonotonicClock};
use breath_traits::{Display, SampleSource};

use crate::Monitor;
use crate::classifier::MagnitudeClassifier;
use crate::config::*;
use crate::debounce::DebounceFilter;
use crate::error::{BuildError, Result};
use crate::monitor::BreathMonitor;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

pub(crate) type BoxedSource = Box<dyn SampleSource + Send>;
pub(crate) type BoxedDisplay = Box<dyn Display + Send>;
pub(crate) type SharedClock = Arc<dyn Clock + Send + Sync>;

/// Builder for `Monitor`. All fields are validated on `build()`.
pub struct MonitorBuilder<S, D> {
    source: Option<BoxedSource>,
    display: Option<BoxedDisplay>,
    classifier: Option<ClassifierCfg>,
    debounce: Option<DebounceCfg>,
    watchdog: Option<WatchdogCfg>,
    dispatch: Option<DispatchCfg>,
    sampling: Option<SamplingCfg>,
    clock: Option<SharedClock>,
    _s: PhantomData<S>,
    _d: PhantomData<D>,
}

impl Default for MonitorBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            source: None,
            display: None,
            classifier: None,
            debounce: None,
            watchdog: None,
            dispatch: None,
            sampling: None,
            clock: None,
            _s: PhantomData,
            _d: PhantomData,
        }
    }
}

/// Validate configuration and assemble an idle `Monitor`.
///
/// Nothing is spawned here; threads start in `Monitor::start`.
#[allow(clippy::too_many_arguments)]
fn validate_and_build(
    source: BoxedSource,
    display: BoxedDisplay,
    classifier: ClassifierCfg,
    debounce: DebounceCfg,
    watchdog: WatchdogCfg,
    dispatch: DispatchCfg,
    sampling: SamplingCfg,
    clock: Option<SharedClock>,
) -> Result<Monitor> {
    let classifier = MagnitudeClassifier::new(classifier).map_err(eyre::Report::new)?;
    let filter = DebounceFilter::new(debounce).map_err(eyre::Report::new)?;

    if watchdog.timeout.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "watchdog timeout must be > 0",
        )));
    }
    if sampling.period.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "sample period must be > 0",
        )));
    }
    if dispatch.blink_on.is_zero() || dispatch.blink_off.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "blink durations must be > 0",
        )));
    }
    if dispatch.handshake_capacity == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "handshake capacity must be >= 1",
        )));
    }

    let clock: SharedClock = clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));

    Ok(Monitor {
        source,
        display,
        pipeline: BreathMonitor::new(classifier, filter),
        watchdog,
        dispatch,
        sampling,
        clock,
    })
}

impl<S, D> MonitorBuilder<S, D> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Monitor> {
        let source = self
            .source
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSource))?;
        let display = self
            .display
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDisplay))?;

        validate_and_build(
            source,
            display,
            self.classifier.unwrap_or_default(),
            self.debounce.unwrap_or_default(),
            self.watchdog.unwrap_or_default(),
            self.dispatch.unwrap_or_default(),
            self.sampling.unwrap_or_default(),
            self.clock,
        )
    }
}

/// Chainable setters that do not affect type-state.
impl<S, D> MonitorBuilder<S, D> {
    pub fn with_classifier(mut self, classifier: ClassifierCfg) -> Self {
        self.classifier = Some(classifier);
        self
    }
    pub fn with_debounce(mut self, debounce: DebounceCfg) -> Self {
        self.debounce = Some(debounce);
        self
    }
    pub fn with_watchdog(mut self, watchdog: WatchdogCfg) -> Self {
        self.watchdog = Some(watchdog);
        self
    }
    pub fn with_dispatch(mut self, dispatch: DispatchCfg) -> Self {
        self.dispatch = Some(dispatch);
        self
    }
    pub fn with_sampling(mut self, sampling: SamplingCfg) -> Self {
        self.sampling = Some(sampling);
        self
    }
    /// Apply every section of a loaded config file.
    pub fn with_config(self, cfg: &breath_config::Config) -> Self {
        self.with_classifier(ClassifierCfg::from(cfg))
            .with_debounce(DebounceCfg::from(&cfg.debounce))
            .with_watchdog(WatchdogCfg::from(&cfg.watchdog))
            .with_dispatch(DispatchCfg::from(&cfg.display))
            .with_sampling(SamplingCfg::from(&cfg.sensor))
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<D> MonitorBuilder<Missing, D> {
    pub fn with_source(
        self,
        source: impl SampleSource + Send + 'static,
    ) -> MonitorBuilder<Set, D> {
        MonitorBuilder {
            source: Some(Box::new(source)),
            display: self.display,
            classifier: self.classifier,
            debounce: self.debounce,
            watchdog: self.watchdog,
            dispatch: self.dispatch,
            sampling: self.sampling,
            clock: self.clock,
            _s: PhantomData,
            _d: PhantomData,
        }
    }
}

impl<S> MonitorBuilder<S, Missing> {
    pub fn with_display(self, display: impl Display + Send + 'static) -> MonitorBuilder<S, Set> {
        MonitorBuilder {
            source: self.source,
            display: Some(Box::new(display)),
            classifier: self.classifier,
            debounce: self.debounce,
            watchdog: self.watchdog,
            dispatch: self.dispatch,
            sampling: self.sampling,
            clock: self.clock,
            _s: PhantomData,
            _d: PhantomData,
        }
    }
}

impl MonitorBuilder<Set, Set> {
    /// Validate and build the Monitor. Only available when source and display are set.
    pub fn build(self) -> Result<Monitor> {
        self.try_build()
    }
}
