#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core breath-monitoring logic (hardware-agnostic).
//!
//! All hardware goes through `breath_traits::SampleSource` and
//! `breath_traits::Display`.
//!
//! ## Architecture
//!
//! - **Classification**: magnitude in g against a rest band (`classifier`)
//! - **Debounce**: sliding window with a running count (`debounce`)
//! - **Pipeline**: classify, debounce, detect rising edges (`monitor`)
//! - **Watchdog**: restartable single-shot countdown (`watchdog`)
//! - **State machine**: Normal/Warning driven by the watchdog, confirmed
//!   breaths and the manual override (`state_machine`)
//! - **Dispatcher**: controller plus blink and steady workers on one
//!   display (`dispatcher`)
//! - **Sampler**: fixed-period reading thread (`sampler`)
//!
//! ## Threads
//!
//! A started monitor runs five threads: sampler, watchdog, alert
//! controller and the two display workers. Dropping the `MonitorHandle`
//! stops and joins all of them. If the OS refuses any of them, `start`
//! fails with `MonitorError::Spawn` and the threads already running are
//! torn down.

pub mod builder;
pub mod classifier;
pub mod config;
pub mod conversions;
pub mod debounce;
pub mod dispatcher;
pub mod error;
pub mod handshake;
pub mod hw_error;
pub mod mocks;
pub mod monitor;
pub mod runner;
pub mod sampler;
pub mod signal;
mod spawn;
pub mod state_machine;
pub mod status;
pub mod watchdog;

use std::sync::Arc;

use crossbeam_channel as xch;

use crate::builder::{BoxedDisplay, BoxedSource, SharedClock};
use crate::config::{DispatchCfg, SamplingCfg, WatchdogCfg};
use crate::dispatcher::{AlertDispatcher, DispatchStats};
use crate::error::{MonitorError, Result};
use crate::monitor::BreathMonitor;
use crate::sampler::{Sampler, SamplerStats};
use crate::state_machine::{AlertState, AlertStateMachine, Transition};
use crate::status::MonitorSnapshot;

pub use crate::builder::{Missing, MonitorBuilder, Set};
pub use crate::classifier::MagnitudeClassifier;
pub use crate::debounce::DebounceFilter;
pub use crate::error::BuildError;
pub use crate::monitor::SampleOutcome;
pub use crate::runner::{RunSummary, StopReason};

/// A fully configured monitor that has not started any threads yet.
pub struct Monitor {
    pub(crate) source: BoxedSource,
    pub(crate) display: BoxedDisplay,
    pub(crate) pipeline: BreathMonitor,
    pub(crate) watchdog: WatchdogCfg,
    pub(crate) dispatch: DispatchCfg,
    pub(crate) sampling: SamplingCfg,
    pub(crate) clock: SharedClock,
}

impl core::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Monitor")
            .field("pipeline", &self.pipeline)
            .field("watchdog", &self.watchdog)
            .field("dispatch", &self.dispatch)
            .field("sampling", &self.sampling)
            .finish_non_exhaustive()
    }
}

impl Monitor {
    /// Start building a Monitor.
    pub fn builder() -> MonitorBuilder<Missing, Missing> {
        MonitorBuilder::default()
    }

    /// Enter `Normal`, arm the watchdog and spawn the dispatcher and sampler.
    pub fn start(self) -> Result<MonitorHandle> {
        let machine = Arc::new(AlertStateMachine::start(self.watchdog)?);
        let (fatal_tx, fatal_rx) = xch::unbounded();

        let dispatcher = AlertDispatcher::spawn(
            self.display,
            machine.signal(),
            self.dispatch,
            self.clock.clone(),
            Some(fatal_tx.clone()),
        )?;

        let sampler = Sampler::spawn(
            self.source,
            self.pipeline,
            machine.clone(),
            self.sampling.period,
            self.clock,
            Some(fatal_tx),
        )?;

        tracing::info!(
            period_ms = self.sampling.period.as_millis() as u64,
            timeout_ms = self.watchdog.timeout.as_millis() as u64,
            "monitor started"
        );

        Ok(MonitorHandle {
            sampler: Some(sampler),
            dispatcher: Some(dispatcher),
            machine,
            fatal: fatal_rx,
        })
    }
}

/// A running monitor.
///
/// Teardown order on drop: the sampler stops first so no confirmation can
/// arrive afterwards, then the dispatcher, then the watchdog with the last
/// strong reference to the state machine. Override inputs outside the handle
/// must hold a [`Weak`](std::sync::Weak) from [`MonitorHandle::override_target`]
/// so they never keep the watchdog alive past shutdown.
pub struct MonitorHandle {
    sampler: Option<Sampler>,
    dispatcher: Option<AlertDispatcher>,
    machine: Arc<AlertStateMachine>,
    fatal: xch::Receiver<MonitorError>,
}

impl MonitorHandle {
    pub fn state(&self) -> AlertState {
        self.machine.state()
    }

    /// Deliver one edge from the manual override input.
    pub fn toggle_override(&self) -> Transition {
        self.machine.toggle_override()
    }

    /// Shared state machine, for feeding the override from another thread.
    pub fn machine(&self) -> Arc<AlertStateMachine> {
        self.machine.clone()
    }

    /// Weak handle on the state machine for override inputs that may
    /// outlive this handle, e.g. a thread blocked on stdin.
    pub fn override_target(&self) -> std::sync::Weak<AlertStateMachine> {
        Arc::downgrade(&self.machine)
    }

    /// Errors that stopped a background thread.
    pub fn fatal(&self) -> &xch::Receiver<MonitorError> {
        &self.fatal
    }

    pub fn sampler_stats(&self) -> Option<Arc<SamplerStats>> {
        self.sampler.as_ref().map(Sampler::stats)
    }

    pub fn dispatch_stats(&self) -> Option<Arc<DispatchStats>> {
        self.dispatcher.as_ref().map(AlertDispatcher::stats)
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        let s = self.sampler_stats();
        let d = self.dispatch_stats();
        MonitorSnapshot {
            state: self.machine.state(),
            samples: s.as_ref().map_or(0, |s| s.samples()),
            breath_like: s.as_ref().map_or(0, |s| s.breath_like()),
            confirmations: s.as_ref().map_or(0, |s| s.confirmations()),
            skipped: s.as_ref().map_or(0, |s| s.skipped()),
            sampler_halted: s.as_ref().is_some_and(|s| s.halted()),
            since_last_read_ms: self.sampler.as_ref().map_or(0, Sampler::stalled_for_now),
            watchdog_expirations: self.machine.expirations(),
            overrides: self.machine.overrides(),
            blinks: d.as_ref().map_or(0, |d| d.blinks()),
            steady_renders: d.as_ref().map_or(0, |d| d.steady_renders()),
            render_errors: d.as_ref().map_or(0, |d| d.render_errors()),
        }
    }

    /// Stop and join every background thread.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(s) = self.sampler.take() {
            drop(s);
            tracing::debug!("sampler stopped");
        }
        if let Some(d) = self.dispatcher.take() {
            drop(d);
            tracing::debug!("dispatcher stopped");
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl core::fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("machine", &self.machine)
            .field("sampler_running", &self.sampler.as_ref().is_some_and(Sampler::is_running))
            .finish_non_exhaustive()
    }
}
