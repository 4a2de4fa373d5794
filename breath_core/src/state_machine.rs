//! Normal/Warning alert controller.
//!
//! ```text
//!            watchdog expired
//!   Normal ───────────────────► Warning
//!     ▲ │                          │
//!     │ └─ breath confirmed ──┐    │ breath confirmed
//!     │   (deadline refreshed)│    │ (deadline refreshed)
//!     └───────────────────────┴────┘
//! ```
//!
//! The state is the level of the shared [`AlertSignal`]: set means
//! `Warning`. The watchdog callback only ever raises it; a confirmed breath
//! clears it and re-arms the watchdog under the timer lock, so an expiry
//! racing a confirmation is either fully before it or superseded by it. The
//! manual override flips the same level, and whichever write lands last wins.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use eyre::Report;

use crate::config::WatchdogCfg;
use crate::error::{BuildError, Result};
use crate::signal::AlertSignal;
use crate::watchdog::{Deadline, WatchdogTimer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Normal,
    Warning,
}

impl AlertState {
    fn from_level(set: bool) -> Self {
        if set {
            AlertState::Warning
        } else {
            AlertState::Normal
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertState::Normal => "normal",
            AlertState::Warning => "warning",
        }
    }
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    WatchdogExpired,
    BreathConfirmed,
    ManualOverride,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: AlertState,
    pub to: AlertState,
    pub cause: Cause,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

pub struct AlertStateMachine {
    signal: Arc<AlertSignal>,
    watchdog: WatchdogTimer,
    timeout: Duration,
    confirmations: AtomicU64,
    overrides: AtomicU64,
}

impl AlertStateMachine {
    /// Enter `Normal` and arm the watchdog for the first time.
    pub fn start(cfg: WatchdogCfg) -> Result<Self> {
        if cfg.timeout.is_zero() {
            return Err(Report::new(BuildError::InvalidConfig(
                "watchdog timeout must be > 0",
            )));
        }
        let signal = Arc::new(AlertSignal::new());
        let sig = signal.clone();
        let watchdog = WatchdogTimer::spawn(move |d| {
            if !sig.set() {
                tracing::warn!(deadline = d.id, "no breath confirmed in time; raising alert");
            }
        })
        .map_err(Report::new)?;
        let first = watchdog.reset(cfg.timeout);
        tracing::info!(
            timeout_ms = cfg.timeout.as_millis() as u64,
            deadline = first.id,
            "alert state machine started in normal"
        );
        Ok(Self {
            signal,
            watchdog,
            timeout: cfg.timeout,
            confirmations: AtomicU64::new(0),
            overrides: AtomicU64::new(0),
        })
    }

    pub fn state(&self) -> AlertState {
        AlertState::from_level(self.signal.is_set())
    }

    /// Shared read handle on the alert level for the dispatcher.
    pub fn signal(&self) -> Arc<AlertSignal> {
        self.signal.clone()
    }

    /// A breath was confirmed: clear any alert and push the deadline out.
    /// Applies in both states; from `Normal` it is a refreshing self-transition.
    pub fn breath_confirmed(&self) -> Transition {
        let (deadline, was_set) = self
            .watchdog
            .reset_with(self.timeout, || self.signal.clear());
        self.confirmations.fetch_add(1, Ordering::Relaxed);
        let t = Transition {
            from: AlertState::from_level(was_set),
            to: AlertState::Normal,
            cause: Cause::BreathConfirmed,
        };
        if t.changed() {
            tracing::info!(deadline = deadline.id, "breath confirmed; alert cleared");
        } else {
            tracing::debug!(deadline = deadline.id, "breath confirmed; watchdog refreshed");
        }
        t
    }

    /// One edge from the manual override input: flip the alert level.
    pub fn toggle_override(&self) -> Transition {
        let now_set = self.signal.toggle();
        self.overrides.fetch_add(1, Ordering::Relaxed);
        let to = AlertState::from_level(now_set);
        let from = AlertState::from_level(!now_set);
        tracing::info!(%from, %to, "manual override");
        Transition {
            from,
            to,
            cause: Cause::ManualOverride,
        }
    }

    pub fn deadline(&self) -> Option<Deadline> {
        self.watchdog.pending()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn expirations(&self) -> u64 {
        self.watchdog.expirations()
    }

    pub fn confirmations(&self) -> u64 {
        self.confirmations.load(Ordering::Relaxed)
    }

    pub fn overrides(&self) -> u64 {
        self.overrides.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for AlertStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertStateMachine")
            .field("state", &self.state())
            .field("timeout", &self.timeout)
            .field("deadline", &self.deadline())
            .field("confirmations", &self.confirmations())
            .finish()
    }
}
