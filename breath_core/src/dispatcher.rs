//! Visual side of the alert: a controller thread and two display workers.
//!
//! The controller looks at the alert level once per cycle and hands exactly
//! one unit of work to one worker:
//!
//! - `Warning`: signal the blink worker, then wait until it reports one full
//!   blink (on, hold, clear, hold) before looking again.
//! - `Normal`: signal the steady worker, wait for its render to land, then
//!   block until the alert level is raised.
//!
//! Because the controller never issues new work before the previous unit is
//! reported done, at most one worker touches the display at a time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use breath_traits::{Clock, Display};
use crossbeam_channel as xch;

use eyre::Report;

use crate::config::DispatchCfg;
use crate::error::{BuildError, MonitorError, Worker};
use crate::handshake::{Handshake, handshake};
use crate::signal::AlertSignal;
use crate::spawn::spawn_named;

/// Counters of completed visual work.
#[derive(Debug, Default)]
pub struct DispatchStats {
    blinks: AtomicU64,
    steady: AtomicU64,
    render_errors: AtomicU64,
}

impl DispatchStats {
    pub fn blinks(&self) -> u64 {
        self.blinks.load(Ordering::Relaxed)
    }

    pub fn steady_renders(&self) -> u64 {
        self.steady.load(Ordering::Relaxed)
    }

    pub fn render_errors(&self) -> u64 {
        self.render_errors.load(Ordering::Relaxed)
    }
}

pub struct AlertDispatcher {
    signal: Arc<AlertSignal>,
    stats: Arc<DispatchStats>,
    controller: Option<JoinHandle<Result<(), MonitorError>>>,
    workers: Vec<JoinHandle<()>>,
}

type Surface<D> = Arc<Mutex<D>>;

fn render<D: Display>(
    surface: &Surface<D>,
    stats: &DispatchStats,
    what: &'static str,
    f: impl FnOnce(&mut D) -> Result<(), breath_traits::BoxError>,
) {
    let mut d = surface.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = f(&mut d) {
        stats.render_errors.fetch_add(1, Ordering::Relaxed);
        tracing::error!(error = %e, what, "display render failed");
    }
}

impl AlertDispatcher {
    /// Spawn the controller and both workers against `display`.
    ///
    /// `fatal` receives the controller's error if it has to stop, e.g. when a
    /// handshake overflows.
    pub fn spawn<D, C>(
        display: D,
        signal: Arc<AlertSignal>,
        cfg: DispatchCfg,
        clock: C,
        fatal: Option<xch::Sender<MonitorError>>,
    ) -> eyre::Result<Self>
    where
        D: Display + Send + 'static,
        C: Clock + Clone + Send + 'static,
    {
        if cfg.handshake_capacity == 0 {
            return Err(Report::new(BuildError::InvalidConfig(
                "handshake capacity must be >= 1",
            )));
        }
        if cfg.blink_on.is_zero() || cfg.blink_off.is_zero() {
            return Err(Report::new(BuildError::InvalidConfig(
                "blink durations must be > 0",
            )));
        }

        let surface: Surface<D> = Arc::new(Mutex::new(display));
        let stats = Arc::new(DispatchStats::default());
        let (blink_hs, blink_rx) = handshake(Worker::Blink, cfg.handshake_capacity);
        let (steady_hs, steady_rx) = handshake(Worker::Steady, cfg.handshake_capacity);
        // Workers report each finished unit here.
        let (done_tx, done_rx) = xch::unbounded::<Worker>();

        let blink = {
            let surface = surface.clone();
            let stats = stats.clone();
            let done = done_tx.clone();
            let clock = clock.clone();
            spawn_named("blink-worker", move || {
                for () in blink_rx.iter() {
                    render(&surface, &stats, "alert", |d| d.render_alert());
                    clock.sleep(cfg.blink_on);
                    render(&surface, &stats, "clear", |d| d.clear());
                    clock.sleep(cfg.blink_off);
                    stats.blinks.fetch_add(1, Ordering::Relaxed);
                    if done.send(Worker::Blink).is_err() {
                        break;
                    }
                }
                tracing::trace!("blink worker exiting");
            })?
        };

        let steady = {
            let surface = surface.clone();
            let stats = stats.clone();
            let done = done_tx;
            spawn_named("steady-worker", move || {
                for () in steady_rx.iter() {
                    render(&surface, &stats, "normal", |d| d.render_normal());
                    stats.steady.fetch_add(1, Ordering::Relaxed);
                    if done.send(Worker::Steady).is_err() {
                        break;
                    }
                }
                tracing::trace!("steady worker exiting");
            })
        };
        let steady = match steady {
            Ok(h) => h,
            Err(e) => {
                // Closing the blink handshake lets that worker exit.
                drop(blink_hs);
                join_worker(blink);
                return Err(Report::new(e));
            }
        };

        let controller = {
            let signal = signal.clone();
            spawn_named("alert-controller", move || {
                let res = control_loop(&signal, &blink_hs, &steady_hs, &done_rx);
                if let Err(e) = &res {
                    tracing::error!(error = %e, "alert controller stopped");
                    if let Some(tx) = fatal {
                        let _ = tx.send(e.clone());
                    }
                }
                res
            })
        };
        // A refused controller dropped both handshakes with its closure.
        let controller = match controller {
            Ok(h) => h,
            Err(e) => {
                join_worker(blink);
                join_worker(steady);
                return Err(Report::new(e));
            }
        };

        Ok(Self {
            signal,
            stats,
            controller: Some(controller),
            workers: vec![blink, steady],
        })
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }

    /// Whether the controller thread has returned (normally only on error).
    pub fn is_finished(&self) -> bool {
        self.controller.as_ref().is_none_or(|h| h.is_finished())
    }
}

fn join_worker(h: JoinHandle<()>) {
    if let Err(e) = h.join() {
        tracing::warn!(?e, "dispatcher worker panicked during shutdown");
    }
}

fn control_loop(
    signal: &AlertSignal,
    blink: &Handshake,
    steady: &Handshake,
    done: &xch::Receiver<Worker>,
) -> Result<(), MonitorError> {
    loop {
        if signal.is_closed() {
            return Ok(());
        }
        if signal.is_set() {
            blink.signal()?;
            tracing::trace!(pending = blink.pending(), "blink issued");
            if !wait_done(done, Worker::Blink) {
                return Ok(());
            }
        } else {
            steady.signal()?;
            tracing::trace!(pending = steady.pending(), "steady issued");
            if !wait_done(done, Worker::Steady) {
                return Ok(());
            }
            if !signal.wait_set() {
                return Ok(());
            }
        }
    }
}

/// Wait for `worker` to report one finished unit. False if workers are gone.
fn wait_done(done: &xch::Receiver<Worker>, worker: Worker) -> bool {
    loop {
        match done.recv() {
            Ok(w) if w == worker => return true,
            Ok(other) => tracing::warn!(%other, expected = %worker, "unexpected completion"),
            Err(_) => return false,
        }
    }
}

impl Drop for AlertDispatcher {
    fn drop(&mut self) {
        self.signal.close();
        if let Some(h) = self.controller.take() {
            match h.join() {
                Ok(_) => tracing::trace!("alert controller joined"),
                Err(e) => tracing::warn!(?e, "alert controller panicked during shutdown"),
            }
        }
        // Controller dropped both handshakes; workers drain and exit.
        for h in self.workers.drain(..) {
            join_worker(h);
        }
    }
}
