//! Background sampling loop.
//!
//! Spawns a thread that owns the `SampleSource`, runs every reading through
//! the [`BreathMonitor`] and tells the state machine about each fresh
//! confirmation. Confirmations are delivered on this thread, synchronously
//! with the sample that produced them.
//!
//! A device identity fault stops the loop for good; other read errors skip
//! the sample. The thread is shut down and joined when the `Sampler` drops.
use breath_traits::SampleSource;
use breath_traits::clock::Clock;
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::MonitorError;
use crate::hw_error::map_hw_error;
use crate::spawn::spawn_named;
use crate::monitor::BreathMonitor;
use crate::state_machine::AlertStateMachine;

/// Counters updated by the sampling thread.
#[derive(Debug, Default)]
pub struct SamplerStats {
    samples: AtomicU64,
    breath_like: AtomicU64,
    confirmations: AtomicU64,
    skipped: AtomicU64,
    last_ok_ms: AtomicU64,
    halted: AtomicBool,
}

impl SamplerStats {
    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }
    pub fn breath_like(&self) -> u64 {
        self.breath_like.load(Ordering::Relaxed)
    }
    pub fn confirmations(&self) -> u64 {
        self.confirmations.load(Ordering::Relaxed)
    }
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
    /// True once a device fault has stopped the loop.
    pub fn halted(&self) -> bool {
        self.halted.load(Ordering::Relaxed)
    }
}

pub struct Sampler {
    stats: Arc<SamplerStats>,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    /// Join handle for graceful thread cleanup
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Sampler {
    pub fn spawn<S, C>(
        mut source: S,
        mut monitor: BreathMonitor,
        machine: Arc<AlertStateMachine>,
        period: Duration,
        clock: C,
        fatal: Option<xch::Sender<MonitorError>>,
    ) -> Result<Self, MonitorError>
    where
        S: SampleSource + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let stats = Arc::new(SamplerStats::default());
        let stats_bg = stats.clone();
        let clock = Arc::new(clock);
        let clock_bg = clock.clone();
        let epoch = clock.now();

        let join_handle = spawn_named("sampler", move || {
            let clock = clock_bg;
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("sampler thread received shutdown signal");
                    break;
                }

                match source.read() {
                    Ok(sample) => {
                        let out = monitor.process(sample);
                        stats_bg.samples.fetch_add(1, Ordering::Relaxed);
                        if out.breath_like {
                            stats_bg.breath_like.fetch_add(1, Ordering::Relaxed);
                        }
                        tracing::trace!(
                            x = sample.x,
                            y = sample.y,
                            z = sample.z,
                            magnitude = out.magnitude,
                            breath_like = out.breath_like,
                            count = out.count,
                            verdict = out.verdict,
                            "sample"
                        );
                        if out.confirmed {
                            stats_bg.confirmations.fetch_add(1, Ordering::Relaxed);
                            machine.breath_confirmed();
                        }
                        stats_bg
                            .last_ok_ms
                            .store(clock.ms_since(epoch), Ordering::Relaxed);
                    }
                    Err(e) => match map_hw_error(e.as_ref()) {
                        MonitorError::DeviceFault(msg) => {
                            tracing::error!(error = %msg, "sensor identity check failed; sampling halted");
                            stats_bg.halted.store(true, Ordering::Relaxed);
                            if let Some(tx) = &fatal {
                                let _ = tx.send(MonitorError::DeviceFault(msg));
                            }
                            break;
                        }
                        other => {
                            stats_bg.skipped.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(error = %other, "sensor read failed; sample skipped");
                        }
                    },
                }

                // Check shutdown before sleep to avoid unnecessary delay
                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(period);
            }
            tracing::trace!("sampler thread exiting cleanly");
        })?;

        Ok(Self {
            stats,
            clock,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        })
    }

    pub fn stats(&self) -> Arc<SamplerStats> {
        self.stats.clone()
    }

    /// Milliseconds between the last good read and `now_ms` (both from epoch).
    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.stats.last_ok_ms.load(Ordering::Relaxed))
    }

    /// Same as `stalled_for`, measured against the sampler's own clock.
    pub fn stalled_for_now(&self) -> u64 {
        self.stalled_for(self.clock.ms_since(self.epoch))
    }

    pub fn is_running(&self) -> bool {
        self.join_handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits between reads, or after the current read and sleep.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("sampler thread joined successfully");
                }
                Err(e) => {
                    tracing::warn!(?e, "sampler thread panicked during shutdown");
                }
            }
        }
    }
}
