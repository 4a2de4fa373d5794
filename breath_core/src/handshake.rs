//! Bounded counting handshake between the dispatcher controller and a worker.
//!
//! A bounded `crossbeam_channel` of `()` is the counter: `signal` adds one
//! pending unit, the worker's `recv` takes one. The channel length can never
//! go below zero, and a full channel is reported as resource exhaustion
//! instead of dropping the signal.

use crossbeam_channel as xch;

use crate::error::{MonitorError, Worker};

#[derive(Debug, Clone)]
pub struct Handshake {
    tx: xch::Sender<()>,
    worker: Worker,
    capacity: usize,
}

/// Create a handshake for `worker` holding at most `capacity` pending signals.
pub fn handshake(worker: Worker, capacity: usize) -> (Handshake, xch::Receiver<()>) {
    let capacity = capacity.max(1);
    let (tx, rx) = xch::bounded(capacity);
    (
        Handshake {
            tx,
            worker,
            capacity,
        },
        rx,
    )
}

impl Handshake {
    /// Add one unit of pending work for the worker.
    pub fn signal(&self) -> Result<(), MonitorError> {
        match self.tx.try_send(()) {
            Ok(()) => Ok(()),
            Err(xch::TrySendError::Full(())) => Err(MonitorError::ResourceExhausted {
                worker: self.worker,
                capacity: self.capacity,
            }),
            Err(xch::TrySendError::Disconnected(())) => Err(MonitorError::Display(format!(
                "{} worker has stopped",
                self.worker
            ))),
        }
    }

    /// Signals issued but not yet taken by the worker.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn worker(&self) -> Worker {
        self.worker
    }
}
