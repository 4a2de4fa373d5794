//! Named background threads. A failed spawn is an error, never a silent no-op.

use std::thread::{Builder, JoinHandle};

use crate::error::MonitorError;

pub(crate) fn spawn_named<F, T>(name: &'static str, f: F) -> Result<JoinHandle<T>, MonitorError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    spawn_with(Builder::new(), name, f)
}

pub(crate) fn spawn_with<F, T>(
    builder: Builder,
    name: &'static str,
    f: F,
) -> Result<JoinHandle<T>, MonitorError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    builder.name(name.into()).spawn(f).map_err(|e| {
        tracing::error!(thread = name, error = %e, "failed to spawn thread");
        MonitorError::Spawn {
            thread: name,
            reason: e.to_string(),
        }
    })
}

/// A stack no address space can hold; the OS refuses the thread.
#[cfg(all(test, target_pointer_width = "64"))]
pub(crate) fn unspawnable() -> Builder {
    Builder::new().stack_size(1 << 62)
}
