use thiserror::Error;

/// Which dispatcher worker a handshake belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Worker {
    Blink,
    Steady,
}

impl std::fmt::Display for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Worker::Blink => f.write_str("blink"),
            Worker::Steady => f.write_str("steady"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MonitorError {
    /// Sensor identity check failed; the sampling loop stops.
    #[error("device fault: {0}")]
    DeviceFault(String),
    /// A worker fell `capacity` signals behind.
    #[error("{worker} handshake exhausted (capacity {capacity})")]
    ResourceExhausted { worker: Worker, capacity: usize },
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("display error: {0}")]
    Display(String),
    #[error("configuration error: {0}")]
    Config(String),
    /// The OS refused to start a background thread.
    #[error("failed to spawn {thread} thread: {reason}")]
    Spawn { thread: &'static str, reason: String },
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing sample source")]
    MissingSource,
    #[error("missing display")]
    MissingDisplay,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
