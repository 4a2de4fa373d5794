pub mod clock;

pub use clock::{Clock, MonotonicClock};
#[cfg(any(test, feature = "test-clock"))]
pub use clock::TestClock;

/// Error type crossing the hardware trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One tri-axis accelerometer reading in raw sensor counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl RawSample {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }
}

/// Accelerometer that yields one reading per call.
///
/// Implementations verify the device identity before reading; a mismatch is
/// reported as an error the caller treats as fatal.
pub trait SampleSource {
    fn read(&mut self) -> Result<RawSample, BoxError>;
}

/// The single drawable surface the alert dispatcher drives.
pub trait Display {
    /// Solid alert fill, held until cleared.
    fn render_alert(&mut self) -> Result<(), BoxError>;
    /// Solid normal fill, held until superseded.
    fn render_normal(&mut self) -> Result<(), BoxError>;
    /// Blank the foreground between blinks.
    fn clear(&mut self) -> Result<(), BoxError>;
}

impl<T: SampleSource + ?Sized> SampleSource for Box<T> {
    fn read(&mut self) -> Result<RawSample, BoxError> {
        (**self).read()
    }
}

impl<T: Display + ?Sized> Display for Box<T> {
    fn render_alert(&mut self) -> Result<(), BoxError> {
        (**self).render_alert()
    }
    fn render_normal(&mut self) -> Result<(), BoxError> {
        (**self).render_normal()
    }
    fn clear(&mut self) -> Result<(), BoxError> {
        (**self).clear()
    }
}
