//! Test and helper mocks for breath_core

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use breath_traits::{BoxError, Display, RawSample, SampleSource};

/// Reading of a sensor lying flat and still: exactly 1 g on z.
pub const REST: RawSample = RawSample::new(0, 0, 256);
/// Reading well outside the rest band.
pub const MOVING: RawSample = RawSample::new(0, 0, 300);

/// A source that always reports the sensor at rest.
pub struct StillSource;

impl SampleSource for StillSource {
    fn read(&mut self) -> Result<RawSample, BoxError> {
        Ok(REST)
    }
}

/// Plays back a fixed script, then keeps returning `then`.
pub struct ScriptedSource {
    script: VecDeque<RawSample>,
    then: RawSample,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = RawSample>, then: RawSample) -> Self {
        Self {
            script: script.into_iter().collect(),
            then,
        }
    }
}

impl SampleSource for ScriptedSource {
    fn read(&mut self) -> Result<RawSample, BoxError> {
        Ok(self.script.pop_front().unwrap_or(self.then))
    }
}

/// Succeeds `good_reads` times, then reports a device identity mismatch.
pub struct FaultySource {
    good_reads: usize,
}

impl FaultySource {
    pub fn new(good_reads: usize) -> Self {
        Self { good_reads }
    }
}

impl SampleSource for FaultySource {
    fn read(&mut self) -> Result<RawSample, BoxError> {
        if self.good_reads == 0 {
            return Err(Box::new(std::io::Error::other(
                "device id mismatch: expected 0xe5, found 0x00",
            )));
        }
        self.good_reads -= 1;
        Ok(REST)
    }
}

/// One call made against a [`RecordingDisplay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    Alert,
    Normal,
    Clear,
}

/// Shared, timestamped log of display calls.
pub type FrameLog = Arc<Mutex<Vec<(Instant, Frame)>>>;

/// A display that records every call instead of drawing.
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    log: FrameLog,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> FrameLog {
        self.log.clone()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, f)| *f)
            .collect()
    }

    fn push(&self, f: Frame) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((Instant::now(), f));
    }
}

impl Display for RecordingDisplay {
    fn render_alert(&mut self) -> Result<(), BoxError> {
        self.push(Frame::Alert);
        Ok(())
    }
    fn render_normal(&mut self) -> Result<(), BoxError> {
        self.push(Frame::Normal);
        Ok(())
    }
    fn clear(&mut self) -> Result<(), BoxError> {
        self.push(Frame::Clear);
        Ok(())
    }
}

/// A display that accepts and discards everything.
pub struct NullDisplay;

impl Display for NullDisplay {
    fn render_alert(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
    fn render_normal(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
    fn clear(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}
