//! Per-sample pipeline: classify, debounce, detect a fresh confirmation.

use breath_traits::RawSample;

use crate::classifier::MagnitudeClassifier;
use crate::debounce::DebounceFilter;

/// What one sample did to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOutcome {
    pub magnitude: f64,
    pub breath_like: bool,
    pub count: usize,
    pub verdict: bool,
    /// Verdict just went false -> true. Only these reset the watchdog.
    pub confirmed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BreathMonitor {
    classifier: MagnitudeClassifier,
    filter: DebounceFilter,
    last_verdict: bool,
}

impl BreathMonitor {
    pub fn new(classifier: MagnitudeClassifier, filter: DebounceFilter) -> Self {
        Self {
            classifier,
            filter,
            last_verdict: false,
        }
    }

    pub fn process(&mut self, sample: RawSample) -> SampleOutcome {
        let magnitude = self.classifier.magnitude(sample);
        let breath_like = self.classifier.is_breath_like(magnitude);
        let (verdict, confirmed) = self.admit(breath_like);
        SampleOutcome {
            magnitude,
            breath_like,
            count: self.filter.count(),
            verdict,
            confirmed,
        }
    }

    /// Feed a classification directly; returns `(verdict, confirmed)`.
    pub fn admit(&mut self, breath_like: bool) -> (bool, bool) {
        let verdict = self.filter.admit(breath_like);
        let confirmed = verdict && !self.last_verdict;
        if verdict != self.last_verdict {
            tracing::debug!(verdict, count = self.filter.count(), "breath verdict changed");
        }
        self.last_verdict = verdict;
        (verdict, confirmed)
    }

    pub fn verdict(&self) -> bool {
        self.last_verdict
    }

    pub fn filter(&self) -> &DebounceFilter {
        &self.filter
    }

    pub fn classifier(&self) -> &MagnitudeClassifier {
        &self.classifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirms_only_on_rising_edge() {
        let mut m = BreathMonitor::default();
        let mut confirmations = 0;
        for _ in 0..20 {
            let (_, c) = m.admit(true);
            confirmations += usize::from(c);
        }
        assert_eq!(confirmations, 1);
        assert!(m.verdict());
    }

    #[test]
    fn still_readings_never_confirm() {
        let mut m = BreathMonitor::default();
        for _ in 0..100 {
            let out = m.process(RawSample::new(0, 0, 256));
            assert!(!out.breath_like && !out.confirmed);
        }
        assert_eq!(m.filter().count(), 0);
    }
}
