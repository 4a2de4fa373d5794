//! Sliding-window debounce over per-sample classifications.
//!
//! The window keeps the last `capacity` classifications and a running count
//! of the `true` ones. The count is maintained from the evicted/inserted pair
//! on every admit, never by rescanning:
//!
//! | evicted \ inserted | true | false |
//! |--------------------|------|-------|
//! | true               | 0    | -1    |
//! | false              | +1   | 0     |
//!
//! Before the window fills nothing is evicted and each `true` adds one.

use std::collections::VecDeque;

use crate::config::DebounceCfg;
use crate::error::BuildError;

#[derive(Debug, Clone)]
pub struct DebounceFilter {
    window: VecDeque<bool>,
    capacity: usize,
    threshold: usize,
    count: usize,
}

impl DebounceFilter {
    /// Requires `0 < threshold < window`.
    pub fn new(cfg: DebounceCfg) -> Result<Self, BuildError> {
        if cfg.window == 0 {
            return Err(BuildError::InvalidConfig("debounce window must be >= 1"));
        }
        if cfg.threshold == 0 || cfg.threshold >= cfg.window {
            return Err(BuildError::InvalidConfig(
                "debounce threshold must be in 1..window",
            ));
        }
        Ok(Self {
            window: VecDeque::with_capacity(cfg.window),
            capacity: cfg.window,
            threshold: cfg.threshold,
            count: 0,
        })
    }

    /// Push one classification and return the updated verdict.
    pub fn admit(&mut self, breath_like: bool) -> bool {
        if self.window.len() == self.capacity {
            let evicted = self.window.pop_front().unwrap_or(false);
            match (evicted, breath_like) {
                (true, false) => self.count -= 1,
                (false, true) => self.count += 1,
                _ => {}
            }
        } else if breath_like {
            self.count += 1;
        }
        self.window.push_back(breath_like);
        debug_assert!(self.count <= self.window.len());
        self.verdict()
    }

    /// Breathing iff more than `threshold` window entries are breath-like.
    #[inline]
    pub fn verdict(&self) -> bool {
        self.count > self.threshold
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.window.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Window contents, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.window.iter().copied()
    }
}

impl Default for DebounceFilter {
    fn default() -> Self {
        let cfg = DebounceCfg::default();
        Self {
            window: VecDeque::with_capacity(cfg.window),
            capacity: cfg.window,
            threshold: cfg.threshold,
            count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(window: usize, threshold: usize) -> DebounceFilter {
        DebounceFilter::new(DebounceCfg { window, threshold }).unwrap()
    }

    #[test]
    fn counts_while_filling() {
        let mut f = filter(4, 1);
        assert!(!f.admit(true));
        assert!(!f.admit(false));
        assert!(f.admit(true));
        assert_eq!(f.count(), 2);
        assert!(!f.is_full());
    }

    #[test]
    fn full_window_applies_eviction_table() {
        let mut f = filter(2, 1);
        f.admit(true);
        f.admit(false);
        // evict true, insert true: unchanged
        f.admit(true);
        assert_eq!(f.count(), 1);
        // evict false, insert true: +1
        f.admit(true);
        assert_eq!(f.count(), 2);
        // evict true, insert false: -1
        f.admit(false);
        assert_eq!(f.count(), 1);
        // evict true, insert false: -1
        f.admit(false);
        assert_eq!(f.count(), 0);
        // evict false, insert false: unchanged
        f.admit(false);
        assert_eq!(f.count(), 0);
    }

    #[test]
    fn rejects_threshold_not_below_window() {
        assert!(DebounceFilter::new(DebounceCfg { window: 5, threshold: 5 }).is_err());
        assert!(DebounceFilter::new(DebounceCfg { window: 5, threshold: 0 }).is_err());
        assert!(DebounceFilter::new(DebounceCfg { window: 0, threshold: 0 }).is_err());
    }

    #[test]
    fn default_is_reference_tuning() {
        let f = DebounceFilter::default();
        assert_eq!((f.capacity(), f.threshold()), (35, 7));
        assert!(f.is_empty());
    }
}
