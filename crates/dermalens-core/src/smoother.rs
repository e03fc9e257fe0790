//! Temporal smoothing of per-frame decisions.

use crate::config::SmoothingConfig;
use serde::Serialize;
use std::collections::VecDeque;

/// Result of one smoothed eyewear decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlassesVerdict {
    pub no_glasses: bool,
    /// Recency-weighted share of "glasses" frames in the history.
    pub weighted_ratio: f32,
    /// History length the decision was made on.
    pub depth: usize,
}

/// Bounded history of per-frame eyewear booleans with a recency-weighted vote.
///
/// The newest sample weighs `weight_base + weight_span` and the oldest
/// `weight_base` (3× with defaults). Shallow histories fall back to a plain
/// majority vote.
#[derive(Debug, Clone)]
pub struct GlassesSmoother {
    history: VecDeque<bool>,
    config: SmoothingConfig,
}

impl GlassesSmoother {
    pub fn new(config: SmoothingConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.glasses_window),
            config,
        }
    }

    pub fn push(&mut self, glasses: bool) -> GlassesVerdict {
        if self.history.len() >= self.config.glasses_window {
            self.history.pop_front();
        }
        self.history.push_back(glasses);
        self.verdict()
    }

    pub fn verdict(&self) -> GlassesVerdict {
        let depth = self.history.len();
        let weighted_ratio = self.weighted_ratio();
        let c = &self.config;

        let no_glasses = if depth >= c.full_depth {
            weighted_ratio < c.full_threshold
        } else if depth >= c.partial_depth {
            weighted_ratio < c.partial_threshold
        } else {
            let with = self.history.iter().filter(|&&g| g).count();
            depth - with > with
        };

        GlassesVerdict { no_glasses, weighted_ratio, depth }
    }

    pub fn weighted_ratio(&self) -> f32 {
        let span = self.history.len().saturating_sub(1).max(1) as f32;
        let (mut hits, mut total) = (0.0f32, 0.0f32);
        for (i, &glasses) in self.history.iter().enumerate() {
            let w = self.config.weight_base + self.config.weight_span * i as f32 / span;
            total += w;
            if glasses {
                hits += w;
            }
        }
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

/// Consecutive all-flags-passed frames; any failure wipes it.
#[derive(Debug, Clone)]
pub struct ValidityStreak {
    len: usize,
    cap: usize,
}

impl ValidityStreak {
    pub fn new(cap: usize) -> Self {
        Self { len: 0, cap: cap.max(1) }
    }

    pub fn record(&mut self, all_passed: bool) {
        if all_passed {
            self.len = (self.len + 1).min(self.cap);
        } else {
            self.len = 0;
        }
    }

    pub fn is_stable(&self) -> bool {
        self.len >= self.cap
    }

    /// 0–100, for UI feedback.
    pub fn progress(&self) -> f32 {
        (self.len as f32 / self.cap as f32 * 100.0).min(100.0)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}
