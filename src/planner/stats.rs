// ABOUTME: Search statistics collected only when instrumentation is enabled
// ABOUTME: Write-only observability; never consulted by any search decision
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Observational metrics for one search run.
///
/// Every recording method is a no-op unless the collector was created
/// enabled, and nothing in the search ever reads these fields back, so
/// enabling instrumentation cannot change a single assignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchStats {
    /// Committed assignments, including re-commits after backtracks
    pub total_attempts: u64,
    /// Backtrack operations performed
    pub total_backtracks: u64,
    /// Attempts per day index
    pub attempts_per_day: BTreeMap<usize, u64>,
    /// Deepest single backtrack, in decision points unwound
    pub max_backtrack_depth: usize,
    /// Mean backtrack depth across all backtracks
    pub average_backtrack_depth: f64,
    /// Total wall-clock runtime in seconds
    pub total_runtime_secs: f64,
    /// Wall-clock seconds spent completing each day
    pub day_runtimes_secs: BTreeMap<usize, f64>,
}

impl SearchStats {
    /// Seconds per committed assignment, zero when nothing was attempted.
    #[must_use]
    pub fn time_per_attempt_secs(&self) -> f64 {
        if self.total_attempts == 0 {
            0.0
        } else {
            self.total_runtime_secs / self.total_attempts as f64
        }
    }
}

/// Collector owned by the search; folds into [`SearchStats`] at the end.
#[derive(Debug)]
pub struct StatsCollector {
    enabled: bool,
    stats: SearchStats,
    depth_sum: u64,
    started: Option<Instant>,
    day_started: BTreeMap<usize, Instant>,
}

impl StatsCollector {
    /// A collector; disabled collectors never touch the clock.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            stats: SearchStats::default(),
            depth_sum: 0,
            started: enabled.then(Instant::now),
            day_started: BTreeMap::new(),
        }
    }

    /// Record one committed assignment on `day`.
    pub fn record_attempt(&mut self, day: usize) {
        if !self.enabled {
            return;
        }
        self.stats.total_attempts += 1;
        *self.stats.attempts_per_day.entry(day).or_insert(0) += 1;
    }

    /// Record one backtrack spanning `depth` decision points.
    pub fn record_backtrack(&mut self, depth: usize) {
        if !self.enabled {
            return;
        }
        self.stats.total_backtracks += 1;
        self.depth_sum += depth as u64;
        self.stats.max_backtrack_depth = self.stats.max_backtrack_depth.max(depth);
    }

    /// Mark the first entry into `day`.
    pub fn record_day_entered(&mut self, day: usize) {
        if !self.enabled {
            return;
        }
        self.day_started.entry(day).or_insert_with(Instant::now);
    }

    /// Mark `day` as completed and close its timer.
    pub fn record_day_completed(&mut self, day: usize) {
        if !self.enabled {
            return;
        }
        if let Some(entered) = self.day_started.get(&day) {
            self.stats
                .day_runtimes_secs
                .insert(day, entered.elapsed().as_secs_f64());
        }
    }

    /// Close the run and produce the final stats, or `None` when disabled.
    #[must_use]
    pub fn finish(mut self) -> Option<SearchStats> {
        if !self.enabled {
            return None;
        }
        if let Some(started) = self.started {
            self.stats.total_runtime_secs = started.elapsed().as_secs_f64();
        }
        if self.stats.total_backtracks > 0 {
            self.stats.average_backtrack_depth =
                self.depth_sum as f64 / self.stats.total_backtracks as f64;
        }
        Some(self.stats)
    }
}
