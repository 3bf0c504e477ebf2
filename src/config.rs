// ABOUTME: Solver configuration: attempt budgets, carb downscaling, instrumentation toggle
// ABOUTME: Serde-deserializable with environment overrides and validation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

//! Solver configuration.
//!
//! Everything here is a *policy* knob: none of it changes what a valid plan
//! is, only how long the search may run and whether the optional carb
//! downscaling step participates in candidate generation.

use std::collections::BTreeSet;
use std::env;

use serde::{Deserialize, Serialize};

use crate::constants::search::DEFAULT_ATTEMPT_LIMIT;
use crate::errors::{PlannerError, PlannerResult};

/// Environment variable overriding the attempt limit
pub const ENV_ATTEMPT_LIMIT: &str = "MEALPLANNER_ATTEMPT_LIMIT";

/// Environment variable toggling carb downscaling (`1`/`true` to enable)
pub const ENV_CARB_SCALING: &str = "MEALPLANNER_CARB_SCALING";

/// Configuration for the optional primary-carb downscaling step.
///
/// When a slot is sedentary and a recipe was rejected solely because it
/// overshoots the calorie ceiling, the planner may offer downscaled variants
/// of that recipe in which the primary carbohydrate quantity is reduced in
/// steps of `step_fraction`, provided the carb source is one that scales
/// sensibly (plain starches, not structural ingredients).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbScalingConfig {
    /// Whether variant generation runs at all
    #[serde(default)]
    pub enabled: bool,

    /// Maximum number of downscaling steps K
    #[serde(default = "default_max_steps")]
    pub max_steps: u8,

    /// Fraction removed per step (sigma); clamped so `K * sigma < 1`
    #[serde(default = "default_step_fraction")]
    pub step_fraction: f64,

    /// Normalized names of carb sources that may be downscaled
    #[serde(default = "default_scalable_sources")]
    pub scalable_sources: BTreeSet<String>,
}

fn default_max_steps() -> u8 {
    4
}

fn default_step_fraction() -> f64 {
    0.10
}

fn default_scalable_sources() -> BTreeSet<String> {
    [
        "white rice",
        "brown rice",
        "jasmine rice",
        "basmati rice",
        "cream of rice",
        "rice",
        "potato",
        "sweet potato",
        "russet potato",
        "red potato",
        "baby potato",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

impl Default for CarbScalingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_steps: default_max_steps(),
            step_fraction: default_step_fraction(),
            scalable_sources: default_scalable_sources(),
        }
    }
}

impl CarbScalingConfig {
    /// Effective step fraction after clamping so that `K * sigma < 1.0`.
    ///
    /// A configuration that would scale a contribution to zero or below is
    /// pulled back to just under full removal, matching the behavior of the
    /// variant generator rather than erroring mid-search.
    #[must_use]
    pub fn effective_sigma(&self) -> f64 {
        let k = f64::from(self.max_steps.max(1));
        let sigma = self.step_fraction.clamp(0.0, 1.0);
        if k * sigma >= 1.0 {
            0.99 / k
        } else {
            sigma
        }
    }

    /// Validate the raw parameters.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::InvalidScalingConfig`] when the step fraction
    /// is not a finite value in `(0, 1)` or `max_steps` is zero while the
    /// feature is enabled.
    pub fn validate(&self) -> PlannerResult<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.max_steps == 0 {
            return Err(PlannerError::InvalidScalingConfig(
                "max_steps must be at least 1".into(),
            ));
        }
        if !self.step_fraction.is_finite() || self.step_fraction <= 0.0 || self.step_fraction >= 1.0
        {
            return Err(PlannerError::InvalidScalingConfig(format!(
                "step_fraction must be in (0, 1), got {}",
                self.step_fraction
            )));
        }
        Ok(())
    }
}

/// Top-level solver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Cap on committed assignments (forward steps) before giving up
    #[serde(default = "default_attempt_limit")]
    pub attempt_limit: u64,

    /// Optional independent cap on backtrack operations
    #[serde(default)]
    pub backtrack_limit: Option<u64>,

    /// Primary-carb downscaling options
    #[serde(default)]
    pub carb_scaling: CarbScalingConfig,

    /// Collect search statistics (attempts, depths, runtimes).
    /// Never influences any decision the search makes.
    #[serde(default)]
    pub instrumentation: bool,
}

fn default_attempt_limit() -> u64 {
    DEFAULT_ATTEMPT_LIMIT
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            attempt_limit: DEFAULT_ATTEMPT_LIMIT,
            backtrack_limit: None,
            carb_scaling: CarbScalingConfig::default(),
            instrumentation: false,
        }
    }
}

impl SolverConfig {
    /// Build a configuration from defaults plus environment overrides.
    ///
    /// Unparseable environment values fall back to defaults; this mirrors how
    /// deployment environments tune the solver without code changes.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = env::var(ENV_ATTEMPT_LIMIT) {
            if let Ok(limit) = raw.parse::<u64>() {
                config.attempt_limit = limit;
            }
        }
        if let Ok(raw) = env::var(ENV_CARB_SCALING) {
            config.carb_scaling.enabled = matches!(raw.as_str(), "1" | "true" | "on");
        }
        config
    }

    /// Validate all nested options.
    ///
    /// # Errors
    ///
    /// Propagates [`PlannerError::InvalidScalingConfig`] from the carb
    /// scaling section.
    pub fn validate(&self) -> PlannerResult<()> {
        self.carb_scaling.validate()
    }
}
