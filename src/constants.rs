// ABOUTME: Normative numeric constants of the planning algorithm
// ABOUTME: Tolerances, activity-context shift factors, scoring weights, and search bounds
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

//! Normative constants used throughout the planning engine.
//!
//! Every number that shapes an observable decision lives here so that the
//! regression tests can pin it. Changing any value changes plans.

/// Schedule shape bounds
pub mod schedule {
    /// Minimum planning horizon in days
    pub const MIN_PLANNING_DAYS: usize = 1;

    /// Maximum planning horizon in days
    pub const MAX_PLANNING_DAYS: usize = 7;

    /// Minimum meal slots per day
    pub const MIN_SLOTS_PER_DAY: usize = 1;

    /// Maximum meal slots per day
    pub const MAX_SLOTS_PER_DAY: usize = 8;
}

/// Daily macro tolerances
pub mod tolerances {
    /// Calories, protein and carbs must land within this fraction of the daily
    /// target; fat is validated against its explicit range instead.
    pub const DAILY_TOLERANCE_FRACTION: f64 = 0.10;
}

/// Activity-context multipliers applied to per-meal targets.
///
/// A meal eaten shortly before training favors carbohydrate availability over
/// protein; a meal after training favors both energy and protein for recovery;
/// a meal ahead of a long gap or the overnight fast favors larger, more
/// protein- and fat-forward portions.
pub mod activity_factors {
    /// Protein multiplier for pre-workout slots
    pub const PRE_WORKOUT_PROTEIN: f64 = 0.8;

    /// Carbohydrate multiplier for pre-workout slots
    pub const PRE_WORKOUT_CARBS: f64 = 1.1;

    /// Calorie multiplier for post-workout slots
    pub const POST_WORKOUT_CALORIES: f64 = 1.1;

    /// Protein multiplier for post-workout slots
    pub const POST_WORKOUT_PROTEIN: f64 = 1.2;

    /// Carbohydrate multiplier for post-workout slots
    pub const POST_WORKOUT_CARBS: f64 = 1.1;

    /// Calorie multiplier for high-satiety slots
    pub const HIGH_SATIETY_CALORIES: f64 = 1.1;

    /// Protein multiplier for high-satiety slots
    pub const HIGH_SATIETY_PROTEIN: f64 = 1.1;

    /// Fat-range multiplier (both ends) for high-satiety slots
    pub const HIGH_SATIETY_FAT: f64 = 1.1;
}

/// Slot-context derivation windows
pub mod context_windows {
    /// A slot is pre-workout when a workout starts within this many minutes after it
    pub const PRE_WORKOUT_MINUTES: i64 = 120;

    /// A slot is post-workout when a workout ended within this many minutes before it
    pub const POST_WORKOUT_MINUTES: i64 = 180;

    /// Gap to the next meal beyond which satiety requirement becomes high
    pub const HIGH_SATIETY_GAP_HOURS: f64 = 4.0;

    /// Overnight gap at or beyond which the last slot of a day is high satiety
    pub const OVERNIGHT_FAST_HOURS: f64 = 12.0;

    /// Assumed workout duration in minutes when only one endpoint is known
    pub const DEFAULT_WORKOUT_MINUTES: i64 = 60;
}

/// Composite score component weights. The raw weights total 110 and each
/// component is normalized into `[0, 100]`, so the composite stays in
/// `[0, 100]` as well.
pub mod score_weights {
    /// Raw weight of the nutrition-match component
    pub const NUTRITION: f64 = 40.0;

    /// Raw weight of the micronutrient-match component
    pub const MICRONUTRIENT: f64 = 30.0;

    /// Raw weight of the satiety-match component
    pub const SATIETY: f64 = 15.0;

    /// Raw weight of the balance component
    pub const BALANCE: f64 = 15.0;

    /// Raw weight of the schedule-match component
    pub const SCHEDULE: f64 = 10.0;

    /// Sum of all raw weights
    pub const TOTAL: f64 = NUTRITION + MICRONUTRIENT + SATIETY + BALANCE + SCHEDULE;
}

/// Scoring shape parameters
pub mod scoring {
    /// Macro sub-scores hit zero when the deviation reaches this fraction of target
    pub const NUTRITION_DEVIATION_TOLERANCE: f64 = 0.10;

    /// Fiber grams mapped to a 0-100 scale for high-satiety scoring
    pub const SATIETY_FIBER_SCALE: f64 = 6.0;

    /// Protein grams mapped to a 0-100 scale for high-satiety scoring
    pub const SATIETY_PROTEIN_SCALE: f64 = 2.5;

    /// Calories divided by this for high-satiety scoring
    pub const SATIETY_CALORIE_DIVISOR: f64 = 6.0;

    /// Baseline for moderate-satiety scoring
    pub const MODERATE_SATIETY_BASELINE: f64 = 70.0;

    /// Protein grams considered mid-range for a moderate-satiety meal
    pub const MODERATE_SATIETY_PROTEIN_MIDPOINT: f64 = 25.0;

    /// Penalty per gram of protein away from the moderate midpoint
    pub const MODERATE_SATIETY_PROTEIN_SLOPE: f64 = 0.5;

    /// Score granted per micronutrient the day has not yet seen
    pub const NOVELTY_POINTS_PER_NUTRIENT: f64 = 10.0;

    /// A micronutrient counts as already covered once the day holds this much of it
    pub const NOVELTY_COVERED_THRESHOLD: f64 = 1.0;

    /// Reference cooking time in minutes for unbounded (busyness 4) slots
    pub const UNBOUNDED_REFERENCE_MINUTES: f64 = 30.0;

    /// Penalty per minute of distance from the unbounded reference time
    pub const UNBOUNDED_DISTANCE_PENALTY: f64 = 2.0;

    /// Neutral component score when a component has nothing to differentiate
    pub const NEUTRAL_SCORE: f64 = 50.0;
}

/// Search budget defaults
pub mod search {
    /// Default cap on committed assignments before the search gives up
    pub const DEFAULT_ATTEMPT_LIMIT: u64 = 50_000;
}

/// Weekly validation parameters
pub mod weekly {
    /// Nutrient key used for the sodium advisory
    pub const SODIUM_KEY: &str = "sodium_mg";

    /// Weekly sodium beyond this multiple of the prorated RDI attaches an advisory
    pub const SODIUM_ADVISORY_MULTIPLE: f64 = 2.0;
}
