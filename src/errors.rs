// ABOUTME: Input validation error types for the meal-plan solver
// ABOUTME: Malformed inputs are errors; infeasible plans are structured results, never errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

//! Error types for solver inputs.
//!
//! The split is deliberate: a schedule with nine slots in a day or a pinned
//! assignment that names a recipe not in the pool is a malformed *input* and
//! surfaces as [`PlannerError`]. A pool that cannot satisfy the targets is a
//! legitimate solver *outcome* and surfaces as a structured failure report in
//! [`crate::planner::report::MealPlanResult`].

use thiserror::Error;

/// Errors raised while validating solver inputs, before any search runs.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Planning horizon outside the supported range of days
    #[error("planning horizon must be between {min} and {max} days, got {got}")]
    InvalidHorizon {
        /// Requested number of days
        got: usize,
        /// Minimum supported horizon
        min: usize,
        /// Maximum supported horizon
        max: usize,
    },

    /// Schedule shape does not match the requested horizon or slot bounds
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// A pinned assignment targets a slot that does not exist
    #[error("pinned assignment targets nonexistent slot (day {day}, slot {slot})")]
    PinnedSlotOutOfRange {
        /// Day index of the pin
        day: usize,
        /// Slot index of the pin
        slot: usize,
    },

    /// A pinned assignment names a recipe that is not in the pool
    #[error("pinned assignment at day {day}, slot {slot} names unknown recipe '{recipe_id}'")]
    UnknownPinnedRecipe {
        /// Day index of the pin
        day: usize,
        /// Slot index of the pin
        slot: usize,
        /// The unresolvable recipe id
        recipe_id: String,
    },

    /// Two recipes in the pool share an id
    #[error("duplicate recipe id '{0}' in pool")]
    DuplicateRecipeId(String),

    /// Requested demographic has no entry in the upper-limit reference table
    #[error("demographic '{demographic}' not found in upper-limit reference (available: {available:?})")]
    UnknownDemographic {
        /// The demographic key that failed to resolve
        demographic: String,
        /// Demographics present in the table
        available: Vec<String>,
    },

    /// Carb-scaling parameters are out of range
    #[error("invalid carb scaling configuration: {0}")]
    InvalidScalingConfig(String),

    /// A recipe's primary carb contribution exceeds its own nutrition
    #[error("recipe '{recipe_id}' has a malformed primary carb contribution: {detail}")]
    InvalidCarbContribution {
        /// Recipe whose contribution is malformed
        recipe_id: String,
        /// Which nutrient would go negative after scaling
        detail: String,
    },

    /// Upper-limit reference data could not be parsed
    #[error("malformed upper-limit reference data: {0}")]
    MalformedUpperLimits(String),
}

/// Convenience alias for fallible solver entry points.
pub type PlannerResult<T> = Result<T, PlannerError>;
