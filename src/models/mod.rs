// ABOUTME: Data model module: nutrition totals, recipes, user profiles, upper limits
// ABOUTME: All model types are immutable inputs to the solver except the trackers in planner::state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

//! Solver input models.

/// Macro and micronutrient totals with exact accumulate/subtract semantics
pub mod nutrition;

/// User profile, meal slots, schedules, and pinned assignments
pub mod profile;

/// Recipes and ingredients with precomputed nutrition
pub mod recipe;

/// Upper Tolerable Intake reference data and per-user resolution
pub mod upper_limits;
