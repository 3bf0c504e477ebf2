// ABOUTME: Main library entry point for the mealplanner solver crate
// ABOUTME: Exposes data models, the planning engine, and the search entry point
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

#![deny(unsafe_code)]

//! # Mealplanner
//!
//! A deterministic meal-plan solver. Given a user's nutritional targets, an
//! ordered per-day schedule of meal slots, and a finite pool of recipes with
//! precomputed nutrition, it assigns one recipe to every slot across up to
//! seven days so that every hard constraint holds, every day passes macro and
//! upper-limit validation, and the fixed composite score is maximized at each
//! decision point. Search is greedy with chronological backtracking.
//!
//! ## Architecture
//!
//! The engine keeps strict module boundaries:
//! - **Models**: recipes, user profiles, nutrition totals, upper limits
//! - **Constraints**: pure allow/deny predicates over one tentative assignment
//! - **Feasibility**: forward-looking pruning that never excludes a completable plan
//! - **Scoring**: a five-component weighted cost function with a tie-break cascade
//! - **Search**: decision ordering, candidate lifecycle, validation, backtracking
//!
//! The solver is a pure function of its inputs: no I/O, no clocks in the
//! decision path, no randomness. Running the same inputs twice yields the
//! identical assignment sequence, with or without instrumentation enabled.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mealplanner::config::SolverConfig;
//! use mealplanner::models::profile::UserProfile;
//! use mealplanner::models::recipe::Recipe;
//! use mealplanner::models::upper_limits::ResolvedUpperLimits;
//! use mealplanner::planner::search::run_meal_plan_search;
//!
//! # fn demo(profile: UserProfile, pool: Vec<Recipe>) -> anyhow::Result<()> {
//! let config = SolverConfig::default();
//! let result = run_meal_plan_search(
//!     &profile,
//!     &pool,
//!     7,
//!     &ResolvedUpperLimits::none(),
//!     &config,
//! )?;
//! println!("planned: {} assignments", result.plan.len());
//! # Ok(())
//! # }
//! ```

/// Solver configuration: attempt budgets, carb downscaling, instrumentation
pub mod config;

/// Normative numeric constants of the planning algorithm
pub mod constants;

/// Input validation error types
pub mod errors;

/// Structured logging setup built on `tracing`
pub mod logging;

/// Data models: nutrition, recipes, user profiles, upper limits
pub mod models;

/// The planning engine: constraints, feasibility, scoring, search
pub mod planner;

pub use config::SolverConfig;
pub use errors::{PlannerError, PlannerResult};
pub use models::nutrition::Nutrition;
pub use models::profile::{Busyness, MealSlot, PinnedAssignment, UserProfile, WorkoutWindow};
pub use models::recipe::{Ingredient, Recipe};
pub use models::upper_limits::{ResolvedUpperLimits, UpperLimitsTable};
pub use planner::report::{FailureReport, MealPlanResult, Termination};
pub use planner::search::run_meal_plan_search;
