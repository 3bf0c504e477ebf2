// ABOUTME: Structured solver results: success payloads, failure reports, advisories
// ABOUTME: Failure modes carry actionable diagnostics rather than opaque error strings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

//! Structured results.
//!
//! The solver never signals infeasibility through `Err`: it returns a
//! [`MealPlanResult`] whose `failure` field, when present, explains what ran
//! dry, which day or pin is implicated, and what the best partial plan looked
//! like.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::tolerances::DAILY_TOLERANCE_FRACTION;
use crate::constants::weekly::{SODIUM_ADVISORY_MULTIPLE, SODIUM_KEY};
use crate::models::profile::{PinnedAssignment, UserProfile};
use crate::models::upper_limits::UlViolation;
use crate::planner::candidates::SlotDiagnostics;
use crate::planner::constraints::HardConstraint;
use crate::planner::state::{Assignment, DailyTracker, WeeklyTracker};
use crate::planner::stats::SearchStats;

/// How the search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Full plan found and validated across all days
    Complete,
    /// Full single-day plan found; weekly validation does not apply
    CompleteSingleDay,
    /// Every ordering was tried; the first non-pinned decision ran dry
    Exhausted,
    /// The attempt or backtrack budget was reached
    BudgetReached,
}

/// One macro or upper-limit violation found by daily validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DailyViolation {
    /// Calories outside the tolerance window
    Calories {
        /// Consumed calories
        consumed: f64,
        /// Daily target
        target: f64,
    },
    /// Protein outside the tolerance window
    Protein {
        /// Consumed protein, grams
        consumed: f64,
        /// Daily target, grams
        target: f64,
    },
    /// Carbohydrates outside the tolerance window
    Carbs {
        /// Consumed carbs, grams
        consumed: f64,
        /// Daily target, grams
        target: f64,
    },
    /// Fat outside its explicit range
    FatRange {
        /// Consumed fat, grams
        consumed: f64,
        /// Range lower bound
        min: f64,
        /// Range upper bound
        max: f64,
    },
    /// The hard calorie ceiling was exceeded
    CalorieCeiling {
        /// Consumed calories
        consumed: f64,
        /// The ceiling
        ceiling: f64,
    },
    /// A micronutrient upper limit was exceeded
    UpperLimit {
        /// The violation details
        violation: UlViolation,
    },
}

/// Validate a completed day: calories, protein, and carbs within ±10% of
/// target, fat inside its range, the ceiling respected, every UL obeyed.
#[must_use]
pub fn validate_day(
    tracker: &DailyTracker,
    profile: &UserProfile,
    resolved_ul: &crate::models::upper_limits::ResolvedUpperLimits,
) -> Option<DailyViolation> {
    let calorie_target = f64::from(profile.daily_calories);
    if (tracker.calories_consumed - calorie_target).abs()
        > DAILY_TOLERANCE_FRACTION * calorie_target
    {
        return Some(DailyViolation::Calories {
            consumed: tracker.calories_consumed,
            target: calorie_target,
        });
    }
    if (tracker.protein_consumed - profile.daily_protein_g).abs()
        > DAILY_TOLERANCE_FRACTION * profile.daily_protein_g
    {
        return Some(DailyViolation::Protein {
            consumed: tracker.protein_consumed,
            target: profile.daily_protein_g,
        });
    }
    if (tracker.carbs_consumed - profile.daily_carbs_g).abs()
        > DAILY_TOLERANCE_FRACTION * profile.daily_carbs_g
    {
        return Some(DailyViolation::Carbs {
            consumed: tracker.carbs_consumed,
            target: profile.daily_carbs_g,
        });
    }
    let (fat_min, fat_max) = profile.daily_fat_g;
    if tracker.fat_consumed < fat_min || tracker.fat_consumed > fat_max {
        return Some(DailyViolation::FatRange {
            consumed: tracker.fat_consumed,
            min: fat_min,
            max: fat_max,
        });
    }
    if let Some(ceiling) = profile.max_daily_calories {
        if tracker.calories_consumed > f64::from(ceiling) {
            return Some(DailyViolation::CalorieCeiling {
                consumed: tracker.calories_consumed,
                ceiling: f64::from(ceiling),
            });
        }
    }
    if let Some(violation) = resolved_ul
        .daily_violations(&tracker.micronutrients_consumed)
        .into_iter()
        .next()
    {
        return Some(DailyViolation::UpperLimit { violation });
    }
    None
}

/// Snapshot of a (possibly partial) plan for failure reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanSnapshot {
    /// Assignments in decision order
    pub assignments: Vec<Assignment>,
    /// Daily trackers at snapshot time
    pub daily_trackers: BTreeMap<usize, DailyTracker>,
}

/// Total normalized macro deviation of a snapshot from the daily targets;
/// lower is closer to valid. Used to pick the closest-to-valid plan among
/// equally long partials.
#[must_use]
pub fn plan_deviation(trackers: &BTreeMap<usize, DailyTracker>, profile: &UserProfile) -> f64 {
    let calorie_target = f64::from(profile.daily_calories);
    let fat_mid = profile.daily_fat_midpoint();
    let mut total = 0.0;
    for tracker in trackers.values() {
        if calorie_target > 0.0 {
            total += (tracker.calories_consumed - calorie_target).abs() / calorie_target;
        }
        if profile.daily_protein_g > 0.0 {
            total += (tracker.protein_consumed - profile.daily_protein_g).abs()
                / profile.daily_protein_g;
        }
        if profile.daily_carbs_g > 0.0 {
            total += (tracker.carbs_consumed - profile.daily_carbs_g).abs() / profile.daily_carbs_g;
        }
        if fat_mid > 0.0 {
            total += (tracker.fat_consumed - fat_mid).abs() / fat_mid;
        }
    }
    total
}

/// Was a pinned conflict caught before the search or induced downstream?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinnedConflictKind {
    /// The pin itself violates a hard rule; caught before the search starts
    DirectViolation,
    /// The pin is individually valid but its nutrition makes the rest of the
    /// day or week unreachable
    Downstream,
}

/// Whether a weekly deficit could ever have been avoided with this pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeficitClass {
    /// The pool could reach the requirement; the gap is small or
    /// search-induced
    Marginal,
    /// No combination of recipes in the pool can reach the requirement
    Structural,
}

/// One tracked nutrient short of its weekly requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientDeficit {
    /// Nutrient name
    pub nutrient: String,
    /// Weekly total actually consumed at the failure point
    pub consumed: f64,
    /// Largest weekly total the pool could supply for this schedule
    pub achieved: f64,
    /// The weekly requirement, RDI times the horizon
    pub required: f64,
    /// Whether the pool could ever have met the requirement
    pub classification: DeficitClass,
}

/// Macro budget left for a day after its pinned nutrition is subtracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemainingBudget {
    /// Day index
    pub day: usize,
    /// Calories left under the target
    pub calories: f64,
    /// Protein left, grams
    pub protein_g: f64,
    /// Fat window left, grams
    pub fat_g: (f64, f64),
    /// Carbs left, grams
    pub carbs_g: f64,
}

/// Structured failure report, one variant per failure mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FailureReport {
    /// No recipe survives the hard constraints at some slot, even under
    /// optimistic assumptions
    PoolInsufficiency {
        /// Eligibility breakdown for the offending slot and the rest of its day
        unfillable_slots: Vec<SlotDiagnostics>,
    },
    /// Every candidate ordering for a day fails validation
    DailyInfeasibility {
        /// The day that failed, when a specific one is implicated
        day: Option<usize>,
        /// The violation observed at the last failed validation
        violation: Option<DailyViolation>,
        /// The closest-to-valid plan seen
        closest_plan: PlanSnapshot,
    },
    /// A pinned assignment violates a hard rule or makes the plan unreachable
    PinnedConflict {
        /// The implicated pins
        pins: Vec<PinnedAssignment>,
        /// The rule a pin breaks outright, for direct violations
        violated: Option<HardConstraint>,
        /// Direct violation or downstream infeasibility
        classification: PinnedConflictKind,
        /// Budget left after pins on the implicated day, when applicable
        remaining_budget: Option<RemainingBudget>,
    },
    /// Weekly micronutrient requirements are unreachable
    WeeklyDeficit {
        /// The nutrients that fell short, with classification
        deficient_nutrients: Vec<NutrientDeficit>,
    },
    /// The attempt or backtrack budget ran out before a verdict
    BudgetExhausted {
        /// Committed assignments when the budget ran out
        attempts: u64,
        /// Backtracks performed
        backtracks: u64,
        /// Always false: the search did not prove infeasibility
        search_exhaustive: bool,
        /// The best plan seen
        best_plan: PlanSnapshot,
        /// Validation problems of the best plan's completed days
        best_plan_violations: Vec<DailyViolation>,
    },
}

/// Sodium advisory attached to successful plans whose weekly sodium exceeds
/// twice the prorated RDI. Never a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SodiumAdvisory {
    /// Weekly sodium consumed, mg
    pub weekly_sodium_mg: f64,
    /// Advisory threshold, mg
    pub recommended_max_mg: f64,
    /// Consumed over threshold
    pub ratio: f64,
}

/// Build the sodium advisory when the weekly totals warrant one.
#[must_use]
pub fn sodium_advisory(
    weekly: &WeeklyTracker,
    profile: &UserProfile,
    days: usize,
) -> Option<SodiumAdvisory> {
    let daily_rdi = profile.micronutrient_targets.get(SODIUM_KEY).copied()?;
    if daily_rdi <= 0.0 {
        return None;
    }
    let weekly_sodium = weekly.weekly_totals.micronutrient(SODIUM_KEY);
    let recommended_max = SODIUM_ADVISORY_MULTIPLE * daily_rdi * days as f64;
    if weekly_sodium <= recommended_max {
        return None;
    }
    Some(SodiumAdvisory {
        weekly_sodium_mg: weekly_sodium,
        recommended_max_mg: recommended_max,
        ratio: weekly_sodium / recommended_max,
    })
}

/// The solver's structured result for both success and failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealPlanResult {
    /// True when a complete, validated plan was found
    pub success: bool,
    /// How the search ended
    pub termination: Termination,
    /// The plan on success; the best partial plan on failure
    pub plan: Vec<Assignment>,
    /// Final (or best-effort) daily trackers keyed by day
    pub daily_trackers: BTreeMap<usize, DailyTracker>,
    /// Final weekly tracker; present on success
    pub weekly_tracker: Option<WeeklyTracker>,
    /// Sodium advisory, when warranted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<SodiumAdvisory>,
    /// Failure diagnostics; present exactly when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReport>,
    /// Search statistics, when instrumentation was enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SearchStats>,
}
