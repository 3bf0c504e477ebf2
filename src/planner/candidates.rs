// ABOUTME: Candidate generation: hard-constraint then feasibility filtering per decision point
// ABOUTME: Emits the backtrack signal and the calorie-excess metadata the downscaling step consumes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

//! Candidate generation.
//!
//! Composes constraints and feasibility; never touches scoring. Filter order
//! at a non-pinned decision point: excluded ingredients, same-day reuse,
//! cooking time, calorie ceiling, cross-day repetition, then the calorie,
//! macro, and upper-limit feasibility checks. Recipes dropped solely for
//! calorie excess are recorded so the optional carb-downscaling step can
//! offer reduced variants. An empty set, or any later slot of the same day
//! with zero optimistically-eligible recipes, signals backtrack.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::CarbScalingConfig;
use crate::models::nutrition::Nutrition;
use crate::models::profile::{MealSlot, UserProfile};
use crate::models::recipe::Recipe;
use crate::models::upper_limits::ResolvedUpperLimits;
use crate::planner::carb_scaling;
use crate::planner::constraints::{
    calorie_ceiling_ok, cooking_time_ok, cross_day_repeat_ok, excluded_ingredient_ok,
    same_day_reuse_ok, ConstraintContext, HardConstraint,
};
use crate::planner::feasibility::{
    daily_calories_feasible, daily_macros_feasible, incremental_ul_feasible, FeasibilityContext,
    MacroBounds,
};
use crate::planner::slot_context;
use crate::planner::state::{DailyTracker, WeeklyTracker};

/// One admissible choice at a decision point: a recipe, or a downscaled
/// variant of one. Variants share the parent's id for identity rules and
/// carry their recalculated nutrition.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Index of the parent recipe in the pool
    pub recipe_index: usize,
    /// The parent recipe's id
    pub recipe_id: String,
    /// Downscaling step; 0 for the unscaled recipe
    pub variant_step: u8,
    /// Effective nutrition (recalculated for variants)
    pub nutrition: Nutrition,
}

/// Result of candidate generation at one decision point.
#[derive(Debug, Clone, Default)]
pub struct CandidateOutcome {
    /// Surviving candidates, sorted by id then variant step
    pub candidates: Vec<Candidate>,
    /// True when the search must backtrack instead of selecting
    pub trigger_backtrack: bool,
    /// Ids rejected solely because they overshoot the calorie ceiling
    pub calorie_excess: BTreeSet<String>,
}

/// Everything immutable that candidate generation needs.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    /// The recipe pool
    pub pool: &'a [Recipe],
    /// User profile
    pub profile: &'a UserProfile,
    /// Planning horizon in days
    pub days: usize,
    /// Resolved upper limits
    pub resolved_ul: &'a ResolvedUpperLimits,
    /// Precomputed macro windows
    pub bounds: &'a MacroBounds,
    /// Carb-downscaling options
    pub scaling: &'a CarbScalingConfig,
    /// Slots that are pinned, as `(day, slot)`
    pub pinned_slots: &'a BTreeSet<(usize, usize)>,
}

/// Per-slot eligibility diagnostics used by pool-insufficiency reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDiagnostics {
    /// Day index
    pub day: usize,
    /// Slot index
    pub slot: usize,
    /// Recipes that survive the hard-constraint filters
    pub eligible_count: usize,
    /// How many recipes each hard rule eliminated (first violated rule counts)
    pub eliminated_by: BTreeMap<HardConstraint, usize>,
}

fn slot_of<'a>(gctx: &GenerationContext<'a>, day: usize, slot_index: usize) -> &'a MealSlot {
    &gctx.profile.schedule[day][slot_index]
}

fn next_day_first<'a>(gctx: &GenerationContext<'a>, day: usize) -> Option<&'a MealSlot> {
    if day + 1 < gctx.days {
        gctx.profile.schedule[day + 1].first()
    } else {
        None
    }
}

fn is_workout_slot(gctx: &GenerationContext<'_>, day: usize, slot_index: usize) -> bool {
    let day_slots = &gctx.profile.schedule[day];
    slot_context::activity_context(
        &day_slots[slot_index],
        slot_index,
        day_slots,
        next_day_first(gctx, day),
        gctx.profile.workout_window(day),
    )
    .is_workout()
}

/// Generate the candidate set for the non-pinned decision point `(day,
/// slot_index)`.
#[must_use]
pub fn generate(
    day: usize,
    slot_index: usize,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    weekly: &WeeklyTracker,
    gctx: &GenerationContext<'_>,
) -> CandidateOutcome {
    let slot = slot_of(gctx, day, slot_index);
    let daily = daily_trackers.get(&day);
    let previous_daily = day.checked_sub(1).and_then(|d| daily_trackers.get(&d));
    let day_slots = &gctx.profile.schedule[day];
    let slot_ctx = slot_context::derive(
        slot_index,
        day_slots,
        next_day_first(gctx, day),
        gctx.profile.workout_window(day),
    );
    let is_workout = slot_ctx.activity.is_workout();

    let cctx = ConstraintContext {
        daily,
        previous_daily,
        day,
        is_workout_slot: is_workout,
    };
    let fctx = FeasibilityContext {
        daily,
        weekly,
        schedule: &gctx.profile.schedule,
        profile: gctx.profile,
        resolved_ul: gctx.resolved_ul,
        bounds: gctx.bounds,
    };

    let mut calorie_excess = BTreeSet::new();
    let mut candidates = Vec::new();

    for (index, recipe) in gctx.pool.iter().enumerate() {
        if !excluded_ingredient_ok(recipe, &gctx.profile.excluded_ingredients) {
            continue;
        }
        if !same_day_reuse_ok(&recipe.id, daily) {
            continue;
        }
        if !cooking_time_ok(recipe, slot) {
            continue;
        }
        if !calorie_ceiling_ok(&recipe.nutrition, daily, gctx.profile.max_daily_calories) {
            calorie_excess.insert(recipe.id.clone());
            continue;
        }
        if day > 0 && !is_workout && !cross_day_repeat_ok(&recipe.id, &cctx) {
            continue;
        }

        if !daily_calories_feasible(&recipe.nutrition, day, slot_index, &fctx) {
            if rejected_solely_for_calorie_excess(recipe, daily, gctx.profile) {
                calorie_excess.insert(recipe.id.clone());
            }
            continue;
        }
        if !daily_macros_feasible(&recipe.nutrition, day, slot_index, &fctx) {
            continue;
        }
        if !incremental_ul_feasible(&recipe.nutrition, daily, gctx.resolved_ul) {
            continue;
        }

        candidates.push(Candidate {
            recipe_index: index,
            recipe_id: recipe.id.clone(),
            variant_step: 0,
            nutrition: recipe.nutrition.clone(),
        });
    }

    // Optional downscaling step: sedentary, non-pinned slots may recover
    // recipes that only failed on calories.
    if gctx.scaling.enabled
        && slot_ctx.activity.sedentary
        && !gctx.pinned_slots.contains(&(day, slot_index))
        && !calorie_excess.is_empty()
    {
        let variants = carb_scaling::generate_variants(
            gctx.pool,
            &calorie_excess,
            slot,
            day,
            slot_index,
            &cctx,
            &fctx,
            gctx.profile,
            gctx.resolved_ul,
            gctx.scaling,
        );
        candidates.extend(variants);
    }

    candidates.sort_by(|a, b| {
        a.recipe_id
            .cmp(&b.recipe_id)
            .then_with(|| a.variant_step.cmp(&b.variant_step))
    });

    let mut trigger_backtrack = candidates.is_empty();
    if !trigger_backtrack
        && future_slot_has_zero_eligible(day, slot_index, daily_trackers, gctx)
    {
        trigger_backtrack = true;
    }

    CandidateOutcome {
        candidates,
        trigger_backtrack,
        calorie_excess,
    }
}

fn rejected_solely_for_calorie_excess(
    recipe: &Recipe,
    daily: Option<&DailyTracker>,
    profile: &UserProfile,
) -> bool {
    let Some(ceiling) = profile.max_daily_calories else {
        return false;
    };
    let current = daily.map_or(0.0, |t| t.calories_consumed);
    current + recipe.nutrition.calories > f64::from(ceiling)
}

/// Hard-constraint-only filter used for optimistic future-slot checks: the
/// ceiling and the feasibility windows are deliberately ignored because a
/// later slot may become reachable after backtracking changes earlier picks.
fn eligible_under_optimism(
    day: usize,
    slot_index: usize,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    gctx: &GenerationContext<'_>,
) -> usize {
    let slot = slot_of(gctx, day, slot_index);
    let daily = daily_trackers.get(&day);
    let previous_daily = day.checked_sub(1).and_then(|d| daily_trackers.get(&d));
    let is_workout = is_workout_slot(gctx, day, slot_index);
    let cctx = ConstraintContext {
        daily,
        previous_daily,
        day,
        is_workout_slot: is_workout,
    };

    gctx.pool
        .iter()
        .filter(|recipe| {
            excluded_ingredient_ok(recipe, &gctx.profile.excluded_ingredients)
                && same_day_reuse_ok(&recipe.id, daily)
                && cooking_time_ok(recipe, slot)
                && (day == 0 || is_workout || cross_day_repeat_ok(&recipe.id, &cctx))
        })
        .count()
}

fn future_slot_has_zero_eligible(
    day: usize,
    slot_index: usize,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    gctx: &GenerationContext<'_>,
) -> bool {
    let slots = gctx.profile.schedule[day].len();
    ((slot_index + 1)..slots)
        .any(|later| eligible_under_optimism(day, later, daily_trackers, gctx) == 0)
}

/// Diagnostics for a slot where the pool ran dry: per-rule elimination counts
/// under the hard constraints, attributing each recipe to the first rule that
/// rejected it.
#[must_use]
pub fn eligibility_diagnostics(
    day: usize,
    slot_index: usize,
    daily_trackers: &BTreeMap<usize, DailyTracker>,
    gctx: &GenerationContext<'_>,
) -> SlotDiagnostics {
    let slot = slot_of(gctx, day, slot_index);
    let daily = daily_trackers.get(&day);
    let previous_daily = day.checked_sub(1).and_then(|d| daily_trackers.get(&d));
    let is_workout = is_workout_slot(gctx, day, slot_index);
    let cctx = ConstraintContext {
        daily,
        previous_daily,
        day,
        is_workout_slot: is_workout,
    };

    let mut eliminated_by: BTreeMap<HardConstraint, usize> = BTreeMap::new();
    let mut eligible_count = 0usize;
    for recipe in gctx.pool {
        let rejected = if !excluded_ingredient_ok(recipe, &gctx.profile.excluded_ingredients) {
            Some(HardConstraint::ExcludedIngredient)
        } else if !same_day_reuse_ok(&recipe.id, daily) {
            Some(HardConstraint::SameDayReuse)
        } else if !cooking_time_ok(recipe, slot) {
            Some(HardConstraint::CookingTime)
        } else if !calorie_ceiling_ok(&recipe.nutrition, daily, gctx.profile.max_daily_calories) {
            Some(HardConstraint::CalorieCeiling)
        } else if day > 0 && !is_workout && !cross_day_repeat_ok(&recipe.id, &cctx) {
            Some(HardConstraint::CrossDayRepeat)
        } else {
            None
        };
        match rejected {
            Some(rule) => *eliminated_by.entry(rule).or_insert(0) += 1,
            None => eligible_count += 1,
        }
    }

    SlotDiagnostics {
        day,
        slot: slot_index,
        eligible_count,
        eliminated_by,
    }
}
