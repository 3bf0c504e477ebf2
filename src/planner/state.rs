// ABOUTME: Solver state: assignments, daily and weekly trackers, targets, pinned pre-validation
// ABOUTME: Unwinds rebuild trackers in original application order so restores are bit-identical
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

//! Mutable solver state and its transitions.
//!
//! Two invariants shape everything here:
//!
//! 1. Weekly totals contain fully completed days only. A day's totals are
//!    committed at validation time and decommitted the moment a backtrack
//!    removes any of its assignments.
//! 2. Unwinding restores trackers bit-identically. Subtracting floats does
//!    not guarantee that, so removal rebuilds each affected tracker by
//!    re-folding the surviving commitments in their original application
//!    order, reproducing the exact same partial sums.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants::activity_factors;
use crate::models::nutrition::Nutrition;
use crate::models::profile::{PinnedAssignment, UserProfile};
use crate::models::recipe::Recipe;
use crate::planner::constraints::{
    cooking_time_ok, excluded_ingredient_ok, HardConstraint, PinnedViolation,
};
use crate::planner::slot_context::{self, SlotContext};

/// One decided slot: `(day, slot)` holds `recipe_id`, optionally as a
/// downscaled variant (`variant_step` 0 means the unscaled recipe).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Day index, zero-based
    pub day: usize,
    /// Slot index within the day, zero-based
    pub slot: usize,
    /// Assigned recipe
    pub recipe_id: String,
    /// Downscaling step; 0 for the unscaled recipe
    #[serde(default, skip_serializing_if = "is_zero_step")]
    pub variant_step: u8,
}

fn is_zero_step(step: &u8) -> bool {
    *step == 0
}

/// An assignment together with everything needed to undo or replay it.
#[derive(Debug, Clone)]
pub struct Commitment {
    /// The assignment itself
    pub assignment: Assignment,
    /// Effective nutrition committed to the day (variant-adjusted)
    pub nutrition: Nutrition,
    /// Whether the slot was a workout slot at commit time
    pub is_workout: bool,
    /// Whether the assignment is pinned and immune to backtracking
    pub pinned: bool,
}

/// Running totals for one day of the plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyTracker {
    /// Calories consumed so far
    pub calories_consumed: f64,
    /// Protein consumed so far, grams
    pub protein_consumed: f64,
    /// Fat consumed so far, grams
    pub fat_consumed: f64,
    /// Carbohydrates consumed so far, grams
    pub carbs_consumed: f64,
    /// Micronutrient totals; covers every nutrient with a UL or a target
    pub micronutrients_consumed: BTreeMap<String, f64>,
    /// Recipe ids used today (same-day uniqueness)
    pub used_recipe_ids: BTreeSet<String>,
    /// Recipe ids used today at non-workout slots (cross-day rule)
    pub non_workout_recipe_ids: BTreeSet<String>,
    /// Slots assigned so far
    pub slots_assigned: usize,
    /// Total slots this day
    pub slots_total: usize,
}

impl DailyTracker {
    /// Fresh tracker for a day with `slots_total` slots.
    #[must_use]
    pub fn new(slots_total: usize) -> Self {
        Self {
            slots_total,
            ..Self::default()
        }
    }

    /// Fold one assignment's nutrition into the day.
    pub fn record(&mut self, recipe_id: &str, nutrition: &Nutrition, is_workout: bool) {
        self.calories_consumed += nutrition.calories;
        self.protein_consumed += nutrition.protein_g;
        self.fat_consumed += nutrition.fat_g;
        self.carbs_consumed += nutrition.carbs_g;
        for (name, amount) in &nutrition.micronutrients {
            *self
                .micronutrients_consumed
                .entry(name.clone())
                .or_insert(0.0) += amount;
        }
        self.used_recipe_ids.insert(recipe_id.to_owned());
        if !is_workout {
            self.non_workout_recipe_ids.insert(recipe_id.to_owned());
        }
        self.slots_assigned += 1;
    }

    /// The day's totals as a nutrition value.
    #[must_use]
    pub fn totals(&self) -> Nutrition {
        Nutrition {
            calories: self.calories_consumed,
            protein_g: self.protein_consumed,
            fat_g: self.fat_consumed,
            carbs_g: self.carbs_consumed,
            micronutrients: self.micronutrients_consumed.clone(),
        }
    }

    /// True when every slot of the day is assigned.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.slots_total > 0 && self.slots_assigned == self.slots_total
    }
}

/// Running totals across the plan. Holds fully completed days only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTracker {
    /// Sum of completed days' totals
    pub weekly_totals: Nutrition,
    /// Number of fully completed, validated days
    pub days_completed: usize,
    /// Days left including the current one
    pub days_remaining: usize,
    /// Accumulated RDI shortfall per tracked nutrient
    pub carryover_needs: BTreeMap<String, f64>,
}

/// Adjusted daily target for one tracked nutrient at the start of a day:
/// the base RDI plus the accumulated shortfall spread over the remaining
/// days (including the current one).
#[must_use]
pub fn adjusted_daily_target(base_rdi: f64, carryover: f64, days_remaining: usize) -> f64 {
    if days_remaining == 0 {
        return base_rdi;
    }
    base_rdi + carryover / days_remaining as f64
}

/// Per-meal macro targets for one decision point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerMealTarget {
    /// Calorie target for this meal
    pub calories: f64,
    /// Protein target, grams
    pub protein_g: f64,
    /// Lower end of the meal's fat window, grams
    pub fat_min: f64,
    /// Upper end of the meal's fat window, grams
    pub fat_max: f64,
    /// Carbohydrate target, grams
    pub carbs_g: f64,
}

/// Compute the per-meal target at a decision point: the remaining daily
/// budget split evenly over the remaining slots, then shifted by activity
/// context. Pre-workout lowers protein and raises carbs; post-workout raises
/// calories, protein, and carbs; a high-satiety slot raises calories,
/// protein, and the fat window.
#[must_use]
pub fn per_meal_target(
    daily: Option<&DailyTracker>,
    slots_total: usize,
    profile: &UserProfile,
    ctx: &SlotContext,
) -> PerMealTarget {
    let (consumed_cal, consumed_pro, consumed_fat, consumed_carb, assigned) = daily.map_or(
        (0.0, 0.0, 0.0, 0.0, 0usize),
        |t| {
            (
                t.calories_consumed,
                t.protein_consumed,
                t.fat_consumed,
                t.carbs_consumed,
                t.slots_assigned,
            )
        },
    );
    let slots_left = slots_total.saturating_sub(assigned).max(1) as f64;

    let mut calories = (f64::from(profile.daily_calories) - consumed_cal) / slots_left;
    let mut protein = (profile.daily_protein_g - consumed_pro) / slots_left;
    let mut fat_min = (profile.daily_fat_g.0 - consumed_fat) / slots_left;
    let mut fat_max = (profile.daily_fat_g.1 - consumed_fat) / slots_left;
    let mut carbs = (profile.daily_carbs_g - consumed_carb) / slots_left;

    if ctx.activity.pre_workout {
        protein *= activity_factors::PRE_WORKOUT_PROTEIN;
        carbs *= activity_factors::PRE_WORKOUT_CARBS;
    }
    if ctx.activity.post_workout {
        calories *= activity_factors::POST_WORKOUT_CALORIES;
        protein *= activity_factors::POST_WORKOUT_PROTEIN;
        carbs *= activity_factors::POST_WORKOUT_CARBS;
    }
    if ctx.satiety == slot_context::Satiety::High {
        calories *= activity_factors::HIGH_SATIETY_CALORIES;
        protein *= activity_factors::HIGH_SATIETY_PROTEIN;
        fat_min *= activity_factors::HIGH_SATIETY_FAT;
        fat_max *= activity_factors::HIGH_SATIETY_FAT;
    }

    PerMealTarget {
        calories,
        protein_g: protein,
        fat_min,
        fat_max,
        carbs_g: carbs,
    }
}

/// The mutable state the search owns.
#[derive(Debug, Clone)]
pub struct PlannerState {
    days: usize,
    /// Commitments in application order
    pub commitments: Vec<Commitment>,
    /// Daily trackers keyed by day index; present once a day has assignments
    pub daily: BTreeMap<usize, DailyTracker>,
    /// Weekly tracker over completed days
    pub weekly: WeeklyTracker,
    /// Totals snapshot per completed day, used for exact weekly rebuilds
    completed_day_totals: BTreeMap<usize, Nutrition>,
}

impl PlannerState {
    /// Fresh state for a horizon of `days`.
    #[must_use]
    pub fn new(days: usize, tracked_targets: &BTreeMap<String, f64>) -> Self {
        Self {
            days,
            commitments: Vec::new(),
            daily: BTreeMap::new(),
            weekly: WeeklyTracker {
                weekly_totals: Nutrition::default(),
                days_completed: 0,
                days_remaining: days,
                carryover_needs: tracked_targets.keys().map(|n| (n.clone(), 0.0)).collect(),
            },
            completed_day_totals: BTreeMap::new(),
        }
    }

    /// Tracker for a day, if it has any assignments.
    #[must_use]
    pub fn daily_tracker(&self, day: usize) -> Option<&DailyTracker> {
        self.daily.get(&day)
    }

    /// The assignment sequence in application order.
    #[must_use]
    pub fn assignments(&self) -> Vec<Assignment> {
        self.commitments
            .iter()
            .map(|c| c.assignment.clone())
            .collect()
    }

    /// True when the day's totals are committed to the weekly tracker.
    #[must_use]
    pub fn day_committed(&self, day: usize) -> bool {
        self.completed_day_totals.contains_key(&day)
    }

    /// Commit one assignment: update the day tracker and append the record.
    pub fn apply(
        &mut self,
        assignment: Assignment,
        nutrition: Nutrition,
        is_workout: bool,
        slots_total: usize,
        pinned: bool,
    ) {
        let tracker = self
            .daily
            .entry(assignment.day)
            .or_insert_with(|| DailyTracker::new(slots_total));
        tracker.record(&assignment.recipe_id, &nutrition, is_workout);
        self.commitments.push(Commitment {
            assignment,
            nutrition,
            is_workout,
            pinned,
        });
    }

    /// Commit a completed, validated day to the weekly tracker and recompute
    /// carryover needs.
    pub fn commit_day(&mut self, day: usize, tracked_targets: &BTreeMap<String, f64>) {
        let totals = self
            .daily
            .get(&day)
            .map(DailyTracker::totals)
            .unwrap_or_default();
        self.weekly.weekly_totals.accumulate(&totals);
        self.completed_day_totals.insert(day, totals);
        self.weekly.days_completed = self.completed_day_totals.len();
        self.weekly.days_remaining = self.days - self.weekly.days_completed;
        self.recompute_carryover(tracked_targets);
    }

    /// Remove every non-pinned commitment at or after `cut` in decision
    /// order, decommitting completed days the unwind touches and rebuilding
    /// affected trackers exactly. Returns how many commitments were removed.
    pub fn unwind(
        &mut self,
        cut: (usize, usize),
        tracked_targets: &BTreeMap<String, f64>,
    ) -> usize {
        let affected: BTreeSet<usize> = self
            .commitments
            .iter()
            .filter(|c| !c.pinned && (c.assignment.day, c.assignment.slot) >= cut)
            .map(|c| c.assignment.day)
            .collect();
        if affected.is_empty() {
            return 0;
        }

        let before = self.commitments.len();
        self.commitments
            .retain(|c| c.pinned || (c.assignment.day, c.assignment.slot) < cut);
        let removed = before - self.commitments.len();

        // Decommit every completed day the unwind touched, then rebuild the
        // weekly totals from the surviving prefix of completed days in the
        // same order they were first accumulated.
        let mut decommitted = false;
        for day in &affected {
            decommitted |= self.completed_day_totals.remove(day).is_some();
        }
        if decommitted {
            let mut weekly_totals = Nutrition::default();
            for totals in self.completed_day_totals.values() {
                weekly_totals.accumulate(totals);
            }
            self.weekly.weekly_totals = weekly_totals;
        }
        self.weekly.days_completed = self.completed_day_totals.len();
        self.weekly.days_remaining = self.days - self.weekly.days_completed;
        self.recompute_carryover(tracked_targets);

        // Rebuild each affected day tracker by re-folding survivors in their
        // original application order; identical fold order means identical
        // floating-point partial sums.
        for day in affected {
            let slots_total = self
                .daily
                .get(&day)
                .map_or(0, |tracker| tracker.slots_total);
            let mut rebuilt = DailyTracker::new(slots_total);
            let mut any = false;
            for c in self.commitments.iter().filter(|c| c.assignment.day == day) {
                rebuilt.record(&c.assignment.recipe_id, &c.nutrition, c.is_workout);
                any = true;
            }
            if any {
                self.daily.insert(day, rebuilt);
            } else {
                self.daily.remove(&day);
            }
        }

        removed
    }

    fn recompute_carryover(&mut self, tracked_targets: &BTreeMap<String, f64>) {
        let mut carryover = BTreeMap::new();
        for (nutrient, rdi) in tracked_targets {
            if *rdi <= 0.0 {
                continue;
            }
            let needed = rdi * self.weekly.days_completed as f64;
            let consumed = self.weekly.weekly_totals.micronutrient(nutrient);
            carryover.insert(nutrient.clone(), (needed - consumed).max(0.0));
        }
        self.weekly.carryover_needs = carryover;
    }
}

/// Pre-validate every pinned assignment before the search starts.
///
/// `resolved_pins` pairs each pin with its recipe; the caller has already
/// rejected pins that reference unknown recipes or slots. Checks each pin
/// against the exclusion, cooking-time, and calorie-ceiling rules, then
/// same-day duplication among pins, then cross-day non-workout repetition
/// among pins. The first violation is returned; the caller turns it into a
/// pinned-conflict failure without entering the search.
pub fn validate_pinned_assignments(
    profile: &UserProfile,
    resolved_pins: &[(&PinnedAssignment, &Recipe)],
    days: usize,
) -> Result<(), PinnedViolation> {
    for (pin, recipe) in resolved_pins {
        let slot = &profile.schedule[pin.day][pin.slot];

        if !excluded_ingredient_ok(recipe, &profile.excluded_ingredients) {
            return Err(PinnedViolation {
                day: pin.day,
                slot: pin.slot,
                recipe_id: pin.recipe_id.clone(),
                constraint: HardConstraint::ExcludedIngredient,
            });
        }
        if !cooking_time_ok(recipe, slot) {
            return Err(PinnedViolation {
                day: pin.day,
                slot: pin.slot,
                recipe_id: pin.recipe_id.clone(),
                constraint: HardConstraint::CookingTime,
            });
        }
        if let Some(ceiling) = profile.max_daily_calories {
            if recipe.nutrition.calories > f64::from(ceiling) {
                return Err(PinnedViolation {
                    day: pin.day,
                    slot: pin.slot,
                    recipe_id: pin.recipe_id.clone(),
                    constraint: HardConstraint::CalorieCeiling,
                });
            }
        }
    }

    // Same-day duplication among pins.
    let mut per_day: BTreeMap<usize, BTreeSet<&str>> = BTreeMap::new();
    for (pin, _) in resolved_pins {
        if !per_day
            .entry(pin.day)
            .or_default()
            .insert(pin.recipe_id.as_str())
        {
            return Err(PinnedViolation {
                day: pin.day,
                slot: pin.slot,
                recipe_id: pin.recipe_id.clone(),
                constraint: HardConstraint::SameDayReuse,
            });
        }
    }

    // Cross-day non-workout repetition among pins on consecutive days.
    let mut non_workout_by_day: BTreeMap<usize, BTreeSet<&str>> = BTreeMap::new();
    for (pin, _) in resolved_pins {
        let day_slots = &profile.schedule[pin.day];
        let next_first = if pin.day + 1 < days {
            profile.schedule[pin.day + 1].first()
        } else {
            None
        };
        let ctx = slot_context::activity_context(
            &day_slots[pin.slot],
            pin.slot,
            day_slots,
            next_first,
            profile.workout_window(pin.day),
        );
        if !ctx.is_workout() {
            non_workout_by_day
                .entry(pin.day)
                .or_default()
                .insert(pin.recipe_id.as_str());
        }
    }
    for (pin, _) in resolved_pins {
        if pin.day == 0 {
            continue;
        }
        let repeated = non_workout_by_day
            .get(&pin.day)
            .is_some_and(|today| today.contains(pin.recipe_id.as_str()))
            && non_workout_by_day
                .get(&(pin.day - 1))
                .is_some_and(|yesterday| yesterday.contains(pin.recipe_id.as_str()));
        if repeated {
            return Err(PinnedViolation {
                day: pin.day,
                slot: pin.slot,
                recipe_id: pin.recipe_id.clone(),
                constraint: HardConstraint::CrossDayRepeat,
            });
        }
    }

    Ok(())
}
