// ABOUTME: Hard constraints as pure allow/deny predicates over one tentative assignment
// ABOUTME: The single authoritative answer to "does this assignment violate a hard rule?"
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

//! Hard constraints.
//!
//! Every predicate is pure: no mutation, no scoring, no forward reasoning.
//! A downscaled variant shares its parent recipe's id, so identity-based
//! rules (same-day reuse, cross-day repetition) treat them as one recipe; the
//! nutrition-based rules receive the variant's recalculated nutrition.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::nutrition::Nutrition;
use crate::models::profile::{MealSlot, UserProfile};
use crate::models::recipe::{normalize_name, Recipe};
use crate::models::upper_limits::ResolvedUpperLimits;
use crate::planner::state::DailyTracker;

/// The hard rules, named by what they forbid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardConstraint {
    /// Recipe contains an ingredient the user excluded
    ExcludedIngredient,
    /// Recipe id already used on the same day
    SameDayReuse,
    /// Recipe takes longer to cook than the slot allows
    CookingTime,
    /// A daily micronutrient upper limit would be exceeded
    DailyUpperLimit,
    /// The hard daily calorie ceiling would be exceeded
    CalorieCeiling,
    /// Slot is pinned to a different recipe
    PinnedSlot,
    /// Non-workout repeat of a recipe served the previous day
    CrossDayRepeat,
}

impl HardConstraint {
    /// Short description used in reports and logs.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ExcludedIngredient => "contains an excluded ingredient",
            Self::SameDayReuse => "recipe already used this day",
            Self::CookingTime => "cooking time exceeds the slot budget",
            Self::DailyUpperLimit => "daily upper limit exceeded",
            Self::CalorieCeiling => "daily calorie ceiling exceeded",
            Self::PinnedSlot => "slot is pinned to another recipe",
            Self::CrossDayRepeat => "non-workout repeat from the previous day",
        }
    }
}

/// A pinned assignment that violates a hard rule, found before search starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedViolation {
    /// Day index of the offending pin
    pub day: usize,
    /// Slot index of the offending pin
    pub slot: usize,
    /// The pinned recipe
    pub recipe_id: String,
    /// The rule it breaks
    pub constraint: HardConstraint,
}

/// Read-only view of the state a predicate may consult.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintContext<'a> {
    /// Tracker for the day being decided, if any assignment exists yet
    pub daily: Option<&'a DailyTracker>,
    /// Tracker for the previous day, if any
    pub previous_daily: Option<&'a DailyTracker>,
    /// Day index of the decision point
    pub day: usize,
    /// Whether the slot being decided is adjacent to a workout
    pub is_workout_slot: bool,
}

/// Excluded-ingredient rule: no ingredient of the recipe may match the
/// user's exclusion set (normalized names).
#[must_use]
pub fn excluded_ingredient_ok(recipe: &Recipe, excluded: &BTreeSet<String>) -> bool {
    if excluded.is_empty() {
        return true;
    }
    !recipe
        .ingredients
        .iter()
        .any(|ing| excluded.contains(&normalize_name(&ing.name)))
}

/// Same-day uniqueness: a recipe id may appear at most once per day.
#[must_use]
pub fn same_day_reuse_ok(recipe_id: &str, daily: Option<&DailyTracker>) -> bool {
    daily.is_none_or(|tracker| !tracker.used_recipe_ids.contains(recipe_id))
}

/// Cooking-time rule: the recipe must fit the slot's busyness budget.
#[must_use]
pub fn cooking_time_ok(recipe: &Recipe, slot: &MealSlot) -> bool {
    match slot.busyness.cooking_time_cap() {
        Some(cap) => recipe.cooking_time_minutes <= cap,
        None => true,
    }
}

/// Daily upper-limit rule over the day's consumed totals. Equality at the
/// limit is allowed; only strict excess violates.
#[must_use]
pub fn daily_upper_limit_ok(
    daily: Option<&DailyTracker>,
    resolved_ul: &ResolvedUpperLimits,
) -> bool {
    let Some(tracker) = daily else {
        return true;
    };
    resolved_ul
        .daily_violations(&tracker.micronutrients_consumed)
        .is_empty()
}

/// Calorie-ceiling rule: adding the candidate must not push the day's
/// calories above the hard ceiling. Equality is allowed.
#[must_use]
pub fn calorie_ceiling_ok(
    nutrition: &Nutrition,
    daily: Option<&DailyTracker>,
    ceiling: Option<u32>,
) -> bool {
    let Some(ceiling) = ceiling else {
        return true;
    };
    let current = daily.map_or(0.0, |t| t.calories_consumed);
    current + nutrition.calories <= f64::from(ceiling)
}

/// Pinned-slot rule: a pinned slot accepts only its pinned recipe.
#[must_use]
pub fn pinned_slot_ok(recipe_id: &str, pinned_recipe_id: Option<&str>) -> bool {
    pinned_recipe_id.is_none_or(|pinned| pinned == recipe_id)
}

/// Cross-day repetition rule: from the second day on, a non-workout slot may
/// not repeat a recipe the previous day served at a non-workout slot. Workout
/// slots are exempt, and day one is never restricted.
#[must_use]
pub fn cross_day_repeat_ok(recipe_id: &str, ctx: &ConstraintContext<'_>) -> bool {
    if ctx.day == 0 || ctx.is_workout_slot {
        return true;
    }
    ctx.previous_daily
        .is_none_or(|prev| !prev.non_workout_recipe_ids.contains(recipe_id))
}

/// Evaluate every hard rule for one tentative assignment and collect the
/// violations. `nutrition` is the effective nutrition (the variant's, when
/// judging a downscaled variant); `recipe` supplies identity, ingredients,
/// and cooking time.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn violations(
    recipe: &Recipe,
    nutrition: &Nutrition,
    slot: &MealSlot,
    pinned_recipe_id: Option<&str>,
    profile: &UserProfile,
    resolved_ul: &ResolvedUpperLimits,
    ctx: &ConstraintContext<'_>,
) -> Vec<HardConstraint> {
    let mut violated = Vec::new();
    if !excluded_ingredient_ok(recipe, &profile.excluded_ingredients) {
        violated.push(HardConstraint::ExcludedIngredient);
    }
    if !same_day_reuse_ok(&recipe.id, ctx.daily) {
        violated.push(HardConstraint::SameDayReuse);
    }
    if !cooking_time_ok(recipe, slot) {
        violated.push(HardConstraint::CookingTime);
    }
    if !daily_upper_limit_ok(ctx.daily, resolved_ul) {
        violated.push(HardConstraint::DailyUpperLimit);
    }
    if !calorie_ceiling_ok(nutrition, ctx.daily, profile.max_daily_calories) {
        violated.push(HardConstraint::CalorieCeiling);
    }
    if !pinned_slot_ok(&recipe.id, pinned_recipe_id) {
        violated.push(HardConstraint::PinnedSlot);
    }
    if !cross_day_repeat_ok(&recipe.id, ctx) {
        violated.push(HardConstraint::CrossDayRepeat);
    }
    violated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recipe::Ingredient;

    fn recipe(id: &str, calories: f64) -> Recipe {
        Recipe::new(id, id, 20, Nutrition::new(calories, 30.0, 15.0, 40.0))
            .with_ingredient(Ingredient::new("chicken breast", 150.0, "g"))
            .with_ingredient(Ingredient::to_taste("salt"))
    }

    #[test]
    fn exclusion_matches_to_taste_items() {
        let r = recipe("grill", 500.0);
        let mut excluded = BTreeSet::new();
        excluded.insert("salt".to_owned());
        assert!(!excluded_ingredient_ok(&r, &excluded));

        let mut other = BTreeSet::new();
        other.insert("peanut".to_owned());
        assert!(excluded_ingredient_ok(&r, &other));
    }

    #[test]
    fn same_day_reuse_consults_the_tracker() {
        let mut tracker = DailyTracker::new(3);
        assert!(same_day_reuse_ok("grill", Some(&tracker)));
        tracker.record("grill", &Nutrition::new(500.0, 30.0, 15.0, 40.0), false);
        assert!(!same_day_reuse_ok("grill", Some(&tracker)));
        assert!(same_day_reuse_ok("grill", None));
    }

    #[test]
    fn ceiling_allows_equality() {
        let n = Nutrition::new(1800.0, 0.0, 0.0, 0.0);
        assert!(calorie_ceiling_ok(&n, None, Some(1800)));
        let over = Nutrition::new(1800.5, 0.0, 0.0, 0.0);
        assert!(!calorie_ceiling_ok(&over, None, Some(1800)));
        assert!(calorie_ceiling_ok(&over, None, None));
    }

    #[test]
    fn aggregator_collects_every_violated_rule() {
        let mut profile = UserProfile::new(2000, 100.0, (50.0, 80.0), 250.0);
        profile.excluded_ingredients.insert("chicken breast".to_owned());
        profile.max_daily_calories = Some(400);

        let r = recipe("grill", 500.0);
        let slot = MealSlot::new(
            chrono::NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            crate::models::profile::Busyness::Grab,
            "lunch",
        );
        let mut tracker = DailyTracker::new(3);
        tracker.record("grill", &Nutrition::new(100.0, 10.0, 5.0, 10.0), false);
        let ctx = ConstraintContext {
            daily: Some(&tracker),
            previous_daily: None,
            day: 0,
            is_workout_slot: false,
        };

        let violated = violations(
            &r,
            &r.nutrition,
            &slot,
            Some("other-dish"),
            &profile,
            &ResolvedUpperLimits::none(),
            &ctx,
        );
        assert!(violated.contains(&HardConstraint::ExcludedIngredient));
        assert!(violated.contains(&HardConstraint::SameDayReuse));
        assert!(violated.contains(&HardConstraint::CookingTime));
        assert!(violated.contains(&HardConstraint::CalorieCeiling));
        assert!(violated.contains(&HardConstraint::PinnedSlot));
        assert!(!violated.contains(&HardConstraint::CrossDayRepeat));
        assert!(!violated.contains(&HardConstraint::DailyUpperLimit));
    }

    #[test]
    fn cross_day_repeat_exemptions() {
        let mut yesterday = DailyTracker::new(2);
        yesterday.record("grill", &Nutrition::new(500.0, 30.0, 15.0, 40.0), false);

        let day_two_non_workout = ConstraintContext {
            daily: None,
            previous_daily: Some(&yesterday),
            day: 1,
            is_workout_slot: false,
        };
        assert!(!cross_day_repeat_ok("grill", &day_two_non_workout));

        let day_two_workout = ConstraintContext {
            is_workout_slot: true,
            ..day_two_non_workout
        };
        assert!(cross_day_repeat_ok("grill", &day_two_workout));

        let day_one = ConstraintContext {
            day: 0,
            previous_daily: None,
            ..day_two_non_workout
        };
        assert!(cross_day_repeat_ok("grill", &day_one));
    }
}
