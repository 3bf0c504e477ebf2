// ABOUTME: Composite scoring: five weighted components, each normalized to 0-100
// ABOUTME: Pure ranking only; constraint and feasibility logic never appears here
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

//! Composite score.
//!
//! `score = (40·nutrition + 30·micronutrient + 15·satiety + 15·balance
//! + 10·schedule) / 110`, every component in `[0, 100]`. Higher is better.
//! The score ranks candidates that already passed hard constraints and
//! feasibility; it never reorders candidates past those filters.

use crate::constants::score_weights;
use crate::constants::scoring::{
    MODERATE_SATIETY_BASELINE, MODERATE_SATIETY_PROTEIN_MIDPOINT, MODERATE_SATIETY_PROTEIN_SLOPE,
    NEUTRAL_SCORE, NOVELTY_COVERED_THRESHOLD, NOVELTY_POINTS_PER_NUTRIENT,
    NUTRITION_DEVIATION_TOLERANCE, SATIETY_CALORIE_DIVISOR, SATIETY_FIBER_SCALE,
    SATIETY_PROTEIN_SCALE, UNBOUNDED_DISTANCE_PENALTY, UNBOUNDED_REFERENCE_MINUTES,
};
use crate::models::nutrition::Nutrition;
use crate::models::profile::{MealSlot, UserProfile};
use crate::models::recipe::Recipe;
use crate::planner::slot_context::{Satiety, SlotContext};
use crate::planner::state::{adjusted_daily_target, DailyTracker, PerMealTarget, WeeklyTracker};

/// Read-only view of the state scoring may consult.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    /// Tracker for the day being decided, if any
    pub daily: Option<&'a DailyTracker>,
    /// The weekly tracker
    pub weekly: &'a WeeklyTracker,
    /// User profile
    pub profile: &'a UserProfile,
}

fn clamp_score(x: f64) -> f64 {
    x.clamp(0.0, 100.0)
}

/// Sub-score for calories, protein, or carbs: full credit on target, falling
/// linearly to zero at a 10% deviation.
#[must_use]
pub fn macro_subscore(actual: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 100.0;
    }
    let deviation = (actual - target).abs() / target;
    clamp_score(100.0 * (1.0 - deviation / NUTRITION_DEVIATION_TOLERANCE))
}

/// Fat sub-score: best when the recipe's fat sits at the midpoint of the
/// meal's fat window, falling to zero at the window edges.
#[must_use]
pub fn fat_subscore(recipe_fat: f64, meal_fat_min: f64, meal_fat_max: f64) -> f64 {
    if meal_fat_max <= meal_fat_min {
        return 100.0;
    }
    let midpoint = (meal_fat_min + meal_fat_max) / 2.0;
    let half_range = (meal_fat_max - meal_fat_min) / 2.0;
    let deviation = ((recipe_fat - midpoint) / half_range).abs();
    clamp_score(100.0 * (1.0 - deviation.min(1.0)))
}

/// Nutrition match: equal-weighted average of the four macro sub-scores
/// against the per-meal target (already activity-shifted).
#[must_use]
pub fn nutrition_match(nutrition: &Nutrition, per_meal: &PerMealTarget) -> f64 {
    let calories = macro_subscore(nutrition.calories, per_meal.calories);
    let protein = macro_subscore(nutrition.protein_g, per_meal.protein_g);
    let fat = fat_subscore(nutrition.fat_g, per_meal.fat_min, per_meal.fat_max);
    let carbs = macro_subscore(nutrition.carbs_g, per_meal.carbs_g);
    (calories + protein + fat + carbs) / 4.0
}

/// Micronutrient match: the recipe's contribution toward each still-deficient
/// tracked nutrient, weighted by gap size plus carryover so larger deficits
/// dominate. Nutrients already at target contribute nothing. Neutral when
/// nothing is tracked or nothing is deficient.
#[must_use]
pub fn micronutrient_match(nutrition: &Nutrition, ctx: &ScoringContext<'_>) -> f64 {
    let tracked = &ctx.profile.micronutrient_targets;
    if tracked.is_empty() {
        return NEUTRAL_SCORE;
    }

    let days_left = ctx.weekly.days_remaining.max(1);
    let consumed = ctx.daily.map(|t| &t.micronutrients_consumed);

    let mut total_contribution = 0.0;
    let mut total_weight = 0.0;
    for (nutrient, base_target) in tracked {
        if *base_target <= 0.0 {
            continue;
        }
        let carryover = ctx
            .weekly
            .carryover_needs
            .get(nutrient)
            .copied()
            .unwrap_or(0.0);
        let adjusted = adjusted_daily_target(*base_target, carryover, days_left);
        let current = consumed
            .and_then(|m| m.get(nutrient))
            .copied()
            .unwrap_or(0.0);
        let gap = adjusted - current;
        if gap <= 0.0 {
            continue;
        }
        let amount = nutrition.micronutrient(nutrient);
        if amount <= 0.0 {
            continue;
        }
        let fill_ratio = (amount / gap).min(1.0);
        let weight = gap + carryover;
        total_contribution += weight * fill_ratio;
        total_weight += weight;
    }

    if total_weight <= 0.0 {
        return NEUTRAL_SCORE;
    }
    clamp_score(100.0 * (total_contribution / total_weight))
}

/// Satiety match. High-satiety slots favor fiber, protein, and total
/// calories; moderate slots favor mid-range protein.
#[must_use]
pub fn satiety_match(nutrition: &Nutrition, satiety: Satiety) -> f64 {
    match satiety {
        Satiety::High => {
            let fiber = (nutrition.micronutrient("fiber_g") * SATIETY_FIBER_SCALE).min(100.0);
            let protein = (nutrition.protein_g * SATIETY_PROTEIN_SCALE).min(100.0);
            let calories = (nutrition.calories / SATIETY_CALORIE_DIVISOR).min(100.0);
            clamp_score((fiber + protein + calories) / 3.0)
        }
        Satiety::Moderate => clamp_score(
            MODERATE_SATIETY_BASELINE
                - (nutrition.protein_g - MODERATE_SATIETY_PROTEIN_MIDPOINT).abs()
                    * MODERATE_SATIETY_PROTEIN_SLOPE,
        ),
    }
}

/// Balance: half macro-trajectory correction (does the recipe move the day's
/// running totals toward target?), half micronutrient novelty (does it cover
/// nutrients the day has not seen?). Neutral before the day has any
/// assignments.
#[must_use]
pub fn balance(nutrition: &Nutrition, ctx: &ScoringContext<'_>) -> f64 {
    let Some(tracker) = ctx.daily else {
        return NEUTRAL_SCORE;
    };

    let slots_left = tracker
        .slots_total
        .saturating_sub(tracker.slots_assigned)
        .max(1) as f64;
    let need_calories =
        (f64::from(ctx.profile.daily_calories) - tracker.calories_consumed) / slots_left;
    let need_protein = (ctx.profile.daily_protein_g - tracker.protein_consumed) / slots_left;
    let need_fat = (ctx.profile.daily_fat_midpoint() - tracker.fat_consumed) / slots_left;
    let need_carbs = (ctx.profile.daily_carbs_g - tracker.carbs_consumed) / slots_left;

    let calories = if need_calories > 0.0 {
        macro_subscore(nutrition.calories, need_calories)
    } else {
        NEUTRAL_SCORE
    };
    let protein = if need_protein != 0.0 {
        macro_subscore(nutrition.protein_g, need_protein)
    } else {
        NEUTRAL_SCORE
    };
    let fat = if need_fat != 0.0 {
        macro_subscore(nutrition.fat_g, need_fat)
    } else {
        NEUTRAL_SCORE
    };
    let carbs = if need_carbs > 0.0 {
        macro_subscore(nutrition.carbs_g, need_carbs)
    } else {
        NEUTRAL_SCORE
    };
    let trajectory = (calories + protein + fat + carbs) / 4.0;

    let diversity = if nutrition.micronutrients.is_empty() {
        NEUTRAL_SCORE
    } else {
        let novel = nutrition
            .micronutrients
            .iter()
            .filter(|(name, amount)| {
                **amount > 0.0
                    && tracker
                        .micronutrients_consumed
                        .get(*name)
                        .copied()
                        .unwrap_or(0.0)
                        < NOVELTY_COVERED_THRESHOLD
            })
            .count();
        (novel as f64 * NOVELTY_POINTS_PER_NUTRIENT).min(100.0)
    };

    clamp_score((trajectory + diversity) / 2.0)
}

/// Schedule match: within a bounded slot, shorter cooking is better and
/// anything over the cap scores zero. Unbounded slots peak near a reasonable
/// cooking time instead of rewarding arbitrarily long recipes.
#[must_use]
pub fn schedule_match(recipe: &Recipe, slot: &MealSlot) -> f64 {
    let cooking = f64::from(recipe.cooking_time_minutes);
    match slot.busyness.cooking_time_cap() {
        Some(cap) => {
            if recipe.cooking_time_minutes > cap {
                return 0.0;
            }
            clamp_score(100.0 * (1.0 - cooking / f64::from(cap.max(1))))
        }
        None => {
            let distance = (cooking - UNBOUNDED_REFERENCE_MINUTES).abs();
            clamp_score(100.0 - distance * UNBOUNDED_DISTANCE_PENALTY)
        }
    }
}

/// The composite score for one candidate at one decision point.
///
/// `nutrition` is the candidate's effective nutrition (the variant's when
/// judging a downscaled variant); `recipe` supplies cooking time for the
/// schedule component.
#[must_use]
pub fn composite_score(
    recipe: &Recipe,
    nutrition: &Nutrition,
    slot: &MealSlot,
    slot_ctx: &SlotContext,
    per_meal: &PerMealTarget,
    ctx: &ScoringContext<'_>,
) -> f64 {
    let nutrition_score = nutrition_match(nutrition, per_meal);
    let micronutrient_score = micronutrient_match(nutrition, ctx);
    let satiety_score = satiety_match(nutrition, slot_ctx.satiety);
    let balance_score = balance(nutrition, ctx);
    let schedule_score = schedule_match(recipe, slot);

    clamp_score(
        (score_weights::NUTRITION * nutrition_score
            + score_weights::MICRONUTRIENT * micronutrient_score
            + score_weights::SATIETY * satiety_score
            + score_weights::BALANCE * balance_score
            + score_weights::SCHEDULE * schedule_score)
            / score_weights::TOTAL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::Busyness;
    use chrono::NaiveTime;

    #[test]
    fn macro_subscore_shape() {
        assert!((macro_subscore(100.0, 100.0) - 100.0).abs() < 1e-9);
        // 5% off target costs half the score.
        assert!((macro_subscore(105.0, 100.0) - 50.0).abs() < 1e-9);
        // 10% off or more scores zero.
        assert_eq!(macro_subscore(110.0, 100.0), 0.0);
        assert_eq!(macro_subscore(150.0, 100.0), 0.0);
        // No target, full credit.
        assert_eq!(macro_subscore(37.0, 0.0), 100.0);
    }

    #[test]
    fn fat_subscore_peaks_at_midpoint() {
        assert!((fat_subscore(20.0, 15.0, 25.0) - 100.0).abs() < 1e-9);
        assert_eq!(fat_subscore(25.0, 15.0, 25.0), 0.0);
        assert_eq!(fat_subscore(40.0, 15.0, 25.0), 0.0);
        // Degenerate window is not penalized.
        assert_eq!(fat_subscore(10.0, 20.0, 20.0), 100.0);
    }

    #[test]
    fn satiety_prefers_substantial_meals_when_high() {
        let hearty = Nutrition::new(600.0, 40.0, 20.0, 60.0).with_micronutrient("fiber_g", 15.0);
        let light = Nutrition::new(150.0, 8.0, 4.0, 20.0).with_micronutrient("fiber_g", 1.0);
        assert!(satiety_match(&hearty, Satiety::High) > satiety_match(&light, Satiety::High));

        // Moderate slots prefer mid-range protein.
        let mid = Nutrition::new(400.0, 25.0, 15.0, 45.0);
        let extreme = Nutrition::new(400.0, 60.0, 15.0, 45.0);
        assert!(satiety_match(&mid, Satiety::Moderate) > satiety_match(&extreme, Satiety::Moderate));
    }

    #[test]
    fn schedule_match_shapes() {
        let slot_quick = MealSlot::new(
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            Busyness::Quick,
            "lunch",
        );
        let fast = Recipe::new("f", "f", 5, Nutrition::new(300.0, 20.0, 10.0, 30.0));
        let slow = Recipe::new("s", "s", 25, Nutrition::new(300.0, 20.0, 10.0, 30.0));
        assert!(schedule_match(&fast, &slot_quick) > 0.0);
        assert_eq!(schedule_match(&slow, &slot_quick), 0.0);

        // Unbounded slots peak near the reference time, not at the extremes.
        let slot_free = MealSlot::new(
            NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            Busyness::Unhurried,
            "dinner",
        );
        let near_reference = Recipe::new("n", "n", 30, Nutrition::new(300.0, 20.0, 10.0, 30.0));
        let marathon = Recipe::new("m", "m", 120, Nutrition::new(300.0, 20.0, 10.0, 30.0));
        assert!((schedule_match(&near_reference, &slot_free) - 100.0).abs() < 1e-9);
        assert_eq!(schedule_match(&marathon, &slot_free), 0.0);
    }
}
