// ABOUTME: Primary-carb downscaling: reduced-carb variants of calorie-rejected recipes
// ABOUTME: Variants share the parent recipe id and re-pass every constraint with recalculated nutrition
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

//! Primary-carb downscaling.
//!
//! When a sedentary, non-pinned slot rejects a recipe solely for calorie
//! excess and the recipe's primary carbohydrate is a scalable source (plain
//! starches such as rice or potato), the planner offers variants in which the
//! carb contribution is reduced in steps of sigma:
//!
//! `variant = base − contribution + contribution · (1 − i·sigma)`, i = 1..K
//!
//! No recursive scaling: variants are never themselves downscaled.

use std::collections::BTreeSet;

use crate::config::CarbScalingConfig;
use crate::errors::{PlannerError, PlannerResult};
use crate::models::nutrition::Nutrition;
use crate::models::profile::{MealSlot, UserProfile};
use crate::models::recipe::{normalize_name, Recipe};
use crate::models::upper_limits::ResolvedUpperLimits;
use crate::planner::candidates::Candidate;
use crate::planner::constraints::{
    calorie_ceiling_ok, cooking_time_ok, cross_day_repeat_ok, excluded_ingredient_ok,
    same_day_reuse_ok, ConstraintContext,
};
use crate::planner::feasibility::{
    daily_calories_feasible, daily_macros_feasible, incremental_ul_feasible, FeasibilityContext,
};

/// True when the recipe can be downscaled: it declares a primary carb
/// contribution and the source is in the configured scalable set.
#[must_use]
pub fn is_scalable(recipe: &Recipe, scalable_sources: &BTreeSet<String>) -> bool {
    if recipe.primary_carb_contribution.is_none() {
        return false;
    }
    recipe
        .primary_carb_source
        .as_deref()
        .is_some_and(|source| scalable_sources.contains(&normalize_name(source)))
}

/// Nutrition of the `step`-th variant (`step` ≥ 1) with per-step fraction
/// `sigma`. Step 0 is the unscaled recipe and is not produced here.
#[must_use]
pub fn variant_nutrition(recipe: &Recipe, step: u8, sigma: f64) -> Nutrition {
    let Some(contribution) = &recipe.primary_carb_contribution else {
        return recipe.nutrition.clone();
    };
    let scale = 1.0 - f64::from(step) * sigma;

    let mut variant = Nutrition::new(
        recipe.nutrition.calories - contribution.calories + contribution.calories * scale,
        recipe.nutrition.protein_g - contribution.protein_g + contribution.protein_g * scale,
        recipe.nutrition.fat_g - contribution.fat_g + contribution.fat_g * scale,
        recipe.nutrition.carbs_g - contribution.carbs_g + contribution.carbs_g * scale,
    );

    let mut names: BTreeSet<&String> = recipe.nutrition.micronutrients.keys().collect();
    names.extend(contribution.micronutrients.keys());
    for name in names {
        let base = recipe.nutrition.micronutrient(name);
        let orig = contribution.micronutrient(name);
        variant
            .micronutrients
            .insert(name.clone(), base - orig + orig * scale);
    }
    variant
}

/// Validate every scalable recipe's contribution up front: at the deepest
/// step no nutrient may go negative, which would mean the declared
/// contribution exceeds the recipe's own nutrition.
///
/// # Errors
///
/// Returns [`PlannerError::InvalidCarbContribution`] naming the recipe and
/// the offending nutrient.
pub fn validate_contributions(pool: &[Recipe], config: &CarbScalingConfig) -> PlannerResult<()> {
    if !config.enabled {
        return Ok(());
    }
    let sigma = config.effective_sigma();
    for recipe in pool {
        if !is_scalable(recipe, &config.scalable_sources) {
            continue;
        }
        let deepest = variant_nutrition(recipe, config.max_steps.max(1), sigma);
        let checks = [
            ("calories", deepest.calories),
            ("protein_g", deepest.protein_g),
            ("fat_g", deepest.fat_g),
            ("carbs_g", deepest.carbs_g),
        ];
        for (name, value) in checks {
            if value < 0.0 {
                return Err(PlannerError::InvalidCarbContribution {
                    recipe_id: recipe.id.clone(),
                    detail: format!("{name} would become negative after scaling"),
                });
            }
        }
        for (name, value) in &deepest.micronutrients {
            if *value < 0.0 {
                return Err(PlannerError::InvalidCarbContribution {
                    recipe_id: recipe.id.clone(),
                    detail: format!("{name} would become negative after scaling"),
                });
            }
        }
    }
    Ok(())
}

/// Generate surviving variants for the calorie-rejected recipes at one
/// decision point. Each variant is re-checked against every hard rule and
/// the calorie, macro, and upper-limit feasibility checks with its
/// recalculated nutrition. Identity for reuse rules is the parent id.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn generate_variants(
    pool: &[Recipe],
    calorie_excess: &BTreeSet<String>,
    slot: &MealSlot,
    day: usize,
    slot_index: usize,
    cctx: &ConstraintContext<'_>,
    fctx: &FeasibilityContext<'_>,
    profile: &UserProfile,
    resolved_ul: &ResolvedUpperLimits,
    config: &CarbScalingConfig,
) -> Vec<Candidate> {
    let steps = config.max_steps.max(1);
    let sigma = config.effective_sigma();

    let mut variants = Vec::new();
    for (index, recipe) in pool.iter().enumerate() {
        if !calorie_excess.contains(&recipe.id) {
            continue;
        }
        if !is_scalable(recipe, &config.scalable_sources) {
            continue;
        }
        for step in 1..=steps {
            let scale = 1.0 - f64::from(step) * sigma;
            if scale <= 0.0 {
                continue;
            }
            let nutrition = variant_nutrition(recipe, step, sigma);

            if !excluded_ingredient_ok(recipe, &profile.excluded_ingredients) {
                continue;
            }
            if !same_day_reuse_ok(&recipe.id, cctx.daily) {
                continue;
            }
            if !cooking_time_ok(recipe, slot) {
                continue;
            }
            if !calorie_ceiling_ok(&nutrition, cctx.daily, profile.max_daily_calories) {
                continue;
            }
            if day > 0 && !cctx.is_workout_slot && !cross_day_repeat_ok(&recipe.id, cctx) {
                continue;
            }
            if !daily_calories_feasible(&nutrition, day, slot_index, fctx) {
                continue;
            }
            if !daily_macros_feasible(&nutrition, day, slot_index, fctx) {
                continue;
            }
            if !incremental_ul_feasible(&nutrition, cctx.daily, resolved_ul) {
                continue;
            }

            variants.push(Candidate {
                recipe_index: index,
                recipe_id: recipe.id.clone(),
                variant_step: step,
                nutrition,
            });
        }
    }
    variants
}
