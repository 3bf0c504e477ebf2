// ABOUTME: Deterministic tie-break cascade applied to scored candidates
// ABOUTME: Score desc, then deficient-nutrient coverage, deficit reduction, liked foods, id asc
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

//! Candidate ordering.
//!
//! The comparator is a total order: composite score descending, then more
//! currently-deficient nutrients covered, then a larger share of total
//! deficit reduced, then more liked-food matches, then lexicographically
//! smaller recipe id. Downscaled variants share their parent's id, so a final
//! ascending variant-step key keeps the order total for them too.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::nutrition::Nutrition;
use crate::models::recipe::{normalize_name, Recipe};
use crate::planner::candidates::Candidate;
use crate::planner::scoring::ScoringContext;
use crate::planner::state::adjusted_daily_target;

/// A candidate with its score and precomputed tie-break keys.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    /// The candidate being ranked
    pub candidate: Candidate,
    /// Composite score in `[0, 100]`
    pub score: f64,
    gap_fill: usize,
    deficit_reduction: f64,
    liked_matches: usize,
}

/// Remaining gap per tracked nutrient that is still deficient today, against
/// the carryover-adjusted daily target.
#[must_use]
pub fn nutrients_still_needed(ctx: &ScoringContext<'_>) -> BTreeMap<String, f64> {
    let tracked = &ctx.profile.micronutrient_targets;
    let mut gaps = BTreeMap::new();
    if tracked.is_empty() {
        return gaps;
    }
    let days_left = ctx.weekly.days_remaining.max(1);
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
        let current = ctx
            .daily
            .and_then(|t| t.micronutrients_consumed.get(nutrient))
            .copied()
            .unwrap_or(0.0);
        if current < adjusted {
            gaps.insert(nutrient.clone(), adjusted - current);
        }
    }
    gaps
}

/// How many currently-deficient nutrients the candidate provides any of.
#[must_use]
pub fn gap_fill_count(nutrition: &Nutrition, gaps: &BTreeMap<String, f64>) -> usize {
    gaps.keys()
        .filter(|nutrient| nutrition.micronutrient(nutrient) > 0.0)
        .count()
}

/// Total deficit-reduction share: the sum over deficient nutrients of the
/// candidate's contribution as a fraction of the remaining gap, capped at one
/// per nutrient.
#[must_use]
pub fn deficit_reduction(nutrition: &Nutrition, gaps: &BTreeMap<String, f64>) -> f64 {
    let mut total = 0.0;
    for (nutrient, gap) in gaps {
        if *gap <= 0.0 {
            continue;
        }
        let amount = nutrition.micronutrient(nutrient);
        if amount > 0.0 {
            total += (amount / gap).min(1.0);
        }
    }
    total
}

/// How many of the recipe's ingredients the user likes.
#[must_use]
pub fn liked_food_matches(
    recipe: &Recipe,
    liked: &std::collections::BTreeSet<String>,
) -> usize {
    if liked.is_empty() {
        return 0;
    }
    recipe
        .ingredients
        .iter()
        .filter(|ing| liked.contains(&normalize_name(&ing.name)))
        .count()
}

/// Build a ranked candidate with all tie-break keys precomputed.
#[must_use]
pub fn rank(
    candidate: Candidate,
    score: f64,
    recipe: &Recipe,
    gaps: &BTreeMap<String, f64>,
    liked: &std::collections::BTreeSet<String>,
) -> RankedCandidate {
    let gap_fill = gap_fill_count(&candidate.nutrition, gaps);
    let reduction = deficit_reduction(&candidate.nutrition, gaps);
    let liked_matches = liked_food_matches(recipe, liked);
    RankedCandidate {
        candidate,
        score,
        gap_fill,
        deficit_reduction: reduction,
        liked_matches,
    }
}

/// Sort ranked candidates into their final, total order.
pub fn order_candidates(ranked: &mut [RankedCandidate]) {
    ranked.sort_by(compare);
}

fn compare(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.gap_fill.cmp(&a.gap_fill))
        .then_with(|| b.deficit_reduction.total_cmp(&a.deficit_reduction))
        .then_with(|| b.liked_matches.cmp(&a.liked_matches))
        .then_with(|| a.candidate.recipe_id.cmp(&b.candidate.recipe_id))
        .then_with(|| a.candidate.variant_step.cmp(&b.candidate.variant_step))
}
