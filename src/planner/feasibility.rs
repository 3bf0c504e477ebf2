// ABOUTME: Forward-looking feasibility checks and their precomputed bounds
// ABOUTME: Conservative pruning: may admit doomed candidates, never rejects a completable one
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

//! Feasibility checks.
//!
//! Each check answers: "if this recipe were placed here, could the plan
//! still complete?" The window tests compare the remaining budget against
//! precomputed min/max sums achievable with M distinct recipes, which makes
//! every check O(1) at decision time.

use std::collections::{BTreeMap, BTreeSet};

use crate::constants::tolerances::DAILY_TOLERANCE_FRACTION;
use crate::models::nutrition::Nutrition;
use crate::models::profile::UserProfile;
use crate::models::recipe::Recipe;
use crate::models::upper_limits::ResolvedUpperLimits;
use crate::planner::state::{DailyTracker, WeeklyTracker};

/// Min/max achievable sums of one macro over M distinct recipes, M = 0..=cap.
#[derive(Debug, Clone, Default)]
pub struct MacroWindow {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl MacroWindow {
    fn from_values(mut values: Vec<f64>, cap: usize) -> Self {
        values.sort_by(f64::total_cmp);
        let mut min = Vec::with_capacity(cap + 1);
        let mut max = Vec::with_capacity(cap + 1);
        for m in 0..=cap {
            let take = m.min(values.len());
            min.push(values[..take].iter().sum());
            max.push(values[values.len() - take..].iter().sum());
        }
        Self { min, max }
    }

    /// Smallest sum achievable with `m` distinct recipes.
    #[must_use]
    pub fn min_sum(&self, m: usize) -> f64 {
        self.min.get(m).copied().unwrap_or_else(|| {
            self.min.last().copied().unwrap_or(0.0)
        })
    }

    /// Largest sum achievable with `m` distinct recipes.
    #[must_use]
    pub fn max_sum(&self, m: usize) -> f64 {
        self.max.get(m).copied().unwrap_or_else(|| {
            self.max.last().copied().unwrap_or(0.0)
        })
    }
}

/// Per-macro windows precomputed once per search.
#[derive(Debug, Clone, Default)]
pub struct MacroBounds {
    /// Calorie window
    pub calories: MacroWindow,
    /// Protein window
    pub protein: MacroWindow,
    /// Fat window
    pub fat: MacroWindow,
    /// Carbohydrate window
    pub carbs: MacroWindow,
}

impl MacroBounds {
    /// Precompute windows from the pool, one value per distinct recipe id.
    #[must_use]
    pub fn precompute(pool: &[Recipe], max_slots: usize) -> Self {
        let mut seen = BTreeSet::new();
        let mut calories = Vec::new();
        let mut protein = Vec::new();
        let mut fat = Vec::new();
        let mut carbs = Vec::new();
        for recipe in pool {
            if !seen.insert(recipe.id.as_str()) {
                continue;
            }
            calories.push(recipe.nutrition.calories);
            protein.push(recipe.nutrition.protein_g);
            fat.push(recipe.nutrition.fat_g);
            carbs.push(recipe.nutrition.carbs_g);
        }
        Self {
            calories: MacroWindow::from_values(calories, max_slots),
            protein: MacroWindow::from_values(protein, max_slots),
            fat: MacroWindow::from_values(fat, max_slots),
            carbs: MacroWindow::from_values(carbs, max_slots),
        }
    }
}

/// `max_daily_achievable(nutrient, slot_count)`: the most of a nutrient one
/// day of `slot_count` distinct recipes could supply. Precomputed once per
/// search for every tracked nutrient and every slot count in the schedule.
#[derive(Debug, Clone, Default)]
pub struct AchievableTable {
    table: BTreeMap<String, BTreeMap<usize, f64>>,
}

impl AchievableTable {
    /// Precompute for `nutrients` over the distinct recipes in `pool`.
    #[must_use]
    pub fn precompute<'a, N>(pool: &[Recipe], nutrients: N, slot_counts: &BTreeSet<usize>) -> Self
    where
        N: IntoIterator<Item = &'a str>,
    {
        let mut table = BTreeMap::new();
        for nutrient in nutrients {
            let mut seen = BTreeSet::new();
            let mut values: Vec<f64> = Vec::new();
            for recipe in pool {
                if !seen.insert(recipe.id.as_str()) {
                    continue;
                }
                values.push(recipe.nutrition.micronutrient(nutrient));
            }
            values.sort_by(f64::total_cmp);
            values.reverse();
            let mut per_count = BTreeMap::new();
            for &m in slot_counts {
                let take = m.min(values.len());
                per_count.insert(m, values[..take].iter().sum());
            }
            table.insert(nutrient.to_owned(), per_count);
        }
        Self { table }
    }

    /// Largest daily total achievable for `nutrient` with `slots` slots.
    #[must_use]
    pub fn max_daily(&self, nutrient: &str, slots: usize) -> f64 {
        self.table
            .get(nutrient)
            .and_then(|per_count| per_count.get(&slots))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Read-only view of the state the feasibility checks consult.
#[derive(Debug, Clone, Copy)]
pub struct FeasibilityContext<'a> {
    /// Tracker for the day being decided, if any
    pub daily: Option<&'a DailyTracker>,
    /// The weekly tracker
    pub weekly: &'a WeeklyTracker,
    /// Full schedule
    pub schedule: &'a [Vec<crate::models::profile::MealSlot>],
    /// User profile
    pub profile: &'a UserProfile,
    /// Resolved upper limits
    pub resolved_ul: &'a ResolvedUpperLimits,
    /// Precomputed macro windows
    pub bounds: &'a MacroBounds,
}

impl FeasibilityContext<'_> {
    /// Slots still open on `day` after tentatively filling `slot_index`.
    #[must_use]
    pub fn slots_remaining_after(&self, day: usize, slot_index: usize) -> usize {
        match self.daily {
            Some(tracker) => tracker
                .slots_total
                .saturating_sub(tracker.slots_assigned)
                .saturating_sub(1),
            None => self
                .schedule
                .get(day)
                .map_or(0, |slots| slots.len().saturating_sub(slot_index + 1)),
        }
    }
}

/// Calorie feasibility: the tentative day must stay under any hard ceiling,
/// and the remaining slots must be able to land the day inside the ±10%
/// calorie window.
#[must_use]
pub fn daily_calories_feasible(
    nutrition: &Nutrition,
    day: usize,
    slot_index: usize,
    ctx: &FeasibilityContext<'_>,
) -> bool {
    let target = f64::from(ctx.profile.daily_calories);
    let current = ctx.daily.map_or(0.0, |t| t.calories_consumed);
    let used = current + nutrition.calories;
    let remaining = target - used;

    if let Some(ceiling) = ctx.profile.max_daily_calories {
        if used > f64::from(ceiling) {
            return false;
        }
    }

    let tolerance = DAILY_TOLERANCE_FRACTION * target;
    let open_slots = ctx.slots_remaining_after(day, slot_index);
    if open_slots == 0 {
        return remaining.abs() <= tolerance;
    }
    let low = remaining - tolerance;
    let high = remaining + tolerance;
    let min_achievable = ctx.bounds.calories.min_sum(open_slots);
    let max_achievable = ctx.bounds.calories.max_sum(open_slots);
    !(min_achievable > high || max_achievable < low)
}

/// Macro feasibility: protein and carbs must stay reachable within ±10% of
/// their daily targets, and fat must stay reachable into its explicit range.
#[must_use]
pub fn daily_macros_feasible(
    nutrition: &Nutrition,
    day: usize,
    slot_index: usize,
    ctx: &FeasibilityContext<'_>,
) -> bool {
    let open_slots = ctx.slots_remaining_after(day, slot_index);
    let current = |f: fn(&DailyTracker) -> f64| ctx.daily.map_or(0.0, f);

    // Protein within ±10%.
    let protein_target = ctx.profile.daily_protein_g;
    let protein_remaining =
        protein_target - (current(|t| t.protein_consumed) + nutrition.protein_g);
    let protein_tolerance = DAILY_TOLERANCE_FRACTION * protein_target;
    if open_slots > 0 {
        let low = protein_remaining - protein_tolerance;
        let high = protein_remaining + protein_tolerance;
        if ctx.bounds.protein.min_sum(open_slots) > high
            || ctx.bounds.protein.max_sum(open_slots) < low
        {
            return false;
        }
    } else if protein_remaining.abs() > protein_tolerance {
        return false;
    }

    // Carbs within ±10%.
    let carbs_target = ctx.profile.daily_carbs_g;
    let carbs_remaining = carbs_target - (current(|t| t.carbs_consumed) + nutrition.carbs_g);
    let carbs_tolerance = DAILY_TOLERANCE_FRACTION * carbs_target;
    if open_slots > 0 {
        let low = carbs_remaining - carbs_tolerance;
        let high = carbs_remaining + carbs_tolerance;
        if ctx.bounds.carbs.min_sum(open_slots) > high
            || ctx.bounds.carbs.max_sum(open_slots) < low
        {
            return false;
        }
    } else if carbs_remaining.abs() > carbs_tolerance {
        return false;
    }

    // Fat reachable into [min, max].
    let (fat_min, fat_max) = ctx.profile.daily_fat_g;
    let fat_used = current(|t| t.fat_consumed) + nutrition.fat_g;
    if open_slots > 0 {
        let needed_min = fat_min - fat_used;
        let needed_max = fat_max - fat_used;
        if ctx.bounds.fat.min_sum(open_slots) > needed_max
            || ctx.bounds.fat.max_sum(open_slots) < needed_min
        {
            return false;
        }
    } else if fat_used < fat_min || fat_used > fat_max {
        return false;
    }

    true
}

/// Incremental upper-limit feasibility: adding the candidate must not push
/// any capped nutrient past its UL. Equality at the limit is allowed.
#[must_use]
pub fn incremental_ul_feasible(
    nutrition: &Nutrition,
    daily: Option<&DailyTracker>,
    resolved_ul: &ResolvedUpperLimits,
) -> bool {
    if resolved_ul.is_empty() {
        return true;
    }
    for (nutrient, limit) in resolved_ul.iter() {
        let consumed = daily.map_or(0.0, |t| {
            t.micronutrients_consumed
                .get(nutrient)
                .copied()
                .unwrap_or(0.0)
        });
        if consumed + nutrition.micronutrient(nutrient) > limit {
            return false;
        }
    }
    true
}

/// Cross-day RDI feasibility, evaluated at the start of each day after the
/// first, before any assignment on it: if some tracked nutrient's remaining
/// deficit exceeds what the remaining days could possibly supply, the plan
/// cannot complete from here.
#[must_use]
pub fn cross_day_rdi_feasible(
    day: usize,
    weekly: &WeeklyTracker,
    profile: &UserProfile,
    days: usize,
    schedule: &[Vec<crate::models::profile::MealSlot>],
    achievable: &AchievableTable,
) -> bool {
    if day == 0 || profile.micronutrient_targets.is_empty() {
        return true;
    }
    let days_left = weekly.days_remaining;
    if days_left == 0 {
        return true;
    }
    let Some(day_slots) = schedule.get(day) else {
        return true;
    };
    let slot_count = day_slots.len();

    for (nutrient, rdi) in &profile.micronutrient_targets {
        if *rdi <= 0.0 {
            continue;
        }
        let needed = rdi * days as f64;
        let consumed = weekly.weekly_totals.micronutrient(nutrient);
        let deficit = needed - consumed;
        if deficit <= 0.0 {
            continue;
        }
        if deficit > days_left as f64 * achievable.max_daily(nutrient, slot_count) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::nutrition::Nutrition;

    fn recipe(id: &str, calories: f64, protein: f64, fat: f64, carbs: f64) -> Recipe {
        Recipe::new(id, id, 15, Nutrition::new(calories, protein, fat, carbs))
    }

    fn pool() -> Vec<Recipe> {
        vec![
            recipe("a", 300.0, 20.0, 10.0, 30.0),
            recipe("b", 600.0, 35.0, 20.0, 70.0),
            recipe("c", 900.0, 50.0, 30.0, 110.0),
        ]
    }

    #[test]
    fn macro_window_sums_extremes() {
        let bounds = MacroBounds::precompute(&pool(), 3);
        assert!((bounds.calories.min_sum(1) - 300.0).abs() < 1e-9);
        assert!((bounds.calories.max_sum(1) - 900.0).abs() < 1e-9);
        assert!((bounds.calories.min_sum(2) - 900.0).abs() < 1e-9);
        assert!((bounds.calories.max_sum(2) - 1500.0).abs() < 1e-9);
        // Asking for more slots than recipes degrades to the full-pool sum.
        assert!((bounds.calories.max_sum(3) - 1800.0).abs() < 1e-9);
    }

    #[test]
    fn achievable_table_takes_largest_values() {
        let pool = vec![
            recipe("a", 300.0, 20.0, 10.0, 30.0),
            Recipe::new("d", "d", 10, Nutrition::new(400.0, 20.0, 10.0, 40.0))
                .with_primary_carb("rice", Nutrition::new(100.0, 1.0, 0.2, 24.0)),
        ];
        let mut richer = pool.clone();
        richer[0].nutrition = richer[0]
            .nutrition
            .clone()
            .with_micronutrient("iron_mg", 9.0);
        richer[1].nutrition = richer[1]
            .nutrition
            .clone()
            .with_micronutrient("iron_mg", 4.0);

        let counts: BTreeSet<usize> = [1usize, 2].into();
        let table = AchievableTable::precompute(&richer, ["iron_mg"], &counts);
        assert!((table.max_daily("iron_mg", 1) - 9.0).abs() < 1e-9);
        assert!((table.max_daily("iron_mg", 2) - 13.0).abs() < 1e-9);
        assert_eq!(table.max_daily("zinc_mg", 1), 0.0);
    }

    #[test]
    fn ul_feasibility_allows_equality() {
        let resolved = ResolvedUpperLimits::from_limits(
            [("iron_mg".to_owned(), 10.0)].into_iter().collect(),
        );
        let candidate = Nutrition::new(0.0, 0.0, 0.0, 0.0).with_micronutrient("iron_mg", 10.0);
        assert!(incremental_ul_feasible(&candidate, None, &resolved));

        let over = Nutrition::new(0.0, 0.0, 0.0, 0.0).with_micronutrient("iron_mg", 10.1);
        assert!(!incremental_ul_feasible(&over, None, &resolved));
    }
}
