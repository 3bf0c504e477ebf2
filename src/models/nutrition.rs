// ABOUTME: Nutrition totals: calories, macros, and a named micronutrient map
// ABOUTME: Deterministic accumulate/subtract used by daily and weekly trackers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Nutrition totals for one recipe, one day, or one week.
///
/// Micronutrients are keyed by normalized name (`"iron_mg"`, `"vitamin_c_mg"`)
/// in a `BTreeMap` so that every iteration order in the solver is
/// deterministic. Quantities use each nutrient's conventional unit; the solver
/// never converts units, it only compares against targets and limits expressed
/// in the same unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    /// Energy in kilocalories
    pub calories: f64,
    /// Protein in grams
    pub protein_g: f64,
    /// Fat in grams
    pub fat_g: f64,
    /// Carbohydrates in grams
    pub carbs_g: f64,
    /// Micronutrient name to quantity
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub micronutrients: BTreeMap<String, f64>,
}

impl Nutrition {
    /// Create macro-only nutrition totals.
    #[must_use]
    pub fn new(calories: f64, protein_g: f64, fat_g: f64, carbs_g: f64) -> Self {
        Self {
            calories,
            protein_g,
            fat_g,
            carbs_g,
            micronutrients: BTreeMap::new(),
        }
    }

    /// Add a micronutrient quantity (builder style).
    #[must_use]
    pub fn with_micronutrient(mut self, name: impl Into<String>, amount: f64) -> Self {
        self.micronutrients.insert(name.into(), amount);
        self
    }

    /// Quantity of a micronutrient, zero when absent.
    #[must_use]
    pub fn micronutrient(&self, name: &str) -> f64 {
        self.micronutrients.get(name).copied().unwrap_or(0.0)
    }

    /// Add another total into this one in place.
    pub fn accumulate(&mut self, other: &Self) {
        self.calories += other.calories;
        self.protein_g += other.protein_g;
        self.fat_g += other.fat_g;
        self.carbs_g += other.carbs_g;
        for (name, amount) in &other.micronutrients {
            *self.micronutrients.entry(name.clone()).or_insert(0.0) += amount;
        }
    }

    /// True when every field is exactly zero and no micronutrients are present.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.calories == 0.0
            && self.protein_g == 0.0
            && self.fat_g == 0.0
            && self.carbs_g == 0.0
            && self.micronutrients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_merges_micronutrients() {
        let mut total = Nutrition::new(500.0, 30.0, 10.0, 60.0)
            .with_micronutrient("iron_mg", 4.0)
            .with_micronutrient("fiber_g", 6.0);
        let other = Nutrition::new(300.0, 20.0, 8.0, 30.0).with_micronutrient("iron_mg", 2.0);
        total.accumulate(&other);

        assert!((total.calories - 800.0).abs() < f64::EPSILON);
        assert!((total.micronutrient("iron_mg") - 6.0).abs() < f64::EPSILON);
        assert!((total.micronutrient("fiber_g") - 6.0).abs() < f64::EPSILON);
        assert_eq!(total.micronutrient("zinc_mg"), 0.0);
    }

    #[test]
    fn default_is_zero() {
        assert!(Nutrition::default().is_zero());
        assert!(!Nutrition::new(1.0, 0.0, 0.0, 0.0).is_zero());
    }
}
