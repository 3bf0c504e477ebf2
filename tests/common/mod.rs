// ABOUTME: Shared fixture builders for integration tests
// ABOUTME: Compact constructors for slots, schedules, recipes, and profiles
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors
#![allow(dead_code)]

use chrono::NaiveTime;
use mealplanner::models::nutrition::Nutrition;
use mealplanner::models::profile::{Busyness, MealSlot, UserProfile};
use mealplanner::models::recipe::Recipe;

/// Parse "HH:MM".
pub fn t(hhmm: &str) -> NaiveTime {
    NaiveTime::parse_from_str(hhmm, "%H:%M").expect("well-formed test time")
}

/// A meal slot at `hhmm` with busyness `level` (1-4).
pub fn slot(hhmm: &str, level: u8) -> MealSlot {
    MealSlot::new(
        t(hhmm),
        Busyness::from_level(level).expect("valid busyness level"),
        "meal",
    )
}

/// A day of slots from `(time, busyness)` pairs.
pub fn day(slots: &[(&str, u8)]) -> Vec<MealSlot> {
    slots.iter().map(|(time, level)| slot(time, *level)).collect()
}

/// A macro-only recipe.
pub fn recipe(
    id: &str,
    calories: f64,
    protein: f64,
    fat: f64,
    carbs: f64,
    minutes: u16,
) -> Recipe {
    Recipe::new(id, id, minutes, Nutrition::new(calories, protein, fat, carbs))
}

/// A recipe with one micronutrient on top of its macros.
pub fn recipe_with(
    id: &str,
    calories: f64,
    protein: f64,
    fat: f64,
    carbs: f64,
    minutes: u16,
    nutrient: &str,
    amount: f64,
) -> Recipe {
    Recipe::new(
        id,
        id,
        minutes,
        Nutrition::new(calories, protein, fat, carbs).with_micronutrient(nutrient, amount),
    )
}

/// The standard test profile: 2000 kcal, 100 g protein, 50-80 g fat,
/// 250 g carbs, no schedule.
pub fn standard_profile() -> UserProfile {
    UserProfile::new(2000, 100.0, (50.0, 80.0), 250.0)
}

/// A pool of `count` identical recipes with ids `prefix01..prefixNN`.
pub fn identical_pool(
    prefix: &str,
    count: usize,
    calories: f64,
    protein: f64,
    fat: f64,
    carbs: f64,
    minutes: u16,
) -> Vec<Recipe> {
    (1..=count)
        .map(|n| {
            recipe(
                &format!("{prefix}{n:02}"),
                calories,
                protein,
                fat,
                carbs,
                minutes,
            )
        })
        .collect()
}
