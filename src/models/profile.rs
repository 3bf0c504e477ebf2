// ABOUTME: User profile: targets, fat range, schedule of meal slots, exclusions, pins
// ABOUTME: Validates schedule shape (1-7 days, 1-8 slots) before the solver accepts it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::constants::schedule::{
    MAX_PLANNING_DAYS, MAX_SLOTS_PER_DAY, MIN_PLANNING_DAYS, MIN_SLOTS_PER_DAY,
};
use crate::errors::{PlannerError, PlannerResult};

/// How much time the user has for the meal at a slot.
///
/// The level caps the cooking time of eligible recipes; the unhurried level
/// imposes no cap at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Busyness {
    /// Grab-and-go: at most 5 minutes of cooking
    Grab,
    /// Quick meal: at most 15 minutes
    Quick,
    /// Standard meal: at most 30 minutes
    Standard,
    /// No time pressure: any cooking time
    Unhurried,
}

impl Busyness {
    /// Numeric level 1-4 as users state it.
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Grab => 1,
            Self::Quick => 2,
            Self::Standard => 3,
            Self::Unhurried => 4,
        }
    }

    /// Build from a numeric level; `None` for levels outside 1-4.
    #[must_use]
    pub const fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Grab),
            2 => Some(Self::Quick),
            3 => Some(Self::Standard),
            4 => Some(Self::Unhurried),
            _ => None,
        }
    }

    /// Maximum cooking time in minutes; `None` means unbounded.
    #[must_use]
    pub const fn cooking_time_cap(self) -> Option<u16> {
        match self {
            Self::Grab => Some(5),
            Self::Quick => Some(15),
            Self::Standard => Some(30),
            Self::Unhurried => None,
        }
    }
}

/// One meal slot in a day's schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealSlot {
    /// Wall-clock time of the meal
    pub time: NaiveTime,
    /// Available time budget for preparing the meal
    pub busyness: Busyness,
    /// Label such as "breakfast" or "snack"; informational only
    pub meal_type: String,
}

impl MealSlot {
    /// Create a slot at the given time.
    #[must_use]
    pub fn new(time: NaiveTime, busyness: Busyness, meal_type: impl Into<String>) -> Self {
        Self {
            time,
            busyness,
            meal_type: meal_type.into(),
        }
    }
}

/// A day's workout window, used to derive pre/post-workout slot context.
///
/// When only one endpoint is given the other is assumed one hour away.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorkoutWindow {
    /// Workout start time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveTime>,
    /// Workout end time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveTime>,
}

impl WorkoutWindow {
    /// A window with both endpoints known.
    #[must_use]
    pub const fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// A window known only by its start.
    #[must_use]
    pub const fn starting_at(start: NaiveTime) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }
}

/// A user-mandated assignment of one recipe to one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedAssignment {
    /// Day index, zero-based
    pub day: usize,
    /// Slot index within the day, zero-based
    pub slot: usize,
    /// Recipe that must occupy the slot
    pub recipe_id: String,
}

/// The user profile the solver plans against. Immutable for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Daily calorie target in kcal
    pub daily_calories: u32,
    /// Daily protein target in grams
    pub daily_protein_g: f64,
    /// Inclusive daily fat range in grams: (min, max)
    pub daily_fat_g: (f64, f64),
    /// Daily carbohydrate target in grams
    pub daily_carbs_g: f64,
    /// Optional hard daily calorie ceiling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily_calories: Option<u32>,
    /// Ordered slots per day; outer index is the day
    pub schedule: Vec<Vec<MealSlot>>,
    /// Normalized ingredient names that must never appear (allergens + dislikes)
    #[serde(default)]
    pub excluded_ingredients: BTreeSet<String>,
    /// Normalized food names the user likes; tie-breaking only
    #[serde(default)]
    pub liked_foods: BTreeSet<String>,
    /// Demographic key for upper-limit lookup
    #[serde(default = "default_demographic")]
    pub demographic: String,
    /// Per-nutrient UL overrides; `None` values fall back to the reference
    #[serde(default)]
    pub upper_limit_overrides: BTreeMap<String, Option<f64>>,
    /// User-mandated assignments, immune to backtracking
    #[serde(default)]
    pub pinned_assignments: Vec<PinnedAssignment>,
    /// Tracked micronutrients: name to daily RDI. Nutrients absent here are
    /// not scored and not weekly-validated (ULs may still apply to them).
    #[serde(default)]
    pub micronutrient_targets: BTreeMap<String, f64>,
    /// Per-day workout windows, keyed by day index
    #[serde(default)]
    pub activity_schedule: BTreeMap<usize, WorkoutWindow>,
}

fn default_demographic() -> String {
    "adult_male".to_owned()
}

impl UserProfile {
    /// Create a profile with macro targets and an empty schedule.
    #[must_use]
    pub fn new(
        daily_calories: u32,
        daily_protein_g: f64,
        daily_fat_g: (f64, f64),
        daily_carbs_g: f64,
    ) -> Self {
        Self {
            daily_calories,
            daily_protein_g,
            daily_fat_g,
            daily_carbs_g,
            max_daily_calories: None,
            schedule: Vec::new(),
            excluded_ingredients: BTreeSet::new(),
            liked_foods: BTreeSet::new(),
            demographic: default_demographic(),
            upper_limit_overrides: BTreeMap::new(),
            pinned_assignments: Vec::new(),
            micronutrient_targets: BTreeMap::new(),
            activity_schedule: BTreeMap::new(),
        }
    }

    /// Set the schedule (builder style).
    #[must_use]
    pub fn with_schedule(mut self, schedule: Vec<Vec<MealSlot>>) -> Self {
        self.schedule = schedule;
        self
    }

    /// Set the hard calorie ceiling.
    #[must_use]
    pub const fn with_max_daily_calories(mut self, ceiling: u32) -> Self {
        self.max_daily_calories = Some(ceiling);
        self
    }

    /// Add a pinned assignment.
    #[must_use]
    pub fn with_pin(mut self, day: usize, slot: usize, recipe_id: impl Into<String>) -> Self {
        self.pinned_assignments.push(PinnedAssignment {
            day,
            slot,
            recipe_id: recipe_id.into(),
        });
        self
    }

    /// Add a tracked micronutrient target.
    #[must_use]
    pub fn with_micronutrient_target(mut self, name: impl Into<String>, daily_rdi: f64) -> Self {
        self.micronutrient_targets.insert(name.into(), daily_rdi);
        self
    }

    /// Midpoint of the daily fat range.
    #[must_use]
    pub fn daily_fat_midpoint(&self) -> f64 {
        (self.daily_fat_g.0 + self.daily_fat_g.1) / 2.0
    }

    /// The workout window for a day, if any.
    #[must_use]
    pub fn workout_window(&self, day: usize) -> Option<&WorkoutWindow> {
        self.activity_schedule.get(&day)
    }

    /// Validate the planning horizon and schedule shape.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::InvalidHorizon`] when `days` is outside 1-7 and
    /// [`PlannerError::InvalidSchedule`] when the schedule length does not
    /// match or any day has zero or more than eight slots.
    pub fn validate_schedule(&self, days: usize) -> PlannerResult<()> {
        if !(MIN_PLANNING_DAYS..=MAX_PLANNING_DAYS).contains(&days) {
            return Err(PlannerError::InvalidHorizon {
                got: days,
                min: MIN_PLANNING_DAYS,
                max: MAX_PLANNING_DAYS,
            });
        }
        if self.schedule.len() != days {
            return Err(PlannerError::InvalidSchedule(format!(
                "schedule has {} days, horizon is {days}",
                self.schedule.len()
            )));
        }
        for (day, slots) in self.schedule.iter().enumerate() {
            if slots.len() < MIN_SLOTS_PER_DAY {
                return Err(PlannerError::InvalidSchedule(format!(
                    "day {day} has no meal slots"
                )));
            }
            if slots.len() > MAX_SLOTS_PER_DAY {
                return Err(PlannerError::InvalidSchedule(format!(
                    "day {day} has {} slots, maximum is {MAX_SLOTS_PER_DAY}",
                    slots.len()
                )));
            }
        }
        Ok(())
    }
}
