// ABOUTME: Derived per-slot attributes: activity context, satiety requirement, cooking-time cap
// ABOUTME: Pure functions of the schedule and workout windows; computed per decision point
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::constants::context_windows::{
    DEFAULT_WORKOUT_MINUTES, HIGH_SATIETY_GAP_HOURS, OVERNIGHT_FAST_HOURS, POST_WORKOUT_MINUTES,
    PRE_WORKOUT_MINUTES,
};
use crate::models::profile::{MealSlot, WorkoutWindow};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Activity flags for one slot. A slot may hold several at once, except that
/// `sedentary` is the absence of both workout flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityContext {
    /// A workout starts within two hours after this slot
    pub pre_workout: bool,
    /// A workout ended within three hours before this slot
    pub post_workout: bool,
    /// Neither pre- nor post-workout
    pub sedentary: bool,
    /// More than four hours to the next meal, or a 12h+ overnight gap follows
    pub overnight_fast_ahead: bool,
}

impl ActivityContext {
    /// True when the slot is adjacent to a workout on either side.
    #[must_use]
    pub const fn is_workout(self) -> bool {
        self.pre_workout || self.post_workout
    }
}

/// How filling the meal at this slot needs to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Satiety {
    /// A long gap or the overnight fast follows
    High,
    /// Normal gap to the next meal
    Moderate,
}

/// Everything the engine derives about one slot before judging recipes for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotContext {
    /// Activity flags
    pub activity: ActivityContext,
    /// Satiety requirement
    pub satiety: Satiety,
    /// Cooking-time cap from the slot's busyness; `None` is unbounded
    pub cooking_time_cap: Option<u16>,
    /// Hours until the next meal; infinite when none follows
    pub hours_until_next_meal: f64,
}

fn minutes_of(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// Hours from `slot` to the next meal: the next slot of the same day, or the
/// first slot of the following day across midnight, or infinity when the slot
/// is the last of the horizon.
#[must_use]
pub fn hours_until_next_meal(
    slot: &MealSlot,
    slot_index: usize,
    day_slots: &[MealSlot],
    next_day_first: Option<&MealSlot>,
) -> f64 {
    let slot_min = minutes_of(slot.time);
    if slot_index + 1 < day_slots.len() {
        let mut delta = minutes_of(day_slots[slot_index + 1].time) - slot_min;
        if delta <= 0 {
            delta += MINUTES_PER_DAY;
        }
        return delta as f64 / 60.0;
    }
    if let Some(next) = next_day_first {
        let delta = (MINUTES_PER_DAY - slot_min) + minutes_of(next.time);
        return delta as f64 / 60.0;
    }
    f64::INFINITY
}

fn resolved_workout(window: Option<&WorkoutWindow>) -> Option<(i64, i64)> {
    let window = window?;
    match (window.start, window.end) {
        (Some(start), Some(end)) => Some((minutes_of(start), minutes_of(end))),
        (Some(start), None) => {
            let s = minutes_of(start);
            Some((s, s + DEFAULT_WORKOUT_MINUTES))
        }
        (None, Some(end)) => {
            let e = minutes_of(end);
            Some((e - DEFAULT_WORKOUT_MINUTES, e))
        }
        (None, None) => None,
    }
}

/// Derive the activity context for one slot.
#[must_use]
pub fn activity_context(
    slot: &MealSlot,
    slot_index: usize,
    day_slots: &[MealSlot],
    next_day_first: Option<&MealSlot>,
    workout: Option<&WorkoutWindow>,
) -> ActivityContext {
    let mut context = ActivityContext::default();
    let slot_min = minutes_of(slot.time);

    if let Some((start, end)) = resolved_workout(workout) {
        let delta_start = (start - slot_min).rem_euclid(MINUTES_PER_DAY);
        if delta_start > 0 && delta_start <= PRE_WORKOUT_MINUTES {
            context.pre_workout = true;
        }
        let delta_end = (slot_min - end).rem_euclid(MINUTES_PER_DAY);
        if delta_end < POST_WORKOUT_MINUTES {
            context.post_workout = true;
        }
    }
    context.sedentary = !context.pre_workout && !context.post_workout;

    let gap = hours_until_next_meal(slot, slot_index, day_slots, next_day_first);
    let is_last = slot_index + 1 >= day_slots.len();
    if gap > HIGH_SATIETY_GAP_HOURS || (is_last && gap >= OVERNIGHT_FAST_HOURS) {
        context.overnight_fast_ahead = true;
    }

    context
}

/// Derive the satiety requirement from the meal gap.
#[must_use]
pub fn satiety_requirement(hours_until_next: f64, is_last_slot: bool) -> Satiety {
    if hours_until_next > HIGH_SATIETY_GAP_HOURS
        || (is_last_slot && hours_until_next >= OVERNIGHT_FAST_HOURS)
    {
        Satiety::High
    } else {
        Satiety::Moderate
    }
}

/// Derive the full context for the slot at `(day_slots[slot_index])`.
#[must_use]
pub fn derive(
    slot_index: usize,
    day_slots: &[MealSlot],
    next_day_first: Option<&MealSlot>,
    workout: Option<&WorkoutWindow>,
) -> SlotContext {
    let slot = &day_slots[slot_index];
    let activity = activity_context(slot, slot_index, day_slots, next_day_first, workout);
    let gap = hours_until_next_meal(slot, slot_index, day_slots, next_day_first);
    let is_last = slot_index + 1 >= day_slots.len();
    SlotContext {
        activity,
        satiety: satiety_requirement(gap, is_last),
        cooking_time_cap: slot.busyness.cooking_time_cap(),
        hours_until_next_meal: gap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::Busyness;

    fn t(hhmm: &str) -> NaiveTime {
        NaiveTime::parse_from_str(hhmm, "%H:%M").unwrap()
    }

    fn slot(hhmm: &str) -> MealSlot {
        MealSlot::new(t(hhmm), Busyness::Standard, "meal")
    }

    #[test]
    fn pre_and_post_workout_windows() {
        let day = vec![slot("08:00"), slot("12:00"), slot("18:00")];
        let window = WorkoutWindow::new(t("09:30"), t("10:30"));

        let breakfast = activity_context(&day[0], 0, &day, None, Some(&window));
        assert!(breakfast.pre_workout);
        assert!(!breakfast.post_workout);
        assert!(!breakfast.sedentary);

        let lunch = activity_context(&day[1], 1, &day, None, Some(&window));
        assert!(lunch.post_workout);
        assert!(!lunch.pre_workout);

        let dinner = activity_context(&day[2], 2, &day, None, Some(&window));
        assert!(dinner.sedentary);
    }

    #[test]
    fn short_workout_flags_both_neighbors() {
        // Workout 13:00-13:30: the 12:00 slot is pre-workout, 14:00 is post.
        let day = vec![slot("12:00"), slot("14:00")];
        let window = WorkoutWindow::new(t("13:00"), t("13:30"));
        let noon = activity_context(&day[0], 0, &day, None, Some(&window));
        assert!(noon.pre_workout);
        let two = activity_context(&day[1], 1, &day, None, Some(&window));
        assert!(two.post_workout);
    }

    #[test]
    fn overnight_gap_marks_last_slot() {
        let day = vec![slot("08:00"), slot("19:00")];
        let next_first = slot("08:00");
        let ctx = activity_context(&day[1], 1, &day, Some(&next_first), None);
        // 19:00 -> 08:00 is 13 hours: both the >4h rule and the overnight rule hit.
        assert!(ctx.overnight_fast_ahead);
        assert!(ctx.sedentary);

        let gap = hours_until_next_meal(&day[1], 1, &day, Some(&next_first));
        assert!((gap - 13.0).abs() < 1e-9);
        assert_eq!(satiety_requirement(gap, true), Satiety::High);
    }

    #[test]
    fn tight_schedule_is_moderate_satiety() {
        let day = vec![slot("12:00"), slot("14:00")];
        let gap = hours_until_next_meal(&day[0], 0, &day, None);
        assert!((gap - 2.0).abs() < 1e-9);
        assert_eq!(satiety_requirement(gap, false), Satiety::Moderate);
    }

    #[test]
    fn no_next_meal_means_infinite_gap() {
        let day = vec![slot("20:00")];
        assert!(hours_until_next_meal(&day[0], 0, &day, None).is_infinite());
    }

    #[test]
    fn workout_with_only_a_start_assumes_an_hour() {
        let day = vec![slot("11:30"), slot("16:00")];
        let window = WorkoutWindow::starting_at(t("13:00"));
        // Assumed end 14:00: a 16:00 slot is within the 3h post window.
        let late = activity_context(&day[1], 1, &day, None, Some(&window));
        assert!(late.post_workout);
    }
}
