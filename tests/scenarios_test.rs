// ABOUTME: End-to-end planning scenarios with literal inputs and expected outputs
// ABOUTME: Exercises tie-breaking, rotation, pins, weekly deficits, and backtracking
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

mod common;

use common::{day, identical_pool, recipe, recipe_with, standard_profile};
use mealplanner::config::SolverConfig;
use mealplanner::models::nutrition::Nutrition;
use mealplanner::models::upper_limits::ResolvedUpperLimits;
use mealplanner::planner::report::{
    DeficitClass, FailureReport, PinnedConflictKind, Termination,
};
use mealplanner::planner::search::run_meal_plan_search;
use mealplanner::planner::state::Assignment;
use mealplanner::Recipe;

fn assigned(day: usize, slot: usize, id: &str) -> Assignment {
    Assignment {
        day,
        slot,
        recipe_id: id.to_owned(),
        variant_step: 0,
    }
}

// ============================================================================
// Single day, trivial pool: lexicographic tie-break decides everything
// ============================================================================

#[test]
fn single_day_identical_pool_picks_lexicographically_smallest() {
    let profile = standard_profile()
        .with_schedule(vec![day(&[("12:00", 2), ("12:00", 2)])]);
    let pool: Vec<Recipe> = ["apple-bake", "barley-stew", "corn-hash", "date-loaf"]
        .iter()
        .map(|id| recipe(id, 1000.0, 50.0, 32.0, 125.0, 10))
        .collect();

    let result = run_meal_plan_search(
        &profile,
        &pool,
        1,
        &ResolvedUpperLimits::none(),
        &SolverConfig::default(),
    )
    .unwrap();

    assert!(result.success);
    assert_eq!(result.termination, Termination::CompleteSingleDay);
    assert_eq!(
        result.plan,
        vec![assigned(0, 0, "apple-bake"), assigned(0, 1, "barley-stew")]
    );

    let tracker = &result.daily_trackers[&0];
    assert!((tracker.calories_consumed - 2000.0).abs() < 1e-9);
    assert!((tracker.protein_consumed - 100.0).abs() < 1e-9);
    assert!((tracker.fat_consumed - 64.0).abs() < 1e-9);
    assert!((tracker.carbs_consumed - 250.0).abs() < 1e-9);

    let weekly = result.weekly_tracker.unwrap();
    assert_eq!(weekly.days_completed, 1);
}

// ============================================================================
// Seven days: cross-day rule forces rotation, weekly totals sum completed days
// ============================================================================

#[test]
fn seven_days_rotate_without_same_day_or_cross_day_repeats() {
    let schedule: Vec<_> = (0..7).map(|_| day(&[("08:00", 2), ("19:00", 2)])).collect();
    let profile = standard_profile().with_schedule(schedule);
    let pool = identical_pool("meal", 14, 1000.0, 50.0, 32.0, 125.0, 10);

    let result = run_meal_plan_search(
        &profile,
        &pool,
        7,
        &ResolvedUpperLimits::none(),
        &SolverConfig::default(),
    )
    .unwrap();

    assert!(result.success);
    assert_eq!(result.termination, Termination::Complete);
    assert_eq!(result.plan.len(), 14);

    // Day one takes the two smallest ids; day two may not repeat them.
    assert_eq!(result.plan[0].recipe_id, "meal01");
    assert_eq!(result.plan[1].recipe_id, "meal02");
    assert_eq!(result.plan[2].recipe_id, "meal03");
    assert_eq!(result.plan[3].recipe_id, "meal04");
    // Day three is only restricted by day two, so the smallest ids return.
    assert_eq!(result.plan[4].recipe_id, "meal01");
    assert_eq!(result.plan[5].recipe_id, "meal02");

    // No same-day repeats anywhere.
    for pair in result.plan.chunks(2) {
        assert_ne!(pair[0].recipe_id, pair[1].recipe_id);
    }
    // No consecutive-day repeats anywhere.
    for window in result.plan.chunks(2).collect::<Vec<_>>().windows(2) {
        let today: Vec<&str> = window[1].iter().map(|a| a.recipe_id.as_str()).collect();
        for yesterday in window[0] {
            assert!(!today.contains(&yesterday.recipe_id.as_str()));
        }
    }

    let weekly = result.weekly_tracker.unwrap();
    assert_eq!(weekly.days_completed, 7);
    assert_eq!(weekly.days_remaining, 0);
    assert!((weekly.weekly_totals.calories - 14_000.0).abs() < 1e-9);
    assert!((weekly.weekly_totals.protein_g - 700.0).abs() < 1e-9);
}

// ============================================================================
// Pinned breakfast over the calorie ceiling: fatal before the search starts
// ============================================================================

#[test]
fn pinned_recipe_over_ceiling_fails_before_search() {
    let profile = standard_profile()
        .with_schedule(vec![day(&[("08:00", 3), ("13:00", 3), ("19:00", 3)])])
        .with_max_daily_calories(1800)
        .with_pin(0, 0, "festive-roast");
    let mut pool = identical_pool("filler", 3, 600.0, 33.0, 21.0, 83.0, 20);
    pool.push(recipe("festive-roast", 2000.0, 90.0, 70.0, 200.0, 25));

    let result = run_meal_plan_search(
        &profile,
        &pool,
        1,
        &ResolvedUpperLimits::none(),
        &SolverConfig::default(),
    )
    .unwrap();

    assert!(!result.success);
    assert!(result.plan.is_empty());
    match result.failure.unwrap() {
        FailureReport::PinnedConflict {
            pins,
            classification,
            violated,
            ..
        } => {
            assert_eq!(classification, PinnedConflictKind::DirectViolation);
            assert_eq!(pins.len(), 1);
            assert_eq!(pins[0].recipe_id, "festive-roast");
            assert!(violated.is_some());
        }
        other => panic!("expected a pinned conflict, got {other:?}"),
    }
}

// ============================================================================
// Weekly micronutrient deficit no pool combination can close: structural
// ============================================================================

#[test]
fn unreachable_weekly_requirement_is_reported_structural() {
    let schedule: Vec<_> = (0..3).map(|_| day(&[("09:00", 3), ("15:00", 3)])).collect();
    let profile = standard_profile()
        .with_schedule(schedule)
        .with_micronutrient_target("x_mg", 100.0);
    let pool: Vec<Recipe> = ["alpha", "bravo", "chili", "delta"]
        .iter()
        .map(|id| recipe_with(id, 1000.0, 50.0, 32.0, 125.0, 10, "x_mg", 30.0))
        .collect();

    let result = run_meal_plan_search(
        &profile,
        &pool,
        3,
        &ResolvedUpperLimits::none(),
        &SolverConfig::default(),
    )
    .unwrap();

    assert!(!result.success);
    match result.failure.unwrap() {
        FailureReport::WeeklyDeficit { deficient_nutrients } => {
            assert_eq!(deficient_nutrients.len(), 1);
            let deficit = &deficient_nutrients[0];
            assert_eq!(deficit.nutrient, "x_mg");
            // Two slots a day, 30 mg per recipe, three days: 180 mg is the
            // most this pool can ever supply against a 300 mg requirement.
            assert!((deficit.achieved - 180.0).abs() < 1e-9);
            assert!((deficit.required - 300.0).abs() < 1e-9);
            assert_eq!(deficit.classification, DeficitClass::Structural);
        }
        other => panic!("expected a weekly deficit, got {other:?}"),
    }
}

// ============================================================================
// Cross-day repetition: blocked for non-workout slots, freed by pinning
// ============================================================================

#[test]
fn cross_day_repeat_is_blocked_then_freed_by_pinning() {
    let schedule = vec![day(&[("12:00", 3)]), day(&[("12:00", 3)])];
    let mut profile = mealplanner::UserProfile::new(1000, 50.0, (20.0, 40.0), 125.0)
        .with_schedule(schedule.clone());
    let pool = vec![
        recipe("rainbow-bowl", 1000.0, 50.0, 32.0, 125.0, 15),
        recipe("sesame-skillet", 1000.0, 50.0, 32.0, 125.0, 15),
    ];

    let result = run_meal_plan_search(
        &profile,
        &pool,
        2,
        &ResolvedUpperLimits::none(),
        &SolverConfig::default(),
    )
    .unwrap();
    assert!(result.success);
    assert_eq!(
        result.plan,
        vec![
            assigned(0, 0, "rainbow-bowl"),
            assigned(1, 0, "sesame-skillet"),
        ]
    );

    // Pinning the other recipe onto day one frees the first for day two.
    profile = profile.with_pin(0, 0, "sesame-skillet");
    let pinned_result = run_meal_plan_search(
        &profile,
        &pool,
        2,
        &ResolvedUpperLimits::none(),
        &SolverConfig::default(),
    )
    .unwrap();
    assert!(pinned_result.success);
    assert_eq!(
        pinned_result.plan,
        vec![
            assigned(0, 0, "sesame-skillet"),
            assigned(1, 0, "rainbow-bowl"),
        ]
    );
}

// ============================================================================
// A seductive oversized first pick forces backtracking to a valid combination
// ============================================================================

fn overweight_first_pick_inputs() -> (mealplanner::UserProfile, Vec<Recipe>) {
    let profile = standard_profile()
        .with_schedule(vec![day(&[("08:00", 4), ("13:00", 4), ("19:00", 4)])]);
    let pool = vec![
        Recipe::new(
            "hearty-casserole",
            "Hearty Casserole",
            30,
            Nutrition::new(1500.0, 80.0, 48.0, 150.0).with_micronutrient("fiber_g", 20.0),
        ),
        recipe("grilled-platter", 1080.0, 45.0, 30.0, 150.0, 25),
        recipe("noodle-bowl", 500.0, 30.0, 22.0, 60.0, 25),
        recipe("garden-frittata", 420.0, 25.0, 18.0, 40.0, 25),
        recipe("yogurt-cup", 100.0, 5.0, 3.0, 15.0, 5),
        recipe("fruit-snack", 100.0, 5.0, 3.0, 15.0, 5),
    ];
    (profile, pool)
}

#[test]
fn oversized_first_pick_is_backtracked_to_a_valid_day() {
    let (profile, pool) = overweight_first_pick_inputs();
    let config = SolverConfig {
        instrumentation: true,
        ..SolverConfig::default()
    };

    let result =
        run_meal_plan_search(&profile, &pool, 1, &ResolvedUpperLimits::none(), &config).unwrap();

    assert!(result.success);
    // The high-satiety casserole wins the first slot greedily, every
    // completion of that branch fails, and the search lands on the exact
    // 2000 kcal combination.
    assert_eq!(
        result.plan,
        vec![
            assigned(0, 0, "noodle-bowl"),
            assigned(0, 1, "grilled-platter"),
            assigned(0, 2, "garden-frittata"),
        ]
    );
    let tracker = &result.daily_trackers[&0];
    assert!((tracker.calories_consumed - 2000.0).abs() < 1e-9);
    assert!((tracker.protein_consumed - 100.0).abs() < 1e-9);
    assert!((tracker.fat_consumed - 70.0).abs() < 1e-9);
    assert!((tracker.carbs_consumed - 250.0).abs() < 1e-9);

    let stats = result.stats.unwrap();
    assert!(stats.total_backtracks >= 1, "the dead branch must backtrack");
}

#[test]
fn search_is_deterministic_and_instrumentation_invariant() {
    mealplanner::logging::init_for_tests();
    let (profile, pool) = overweight_first_pick_inputs();
    let plain = SolverConfig::default();
    let instrumented = SolverConfig {
        instrumentation: true,
        ..SolverConfig::default()
    };

    let first =
        run_meal_plan_search(&profile, &pool, 1, &ResolvedUpperLimits::none(), &plain).unwrap();
    let second =
        run_meal_plan_search(&profile, &pool, 1, &ResolvedUpperLimits::none(), &plain).unwrap();
    let observed = run_meal_plan_search(
        &profile,
        &pool,
        1,
        &ResolvedUpperLimits::none(),
        &instrumented,
    )
    .unwrap();

    assert_eq!(first.plan, second.plan);
    assert_eq!(first.plan, observed.plan);
    assert!(first.stats.is_none());
    assert!(observed.stats.is_some());
}
