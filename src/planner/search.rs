// ABOUTME: Search orchestrator: decision order, candidate lifecycle, validation, backtracking
// ABOUTME: Greedy selection with chronological backtracking; bit-for-bit deterministic
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

//! The search.
//!
//! Decision points are visited in a fixed total order: days first, then slots
//! in time order. At each non-pinned point the orchestrator generates the
//! candidate set once, scores and orders it once, and commits the candidate
//! at the cursor. Validation failures and dead ends unwind to the most recent
//! non-pinned decision with an untried candidate, advance its cursor, and
//! resume. Candidate lists strictly after the backtrack target are discarded
//! (their generation context changed); the target's own list was generated
//! from state the unwind does not touch, so it persists and only its cursor
//! moves. Unwinds that cross a day boundary also decommit every completed day
//! they touch, keeping the weekly tracker's partial-day invariant intact.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::config::SolverConfig;
use crate::constants::schedule::MAX_SLOTS_PER_DAY;
use crate::errors::{PlannerError, PlannerResult};
use crate::models::profile::{PinnedAssignment, UserProfile};
use crate::models::recipe::Recipe;
use crate::models::upper_limits::ResolvedUpperLimits;
use crate::planner::candidates::{self, GenerationContext};
use crate::planner::carb_scaling;
use crate::planner::feasibility::{cross_day_rdi_feasible, AchievableTable, MacroBounds};
use crate::planner::ordering::{self, RankedCandidate};
use crate::planner::report::{
    plan_deviation, sodium_advisory, validate_day, DailyViolation, DeficitClass, FailureReport,
    MealPlanResult, NutrientDeficit, PinnedConflictKind, PlanSnapshot, RemainingBudget,
    SodiumAdvisory, Termination,
};
use crate::planner::scoring::{composite_score, ScoringContext};
use crate::planner::slot_context;
use crate::planner::state::{
    per_meal_target, validate_pinned_assignments, Assignment, DailyTracker, PlannerState,
};
use crate::planner::stats::StatsCollector;

/// One decision point's scored, ordered candidates and its cursor. The
/// cursor indexes the currently-committed candidate; it advances only when a
/// backtrack retargets this decision.
#[derive(Debug, Clone)]
struct CandidateList {
    ranked: Vec<RankedCandidate>,
    cursor: usize,
}

/// Run the full meal-plan search.
///
/// Pure with respect to its inputs: the same profile, pool, horizon, limits,
/// and configuration always produce the same result, with or without
/// instrumentation.
///
/// # Errors
///
/// Returns a [`PlannerError`] only for malformed inputs (bad horizon or
/// schedule shape, duplicate recipe ids, pins referencing unknown slots or
/// recipes, invalid scaling parameters). Infeasibility is not an error: it
/// comes back as a failed [`MealPlanResult`] with a structured report.
pub fn run_meal_plan_search(
    profile: &UserProfile,
    pool: &[Recipe],
    days: usize,
    resolved_ul: &ResolvedUpperLimits,
    config: &SolverConfig,
) -> PlannerResult<MealPlanResult> {
    profile.validate_schedule(days)?;
    config.validate()?;
    carb_scaling::validate_contributions(pool, &config.carb_scaling)?;

    let mut recipe_index_by_id: BTreeMap<&str, usize> = BTreeMap::new();
    for (index, recipe) in pool.iter().enumerate() {
        if recipe_index_by_id.insert(recipe.id.as_str(), index).is_some() {
            return Err(PlannerError::DuplicateRecipeId(recipe.id.clone()));
        }
    }

    let mut pinned_by_slot: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for pin in &profile.pinned_assignments {
        if pin.day >= days || pin.slot >= profile.schedule[pin.day].len() {
            return Err(PlannerError::PinnedSlotOutOfRange {
                day: pin.day,
                slot: pin.slot,
            });
        }
        let Some(&recipe_index) = recipe_index_by_id.get(pin.recipe_id.as_str()) else {
            return Err(PlannerError::UnknownPinnedRecipe {
                day: pin.day,
                slot: pin.slot,
                recipe_id: pin.recipe_id.clone(),
            });
        };
        pinned_by_slot.insert((pin.day, pin.slot), recipe_index);
    }

    let collector = StatsCollector::new(config.instrumentation);

    // Pinned pre-validation is fatal before the search starts; no recovery.
    let resolved_pins: Vec<(&PinnedAssignment, &Recipe)> = profile
        .pinned_assignments
        .iter()
        .map(|pin| (pin, &pool[recipe_index_by_id[pin.recipe_id.as_str()]]))
        .collect();
    if let Err(violation) = validate_pinned_assignments(profile, &resolved_pins, days) {
        debug!(
            day = violation.day,
            slot = violation.slot,
            recipe = %violation.recipe_id,
            "pinned assignment fails pre-validation"
        );
        let mut search = Search::new(
            profile,
            pool,
            days,
            resolved_ul,
            config,
            pinned_by_slot,
            collector,
        );
        let report = FailureReport::PinnedConflict {
            pins: vec![PinnedAssignment {
                day: violation.day,
                slot: violation.slot,
                recipe_id: violation.recipe_id.clone(),
            }],
            violated: Some(violation.constraint),
            classification: PinnedConflictKind::DirectViolation,
            remaining_budget: None,
        };
        return Ok(search.failure(Termination::Exhausted, report));
    }

    let mut search = Search::new(
        profile,
        pool,
        days,
        resolved_ul,
        config,
        pinned_by_slot,
        collector,
    );
    search.seed_pins();
    Ok(search.run())
}

struct Search<'a> {
    profile: &'a UserProfile,
    pool: &'a [Recipe],
    days: usize,
    resolved_ul: &'a ResolvedUpperLimits,
    config: &'a SolverConfig,
    bounds: MacroBounds,
    achievable: AchievableTable,
    order: Vec<(usize, usize)>,
    pinned_by_slot: BTreeMap<(usize, usize), usize>,
    pinned_slots: BTreeSet<(usize, usize)>,
    state: PlannerState,
    cache: BTreeMap<usize, CandidateList>,
    position: usize,
    attempts: u64,
    backtracks: u64,
    best_assignments: Vec<Assignment>,
    best_trackers: BTreeMap<usize, DailyTracker>,
    best_deviation: f64,
    advisory: Option<SodiumAdvisory>,
    collector: StatsCollector,
}

impl<'a> Search<'a> {
    fn new(
        profile: &'a UserProfile,
        pool: &'a [Recipe],
        days: usize,
        resolved_ul: &'a ResolvedUpperLimits,
        config: &'a SolverConfig,
        pinned_by_slot: BTreeMap<(usize, usize), usize>,
        collector: StatsCollector,
    ) -> Self {
        let bounds = MacroBounds::precompute(pool, MAX_SLOTS_PER_DAY);
        let slot_counts: BTreeSet<usize> =
            profile.schedule.iter().map(Vec::len).collect();
        let achievable = AchievableTable::precompute(
            pool,
            profile.micronutrient_targets.keys().map(String::as_str),
            &slot_counts,
        );
        let order: Vec<(usize, usize)> = (0..days)
            .flat_map(|day| (0..profile.schedule[day].len()).map(move |slot| (day, slot)))
            .collect();
        let pinned_slots: BTreeSet<(usize, usize)> = pinned_by_slot.keys().copied().collect();
        let state = PlannerState::new(days, &profile.micronutrient_targets);

        Self {
            profile,
            pool,
            days,
            resolved_ul,
            config,
            bounds,
            achievable,
            order,
            pinned_by_slot,
            pinned_slots,
            state,
            cache: BTreeMap::new(),
            position: 0,
            attempts: 0,
            backtracks: 0,
            best_assignments: Vec::new(),
            best_trackers: BTreeMap::new(),
            best_deviation: f64::INFINITY,
            advisory: None,
            collector,
        }
    }

    /// Pinned assignments occupy their slots from initialization.
    fn seed_pins(&mut self) {
        let pins: Vec<((usize, usize), usize)> = self
            .pinned_by_slot
            .iter()
            .map(|(&slot, &recipe_index)| (slot, recipe_index))
            .collect();
        for ((day, slot), recipe_index) in pins {
            let recipe = &self.pool[recipe_index];
            let is_workout = self.is_workout_slot(day, slot);
            let slots_total = self.profile.schedule[day].len();
            self.state.apply(
                Assignment {
                    day,
                    slot,
                    recipe_id: recipe.id.clone(),
                    variant_step: 0,
                },
                recipe.nutrition.clone(),
                is_workout,
                slots_total,
                true,
            );
        }
        self.update_best();
    }

    fn is_workout_slot(&self, day: usize, slot: usize) -> bool {
        let day_slots = &self.profile.schedule[day];
        let next_first = if day + 1 < self.days {
            self.profile.schedule[day + 1].first()
        } else {
            None
        };
        slot_context::activity_context(
            &day_slots[slot],
            slot,
            day_slots,
            next_first,
            self.profile.workout_window(day),
        )
        .is_workout()
    }

    fn generation_context(&self) -> GenerationContext<'_> {
        GenerationContext {
            pool: self.pool,
            profile: self.profile,
            days: self.days,
            resolved_ul: self.resolved_ul,
            bounds: &self.bounds,
            scaling: &self.config.carb_scaling,
            pinned_slots: &self.pinned_slots,
        }
    }

    fn run(mut self) -> MealPlanResult {
        debug!(
            days = self.days,
            pool = self.pool.len(),
            decisions = self.order.len(),
            "meal plan search starting"
        );

        loop {
            if self.budget_spent() {
                return self.budget_exhausted();
            }
            if self.position >= self.order.len() {
                // Every decision point is behind us; the last day's
                // validation decides the outcome in after_advance, so this
                // is only reachable defensively.
                let report = self.daily_infeasibility_report(None, None);
                return self.failure(Termination::Exhausted, report);
            }

            let (day, slot) = self.order[self.position];
            if slot == 0 {
                self.collector.record_day_entered(day);
            }

            // Cross-day RDI check at the entry of every day after the first.
            if day > 0
                && slot == 0
                && !cross_day_rdi_feasible(
                    day,
                    &self.state.weekly,
                    self.profile,
                    self.days,
                    &self.profile.schedule,
                    &self.achievable,
                )
            {
                debug!(day, "cross-day nutrient deficit is irrecoverable");
                if self.backtrack() {
                    continue;
                }
                let report = self.weekly_deficit_report();
                return self.failure(Termination::Exhausted, report);
            }

            if self.pinned_slots.contains(&(day, slot)) {
                self.position += 1;
                match self.after_advance() {
                    Some(result) => return result,
                    None => continue,
                }
            }

            if !self.cache.contains_key(&self.position) {
                match self.generate_and_rank(day, slot) {
                    Some(list) => {
                        self.cache.insert(self.position, list);
                    }
                    None => {
                        if self.backtrack() {
                            continue;
                        }
                        let report = self.dead_slot_report(day, slot);
                        return self.failure(Termination::Exhausted, report);
                    }
                }
            }

            let chosen = self.cache.get(&self.position).and_then(|list| {
                list.ranked
                    .get(list.cursor)
                    .map(|ranked| ranked.candidate.clone())
            });
            let Some(candidate) = chosen else {
                // Cursor exhausted at this decision point.
                if self.backtrack() {
                    continue;
                }
                let report = self.daily_infeasibility_report(Some(day), None);
                return self.failure(Termination::Exhausted, report);
            };

            trace!(
                day,
                slot,
                recipe = %candidate.recipe_id,
                variant = candidate.variant_step,
                "committing candidate"
            );
            let is_workout = self.is_workout_slot(day, slot);
            let slots_total = self.profile.schedule[day].len();
            self.state.apply(
                Assignment {
                    day,
                    slot,
                    recipe_id: candidate.recipe_id.clone(),
                    variant_step: candidate.variant_step,
                },
                candidate.nutrition,
                is_workout,
                slots_total,
                false,
            );
            self.attempts += 1;
            self.collector.record_attempt(day);
            self.update_best();

            self.position += 1;
            if let Some(result) = self.after_advance() {
                return result;
            }
        }
    }

    /// Generate, score, and order candidates for a decision point. `None`
    /// signals backtrack (empty set or a doomed later slot).
    fn generate_and_rank(&mut self, day: usize, slot: usize) -> Option<CandidateList> {
        let gctx = self.generation_context();
        let outcome = candidates::generate(day, slot, &self.state.daily, &self.state.weekly, &gctx);
        if outcome.trigger_backtrack {
            debug!(day, slot, "no viable candidates, signalling backtrack");
            return None;
        }

        let day_slots = &self.profile.schedule[day];
        let next_first = if day + 1 < self.days {
            self.profile.schedule[day + 1].first()
        } else {
            None
        };
        let slot_ctx = slot_context::derive(
            slot,
            day_slots,
            next_first,
            self.profile.workout_window(day),
        );
        let daily = self.state.daily_tracker(day);
        let per_meal = per_meal_target(daily, day_slots.len(), self.profile, &slot_ctx);
        let sctx = ScoringContext {
            daily,
            weekly: &self.state.weekly,
            profile: self.profile,
        };
        let gaps = ordering::nutrients_still_needed(&sctx);

        let mut ranked: Vec<RankedCandidate> = outcome
            .candidates
            .into_iter()
            .map(|candidate| {
                let recipe = &self.pool[candidate.recipe_index];
                let score = composite_score(
                    recipe,
                    &candidate.nutrition,
                    &day_slots[slot],
                    &slot_ctx,
                    &per_meal,
                    &sctx,
                );
                ordering::rank(candidate, score, recipe, &gaps, &self.profile.liked_foods)
            })
            .collect();
        ordering::order_candidates(&mut ranked);

        Some(CandidateList { ranked, cursor: 0 })
    }

    /// Handle day completion and weekly validation after the position moved
    /// past a decision point. Returns the final result when the search ends.
    fn after_advance(&mut self) -> Option<MealPlanResult> {
        let (day, slot) = self.order[self.position - 1];
        if slot + 1 != self.profile.schedule[day].len() {
            return None;
        }

        // A day survives committed across backtracks when none of its
        // assignments were unwound (it can only hold pins then); it must not
        // be committed twice, but the final day still proceeds to weekly
        // validation below.
        if !self.state.day_committed(day) {
            let complete = self
                .state
                .daily_tracker(day)
                .is_some_and(DailyTracker::is_complete);
            if !complete {
                return None;
            }

            let violation = self
                .state
                .daily_tracker(day)
                .and_then(|tracker| validate_day(tracker, self.profile, self.resolved_ul));
            if let Some(violation) = violation {
                debug!(day, ?violation, "daily validation failed");
                if self.backtrack() {
                    return None;
                }
                let report = self.daily_infeasibility_report(Some(day), Some(violation));
                return Some(self.failure(Termination::Exhausted, report));
            }

            self.state
                .commit_day(day, &self.profile.micronutrient_targets);
            self.collector.record_day_completed(day);
            debug!(day, "day validated and committed");
        }

        if day + 1 != self.days {
            return None;
        }

        if let Some(advisory) = sodium_advisory(&self.state.weekly, self.profile, self.days) {
            self.advisory = Some(advisory);
        }

        // Single-day runs skip weekly validation entirely.
        if self.days == 1 {
            return Some(self.success(Termination::CompleteSingleDay));
        }
        if self.weekly_shortfalls().is_empty() {
            return Some(self.success(Termination::Complete));
        }
        debug!("weekly micronutrient validation failed");
        if self.backtrack() {
            return None;
        }
        let report = self.weekly_deficit_report();
        Some(self.failure(Termination::Exhausted, report))
    }

    /// Tracked nutrients whose weekly totals are short of `RDI x days`.
    fn weekly_shortfalls(&self) -> Vec<(&'a str, f64, f64)> {
        let mut shortfalls = Vec::new();
        for (nutrient, rdi) in &self.profile.micronutrient_targets {
            if *rdi <= 0.0 {
                continue;
            }
            let required = rdi * self.days as f64;
            let consumed = self.state.weekly.weekly_totals.micronutrient(nutrient);
            if consumed < required {
                shortfalls.push((nutrient.as_str(), consumed, required));
            }
        }
        shortfalls
    }

    fn budget_spent(&self) -> bool {
        if self.attempts >= self.config.attempt_limit {
            return true;
        }
        self.config
            .backtrack_limit
            .is_some_and(|limit| self.backtracks >= limit)
    }

    /// Unwind to the most recent non-pinned decision with an untried
    /// candidate. Returns false when no such target exists (terminal).
    fn backtrack(&mut self) -> bool {
        let Some(target) = self.find_backtrack_target() else {
            return false;
        };
        let depth = self.position - target;
        self.backtracks += 1;
        self.collector.record_backtrack(depth);

        let cut = self.order[target];
        debug!(
            from_day = self.order[self.position.min(self.order.len() - 1)].0,
            to_day = cut.0,
            to_slot = cut.1,
            depth,
            "backtracking"
        );
        self.state
            .unwind(cut, &self.profile.micronutrient_targets);
        // Lists after the target were generated from state the unwind just
        // tore down; the target's own list is still valid.
        self.cache.retain(|&position, _| position <= target);
        if let Some(list) = self.cache.get_mut(&target) {
            list.cursor += 1;
        }
        self.position = target;
        true
    }

    fn find_backtrack_target(&self) -> Option<usize> {
        (0..self.position).rev().find(|j| {
            if self.pinned_slots.contains(&self.order[*j]) {
                return false;
            }
            self.cache
                .get(j)
                .is_some_and(|list| list.cursor + 1 < list.ranked.len())
        })
    }

    fn update_best(&mut self) {
        let length = self.state.commitments.len();
        if length > self.best_assignments.len() {
            self.snapshot_best();
        } else if length == self.best_assignments.len() && length > 0 {
            let deviation = plan_deviation(&self.state.daily, self.profile);
            if deviation < self.best_deviation {
                self.snapshot_best();
            }
        }
    }

    fn snapshot_best(&mut self) {
        self.best_assignments = self.state.assignments();
        self.best_trackers = self.state.daily.clone();
        self.best_deviation = plan_deviation(&self.state.daily, self.profile);
    }

    fn best_snapshot(&self) -> PlanSnapshot {
        PlanSnapshot {
            assignments: self.best_assignments.clone(),
            daily_trackers: self.best_trackers.clone(),
        }
    }

    fn success(&mut self, termination: Termination) -> MealPlanResult {
        debug!(attempts = self.attempts, backtracks = self.backtracks, "plan complete");
        MealPlanResult {
            success: true,
            termination,
            plan: self.state.assignments(),
            daily_trackers: self.state.daily.clone(),
            weekly_tracker: Some(self.state.weekly.clone()),
            warning: self.advisory.take(),
            failure: None,
            stats: self.take_stats(),
        }
    }

    fn failure(&mut self, termination: Termination, report: FailureReport) -> MealPlanResult {
        debug!(
            attempts = self.attempts,
            backtracks = self.backtracks,
            "search failed"
        );
        MealPlanResult {
            success: false,
            termination,
            plan: self.best_assignments.clone(),
            daily_trackers: self.best_trackers.clone(),
            weekly_tracker: None,
            warning: self.advisory.take(),
            failure: Some(report),
            stats: self.take_stats(),
        }
    }

    fn take_stats(&mut self) -> Option<crate::planner::stats::SearchStats> {
        std::mem::replace(&mut self.collector, StatsCollector::new(false)).finish()
    }

    fn budget_exhausted(&mut self) -> MealPlanResult {
        let best_plan = self.best_snapshot();
        let best_plan_violations = self
            .best_trackers
            .values()
            .filter(|tracker| tracker.is_complete())
            .filter_map(|tracker| validate_day(tracker, self.profile, self.resolved_ul))
            .collect();
        let report = FailureReport::BudgetExhausted {
            attempts: self.attempts,
            backtracks: self.backtracks,
            search_exhaustive: false,
            best_plan,
            best_plan_violations,
        };
        self.failure(Termination::BudgetReached, report)
    }

    /// Terminal report for a slot whose candidate set ran dry: either the
    /// pool is insufficient, or pins on the day induced the dead end.
    fn dead_slot_report(&self, day: usize, slot: usize) -> FailureReport {
        if let Some(report) = self.pinned_downstream_report(day) {
            return report;
        }
        let gctx = self.generation_context();
        let mut unfillable_slots = vec![candidates::eligibility_diagnostics(
            day,
            slot,
            &self.state.daily,
            &gctx,
        )];
        for later in (slot + 1)..self.profile.schedule[day].len() {
            let diagnostics =
                candidates::eligibility_diagnostics(day, later, &self.state.daily, &gctx);
            if diagnostics.eligible_count == 0 {
                unfillable_slots.push(diagnostics);
            }
        }
        FailureReport::PoolInsufficiency { unfillable_slots }
    }

    fn daily_infeasibility_report(
        &self,
        day: Option<usize>,
        violation: Option<DailyViolation>,
    ) -> FailureReport {
        if let Some(day) = day {
            if let Some(report) = self.pinned_downstream_report(day) {
                return report;
            }
        }
        FailureReport::DailyInfeasibility {
            day,
            violation,
            closest_plan: self.best_snapshot(),
        }
    }

    /// When a terminal dead end lands on a day carrying pins, the pins are
    /// implicated: report the conflict with the budget left after them.
    fn pinned_downstream_report(&self, day: usize) -> Option<FailureReport> {
        let pins: Vec<PinnedAssignment> = self
            .profile
            .pinned_assignments
            .iter()
            .filter(|pin| pin.day == day)
            .cloned()
            .collect();
        if pins.is_empty() {
            return None;
        }

        let mut pinned_calories = 0.0;
        let mut pinned_protein = 0.0;
        let mut pinned_fat = 0.0;
        let mut pinned_carbs = 0.0;
        for commitment in self
            .state
            .commitments
            .iter()
            .filter(|c| c.pinned && c.assignment.day == day)
        {
            pinned_calories += commitment.nutrition.calories;
            pinned_protein += commitment.nutrition.protein_g;
            pinned_fat += commitment.nutrition.fat_g;
            pinned_carbs += commitment.nutrition.carbs_g;
        }
        let remaining_budget = RemainingBudget {
            day,
            calories: f64::from(self.profile.daily_calories) - pinned_calories,
            protein_g: self.profile.daily_protein_g - pinned_protein,
            fat_g: (
                self.profile.daily_fat_g.0 - pinned_fat,
                self.profile.daily_fat_g.1 - pinned_fat,
            ),
            carbs_g: self.profile.daily_carbs_g - pinned_carbs,
        };

        Some(FailureReport::PinnedConflict {
            pins,
            violated: None,
            classification: PinnedConflictKind::Downstream,
            remaining_budget: Some(remaining_budget),
        })
    }

    fn weekly_deficit_report(&self) -> FailureReport {
        let mut deficient_nutrients = Vec::new();
        for (nutrient, rdi) in &self.profile.micronutrient_targets {
            if *rdi <= 0.0 {
                continue;
            }
            let required = rdi * self.days as f64;
            let consumed = self.state.weekly.weekly_totals.micronutrient(nutrient);
            let achieved: f64 = (0..self.days)
                .map(|day| {
                    self.achievable
                        .max_daily(nutrient, self.profile.schedule[day].len())
                })
                .sum();
            if consumed >= required {
                continue;
            }
            let classification = if achieved < required {
                DeficitClass::Structural
            } else {
                DeficitClass::Marginal
            };
            deficient_nutrients.push(NutrientDeficit {
                nutrient: nutrient.clone(),
                consumed,
                achieved,
                required,
                classification,
            });
        }
        FailureReport::WeeklyDeficit {
            deficient_nutrients,
        }
    }
}
