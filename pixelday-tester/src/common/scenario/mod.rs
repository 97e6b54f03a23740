use anyhow::{Result, ensure};
use pixelday_game::constants::{SCORE_MAX, SCORE_MIN, SLOT_SCENES_MAX, SLOT_SCENES_MIN};
use pixelday_game::{CountingRng, DayPlan, DayType, build_day_plan};

use crate::logic::game_tester::{PlaythroughExpectation, PlaythroughPlan, PlaythroughSummary};
use crate::logic::policy::GameplayStrategy;

const PLAN_SWEEP: usize = 1000;

// Logic test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: PlaythroughPlan,
    /// Whether `--strategy` may replace the scenario's player policy.
    pub strategy_locked: bool,
}

impl TestScenario {
    /// Scenario whose expectations start with the clean-day check.
    #[must_use]
    pub fn playthrough(name: impl Into<String>, plan: PlaythroughPlan) -> Self {
        let mut expectations = vec![PlaythroughExpectation::from(clean_day_expectation)];
        expectations.extend(plan.expectations);
        Self {
            name: name.into(),
            plan: PlaythroughPlan {
                expectations,
                ..plan
            },
            strategy_locked: true,
        }
    }

    #[must_use]
    pub const fn unlocked(mut self) -> Self {
        self.strategy_locked = false;
        self
    }

    /// Apply a CLI strategy override where the scenario allows one.
    #[must_use]
    pub fn with_strategy_override(mut self, strategy: Option<GameplayStrategy>) -> Self {
        if let Some(strategy) = strategy
            && !self.strategy_locked
        {
            self.plan.strategy = strategy;
        }
        self
    }
}

fn clean_day_expectation(summary: &PlaythroughSummary) -> Result<()> {
    ensure!(summary.completed, "day should reach completion");
    ensure!(
        summary.violations.is_empty(),
        "invariants broken: {}",
        summary.violations.join("; ")
    );
    ensure!(
        summary.final_state.current_index == summary.final_state.total_scenes(),
        "stopped at index {} of {}",
        summary.final_state.current_index,
        summary.final_state.total_scenes()
    );
    ensure!(
        summary.day.scenes_played == summary.final_state.total_scenes(),
        "played {} of {} scenes",
        summary.day.scenes_played,
        summary.final_state.total_scenes()
    );
    Ok(())
}

fn check_plan_bounds(plan: &DayPlan) -> Result<()> {
    for slot in plan.schedule() {
        ensure!(
            (SLOT_SCENES_MIN..=SLOT_SCENES_MAX).contains(&slot.count),
            "slot {} has {} scenes",
            slot.time_of_day,
            slot.count
        );
    }
    let min_total = usize::from(SLOT_SCENES_MIN) * 3;
    let max_total = usize::from(SLOT_SCENES_MAX) * 3;
    ensure!(
        (min_total..=max_total).contains(&plan.total_scenes()),
        "day has {} scenes",
        plan.total_scenes()
    );
    Ok(())
}

fn day_bounds_expectation(summary: &PlaythroughSummary) -> Result<()> {
    check_plan_bounds(&summary.final_state.plan)?;
    let mut rng = CountingRng::seeded(summary.seed);
    let mut weekends = 0usize;
    for _ in 0..PLAN_SWEEP {
        let plan = build_day_plan(&mut rng);
        check_plan_bounds(&plan)?;
        if plan.day_type() == DayType::Weekend {
            weekends += 1;
        }
    }
    ensure!(
        weekends > 0 && weekends < PLAN_SWEEP,
        "{weekends} of {PLAN_SWEEP} days were weekends"
    );
    Ok(())
}

fn score_bounds_expectation(summary: &PlaythroughSummary) -> Result<()> {
    for decision in &summary.decisions {
        ensure!(
            (SCORE_MIN..=SCORE_MAX).contains(&decision.score_after),
            "score {} after scene {}",
            decision.score_after,
            decision.scene_id
        );
    }
    ensure!(
        summary.day.score < 0,
        "worst-choice day ended at {}",
        summary.day.score
    );
    ensure!(
        summary.decisions.iter().any(|d| d.must_offer_repair),
        "streak never reached the repair threshold"
    );
    Ok(())
}

fn streak_repair_expectation(summary: &PlaythroughSummary) -> Result<()> {
    ensure!(summary.day.repairs_used > 0, "no repair was ever taken");
    let mut streak = 0u32;
    for decision in &summary.decisions {
        if decision.must_offer_repair && decision.points < 0 {
            ensure!(
                decision.repair_offered,
                "scene {} ignored the repair request",
                decision.scene_id
            );
        }
        streak = if decision.repaired.is_some() || decision.points >= 0 {
            0
        } else {
            streak + 1
        };
        ensure!(
            decision.streak_after == streak,
            "streak {} after scene {}, expected {streak}",
            decision.streak_after,
            decision.scene_id
        );
    }
    Ok(())
}

fn long_day_expectation(summary: &PlaythroughSummary) -> Result<()> {
    ensure!(
        summary.decisions.len() == 9,
        "expected 9 scenes, played {}",
        summary.decisions.len()
    );
    Ok(())
}

fn strategy_scenario(
    name: &str,
    strategy: GameplayStrategy,
    expectation: Option<fn(&PlaythroughSummary) -> Result<()>>,
) -> TestScenario {
    let mut plan = PlaythroughPlan::new(strategy);
    if let Some(expectation) = expectation {
        plan = plan.with_expectation(expectation);
    }
    TestScenario::playthrough(name, plan)
}

fn full_day_scenario(strategy: GameplayStrategy) -> TestScenario {
    strategy_scenario(&format!("Full Day - {}", strategy.label()), strategy, None)
}

fn long_day_scenario() -> Option<TestScenario> {
    let plan = DayPlan::from_counts(DayType::Weekend, [3, 3, 3]).ok()?;
    Some(
        TestScenario::playthrough(
            "Long Weekend Day",
            PlaythroughPlan::new(GameplayStrategy::Random)
                .with_day_plan(plan)
                .with_expectation(long_day_expectation),
        )
        .unlocked(),
    )
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    match name.to_lowercase().as_str() {
        "smoke" => Some(strategy_scenario("Smoke Test", GameplayStrategy::Kind, None).unlocked()),
        "day-bounds" | "bounds" => Some(
            strategy_scenario(
                "Day Plan Bounds",
                GameplayStrategy::Random,
                Some(day_bounds_expectation),
            )
            .unlocked(),
        ),
        "score-bounds" | "score" => Some(strategy_scenario(
            "Score Bounds",
            GameplayStrategy::Mischief,
            Some(score_bounds_expectation),
        )),
        "streak-repair" | "repair" => Some(strategy_scenario(
            "Streak and Repair",
            GameplayStrategy::Repairer,
            Some(streak_repair_expectation),
        )),
        "full-day-kind" => Some(full_day_scenario(GameplayStrategy::Kind)),
        "full-day-mischief" => Some(full_day_scenario(GameplayStrategy::Mischief)),
        "full-day-repairer" => Some(full_day_scenario(GameplayStrategy::Repairer)),
        "full-day-random" => Some(full_day_scenario(GameplayStrategy::Random)),
        "long-day" | "long" => long_day_scenario(),
        _ => None,
    }
}

/// Keys a group name stands for; `full-day` covers every policy.
pub fn expand_group(name: &str) -> Option<Vec<String>> {
    match name.to_lowercase().as_str() {
        "full-day" | "full" => Some(
            GameplayStrategy::ALL
                .iter()
                .map(|strategy| format!("full-day-{}", strategy.key()))
                .collect(),
        ),
        "all" => Some(all_scenario_keys()),
        _ => None,
    }
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Smoke Test"),
        ("day-bounds", "Day Plan Bounds - slot and total scene counts"),
        ("score-bounds", "Score Bounds - worst choices, score stays clamped"),
        ("streak-repair", "Streak and Repair - streak bookkeeping, repair reset"),
        ("full-day-kind", "Full Day - Kind Strategy"),
        ("full-day-mischief", "Full Day - Mischief Strategy"),
        ("full-day-repairer", "Full Day - Repairer Strategy"),
        ("full-day-random", "Full Day - Random Strategy"),
        ("long-day", "Long Weekend Day - nine scenes"),
    ]
}

/// Every scenario key, in listing order.
pub fn all_scenario_keys() -> Vec<String> {
    list_scenarios()
        .into_iter()
        .map(|(key, _)| key.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for (key, _) in list_scenarios() {
            assert!(get_scenario(key).is_some(), "missing scenario {key}");
        }
        assert!(get_scenario("SMOKE").is_some());
        assert!(get_scenario("nope").is_none());
    }

    #[test]
    fn full_day_group_covers_every_policy() {
        let keys = expand_group("full-day").unwrap();
        assert_eq!(keys.len(), GameplayStrategy::ALL.len());
        for key in &keys {
            assert!(get_scenario(key).is_some(), "missing scenario {key}");
        }
        assert!(expand_group("smoke").is_none());
    }

    #[test]
    fn scenarios_carry_their_expectations() {
        let repair = get_scenario("streak-repair").unwrap();
        assert_eq!(repair.plan.strategy, GameplayStrategy::Repairer);
        assert_eq!(repair.plan.expectations.len(), 2);
        assert_eq!(
            get_scenario("full-day-random").unwrap().plan.expectations.len(),
            1
        );
        assert!(get_scenario("long").unwrap().plan.day_plan.is_some());
    }

    #[test]
    fn strategy_override_respects_locks() {
        let smoke = get_scenario("smoke")
            .unwrap()
            .with_strategy_override(Some(GameplayStrategy::Mischief));
        assert_eq!(smoke.plan.strategy, GameplayStrategy::Mischief);

        let repair = get_scenario("streak-repair")
            .unwrap()
            .with_strategy_override(Some(GameplayStrategy::Kind));
        assert_eq!(repair.plan.strategy, GameplayStrategy::Repairer);
    }

    #[test]
    fn plan_bounds_reject_oversized_slots() {
        let plan = DayPlan::from_counts(DayType::SchoolDay, [4, 1, 1]).unwrap();
        assert!(check_plan_bounds(&plan).is_err());
        let plan = DayPlan::from_counts(DayType::SchoolDay, [3, 1, 2]).unwrap();
        assert!(check_plan_bounds(&plan).is_ok());
    }
}
