use anyhow::Result;
use colored::Colorize;
use pixelday_game::constants::{REPAIR_STREAK_THRESHOLD, SCORE_MAX, SCORE_MIN};
use pixelday_game::{
    CuratedGenerator, DayPlan, DayRng, DaySession, DaySummary, GameState, GeneratedScene,
    HistoryEntry, SceneCatalog, SceneGenerator, SceneRequest, TimeOfDay,
};
use serde::Serialize;
use std::sync::Arc;

use super::policy::GameplayStrategy;

/// Declarative plan for playing one day.
#[derive(Debug, Clone)]
pub struct PlaythroughPlan {
    pub strategy: GameplayStrategy,
    /// Fixed day plan; drawn from the seed when unset.
    pub day_plan: Option<DayPlan>,
    pub expectations: Vec<PlaythroughExpectation>,
}

impl PlaythroughPlan {
    #[must_use]
    pub fn new(strategy: GameplayStrategy) -> Self {
        Self {
            strategy,
            day_plan: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_day_plan(mut self, plan: DayPlan) -> Self {
        self.day_plan = Some(plan);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<PlaythroughExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a playthrough completes.
type PlaythroughExpectationFn =
    Arc<dyn Fn(&PlaythroughSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct PlaythroughExpectation(PlaythroughExpectationFn);

impl std::fmt::Debug for PlaythroughExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaythroughExpectation").finish()
    }
}

impl PlaythroughExpectation {
    pub fn evaluate(&self, summary: &PlaythroughSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for PlaythroughExpectation
where
    F: Fn(&PlaythroughSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// One resolved scene as seen by the automated player.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRecord {
    pub index: usize,
    pub time_of_day: TimeOfDay,
    pub scene_id: String,
    pub policy_name: &'static str,
    pub choice_id: String,
    pub rationale: Option<String>,
    pub points: i32,
    pub must_offer_repair: bool,
    pub repair_offered: bool,
    pub repaired: Option<i32>,
    pub score_after: i32,
    pub streak_after: u32,
}

/// Complete record of a playthrough.
#[derive(Debug, Clone)]
pub struct PlaythroughSummary {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub decisions: Vec<DecisionRecord>,
    pub final_state: GameState,
    pub day: DaySummary,
    /// Broken engine invariants observed while playing.
    pub violations: Vec<String>,
    pub completed: bool,
    pub generator_draws: u64,
}

/// Headless deterministic player for the core game logic.
#[derive(Clone)]
pub struct GameTester {
    verbose: bool,
    catalog: Arc<SceneCatalog>,
}

impl GameTester {
    pub const fn new(catalog: Arc<SceneCatalog>, verbose: bool) -> Self {
        Self { verbose, catalog }
    }

    /// Tester backed by the built-in scene catalog.
    pub fn try_new(verbose: bool) -> Result<Self> {
        let catalog = SceneCatalog::builtin()?;
        Ok(Self::new(Arc::new(catalog), verbose))
    }

    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    pub async fn run_plan(&self, plan: &PlaythroughPlan, seed: u64) -> PlaythroughSummary {
        let mut rng = DayRng::from_user_seed(seed);
        let generator = CuratedGenerator::new((*self.catalog).clone(), rng.content_seed());
        let mut session = match plan.day_plan.clone() {
            Some(day_plan) => DaySession::new(day_plan),
            None => DaySession::with_rng(rng.planner()),
        };
        let mut policy = plan.strategy.create_policy(rng.policy_seed());
        let mut violations = Vec::new();
        let mut decisions = Vec::new();

        if self.verbose {
            log_initial_state(seed, plan, session.state());
        }
        check_state(session.state(), &mut violations);

        while !session.is_complete() {
            let Some(pending) = session.begin_request() else {
                violations.push(format!(
                    "index {}: no request could be opened",
                    session.state().current_index
                ));
                break;
            };
            check_request(session.state(), &pending.request, &mut violations);

            let result = generator.generate(&pending.request).await;
            let scene = match session.resolve(&pending, result) {
                Ok(scene) => scene.clone(),
                Err(err) => {
                    violations.push(format!("index {}: generation failed: {err}", pending.index));
                    break;
                }
            };
            check_scene(&pending.request, &scene, &mut violations);

            let decision = policy.pick_choice(session.state(), &scene);
            let before = session.state().clone();
            let entry = match session.choose(&decision.choice_id) {
                Ok(entry) => entry.clone(),
                Err(err) => {
                    violations.push(format!(
                        "index {}: choice `{}` rejected: {err}",
                        pending.index, decision.choice_id
                    ));
                    break;
                }
            };
            check_choice(&before, session.state(), &entry, &mut violations);

            let offered = entry
                .outcome
                .repair_offer()
                .map(|action| action.points_recovered);
            let mut repaired = None;
            if offered.is_some() && policy.take_repair(session.state(), &entry) {
                let chosen = session.state().clone();
                repaired = session.repair();
                check_repair(&chosen, session.state(), offered, repaired, &mut violations);
            }

            let record = DecisionRecord {
                index: pending.index,
                time_of_day: scene.time_of_day,
                scene_id: scene.id.clone(),
                policy_name: policy.name(),
                choice_id: decision.choice_id,
                rationale: decision.rationale,
                points: entry.outcome.points,
                must_offer_repair: pending.request.must_offer_repair,
                repair_offered: offered.is_some(),
                repaired,
                score_after: session.state().score,
                streak_after: session.state().negative_streak,
            };
            if self.verbose {
                log_decision(&record);
            }
            decisions.push(record);

            session.next();
            check_state(session.state(), &mut violations);
        }

        let completed = session.is_complete();
        let day = session.summary();
        PlaythroughSummary {
            seed,
            strategy: plan.strategy,
            decisions,
            final_state: session.into_state(),
            day,
            violations,
            completed,
            generator_draws: generator.draws(),
        }
    }
}

fn check_state(state: &GameState, violations: &mut Vec<String>) {
    let index = state.current_index;
    if !(SCORE_MIN..=SCORE_MAX).contains(&state.score) {
        violations.push(format!("index {index}: score {} out of bounds", state.score));
    }
    if index > state.total_scenes() {
        violations.push(format!(
            "index {index} exceeds total {}",
            state.total_scenes()
        ));
    }
    if state.history.len() != state.total_scenes() {
        violations.push(format!(
            "history has {} slots for {} scenes",
            state.history.len(),
            state.total_scenes()
        ));
    }
    if state.history.resolved_count() != index.min(state.total_scenes()) {
        violations.push(format!(
            "index {index}: {} resolved history entries",
            state.history.resolved_count()
        ));
    }
}

fn check_request(state: &GameState, request: &SceneRequest, violations: &mut Vec<String>) {
    let index = state.current_index;
    if request.time_of_day != state.current_time_of_day() {
        violations.push(format!(
            "index {index}: request slot {} differs from plan slot {}",
            request.time_of_day,
            state.current_time_of_day()
        ));
    }
    if request.previous.is_some() != (index > 0) {
        violations.push(format!("index {index}: previous summary presence is wrong"));
    }
    if request.must_offer_repair != (state.negative_streak >= REPAIR_STREAK_THRESHOLD) {
        violations.push(format!(
            "index {index}: must_offer_repair {} with streak {}",
            request.must_offer_repair, state.negative_streak
        ));
    }
    if request.total_score != state.score || request.negative_streak != state.negative_streak {
        violations.push(format!("index {index}: request does not mirror the state"));
    }
}

fn check_scene(request: &SceneRequest, scene: &GeneratedScene, violations: &mut Vec<String>) {
    if scene.time_of_day != request.time_of_day {
        violations.push(format!(
            "scene {}: stored slot {} differs from requested {}",
            scene.id, scene.time_of_day, request.time_of_day
        ));
    }
    if request.must_offer_repair {
        let bare = scene
            .consequences
            .values()
            .any(|outcome| outcome.points < 0 && outcome.repair_offer().is_none());
        if bare {
            violations.push(format!(
                "scene {}: negative outcome without repair after a streak",
                scene.id
            ));
        }
    }
}

fn check_choice(
    before: &GameState,
    after: &GameState,
    entry: &HistoryEntry,
    violations: &mut Vec<String>,
) {
    let points = entry.outcome.points;
    let expected_score = (before.score + points).clamp(SCORE_MIN, SCORE_MAX);
    let expected_streak = if points < 0 {
        before.negative_streak + 1
    } else {
        0
    };
    if after.score != expected_score {
        violations.push(format!(
            "index {}: score {} after choice, expected {expected_score}",
            after.current_index, after.score
        ));
    }
    if after.negative_streak != expected_streak {
        violations.push(format!(
            "index {}: streak {} after choice, expected {expected_streak}",
            after.current_index, after.negative_streak
        ));
    }
}

fn check_repair(
    chosen: &GameState,
    after: &GameState,
    offered: Option<i32>,
    repaired: Option<i32>,
    violations: &mut Vec<String>,
) {
    let index = after.current_index;
    match repaired {
        Some(recovered) => {
            if Some(recovered) != offered {
                violations.push(format!(
                    "index {index}: recovered {recovered}, offer was {offered:?}"
                ));
            }
            let expected = (chosen.score + recovered).clamp(SCORE_MIN, SCORE_MAX);
            if after.score != expected || after.negative_streak != 0 {
                violations.push(format!(
                    "index {index}: repair left score {} streak {}",
                    after.score, after.negative_streak
                ));
            }
        }
        None => {
            if after != chosen {
                violations.push(format!("index {index}: refused repair changed the state"));
            }
        }
    }
}

fn log_initial_state(seed: u64, plan: &PlaythroughPlan, state: &GameState) {
    let slots = state
        .plan
        .schedule()
        .iter()
        .map(|slot| format!("{}×{}", slot.time_of_day, slot.count))
        .collect::<Vec<_>>()
        .join(" ");
    println!(
        "🎮 Starting day | seed:{seed} policy:{} type:{}",
        plan.strategy.label(),
        state.plan.day_type()
    );
    println!("📅 Plan | {slots} ({} scenes)", state.total_scenes());
}

fn log_decision(record: &DecisionRecord) {
    let repair = match record.repaired {
        Some(points) => format!(" repaired +{points}").green().to_string(),
        None if record.repair_offered => " repair declined".yellow().to_string(),
        None => String::new(),
    };
    println!(
        "  {} [{}] {} -> {} ({:+}){repair} | score {} streak {}",
        record.index + 1,
        record.time_of_day,
        record.scene_id,
        record.choice_id,
        record.points,
        record.score_after,
        record.streak_after
    );
}
