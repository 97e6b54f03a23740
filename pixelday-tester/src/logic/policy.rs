use std::fmt;

use pixelday_game::{GameState, GeneratedScene, HistoryEntry};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub choice_id: String,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn new(choice_id: impl Into<String>, rationale: Option<String>) -> Self {
        Self {
            choice_id: choice_id.into(),
            rationale,
        }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Select an option for the current scene.
    fn pick_choice(&mut self, state: &GameState, scene: &GeneratedScene) -> PolicyDecision;

    /// Whether to take the repair offered after `entry` was recorded.
    fn take_repair(&mut self, state: &GameState, entry: &HistoryEntry) -> bool;
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameplayStrategy {
    Kind,
    Mischief,
    Repairer,
    Random,
}

impl GameplayStrategy {
    pub const ALL: [Self; 4] = [Self::Kind, Self::Mischief, Self::Repairer, Self::Random];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            GameplayStrategy::Kind => "Kind",
            GameplayStrategy::Mischief => "Mischief",
            GameplayStrategy::Repairer => "Repairer",
            GameplayStrategy::Random => "Random",
        }
    }

    /// Lowercase CLI key.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            GameplayStrategy::Kind => "kind",
            GameplayStrategy::Mischief => "mischief",
            GameplayStrategy::Repairer => "repairer",
            GameplayStrategy::Random => "random",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.key().eq_ignore_ascii_case(key.trim()))
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            GameplayStrategy::Kind => Box::new(KindPolicy),
            GameplayStrategy::Mischief => Box::new(MischiefPolicy),
            GameplayStrategy::Repairer => Box::new(RepairerPolicy),
            GameplayStrategy::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct KindPolicy;
struct MischiefPolicy;
struct RepairerPolicy;

struct RandomPolicy {
    rng: ChaCha20Rng,
    repair_chance: f64,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            repair_chance: 0.5,
        }
    }
}

impl PlayerPolicy for KindPolicy {
    fn name(&self) -> &'static str {
        "Kind"
    }

    fn pick_choice(&mut self, _state: &GameState, scene: &GeneratedScene) -> PolicyDecision {
        let (id, points) = best_by(scene, |points| points);
        PolicyDecision::new(id, Some(format!("points {points}")))
    }

    fn take_repair(&mut self, _state: &GameState, _entry: &HistoryEntry) -> bool {
        true
    }
}

impl PlayerPolicy for MischiefPolicy {
    fn name(&self) -> &'static str {
        "Mischief"
    }

    fn pick_choice(&mut self, _state: &GameState, scene: &GeneratedScene) -> PolicyDecision {
        let (id, points) = best_by(scene, |points| -points);
        PolicyDecision::new(id, Some(format!("points {points}")))
    }

    fn take_repair(&mut self, _state: &GameState, _entry: &HistoryEntry) -> bool {
        false
    }
}

impl PlayerPolicy for RepairerPolicy {
    fn name(&self) -> &'static str {
        "Repairer"
    }

    fn pick_choice(&mut self, state: &GameState, scene: &GeneratedScene) -> PolicyDecision {
        let (id, points) = best_by(scene, |points| -points);
        PolicyDecision::new(
            id,
            Some(format!("points {points} streak {}", state.negative_streak)),
        )
    }

    fn take_repair(&mut self, _state: &GameState, _entry: &HistoryEntry) -> bool {
        true
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn pick_choice(&mut self, _state: &GameState, scene: &GeneratedScene) -> PolicyDecision {
        let idx = self.rng.gen_range(0..scene.options.len());
        PolicyDecision::new(scene.options[idx].id.clone(), Some(format!("roll {idx}")))
    }

    fn take_repair(&mut self, _state: &GameState, _entry: &HistoryEntry) -> bool {
        self.rng.gen_bool(self.repair_chance)
    }
}

/// Option id maximizing `score(points)`, with the points it carries.
fn best_by(scene: &GeneratedScene, score: impl Fn(i32) -> i32) -> (String, i32) {
    scene
        .choices()
        .map(|(option, outcome)| (option.id.clone(), outcome.map_or(0, |o| o.points)))
        .max_by_key(|(_, points)| score(*points))
        .unwrap_or_else(|| (scene.options[0].id.clone(), 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelday_game::{DayPlan, DayType, TimeOfDay, ingest_scene, mock_scene};

    fn state_with_scene() -> (GameState, GeneratedScene) {
        let plan = DayPlan::from_counts(DayType::SchoolDay, [1, 1, 1]).unwrap();
        let scene = ingest_scene(mock_scene(TimeOfDay::Morning), TimeOfDay::Morning).unwrap();
        let state = GameState::new(plan).with_scene(scene.clone()).unwrap();
        (state, scene)
    }

    #[test]
    fn kind_and_mischief_pick_opposite_extremes() {
        let (state, scene) = state_with_scene();
        let kind = GameplayStrategy::Kind
            .create_policy(1)
            .pick_choice(&state, &scene);
        let mischief = GameplayStrategy::Mischief
            .create_policy(1)
            .pick_choice(&state, &scene);
        assert_eq!(kind.choice_id, "A");
        assert_eq!(mischief.choice_id, "B");
        assert_eq!(mischief.rationale.as_deref(), Some("points -2"));
    }

    #[test]
    fn random_policy_is_seeded() {
        let (state, scene) = state_with_scene();
        let picks = |seed| {
            let mut policy = GameplayStrategy::Random.create_policy(seed);
            (0..16)
                .map(|_| policy.pick_choice(&state, &scene).choice_id)
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(9), picks(9));
        assert!(picks(9).iter().all(|id| id == "A" || id == "B"));
    }

    #[test]
    fn labels_round_trip_through_display() {
        for strategy in GameplayStrategy::ALL {
            assert_eq!(strategy.to_string(), strategy.label());
            assert_eq!(strategy.create_policy(0).name(), strategy.label());
            assert_eq!(GameplayStrategy::from_key(strategy.key()), Some(strategy));
        }
        assert_eq!(
            GameplayStrategy::from_key(" Repairer "),
            Some(GameplayStrategy::Repairer)
        );
        assert_eq!(GameplayStrategy::from_key("greedy"), None);
    }
}
