//! Progression state for a single day.
//!
//! `GameState` is a plain value. Every transition in this crate takes `&GameState`
//! and returns a fresh state, so a caller holding the previous value never sees
//! a half-applied update.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{LOG_SCENE_STORED, SCORE_MAX, SCORE_MIN};
use crate::error::ProgressError;
use crate::history::{HistoryEntry, SceneHistory};
use crate::plan::{DayPlan, TimeOfDay, build_day_plan};
use crate::scene::GeneratedScene;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGameState {
    plan: DayPlan,
    #[serde(default)]
    scenes: Vec<GeneratedScene>,
    current_index: usize,
    score: i32,
    negative_streak: u32,
    history: SceneHistory,
}

/// Plan, generated scenes, position, score, streak and history of one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawGameState")]
pub struct GameState {
    pub plan: DayPlan,
    /// Scenes in index order; one per visited slot.
    #[serde(default)]
    pub scenes: Vec<GeneratedScene>,
    /// Position in `[0, total_scenes]`; equal to the total once the day is over.
    pub current_index: usize,
    /// Running score, always within `[SCORE_MIN, SCORE_MAX]`.
    pub score: i32,
    /// Consecutive negative choices since the last non-negative choice or repair.
    pub negative_streak: u32,
    pub history: SceneHistory,
}

impl TryFrom<RawGameState> for GameState {
    type Error = ProgressError;

    fn try_from(raw: RawGameState) -> Result<Self, Self::Error> {
        let total = raw.plan.total_scenes();
        if raw.history.len() != total {
            return Err(ProgressError::InvalidSnapshot(format!(
                "history has {} slots for a {total}-scene day",
                raw.history.len()
            )));
        }
        if raw.scenes.len() > total {
            return Err(ProgressError::InvalidSnapshot(format!(
                "{} scenes stored for a {total}-scene day",
                raw.scenes.len()
            )));
        }
        if raw.current_index > total {
            return Err(ProgressError::InvalidSnapshot(format!(
                "index {} is past the end of a {total}-scene day",
                raw.current_index
            )));
        }
        if !(SCORE_MIN..=SCORE_MAX).contains(&raw.score) {
            return Err(ProgressError::InvalidSnapshot(format!(
                "score {} is outside [{SCORE_MIN}, {SCORE_MAX}]",
                raw.score
            )));
        }
        Ok(Self {
            plan: raw.plan,
            scenes: raw.scenes,
            current_index: raw.current_index,
            score: raw.score,
            negative_streak: raw.negative_streak,
            history: raw.history,
        })
    }
}

impl GameState {
    /// Initial state for `plan`: no scenes, index zero, score zero.
    #[must_use]
    pub fn new(plan: DayPlan) -> Self {
        let history = SceneHistory::with_len(plan.total_scenes());
        Self {
            plan,
            scenes: Vec::new(),
            current_index: 0,
            score: 0,
            negative_streak: 0,
            history,
        }
    }

    #[must_use]
    pub fn total_scenes(&self) -> usize {
        self.plan.total_scenes()
    }

    /// Time-of-day for the current position.
    #[must_use]
    pub fn current_time_of_day(&self) -> TimeOfDay {
        self.plan.time_of_day_for_index(self.current_index)
    }

    /// Scene stored for the current position, if it has been generated.
    #[must_use]
    pub fn current_scene(&self) -> Option<&GeneratedScene> {
        self.scenes.get(self.current_index)
    }

    /// History entry for the current position, if a choice was made there.
    #[must_use]
    pub fn current_entry(&self) -> Option<&HistoryEntry> {
        self.history.get(self.current_index)
    }

    /// Whether the current position still needs a scene from the generator.
    #[must_use]
    pub fn needs_scene(&self) -> bool {
        self.current_index < self.total_scenes() && self.scenes.len() == self.current_index
    }

    /// Copy of this state with `scene` stored for the current position.
    ///
    /// The scene's time-of-day is overwritten with the planned slot.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::DayComplete`] once the day is over and
    /// [`ProgressError::SceneOutOfOrder`] unless exactly `current_index` scenes
    /// are already stored.
    pub fn with_scene(&self, mut scene: GeneratedScene) -> Result<Self, ProgressError> {
        if self.current_index >= self.total_scenes() {
            return Err(ProgressError::DayComplete);
        }
        if self.scenes.len() != self.current_index {
            return Err(ProgressError::SceneOutOfOrder {
                index: self.current_index,
                stored: self.scenes.len(),
            });
        }
        scene.time_of_day = self.current_time_of_day();
        log::debug!(
            "{LOG_SCENE_STORED}: index {} ({}) scene `{}`",
            self.current_index,
            scene.time_of_day,
            scene.id
        );
        let mut next = self.clone();
        next.scenes.push(scene);
        Ok(next)
    }
}

/// Build the initial state, planning a fresh day from `rng` when no plan is given.
pub fn init_game_state<R: Rng + ?Sized>(plan: Option<DayPlan>, rng: &mut R) -> GameState {
    GameState::new(plan.unwrap_or_else(|| build_day_plan(rng)))
}
