//! Session controller for one interactive day.
//!
//! [`DaySession`] owns the current [`GameState`] and only ever replaces it with a
//! state produced by a pure transition. Scene generation is split into
//! [`DaySession::begin_request`] and [`DaySession::resolve`] so that a response
//! arriving after the player has moved on is discarded by index comparison.

use rand::Rng;

use crate::constants::LOG_RESPONSE_STALE;
use crate::error::{GenerateError, ProgressError};
use crate::generator::SceneGenerator;
use crate::history::HistoryEntry;
use crate::outcome::{apply_choice, apply_repair};
use crate::plan::DayPlan;
use crate::progress::{advance, is_day_complete};
use crate::request::{SceneRequest, build_scene_request_input};
use crate::scene::{GeneratedScene, RawScene, ingest_scene};
use crate::state::{GameState, init_game_state};
use crate::summary::{DaySummary, summarize};

/// An outstanding generator request, keyed by the day and index it will fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingScene {
    pub index: usize,
    /// Day counter of the session that opened the request.
    pub day: u64,
    pub request: SceneRequest,
}

#[derive(Debug, Clone)]
pub struct DaySession {
    state: GameState,
    in_flight: Option<usize>,
    /// Bumped by every restart.
    day: u64,
}

impl DaySession {
    /// Start a day with `plan`.
    #[must_use]
    pub fn new(plan: DayPlan) -> Self {
        Self::from_state(GameState::new(plan))
    }

    /// Start a day with a plan drawn from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_state(init_game_state(None, rng))
    }

    /// Resume from an existing state.
    #[must_use]
    pub const fn from_state(state: GameState) -> Self {
        Self {
            state,
            in_flight: None,
            day: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub fn into_state(self) -> GameState {
        self.state
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        is_day_complete(&self.state)
    }

    /// Open a generator request for the current index.
    ///
    /// Returns `None` when the day is over, a scene is already stored for the
    /// index, or a request for the index is still outstanding.
    pub fn begin_request(&mut self) -> Option<PendingScene> {
        let index = self.state.current_index;
        if !self.state.needs_scene() || self.in_flight == Some(index) {
            return None;
        }
        self.in_flight = Some(index);
        Some(PendingScene {
            index,
            day: self.day,
            request: build_scene_request_input(&self.state),
        })
    }

    /// Apply the generator's answer to `pending`.
    ///
    /// On any error the stored state is unchanged and the index may be requested
    /// again.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Stale`] if the player moved on or the day was
    /// restarted since the request was opened, the generator's own error if it failed, and
    /// [`GenerateError::Malformed`] if the scene fails ingestion.
    pub fn resolve(
        &mut self,
        pending: &PendingScene,
        result: Result<RawScene, GenerateError>,
    ) -> Result<&GeneratedScene, GenerateError> {
        if pending.day != self.day {
            log::debug!(
                "{LOG_RESPONSE_STALE}: response for day {} dropped on day {}",
                pending.day,
                self.day
            );
            return Err(GenerateError::Stale {
                requested: pending.index,
                current: self.state.current_index,
            });
        }
        if self.in_flight == Some(pending.index) {
            self.in_flight = None;
        }
        let current = self.state.current_index;
        if pending.index != current || self.state.scenes.len() != current {
            log::debug!(
                "{LOG_RESPONSE_STALE}: response for index {} dropped at index {current}",
                pending.index
            );
            return Err(GenerateError::Stale {
                requested: pending.index,
                current,
            });
        }

        let scene = ingest_scene(result?, self.state.current_time_of_day())?;
        self.state = self.state.with_scene(scene)?;
        self.state
            .current_scene()
            .ok_or(GenerateError::Progress(ProgressError::NoScene { index: current }))
    }

    /// Request, await and store the scene for the current index.
    ///
    /// Returns the stored scene directly when one already exists.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::DayComplete`] (wrapped) once the day is over, and
    /// any error from [`Self::resolve`].
    pub async fn generate_next(
        &mut self,
        generator: &dyn SceneGenerator,
    ) -> Result<&GeneratedScene, GenerateError> {
        if self.is_complete() {
            return Err(ProgressError::DayComplete.into());
        }
        let index = self.state.current_index;
        if self.state.scenes.len() > index {
            return self
                .state
                .current_scene()
                .ok_or(GenerateError::Progress(ProgressError::NoScene { index }));
        }
        self.in_flight = None;
        let Some(pending) = self.begin_request() else {
            return Err(ProgressError::NoScene { index }.into());
        };
        let result = generator.generate(&pending.request).await;
        self.resolve(&pending, result)
    }

    /// Record the player's choice for the current scene.
    ///
    /// # Errors
    ///
    /// Propagates the precondition failures of [`apply_choice`].
    pub fn choose(&mut self, choice_id: &str) -> Result<&HistoryEntry, ProgressError> {
        let index = self.state.current_index;
        self.state = apply_choice(&self.state, choice_id)?;
        self.state
            .current_entry()
            .ok_or(ProgressError::NoScene { index })
    }

    /// Take the repair offered by the current outcome.
    ///
    /// Returns the points recovered, or `None` when nothing was applied.
    pub fn repair(&mut self) -> Option<i32> {
        let before = self.state.current_entry().and_then(|entry| entry.repaired);
        self.state = apply_repair(&self.state);
        let after = self.state.current_entry().and_then(|entry| entry.repaired);
        if before.is_none() { after } else { None }
    }

    /// Move to the next scene; returns whether the day is now complete.
    pub fn next(&mut self) -> bool {
        self.state = advance(&self.state);
        self.is_complete()
    }

    /// Throw the current day away and start another.
    pub fn restart<R: Rng + ?Sized>(&mut self, plan: Option<DayPlan>, rng: &mut R) {
        self.state = init_game_state(plan, rng);
        self.in_flight = None;
        self.day = self.day.wrapping_add(1);
    }

    #[must_use]
    pub fn summary(&self) -> DaySummary {
        summarize(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curated::{CuratedGenerator, SceneCatalog, mock_scene};
    use crate::plan::{DayType, TimeOfDay};
    use crate::rng::CountingRng;

    fn session() -> DaySession {
        DaySession::new(DayPlan::from_counts(DayType::SchoolDay, [1, 1, 1]).unwrap())
    }

    #[test]
    fn one_request_per_index() {
        let mut session = session();
        let pending = session.begin_request().unwrap();
        assert_eq!(pending.index, 0);
        assert_eq!(pending.request.time_of_day, TimeOfDay::Morning);
        assert!(session.begin_request().is_none(), "request already outstanding");

        let scene = session
            .resolve(&pending, Ok(mock_scene(TimeOfDay::Day)))
            .unwrap();
        assert_eq!(scene.time_of_day, TimeOfDay::Morning, "planned slot wins");
        assert!(session.begin_request().is_none(), "scene already stored");
    }

    #[test]
    fn failed_generation_leaves_state_untouched() {
        let mut session = session();
        let before = session.state().clone();
        let pending = session.begin_request().unwrap();
        let err = session
            .resolve(&pending, Err(GenerateError::transport("offline")))
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(session.state(), &before);

        let retry = session.begin_request().unwrap();
        assert_eq!(retry, pending, "rebuilt request is identical");

        let mut broken = mock_scene(TimeOfDay::Morning);
        broken.options.pop();
        let err = session.resolve(&retry, Ok(broken)).unwrap_err();
        assert!(matches!(err, GenerateError::Malformed(_)));
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut session = session();
        let pending = session.begin_request().unwrap();
        session.next();
        let before = session.state().clone();
        let err = session
            .resolve(&pending, Ok(mock_scene(TimeOfDay::Morning)))
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Stale {
                requested: 0,
                current: 1
            }
        ));
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn choose_repair_and_advance() {
        let mut session = session();
        let pending = session.begin_request().unwrap();
        session
            .resolve(&pending, Ok(mock_scene(TimeOfDay::Morning)))
            .unwrap();

        let entry = session.choose("B").unwrap();
        assert_eq!(entry.outcome.points, -2);
        assert_eq!(session.state().negative_streak, 1);
        assert_eq!(session.repair(), Some(2));
        assert_eq!(session.repair(), None);
        assert_eq!(session.state().score, 0);
        assert_eq!(session.state().negative_streak, 0);

        assert!(!session.next());
        assert!(session.choose("A").is_err(), "no scene for index 1 yet");
    }

    #[test]
    fn restart_resets_everything() {
        let mut session = session();
        let pending = session.begin_request().unwrap();
        session
            .resolve(&pending, Ok(mock_scene(TimeOfDay::Morning)))
            .unwrap();
        session.choose("A").unwrap();
        let mut rng = CountingRng::seeded(4);
        session.restart(None, &mut rng);
        assert_eq!(session.state().score, 0);
        assert!(session.state().scenes.is_empty());
        assert_eq!(session.state().history.resolved_count(), 0);
        assert!(session.begin_request().is_some());
    }

    #[test]
    fn request_from_previous_day_is_discarded() {
        let mut session = session();
        let pending = session.begin_request().unwrap();
        assert_eq!(pending.request.day_type, DayType::SchoolDay);

        let weekend = DayPlan::from_counts(DayType::Weekend, [1, 1, 1]).unwrap();
        let mut rng = CountingRng::seeded(4);
        session.restart(Some(weekend), &mut rng);
        let fresh = session.begin_request().unwrap();
        assert_eq!(fresh.index, pending.index);
        assert_ne!(fresh.day, pending.day);

        let err = session
            .resolve(&pending, Ok(mock_scene(TimeOfDay::Morning)))
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Stale {
                requested: 0,
                current: 0
            }
        ));
        assert!(session.state().scenes.is_empty());

        session
            .resolve(&fresh, Ok(mock_scene(TimeOfDay::Morning)))
            .unwrap();
        assert_eq!(session.state().scenes.len(), 1);
    }

    #[tokio::test]
    async fn generate_next_plays_a_whole_day() {
        let generator = CuratedGenerator::new(SceneCatalog::builtin().unwrap(), 17);
        let mut session = session();
        loop {
            let choice = session.generate_next(&generator).await.unwrap().options[0]
                .id
                .clone();
            let again = session.generate_next(&generator).await.unwrap().options[0]
                .id
                .clone();
            assert_eq!(choice, again, "existing scene is returned, not regenerated");
            session.choose(&choice).unwrap();
            if session.next() {
                break;
            }
        }
        assert_eq!(session.state().current_index, 3);
        assert_eq!(session.summary().scenes_played, 3);
        assert!(matches!(
            session.generate_next(&generator).await,
            Err(GenerateError::Progress(ProgressError::DayComplete))
        ));
    }
}
