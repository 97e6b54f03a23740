//! Scene request builder.
//!
//! The request is a pure function of the state: building it twice for the same
//! state yields the same payload, so retrying a failed generation is safe.

use serde::{Deserialize, Serialize};

use crate::constants::REPAIR_STREAK_THRESHOLD;
use crate::plan::{DayType, TimeOfDay};
use crate::state::GameState;

/// Narrative context carried over from the previously resolved scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousSummary {
    pub scenario: String,
    pub choice_text: String,
    pub consequence_text: String,
    pub points_delta: i32,
}

/// Payload sent to the external scene generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneRequest {
    #[serde(rename = "dayType")]
    pub day_type: DayType,
    #[serde(rename = "timeOfDay")]
    pub time_of_day: TimeOfDay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<PreviousSummary>,
    pub negative_streak: u32,
    pub total_score: i32,
    /// Advisory: the next negative branch should carry a repair action.
    pub must_offer_repair: bool,
}

/// Derive the generator request for the scene at `state.current_index`.
#[must_use]
pub fn build_scene_request_input(state: &GameState) -> SceneRequest {
    SceneRequest {
        day_type: state.plan.day_type(),
        time_of_day: state.current_time_of_day(),
        previous: previous_summary(state),
        negative_streak: state.negative_streak,
        total_score: state.score,
        must_offer_repair: state.negative_streak >= REPAIR_STREAK_THRESHOLD,
    }
}

fn previous_summary(state: &GameState) -> Option<PreviousSummary> {
    let previous_index = state.current_index.checked_sub(1)?;
    let entry = state.history.get(previous_index)?;
    Some(PreviousSummary {
        scenario: entry.scenario.clone(),
        choice_text: entry.choice_text.clone().unwrap_or_default(),
        consequence_text: entry.outcome.description.clone(),
        points_delta: entry.outcome.points,
    })
}
