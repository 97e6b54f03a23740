//! Outcome applier: scoring a chosen option and the optional repair path.

use crate::constants::{LOG_CHOICE_APPLIED, LOG_REPAIR_APPLIED, LOG_REPAIR_SKIPPED};
use crate::error::ProgressError;
use crate::history::HistoryEntry;
use crate::numbers::{clamp_points, clamp_recovered, clamp_score};
use crate::scene::Polarity;
use crate::state::GameState;

/// Apply the outcome of `choice_id` for the scene at the current position.
///
/// Score is clamped to the score bounds, the negative streak grows on a negative
/// delta and resets on anything else (zero included), and the history slot is
/// written. The position does not move.
///
/// # Errors
///
/// Fails when the day is over, no scene is stored for the current position, a
/// choice was already recorded there, or `choice_id` has no consequence.
pub fn apply_choice(state: &GameState, choice_id: &str) -> Result<GameState, ProgressError> {
    let index = state.current_index;
    if index >= state.total_scenes() {
        return Err(ProgressError::DayComplete);
    }
    let scene = state
        .scenes
        .get(index)
        .ok_or(ProgressError::NoScene { index })?;
    if state.history.get(index).is_some() {
        return Err(ProgressError::AlreadyResolved { index });
    }
    let chosen = scene
        .consequence(choice_id)
        .ok_or_else(|| ProgressError::UnknownChoice {
            index,
            choice_id: choice_id.to_string(),
        })?;

    let mut outcome = chosen.clone();
    outcome.points = clamp_points(outcome.points);
    outcome.polarity = Polarity::from_points(outcome.points);
    let points = outcome.points;

    let score = clamp_score(state.score.saturating_add(points));
    let negative_streak = if points < 0 {
        state.negative_streak.saturating_add(1)
    } else {
        0
    };

    let entry = HistoryEntry {
        time_of_day: scene.time_of_day,
        scenario: scene.scenario.clone(),
        choice_id: choice_id.to_string(),
        choice_text: scene.option(choice_id).map(|option| option.text.clone()),
        outcome,
        repaired: None,
    };
    log::debug!(
        "{LOG_CHOICE_APPLIED}: index {index} choice `{choice_id}` points {points} score {} -> {score} streak {negative_streak}",
        state.score
    );

    Ok(GameState {
        score,
        negative_streak,
        history: state.history.with_entry(index, entry),
        ..state.clone()
    })
}

/// Apply the repair offered by the current slot's outcome.
///
/// Returns an unchanged copy unless the slot is resolved, its outcome flags a
/// repair as available and carries the action, and it has not been repaired yet.
/// A repair always clears the negative streak.
#[must_use]
pub fn apply_repair(state: &GameState) -> GameState {
    let index = state.current_index;
    let Some(entry) = state.history.get(index) else {
        log::debug!("{LOG_REPAIR_SKIPPED}: index {index} has no recorded choice");
        return state.clone();
    };
    if entry.repaired.is_some() {
        log::debug!("{LOG_REPAIR_SKIPPED}: index {index} was already repaired");
        return state.clone();
    }
    let Some(action) = entry.outcome.repair_offer() else {
        log::debug!("{LOG_REPAIR_SKIPPED}: index {index} offers no repair");
        return state.clone();
    };

    let recovered = clamp_recovered(action.points_recovered);
    let mut repaired = entry.clone();
    // Outcome points share the score bounds here, not the per-outcome bounds.
    repaired.outcome.points = clamp_score(repaired.outcome.points.saturating_add(recovered));
    repaired.repaired = Some(recovered);

    let score = clamp_score(state.score.saturating_add(recovered));
    log::debug!(
        "{LOG_REPAIR_APPLIED}: index {index} recovered {recovered} score {} -> {score}",
        state.score
    );

    GameState {
        score,
        negative_streak: 0,
        history: state.history.with_entry(index, repaired),
        ..state.clone()
    }
}
