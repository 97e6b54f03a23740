//! Completion and advance.

use crate::state::GameState;

/// Move to the next scene position.
///
/// Only the index changes; score, streak, scenes and history carry over. Calling
/// this on a completed day is harmless since completion is judged with `>=`.
#[must_use]
pub fn advance(state: &GameState) -> GameState {
    GameState {
        current_index: state.current_index.saturating_add(1),
        ..state.clone()
    }
}

/// Whether every planned scene has been visited.
#[must_use]
pub fn is_day_complete(state: &GameState) -> bool {
    state.current_index >= state.total_scenes()
}
