//! Error taxonomy for planning, scene ingestion, progression and generation.
//!
//! Every failure here is local and recoverable; a caller that receives one still
//! holds the unchanged state it passed in.

use thiserror::Error;

use crate::plan::TimeOfDay;

/// Rejected day plans and planner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("day plan has no slots")]
    EmptySchedule,
    #[error("slot {time_of_day} has a scene count of zero")]
    EmptySlot { time_of_day: TimeOfDay },
    #[error("slot {found} is out of canonical order (expected {expected})")]
    OutOfOrder {
        expected: TimeOfDay,
        found: TimeOfDay,
    },
    #[error("day plan must list all three time-of-day slots (found {found})")]
    MissingSlots { found: usize },
    #[error("invalid planner config: {0}")]
    InvalidConfig(&'static str),
}

/// Structural problems found while ingesting a generated scene.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene payload could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("scene must offer exactly two options (found {found})")]
    OptionCount { found: usize },
    #[error("scene option id is empty")]
    EmptyOptionId,
    #[error("scene option id `{id}` appears more than once")]
    DuplicateOption { id: String },
    #[error("scene option `{id}` has no matching consequence")]
    MissingConsequence { id: String },
    #[error("scene option `{id}` matches several consequence keys ignoring case")]
    AmbiguousConsequence { id: String },
    #[error("catalog scene `{id}` is invalid: {source}")]
    CatalogEntry {
        id: String,
        #[source]
        source: Box<SceneError>,
    },
}

/// Precondition failures in the progression state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("the day is already complete")]
    DayComplete,
    #[error("no scene has been stored for index {index}")]
    NoScene { index: usize },
    #[error("scene for index {index} cannot be stored while {stored} scenes exist")]
    SceneOutOfOrder { index: usize, stored: usize },
    #[error("scene {index} already has a recorded choice")]
    AlreadyResolved { index: usize },
    #[error("choice `{choice_id}` is not offered by scene {index}")]
    UnknownChoice { index: usize, choice_id: String },
    #[error("state snapshot is inconsistent: {0}")]
    InvalidSnapshot(String),
}

/// Failures surfaced by scene and deck generation.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("generator request failed: {0}")]
    Transport(String),
    #[error("generator returned a malformed scene: {0}")]
    Malformed(#[from] SceneError),
    #[error("response for index {requested} is stale (current index {current})")]
    Stale { requested: usize, current: usize },
    #[error(transparent)]
    Progress(#[from] ProgressError),
}

impl GenerateError {
    /// Convenience constructor for transport failures.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Whether re-running the same request against the same state may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Malformed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_piece() {
        let err = PlanError::EmptySlot {
            time_of_day: TimeOfDay::Day,
        };
        assert_eq!(err.to_string(), "slot Day has a scene count of zero");

        let err = ProgressError::UnknownChoice {
            index: 2,
            choice_id: "C".to_string(),
        };
        assert!(err.to_string().contains("`C`"));
    }

    #[test]
    fn retryable_classification() {
        assert!(GenerateError::transport("timeout").is_retryable());
        assert!(
            GenerateError::from(SceneError::OptionCount { found: 3 }).is_retryable()
        );
        assert!(
            !GenerateError::Stale {
                requested: 1,
                current: 2
            }
            .is_retryable()
        );
    }
}
