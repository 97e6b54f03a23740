//! End-of-day summary.
use serde::{Deserialize, Serialize};

use crate::constants::{
    SCORE_MAX, SCORE_MIN, VERDICT_GREAT_MIN, VERDICT_MIXED_MIN, VERDICT_NICE_MIN,
};
use crate::numbers::clamp_score;
use crate::plan::DayType;
use crate::scene::Polarity;
use crate::state::GameState;

/// Overall judgement of a finished day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Great,
    Nice,
    Mixed,
    Tough,
}

impl Verdict {
    /// Band containing `score`.
    #[must_use]
    pub const fn from_score(score: i32) -> Self {
        if score >= VERDICT_GREAT_MIN {
            Self::Great
        } else if score >= VERDICT_NICE_MIN {
            Self::Nice
        } else if score >= VERDICT_MIXED_MIN {
            Self::Mixed
        } else {
            Self::Tough
        }
    }

    /// Closing line shown to the player.
    #[must_use]
    pub fn message(self, day_type: DayType) -> String {
        match self {
            Self::Great => format!("Great {day_type}! You handled challenges with care."),
            Self::Nice => format!("Nice {day_type}! Most choices moved things forward."),
            Self::Mixed => format!("Mixed {day_type}. Tomorrow is a fresh start."),
            Self::Tough => {
                format!("Tough {day_type}. One good choice can turn things around tomorrow.")
            }
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Great => write!(f, "great"),
            Verdict::Nice => write!(f, "nice"),
            Verdict::Mixed => write!(f, "mixed"),
            Verdict::Tough => write!(f, "tough"),
        }
    }
}

/// Everything the end-of-day screen needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub day_type: DayType,
    pub score: i32,
    /// Score mapped onto `[0, 100]`.
    pub score_pct: f64,
    pub verdict: Verdict,
    pub message: String,
    pub total_scenes: usize,
    pub scenes_played: usize,
    pub repairs_used: usize,
    pub positive_choices: usize,
    pub negative_choices: usize,
}

/// Position of `score` between the score bounds as a percentage.
#[must_use]
pub fn score_pct(score: i32) -> f64 {
    let span = f64::from(SCORE_MAX - SCORE_MIN);
    f64::from(clamp_score(score) - SCORE_MIN) / span * 100.0
}

/// Summarize the day recorded in `state`.
///
/// Works on partial days as well; only resolved slots are counted.
#[must_use]
pub fn summarize(state: &GameState) -> DaySummary {
    let day_type = state.plan.day_type();
    let verdict = Verdict::from_score(state.score);
    let mut summary = DaySummary {
        day_type,
        score: state.score,
        score_pct: score_pct(state.score),
        verdict,
        message: verdict.message(day_type),
        total_scenes: state.total_scenes(),
        scenes_played: 0,
        repairs_used: 0,
        positive_choices: 0,
        negative_choices: 0,
    };
    for (_, entry) in state.history.resolved() {
        summary.scenes_played += 1;
        if entry.repaired.is_some() {
            summary.repairs_used += 1;
        }
        let chosen_points = entry
            .outcome
            .points
            .saturating_sub(entry.repaired.unwrap_or(0));
        match Polarity::from_points(chosen_points) {
            Polarity::Positive => summary.positive_choices += 1,
            Polarity::Negative => summary.negative_choices += 1,
            Polarity::Neutral => {}
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryEntry;
    use crate::plan::{DayPlan, TimeOfDay};
    use crate::scene::Outcome;

    fn entry(points: i32, repaired: Option<i32>) -> HistoryEntry {
        let mut outcome = Outcome::new("t", "d", points);
        if let Some(recovered) = repaired {
            outcome.points += recovered;
        }
        HistoryEntry {
            time_of_day: TimeOfDay::Day,
            scenario: "s".to_string(),
            choice_id: "A".to_string(),
            choice_text: None,
            outcome,
            repaired,
        }
    }

    #[test]
    fn verdict_bands() {
        assert_eq!(Verdict::from_score(20), Verdict::Great);
        assert_eq!(Verdict::from_score(12), Verdict::Great);
        assert_eq!(Verdict::from_score(11), Verdict::Nice);
        assert_eq!(Verdict::from_score(4), Verdict::Nice);
        assert_eq!(Verdict::from_score(3), Verdict::Mixed);
        assert_eq!(Verdict::from_score(-3), Verdict::Mixed);
        assert_eq!(Verdict::from_score(-4), Verdict::Tough);
    }

    #[test]
    fn messages_name_the_day_type() {
        assert_eq!(
            Verdict::Great.message(DayType::SchoolDay),
            "Great School Day! You handled challenges with care."
        );
        assert_eq!(
            Verdict::Tough.message(DayType::Weekend),
            "Tough Weekend. One good choice can turn things around tomorrow."
        );
    }

    #[test]
    fn percentage_spans_score_bounds() {
        assert!((score_pct(SCORE_MIN) - 0.0).abs() < f64::EPSILON);
        assert!((score_pct(0) - 50.0).abs() < f64::EPSILON);
        assert!((score_pct(SCORE_MAX) - 100.0).abs() < f64::EPSILON);
        assert!((score_pct(10) - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn counts_resolved_slots() {
        let plan = DayPlan::from_counts(DayType::Weekend, [1, 2, 1]).unwrap();
        let mut state = GameState::new(plan);
        state.history = state
            .history
            .with_entry(0, entry(3, None))
            .with_entry(1, entry(-2, Some(2)))
            .with_entry(2, entry(-4, None));
        state.score = -1;
        let summary = summarize(&state);
        assert_eq!(summary.total_scenes, 4);
        assert_eq!(summary.scenes_played, 3);
        assert_eq!(summary.repairs_used, 1);
        assert_eq!(summary.positive_choices, 1);
        assert_eq!(summary.negative_choices, 2);
        assert_eq!(summary.verdict, Verdict::Mixed);
        assert_eq!(summary.message, "Mixed Weekend. Tomorrow is a fresh start.");
    }
}
