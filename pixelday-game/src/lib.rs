//! Pixelday Game Engine
//!
//! Platform-agnostic core logic for the Pixelday day-in-the-life decision game.
//! A day is a plan of time-of-day slots, each holding one to three dilemma
//! scenes. This crate plans the day, builds generator requests, scores choices,
//! applies repairs and tracks completion, without UI or network dependencies.

pub mod config;
pub mod constants;
pub mod curated;
pub mod error;
pub mod generator;
pub mod history;
pub mod numbers;
pub mod outcome;
pub mod plan;
pub mod progress;
pub mod request;
pub mod rng;
pub mod scene;
pub mod session;
pub mod state;
pub mod summary;

// Re-export commonly used types
pub use config::PlannerConfig;
pub use curated::{CatalogEntry, CuratedGenerator, SceneCatalog, mock_scene};
pub use error::{GenerateError, PlanError, ProgressError, SceneError};
pub use generator::{Deck, DeckCard, DeckSource, SceneGenerator, parse_decks_payload};
pub use history::{HistoryEntry, SceneHistory};
pub use outcome::{apply_choice, apply_repair};
pub use plan::{
    DayPlan, DayType, Schedule, Slot, TimeOfDay, build_day_plan, build_day_plan_with,
    choose_day_type, time_of_day_for_index, total_scenes,
};
pub use progress::{advance, is_day_complete};
pub use request::{PreviousSummary, SceneRequest, build_scene_request_input};
pub use rng::{CountingRng, DayRng, derive_stream_seed};
pub use scene::{
    GeneratedScene, Outcome, Polarity, RawOption, RawOutcome, RawRepair, RawScene, RepairAction,
    SceneOption, ingest_scene, parse_scene_payload, strip_code_fences,
};
pub use session::{DaySession, PendingScene};
pub use state::{GameState, init_game_state};
pub use summary::{DaySummary, Verdict, score_pct, summarize};
