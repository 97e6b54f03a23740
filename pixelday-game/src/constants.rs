//! Centralized scoring and pacing constants for Pixelday game logic.
//!
//! These values define the deterministic math for a single day. Keeping them
//! together ensures the scoring rules can only be adjusted via code changes
//! reviewed in version control, rather than through generator output.

// Score bounds ---------------------------------------------------------------
/// Lowest running score a day can reach.
pub const SCORE_MIN: i32 = -20;
/// Highest running score a day can reach.
pub const SCORE_MAX: i32 = 20;

// Outcome bounds -------------------------------------------------------------
/// Lowest point delta a single outcome may carry.
pub const POINTS_MIN: i32 = -5;
/// Highest point delta a single outcome may carry.
pub const POINTS_MAX: i32 = 5;
/// Smallest amount a repair action recovers.
pub const REPAIR_POINTS_MIN: i32 = 1;
/// Largest amount a repair action recovers.
pub const REPAIR_POINTS_MAX: i32 = 3;

// Pacing ---------------------------------------------------------------------
/// Fewest scenes a time-of-day slot may hold.
pub const SLOT_SCENES_MIN: u8 = 1;
/// Most scenes a time-of-day slot may hold.
pub const SLOT_SCENES_MAX: u8 = 3;
/// Chance that a freshly planned day is a weekend.
pub const WEEKEND_PROBABILITY: f64 = 0.5;
/// Negative streak length at which the generator is asked to offer a repair.
pub const REPAIR_STREAK_THRESHOLD: u32 = 2;
/// Exactly two options are offered per scene.
pub const OPTIONS_PER_SCENE: usize = 2;

// Curated content -----------------------------------------------------------
pub(crate) const DEFAULT_SCENE_WEIGHT: u32 = 5;
pub(crate) const FALLBACK_REPAIR_POINTS: i32 = 2;
pub(crate) const FALLBACK_REPAIR_TEXT: &str =
    "Take a breath, say sorry, and try again calmly to make it right.";

// Summary bands --------------------------------------------------------------
pub(crate) const VERDICT_GREAT_MIN: i32 = 12;
pub(crate) const VERDICT_NICE_MIN: i32 = 4;
pub(crate) const VERDICT_MIXED_MIN: i32 = -3;

// Logging keys ---------------------------------------------------------------
pub(crate) const LOG_PLAN_BUILT: &str = "log.plan.built";
pub(crate) const LOG_SCENE_STORED: &str = "log.scene.stored";
pub(crate) const LOG_SCENE_REKEYED: &str = "log.scene.rekeyed";
pub(crate) const LOG_POINTS_CLAMPED: &str = "log.points.clamped";
pub(crate) const LOG_CHOICE_APPLIED: &str = "log.choice.applied";
pub(crate) const LOG_REPAIR_APPLIED: &str = "log.repair.applied";
pub(crate) const LOG_REPAIR_SKIPPED: &str = "log.repair.skipped";
pub(crate) const LOG_RESPONSE_STALE: &str = "log.response.stale";
pub(crate) const LOG_CATALOG_FALLBACK: &str = "log.catalog.fallback";
