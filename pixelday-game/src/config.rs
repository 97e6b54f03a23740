//! Planner configuration.
use serde::{Deserialize, Serialize};

use crate::constants::{SLOT_SCENES_MAX, SLOT_SCENES_MIN, WEEKEND_PROBABILITY};
use crate::error::PlanError;

/// Tuning knobs for day planning. Defaults reproduce the shipped game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "PlannerConfig::default_min_scenes")]
    pub min_scenes_per_slot: u8,
    #[serde(default = "PlannerConfig::default_max_scenes")]
    pub max_scenes_per_slot: u8,
    #[serde(default = "PlannerConfig::default_weekend_probability")]
    pub weekend_probability: f64,
}

impl PlannerConfig {
    #[must_use]
    pub const fn default_min_scenes() -> u8 {
        SLOT_SCENES_MIN
    }

    #[must_use]
    pub const fn default_max_scenes() -> u8 {
        SLOT_SCENES_MAX
    }

    #[must_use]
    pub const fn default_weekend_probability() -> f64 {
        WEEKEND_PROBABILITY
    }

    /// Load a configuration from JSON, filling unspecified fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate that the configuration can produce well-formed plans.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidConfig`] when a slot could be empty, the range
    /// is inverted, or the weekend probability is not a probability.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.min_scenes_per_slot < 1 {
            return Err(PlanError::InvalidConfig(
                "min_scenes_per_slot must be at least 1",
            ));
        }
        if self.min_scenes_per_slot > self.max_scenes_per_slot {
            return Err(PlanError::InvalidConfig(
                "min_scenes_per_slot must not exceed max_scenes_per_slot",
            ));
        }
        if !(0.0..=1.0).contains(&self.weekend_probability) {
            return Err(PlanError::InvalidConfig(
                "weekend_probability must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_scenes_per_slot: Self::default_min_scenes(),
            max_scenes_per_slot: Self::default_max_scenes(),
            weekend_probability: Self::default_weekend_probability(),
        }
    }
}
