//! Per-slot record of what happened during the day.
//!
//! The history has one position per planned scene. A position stays unset until
//! a choice is applied there; it is never reordered or removed.

use serde::{Deserialize, Serialize};

use crate::plan::TimeOfDay;
use crate::scene::Outcome;

/// Resolved choice for one scene slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "timeOfDay")]
    pub time_of_day: TimeOfDay,
    pub scenario: String,
    pub choice_id: String,
    pub choice_text: Option<String>,
    pub outcome: Outcome,
    /// Points recovered by a repair applied to this slot, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repaired: Option<i32>,
}

/// Fixed-length history with an explicit unset marker per slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SceneHistory {
    slots: Vec<Option<HistoryEntry>>,
}

impl SceneHistory {
    /// Allocate `len` unset slots.
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Entry at `index`, if the slot exists and has been resolved.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Copy of this history with `entry` written at `index`.
    ///
    /// Writes past the fixed length are ignored; the length never changes.
    #[must_use]
    pub fn with_entry(&self, index: usize, entry: HistoryEntry) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.slots.get_mut(index) {
            *slot = Some(entry);
        }
        next
    }

    /// Every slot in order, resolved or not.
    pub fn iter(&self) -> impl Iterator<Item = Option<&HistoryEntry>> {
        self.slots.iter().map(Option::as_ref)
    }

    /// Resolved entries with their indices.
    pub fn resolved(&self) -> impl Iterator<Item = (usize, &HistoryEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|entry| (index, entry)))
    }

    /// Number of resolved slots.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
