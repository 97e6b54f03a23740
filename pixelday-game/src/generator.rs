//! Seams for the external content collaborators.
//!
//! Scene generation is the only asynchronous boundary the engine knows about.
//! Implementations own their transport; the engine never retries on their behalf.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GenerateError;
use crate::request::SceneRequest;
use crate::scene::RawScene;

/// Produces a scene payload for a request.
///
/// The returned scene is untrusted; callers pass it through
/// [`crate::scene::ingest_scene`] before storing it.
#[async_trait::async_trait]
pub trait SceneGenerator: Send + Sync {
    /// Generate the scene described by `request`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Transport`] when the backing service fails.
    async fn generate(&self, request: &SceneRequest) -> Result<RawScene, GenerateError>;
}

/// Read-only deck store consumed by the peripheral UI.
#[async_trait::async_trait]
pub trait DeckSource: Send + Sync {
    /// Fetch every active deck with its ordered cards.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Transport`] when the store cannot be reached.
    async fn fetch_decks(&self) -> Result<Vec<Deck>, GenerateError>;
}

/// One content card; columns the engine does not model are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckCard {
    pub id: String,
    #[serde(default)]
    pub deck_id: String,
    #[serde(default = "DeckCard::default_active")]
    pub is_active: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DeckCard {
    const fn default_active() -> bool {
        true
    }
}

/// A named deck and its cards in store order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub cards: Vec<DeckCard>,
}

impl Deck {
    /// Cards still flagged active, in order.
    pub fn active_cards(&self) -> impl Iterator<Item = &DeckCard> {
        self.cards.iter().filter(|card| card.is_active)
    }
}

#[derive(Debug, Deserialize)]
struct DecksEnvelope {
    #[serde(default)]
    decks: Vec<Deck>,
}

/// Parse the `{ "decks": [...] }` envelope returned by a deck store.
///
/// # Errors
///
/// Returns a transport error when the body is not a deck envelope.
pub fn parse_decks_payload(text: &str) -> Result<Vec<Deck>, GenerateError> {
    serde_json::from_str::<DecksEnvelope>(text)
        .map(|envelope| envelope.decks)
        .map_err(|err| GenerateError::transport(format!("invalid deck payload: {err}")))
}
