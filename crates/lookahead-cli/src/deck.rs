//! Deck loading.
//!
//! A deck is the one-time listing of cards the walk goes through, stored as a
//! JSON array of `{ "id": ..., "words": [...] }` objects.

use anyhow::Context;
use lookahead::Card;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeckEntry {
    pub id: String,
    #[serde(default)]
    pub words: Vec<String>,
}

impl From<DeckEntry> for Card {
    fn from(entry: DeckEntry) -> Self {
        Self::new(entry.id, entry.words)
    }
}

/// Parses a deck from its JSON representation.
pub fn parse(json: &str) -> anyhow::Result<Vec<DeckEntry>> {
    serde_json::from_str(json).context("deck is not a JSON array of cards")
}

/// Reads and parses the deck at `path`.
pub async fn load(path: &Path) -> anyhow::Result<Vec<DeckEntry>> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read deck `{}`", path.display()))?;
    parse(&json).with_context(|| format!("failed to parse deck `{}`", path.display()))
}
