//! Save Data
//!
//! Flat, versioned snapshot of a session. Storage is the caller's business;
//! this module only defines the schema, checks it and encodes it as JSON or
//! bincode.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::core::timer::Millis;
use crate::game::card::SlotIndex;
use crate::game::deck::{self, BoardShape, Deck, DeckError};
use crate::game::session::{SessionId, MAX_SELECTION};
use crate::game::token::{TokenCatalog, TokenId};

/// Current save schema version.
pub const SAVE_FORMAT_VERSION: u32 = 1;

/// Save errors.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// Written by a different schema version.
    #[error("save format version {found} is not supported (expected {expected})")]
    UnsupportedVersion {
        /// Version in the save
        found: u32,
        /// Version this build reads
        expected: u32,
    },

    /// Board layout cannot be rebuilt.
    #[error("invalid board layout: {0}")]
    Deck(#[from] DeckError),

    /// Flag arrays do not cover the board.
    #[error("board has {expected} cells but flags cover {matched} matched / {flipped} flipped")]
    FlagLengthMismatch {
        /// Cells on the board
        expected: usize,
        /// Length of the matched flags
        matched: usize,
        /// Length of the flipped flags
        flipped: usize,
    },

    /// A slot is both matched and flipped.
    #[error("slot {0:?} is both matched and flipped")]
    ConflictingFlags(SlotIndex),

    /// More face-up cards than a selection holds.
    #[error("{0} cards are face up")]
    TooManyFaceUp(usize),

    /// Match counters disagree with the board.
    #[error("match counters are inconsistent: {0}")]
    InconsistentMatches(String),

    /// JSON encoding failed.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary encoding failed.
    #[error("binary: {0}")]
    Binary(#[from] bincode::Error),
}

/// Persisted session snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    /// Schema version
    pub format_version: u32,
    /// Session the snapshot belongs to
    pub session_id: SessionId,
    /// Board dimensions
    pub board: BoardShape,
    /// Token id per slot, in board order
    pub token_ids: Vec<TokenId>,
    /// Matched flag per slot
    pub matched: Vec<bool>,
    /// Face-up (selected, unjudged) flag per slot, counting a flip-up in
    /// flight as up and a flip-down in flight as down
    pub flipped: Vec<bool>,
    /// Score
    pub score: u32,
    /// Combo level
    pub combo_level: u32,
    /// Combo countdown (ms)
    pub combo_timer_ms: Millis,
    /// Pairs found
    pub matches_found: u32,
    /// Pairs on the board
    pub total_matches: u32,
    /// Play time (ms)
    pub elapsed_ms: Millis,
    /// Wall-clock time of the snapshot
    pub saved_at: DateTime<Utc>,
}

impl SaveData {
    /// Encode as pretty JSON.
    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from JSON. Content is checked on restore, not here.
    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SaveError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from bincode.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SaveError> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Check the snapshot against `catalog` and rebuild its deck.
    pub fn validate(&self, catalog: &TokenCatalog) -> Result<Deck, SaveError> {
        if self.format_version != SAVE_FORMAT_VERSION {
            return Err(SaveError::UnsupportedVersion {
                found: self.format_version,
                expected: SAVE_FORMAT_VERSION,
            });
        }

        let deck = deck::restore(self.board, catalog, &self.token_ids)?;
        let cells = self.board.cell_count();

        if self.matched.len() != cells || self.flipped.len() != cells {
            return Err(SaveError::FlagLengthMismatch {
                expected: cells,
                matched: self.matched.len(),
                flipped: self.flipped.len(),
            });
        }

        if let Some(i) = (0..cells).find(|i| self.matched[*i] && self.flipped[*i]) {
            return Err(SaveError::ConflictingFlags(SlotIndex(i)));
        }

        let face_up = self.flipped.iter().filter(|f| **f).count();
        if face_up > MAX_SELECTION {
            return Err(SaveError::TooManyFaceUp(face_up));
        }

        if self.total_matches as usize != self.board.pairs_needed() {
            return Err(SaveError::InconsistentMatches(format!(
                "total {} but the board holds {} pairs",
                self.total_matches,
                self.board.pairs_needed()
            )));
        }

        let matched_cards = self.matched.iter().filter(|m| **m).count();
        if matched_cards != self.matches_found as usize * 2 {
            return Err(SaveError::InconsistentMatches(format!(
                "{} pairs found but {} cards matched",
                self.matches_found, matched_cards
            )));
        }

        let mut counts: BTreeMap<TokenId, usize> = BTreeMap::new();
        for (id, _) in self.token_ids.iter().zip(&self.matched).filter(|(_, m)| **m) {
            *counts.entry(*id).or_default() += 1;
        }
        if let Some((id, _)) = counts.iter().find(|(_, n)| **n % 2 != 0) {
            return Err(SaveError::InconsistentMatches(format!(
                "token {id} is matched without its partner"
            )));
        }

        Ok(deck)
    }
}

// =============================================================================
// TESTS
// =============================================================================
