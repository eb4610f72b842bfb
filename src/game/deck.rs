//! Deck Generation
//!
//! Builds the paired, shuffled token sequence that seeds a board. The
//! generator is a pure function of its inputs and the random source.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Deserialize};

use crate::core::rng::{shuffle, RandomSource};
use crate::game::token::{Token, TokenCatalog, TokenId};

/// Board dimensions in cards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardShape {
    /// Columns
    pub width: u16,
    /// Rows
    pub height: u16,
}

impl BoardShape {
    /// Create a shape.
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Total number of cards.
    #[inline]
    pub fn cell_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of pairs a full board holds.
    #[inline]
    pub fn pairs_needed(self) -> usize {
        self.cell_count() / 2
    }

    /// Check that the shape holds a non-zero, even number of cards.
    pub fn validate(self) -> Result<(), DeckError> {
        let cells = self.cell_count();
        if cells == 0 || cells % 2 != 0 {
            return Err(DeckError::InvalidShape {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

impl fmt::Display for BoardShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Deck construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeckError {
    /// Cell count is zero or odd.
    #[error("board {width}x{height} does not hold a non-zero even number of cards")]
    InvalidShape {
        /// Columns
        width: u16,
        /// Rows
        height: u16,
    },

    /// Catalog holds fewer distinct tokens than the board needs pairs.
    #[error("board needs {needed} distinct tokens but the catalog has {available}")]
    InsufficientTokenVariety {
        /// Pairs required
        needed: usize,
        /// Tokens in the catalog
        available: usize,
    },

    /// A recorded layout references a token missing from the catalog.
    #[error("token {0} is not in the catalog")]
    UnknownToken(TokenId),

    /// A recorded layout does not fill the board exactly.
    #[error("layout has {actual} cards but the board has {expected} cells")]
    LayoutMismatch {
        /// Cells on the board
        expected: usize,
        /// Cards in the layout
        actual: usize,
    },

    /// A recorded layout holds a token an odd number of times.
    #[error("token {0} appears an odd number of times")]
    UnpairedToken(TokenId),
}

/// Ordered tokens dealt 1:1 onto board positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deck {
    shape: BoardShape,
    cards: Vec<Arc<Token>>,
}

impl Deck {
    /// Board shape this deck fills.
    pub fn shape(&self) -> BoardShape {
        self.shape
    }

    /// Tokens in deal order.
    pub fn cards(&self) -> &[Arc<Token>] {
        &self.cards
    }

    /// Token ids in deal order.
    pub fn token_ids(&self) -> Vec<TokenId> {
        self.cards.iter().map(|t| t.id).collect()
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Is the deck empty? Never true for a generated deck.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Generate a shuffled deck for `shape`.
///
/// Takes the first `pairs_needed` catalog entries, duplicates each and
/// Fisher-Yates shuffles the result.
pub fn generate<R>(shape: BoardShape, catalog: &TokenCatalog, rng: &mut R) -> Result<Deck, DeckError>
where
    R: RandomSource + ?Sized,
{
    shape.validate()?;

    let needed = shape.pairs_needed();
    if catalog.len() < needed {
        return Err(DeckError::InsufficientTokenVariety {
            needed,
            available: catalog.len(),
        });
    }

    let mut cards = Vec::with_capacity(shape.cell_count());
    for token in &catalog.tokens()[..needed] {
        cards.push(Arc::clone(token));
        cards.push(Arc::clone(token));
    }
    shuffle(rng, &mut cards);

    Ok(Deck { shape, cards })
}

/// Rebuild a deck from a recorded deal order.
pub fn restore(shape: BoardShape, catalog: &TokenCatalog, ids: &[TokenId]) -> Result<Deck, DeckError> {
    shape.validate()?;

    if ids.len() != shape.cell_count() {
        return Err(DeckError::LayoutMismatch {
            expected: shape.cell_count(),
            actual: ids.len(),
        });
    }

    let mut counts: BTreeMap<TokenId, usize> = BTreeMap::new();
    let mut cards = Vec::with_capacity(ids.len());
    for id in ids {
        let token = catalog.find(*id).ok_or(DeckError::UnknownToken(*id))?;
        cards.push(Arc::clone(token));
        *counts.entry(*id).or_default() += 1;
    }

    if let Some((id, _)) = counts.iter().find(|(_, count)| **count % 2 != 0) {
        return Err(DeckError::UnpairedToken(*id));
    }

    Ok(Deck { shape, cards })
}

// =============================================================================
// TESTS
// =============================================================================
