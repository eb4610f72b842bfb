//! Tokens and Token Catalogs
//!
//! A token is the identity two matching cards share. Tokens are created once
//! per distinct pair and shared by reference between the catalog, decks and
//! card slots.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Deserialize};

/// Pairing key of a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub u32);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque reference to a presentation-owned visual (sprite, texture, glyph).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisualHandle(pub u32);

/// Immutable identity unit dealt onto the board in pairs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Pairing key
    pub id: TokenId,
    /// Display name
    pub name: String,
    /// Face visual
    pub face: VisualHandle,
    /// Back visual
    pub back: VisualHandle,
}

impl Token {
    /// Create a token.
    pub fn new(id: TokenId, name: impl Into<String>, face: VisualHandle, back: VisualHandle) -> Self {
        Self {
            id,
            name: name.into(),
            face,
            back,
        }
    }
}

/// Catalog errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// Two catalog entries share an id.
    #[error("duplicate token id {0}")]
    DuplicateToken(TokenId),
}

/// Ordered collection of distinct tokens available for dealing.
#[derive(Clone, Debug, Default)]
pub struct TokenCatalog {
    tokens: Vec<Arc<Token>>,
}

impl TokenCatalog {
    /// Build a catalog, rejecting duplicate ids.
    pub fn new(tokens: Vec<Token>) -> Result<Self, CatalogError> {
        let mut seen = BTreeSet::new();
        for token in &tokens {
            if !seen.insert(token.id) {
                return Err(CatalogError::DuplicateToken(token.id));
            }
        }

        Ok(Self {
            tokens: tokens.into_iter().map(Arc::new).collect(),
        })
    }

    /// Catalog of `count` tokens with ids `0..count` sharing one back visual.
    pub fn numbered(count: u32) -> Self {
        let tokens = (0..count)
            .map(|i| Arc::new(Token::new(TokenId(i), format!("token-{i}"), VisualHandle(i + 1), VisualHandle(0))))
            .collect();
        Self { tokens }
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Is the catalog empty?
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens in catalog order.
    pub fn tokens(&self) -> &[Arc<Token>] {
        &self.tokens
    }

    /// Look up a token by id.
    pub fn find(&self, id: TokenId) -> Option<&Arc<Token>> {
        self.tokens.iter().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_rejects_duplicates() {
        let tokens = vec![
            Token::new(TokenId(1), "sun", VisualHandle(1), VisualHandle(0)),
            Token::new(TokenId(1), "moon", VisualHandle(2), VisualHandle(0)),
        ];

        assert_eq!(
            TokenCatalog::new(tokens).unwrap_err(),
            CatalogError::DuplicateToken(TokenId(1))
        );
    }

    #[test]
    fn test_numbered_catalog() {
        let catalog = TokenCatalog::numbered(4);

        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.find(TokenId(3)).unwrap().name, "token-3");
        assert!(catalog.find(TokenId(4)).is_none());
    }

    #[test]
    fn test_catalog_preserves_order() {
        let tokens = vec![
            Token::new(TokenId(9), "nine", VisualHandle(9), VisualHandle(0)),
            Token::new(TokenId(2), "two", VisualHandle(2), VisualHandle(0)),
        ];
        let catalog = TokenCatalog::new(tokens).unwrap();

        let ids: Vec<_> = catalog.tokens().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![TokenId(9), TokenId(2)]);
    }
}
