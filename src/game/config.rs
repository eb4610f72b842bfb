//! Game Configuration
//!
//! Tunable timings and scoring. Defaults match the shipped game; a JSON file
//! may override any subset of fields.

use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::core::timer::Millis;
use crate::game::card::CardTimings;
use crate::game::deck::{BoardShape, DeckError};

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A duration that must be positive is zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    /// Base score must be positive.
    #[error("base_score must be greater than zero")]
    ZeroBaseScore,

    /// Combo multiplier must be finite and positive.
    #[error("combo_multiplier must be finite and positive, got {0}")]
    InvalidMultiplier(f64),

    /// A listed board size cannot be dealt.
    #[error("invalid board size: {0}")]
    InvalidBoardSize(#[from] DeckError),

    /// Config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config JSON is malformed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for a game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Board sizes offered to the player.
    pub board_sizes: Vec<BoardShape>,
    /// Duration of one card flip (ms).
    pub flip_duration_ms: Millis,
    /// Delay before a lone face-up card turns back (ms).
    pub auto_revert_delay_ms: Millis,
    /// Delay between the second selection and its judgement (ms).
    pub judge_delay_ms: Millis,
    /// Combo window once the combo level exceeds 1 (ms).
    pub combo_time_limit_ms: Millis,
    /// Points for a match at combo level 0.
    pub base_score: u32,
    /// Combo score multiplier.
    pub combo_multiplier: f64,
    /// Released card instances kept for reuse.
    pub max_pool_size: usize,
    /// Fixed update step used by drivers and replays (ms).
    pub tick_ms: Millis,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_sizes: vec![
                BoardShape::new(2, 2),
                BoardShape::new(4, 4),
                BoardShape::new(6, 4),
            ],
            flip_duration_ms: 400,
            auto_revert_delay_ms: 1000,
            judge_delay_ms: 1000,
            combo_time_limit_ms: 3000,
            base_score: 100,
            combo_multiplier: 1.5,
            max_pool_size: 50,
            tick_ms: 16, // ~60 Hz
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check every field for a playable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("flip_duration_ms", self.flip_duration_ms),
            ("auto_revert_delay_ms", self.auto_revert_delay_ms),
            ("judge_delay_ms", self.judge_delay_ms),
            ("combo_time_limit_ms", self.combo_time_limit_ms),
            ("tick_ms", self.tick_ms),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroDuration(name));
        }

        if self.base_score == 0 {
            return Err(ConfigError::ZeroBaseScore);
        }
        if !self.combo_multiplier.is_finite() || self.combo_multiplier <= 0.0 {
            return Err(ConfigError::InvalidMultiplier(self.combo_multiplier));
        }

        for shape in &self.board_sizes {
            shape.validate()?;
        }
        Ok(())
    }

    /// Card flip timings.
    pub fn card_timings(&self) -> CardTimings {
        CardTimings {
            flip_duration_ms: self.flip_duration_ms,
            auto_revert_delay_ms: self.auto_revert_delay_ms,
        }
    }

    /// Points for a match made at `combo_level`.
    ///
    /// `base * (combo + 1) * multiplier`, rounded half to even.
    pub fn match_score(&self, combo_level: u32) -> u32 {
        let raw = self.base_score as f64 * (combo_level as f64 + 1.0) * self.combo_multiplier;
        raw.round_ties_even().clamp(0.0, u32::MAX as f64) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn test_match_score_progression() {
        let config = GameConfig::default();

        assert_eq!(config.match_score(0), 150);
        assert_eq!(config.match_score(1), 300);
        assert_eq!(config.match_score(2), 450);
    }

    #[test]
    fn test_match_score_rounds_half_to_even() {
        let config = GameConfig {
            base_score: 5,
            combo_multiplier: 0.5,
            ..Default::default()
        };

        // 2.5 -> 2, 5.0 -> 5, 7.5 -> 8
        assert_eq!(config.match_score(0), 2);
        assert_eq!(config.match_score(1), 5);
        assert_eq!(config.match_score(2), 8);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GameConfig::from_json_str(r#"{ "base_score": 10, "judge_delay_ms": 250 }"#).unwrap();

        assert_eq!(config.base_score, 10);
        assert_eq!(config.judge_delay_ms, 250);
        assert_eq!(config.flip_duration_ms, 400);
        assert_eq!(config.board_sizes.len(), 3);
    }

    #[test]
    fn test_validation_errors() {
        let zero_flip = GameConfig {
            flip_duration_ms: 0,
            ..Default::default()
        };
        assert!(matches!(zero_flip.validate(), Err(ConfigError::ZeroDuration("flip_duration_ms"))));

        let bad_multiplier = GameConfig {
            combo_multiplier: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(bad_multiplier.validate(), Err(ConfigError::InvalidMultiplier(_))));

        let odd_board = GameConfig {
            board_sizes: vec![BoardShape::new(3, 3)],
            ..Default::default()
        };
        assert!(matches!(odd_board.validate(), Err(ConfigError::InvalidBoardSize(_))));

        assert!(matches!(
            GameConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
