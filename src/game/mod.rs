//! Game Logic Module
//!
//! Memory-match rules. Deterministic given a seed and an update schedule.
//!
//! ## Module Structure
//!
//! - `token`: Tokens and the catalog decks draw from
//! - `deck`: Paired, shuffled deck generation
//! - `card`: Per-slot face state and flip timers
//! - `session`: Selection gating, judging, scoring and phases
//! - `events`: Events for presentation and audio
//! - `save`: Versioned session snapshots
//! - `transcript`: Replay recording and verification
//! - `config`: Timings and scoring settings

pub mod token;
pub mod deck;
pub mod card;
pub mod session;
pub mod events;
pub mod save;
pub mod transcript;
pub mod config;

// Re-export key types
pub use token::{Token, TokenCatalog, TokenId, VisualHandle};
pub use deck::{BoardShape, Deck, DeckError};
pub use card::{CardSlot, FaceState, SlotIndex};
pub use session::{SessionError, SessionId, SessionPhase, SessionState, SessionStateMachine};
pub use events::{EventBus, EventLog, EventSink, GameEvent, ListenerId};
pub use save::{SaveData, SaveError};
pub use transcript::{replay, ReplayError, SessionTranscript};
pub use config::{ConfigError, GameConfig};
