//! # Memory Match
//!
//! Session engine for a tile-matching memory game: deck dealing, card flip
//! lifecycles, selection judging, scoring with combos, save/restore and
//! replay verification.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        MEMORY MATCH                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Xorshift128+ PRNG, Fisher-Yates shuffle   │
//! │  ├── hash.rs     - State hashing for verification            │
//! │  ├── timer.rs    - Cancellable one-shot timers               │
//! │  └── pool.rs     - Instance pool with reset hooks            │
//! │                                                              │
//! │  game/           - Game rules                                │
//! │  ├── token.rs    - Tokens and catalogs                       │
//! │  ├── deck.rs     - Deck generation                           │
//! │  ├── card.rs     - Card flip lifecycle                       │
//! │  ├── session.rs  - Session state machine                     │
//! │  ├── events.rs   - Events and observers                      │
//! │  ├── save.rs     - Save snapshots                            │
//! │  ├── transcript.rs - Replay recording                        │
//! │  └── config.rs   - Game settings                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Time
//!
//! The engine never reads the system clock for game logic. The host calls
//! [`SessionStateMachine::update`] with elapsed milliseconds; every flip,
//! judgement delay and combo countdown runs on that clock, which stops
//! while the session is paused.
//!
//! Given the same seed, catalog, config and update schedule, a session
//! produces the same board and the same state hash.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use core::timer::Millis;
pub use game::config::GameConfig;
pub use game::deck::BoardShape;
pub use game::events::{EventLog, GameEvent};
pub use game::session::{SessionPhase, SessionStateMachine};
pub use game::token::TokenCatalog;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
