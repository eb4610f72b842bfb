//! Session State Machine
//!
//! Owns the board, gates player selections, batches them into judgements,
//! applies scoring and combo rules and drives the session phase:
//!
//! ```text
//! Ready ──start──► Playing ◄──judged── Resolving
//!                   │  ▲  └──2nd pick──►   │
//!            pause  │  │ resume             │ last pair
//!                   ▼  │                    ▼
//!                  Paused                 Victory
//! ```
//!
//! All mutation goes through this type. Time only moves inside
//! [`SessionStateMachine::update`].

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::pool::{ObjectPool, PoolKey};
use crate::core::rng::DeterministicRng;
use crate::core::timer::{Millis, Timer};
use crate::game::card::{CardSignal, CardSlot, FaceState, SlotIndex};
use crate::game::config::GameConfig;
use crate::game::deck::{self, BoardShape, Deck, DeckError};
use crate::game::events::{EventBus, EventSink, GameEvent, ListenerId};
use crate::game::save::{SaveData, SaveError, SAVE_FORMAT_VERSION};
use crate::game::token::TokenCatalog;

/// Cards judged together.
pub const MAX_SELECTION: usize = 2;

// =============================================================================
// SESSION ID
// =============================================================================

/// Unique session identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Fresh random id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// SESSION PHASE & STATE
// =============================================================================

/// Current phase of the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SessionPhase {
    /// No board dealt
    #[default]
    Ready = 0,
    /// Accepting selections
    Playing = 1,
    /// Two cards up, judgement pending
    Resolving = 2,
    /// Input and clock suspended
    Paused = 3,
    /// Every pair found; terminal until a new session starts
    Victory = 4,
}

/// Scores, counters and selection of the current deal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Current phase
    pub phase: SessionPhase,
    /// Accumulated score
    pub score: u32,
    /// Consecutive matches
    pub combo_level: u32,
    /// Combo countdown, running while `combo_level > 1`
    pub combo_remaining_ms: Millis,
    /// Face-up, unjudged slots in selection order
    pub selection: Vec<SlotIndex>,
    /// Pairs found so far
    pub matches_found: u32,
    /// Pairs on the board
    pub total_matches: u32,
    /// Play time, excluding pauses
    pub elapsed_ms: Millis,
}

impl SessionState {
    fn fresh(combo_time_limit_ms: Millis) -> Self {
        Self {
            combo_remaining_ms: combo_time_limit_ms,
            selection: Vec::with_capacity(MAX_SELECTION),
            ..Default::default()
        }
    }
}

/// Player action honoured by the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionAction {
    /// Card selected
    Select(SlotIndex),
    /// Session paused
    Pause,
    /// Session resumed
    Resume,
}

/// An action with the session time it was applied at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Board clock at the action
    pub at_ms: Millis,
    /// What happened
    pub action: SessionAction,
}

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Deck could not be built.
    #[error("cannot deal: {0}")]
    Deck(#[from] DeckError),

    /// Operation not allowed in the current phase.
    #[error("cannot {action} while {phase:?}")]
    InvalidTransition {
        /// Phase at the time of the call
        phase: SessionPhase,
        /// Refused operation
        action: &'static str,
    },

    /// Operation needs a dealt board.
    #[error("no board has been dealt")]
    NoActiveBoard,
}

// =============================================================================
// STATE MACHINE
// =============================================================================

/// Orchestrator of one player's memory game.
pub struct SessionStateMachine {
    id: SessionId,
    config: GameConfig,
    catalog: TokenCatalog,
    seed: u64,
    rng: DeterministicRng,
    /// RNG state right before the current deck was shuffled
    deal_checkpoint: Option<[u64; 2]>,
    pool: ObjectPool<CardSlot>,
    /// Board position -> pooled card
    board: Vec<PoolKey>,
    shape: Option<BoardShape>,
    state: SessionState,
    judge_timer: Timer,
    now: Millis,
    /// Clock value when the current board was dealt
    dealt_at: Millis,
    history: Vec<ActionRecord>,
    signals: Vec<(SlotIndex, CardSignal)>,
    bus: EventBus,
}

impl SessionStateMachine {
    /// Create a session with a random id and an explicit RNG seed.
    pub fn new(config: GameConfig, catalog: TokenCatalog, seed: u64) -> Self {
        Self::build(SessionId::random(), config, catalog, seed)
    }

    /// Create a session whose RNG seed is derived from its id.
    pub fn for_session(id: SessionId, config: GameConfig, catalog: TokenCatalog) -> Self {
        let seed = crate::core::rng::derive_session_seed(id.as_bytes());
        Self::build(id, config, catalog, seed)
    }

    pub(crate) fn build(id: SessionId, config: GameConfig, catalog: TokenCatalog, seed: u64) -> Self {
        let pool = ObjectPool::new(config.max_pool_size);
        let combo_limit = config.combo_time_limit_ms;
        Self {
            id,
            config,
            catalog,
            seed,
            rng: DeterministicRng::new(seed),
            deal_checkpoint: None,
            pool,
            board: Vec::new(),
            shape: None,
            state: SessionState::fresh(combo_limit),
            judge_timer: Timer::new(),
            now: 0,
            dealt_at: 0,
            history: Vec::new(),
            signals: Vec::new(),
            bus: EventBus::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// RNG seed the session was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Active configuration.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Token catalog decks are drawn from.
    pub fn catalog(&self) -> &TokenCatalog {
        &self.catalog
    }

    /// Read-only view of scores, counters and selection.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    /// Current score.
    pub fn score(&self) -> u32 {
        self.state.score
    }

    /// Current combo level.
    pub fn combo_level(&self) -> u32 {
        self.state.combo_level
    }

    /// Pairs found so far.
    pub fn matches_found(&self) -> u32 {
        self.state.matches_found
    }

    /// Pairs on the board.
    pub fn total_matches(&self) -> u32 {
        self.state.total_matches
    }

    /// Face-up, unjudged slots.
    pub fn selection(&self) -> &[SlotIndex] {
        &self.state.selection
    }

    /// Session clock.
    pub fn now_ms(&self) -> Millis {
        self.now
    }

    /// Session clock since the current board was dealt.
    pub fn board_clock_ms(&self) -> Millis {
        self.now - self.dealt_at
    }

    /// Shape of the dealt board.
    pub fn shape(&self) -> Option<BoardShape> {
        self.shape
    }

    /// Is a judgement scheduled?
    pub fn is_judging(&self) -> bool {
        self.judge_timer.is_armed()
    }

    /// Honoured actions since the current deal, timed on the board clock.
    pub fn history(&self) -> &[ActionRecord] {
        &self.history
    }

    /// RNG state the current deck was shuffled from.
    pub fn deal_checkpoint(&self) -> Option<[u64; 2]> {
        self.deal_checkpoint
    }

    /// Number of dealt cards.
    pub fn slot_count(&self) -> usize {
        self.board.len()
    }

    /// Card at a board position.
    pub fn card(&self, slot: SlotIndex) -> Option<&CardSlot> {
        let key = *self.board.get(slot.0)?;
        self.pool.get(key)
    }

    fn card_mut(&mut self, slot: SlotIndex) -> Option<&mut CardSlot> {
        let key = *self.board.get(slot.0)?;
        self.pool.get_mut(key)
    }

    /// Cards in board order.
    pub fn cards(&self) -> impl Iterator<Item = &CardSlot> + '_ {
        self.board.iter().filter_map(|key| self.pool.get(*key))
    }

    /// Positions of every card showing `face`.
    pub fn cards_in_state(&self, face: FaceState) -> Vec<SlotIndex> {
        self.cards()
            .filter(|c| c.face() == face)
            .map(|c| c.position())
            .collect()
    }

    /// Matched pairs counted from the board.
    pub fn matched_pairs(&self) -> usize {
        self.cards().filter(|c| c.face() == FaceState::Matched).count() / 2
    }

    /// Is every dealt card matched?
    pub fn is_board_complete(&self) -> bool {
        !self.board.is_empty() && self.cards().all(|c| c.face() == FaceState::Matched)
    }

    /// Card instances pooled for reuse.
    pub fn pooled_cards(&self) -> usize {
        self.pool.idle_count()
    }

    // -------------------------------------------------------------------------
    // Observers
    // -------------------------------------------------------------------------

    /// Register an event sink.
    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) -> ListenerId {
        self.bus.subscribe(sink)
    }

    /// Remove an event sink.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id)
    }

    fn emit(&mut self, event: GameEvent) {
        self.bus.dispatch(&event);
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.state.phase == phase {
            return;
        }
        debug!(session = %self.id, from = ?self.state.phase, to = ?phase, "phase change");
        self.state.phase = phase;
        self.emit(GameEvent::GameStateChanged { phase });
    }

    fn record(&mut self, action: SessionAction) {
        self.history.push(ActionRecord {
            at_ms: self.board_clock_ms(),
            action,
        });
    }

    // -------------------------------------------------------------------------
    // Board lifecycle
    // -------------------------------------------------------------------------

    /// Deal a fresh shuffled board and start playing.
    ///
    /// Deck errors abort before anything changes.
    pub fn start_session(&mut self, shape: BoardShape) -> Result<(), SessionError> {
        let checkpoint = self.rng.state();
        let deck = deck::generate(shape, &self.catalog, &mut self.rng).inspect_err(|err| {
            warn!(session = %self.id, %shape, %err, "session start rejected");
        })?;

        self.deal(deck);
        self.deal_checkpoint = Some(checkpoint);
        self.emit_counters();
        self.set_phase(SessionPhase::Playing);

        info!(
            session = %self.id,
            %shape,
            pairs = self.state.total_matches,
            "session started"
        );
        Ok(())
    }

    /// Deal from a recorded RNG checkpoint.
    pub(crate) fn start_session_from_checkpoint(
        &mut self,
        shape: BoardShape,
        checkpoint: [u64; 2],
    ) -> Result<(), SessionError> {
        self.rng.set_state(checkpoint);
        self.start_session(shape)
    }

    /// Return every card to the pool and lay out `deck`, resetting the state.
    fn deal(&mut self, deck: Deck) {
        self.clear_board();
        self.judge_timer.cancel();
        self.history.clear();
        self.dealt_at = self.now;
        self.state = SessionState::fresh(self.config.combo_time_limit_ms);
        self.state.total_matches = deck.shape().pairs_needed() as u32;

        let timings = self.config.card_timings();
        for (i, token) in deck.cards().iter().enumerate() {
            let key = self.pool.acquire(|| CardSlot::new(timings));
            if let Some(card) = self.pool.get_mut(key) {
                card.setup(SlotIndex(i), Arc::clone(token));
            }
            self.board.push(key);
        }
        self.shape = Some(deck.shape());
    }

    fn clear_board(&mut self) {
        for key in self.board.drain(..) {
            self.pool.release(key);
        }
        self.shape = None;
    }

    fn emit_counters(&mut self) {
        self.emit(GameEvent::ScoreChanged { score: self.state.score });
        self.emit(GameEvent::ComboChanged { level: self.state.combo_level });
    }

    /// Drop the board, cancel any pending judgement and return to Ready.
    pub fn reset_board(&mut self) {
        self.judge_timer.cancel();
        self.state.selection.clear();
        self.clear_board();
        self.deal_checkpoint = None;
        self.set_phase(SessionPhase::Ready);
        info!(session = %self.id, "board reset");
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// May `slot` be selected right now?
    ///
    /// The card must be face down and idle, fewer than two cards selected,
    /// the phase exactly Playing and no judgement pending.
    pub fn can_select(&self, slot: SlotIndex) -> bool {
        self.state.phase == SessionPhase::Playing
            && !self.judge_timer.is_armed()
            && self.state.selection.len() < MAX_SELECTION
            && self.card(slot).is_some_and(CardSlot::is_selectable)
    }

    /// Select a card. Returns `false` (and changes nothing) if the gate is closed.
    pub fn on_select(&mut self, slot: SlotIndex) -> bool {
        if !self.can_select(slot) {
            debug!(session = %self.id, ?slot, phase = ?self.state.phase, "selection refused");
            return false;
        }

        let now = self.now;
        let Some(card) = self.card_mut(slot) else {
            return false;
        };
        if let Err(err) = card.request_flip_up(now) {
            debug!(?slot, %err, "flip-up refused");
            return false;
        }

        self.state.selection.push(slot);
        self.record(SessionAction::Select(slot));
        self.emit(GameEvent::CardFlipped { slot });

        if self.state.selection.len() == MAX_SELECTION {
            // Retire solo reverts before the judgement is scheduled
            for i in 0..self.state.selection.len() {
                let selected = self.state.selection[i];
                if let Some(card) = self.card_mut(selected) {
                    card.cancel_auto_revert();
                }
            }
            self.judge_timer.arm(now, self.config.judge_delay_ms);
            self.set_phase(SessionPhase::Resolving);
        }
        true
    }

    /// A lone face-up card's revert timer expired.
    ///
    /// Honoured only while that card is the whole selection, has finished
    /// flipping up and the session is Playing; a second selection pre-empts
    /// it. Returns whether the card was turned back.
    pub fn on_auto_revert_timeout(&mut self, slot: SlotIndex) -> bool {
        let honoured = self.state.phase == SessionPhase::Playing
            && self.state.selection.as_slice() == [slot]
            && self.card(slot).is_some_and(CardSlot::is_settled_face_up);
        if !honoured {
            debug!(session = %self.id, ?slot, "stale auto-revert ignored");
            return false;
        }

        let now = self.now;
        if let Some(card) = self.card_mut(slot) {
            if let Err(err) = card.force_flip_down(now) {
                warn!(?slot, %err, "auto-revert flip refused");
                return false;
            }
        }
        self.state.selection.clear();
        debug!(session = %self.id, ?slot, "auto-revert");
        true
    }

    // -------------------------------------------------------------------------
    // Pause
    // -------------------------------------------------------------------------

    /// Suspend input and freeze the session clock.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        if self.state.phase != SessionPhase::Playing {
            return Err(SessionError::InvalidTransition {
                phase: self.state.phase,
                action: "pause",
            });
        }
        self.record(SessionAction::Pause);
        self.set_phase(SessionPhase::Paused);
        Ok(())
    }

    /// Leave the paused phase.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        if self.state.phase != SessionPhase::Paused {
            return Err(SessionError::InvalidTransition {
                phase: self.state.phase,
                action: "resume",
            });
        }
        self.record(SessionAction::Resume);
        self.set_phase(SessionPhase::Playing);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Update
    // -------------------------------------------------------------------------

    /// Advance the session by `delta_ms`.
    ///
    /// Order: card flips and revert timers, then a due judgement, then combo
    /// decay. Nothing moves while Ready or Paused.
    pub fn update(&mut self, delta_ms: Millis) {
        let phase = self.state.phase;
        if matches!(phase, SessionPhase::Ready | SessionPhase::Paused) {
            return;
        }

        self.now = self.now.saturating_add(delta_ms);
        if matches!(phase, SessionPhase::Playing | SessionPhase::Resolving) {
            self.state.elapsed_ms = self.state.elapsed_ms.saturating_add(delta_ms);
        }

        self.advance_cards();

        if self.judge_timer.is_elapsed(self.now) && self.selection_settled() {
            self.judge_timer.cancel();
            self.judge();
        }

        self.decay_combo(delta_ms);
    }

    fn advance_cards(&mut self) {
        let now = self.now;
        let mut signals = std::mem::take(&mut self.signals);

        for key in &self.board {
            if let Some(card) = self.pool.get_mut(*key) {
                card.update(now, &mut signals);
            }
        }

        for (slot, signal) in signals.drain(..) {
            match signal {
                CardSignal::Revealed => self.emit(GameEvent::CardRevealed { slot }),
                CardSignal::Hidden => self.emit(GameEvent::CardHidden { slot }),
                CardSignal::AutoRevertDue => {
                    self.on_auto_revert_timeout(slot);
                }
            }
        }
        self.signals = signals;
    }

    fn selection_settled(&self) -> bool {
        self.state
            .selection
            .iter()
            .all(|slot| self.card(*slot).is_some_and(|c| !c.is_transitioning()))
    }

    /// Compare the first two selected cards and apply the outcome.
    fn judge(&mut self) {
        let selection = std::mem::take(&mut self.state.selection);
        let (first, second) = match selection.as_slice() {
            [first, second, ..] => (*first, *second),
            _ => {
                warn!(session = %self.id, size = selection.len(), "judgement without a full selection");
                self.set_phase(SessionPhase::Playing);
                return;
            }
        };

        let first_id = self.card(first).and_then(CardSlot::token_id);
        let second_id = self.card(second).and_then(CardSlot::token_id);
        let now = self.now;

        if first_id.is_some() && first_id == second_id {
            for slot in [first, second] {
                if let Some(card) = self.card_mut(slot) {
                    if let Err(err) = card.mark_matched() {
                        warn!(?slot, %err, "mark matched refused");
                    }
                }
            }

            let points = self.config.match_score(self.state.combo_level);
            self.state.matches_found += 1;
            self.state.score = self.state.score.saturating_add(points);
            self.state.combo_level += 1;
            self.state.combo_remaining_ms = self.config.combo_time_limit_ms;

            info!(
                session = %self.id,
                ?first,
                ?second,
                points,
                score = self.state.score,
                combo = self.state.combo_level,
                "match"
            );
            self.emit(GameEvent::CardsMatched { first, second });
            self.emit_counters();
        } else {
            debug!(session = %self.id, ?first, ?second, "mismatch");
            self.emit(GameEvent::CardsMismatched { first, second });

            for slot in [first, second] {
                if let Some(card) = self.card_mut(slot) {
                    if let Err(err) = card.force_flip_down(now) {
                        warn!(?slot, %err, "mismatch flip refused");
                    }
                }
            }

            self.state.combo_level = 0;
            self.state.combo_remaining_ms = self.config.combo_time_limit_ms;
            self.emit(GameEvent::ComboChanged { level: 0 });
        }

        if self.state.matches_found >= self.state.total_matches {
            self.set_phase(SessionPhase::Victory);
            self.emit(GameEvent::GameCompleted);
            info!(
                session = %self.id,
                score = self.state.score,
                elapsed_ms = self.state.elapsed_ms,
                "board cleared"
            );
        } else {
            self.set_phase(SessionPhase::Playing);
        }
    }

    fn decay_combo(&mut self, delta_ms: Millis) {
        let active = matches!(self.state.phase, SessionPhase::Playing | SessionPhase::Resolving);
        if !active || self.state.combo_level <= 1 {
            return;
        }

        let limit = self.config.combo_time_limit_ms.max(1);
        self.state.combo_remaining_ms = self.state.combo_remaining_ms.saturating_sub(delta_ms);
        let remaining = (self.state.combo_remaining_ms as f64 / limit as f64).clamp(0.0, 1.0) as f32;

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(session = %self.id, remaining, "combo countdown");

        self.emit(GameEvent::ComboTimerUpdate { remaining });

        if self.state.combo_remaining_ms == 0 {
            debug!(session = %self.id, level = self.state.combo_level, "combo expired");
            self.state.combo_level = 0;
            self.state.combo_remaining_ms = limit;
            self.emit(GameEvent::ComboChanged { level: 0 });
        }
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Capture the board and counters for saving.
    ///
    /// Cards are saved by the face they settle on, not by
    /// [`CardSlot::face`]: a selected card counts as flipped even while its
    /// flip-up is still in flight, and cards turning back are saved face down.
    /// A restored board therefore matches this one once its flips finish.
    pub fn snapshot(&self) -> Result<SaveData, SessionError> {
        let shape = self.shape.ok_or(SessionError::NoActiveBoard)?;

        let mut token_ids = Vec::with_capacity(self.board.len());
        let mut matched = Vec::with_capacity(self.board.len());
        let mut flipped = Vec::with_capacity(self.board.len());
        for card in self.cards() {
            let Some(id) = card.token_id() else {
                return Err(SessionError::NoActiveBoard);
            };
            token_ids.push(id);
            matched.push(card.face() == FaceState::Matched);
            flipped.push(self.state.selection.contains(&card.position()));
        }

        Ok(SaveData {
            format_version: SAVE_FORMAT_VERSION,
            session_id: self.id,
            board: shape,
            token_ids,
            matched,
            flipped,
            score: self.state.score,
            combo_level: self.state.combo_level,
            combo_timer_ms: self.state.combo_remaining_ms,
            matches_found: self.state.matches_found,
            total_matches: self.state.total_matches,
            elapsed_ms: self.state.elapsed_ms,
            saved_at: chrono::Utc::now(),
        })
    }

    /// Rehydrate the board and counters from a save.
    ///
    /// The save is fully validated first; on error nothing changes. Face-up
    /// cards become the selection again: one re-arms its auto-revert, two
    /// schedule a fresh judgement.
    pub fn restore(&mut self, save: &SaveData) -> Result<(), SaveError> {
        let deck = save.validate(&self.catalog)?;

        self.deal(deck);
        self.id = save.session_id;
        self.deal_checkpoint = None;

        let now = self.now;
        let mut selection = Vec::with_capacity(MAX_SELECTION);
        for (i, key) in self.board.iter().enumerate() {
            let Some(card) = self.pool.get_mut(*key) else {
                continue;
            };
            if save.matched[i] {
                card.restore_face(FaceState::Matched);
            } else if save.flipped[i] {
                card.restore_face(FaceState::FaceUp);
                selection.push(SlotIndex(i));
            }
        }

        self.state.score = save.score;
        self.state.combo_level = save.combo_level;
        self.state.combo_remaining_ms = save.combo_timer_ms;
        self.state.matches_found = save.matches_found;
        self.state.total_matches = save.total_matches;
        self.state.elapsed_ms = save.elapsed_ms;

        let phase = if save.matches_found >= save.total_matches {
            SessionPhase::Victory
        } else if selection.len() == MAX_SELECTION {
            self.judge_timer.arm(now, self.config.judge_delay_ms);
            SessionPhase::Resolving
        } else {
            if let [lone] = selection.as_slice() {
                let lone = *lone;
                if let Some(card) = self.card_mut(lone) {
                    card.arm_auto_revert(now);
                }
            }
            SessionPhase::Playing
        };
        self.state.selection = selection;

        self.emit_counters();
        self.set_phase(phase);

        info!(
            session = %self.id,
            shape = %save.board,
            matches = save.matches_found,
            score = save.score,
            "session restored"
        );
        Ok(())
    }

    /// Hash of the board, counters and phase for determinism checks.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.seed, |hasher| {
            if let Some(shape) = self.shape {
                hasher.update_u16(shape.width);
                hasher.update_u16(shape.height);
            }
            for card in self.cards() {
                hasher.update_u32(card.token_id().map_or(u32::MAX, |id| id.0));
                hasher.update_u8(card.face() as u8);
            }
            for slot in &self.state.selection {
                hasher.update_u64(slot.0 as u64);
            }
            hasher.update_u32(self.state.score);
            hasher.update_u32(self.state.combo_level);
            hasher.update_u32(self.state.matches_found);
            hasher.update_u32(self.state.total_matches);
            hasher.update_u8(self.state.phase as u8);
            hasher.update_bool(self.judge_timer.is_armed());
        })
    }
}

impl fmt::Debug for SessionStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStateMachine")
            .field("id", &self.id)
            .field("shape", &self.shape)
            .field("state", &self.state)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================
