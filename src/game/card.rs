//! Card Lifecycle
//!
//! Per-slot state machine: face state, timed flip transitions and the
//! auto-revert timer. A card never acts on the session by itself; its
//! [`CardSlot::update`] reports [`CardSignal`]s that the session decides on.

use std::sync::Arc;

use serde::{Serialize, Deserialize};

use crate::core::pool::Poolable;
use crate::core::timer::{Millis, Timer, TimerHandle};
use crate::game::token::{Token, TokenId};

/// Board position of a card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotIndex(pub usize);

/// Visible face of a card.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FaceState {
    /// Hidden, selectable
    #[default]
    FaceDown = 0,
    /// Revealed, awaiting judgement or revert
    FaceUp = 1,
    /// Paired; terminal
    Matched = 2,
}

/// Flip durations for a card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CardTimings {
    /// Duration of one face change
    pub flip_duration_ms: Millis,
    /// Delay before a lone revealed card asks to be turned back
    pub auto_revert_delay_ms: Millis,
}

impl Default for CardTimings {
    fn default() -> Self {
        Self {
            flip_duration_ms: 400,
            auto_revert_delay_ms: 1000,
        }
    }
}

/// Why a card refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    /// A flip is already in flight.
    #[error("card is mid-flip")]
    Transitioning,

    /// Request needs a face-down card.
    #[error("card is {0:?}, expected face down")]
    NotFaceDown(FaceState),

    /// Request needs a face-up card.
    #[error("card is {0:?}, expected face up")]
    NotFaceUp(FaceState),

    /// Matched cards accept nothing.
    #[error("card is already matched")]
    AlreadyMatched,
}

/// Outcome of a card update the session must react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardSignal {
    /// Flip-up finished; the card is now face up.
    Revealed,
    /// Flip-down finished; the card is now face down.
    Hidden,
    /// The auto-revert timer expired while the card was face up.
    AutoRevertDue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transition {
    Raising,
    Lowering,
}

/// One board position holding a token and its face state.
#[derive(Clone, Debug)]
pub struct CardSlot {
    position: SlotIndex,
    token: Option<Arc<Token>>,
    face: FaceState,
    transition: Option<Transition>,
    flip_timer: Timer,
    auto_revert: Timer,
    /// Arm the auto-revert timer when the in-flight flip-up settles.
    revert_on_settle: bool,
    timings: CardTimings,
}

impl CardSlot {
    /// Create an unassigned face-down card.
    pub fn new(timings: CardTimings) -> Self {
        Self {
            position: SlotIndex(0),
            token: None,
            face: FaceState::FaceDown,
            transition: None,
            flip_timer: Timer::new(),
            auto_revert: Timer::new(),
            revert_on_settle: false,
            timings,
        }
    }

    /// Reinitialise for a deal: face down, new token, no timers, no flip.
    pub fn setup(&mut self, position: SlotIndex, token: Arc<Token>) {
        self.clear_transient();
        self.position = position;
        self.token = Some(token);
        self.face = FaceState::FaceDown;
    }

    fn clear_transient(&mut self) {
        self.transition = None;
        self.flip_timer.cancel();
        self.auto_revert.cancel();
        self.revert_on_settle = false;
    }

    /// Board position.
    pub fn position(&self) -> SlotIndex {
        self.position
    }

    /// Assigned token.
    pub fn token(&self) -> Option<&Arc<Token>> {
        self.token.as_ref()
    }

    /// Id of the assigned token.
    pub fn token_id(&self) -> Option<TokenId> {
        self.token.as_ref().map(|t| t.id)
    }

    /// Last settled face.
    ///
    /// A flip in flight does not change this until it finishes: a card
    /// raising still reads `FaceDown` and one lowering still reads `FaceUp`.
    /// Saves record the face a flip is heading to instead.
    pub fn face(&self) -> FaceState {
        self.face
    }

    /// Is a flip in flight?
    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Face down with no flip in flight.
    pub fn is_selectable(&self) -> bool {
        self.face == FaceState::FaceDown && self.transition.is_none()
    }

    /// Face up with no flip in flight.
    pub fn is_settled_face_up(&self) -> bool {
        self.face == FaceState::FaceUp && self.transition.is_none()
    }

    /// Is the auto-revert timer armed?
    pub fn auto_revert_armed(&self) -> bool {
        self.auto_revert.is_armed()
    }

    /// Will the auto-revert timer be armed once the current flip settles?
    pub fn auto_revert_pending(&self) -> bool {
        self.auto_revert.is_armed() || self.revert_on_settle
    }

    /// Begin turning the card face up.
    pub fn request_flip_up(&mut self, now: Millis) -> Result<(), CardError> {
        if self.transition.is_some() {
            return Err(CardError::Transitioning);
        }
        if self.face != FaceState::FaceDown {
            return Err(CardError::NotFaceDown(self.face));
        }

        self.auto_revert.cancel();
        self.transition = Some(Transition::Raising);
        self.flip_timer.arm(now, self.timings.flip_duration_ms);
        self.revert_on_settle = true;
        Ok(())
    }

    /// Begin turning the card face down.
    pub fn request_flip_down(&mut self, now: Millis) -> Result<(), CardError> {
        self.check_can_lower()?;
        self.auto_revert.cancel();
        self.start_lowering(now);
        Ok(())
    }

    /// Turn the card face down on the session's behalf.
    ///
    /// The auto-revert timer is retired even when the flip itself is refused.
    pub fn force_flip_down(&mut self, now: Millis) -> Result<(), CardError> {
        self.cancel_auto_revert();
        self.check_can_lower()?;
        self.start_lowering(now);
        Ok(())
    }

    fn check_can_lower(&self) -> Result<(), CardError> {
        if self.transition.is_some() {
            return Err(CardError::Transitioning);
        }
        match self.face {
            FaceState::FaceUp => Ok(()),
            FaceState::Matched => Err(CardError::AlreadyMatched),
            FaceState::FaceDown => Err(CardError::NotFaceUp(self.face)),
        }
    }

    fn start_lowering(&mut self, now: Millis) {
        self.transition = Some(Transition::Lowering);
        self.flip_timer.arm(now, self.timings.flip_duration_ms);
    }

    /// Lock the card as matched. Terminal.
    pub fn mark_matched(&mut self) -> Result<(), CardError> {
        match self.face {
            FaceState::FaceUp => {
                self.clear_transient();
                self.face = FaceState::Matched;
                Ok(())
            }
            FaceState::Matched => Err(CardError::AlreadyMatched),
            FaceState::FaceDown => Err(CardError::NotFaceUp(self.face)),
        }
    }

    /// Retire the auto-revert timer, including one not yet armed because the
    /// flip-up is still in flight. Idempotent.
    pub fn cancel_auto_revert(&mut self) -> bool {
        let pending = self.revert_on_settle;
        self.revert_on_settle = false;
        self.auto_revert.cancel() || pending
    }

    /// Arm the auto-revert timer on a settled face-up card.
    pub fn arm_auto_revert(&mut self, now: Millis) -> Option<TimerHandle> {
        if !self.is_settled_face_up() {
            return None;
        }
        Some(self.auto_revert.arm(now, self.timings.auto_revert_delay_ms))
    }

    /// Set a settled face directly, without a transition.
    ///
    /// Used when rehydrating a saved board.
    pub fn restore_face(&mut self, face: FaceState) {
        self.clear_transient();
        self.face = face;
    }

    /// Advance timers to `now`, appending any signals to `out`.
    pub fn update(&mut self, now: Millis, out: &mut Vec<(SlotIndex, CardSignal)>) {
        if let Some(fired) = self.flip_timer.poll(now) {
            match self.transition.take() {
                Some(Transition::Raising) => {
                    self.face = FaceState::FaceUp;
                    out.push((self.position, CardSignal::Revealed));
                    if std::mem::take(&mut self.revert_on_settle) {
                        // Count the delay from the moment the flip settled
                        self.auto_revert.arm(fired.deadline, self.timings.auto_revert_delay_ms);
                    }
                }
                Some(Transition::Lowering) => {
                    self.face = FaceState::FaceDown;
                    out.push((self.position, CardSignal::Hidden));
                }
                None => {}
            }
        }

        if self.face == FaceState::FaceUp && self.transition.is_none() {
            if self.auto_revert.poll(now).is_some() {
                out.push((self.position, CardSignal::AutoRevertDue));
            }
        }
    }
}

impl Poolable for CardSlot {
    fn on_acquire(&mut self) {
        self.clear_transient();
        self.face = FaceState::FaceDown;
    }

    fn on_release(&mut self) {
        self.clear_transient();
        self.token = None;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::token::VisualHandle;

    fn token(id: u32) -> Arc<Token> {
        Arc::new(Token::new(TokenId(id), format!("t{id}"), VisualHandle(id), VisualHandle(0)))
    }

    fn dealt_card() -> CardSlot {
        let mut card = CardSlot::new(CardTimings::default());
        card.setup(SlotIndex(3), token(1));
        card
    }

    fn run(card: &mut CardSlot, now: Millis) -> Vec<CardSignal> {
        let mut out = Vec::new();
        card.update(now, &mut out);
        out.into_iter().map(|(_, s)| s).collect()
    }

    #[test]
    fn test_flip_up_settles_and_arms_revert() {
        let mut card = dealt_card();
        card.request_flip_up(0).unwrap();

        assert!(card.is_transitioning());
        assert_eq!(card.face(), FaceState::FaceDown);
        assert!(run(&mut card, 399).is_empty());

        assert_eq!(run(&mut card, 400), vec![CardSignal::Revealed]);
        assert_eq!(card.face(), FaceState::FaceUp);
        assert!(card.auto_revert_armed());
    }

    #[test]
    fn test_auto_revert_signal() {
        let mut card = dealt_card();
        card.request_flip_up(0).unwrap();
        run(&mut card, 400);

        assert!(run(&mut card, 1399).is_empty());
        assert_eq!(run(&mut card, 1400), vec![CardSignal::AutoRevertDue]);

        // Signal is a request only; the card stays up
        assert_eq!(card.face(), FaceState::FaceUp);
    }

    #[test]
    fn test_flip_and_revert_in_one_large_step() {
        let mut card = dealt_card();
        card.request_flip_up(0).unwrap();

        let signals = run(&mut card, 5_000);
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0], CardSignal::Revealed);
        assert_eq!(signals[1], CardSignal::AutoRevertDue);
    }

    #[test]
    fn test_cancel_before_settle_suppresses_revert() {
        let mut card = dealt_card();
        card.request_flip_up(0).unwrap();
        assert!(card.cancel_auto_revert());

        run(&mut card, 400);
        assert!(!card.auto_revert_armed());
        assert!(run(&mut card, 10_000).is_empty());
        assert!(!card.cancel_auto_revert());
    }

    #[test]
    fn test_flip_up_rejected_while_transitioning() {
        let mut card = dealt_card();
        card.request_flip_up(0).unwrap();

        assert_eq!(card.request_flip_up(10), Err(CardError::Transitioning));
        assert_eq!(card.request_flip_down(10), Err(CardError::Transitioning));
    }

    #[test]
    fn test_flip_down_cycle() {
        let mut card = dealt_card();
        card.request_flip_up(0).unwrap();
        run(&mut card, 400);

        card.request_flip_down(500).unwrap();
        assert!(!card.auto_revert_armed());
        assert_eq!(run(&mut card, 900), vec![CardSignal::Hidden]);
        assert!(card.is_selectable());
    }

    #[test]
    fn test_flip_down_requires_face_up() {
        let mut card = dealt_card();
        assert_eq!(
            card.request_flip_down(0),
            Err(CardError::NotFaceUp(FaceState::FaceDown))
        );
    }

    #[test]
    fn test_force_flip_down_retires_timer_even_when_rejected() {
        let mut card = dealt_card();
        card.request_flip_up(0).unwrap();

        // Still raising: flip refused, but the pending revert is gone
        assert_eq!(card.force_flip_down(100), Err(CardError::Transitioning));
        run(&mut card, 400);
        assert!(!card.auto_revert_armed());
    }

    #[test]
    fn test_mark_matched_is_terminal() {
        let mut card = dealt_card();
        assert_eq!(card.mark_matched(), Err(CardError::NotFaceUp(FaceState::FaceDown)));

        card.request_flip_up(0).unwrap();
        run(&mut card, 400);
        card.mark_matched().unwrap();

        assert_eq!(card.face(), FaceState::Matched);
        assert!(!card.auto_revert_armed());
        assert_eq!(card.mark_matched(), Err(CardError::AlreadyMatched));
        assert_eq!(card.request_flip_up(500), Err(CardError::NotFaceDown(FaceState::Matched)));
        assert_eq!(card.force_flip_down(500), Err(CardError::AlreadyMatched));
        assert!(run(&mut card, 100_000).is_empty());
    }

    #[test]
    fn test_setup_clears_everything() {
        let mut card = dealt_card();
        card.request_flip_up(0).unwrap();
        run(&mut card, 400);
        assert!(card.auto_revert_armed());

        card.setup(SlotIndex(0), token(2));
        assert_eq!(card.face(), FaceState::FaceDown);
        assert!(!card.is_transitioning());
        assert!(!card.auto_revert_pending());
        assert_eq!(card.token_id(), Some(TokenId(2)));
        assert!(run(&mut card, 100_000).is_empty());
    }

    #[test]
    fn test_pool_release_drops_token_and_timers() {
        let mut card = dealt_card();
        card.request_flip_up(0).unwrap();

        card.on_release();
        assert!(card.token().is_none());
        assert!(!card.is_transitioning());
        assert!(run(&mut card, 100_000).is_empty());
    }

    #[test]
    fn test_restore_face() {
        let mut card = dealt_card();
        card.restore_face(FaceState::FaceUp);
        assert!(card.is_settled_face_up());
        assert!(!card.auto_revert_armed());

        let handle = card.arm_auto_revert(50).unwrap();
        assert_eq!(handle.deadline, 1050);
        assert!(card.auto_revert_armed());
        assert_eq!(run(&mut card, 1050), vec![CardSignal::AutoRevertDue]);
    }
}
