//! Session Transcript
//!
//! Records what is needed to replay a deal: the RNG checkpoint the deck was
//! shuffled from, every honoured player action with its board-clock time,
//! and the final state hash. Replaying with the same fixed step must land
//! on the same hash.

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::core::hash::StateHash;
use crate::core::timer::Millis;
use crate::game::config::GameConfig;
use crate::game::deck::BoardShape;
use crate::game::session::{
    ActionRecord, SessionAction, SessionError, SessionId, SessionPhase, SessionStateMachine,
};
use crate::game::token::TokenCatalog;

/// Current transcript version.
pub const TRANSCRIPT_VERSION: u8 = 1;

/// Replay errors.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// Written by a different transcript version.
    #[error("transcript version {0} is not supported")]
    UnsupportedVersion(u8),

    /// The session has no recorded deal to replay from.
    #[error("session was not dealt from a recorded checkpoint")]
    NotReplayable,

    /// Fixed step must be positive.
    #[error("replay step must be greater than zero")]
    ZeroStep,

    /// Session refused a recorded operation.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// A recorded selection was refused.
    #[error("selection {action:?} at {at_ms} ms was refused")]
    Rejected {
        /// Board clock of the action
        at_ms: Millis,
        /// Refused action
        action: SessionAction,
    },

    /// Clock cannot reach a recorded time because the session is halted.
    #[error("session is {phase:?} at {now_ms} ms and cannot reach {target_ms} ms")]
    Stalled {
        /// Phase that halts the clock
        phase: SessionPhase,
        /// Board clock reached
        now_ms: Millis,
        /// Board clock wanted
        target_ms: Millis,
    },

    /// Replay ended on a different state.
    #[error("replay diverged: expected {}, got {}", hex::encode(.expected), hex::encode(.actual))]
    HashMismatch {
        /// Recorded hash
        expected: StateHash,
        /// Replayed hash
        actual: StateHash,
    },

    /// Binary encoding failed.
    #[error("binary: {0}")]
    Binary(#[from] bincode::Error),
}

/// Replayable record of one deal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionTranscript {
    /// Version for forward compatibility.
    pub version: u8,

    /// Session identifier.
    pub session_id: SessionId,

    /// Seed the session RNG was created with.
    pub rng_seed: u64,

    /// RNG state right before the deck was shuffled.
    pub deal_rng_state: [u64; 2],

    /// Dealt board.
    pub board: BoardShape,

    /// Fixed update step the session was driven with.
    pub step_ms: Millis,

    /// Honoured actions in order.
    pub actions: Vec<ActionRecord>,

    /// Board clock when the transcript was captured.
    pub end_ms: Millis,

    /// State hash when the transcript was captured.
    pub final_hash: StateHash,
}

impl SessionTranscript {
    /// Capture the current deal of `machine`, driven with `step_ms` updates.
    pub fn capture(machine: &SessionStateMachine, step_ms: Millis) -> Result<Self, ReplayError> {
        if step_ms == 0 {
            return Err(ReplayError::ZeroStep);
        }
        let (Some(deal_rng_state), Some(board)) = (machine.deal_checkpoint(), machine.shape()) else {
            return Err(ReplayError::NotReplayable);
        };

        Ok(Self {
            version: TRANSCRIPT_VERSION,
            session_id: machine.id(),
            rng_seed: machine.seed(),
            deal_rng_state,
            board,
            step_ms,
            actions: machine.history().to_vec(),
            end_ms: machine.board_clock_ms(),
            final_hash: machine.compute_hash(),
        })
    }

    /// Serialize to bytes using bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ReplayError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ReplayError> {
        Ok(bincode::deserialize(data)?)
    }
}

/// Re-run a transcript on a fresh session.
///
/// Returns the replayed session; its hash is checked against the recording.
pub fn replay(
    config: GameConfig,
    catalog: TokenCatalog,
    transcript: &SessionTranscript,
) -> Result<SessionStateMachine, ReplayError> {
    if transcript.version != TRANSCRIPT_VERSION {
        return Err(ReplayError::UnsupportedVersion(transcript.version));
    }
    if transcript.step_ms == 0 {
        return Err(ReplayError::ZeroStep);
    }

    let mut machine = SessionStateMachine::build(transcript.session_id, config, catalog, transcript.rng_seed);
    machine.start_session_from_checkpoint(transcript.board, transcript.deal_rng_state)?;

    for record in &transcript.actions {
        advance_to(&mut machine, record.at_ms, transcript.step_ms)?;
        match record.action {
            SessionAction::Select(slot) => {
                if !machine.on_select(slot) {
                    return Err(ReplayError::Rejected {
                        at_ms: record.at_ms,
                        action: record.action,
                    });
                }
            }
            SessionAction::Pause => machine.pause()?,
            SessionAction::Resume => machine.resume()?,
        }
    }
    advance_to(&mut machine, transcript.end_ms, transcript.step_ms)?;

    let actual = machine.compute_hash();
    if actual != transcript.final_hash {
        return Err(ReplayError::HashMismatch {
            expected: transcript.final_hash,
            actual,
        });
    }

    info!(
        session = %transcript.session_id,
        actions = transcript.actions.len(),
        end_ms = transcript.end_ms,
        "replay verified"
    );
    Ok(machine)
}

/// Step the board clock up to `target_ms`, never crossing it.
fn advance_to(machine: &mut SessionStateMachine, target_ms: Millis, step_ms: Millis) -> Result<(), ReplayError> {
    while machine.board_clock_ms() < target_ms {
        let phase = machine.phase();
        if matches!(phase, SessionPhase::Paused | SessionPhase::Ready) {
            return Err(ReplayError::Stalled {
                phase,
                now_ms: machine.board_clock_ms(),
                target_ms,
            });
        }
        let step = step_ms.min(target_ms - machine.board_clock_ms());
        machine.update(step);
    }
    debug!(target_ms, "replay clock advanced");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::{FaceState, SlotIndex};

    const STEP: Millis = 16;

    fn fresh() -> SessionStateMachine {
        SessionStateMachine::new(GameConfig::default(), TokenCatalog::numbered(12), 99)
    }

    fn run(machine: &mut SessionStateMachine, ticks: usize) {
        for _ in 0..ticks {
            machine.update(STEP);
        }
    }

    fn settle(machine: &mut SessionStateMachine) {
        while machine.phase() == SessionPhase::Resolving {
            machine.update(STEP);
        }
        run(machine, 30);
    }

    fn select_pair(machine: &mut SessionStateMachine, matching: bool) {
        let view: &SessionStateMachine = machine;
        let open = view.cards_in_state(FaceState::FaceDown);
        let id = |s: SlotIndex| view.card(s).and_then(|c| c.token_id());
        let a = open[0];
        let b = *open[1..]
            .iter()
            .find(|s| (id(**s) == id(a)) == matching)
            .unwrap();
        assert!(machine.on_select(a));
        run(machine, 5);
        assert!(machine.on_select(b));
        settle(machine);
    }

    /// A short game: two matches, a mismatch, a pause, a lone revert.
    fn played() -> SessionStateMachine {
        let mut machine = fresh();
        machine.start_session(BoardShape::new(4, 4)).unwrap();
        run(&mut machine, 10);
        select_pair(&mut machine, true);
        select_pair(&mut machine, false);
        machine.pause().unwrap();
        run(&mut machine, 20);
        machine.resume().unwrap();
        select_pair(&mut machine, true);
        let lone = machine.cards_in_state(FaceState::FaceDown)[0];
        machine.on_select(lone);
        run(&mut machine, 120);
        machine
    }

    #[test]
    fn test_replay_reproduces_hash() {
        let machine = played();
        let transcript = SessionTranscript::capture(&machine, STEP).unwrap();
        assert_eq!(transcript.actions.len(), 9);

        let replayed = replay(GameConfig::default(), TokenCatalog::numbered(12), &transcript).unwrap();
        assert_eq!(replayed.compute_hash(), machine.compute_hash());
        assert_eq!(replayed.score(), machine.score());
        assert_eq!(replayed.history(), machine.history());
    }

    #[test]
    fn test_replay_after_previous_deal() {
        let mut machine = played();
        machine.start_session(BoardShape::new(2, 2)).unwrap();
        run(&mut machine, 3);
        select_pair(&mut machine, true);

        let transcript = SessionTranscript::capture(&machine, STEP).unwrap();
        assert!(replay(GameConfig::default(), TokenCatalog::numbered(12), &transcript).is_ok());
    }

    #[test]
    fn test_bytes_roundtrip_then_replay() {
        let transcript = SessionTranscript::capture(&played(), STEP).unwrap();
        let decoded = SessionTranscript::from_bytes(&transcript.to_bytes().unwrap()).unwrap();

        assert_eq!(decoded, transcript);
        assert!(replay(GameConfig::default(), TokenCatalog::numbered(12), &decoded).is_ok());
    }

    #[test]
    fn test_tampered_transcript_diverges() {
        let mut transcript = SessionTranscript::capture(&played(), STEP).unwrap();
        transcript.final_hash[0] ^= 0xff;

        assert!(matches!(
            replay(GameConfig::default(), TokenCatalog::numbered(12), &transcript),
            Err(ReplayError::HashMismatch { .. })
        ));
    }

    #[test]
    fn test_refused_selection_reported() {
        let mut transcript = SessionTranscript::capture(&played(), STEP).unwrap();
        let first = transcript.actions[0];
        transcript.actions.insert(1, first);

        assert!(matches!(
            replay(GameConfig::default(), TokenCatalog::numbered(12), &transcript),
            Err(ReplayError::Rejected { .. })
        ));
    }

    #[test]
    fn test_paused_clock_stalls_replay() {
        let mut machine = fresh();
        machine.start_session(BoardShape::new(2, 2)).unwrap();
        run(&mut machine, 2);
        machine.pause().unwrap();

        let mut transcript = SessionTranscript::capture(&machine, STEP).unwrap();
        transcript.end_ms += 100;

        assert!(matches!(
            replay(GameConfig::default(), TokenCatalog::numbered(12), &transcript),
            Err(ReplayError::Stalled { phase: SessionPhase::Paused, .. })
        ));
    }

    #[test]
    fn test_restored_session_not_replayable() {
        let save = played().snapshot().unwrap();
        let mut restored = fresh();
        restored.restore(&save).unwrap();

        assert!(matches!(
            SessionTranscript::capture(&restored, STEP),
            Err(ReplayError::NotReplayable)
        ));
        assert!(matches!(SessionTranscript::capture(&played(), 0), Err(ReplayError::ZeroStep)));
    }
}
