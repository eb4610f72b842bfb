//! Memory Match Demo
//!
//! Plays every configured board headlessly with a bot that only knows what
//! it has seen, then checks save/restore and transcript replay.
//!
//! Usage: `memory-match [config.json]`. Log level via `RUST_LOG`.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{bail, Context};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use memory_match::{
    VERSION,
    game::{
        card::{FaceState, SlotIndex},
        config::GameConfig,
        deck::BoardShape,
        events::GameEvent,
        save::SaveData,
        session::{SessionId, SessionPhase, SessionStateMachine},
        token::{TokenCatalog, TokenId},
        transcript::{self, SessionTranscript},
    },
};

/// Distinct tokens in the demo catalog.
const CATALOG_SIZE: u32 = 24;

/// Give up on a board after this many ticks.
const MAX_TICKS: u32 = 100_000;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Memory Match v{}", VERSION);

    let config = match std::env::args().nth(1) {
        Some(path) => GameConfig::from_json_file(&path).with_context(|| format!("loading config {path}"))?,
        None => GameConfig::default(),
    };
    config.validate().context("invalid config")?;
    info!(
        flip_ms = config.flip_duration_ms,
        judge_ms = config.judge_delay_ms,
        combo_ms = config.combo_time_limit_ms,
        tick_ms = config.tick_ms,
        "config loaded"
    );

    let catalog = TokenCatalog::numbered(CATALOG_SIZE);
    for shape in config.board_sizes.clone() {
        play_board(&config, &catalog, shape)?;
    }

    info!("demo finished");
    Ok(())
}

/// Play one board to victory, then verify save and replay.
fn play_board(config: &GameConfig, catalog: &TokenCatalog, shape: BoardShape) -> anyhow::Result<()> {
    info!("=== Board {} ===", shape);

    let id = SessionId::random();
    let mut machine = SessionStateMachine::for_session(id, config.clone(), catalog.clone());
    info!(session = %id, seed = machine.seed(), "session created");

    let revealed: Rc<RefCell<Vec<SlotIndex>>> = Rc::default();
    let sink = Rc::clone(&revealed);
    machine.subscribe(Box::new(move |event: &GameEvent| match event {
        GameEvent::CardRevealed { slot } => sink.borrow_mut().push(*slot),
        GameEvent::CardsMatched { first, second } => info!(?first, ?second, "pair found"),
        GameEvent::ComboChanged { level } if *level > 1 => info!(level, "combo"),
        GameEvent::GameCompleted => info!("board cleared"),
        _ => {}
    }));

    machine.start_session(shape)?;

    let mut seen: BTreeMap<SlotIndex, TokenId> = BTreeMap::new();
    let mut checked_save = false;
    let mut ticks = 0;

    while machine.phase() != SessionPhase::Victory {
        for slot in revealed.borrow_mut().drain(..) {
            if let Some(token) = machine.card(slot).and_then(|c| c.token_id()) {
                seen.insert(slot, token);
            }
        }
        seen.retain(|slot, _| machine.card(*slot).is_some_and(|c| c.face() != FaceState::Matched));

        if let Some(slot) = next_pick(&machine, &seen) {
            machine.on_select(slot);
        }

        let settled = machine.cards().all(|c| !c.is_transitioning());
        if !checked_save && settled && machine.matches_found() * 2 >= machine.total_matches() {
            verify_save(&machine, config, catalog)?;
            pause_briefly(&mut machine, config)?;
            checked_save = true;
        }

        machine.update(config.tick_ms);
        ticks += 1;
        if ticks > MAX_TICKS {
            bail!("board {shape} not cleared after {MAX_TICKS} ticks");
        }
    }

    info!(
        score = machine.score(),
        elapsed_ms = machine.state().elapsed_ms,
        ticks,
        hash = %hex::encode(machine.compute_hash()),
        "board result"
    );

    verify_replay(&machine, config, catalog)
}

/// Choose the next card using only revealed tokens.
fn next_pick(machine: &SessionStateMachine, seen: &BTreeMap<SlotIndex, TokenId>) -> Option<SlotIndex> {
    if machine.phase() != SessionPhase::Playing {
        return None;
    }

    let selectable = |slot: &SlotIndex| machine.can_select(*slot);
    let unknown = || {
        (0..machine.slot_count())
            .map(SlotIndex)
            .find(|s| selectable(s) && !seen.contains_key(s))
    };

    match machine.selection() {
        [] => {
            for (slot, token) in seen {
                let partner = seen.iter().any(|(other, t)| other != slot && t == token && selectable(other));
                if partner && selectable(slot) {
                    return Some(*slot);
                }
            }
            unknown().or_else(|| (0..machine.slot_count()).map(SlotIndex).find(selectable))
        }
        [first] => {
            // Wait for the first card to show its face
            let token = seen.get(first)?;
            seen.iter()
                .find(|(slot, t)| *slot != first && *t == token && selectable(*slot))
                .map(|(slot, _)| *slot)
                .or_else(unknown)
        }
        _ => None,
    }
}

/// Snapshot, encode, decode and restore into a second session.
fn verify_save(machine: &SessionStateMachine, config: &GameConfig, catalog: &TokenCatalog) -> anyhow::Result<()> {
    let save = machine.snapshot()?;
    let json = save.to_json()?;
    let bytes = save.to_bytes()?;
    debug!(json_len = json.len(), bincode_len = bytes.len(), "save encoded");

    let mut restored = SessionStateMachine::for_session(machine.id(), config.clone(), catalog.clone());
    restored.restore(&SaveData::from_json(&json)?)?;

    let original = machine.compute_hash();
    if restored.compute_hash() != original {
        bail!("restored session diverged from {}", hex::encode(original));
    }
    info!(
        matches = save.matches_found,
        saved_at = %save.saved_at.to_rfc3339(),
        "save round-trip verified"
    );
    Ok(())
}

fn pause_briefly(machine: &mut SessionStateMachine, config: &GameConfig) -> anyhow::Result<()> {
    if machine.phase() != SessionPhase::Playing {
        return Ok(());
    }
    machine.pause()?;
    for _ in 0..10 {
        machine.update(config.tick_ms);
    }
    machine.resume()?;
    Ok(())
}

/// Capture the transcript and replay it on a fresh session.
fn verify_replay(machine: &SessionStateMachine, config: &GameConfig, catalog: &TokenCatalog) -> anyhow::Result<()> {
    let recorded = SessionTranscript::capture(machine, config.tick_ms)?;
    let bytes = recorded.to_bytes()?;
    info!(actions = recorded.actions.len(), bytes = bytes.len(), "transcript captured");

    match transcript::replay(config.clone(), catalog.clone(), &SessionTranscript::from_bytes(&bytes)?) {
        Ok(replayed) => {
            info!(hash = %hex::encode(replayed.compute_hash()), "DETERMINISM VERIFIED: Hashes match!");
            Ok(())
        }
        Err(err) => {
            warn!(%err, "DETERMINISM FAILURE");
            Err(err.into())
        }
    }
}
