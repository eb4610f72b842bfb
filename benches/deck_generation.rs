use criterion::{black_box, criterion_group, criterion_main, Criterion};
use memory_match::game::card::SlotIndex;
use memory_match::game::deck::{self, BoardShape};
use memory_match::{DeterministicRng, GameConfig, SessionStateMachine, TokenCatalog};

fn bench_generate(c: &mut Criterion) {
    let catalog = TokenCatalog::numbered(64);
    let mut rng = DeterministicRng::new(12345);

    for shape in [BoardShape::new(4, 4), BoardShape::new(6, 4), BoardShape::new(8, 8)] {
        c.bench_function(&format!("generate_{shape}"), |b| {
            b.iter(|| deck::generate(black_box(shape), &catalog, &mut rng))
        });
    }
}

fn bench_redeal(c: &mut Criterion) {
    let mut machine = SessionStateMachine::new(GameConfig::default(), TokenCatalog::numbered(64), 12345);

    c.bench_function("start_session_6x4_pooled", |b| {
        b.iter(|| machine.start_session(black_box(BoardShape::new(6, 4))))
    });
}

fn bench_update(c: &mut Criterion) {
    let mut machine = SessionStateMachine::new(GameConfig::default(), TokenCatalog::numbered(64), 12345);
    let _ = machine.start_session(BoardShape::new(6, 4));
    machine.on_select(SlotIndex(0));

    c.bench_function("update_16ms", |b| {
        b.iter(|| machine.update(black_box(16)))
    });
}

criterion_group!(benches, bench_generate, bench_redeal, bench_update);
criterion_main!(benches);
