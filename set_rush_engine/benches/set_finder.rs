// Benchmarks for the set finder: the existence check the dealer runs on
// every deal and timer tick, and full enumeration used for hints.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use set_rush_engine::prng::GameRng;
use set_rush_engine::{CardId, FeatureSetFinder, SetFinder};

fn table(rng: &mut GameRng, size: usize) -> Vec<CardId> {
    let mut deck: Vec<CardId> = (0..81).map(CardId).collect();
    rng.shuffle(&mut deck);
    deck.truncate(size);
    deck
}

fn bench_find_sets(c: &mut Criterion) {
    let finder = FeatureSetFinder::new(3, 4);
    let mut rng = GameRng::new(42);
    let board = table(&mut rng, 12);
    let deck = table(&mut rng, 69);

    c.bench_function("exists_on_board_12", |b| {
        b.iter(|| finder.find_sets(black_box(&board), 1))
    });
    c.bench_function("exists_in_deck_69", |b| {
        b.iter(|| finder.find_sets(black_box(&deck), 1))
    });
    c.bench_function("enumerate_board_12", |b| {
        b.iter(|| finder.find_sets(black_box(&board), usize::MAX))
    });
    c.bench_function("test_set", |b| {
        b.iter(|| finder.test_set(black_box(&[CardId(0), CardId(40), CardId(80)])))
    });
}

criterion_group!(benches, bench_find_sets);
criterion_main!(benches);
