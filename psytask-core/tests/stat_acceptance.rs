use psytask_core::igt::schedule;
use psytask_core::numbers::{count_to_f64, mean};
use psytask_core::{DeckId, DeckTable, OutcomeSchedule};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

const SAMPLE_SIZE: usize = 10_000;

fn net_mean(deck: DeckId, seed: u64) -> (f64, f64) {
    let table = DeckTable::default();
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let outcomes = schedule::generate(table.get(deck), SAMPLE_SIZE, &mut rng);
    let nets: Vec<f64> = outcomes.iter().map(|o| o.net as f64).collect();
    let losses = outcomes.iter().filter(|o| o.loss > 0).count();
    (
        mean(&nets).expect("non-empty sample"),
        count_to_f64(losses) / count_to_f64(SAMPLE_SIZE),
    )
}

#[test]
fn deck_a_expected_net_tracks_payoff_table() {
    // 100 - 0.5 * mean([150, 200, 250, 300, 350])
    let (observed, loss_rate) = net_mean(DeckId::A, 0xA11CE);
    assert!(
        (observed - -25.0).abs() <= 6.0,
        "deck A net drifted: observed {observed:.3}"
    );
    assert!((loss_rate - 0.5).abs() <= 0.02, "loss rate {loss_rate:.4}");
}

#[test]
fn deck_d_expected_net_tracks_payoff_table() {
    // 50 - 0.1 * 250
    let (observed, loss_rate) = net_mean(DeckId::D, 0xD0D0);
    assert!(
        (observed - 25.0).abs() <= 3.0,
        "deck D net drifted: observed {observed:.3}"
    );
    assert!((loss_rate - 0.1).abs() <= 0.015, "loss rate {loss_rate:.4}");
}

#[test]
fn advantageous_decks_outperform_over_a_full_schedule() {
    let mut rng = ChaCha20Rng::seed_from_u64(17);
    let schedule = OutcomeSchedule::generate(&DeckTable::default(), SAMPLE_SIZE, &mut rng);
    let total = |deck: DeckId| -> i64 { schedule.sequence(deck).iter().map(|o| o.net).sum() };
    for good in [DeckId::C, DeckId::D] {
        for bad in [DeckId::A, DeckId::B] {
            assert!(
                total(good) > total(bad),
                "deck {good} should beat deck {bad}"
            );
        }
    }
}
