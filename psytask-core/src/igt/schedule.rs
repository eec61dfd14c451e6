//! Precomputed outcome sequences, one per deck.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::igt::config::{DeckId, DeckSpec, DeckTable};

/// Result of one pick: `net == reward - loss`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub reward: i64,
    pub loss: i64,
    pub net: i64,
}

impl Outcome {
    #[must_use]
    pub const fn new(reward: i64, loss: i64) -> Self {
        Self {
            reward,
            loss,
            net: reward - loss,
        }
    }
}

/// Sample `trial_count` outcomes for one deck.
///
/// Each slot draws a Bernoulli loss event at the deck's frequency and, on a
/// hit, a magnitude uniformly from its loss values.
pub fn generate<R: Rng + ?Sized>(
    spec: &DeckSpec,
    trial_count: usize,
    rng: &mut R,
) -> Vec<Outcome> {
    (0..trial_count)
        .map(|_| {
            let loss = if rng.r#gen::<f64>() < spec.loss_frequency {
                spec.loss_values.choose(rng).copied().unwrap_or(0)
            } else {
                0
            };
            Outcome::new(spec.reward, loss)
        })
        .collect()
}

/// Every deck's outcome for every trial slot, fixed before the first pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSchedule {
    sequences: [Vec<Outcome>; 4],
}

impl OutcomeSchedule {
    /// Generate sequences for A, B, C and D in that order from one stream.
    pub fn generate<R: Rng + ?Sized>(decks: &DeckTable, trial_count: usize, rng: &mut R) -> Self {
        let sequences = DeckId::ALL.map(|deck| generate(decks.get(deck), trial_count, rng));
        log::debug!("outcome schedule generated for {trial_count} trials per deck");
        Self { sequences }
    }

    /// Build a schedule from explicit sequences, indexed by `DeckId::index`.
    #[must_use]
    pub const fn from_sequences(sequences: [Vec<Outcome>; 4]) -> Self {
        Self { sequences }
    }

    #[must_use]
    pub fn sequence(&self, deck: DeckId) -> &[Outcome] {
        &self.sequences[deck.index()]
    }

    /// Replay the stored outcome for `(deck, trial)`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::OutcomeSlotMissing` past the generated length.
    pub fn draw(&self, deck: DeckId, trial: usize) -> Result<Outcome, SessionError> {
        self.sequence(deck)
            .get(trial)
            .copied()
            .ok_or(SessionError::OutcomeSlotMissing { deck, trial })
    }
}
