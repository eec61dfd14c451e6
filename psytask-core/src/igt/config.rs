//! Iowa gambling task parameters and the deck payoff table.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::Rect;

pub const DECK_WIDTH: i32 = 160;
pub const DECK_HEIGHT: i32 = 240;
pub const DECK_MARGIN: i32 = 40;
pub const BUTTON_WIDTH: i32 = 200;
pub const BUTTON_HEIGHT: i32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeckId {
    A,
    B,
    C,
    D,
}

impl DeckId {
    pub const ALL: [Self; 4] = [Self::A, Self::B, Self::C, Self::D];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// C and D pay less per card but lose far less over time.
    #[must_use]
    pub const fn is_advantageous(self) -> bool {
        matches!(self, Self::C | Self::D)
    }

    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
        }
    }
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Static payoff rule for one deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckSpec {
    /// Gained on every pick.
    pub reward: i64,
    /// Probability that a pick also carries a loss.
    pub loss_frequency: f64,
    /// Loss magnitudes, drawn uniformly when a loss occurs.
    pub loss_values: Vec<i64>,
}

impl DeckSpec {
    #[must_use]
    pub fn new(reward: i64, loss_frequency: f64, loss_values: &[i64]) -> Self {
        Self {
            reward,
            loss_frequency,
            loss_values: loss_values.to_vec(),
        }
    }

    fn validate(&self, deck: DeckId) -> Result<(), ConfigError> {
        if !self.loss_frequency.is_finite() || !(0.0..=1.0).contains(&self.loss_frequency) {
            return Err(ConfigError::ProbabilityOutOfRange {
                field: "loss_frequency",
                value: self.loss_frequency,
            });
        }
        if self.loss_frequency > 0.0 && self.loss_values.is_empty() {
            return Err(ConfigError::EmptyLossValues {
                deck,
                frequency: self.loss_frequency,
            });
        }
        Ok(())
    }
}

/// The four payoff rules, keyed by deck letter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckTable {
    #[serde(rename = "A")]
    pub a: DeckSpec,
    #[serde(rename = "B")]
    pub b: DeckSpec,
    #[serde(rename = "C")]
    pub c: DeckSpec,
    #[serde(rename = "D")]
    pub d: DeckSpec,
}

impl DeckTable {
    #[must_use]
    pub const fn get(&self, deck: DeckId) -> &DeckSpec {
        match deck {
            DeckId::A => &self.a,
            DeckId::B => &self.b,
            DeckId::C => &self.c,
            DeckId::D => &self.d,
        }
    }
}

impl Default for DeckTable {
    fn default() -> Self {
        Self {
            a: DeckSpec::new(100, 0.5, &[150, 200, 250, 300, 350]),
            b: DeckSpec::new(100, 0.1, &[1250]),
            c: DeckSpec::new(50, 0.5, &[25, 50, 75]),
            d: DeckSpec::new(50, 0.1, &[250]),
        }
    }
}

/// Immutable parameters for one gambling session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgtConfig {
    #[serde(default = "IgtConfig::default_trial_count")]
    pub trial_count: usize,
    /// Blocks used only for the per-block score; picks past
    /// `block_count * (trial_count / block_count)` fall outside every block.
    #[serde(default = "IgtConfig::default_block_count")]
    pub block_count: usize,
    #[serde(default = "IgtConfig::default_initial_balance")]
    pub initial_balance: i64,
    /// Seconds the feedback panel stays up after each pick.
    #[serde(default = "IgtConfig::default_feedback_duration")]
    pub feedback_duration: f64,
    #[serde(default)]
    pub decks: DeckTable,
    /// Shuffle the on-screen deck order with the session seed.
    #[serde(default)]
    pub shuffle_positions: bool,
    #[serde(default = "IgtConfig::default_screen_width")]
    pub screen_width: i32,
    #[serde(default = "IgtConfig::default_screen_height")]
    pub screen_height: i32,
}

impl IgtConfig {
    #[must_use]
    pub const fn default_trial_count() -> usize {
        100
    }

    #[must_use]
    pub const fn default_block_count() -> usize {
        5
    }

    #[must_use]
    pub const fn default_initial_balance() -> i64 {
        2000
    }

    #[must_use]
    pub const fn default_feedback_duration() -> f64 {
        1.5
    }

    #[must_use]
    pub const fn default_screen_width() -> i32 {
        1024
    }

    #[must_use]
    pub const fn default_screen_height() -> i32 {
        768
    }

    /// Trials per scoring block, by integer division.
    #[must_use]
    pub const fn trials_per_block(&self) -> usize {
        if self.block_count == 0 {
            return 0;
        }
        self.trial_count / self.block_count
    }

    /// Deck rectangles laid out left to right in `positions` order.
    #[must_use]
    pub fn deck_rects(&self, positions: &[DeckId; 4]) -> [(DeckId, Rect); 4] {
        let total_width = DECK_WIDTH * 4 + DECK_MARGIN * 3;
        let start_x = (self.screen_width - total_width).div_euclid(2);
        let y = (self.screen_height - DECK_HEIGHT).div_euclid(2);
        let mut slot = 0;
        (*positions).map(|deck| {
            let x = start_x + slot * (DECK_WIDTH + DECK_MARGIN);
            slot += 1;
            (deck, Rect::new(x, y, DECK_WIDTH, DECK_HEIGHT))
        })
    }

    /// Continue button on the instructions screen.
    #[must_use]
    pub const fn start_button(&self) -> Rect {
        self.button_at(self.screen_height - 120)
    }

    /// Finish button on the results screen.
    #[must_use]
    pub const fn finish_button(&self) -> Rect {
        self.button_at(self.screen_height - 100)
    }

    const fn button_at(&self, y: i32) -> Rect {
        Rect::new(
            (self.screen_width - BUTTON_WIDTH) / 2,
            y,
            BUTTON_WIDTH,
            BUTTON_HEIGHT,
        )
    }

    /// Validate configuration invariants before a session starts.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for zero trials or blocks, more blocks than
    /// trials, a non-positive feedback duration, or a malformed deck.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trial_count == 0 {
            return Err(ConfigError::MinViolation {
                field: "trial_count",
                min: 1,
                value: self.trial_count,
            });
        }
        if self.block_count == 0 {
            return Err(ConfigError::MinViolation {
                field: "block_count",
                min: 1,
                value: self.block_count,
            });
        }
        if self.block_count > self.trial_count {
            return Err(ConfigError::BlocksExceedTrials {
                blocks: self.block_count,
                trials: self.trial_count,
            });
        }
        if !self.feedback_duration.is_finite() || self.feedback_duration <= 0.0 {
            return Err(ConfigError::NonPositiveDuration {
                field: "feedback_duration",
                value: self.feedback_duration,
            });
        }
        for deck in DeckId::ALL {
            self.decks.get(deck).validate(deck)?;
        }
        Ok(())
    }
}

impl Default for IgtConfig {
    fn default() -> Self {
        Self {
            trial_count: Self::default_trial_count(),
            block_count: Self::default_block_count(),
            initial_balance: Self::default_initial_balance(),
            feedback_duration: Self::default_feedback_duration(),
            decks: DeckTable::default(),
            shuffle_positions: false,
            screen_width: Self::default_screen_width(),
            screen_height: Self::default_screen_height(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_classic_decks() {
        let cfg = IgtConfig::default();
        cfg.validate().expect("defaults are valid");
        assert_eq!(cfg.trials_per_block(), 20);
        assert_eq!(cfg.decks.get(DeckId::B).loss_values, vec![1250]);
        assert_eq!(cfg.decks.get(DeckId::C).reward, 50);
        assert!(DeckId::D.is_advantageous());
        assert!(!DeckId::A.is_advantageous());
    }

    #[test]
    fn deck_rects_are_centered_with_margins() {
        let cfg = IgtConfig::default();
        let rects = cfg.deck_rects(&DeckId::ALL);
        assert_eq!(rects[0], (DeckId::A, Rect::new(132, 264, 160, 240)));
        assert_eq!(rects[3].1.x, 132 + 3 * 200);
        assert_eq!(cfg.start_button(), Rect::new(412, 648, 200, 60));
        assert_eq!(cfg.finish_button().y, 668);
    }

    #[test]
    fn loss_frequency_without_values_is_rejected() {
        let mut cfg = IgtConfig::default();
        cfg.decks.b.loss_values.clear();
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::EmptyLossValues {
                deck: DeckId::B,
                frequency: 0.1
            })
        );

        cfg.decks.b.loss_frequency = 0.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn block_count_cannot_exceed_trials() {
        let cfg = IgtConfig {
            trial_count: 3,
            block_count: 4,
            ..IgtConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::BlocksExceedTrials {
                blocks: 4,
                trials: 3
            })
        );
    }

    #[test]
    fn json_overrides_merge_with_defaults() {
        let cfg: IgtConfig = serde_json::from_str(
            r#"{"trial_count": 40, "decks": {
                "A": {"reward": 100, "loss_frequency": 0.5, "loss_values": [150]},
                "B": {"reward": 100, "loss_frequency": 0.1, "loss_values": [1250]},
                "C": {"reward": 50, "loss_frequency": 0.5, "loss_values": [50]},
                "D": {"reward": 50, "loss_frequency": 0.1, "loss_values": [250]}
            }}"#,
        )
        .expect("deserialize");
        assert_eq!(cfg.trial_count, 40);
        assert_eq!(cfg.block_count, 5);
        assert_eq!(cfg.decks.a.loss_values, vec![150]);
        assert_eq!(DeckId::C.to_string(), "C");
    }
}
