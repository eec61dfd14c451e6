//! Error taxonomy shared by both task engines.
use thiserror::Error;

use crate::igt::DeckId;

/// Configuration invariants violated before a session can start.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("item count {items} exceeds the {cells} cells of a {grid}x{grid} grid")]
    TooManyItems { items: usize, grid: usize, cells: usize },
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: usize,
        value: usize,
    },
    #[error("grid size {grid} exceeds the {max}x{max} maximum")]
    GridTooLarge { grid: usize, max: usize },
    #[error("{field} must be positive and finite (got {value:.3})")]
    NonPositiveDuration { field: &'static str, value: f64 },
    #[error("{field} must be between 0 and 1 (got {value:.3})")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },
    #[error("deck {deck} has loss frequency {frequency:.2} but no loss values")]
    EmptyLossValues { deck: DeckId, frequency: f64 },
    #[error("block count {blocks} exceeds trial count {trials}")]
    BlocksExceedTrials { blocks: usize, trials: usize },
    #[error("stimulus size {stimulus} does not fit a cell of {cell} px")]
    StimulusTooLarge { stimulus: i32, cell: i32 },
    #[error("deck {deck} schedule holds {len} outcomes for {trials} trials")]
    ScheduleTooShort {
        deck: DeckId,
        len: usize,
        trials: usize,
    },
}

/// Errors surfaced by a running session.
#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no precomputed outcome for deck {deck} at trial {trial}")]
    OutcomeSlotMissing { deck: DeckId, trial: usize },
    #[error("repeated configuration {index} is outside a pool of {pool}")]
    RepeatedIndexOutOfRange { index: usize, pool: usize },
}
