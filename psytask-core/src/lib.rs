//! Psytask Engine
//!
//! Platform-agnostic trial sequencing for two cognitive experiments: the
//! contextual cueing task (visual search over repeated and novel layouts) and
//! the Iowa gambling task (choices between four payoff decks).
//! This crate has no rendering, window, or file dependencies; hosts feed it
//! abstract input events and receive render snapshots and trial logs.

pub mod cct;
pub mod entry;
pub mod error;
pub mod geometry;
pub mod igt;
pub mod input;
pub mod machine;
pub mod numbers;
pub mod rng;
pub mod runtime;

// Re-export commonly used types
pub use cct::{
    BlockMeans, CctConfig, CctPhase, CctSession, CctSummary, CctTrialRecord, CctView, ConfigId,
    Configuration, GridCell, ItemKind, ItemView, RepeatedPool, Rotation, render_text_report,
};
pub use entry::{ANONYMOUS_PARTICIPANT, EntryBuffer, MAX_PARTICIPANT_ID_LEN};
pub use error::{ConfigError, SessionError};
pub use geometry::{Point, Rect};
pub use igt::{
    DeckId, DeckSpec, DeckTable, FeedbackView, IgtConfig, IgtPhase, IgtReport, IgtSession,
    IgtSummary, IgtTrialRecord, IgtView, Outcome, OutcomeSchedule,
};
pub use input::{Clock, InputEvent, Key, ManualClock, SystemClock};
pub use machine::{Experiment, PhaseHandler};
pub use rng::RngBundle;
pub use runtime::{Host, RunError, SessionOutcome, TARGET_FPS, run_session};

/// Trait for abstracting result persistence
/// Platform-specific implementations should provide this
pub trait SessionStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save a contextual cueing trial log with its summary
    ///
    /// # Errors
    ///
    /// Returns an error if the log or report cannot be written.
    fn save_cct(
        &self,
        participant: &str,
        records: &[CctTrialRecord],
        summary: &CctSummary,
    ) -> Result<(), Self::Error>;

    /// Save a gambling task trial log with its results document
    ///
    /// # Errors
    ///
    /// Returns an error if the log or report cannot be written.
    fn save_igt(
        &self,
        participant: &str,
        records: &[IgtTrialRecord],
        report: &IgtReport,
    ) -> Result<(), Self::Error>;
}
