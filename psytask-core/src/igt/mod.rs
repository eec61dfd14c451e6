//! Iowa gambling task: repeated choices between four payoff decks.
pub mod config;
pub mod report;
pub mod schedule;
pub mod session;

pub use config::{DeckId, DeckSpec, DeckTable, IgtConfig};
pub use report::{DeckPayoff, IgtReport, IgtSummary, ReportSettings, summarize};
pub use schedule::{Outcome, OutcomeSchedule};
pub use session::{FeedbackView, IgtPhase, IgtSession, IgtTrialRecord, IgtView};
