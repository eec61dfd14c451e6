//! Contextual cueing task: visual search over repeated and novel layouts.
pub mod config;
pub mod layout;
pub mod report;
pub mod session;

pub use config::CctConfig;
pub use layout::{
    ConfigId, Configuration, GridCell, Item, ItemKind, RepeatedPool, Rotation, TrialKind,
    generate_configuration, generate_novel_configuration, select_trial_kind,
};
pub use report::{BlockMeans, CctSummary, render_text_report, summarize};
pub use session::{CctPhase, CctSession, CctTrialRecord, CctView, ItemView};
