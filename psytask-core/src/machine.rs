//! Phase-dispatched session state machines.
//!
//! Each engine tags its current phase with an enum and keeps one handler per
//! phase in a static table indexed by that enum. The table replaces chained
//! conditionals: adding a phase means adding a variant and a handler.
use std::fmt;

use crate::SessionStorage;
use crate::error::SessionError;
use crate::input::InputEvent;

/// Capability set every phase provides.
pub trait PhaseHandler<S: Experiment> {
    /// Snapshot of what the host should draw while this phase is active.
    fn render(&self, session: &S) -> S::View;

    /// React to one input event. Events that do not qualify are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error when trial generation fails while advancing.
    fn handle_event(
        &self,
        session: &mut S,
        event: &InputEvent,
        now: f64,
    ) -> Result<(), SessionError>;

    /// Advance timed phases once their deadline has passed.
    ///
    /// # Errors
    ///
    /// Returns an error when trial generation fails while advancing.
    fn maybe_advance(&self, _session: &mut S, _now: f64) -> Result<(), SessionError> {
        Ok(())
    }
}

/// A running experiment session as seen by the event loop.
pub trait Experiment {
    type Phase: Copy + Eq + fmt::Debug;
    type View;

    fn phase(&self) -> Self::Phase;

    /// True once the terminal screen was dismissed or the session aborted.
    fn is_closed(&self) -> bool;

    /// True when the session was cancelled before all trials were completed.
    fn was_aborted(&self) -> bool;

    /// Feed one input event into the current phase.
    ///
    /// # Errors
    ///
    /// Propagates trial-generation failures.
    fn handle_event(&mut self, event: &InputEvent, now: f64) -> Result<(), SessionError>;

    /// Poll timed phases against the clock.
    ///
    /// # Errors
    ///
    /// Propagates trial-generation failures.
    fn tick(&mut self, now: f64) -> Result<(), SessionError>;

    fn view(&self) -> Self::View;

    fn completed_trials(&self) -> usize;

    fn planned_trials(&self) -> usize;

    /// Hand the trial log and summary to the persistence collaborator.
    ///
    /// # Errors
    ///
    /// Returns the storage error unchanged.
    fn persist<St: SessionStorage>(&self, storage: &St) -> Result<(), St::Error>;
}
