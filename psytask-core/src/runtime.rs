//! Cooperative session loop shared by both tasks.
//!
//! One iteration polls the host for input, feeds it to the session, advances
//! timed phases against the clock, presents the new snapshot, then waits for
//! the host's frame pacing. The trial log is persisted on every exit path.
use std::error::Error as StdError;

use thiserror::Error;

use crate::SessionStorage;
use crate::error::SessionError;
use crate::input::{Clock, InputEvent};
use crate::machine::Experiment;

/// Frame cadence hosts are expected to pace the loop at.
pub const TARGET_FPS: u32 = 60;

/// Rendering and input collaborator driving a session.
pub trait Host<V> {
    type Error: StdError + Send + Sync + 'static;

    /// Drain pending input events. `now` is the loop's current clock reading.
    ///
    /// # Errors
    ///
    /// Returns an error when the host can no longer deliver input.
    fn poll_events(&mut self, now: f64) -> Result<Vec<InputEvent>, Self::Error>;

    /// Draw the snapshot for the current phase.
    ///
    /// # Errors
    ///
    /// Returns an error when presentation fails.
    fn present(&mut self, view: &V) -> Result<(), Self::Error>;

    /// Block until the next frame is due.
    ///
    /// # Errors
    ///
    /// Returns an error when frame pacing fails.
    fn wait_frame(&mut self) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum RunError<H, P>
where
    H: StdError + 'static,
    P: StdError + 'static,
{
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("host failed")]
    Host(#[source] H),
    #[error("persisting the trial log failed")]
    Storage(#[source] P),
}

/// How a finished loop left the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub completed_trials: usize,
    pub planned_trials: usize,
    pub aborted: bool,
}

impl SessionOutcome {
    fn of<S: Experiment>(session: &S) -> Self {
        Self {
            completed_trials: session.completed_trials(),
            planned_trials: session.planned_trials(),
            aborted: session.was_aborted(),
        }
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        !self.aborted && self.completed_trials == self.planned_trials
    }
}

/// Persists the log when dropped unless `finish` already did.
struct PersistOnExit<'a, S: Experiment, St: SessionStorage> {
    session: &'a mut S,
    storage: &'a St,
    done: bool,
}

impl<'a, S: Experiment, St: SessionStorage> PersistOnExit<'a, S, St> {
    fn new(session: &'a mut S, storage: &'a St) -> Self {
        Self {
            session,
            storage,
            done: false,
        }
    }

    fn finish(mut self) -> Result<(), St::Error> {
        self.done = true;
        self.session.persist(self.storage)
    }
}

impl<S: Experiment, St: SessionStorage> Drop for PersistOnExit<'_, S, St> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        log::warn!(
            "session loop exited early in {:?}; saving {} trials",
            self.session.phase(),
            self.session.completed_trials()
        );
        if let Err(err) = self.session.persist(self.storage) {
            log::error!("failed to persist partial trial log: {err}");
        }
    }
}

/// Drive `session` until it closes.
///
/// # Errors
///
/// Returns `RunError::Host` or `RunError::Session` when the loop stops
/// early; the partial log has been persisted on a best-effort basis by then.
/// Returns `RunError::Storage` when the final save fails.
pub fn run_session<S, H, C, St>(
    session: &mut S,
    host: &mut H,
    clock: &C,
    storage: &St,
) -> Result<SessionOutcome, RunError<H::Error, St::Error>>
where
    S: Experiment,
    H: Host<S::View>,
    C: Clock + ?Sized,
    St: SessionStorage,
{
    let mut guard = PersistOnExit::new(session, storage);
    host.present(&guard.session.view()).map_err(RunError::Host)?;

    while !guard.session.is_closed() {
        let now = clock.now();
        for event in host.poll_events(now).map_err(RunError::Host)? {
            guard.session.handle_event(&event, now)?;
            if guard.session.is_closed() {
                break;
            }
        }
        if guard.session.is_closed() {
            break;
        }
        guard.session.tick(clock.now())?;
        host.present(&guard.session.view()).map_err(RunError::Host)?;
        host.wait_frame().map_err(RunError::Host)?;
    }

    let outcome = SessionOutcome::of(&*guard.session);
    log::info!(
        "session closed: {}/{} trials, aborted={}",
        outcome.completed_trials,
        outcome.planned_trials,
        outcome.aborted
    );
    guard.finish().map_err(RunError::Storage)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::igt::{DeckId, IgtConfig, IgtReport, IgtSession, IgtTrialRecord, IgtView};
    use crate::input::{Key, ManualClock};
    use crate::{CctSummary, CctTrialRecord};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::convert::Infallible;
    use std::fmt;

    #[derive(Default)]
    struct CountingStorage {
        igt_saves: RefCell<Vec<usize>>,
    }

    impl SessionStorage for CountingStorage {
        type Error = Infallible;

        fn save_cct(
            &self,
            _participant: &str,
            _records: &[CctTrialRecord],
            _summary: &CctSummary,
        ) -> Result<(), Self::Error> {
            Ok(())
        }

        fn save_igt(
            &self,
            _participant: &str,
            records: &[IgtTrialRecord],
            _report: &IgtReport,
        ) -> Result<(), Self::Error> {
            self.igt_saves.borrow_mut().push(records.len());
            Ok(())
        }
    }

    #[derive(Debug)]
    struct HostGone;

    impl fmt::Display for HostGone {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("host gone")
        }
    }

    impl StdError for HostGone {}

    /// Clicks deck C whenever the main screen is up; fails after `fail_after`
    /// frames when set.
    struct DeckClicker {
        clock: ManualClock,
        pending: VecDeque<InputEvent>,
        frames: usize,
        fail_after: Option<usize>,
    }

    impl DeckClicker {
        fn new(clock: ManualClock, fail_after: Option<usize>) -> Self {
            Self {
                clock,
                pending: VecDeque::from([InputEvent::key(Key::Space)]),
                frames: 0,
                fail_after,
            }
        }
    }

    impl Host<IgtView> for DeckClicker {
        type Error = HostGone;

        fn poll_events(&mut self, _now: f64) -> Result<Vec<InputEvent>, HostGone> {
            Ok(self.pending.drain(..).collect())
        }

        fn present(&mut self, view: &IgtView) -> Result<(), HostGone> {
            match view {
                IgtView::Main { decks, .. } => {
                    if let Some((_, rect)) = decks.iter().find(|(deck, _)| *deck == DeckId::C) {
                        let center = rect.center();
                        self.pending
                            .push_back(InputEvent::click(center.x, center.y));
                    }
                }
                IgtView::Results { .. } => self.pending.push_back(InputEvent::key(Key::Space)),
                _ => {}
            }
            Ok(())
        }

        fn wait_frame(&mut self) -> Result<(), HostGone> {
            self.frames += 1;
            if self.fail_after.is_some_and(|limit| self.frames >= limit) {
                return Err(HostGone);
            }
            self.clock.advance(1.0 / f64::from(TARGET_FPS));
            Ok(())
        }
    }

    fn config() -> IgtConfig {
        IgtConfig {
            trial_count: 5,
            block_count: 1,
            feedback_duration: 0.25,
            ..IgtConfig::default()
        }
    }

    #[test]
    fn completed_session_is_persisted_once() {
        let clock = ManualClock::starting_at(0.0);
        let mut host = DeckClicker::new(clock.clone(), None);
        let storage = CountingStorage::default();
        let mut session = IgtSession::new(config(), 21, Some("loop".into())).unwrap();

        let outcome = run_session(&mut session, &mut host, &clock, &storage).unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.completed_trials, 5);
        assert_eq!(*storage.igt_saves.borrow(), vec![5]);
        assert_eq!(session.summary().net_score, 5);
        assert!(clock.now() > 4.0 * 0.25);
    }

    #[test]
    fn host_failure_still_persists_partial_log() {
        let clock = ManualClock::starting_at(0.0);
        // Twenty frames cover the first pick but not the whole session.
        let mut host = DeckClicker::new(clock.clone(), Some(20));
        let storage = CountingStorage::default();
        let mut session = IgtSession::new(config(), 21, Some("loop".into())).unwrap();

        let result = run_session(&mut session, &mut host, &clock, &storage);
        assert!(matches!(result, Err(RunError::Host(HostGone))));
        assert_eq!(storage.igt_saves.borrow().len(), 1);
        assert!(storage.igt_saves.borrow()[0] > 0);
        assert!(storage.igt_saves.borrow()[0] < 5);
    }
}
