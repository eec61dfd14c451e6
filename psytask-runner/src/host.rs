//! Headless host that lets a simulated participant drive a session.
use std::collections::VecDeque;
use std::fmt::Debug;

use psytask_core::numbers::{count_to_f64, secs_to_frames};
use psytask_core::{Clock, Host, InputEvent, ManualClock, TARGET_FPS};
use thiserror::Error;

use crate::policy::{MAX_REACTION_SECS, ParticipantPolicy};

/// Ten simulated minutes at the frame cadence.
pub const DEFAULT_FRAME_BUDGET: u64 = 10 * 60 * TARGET_FPS as u64;

/// Screens outside the trial loop: id entry, instructions, results.
const SESSION_OVERHEAD_SECS: f64 = 8.0 * MAX_REACTION_SECS;

/// Frame budget for `trials` trials of at most `seconds_per_trial` each,
/// doubled so a slow but responsive participant never runs out.
#[must_use]
pub fn frame_budget(trials: usize, seconds_per_trial: f64) -> u64 {
    let seconds = count_to_f64(trials) * seconds_per_trial + SESSION_OVERHEAD_SECS;
    secs_to_frames(seconds, TARGET_FPS).saturating_mul(2)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("session still open after {frames} frames; the participant stopped responding")]
    FrameBudgetExhausted { frames: u64 },
}

/// Presents snapshots to a policy and replays its input on a virtual clock.
pub struct SimulatedHost<V> {
    clock: ManualClock,
    policy: Box<dyn ParticipantPolicy<V>>,
    last_view: Option<V>,
    scheduled: VecDeque<(f64, InputEvent)>,
    abort_after: Option<usize>,
    answered: usize,
    frames: u64,
    max_frames: u64,
}

impl<V: Clone + PartialEq + Debug> SimulatedHost<V> {
    #[must_use]
    pub fn new(clock: ManualClock, policy: Box<dyn ParticipantPolicy<V>>) -> Self {
        Self {
            clock,
            policy,
            last_view: None,
            scheduled: VecDeque::new(),
            abort_after: None,
            answered: 0,
            frames: 0,
            max_frames: DEFAULT_FRAME_BUDGET,
        }
    }

    /// Close the window instead of answering once `trials` have been answered.
    #[must_use]
    pub fn abort_after(mut self, trials: Option<usize>) -> Self {
        self.abort_after = trials;
        self
    }

    #[must_use]
    pub fn with_frame_budget(mut self, frames: u64) -> Self {
        self.max_frames = frames;
        self
    }

    #[must_use]
    pub fn answered(&self) -> usize {
        self.answered
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn schedule(&mut self, at: f64, events: Vec<InputEvent>) {
        self.scheduled
            .extend(events.into_iter().map(|event| (at, event)));
    }
}

impl<V: Clone + PartialEq + Debug> Host<V> for SimulatedHost<V> {
    type Error = HostError;

    fn poll_events(&mut self, now: f64) -> Result<Vec<InputEvent>, HostError> {
        let mut due = Vec::new();
        while let Some((at, event)) = self.scheduled.front().copied() {
            if at > now {
                break;
            }
            self.scheduled.pop_front();
            due.push(event);
        }
        Ok(due)
    }

    fn present(&mut self, view: &V) -> Result<(), HostError> {
        if self.last_view.as_ref() == Some(view) {
            return Ok(());
        }
        self.last_view = Some(view.clone());
        log::trace!("{} sees {view:?}", self.policy.name());

        let Some(reaction) = self.policy.react(view) else {
            return Ok(());
        };
        let at = self.clock.now() + reaction.latency;
        if reaction.answers_trial {
            if self.abort_after.is_some_and(|limit| self.answered >= limit) {
                log::info!(
                    "{} closes the window after {} trials",
                    self.policy.name(),
                    self.answered
                );
                self.schedule(at, vec![InputEvent::WindowClose]);
                return Ok(());
            }
            self.answered += 1;
        }
        self.schedule(at, reaction.events);
        Ok(())
    }

    fn wait_frame(&mut self) -> Result<(), HostError> {
        self.frames += 1;
        if self.frames > self.max_frames {
            return Err(HostError::FrameBudgetExhausted {
                frames: self.max_frames,
            });
        }
        self.clock.advance(1.0 / f64::from(TARGET_FPS));
        Ok(())
    }
}
