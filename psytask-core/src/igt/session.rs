//! Iowa gambling task session controller.
//!
//! Phase flow: `ParticipantEntry -> Instructions -> Main`, then
//! `Main -> Feedback -> Main` for every pick except the last, which goes
//! straight to `Results`. Abort jumps to `Results` from anywhere.
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::SessionStorage;
use crate::entry::{ANONYMOUS_PARTICIPANT, EntryBuffer, EntryOutcome};
use crate::error::{ConfigError, SessionError};
use crate::geometry::Rect;
use crate::igt::config::{DeckId, IgtConfig};
use crate::igt::report::{IgtReport, IgtSummary, summarize};
use crate::igt::schedule::{Outcome, OutcomeSchedule};
use crate::input::{InputEvent, Key};
use crate::machine::{Experiment, PhaseHandler};
use crate::numbers::round_secs;
use crate::rng::RngBundle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgtPhase {
    ParticipantEntry,
    Instructions,
    Main,
    Feedback,
    Results,
}

impl IgtPhase {
    const fn index(self) -> usize {
        self as usize
    }
}

/// One completed pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgtTrialRecord {
    /// One-based trial number.
    pub trial: usize,
    pub deck: DeckId,
    pub reward: i64,
    pub loss: i64,
    pub net: i64,
    /// Running balance after this pick.
    pub balance: i64,
    /// Seconds from the decks becoming selectable to the click.
    pub reaction_time: f64,
}

/// Outcome panel shown between picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackView {
    pub deck: DeckId,
    pub outcome: Outcome,
    pub balance: i64,
}

/// Per-phase render snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum IgtView {
    ParticipantEntry {
        text: String,
    },
    Instructions {
        initial_balance: i64,
        start_button: Rect,
    },
    Main {
        balance: i64,
        trial: usize,
        trial_count: usize,
        decks: [(DeckId, Rect); 4],
    },
    Feedback(FeedbackView),
    Results {
        summary: IgtSummary,
        finish_button: Rect,
    },
}

#[derive(Debug, Clone)]
pub struct IgtSession {
    config: IgtConfig,
    participant: Option<String>,
    entry: EntryBuffer,
    schedule: OutcomeSchedule,
    positions: [DeckId; 4],
    deck_rects: [(DeckId, Rect); 4],
    phase: IgtPhase,
    phase_entered_at: f64,
    trial: usize,
    balance: i64,
    feedback: Option<FeedbackView>,
    records: Vec<IgtTrialRecord>,
    aborted: bool,
    closed: bool,
}

static HANDLERS: [&(dyn PhaseHandler<IgtSession> + Sync); 5] = [
    &EntryHandler,
    &InstructionsHandler,
    &MainHandler,
    &FeedbackHandler,
    &ResultsHandler,
];

fn handler(phase: IgtPhase) -> &'static (dyn PhaseHandler<IgtSession> + Sync) {
    HANDLERS[phase.index()]
}

impl IgtSession {
    /// Validate the configuration, precompute every deck's outcomes, and fix
    /// the on-screen deck order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the configuration is malformed.
    pub fn new(
        config: IgtConfig,
        seed: u64,
        participant: Option<String>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rngs = RngBundle::from_user_seed(seed);
        let schedule =
            OutcomeSchedule::generate(&config.decks, config.trial_count, rngs.schedule());
        let mut positions = DeckId::ALL;
        if config.shuffle_positions {
            positions.shuffle(rngs.placement());
        }
        log::info!(
            "igt session ready: seed {seed}, {} trials, deck order {positions:?}",
            config.trial_count
        );
        log::debug!("igt rng draws {:?}", rngs.draw_counts());
        Self::with_schedule(config, schedule, positions, participant)
    }

    /// Build a session over a caller-supplied schedule and deck order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ScheduleTooShort` when a deck's sequence does
    /// not cover every planned trial, or any validation error of the config.
    pub fn with_schedule(
        config: IgtConfig,
        schedule: OutcomeSchedule,
        positions: [DeckId; 4],
        participant: Option<String>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        for deck in DeckId::ALL {
            let len = schedule.sequence(deck).len();
            if len < config.trial_count {
                return Err(ConfigError::ScheduleTooShort {
                    deck,
                    len,
                    trials: config.trial_count,
                });
            }
        }
        let participant = participant.filter(|id| !id.trim().is_empty());
        let phase = if participant.is_some() {
            IgtPhase::Instructions
        } else {
            IgtPhase::ParticipantEntry
        };
        Ok(Self {
            deck_rects: config.deck_rects(&positions),
            balance: config.initial_balance,
            config,
            participant,
            entry: EntryBuffer::default(),
            schedule,
            positions,
            phase,
            phase_entered_at: 0.0,
            trial: 0,
            feedback: None,
            records: Vec::new(),
            aborted: false,
            closed: false,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &IgtConfig {
        &self.config
    }

    #[must_use]
    pub fn participant(&self) -> &str {
        self.participant.as_deref().unwrap_or(ANONYMOUS_PARTICIPANT)
    }

    #[must_use]
    pub const fn schedule(&self) -> &OutcomeSchedule {
        &self.schedule
    }

    /// Deck letters in on-screen order, left to right.
    #[must_use]
    pub const fn positions(&self) -> [DeckId; 4] {
        self.positions
    }

    #[must_use]
    pub const fn deck_rects(&self) -> &[(DeckId, Rect); 4] {
        &self.deck_rects
    }

    #[must_use]
    pub fn deck_rect(&self, deck: DeckId) -> Option<Rect> {
        self.deck_rects
            .iter()
            .find(|(id, _)| *id == deck)
            .map(|(_, rect)| *rect)
    }

    #[must_use]
    pub const fn balance(&self) -> i64 {
        self.balance
    }

    #[must_use]
    pub fn records(&self) -> &[IgtTrialRecord] {
        &self.records
    }

    #[must_use]
    pub fn summary(&self) -> IgtSummary {
        summarize(&self.records, &self.config)
    }

    #[must_use]
    pub fn report(&self) -> IgtReport {
        IgtReport::new(
            self.participant(),
            &self.summary(),
            self.positions,
            &self.config,
        )
    }

    fn enter(&mut self, phase: IgtPhase, now: f64) {
        log::debug!("igt phase {:?} -> {phase:?} at {now:.3}", self.phase);
        self.phase = phase;
        self.phase_entered_at = now;
        if phase == IgtPhase::Results {
            log::info!(
                "igt session over: {} of {} picks, balance {}",
                self.records.len(),
                self.config.trial_count,
                self.balance
            );
        }
    }

    fn abort(&mut self, now: f64) {
        log::info!(
            "igt session aborted in {:?} after {} picks",
            self.phase,
            self.records.len()
        );
        self.aborted = true;
        self.enter(IgtPhase::Results, now);
        self.closed = true;
    }

    fn deck_at(&self, event: &InputEvent) -> Option<DeckId> {
        let position = event.pointer()?;
        self.deck_rects
            .iter()
            .find(|(_, rect)| rect.contains(position))
            .map(|(deck, _)| *deck)
    }

    fn choose(&mut self, deck: DeckId, now: f64) -> Result<(), SessionError> {
        let outcome = self.schedule.draw(deck, self.trial)?;
        self.balance += outcome.net;
        let record = IgtTrialRecord {
            trial: self.trial + 1,
            deck,
            reward: outcome.reward,
            loss: outcome.loss,
            net: outcome.net,
            balance: self.balance,
            reaction_time: round_secs(now - self.phase_entered_at),
        };
        log::debug!(
            "igt trial {} deck {deck} net {} balance {} rt={:.3}",
            record.trial,
            record.net,
            record.balance,
            record.reaction_time
        );
        self.records.push(record);
        self.feedback = Some(FeedbackView {
            deck,
            outcome,
            balance: self.balance,
        });
        self.trial += 1;
        if self.trial >= self.config.trial_count {
            self.enter(IgtPhase::Results, now);
        } else {
            self.enter(IgtPhase::Feedback, now);
        }
        Ok(())
    }
}

struct EntryHandler;
struct InstructionsHandler;
struct MainHandler;
struct FeedbackHandler;
struct ResultsHandler;

impl PhaseHandler<IgtSession> for EntryHandler {
    fn render(&self, session: &IgtSession) -> IgtView {
        IgtView::ParticipantEntry {
            text: session.entry.text().to_string(),
        }
    }

    fn handle_event(
        &self,
        session: &mut IgtSession,
        event: &InputEvent,
        now: f64,
    ) -> Result<(), SessionError> {
        if let EntryOutcome::Confirmed(id) = session.entry.apply(event) {
            log::info!("igt participant id entered: {id}");
            session.participant = Some(id);
            session.enter(IgtPhase::Instructions, now);
        }
        Ok(())
    }
}

impl PhaseHandler<IgtSession> for InstructionsHandler {
    fn render(&self, session: &IgtSession) -> IgtView {
        IgtView::Instructions {
            initial_balance: session.config.initial_balance,
            start_button: session.config.start_button(),
        }
    }

    fn handle_event(
        &self,
        session: &mut IgtSession,
        event: &InputEvent,
        now: f64,
    ) -> Result<(), SessionError> {
        let clicked_start = event
            .pointer()
            .is_some_and(|point| session.config.start_button().contains(point));
        if event.is_key(Key::Space) || event.is_key(Key::Enter) || clicked_start {
            session.enter(IgtPhase::Main, now);
        }
        Ok(())
    }
}

impl PhaseHandler<IgtSession> for MainHandler {
    fn render(&self, session: &IgtSession) -> IgtView {
        IgtView::Main {
            balance: session.balance,
            trial: session.trial + 1,
            trial_count: session.config.trial_count,
            decks: session.deck_rects,
        }
    }

    fn handle_event(
        &self,
        session: &mut IgtSession,
        event: &InputEvent,
        now: f64,
    ) -> Result<(), SessionError> {
        match session.deck_at(event) {
            Some(deck) => session.choose(deck, now),
            None => Ok(()),
        }
    }
}

impl PhaseHandler<IgtSession> for FeedbackHandler {
    fn render(&self, session: &IgtSession) -> IgtView {
        let feedback = session.feedback.unwrap_or(FeedbackView {
            deck: DeckId::A,
            outcome: Outcome::new(0, 0),
            balance: session.balance,
        });
        IgtView::Feedback(feedback)
    }

    fn handle_event(
        &self,
        _session: &mut IgtSession,
        _event: &InputEvent,
        _now: f64,
    ) -> Result<(), SessionError> {
        Ok(())
    }

    fn maybe_advance(&self, session: &mut IgtSession, now: f64) -> Result<(), SessionError> {
        if now - session.phase_entered_at >= session.config.feedback_duration {
            session.enter(IgtPhase::Main, now);
        }
        Ok(())
    }
}

impl PhaseHandler<IgtSession> for ResultsHandler {
    fn render(&self, session: &IgtSession) -> IgtView {
        IgtView::Results {
            summary: session.summary(),
            finish_button: session.config.finish_button(),
        }
    }

    fn handle_event(
        &self,
        session: &mut IgtSession,
        event: &InputEvent,
        _now: f64,
    ) -> Result<(), SessionError> {
        let clicked_finish = event
            .pointer()
            .is_some_and(|point| session.config.finish_button().contains(point));
        if event.is_key(Key::Space) || event.is_abort() || clicked_finish {
            session.closed = true;
        }
        Ok(())
    }
}

impl Experiment for IgtSession {
    type Phase = IgtPhase;
    type View = IgtView;

    fn phase(&self) -> IgtPhase {
        self.phase
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn was_aborted(&self) -> bool {
        self.aborted
    }

    fn handle_event(&mut self, event: &InputEvent, now: f64) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        if event.is_abort() && self.phase != IgtPhase::Results {
            self.abort(now);
            return Ok(());
        }
        handler(self.phase).handle_event(self, event, now)
    }

    fn tick(&mut self, now: f64) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        handler(self.phase).maybe_advance(self, now)
    }

    fn view(&self) -> IgtView {
        handler(self.phase).render(self)
    }

    fn completed_trials(&self) -> usize {
        self.records.len()
    }

    fn planned_trials(&self) -> usize {
        self.config.trial_count
    }

    fn persist<St: SessionStorage>(&self, storage: &St) -> Result<(), St::Error> {
        if self.records.is_empty() {
            log::debug!("igt log empty; nothing to persist");
            return Ok(());
        }
        storage.save_igt(self.participant(), &self.records, &self.report())
    }
}
