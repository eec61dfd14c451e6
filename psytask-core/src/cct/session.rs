//! Contextual cueing session controller.
//!
//! Phase flow: `ParticipantEntry -> Welcome -> Fixation -> Trial`, then back to
//! `Fixation`, into `Break` at block boundaries, or `End` once every block is
//! done. `Break -> Fixation` on continue. Abort jumps to `End` from anywhere.
use serde::{Deserialize, Serialize};

use crate::SessionStorage;
use crate::cct::config::CctConfig;
use crate::cct::layout::{
    ConfigId, Configuration, GridCell, ItemKind, RepeatedPool, Rotation, TrialKind,
    generate_novel_configuration, select_trial_kind,
};
use crate::cct::report::{CctSummary, summarize};
use crate::entry::{ANONYMOUS_PARTICIPANT, EntryBuffer, EntryOutcome};
use crate::error::{ConfigError, SessionError};
use crate::geometry::Point;
use crate::input::{InputEvent, Key};
use crate::machine::{Experiment, PhaseHandler};
use crate::numbers::round_secs;
use crate::rng::RngBundle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CctPhase {
    ParticipantEntry,
    Welcome,
    Fixation,
    Trial,
    Break,
    End,
}

impl CctPhase {
    const fn index(self) -> usize {
        self as usize
    }
}

/// One completed search trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CctTrialRecord {
    pub participant: String,
    /// One-based block number.
    pub block: usize,
    /// One-based trial number within the block.
    pub trial: usize,
    pub configuration_id: ConfigId,
    pub is_repeated: bool,
    /// Seconds from display onset to the click, millisecond precision.
    pub response_time: f64,
    pub is_correct: bool,
    pub target_position: GridCell,
}

/// Item as the renderer should draw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemView {
    pub kind: ItemKind,
    pub cell: GridCell,
    pub rotation: Rotation,
    pub center: Point,
}

/// Per-phase render snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum CctView {
    ParticipantEntry {
        text: String,
    },
    Welcome,
    Fixation {
        center: Point,
    },
    Trial {
        items: Vec<ItemView>,
        block: usize,
        block_count: usize,
        trial: usize,
        trials_per_block: usize,
    },
    Break {
        completed_block: usize,
        block_count: usize,
    },
    End,
}

#[derive(Debug, Clone)]
pub struct CctSession {
    config: CctConfig,
    participant: Option<String>,
    entry: EntryBuffer,
    rngs: RngBundle,
    pool: RepeatedPool,
    phase: CctPhase,
    phase_entered_at: f64,
    block: usize,
    trial: usize,
    current: Option<Configuration>,
    records: Vec<CctTrialRecord>,
    aborted: bool,
    closed: bool,
}

static HANDLERS: [&(dyn PhaseHandler<CctSession> + Sync); 6] = [
    &EntryHandler,
    &WelcomeHandler,
    &FixationHandler,
    &TrialHandler,
    &BreakHandler,
    &EndHandler,
];

fn handler(phase: CctPhase) -> &'static (dyn PhaseHandler<CctSession> + Sync) {
    HANDLERS[phase.index()]
}

impl CctSession {
    /// Validate the configuration and generate the repeated pool.
    ///
    /// Starts in participant entry when no id is given, otherwise at welcome.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the configuration cannot produce a session.
    pub fn new(
        config: CctConfig,
        seed: u64,
        participant: Option<String>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rngs = RngBundle::from_user_seed(seed);
        let pool = RepeatedPool::generate(
            config.repeated_pool_size,
            config.grid_size,
            config.item_count,
            rngs.layout(),
        )?;
        let participant = participant.filter(|id| !id.trim().is_empty());
        let phase = if participant.is_some() {
            CctPhase::Welcome
        } else {
            CctPhase::ParticipantEntry
        };
        log::info!(
            "cct session ready: seed {seed}, {} blocks x {} trials, pool {}",
            config.block_count,
            config.trials_per_block(),
            pool.len()
        );
        Ok(Self {
            config,
            participant,
            entry: EntryBuffer::default(),
            rngs,
            pool,
            phase,
            phase_entered_at: 0.0,
            block: 0,
            trial: 0,
            current: None,
            records: Vec::new(),
            aborted: false,
            closed: false,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &CctConfig {
        &self.config
    }

    #[must_use]
    pub fn participant(&self) -> &str {
        self.participant.as_deref().unwrap_or(ANONYMOUS_PARTICIPANT)
    }

    #[must_use]
    pub const fn repeated_pool(&self) -> &RepeatedPool {
        &self.pool
    }

    /// Display of the trial in progress, if any.
    #[must_use]
    pub const fn current_configuration(&self) -> Option<&Configuration> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn records(&self) -> &[CctTrialRecord] {
        &self.records
    }

    /// Zero-based block counter.
    #[must_use]
    pub const fn block(&self) -> usize {
        self.block
    }

    /// Zero-based trial counter within the current block.
    #[must_use]
    pub const fn trial_in_block(&self) -> usize {
        self.trial
    }

    #[must_use]
    pub fn summary(&self) -> CctSummary {
        summarize(&self.records, self.config.block_count)
    }

    fn enter(&mut self, phase: CctPhase, now: f64) {
        log::debug!("cct phase {:?} -> {phase:?} at {now:.3}", self.phase);
        self.phase = phase;
        self.phase_entered_at = now;
        if phase == CctPhase::End {
            log::info!(
                "cct session over: {} of {} trials recorded, rng draws {:?}",
                self.records.len(),
                self.config.total_trials(),
                self.rngs.draw_counts()
            );
        }
    }

    fn abort(&mut self, now: f64) {
        log::info!(
            "cct session aborted in {:?} after {} trials",
            self.phase,
            self.records.len()
        );
        self.aborted = true;
        self.current = None;
        self.enter(CctPhase::End, now);
        self.closed = true;
    }

    fn prepare_trial(&mut self) -> Result<(), SessionError> {
        let kind = select_trial_kind(
            self.trial,
            self.pool.len(),
            self.config.novel_probability,
            self.rngs.selection(),
        );
        let configuration = match kind {
            TrialKind::Repeated(index) => self.pool.select(index)?.clone(),
            TrialKind::Novel => generate_novel_configuration(
                self.config.grid_size,
                self.config.item_count,
                self.rngs.layout(),
            )?,
        };
        self.current = Some(configuration);
        Ok(())
    }

    /// Item under the pointer. Items do not overlap, so order only matters
    /// for configurations with an oversized stimulus.
    fn hit_item(&self, position: Point) -> Option<ItemKind> {
        let configuration = self.current.as_ref()?;
        let radius = self.config.hit_radius();
        configuration
            .items()
            .iter()
            .find(|item| {
                self.config
                    .cell_center(item.cell.column, item.cell.row)
                    .within_radius(position, radius)
            })
            .map(|item| item.kind)
    }

    fn record_response(&mut self, is_correct: bool, now: f64) {
        let Some(configuration) = self.current.take() else {
            return;
        };
        let record = CctTrialRecord {
            participant: self.participant().to_string(),
            block: self.block + 1,
            trial: self.trial + 1,
            configuration_id: configuration.id(),
            is_repeated: configuration.is_repeated(),
            response_time: round_secs(now - self.phase_entered_at),
            is_correct,
            target_position: configuration.target().cell,
        };
        log::debug!(
            "cct trial {}.{} config {} correct={} rt={:.3}",
            record.block,
            record.trial,
            record.configuration_id,
            record.is_correct,
            record.response_time
        );
        self.records.push(record);
    }

    fn next_trial(&mut self, now: f64) {
        self.trial += 1;
        if self.trial >= self.config.trials_per_block() {
            self.trial = 0;
            self.block += 1;
            if self.block < self.config.block_count {
                self.enter(CctPhase::Break, now);
            } else {
                self.enter(CctPhase::End, now);
            }
        } else {
            self.enter(CctPhase::Fixation, now);
        }
    }
}

struct EntryHandler;
struct WelcomeHandler;
struct FixationHandler;
struct TrialHandler;
struct BreakHandler;
struct EndHandler;

impl PhaseHandler<CctSession> for EntryHandler {
    fn render(&self, session: &CctSession) -> CctView {
        CctView::ParticipantEntry {
            text: session.entry.text().to_string(),
        }
    }

    fn handle_event(
        &self,
        session: &mut CctSession,
        event: &InputEvent,
        now: f64,
    ) -> Result<(), SessionError> {
        if let EntryOutcome::Confirmed(id) = session.entry.apply(event) {
            log::info!("cct participant id entered: {id}");
            session.participant = Some(id);
            session.enter(CctPhase::Welcome, now);
        }
        Ok(())
    }
}

impl PhaseHandler<CctSession> for WelcomeHandler {
    fn render(&self, _session: &CctSession) -> CctView {
        CctView::Welcome
    }

    fn handle_event(
        &self,
        session: &mut CctSession,
        event: &InputEvent,
        now: f64,
    ) -> Result<(), SessionError> {
        if event.is_key(Key::Space) {
            session.enter(CctPhase::Fixation, now);
        }
        Ok(())
    }
}

impl PhaseHandler<CctSession> for FixationHandler {
    fn render(&self, session: &CctSession) -> CctView {
        CctView::Fixation {
            center: Point::new(
                session.config.screen_width / 2,
                session.config.screen_height / 2,
            ),
        }
    }

    fn handle_event(
        &self,
        _session: &mut CctSession,
        _event: &InputEvent,
        _now: f64,
    ) -> Result<(), SessionError> {
        Ok(())
    }

    fn maybe_advance(&self, session: &mut CctSession, now: f64) -> Result<(), SessionError> {
        if now - session.phase_entered_at >= session.config.fixation_duration {
            session.prepare_trial()?;
            session.enter(CctPhase::Trial, now);
        }
        Ok(())
    }
}

impl PhaseHandler<CctSession> for TrialHandler {
    fn render(&self, session: &CctSession) -> CctView {
        let items = session
            .current
            .as_ref()
            .map(|configuration| {
                configuration
                    .items()
                    .iter()
                    .map(|item| ItemView {
                        kind: item.kind,
                        cell: item.cell,
                        rotation: item.rotation,
                        center: session.config.cell_center(item.cell.column, item.cell.row),
                    })
                    .collect()
            })
            .unwrap_or_default();
        CctView::Trial {
            items,
            block: session.block + 1,
            block_count: session.config.block_count,
            trial: session.trial + 1,
            trials_per_block: session.config.trials_per_block(),
        }
    }

    fn handle_event(
        &self,
        session: &mut CctSession,
        event: &InputEvent,
        now: f64,
    ) -> Result<(), SessionError> {
        let Some(position) = event.pointer() else {
            return Ok(());
        };
        let Some(kind) = session.hit_item(position) else {
            return Ok(());
        };
        session.record_response(kind == ItemKind::Target, now);
        session.next_trial(now);
        Ok(())
    }
}

impl PhaseHandler<CctSession> for BreakHandler {
    fn render(&self, session: &CctSession) -> CctView {
        CctView::Break {
            completed_block: session.block,
            block_count: session.config.block_count,
        }
    }

    fn handle_event(
        &self,
        session: &mut CctSession,
        event: &InputEvent,
        now: f64,
    ) -> Result<(), SessionError> {
        if event.is_key(Key::Space) {
            session.enter(CctPhase::Fixation, now);
        }
        Ok(())
    }
}

impl PhaseHandler<CctSession> for EndHandler {
    fn render(&self, _session: &CctSession) -> CctView {
        CctView::End
    }

    fn handle_event(
        &self,
        session: &mut CctSession,
        event: &InputEvent,
        _now: f64,
    ) -> Result<(), SessionError> {
        if event.is_key(Key::Space) || event.is_abort() {
            session.closed = true;
        }
        Ok(())
    }
}

impl Experiment for CctSession {
    type Phase = CctPhase;
    type View = CctView;

    fn phase(&self) -> CctPhase {
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
        if event.is_abort() && self.phase != CctPhase::End {
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

    fn view(&self) -> CctView {
        handler(self.phase).render(self)
    }

    fn completed_trials(&self) -> usize {
        self.records.len()
    }

    fn planned_trials(&self) -> usize {
        self.config.total_trials()
    }

    fn persist<St: SessionStorage>(&self, storage: &St) -> Result<(), St::Error> {
        if self.records.is_empty() {
            log::debug!("cct log empty; nothing to persist");
            return Ok(());
        }
        storage.save_cct(self.participant(), &self.records, &self.summary())
    }
}
