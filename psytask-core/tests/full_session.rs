use psytask_core::cct::{generate_novel_configuration, summarize as summarize_cct};
use psytask_core::igt::summarize as summarize_igt;
use psytask_core::{
    CctConfig, CctSession, CctSummary, CctTrialRecord, CctView, ConfigId, DeckId, Experiment,
    GridCell, Host, IgtConfig, IgtReport, IgtSession, IgtTrialRecord, IgtView, InputEvent, Key,
    ManualClock, Outcome, OutcomeSchedule, SessionStorage, TARGET_FPS, run_session,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::convert::Infallible;
use std::rc::Rc;

#[derive(Default, Clone)]
struct MemoryStorage {
    cct: Rc<RefCell<Vec<(String, Vec<CctTrialRecord>, CctSummary)>>>,
    igt: Rc<RefCell<Vec<(String, Vec<IgtTrialRecord>, IgtReport)>>>,
}

impl SessionStorage for MemoryStorage {
    type Error = Infallible;

    fn save_cct(
        &self,
        participant: &str,
        records: &[CctTrialRecord],
        summary: &CctSummary,
    ) -> Result<(), Self::Error> {
        self.cct
            .borrow_mut()
            .push((participant.to_string(), records.to_vec(), summary.clone()));
        Ok(())
    }

    fn save_igt(
        &self,
        participant: &str,
        records: &[IgtTrialRecord],
        report: &IgtReport,
    ) -> Result<(), Self::Error> {
        self.igt
            .borrow_mut()
            .push((participant.to_string(), records.to_vec(), report.clone()));
        Ok(())
    }
}

/// Presses Space on every text screen and clicks the target once per trial.
/// With `close_at_break` set it closes the window on the first break instead.
struct TargetClicker {
    clock: ManualClock,
    pending: VecDeque<InputEvent>,
    last_trial: Option<(usize, usize)>,
    close_at_break: bool,
}

impl TargetClicker {
    fn new(clock: ManualClock, close_at_break: bool) -> Self {
        Self {
            clock,
            pending: VecDeque::new(),
            last_trial: None,
            close_at_break,
        }
    }
}

impl Host<CctView> for TargetClicker {
    type Error = Infallible;

    fn poll_events(&mut self, _now: f64) -> Result<Vec<InputEvent>, Infallible> {
        Ok(self.pending.drain(..).collect())
    }

    fn present(&mut self, view: &CctView) -> Result<(), Infallible> {
        match view {
            CctView::Break { .. } if self.close_at_break => {
                self.pending.push_back(InputEvent::WindowClose);
            }
            CctView::Welcome | CctView::Break { .. } | CctView::End => {
                self.pending.push_back(InputEvent::key(Key::Space));
            }
            CctView::Trial {
                items,
                block,
                trial,
                ..
            } => {
                if self.last_trial != Some((*block, *trial)) {
                    self.last_trial = Some((*block, *trial));
                    if let Some(target) = items
                        .iter()
                        .find(|item| item.kind == psytask_core::ItemKind::Target)
                    {
                        self.pending
                            .push_back(InputEvent::click(target.center.x, target.center.y));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn wait_frame(&mut self) -> Result<(), Infallible> {
        self.clock.advance(1.0 / f64::from(TARGET_FPS));
        Ok(())
    }
}

/// Walks through instructions, then picks decks from a script; aborts once
/// the script runs out.
struct ScriptedPicker {
    clock: ManualClock,
    pending: VecDeque<InputEvent>,
    script: VecDeque<DeckId>,
    armed: bool,
}

impl ScriptedPicker {
    fn new(clock: ManualClock, script: &[DeckId]) -> Self {
        Self {
            clock,
            pending: VecDeque::new(),
            script: script.iter().copied().collect(),
            armed: true,
        }
    }
}

impl Host<IgtView> for ScriptedPicker {
    type Error = Infallible;

    fn poll_events(&mut self, _now: f64) -> Result<Vec<InputEvent>, Infallible> {
        Ok(self.pending.drain(..).collect())
    }

    fn present(&mut self, view: &IgtView) -> Result<(), Infallible> {
        match view {
            IgtView::Instructions { .. } | IgtView::Results { .. } => {
                self.pending.push_back(InputEvent::key(Key::Enter));
                self.pending.push_back(InputEvent::key(Key::Space));
            }
            IgtView::Main { decks, .. } if self.armed => {
                self.armed = false;
                match self.script.pop_front() {
                    Some(deck) => {
                        let rect = decks
                            .iter()
                            .find(|(id, _)| *id == deck)
                            .map(|(_, rect)| *rect);
                        if let Some(rect) = rect {
                            let center = rect.center();
                            self.pending
                                .push_back(InputEvent::click(center.x, center.y));
                        }
                    }
                    None => self.pending.push_back(InputEvent::WindowClose),
                }
            }
            IgtView::Feedback(_) => self.armed = true,
            _ => {}
        }
        Ok(())
    }

    fn wait_frame(&mut self) -> Result<(), Infallible> {
        self.clock.advance(1.0 / f64::from(TARGET_FPS));
        Ok(())
    }
}

fn cells(config: &psytask_core::Configuration) -> HashSet<GridCell> {
    config.items().iter().map(|item| item.cell).collect()
}

#[test]
fn cct_layouts_differ_across_seeds() {
    let mut first = ChaCha20Rng::seed_from_u64(1);
    let mut second = ChaCha20Rng::seed_from_u64(2);
    let a = generate_novel_configuration(6, 12, &mut first).expect("layout");
    let b = generate_novel_configuration(6, 12, &mut second).expect("layout");
    assert_eq!(cells(&a).len(), 12);
    assert_eq!(cells(&b).len(), 12);
    assert_ne!(cells(&a), cells(&b));
}

#[test]
fn cct_synthetic_log_yields_documented_effect() {
    let record = |repeated: bool, rt: f64| CctTrialRecord {
        participant: "synthetic".to_string(),
        block: 1,
        trial: 1,
        configuration_id: if repeated {
            ConfigId::Repeated(0)
        } else {
            ConfigId::Novel
        },
        is_repeated: repeated,
        response_time: rt,
        is_correct: true,
        target_position: GridCell::new(1, 1),
    };
    let log = [
        record(true, 0.5),
        record(true, 0.7),
        record(false, 0.9),
        record(false, 1.1),
    ];
    let summary = summarize_cct(&log, 1);
    assert!((summary.mean_repeated.unwrap() - 0.6).abs() < 1e-9);
    assert!((summary.mean_novel.unwrap() - 1.0).abs() < 1e-9);
    assert!((summary.contextual_effect.unwrap() - 0.4).abs() < 1e-9);
    assert!((summary.accuracy_pct - 100.0).abs() < 1e-9);
}

#[test]
fn cct_session_runs_every_block_through_the_loop() {
    let config = CctConfig {
        repeated_pool_size: 3,
        novel_pool_size: 2,
        block_count: 3,
        ..CctConfig::default()
    };
    let clock = ManualClock::starting_at(0.0);
    let mut host = TargetClicker::new(clock.clone(), false);
    let storage = MemoryStorage::default();
    let mut session = CctSession::new(config, 2024, Some("loop".to_string())).unwrap();

    let outcome = run_session(&mut session, &mut host, &clock, &storage).unwrap();
    assert!(outcome.is_complete());
    assert_eq!(outcome.completed_trials, 15);

    let saved = storage.cct.borrow();
    assert_eq!(saved.len(), 1);
    let (participant, records, summary) = &saved[0];
    assert_eq!(participant, "loop");
    assert_eq!(records.len(), 15);
    assert!(records.iter().all(|r| r.is_correct));
    assert!((summary.accuracy_pct - 100.0).abs() < 1e-9);
    for (index, record) in records.iter().enumerate() {
        assert_eq!(record.block, index / 5 + 1);
        assert_eq!(record.trial, index % 5 + 1);
        assert!(record.response_time > 0.0);
        if record.trial > 3 {
            assert!(!record.is_repeated, "slot past the pool must be novel");
        }
    }
}

#[test]
fn cct_close_at_first_break_persists_only_block_one() {
    let config = CctConfig {
        repeated_pool_size: 3,
        novel_pool_size: 2,
        block_count: 3,
        ..CctConfig::default()
    };
    let clock = ManualClock::starting_at(0.0);
    let mut host = TargetClicker::new(clock.clone(), true);
    let storage = MemoryStorage::default();
    let mut session = CctSession::new(config, 77, Some("leaver".to_string())).unwrap();

    let outcome = run_session(&mut session, &mut host, &clock, &storage).unwrap();
    assert!(outcome.aborted);
    assert!(!outcome.is_complete());
    assert_eq!(outcome.completed_trials, 5);
    assert_eq!(outcome.planned_trials, 15);
    assert!(session.was_aborted());

    let saved = storage.cct.borrow();
    assert_eq!(saved.len(), 1);
    let (participant, records, summary) = &saved[0];
    assert_eq!(participant, "leaver");
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.block == 1));
    assert_eq!(summary.total_trials, 5);
}

#[test]
fn igt_forced_picks_replay_the_fixed_schedule() {
    let table_config = IgtConfig {
        trial_count: 4,
        block_count: 2,
        ..IgtConfig::default()
    };
    let schedule = OutcomeSchedule::from_sequences([
        vec![
            Outcome::new(100, 0),
            Outcome::new(100, 250),
            Outcome::new(100, 0),
            Outcome::new(100, 0),
        ],
        vec![
            Outcome::new(100, 0),
            Outcome::new(100, 1250),
            Outcome::new(100, 0),
            Outcome::new(100, 0),
        ],
        vec![
            Outcome::new(50, 0),
            Outcome::new(50, 0),
            Outcome::new(50, 25),
            Outcome::new(50, 0),
        ],
        vec![
            Outcome::new(50, 0),
            Outcome::new(50, 0),
            Outcome::new(50, 0),
            Outcome::new(50, 250),
        ],
    ]);
    let mut session = IgtSession::with_schedule(
        table_config,
        schedule.clone(),
        DeckId::ALL,
        Some("forced".to_string()),
    )
    .unwrap();
    let clock = ManualClock::starting_at(0.0);
    let mut host = ScriptedPicker::new(
        clock.clone(),
        &[DeckId::A, DeckId::B, DeckId::C, DeckId::D],
    );
    let storage = MemoryStorage::default();

    let outcome = run_session(&mut session, &mut host, &clock, &storage).unwrap();
    assert!(outcome.is_complete());

    let expected_nets: i64 = DeckId::ALL
        .into_iter()
        .enumerate()
        .map(|(trial, deck)| schedule.draw(deck, trial).unwrap().net)
        .sum();
    assert_eq!(expected_nets, 100 - 1150 + 25 - 200);
    assert_eq!(session.balance(), 2000 + expected_nets);

    let saved = storage.igt.borrow();
    let (_, records, report) = &saved[0];
    assert_eq!(report.dinheiro_final, 2000 + expected_nets);
    assert_eq!(report.pontuacao_liquida, 0);
    assert_eq!(report.pontuacoes_bloco, vec![-2, 2]);
    assert_eq!(
        records.iter().map(|r| r.deck).collect::<Vec<_>>(),
        DeckId::ALL.to_vec()
    );
}

#[test]
fn igt_net_score_matches_documented_example() {
    let records: Vec<IgtTrialRecord> = [DeckId::C, DeckId::C, DeckId::D, DeckId::A]
        .into_iter()
        .enumerate()
        .map(|(index, deck)| IgtTrialRecord {
            trial: index + 1,
            deck,
            reward: 0,
            loss: 0,
            net: 0,
            balance: 2000,
            reaction_time: 0.5,
        })
        .collect();
    let summary = summarize_igt(&records, &IgtConfig::default());
    assert_eq!(summary.net_score, 2);
}

#[test]
fn igt_abort_after_three_picks_persists_three_records() {
    let clock = ManualClock::starting_at(0.0);
    let mut host = ScriptedPicker::new(clock.clone(), &[DeckId::B, DeckId::C, DeckId::D]);
    let storage = MemoryStorage::default();
    let mut session = IgtSession::new(IgtConfig::default(), 31, Some("quit".into())).unwrap();

    let outcome = run_session(&mut session, &mut host, &clock, &storage).unwrap();
    assert!(outcome.aborted);
    assert!(!outcome.is_complete());
    assert_eq!(outcome.completed_trials, 3);
    assert_eq!(outcome.planned_trials, 100);
    assert!(session.was_aborted());

    let saved = storage.igt.borrow();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].1.len(), 3);
    assert_eq!(saved[0].2.escolhas_baralho[&DeckId::B], 1);
}
