use std::collections::HashMap;
use std::fmt;

use clap::ValueEnum;
use psytask_core::numbers::i64_to_f64;
use psytask_core::{CctView, DeckId, GridCell, IgtView, InputEvent, ItemKind, Key, Rect};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Input a simulated participant produces for one screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub events: Vec<InputEvent>,
    /// Seconds after the screen appeared.
    pub latency: f64,
    /// True when the events answer a trial.
    pub answers_trial: bool,
}

impl Reaction {
    fn screen(events: Vec<InputEvent>, latency: f64) -> Self {
        Self {
            events,
            latency,
            answers_trial: false,
        }
    }

    fn trial(event: InputEvent, latency: f64) -> Self {
        Self {
            events: vec![event],
            latency,
            answers_trial: true,
        }
    }
}

/// Policy interface for simulated participants.
pub trait ParticipantPolicy<V> {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Respond to a freshly presented screen, or wait.
    fn react(&mut self, view: &V) -> Option<Reaction>;
}

/// Keystrokes that type `id` and confirm it.
fn type_id(id: &str) -> Vec<InputEvent> {
    id.chars()
        .map(|c| {
            if c == ' ' {
                InputEvent::key(Key::Space)
            } else {
                InputEvent::key(Key::Char(c))
            }
        })
        .chain(std::iter::once(InputEvent::key(Key::Enter)))
        .collect()
}

fn click_rect(rect: Rect) -> InputEvent {
    let center = rect.center();
    InputEvent::click(center.x, center.y)
}

/// Built-in contextual cueing participants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum CctStrategy {
    /// Always finds the target
    Accurate,
    /// Clicks any item, target or not
    Sloppy,
    /// Finds the target faster on layouts seen before
    Learner,
}

impl CctStrategy {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            CctStrategy::Accurate => "Accurate",
            CctStrategy::Sloppy => "Sloppy",
            CctStrategy::Learner => "Learner",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64, entry_id: &str) -> Box<dyn ParticipantPolicy<CctView>> {
        let base = SimParticipant::new(seed, entry_id);
        match self {
            CctStrategy::Accurate => Box::new(AccurateSearcher { base }),
            CctStrategy::Sloppy => Box::new(SloppySearcher { base }),
            CctStrategy::Learner => Box::new(LayoutLearner {
                base,
                exposures: HashMap::new(),
            }),
        }
    }
}

impl fmt::Display for CctStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Built-in gambling task participants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum IgtStrategy {
    /// Picks decks uniformly at random
    Random,
    /// Only picks decks C and D
    Advantageous,
    /// Favors decks whose observed payoffs run positive
    Learner,
}

impl IgtStrategy {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            IgtStrategy::Random => "Random",
            IgtStrategy::Advantageous => "Advantageous",
            IgtStrategy::Learner => "Learner",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64, entry_id: &str) -> Box<dyn ParticipantPolicy<IgtView>> {
        let base = SimParticipant::new(seed, entry_id);
        match self {
            IgtStrategy::Random => Box::new(RandomGambler { base }),
            IgtStrategy::Advantageous => Box::new(SafeGambler { base }),
            IgtStrategy::Learner => Box::new(PayoffLearner {
                base,
                totals: [0; 4],
                picks: [0; 4],
            }),
        }
    }
}

impl fmt::Display for IgtStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Upper bound on any simulated reaction, in seconds.
pub const MAX_REACTION_SECS: f64 = 3.0;

/// State every simulated participant shares: an RNG for latencies and
/// choices, plus the id typed on the entry screen.
struct SimParticipant {
    rng: ChaCha20Rng,
    entry_id: String,
}

impl SimParticipant {
    fn new(seed: u64, entry_id: &str) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed ^ 0x5EED_CAFE),
            entry_id: entry_id.to_string(),
        }
    }

    fn latency(&mut self, low: f64, high: f64) -> f64 {
        self.rng.gen_range(low..high).min(MAX_REACTION_SECS)
    }

    fn read_and_continue(&mut self) -> Reaction {
        let latency = self.latency(0.3, 0.8);
        Reaction::screen(vec![InputEvent::key(Key::Space)], latency)
    }

    fn enter_id(&mut self) -> Reaction {
        let latency = self.latency(1.0, 2.0);
        Reaction::screen(type_id(&self.entry_id), latency)
    }

    /// Screens outside the search trials; `None` for a trial screen.
    fn cct_screen(&mut self, view: &CctView) -> Option<Option<Reaction>> {
        match view {
            CctView::ParticipantEntry { .. } => Some(Some(self.enter_id())),
            CctView::Welcome | CctView::Break { .. } | CctView::End => {
                Some(Some(self.read_and_continue()))
            }
            CctView::Fixation { .. } => Some(None),
            CctView::Trial { .. } => None,
        }
    }

    fn igt_screen(&mut self, view: &IgtView) -> Option<Option<Reaction>> {
        match view {
            IgtView::ParticipantEntry { .. } => Some(Some(self.enter_id())),
            IgtView::Instructions { start_button, .. } => {
                let latency = self.latency(1.0, MAX_REACTION_SECS);
                Some(Some(Reaction::screen(vec![click_rect(*start_button)], latency)))
            }
            IgtView::Results { finish_button, .. } => {
                let latency = self.latency(1.0, 2.0);
                Some(Some(Reaction::screen(vec![click_rect(*finish_button)], latency)))
            }
            IgtView::Feedback(_) => Some(None),
            IgtView::Main { .. } => None,
        }
    }
}

struct AccurateSearcher {
    base: SimParticipant,
}

struct SloppySearcher {
    base: SimParticipant,
}

struct LayoutLearner {
    base: SimParticipant,
    exposures: HashMap<Vec<GridCell>, u32>,
}

impl ParticipantPolicy<CctView> for AccurateSearcher {
    fn name(&self) -> &'static str {
        "Accurate"
    }

    fn react(&mut self, view: &CctView) -> Option<Reaction> {
        if let Some(reaction) = self.base.cct_screen(view) {
            return reaction;
        }
        let CctView::Trial { items, .. } = view else {
            return None;
        };
        let target = items.iter().find(|item| item.kind == ItemKind::Target)?;
        let latency = self.base.latency(0.6, 1.2);
        Some(Reaction::trial(
            InputEvent::click(target.center.x, target.center.y),
            latency,
        ))
    }
}

impl ParticipantPolicy<CctView> for SloppySearcher {
    fn name(&self) -> &'static str {
        "Sloppy"
    }

    fn react(&mut self, view: &CctView) -> Option<Reaction> {
        if let Some(reaction) = self.base.cct_screen(view) {
            return reaction;
        }
        let CctView::Trial { items, .. } = view else {
            return None;
        };
        let item = items.choose(&mut self.base.rng)?;
        let latency = self.base.latency(0.4, 0.9);
        Some(Reaction::trial(
            InputEvent::click(item.center.x, item.center.y),
            latency,
        ))
    }
}

impl ParticipantPolicy<CctView> for LayoutLearner {
    fn name(&self) -> &'static str {
        "Learner"
    }

    fn react(&mut self, view: &CctView) -> Option<Reaction> {
        if let Some(reaction) = self.base.cct_screen(view) {
            return reaction;
        }
        let CctView::Trial { items, .. } = view else {
            return None;
        };
        let target = items.iter().find(|item| item.kind == ItemKind::Target)?;
        let mut layout: Vec<GridCell> = items.iter().map(|item| item.cell).collect();
        layout.sort_unstable();
        let seen = self.exposures.entry(layout).or_insert(0);
        let speedup = 0.9_f64.powi(i32::try_from(*seen).unwrap_or(i32::MAX)).max(0.5);
        *seen += 1;
        let latency = self.base.latency(0.8, 1.2) * speedup;
        Some(Reaction::trial(
            InputEvent::click(target.center.x, target.center.y),
            latency,
        ))
    }
}

struct RandomGambler {
    base: SimParticipant,
}

struct SafeGambler {
    base: SimParticipant,
}

struct PayoffLearner {
    base: SimParticipant,
    totals: [i64; 4],
    picks: [u32; 4],
}

fn pick_from(
    base: &mut SimParticipant,
    decks: &[(DeckId, Rect); 4],
    wanted: DeckId,
) -> Option<Reaction> {
    let rect = decks.iter().find(|(deck, _)| *deck == wanted)?.1;
    let latency = base.latency(0.5, 1.5);
    Some(Reaction::trial(click_rect(rect), latency))
}

impl ParticipantPolicy<IgtView> for RandomGambler {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn react(&mut self, view: &IgtView) -> Option<Reaction> {
        if let Some(reaction) = self.base.igt_screen(view) {
            return reaction;
        }
        let IgtView::Main { decks, .. } = view else {
            return None;
        };
        let deck = *DeckId::ALL.choose(&mut self.base.rng)?;
        pick_from(&mut self.base, decks, deck)
    }
}

impl ParticipantPolicy<IgtView> for SafeGambler {
    fn name(&self) -> &'static str {
        "Advantageous"
    }

    fn react(&mut self, view: &IgtView) -> Option<Reaction> {
        if let Some(reaction) = self.base.igt_screen(view) {
            return reaction;
        }
        let IgtView::Main { decks, .. } = view else {
            return None;
        };
        let deck = if self.base.rng.gen_bool(0.5) {
            DeckId::C
        } else {
            DeckId::D
        };
        pick_from(&mut self.base, decks, deck)
    }
}

impl PayoffLearner {
    fn mean_payoff(&self, deck: DeckId) -> f64 {
        let picks = self.picks[deck.index()];
        if picks == 0 {
            return 0.0;
        }
        i64_to_f64(self.totals[deck.index()]) / f64::from(picks)
    }
}

impl ParticipantPolicy<IgtView> for PayoffLearner {
    fn name(&self) -> &'static str {
        "Learner"
    }

    fn react(&mut self, view: &IgtView) -> Option<Reaction> {
        if let IgtView::Feedback(feedback) = view {
            self.totals[feedback.deck.index()] += feedback.outcome.net;
            self.picks[feedback.deck.index()] += 1;
        }
        if let Some(reaction) = self.base.igt_screen(view) {
            return reaction;
        }
        let IgtView::Main { decks, .. } = view else {
            return None;
        };
        let untried = DeckId::ALL
            .into_iter()
            .find(|deck| self.picks[deck.index()] < 3);
        let deck = match untried {
            Some(deck) => deck,
            None if self.base.rng.gen_bool(0.1) => *DeckId::ALL.choose(&mut self.base.rng)?,
            None => DeckId::ALL
                .into_iter()
                .max_by(|a, b| self.mean_payoff(*a).total_cmp(&self.mean_payoff(*b)))?,
        };
        pick_from(&mut self.base, decks, deck)
    }
}
