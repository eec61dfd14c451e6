//! Gambling task aggregation and the structured results document.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::igt::config::{DeckId, DeckSpec, IgtConfig};
use crate::igt::session::IgtTrialRecord;
use crate::numbers::count_to_i64;

/// Behavioral summary of a gambling session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgtSummary {
    /// Picks per deck; every deck is present, unpicked decks at zero.
    pub deck_counts: BTreeMap<DeckId, usize>,
    /// Advantageous picks minus disadvantageous picks.
    pub net_score: i64,
    /// Net score per fixed-size block of trials.
    pub block_scores: Vec<i64>,
    pub final_balance: i64,
}

impl IgtSummary {
    #[must_use]
    pub fn count(&self, deck: DeckId) -> usize {
        self.deck_counts.get(&deck).copied().unwrap_or(0)
    }
}

const fn pick_score(deck: DeckId) -> i64 {
    if deck.is_advantageous() { 1 } else { -1 }
}

/// Count picks, derive the net score, and split it over blocks.
///
/// Block `b` covers trial indices `[b * n, (b + 1) * n)` with
/// `n = trial_count / block_count`; indices past the last full block are not
/// scored in any block.
#[must_use]
pub fn summarize(records: &[IgtTrialRecord], config: &IgtConfig) -> IgtSummary {
    let mut deck_counts: BTreeMap<DeckId, usize> =
        DeckId::ALL.into_iter().map(|deck| (deck, 0)).collect();
    for record in records {
        *deck_counts.entry(record.deck).or_insert(0) += 1;
    }

    let advantageous: usize = DeckId::ALL
        .into_iter()
        .filter(|deck| deck.is_advantageous())
        .map(|deck| deck_counts[&deck])
        .sum();
    let disadvantageous = records.len() - advantageous;
    let net_score = count_to_i64(advantageous) - count_to_i64(disadvantageous);

    let mut block_scores = vec![0; config.block_count];
    let per_block = config.trials_per_block();
    if per_block > 0 {
        for (index, record) in records.iter().take(config.trial_count).enumerate() {
            if let Some(score) = block_scores.get_mut(index / per_block) {
                *score += pick_score(record.deck);
            }
        }
    }

    let final_balance = records
        .last()
        .map_or(config.initial_balance, |record| record.balance);

    IgtSummary {
        deck_counts,
        net_score,
        block_scores,
        final_balance,
    }
}

/// Deck payoff rule as written in the results document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckPayoff {
    pub recompensa: i64,
    pub freq_perda: f64,
    pub valores_perda: Vec<i64>,
}

impl From<&DeckSpec> for DeckPayoff {
    fn from(spec: &DeckSpec) -> Self {
        Self {
            recompensa: spec.reward,
            freq_perda: spec.loss_frequency,
            valores_perda: spec.loss_values.clone(),
        }
    }
}

/// Session parameters echoed into the results document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ReportSettings {
    pub num_tentativas: usize,
    pub num_blocos: usize,
    pub dinheiro_inicial: i64,
    pub baralho_a: DeckPayoff,
    pub baralho_b: DeckPayoff,
    pub baralho_c: DeckPayoff,
    pub baralho_d: DeckPayoff,
}

impl From<&IgtConfig> for ReportSettings {
    fn from(config: &IgtConfig) -> Self {
        Self {
            num_tentativas: config.trial_count,
            num_blocos: config.block_count,
            dinheiro_inicial: config.initial_balance,
            baralho_a: DeckPayoff::from(&config.decks.a),
            baralho_b: DeckPayoff::from(&config.decks.b),
            baralho_c: DeckPayoff::from(&config.decks.c),
            baralho_d: DeckPayoff::from(&config.decks.d),
        }
    }
}

/// Structured results document persisted next to the trial log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgtReport {
    pub escolhas_baralho: BTreeMap<DeckId, usize>,
    pub pontuacao_liquida: i64,
    pub pontuacoes_bloco: Vec<i64>,
    pub participante_id: String,
    pub dinheiro_final: i64,
    pub posicoes_baralhos: [DeckId; 4],
    pub configuracoes: ReportSettings,
}

impl IgtReport {
    #[must_use]
    pub fn new(
        participant: &str,
        summary: &IgtSummary,
        positions: [DeckId; 4],
        config: &IgtConfig,
    ) -> Self {
        Self {
            escolhas_baralho: summary.deck_counts.clone(),
            pontuacao_liquida: summary.net_score,
            pontuacoes_bloco: summary.block_scores.clone(),
            participante_id: participant.to_string(),
            dinheiro_final: summary.final_balance,
            posicoes_baralhos: positions,
            configuracoes: ReportSettings::from(config),
        }
    }
}
