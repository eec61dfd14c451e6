//! Contextual cueing aggregation over a finished trial log.
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::cct::session::CctTrialRecord;
use crate::numbers::{mean, percentage};

/// Mean correct-trial reaction times for one block, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockMeans {
    /// One-based block number.
    pub block: usize,
    pub repeated: Option<f64>,
    pub novel: Option<f64>,
}

impl BlockMeans {
    /// Novel minus repeated, when both groups have correct trials.
    #[must_use]
    pub fn difference(&self) -> Option<f64> {
        Some(self.novel? - self.repeated?)
    }
}

/// Descriptive summary of a contextual cueing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CctSummary {
    pub blocks: Vec<BlockMeans>,
    pub total_trials: usize,
    pub correct_trials: usize,
    /// Correct over total, as a percentage; 0.0 for an empty log.
    pub accuracy_pct: f64,
    pub mean_repeated: Option<f64>,
    pub mean_novel: Option<f64>,
    /// Novel minus repeated mean over all correct trials.
    pub contextual_effect: Option<f64>,
}

/// Group correct records by block and condition and derive the cueing effect.
///
/// Groups without correct records stay `None`; nothing divides by zero.
#[must_use]
pub fn summarize(records: &[CctTrialRecord], block_count: usize) -> CctSummary {
    let correct: Vec<&CctTrialRecord> = records.iter().filter(|r| r.is_correct).collect();
    let times = |block: Option<usize>, repeated: bool| -> Vec<f64> {
        correct
            .iter()
            .filter(|r| r.is_repeated == repeated && block.is_none_or(|b| r.block == b))
            .map(|r| r.response_time)
            .collect()
    };

    let blocks = (1..=block_count)
        .map(|block| BlockMeans {
            block,
            repeated: mean(&times(Some(block), true)),
            novel: mean(&times(Some(block), false)),
        })
        .collect();

    let mean_repeated = mean(&times(None, true));
    let mean_novel = mean(&times(None, false));
    let contextual_effect = match (mean_novel, mean_repeated) {
        (Some(novel), Some(repeated)) => Some(novel - repeated),
        _ => None,
    };

    CctSummary {
        blocks,
        total_trials: records.len(),
        correct_trials: correct.len(),
        accuracy_pct: percentage(correct.len(), records.len()),
        mean_repeated,
        mean_novel,
        contextual_effect,
    }
}

/// Human-readable analysis report. Missing groups print as zero.
#[must_use]
pub fn render_text_report(participant: &str, summary: &CctSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "ANÁLISE DA TAREFA DE INDICAÇÃO CONTEXTUAL - Participante: {participant}"
    );
    let _ = writeln!(out, "{}", "=".repeat(80));
    let _ = writeln!(out);
    let _ = writeln!(out, "Tempos médios de resposta (segundos):");
    let _ = writeln!(out);
    let _ = writeln!(out, "Bloco\tRepetidas\tNovas\tDiferença");
    for block in &summary.blocks {
        let repeated = block.repeated.unwrap_or(0.0);
        let novel = block.novel.unwrap_or(0.0);
        let _ = writeln!(
            out,
            "{}\t{repeated:.3}s\t{novel:.3}s\t{:.3}s",
            block.block,
            novel - repeated
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Taxa de acertos: {:.1}%", summary.accuracy_pct);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Efeito de indicação contextual: {:.3}s",
        summary.contextual_effect.unwrap_or(0.0)
    );
    let _ = writeln!(
        out,
        "(Tempo médio em configurações novas - Tempo médio em configurações repetidas)"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cct::layout::{ConfigId, GridCell};

    fn record(block: usize, repeated: bool, rt: f64, correct: bool) -> CctTrialRecord {
        CctTrialRecord {
            participant: "p".to_string(),
            block,
            trial: 1,
            configuration_id: if repeated {
                ConfigId::Repeated(0)
            } else {
                ConfigId::Novel
            },
            is_repeated: repeated,
            response_time: rt,
            is_correct: correct,
            target_position: GridCell::new(0, 0),
        }
    }

    #[test]
    fn computes_means_effect_and_accuracy() {
        let log = vec![
            record(1, true, 0.5, true),
            record(1, true, 0.7, true),
            record(1, false, 0.9, true),
            record(1, false, 1.1, true),
        ];
        let summary = summarize(&log, 1);
        assert!((summary.mean_repeated.unwrap() - 0.6).abs() < 1e-9);
        assert!((summary.mean_novel.unwrap() - 1.0).abs() < 1e-9);
        assert!((summary.contextual_effect.unwrap() - 0.4).abs() < 1e-9);
        assert!((summary.accuracy_pct - 100.0).abs() < 1e-9);
        assert!((summary.blocks[0].difference().unwrap() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn incorrect_trials_only_count_toward_accuracy() {
        let log = vec![
            record(1, true, 0.4, true),
            record(1, true, 9.0, false),
            record(2, false, 0.8, true),
            record(2, false, 0.2, false),
        ];
        let summary = summarize(&log, 3);
        assert!((summary.accuracy_pct - 50.0).abs() < 1e-9);
        assert_eq!(summary.blocks[0].novel, None);
        assert!((summary.blocks[0].repeated.unwrap() - 0.4).abs() < 1e-9);
        assert_eq!(summary.blocks[1].repeated, None);
        assert_eq!(summary.blocks[2].difference(), None);
        assert!((summary.contextual_effect.unwrap() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn empty_log_yields_sentinels() {
        let summary = summarize(&[], 2);
        assert_eq!(summary.total_trials, 0);
        assert!((summary.accuracy_pct - 0.0).abs() < f64::EPSILON);
        assert_eq!(summary.contextual_effect, None);
        assert_eq!(summary.blocks.len(), 2);
    }

    #[test]
    fn text_report_prints_missing_groups_as_zero() {
        let log = vec![record(1, true, 0.5, true), record(1, false, 0.9, true)];
        let text = render_text_report("ana", &summarize(&log, 2));
        assert!(text.contains("Participante: ana"));
        assert!(text.contains("1\t0.500s\t0.900s\t0.400s"));
        assert!(text.contains("2\t0.000s\t0.000s\t0.000s"));
        assert!(text.contains("Taxa de acertos: 100.0%"));
        assert!(text.contains("Efeito de indicação contextual: 0.400s"));
    }
}
