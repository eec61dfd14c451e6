use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use psytask_core::{CctSummary, DeckId, IgtSummary, SessionOutcome};
use serde::Serialize;

/// Task-specific part of a finished run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "task", rename_all = "lowercase")]
pub enum TaskSummary {
    Cct(CctSummary),
    Igt(IgtSummary),
}

/// Everything printed once a session loop returns.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub participant: String,
    pub policy: String,
    pub seed: u64,
    pub completed_trials: usize,
    pub planned_trials: usize,
    pub aborted: bool,
    pub summary: TaskSummary,
    pub files: Vec<PathBuf>,
}

impl RunReport {
    #[must_use]
    pub fn new(
        participant: &str,
        policy: &str,
        seed: u64,
        outcome: SessionOutcome,
        summary: TaskSummary,
        files: Vec<PathBuf>,
    ) -> Self {
        Self {
            participant: participant.to_string(),
            policy: policy.to_string(),
            seed,
            completed_trials: outcome.completed_trials,
            planned_trials: outcome.planned_trials,
            aborted: outcome.aborted,
            summary,
            files,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.aborted && self.completed_trials == self.planned_trials
    }
}

fn seconds(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}s"))
}

pub fn generate_console_report<W: Write>(out: &mut W, report: &RunReport) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Session Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==================".cyan())?;
    writeln!(out, "Participant: {}", report.participant.bold())?;
    writeln!(out, "Policy: {} (seed {})", report.policy, report.seed)?;

    let status = if report.is_complete() {
        "✅ COMPLETE".green()
    } else if report.aborted {
        "⏹ ABORTED".yellow()
    } else {
        "❌ INCOMPLETE".red()
    };
    writeln!(
        out,
        "{status} {}/{} trials",
        report.completed_trials, report.planned_trials
    )?;
    writeln!(out)?;

    match &report.summary {
        TaskSummary::Cct(summary) => write_cct(out, summary)?,
        TaskSummary::Igt(summary) => write_igt(out, summary)?,
    }

    if report.files.is_empty() {
        writeln!(out, "{}", "No trials recorded; nothing saved.".dimmed())?;
    } else {
        writeln!(out, "{}", "💾 Saved".bright_yellow().bold())?;
        for path in &report.files {
            writeln!(out, "   • {}", path.display())?;
        }
    }
    Ok(())
}

fn write_cct<W: Write>(out: &mut W, summary: &CctSummary) -> Result<()> {
    writeln!(out, "{}", "Contextual cueing".bold())?;
    for block in &summary.blocks {
        writeln!(
            out,
            "   Block {}: repeated {}, novel {}",
            block.block,
            seconds(block.repeated),
            seconds(block.novel)
        )?;
    }
    writeln!(
        out,
        "   Accuracy: {:.1}% ({}/{})",
        summary.accuracy_pct, summary.correct_trials, summary.total_trials
    )?;
    let effect = seconds(summary.contextual_effect);
    let effect = match summary.contextual_effect {
        Some(value) if value > 0.0 => effect.green(),
        Some(_) => effect.red(),
        None => effect.dimmed(),
    };
    writeln!(out, "   Contextual effect: {effect}")?;
    writeln!(out)?;
    Ok(())
}

fn write_igt<W: Write>(out: &mut W, summary: &IgtSummary) -> Result<()> {
    writeln!(out, "{}", "Iowa gambling task".bold())?;
    for deck in DeckId::ALL {
        let label = if deck.is_advantageous() {
            "advantageous".green()
        } else {
            "disadvantageous".red()
        };
        writeln!(out, "   Deck {deck}: {} picks ({label})", summary.count(deck))?;
    }
    writeln!(out, "   Net score: {}", summary.net_score)?;
    let blocks: Vec<String> = summary.block_scores.iter().map(i64::to_string).collect();
    writeln!(out, "   Block scores: [{}]", blocks.join(", "))?;
    writeln!(out, "   Final balance: ${}", summary.final_balance)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_json_report<W: Write>(out: &mut W, report: &RunReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}
