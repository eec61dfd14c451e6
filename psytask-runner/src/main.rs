mod host;
mod policy;
mod reports;
mod storage;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};

use host::{SimulatedHost, frame_budget};
use policy::{CctStrategy, IgtStrategy, MAX_REACTION_SECS, ParticipantPolicy};
use psytask_core::{
    CctConfig, CctSession, Experiment, IgtConfig, IgtSession, ManualClock, SessionOutcome,
    run_session,
};
use reports::{RunReport, TaskSummary};
use storage::FileStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Task {
    /// Contextual cueing visual search
    Cct,
    /// Iowa gambling task
    Igt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "psytask", version)]
#[command(about = "Run contextual cueing and Iowa gambling sessions with simulated participants")]
struct Args {
    /// Experiment to run
    #[arg(value_enum)]
    task: Task,

    /// Participant id; skips the entry screen when given
    #[arg(long)]
    participant: Option<String>,

    /// Session seed
    #[arg(long, default_value_t = 1337)]
    seed: u64,

    /// JSON file overriding the task configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write result files directly into this directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Simulated participant (cct: accurate, sloppy, learner; igt: random, advantageous, learner)
    #[arg(long)]
    policy: Option<String>,

    /// Close the window once this many trials were answered
    #[arg(long)]
    abort_after: Option<usize>,

    /// Shuffle the on-screen deck order (igt only)
    #[arg(long)]
    shuffle_decks: bool,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.report == ReportFormat::Console && args.output.is_none() {
        announce_banner(args.task);
    }

    let storage = match &args.output_dir {
        Some(dir) => FileStorage::flat(dir),
        None => FileStorage::new(Path::new(".")),
    };
    let report = match args.task {
        Task::Cct => run_cct(&args, &storage)?,
        Task::Igt => run_igt(&args, &storage)?,
    };
    write_reports(&args, &report)
}

fn announce_banner(task: Task) {
    let title = match task {
        Task::Cct => "🧠 Contextual Cueing Session",
        Task::Igt => "🃏 Iowa Gambling Session",
    };
    println!("{}", title.bright_cyan().bold());
    println!("{}", "============================".cyan());
}

fn load_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn parse_policy<P: ValueEnum>(name: Option<&str>, default: P) -> Result<P> {
    match name {
        None => Ok(default),
        Some(name) => P::from_str(name, true).map_err(|err| anyhow!("unknown policy: {err}")),
    }
}

/// Id the simulated participant types when none was supplied.
fn entry_id(args: &Args) -> String {
    args.participant
        .clone()
        .unwrap_or_else(|| format!("sim{}", args.seed))
}

/// Slowest a trial can take: its timed screen, the answer, and a possible
/// block break after it.
fn seconds_per_trial(timed_screen: f64) -> f64 {
    timed_screen + 2.0 * MAX_REACTION_SECS
}

fn drive<S>(
    session: &mut S,
    policy: Box<dyn ParticipantPolicy<S::View>>,
    abort_after: Option<usize>,
    trial_secs: f64,
    storage: &FileStorage,
) -> Result<SessionOutcome>
where
    S: Experiment,
    S::View: Clone + PartialEq + Debug,
{
    let clock = ManualClock::starting_at(0.0);
    let name = policy.name();
    let budget = frame_budget(session.planned_trials(), trial_secs);
    log::debug!("frame budget {budget} for {} trials", session.planned_trials());
    let mut host = SimulatedHost::new(clock.clone(), policy)
        .abort_after(abort_after)
        .with_frame_budget(budget);
    let outcome =
        run_session(session, &mut host, &clock, storage).context("session loop failed")?;
    log::info!(
        "{name} participant finished after {} frames, {} trials answered",
        host.frames(),
        host.answered()
    );
    Ok(outcome)
}

fn run_cct(args: &Args, storage: &FileStorage) -> Result<RunReport> {
    let config: CctConfig = load_config(args.config.as_deref())?;
    let strategy = parse_policy(args.policy.as_deref(), CctStrategy::Accurate)?;
    let trial_secs = seconds_per_trial(config.fixation_duration);
    let mut session = CctSession::new(config, args.seed, args.participant.clone())
        .context("invalid contextual cueing configuration")?;

    let policy = strategy.create_policy(args.seed, &entry_id(args));
    let outcome = drive(&mut session, policy, args.abort_after, trial_secs, storage)?;
    Ok(RunReport::new(
        session.participant(),
        strategy.label(),
        args.seed,
        outcome,
        TaskSummary::Cct(session.summary()),
        storage.written(),
    ))
}

fn run_igt(args: &Args, storage: &FileStorage) -> Result<RunReport> {
    let mut config: IgtConfig = load_config(args.config.as_deref())?;
    config.shuffle_positions |= args.shuffle_decks;
    let strategy = parse_policy(args.policy.as_deref(), IgtStrategy::Learner)?;
    let trial_secs = seconds_per_trial(config.feedback_duration);
    let mut session = IgtSession::new(config, args.seed, args.participant.clone())
        .context("invalid gambling task configuration")?;

    let policy = strategy.create_policy(args.seed, &entry_id(args));
    let outcome = drive(&mut session, policy, args.abort_after, trial_secs, storage)?;
    Ok(RunReport::new(
        session.participant(),
        strategy.label(),
        args.seed,
        outcome,
        TaskSummary::Igt(session.summary()),
        storage.written(),
    ))
}

fn report_writer(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let Some(path) = path else {
        return Ok(Box::new(BufWriter::new(stdout().lock())));
    };
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn write_reports(args: &Args, report: &RunReport) -> Result<()> {
    let mut out = report_writer(args.output.as_deref())?;
    match args.report {
        ReportFormat::Console => reports::generate_console_report(&mut out, report)?,
        ReportFormat::Json => reports::generate_json_report(&mut out, report)?,
    }
    out.flush().context("failed to flush report")?;
    Ok(())
}
