//! File-backed result persistence: CSV trial logs plus a text or JSON report.
use std::borrow::Cow;
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::Local;
use psytask_core::{
    CctSummary, CctTrialRecord, IgtReport, IgtTrialRecord, SessionStorage, render_text_report,
};
use regex::Regex;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use thiserror::Error;

pub const CCT_DIR: &str = "resultados";
pub const IGT_DIR: &str = "dados_igt";

static UNSAFE_ID_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9_-]").unwrap_or_else(|_| unreachable!("pattern is a literal"))
});

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize results document")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Replace characters that are unsafe in file names with `_`.
#[must_use]
pub fn sanitize_participant(id: &str) -> String {
    UNSAFE_ID_CHARS.replace_all(id, "_").into_owned()
}

/// Writes each saved session under its task directory and remembers the paths.
#[derive(Debug)]
pub struct FileStorage {
    cct_dir: PathBuf,
    igt_dir: PathBuf,
    written: RefCell<Vec<PathBuf>>,
}

impl FileStorage {
    /// Task directories default to `resultados/` and `dados_igt/` under `root`.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            cct_dir: root.join(CCT_DIR),
            igt_dir: root.join(IGT_DIR),
            written: RefCell::new(Vec::new()),
        }
    }

    /// Put both tasks' files directly in `dir`.
    #[must_use]
    pub fn flat(dir: &Path) -> Self {
        Self {
            cct_dir: dir.to_path_buf(),
            igt_dir: dir.to_path_buf(),
            written: RefCell::new(Vec::new()),
        }
    }

    /// Files written so far, in write order.
    #[must_use]
    pub fn written(&self) -> Vec<PathBuf> {
        self.written.borrow().clone()
    }

    fn create(&self, path: PathBuf) -> Result<(BufWriter<File>, PathBuf), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        let file = File::create(&path).map_err(|e| StorageError::io(&path, e))?;
        Ok((BufWriter::new(file), path))
    }

    fn finish(&self, mut writer: BufWriter<File>, path: PathBuf) -> Result<(), StorageError> {
        writer.flush().map_err(|e| StorageError::io(&path, e))?;
        log::info!("wrote {}", path.display());
        self.written.borrow_mut().push(path);
        Ok(())
    }
}

fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Quote a CSV field when it contains a separator, quote, or newline.
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn py_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Seconds the way the analysis scripts expect them: `1.0`, `0.75`.
fn py_float(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

pub fn write_cct_csv<W: Write>(out: &mut W, records: &[CctTrialRecord]) -> std::io::Result<()> {
    writeln!(
        out,
        "participant,block,trial,configuration_id,is_repeated,response_time,is_correct,target_position"
    )?;
    for record in records {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            csv_field(&record.participant),
            record.block,
            record.trial,
            record.configuration_id,
            py_bool(record.is_repeated),
            py_float(record.response_time),
            py_bool(record.is_correct),
            csv_field(&record.target_position.to_string()),
        )?;
    }
    Ok(())
}

pub fn write_igt_csv<W: Write>(out: &mut W, records: &[IgtTrialRecord]) -> std::io::Result<()> {
    writeln!(
        out,
        "tentativa,baralho,recompensa,perda,liquido,dinheiro_total,tempo_reacao"
    )?;
    for record in records {
        writeln!(
            out,
            "{},{},{},{},{},{},{}",
            record.trial,
            record.deck,
            record.reward,
            record.loss,
            record.net,
            record.balance,
            py_float(record.reaction_time),
        )?;
    }
    Ok(())
}

/// Four-space indented JSON, UTF-8 kept as is.
pub fn write_report_json<W: Write>(out: W, report: &IgtReport) -> Result<(), serde_json::Error> {
    let mut serializer = Serializer::with_formatter(out, PrettyFormatter::with_indent(b"    "));
    report.serialize(&mut serializer)
}

impl SessionStorage for FileStorage {
    type Error = StorageError;

    fn save_cct(
        &self,
        participant: &str,
        records: &[CctTrialRecord],
        summary: &CctSummary,
    ) -> Result<(), Self::Error> {
        let stem = format!(
            "cct_participant_{}_{}",
            sanitize_participant(participant),
            timestamp()
        );

        let (mut csv, path) = self.create(self.cct_dir.join(format!("{stem}.csv")))?;
        write_cct_csv(&mut csv, records).map_err(|e| StorageError::io(&path, e))?;
        self.finish(csv, path)?;

        let (mut txt, path) = self.create(self.cct_dir.join(format!("{stem}_analysis.txt")))?;
        txt.write_all(render_text_report(participant, summary).as_bytes())
            .map_err(|e| StorageError::io(&path, e))?;
        self.finish(txt, path)
    }

    fn save_igt(
        &self,
        participant: &str,
        records: &[IgtTrialRecord],
        report: &IgtReport,
    ) -> Result<(), Self::Error> {
        let stem = format!("igt_{}_{}", sanitize_participant(participant), timestamp());

        let (mut csv, path) = self.create(self.igt_dir.join(format!("{stem}_dados.csv")))?;
        write_igt_csv(&mut csv, records).map_err(|e| StorageError::io(&path, e))?;
        self.finish(csv, path)?;

        let (mut json, path) = self.create(self.igt_dir.join(format!("{stem}_resultados.json")))?;
        write_report_json(&mut json, report)?;
        self.finish(json, path)
    }
}
