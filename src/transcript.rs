//! Append-only run transcript.
//!
//! Two files live in the output directory: a human-readable conversation log
//! (`log.txt` by default) and `iterations.jsonl` with one IterationRecord per
//! line. Every entry is flushed as soon as it is written.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, StylerError};
use crate::llm::Message;
use crate::session::{IterationRecord, Stage};

/// Default conversation log file name
pub const DEFAULT_LOG_FILE: &str = "log.txt";

/// Iteration record file name
pub const RECORDS_FILE: &str = "iterations.jsonl";

const SEPARATOR_WIDTH: usize = 20;

/// How one reasoning attempt ended.
#[derive(Debug, Clone, Copy)]
pub enum AttemptOutcome<'a> {
    Reply(&'a str),
    Failed(&'a str),
}

/// Where an entry sits in the run.
#[derive(Debug, Clone, Copy)]
pub struct EntryContext {
    pub stage: Stage,
    /// Review iteration, when the stage is part of the review loop
    pub iteration: Option<u32>,
    pub attempt: u32,
    pub max_attempts: u32,
}

impl EntryContext {
    fn header(&self) -> String {
        match self.iteration {
            Some(iteration) => format!(
                "{} (iteration {}, attempt {}/{})",
                self.stage, iteration, self.attempt, self.max_attempts
            ),
            None => format!("{} (attempt {}/{})", self.stage, self.attempt, self.max_attempts),
        }
    }
}

pub struct Transcript {
    log_path: PathBuf,
    records_path: PathBuf,
    log: Mutex<File>,
}

impl Transcript {
    /// Open (or create) the transcript files under `dir`.
    pub fn open(dir: impl AsRef<Path>, log_file: &str) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let log_path = dir.join(log_file);
        let log = OpenOptions::new().create(true).append(true).open(&log_path)?;
        Ok(Self {
            log_path,
            records_path: dir.join(RECORDS_FILE),
            log: Mutex::new(log),
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn records_path(&self) -> &Path {
        &self.records_path
    }

    fn write_entry(&self, entry: &str) -> Result<()> {
        let mut log = self
            .log
            .lock()
            .map_err(|e| StylerError::Io(std::io::Error::other(e.to_string())))?;
        log.write_all(entry.as_bytes())?;
        log.flush()?;
        Ok(())
    }

    fn section(label: &str) -> String {
        format!("{}\n{}\n", "-".repeat(SEPARATOR_WIDTH), label)
    }

    /// One reasoning attempt: every turn sent, then the reply or a failure note.
    pub fn record_attempt(&self, context: &EntryContext, messages: &[Message], outcome: AttemptOutcome<'_>) -> Result<()> {
        let mut entry = Self::section(&context.header());
        for message in messages {
            entry.push_str(&format!("{}: {}\n", message.role.speaker(), message.transcript_text()));
        }
        match outcome {
            AttemptOutcome::Reply(text) => entry.push_str(&format!("Assistant: {}\n", text)),
            AttemptOutcome::Failed(reason) => entry.push_str(&format!("[attempt failed: {}]\n", reason)),
        }
        self.write_entry(&entry)
    }

    /// The payload parsed out of a reply.
    pub fn record_payload(&self, stage: Stage, payload: &serde_json::Value) -> Result<()> {
        let entry = format!(
            "{}{}\n",
            Self::section(&format!("{} payload", stage)),
            serde_json::to_string_pretty(payload)?
        );
        self.write_entry(&entry)
    }

    /// A free-form note (publish/render events, final outcome).
    pub fn record_note(&self, label: &str, text: &str) -> Result<()> {
        self.write_entry(&format!("{}{}\n", Self::section(label), text))
    }

    /// Append one iteration record to `iterations.jsonl`.
    pub fn append_record(&self, record: &IterationRecord) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.records_path)?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        file.flush()?;
        Ok(())
    }
}

/// Read back every iteration record in a records file.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<IterationRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            records.push(serde_json::from_str(&line)?);
        }
    }
    Ok(records)
}

impl std::fmt::Debug for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcript")
            .field("log_path", &self.log_path)
            .field("records_path", &self.records_path)
            .finish()
    }
}
