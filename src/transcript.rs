//! Append-only transcript of a run.
//!
//! Every thought, proposed action, observation and loop exit is written as a
//! timestamped line to a log file opened in append mode. The file is the only
//! durable state tiller keeps. Write failures are reported once through
//! `tracing` and never interrupt the loop.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

/// Kind of transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Session,
    Thought,
    Action,
    Observation,
    Malformed,
    Corrected,
    Rejected,
    Denied,
    Finish,
    Cancelled,
    BudgetExhausted,
    Fatal,
}

impl Entry {
    fn label(&self) -> &'static str {
        match self {
            Entry::Session => "SESSION",
            Entry::Thought => "THOUGHT",
            Entry::Action => "ACTION",
            Entry::Observation => "OBSERVATION",
            Entry::Malformed => "MALFORMED",
            Entry::Corrected => "CORRECTED",
            Entry::Rejected => "REJECTED",
            Entry::Denied => "DENIED",
            Entry::Finish => "FINISH",
            Entry::Cancelled => "CANCELLED",
            Entry::BudgetExhausted => "BUDGET_EXHAUSTED",
            Entry::Fatal => "FATAL",
        }
    }
}

pub struct Transcript {
    run_id: String,
    sink: Box<dyn Write>,
    failed: bool,
}

impl Transcript {
    /// Opens (or creates) the log at `path` for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open transcript {}", path.display()))?;
        Ok(Self::with_sink(Box::new(file)))
    }

    /// A transcript that writes nowhere.
    pub fn discard() -> Self {
        Self::with_sink(Box::new(io::sink()))
    }

    fn with_sink(sink: Box<dyn Write>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            sink,
            failed: false,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn record(&mut self, entry: Entry, text: &str) {
        let line = format!(
            "{} [{}] {}: {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            &self.run_id[..8],
            entry.label(),
            text
        );
        let result = self
            .sink
            .write_all(line.as_bytes())
            .and_then(|_| self.sink.flush());
        if let Err(e) = result {
            if !self.failed {
                tracing::warn!(error = %e, "failed to write transcript; further failures are silent");
                self.failed = true;
            }
        }
    }
}
