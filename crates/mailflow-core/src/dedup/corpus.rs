//! Historical corpus of previously processed email content.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CorpusError;

/// Result type for corpus operations.
pub type Result<T> = std::result::Result<T, CorpusError>;

/// Read access to past email content.
pub trait CorpusSource: Send + Sync {
    /// A consistent copy of every entry at the time of the call.
    fn snapshot(&self) -> Result<Vec<String>>;
}

/// One line of a corpus file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub email_content: String,
}

/// In-memory, append-only corpus.
///
/// Cloning shares the same entries, so a writer can append while other
/// clones are read by concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct HistoricalCorpus {
    entries: Arc<RwLock<Vec<String>>>,
}

impl HistoricalCorpus {
    /// Create an empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry.
    pub fn append(&self, content: impl Into<String>) -> Result<()> {
        self.entries
            .write()
            .map_err(|_| CorpusError::Poisoned)?
            .push(content.into());
        Ok(())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the corpus has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: Into<String>> FromIterator<S> for HistoricalCorpus {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: Arc::new(RwLock::new(iter.into_iter().map(Into::into).collect())),
        }
    }
}

impl CorpusSource for HistoricalCorpus {
    fn snapshot(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().map_err(|_| CorpusError::Poisoned)?.clone())
    }
}

/// Corpus stored as JSON Lines, one [`CorpusRecord`] per line.
///
/// Read in full on every snapshot, so records appended by another process
/// are picked up by the next request. A missing file is an error.
#[derive(Debug, Clone)]
pub struct JsonlCorpus {
    path: PathBuf,
}

impl JsonlCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File backing this corpus.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, creating the file if needed.
    pub fn append(&self, content: &str) -> Result<()> {
        let record = CorpusRecord {
            email_content: content.to_string(),
        };
        let line = serde_json::to_string(&record).map_err(|e| CorpusError::Parse {
            line: 0,
            reason: e.to_string(),
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format!("{}\n", line).as_bytes())?;
        Ok(())
    }

    /// Load every record into memory.
    pub fn load(&self) -> Result<HistoricalCorpus> {
        Ok(self.snapshot()?.into_iter().collect())
    }
}

impl CorpusSource for JsonlCorpus {
    /// Only newline-terminated records are read; a trailing partial line
    /// left by an append in progress is skipped.
    fn snapshot(&self) -> Result<Vec<String>> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut entries = Vec::new();
        let mut line = String::new();
        let mut number = 0;

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            number += 1;

            if !line.ends_with('\n') {
                debug!("Skipping unterminated record at line {}", number);
                break;
            }
            if line.trim().is_empty() {
                continue;
            }

            let record: CorpusRecord =
                serde_json::from_str(&line).map_err(|e| CorpusError::Parse {
                    line: number,
                    reason: e.to_string(),
                })?;
            entries.push(record.email_content);
        }

        debug!("Read {} corpus entries from {}", entries.len(), self.path.display());
        Ok(entries)
    }
}
