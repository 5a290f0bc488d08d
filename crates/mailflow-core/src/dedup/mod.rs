//! Duplicate request detection against a historical corpus.

pub mod corpus;
pub mod similarity;

pub use corpus::{CorpusRecord, CorpusSource, HistoricalCorpus, JsonlCorpus};
pub use similarity::{CosineSimilarity, Similarity};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CorpusError;

/// Reason reported for a duplicate.
pub const DUPLICATE_REASON: &str = "Duplicate email detected";

/// Reason reported when no duplicate was found.
pub const NO_DUPLICATE_REASON: &str = "No duplicate";

/// Reason reported when the corpus could not be read.
pub const UNAVAILABLE_REASON: &str = "Duplicate check unavailable";

/// Default similarity threshold. Scores strictly above it are duplicates.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Outcome of a duplicate check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCheck {
    pub is_duplicate: bool,
    pub reason: String,
    /// Best score against the corpus; 0 for an empty corpus.
    pub max_similarity: f64,
}

impl DuplicateCheck {
    /// Decide from the best score.
    pub fn from_score(max_similarity: f64, threshold: f64) -> Self {
        let is_duplicate = max_similarity > threshold;
        Self {
            is_duplicate,
            reason: if is_duplicate {
                DUPLICATE_REASON
            } else {
                NO_DUPLICATE_REASON
            }
            .to_string(),
            max_similarity,
        }
    }
}

/// Compares request content with every corpus entry.
#[derive(Clone)]
pub struct DuplicateDetector {
    similarity: Arc<dyn Similarity>,
    threshold: f64,
}

impl DuplicateDetector {
    /// Detector using [`CosineSimilarity`] and the default threshold.
    pub fn new() -> Self {
        Self {
            similarity: Arc::new(CosineSimilarity),
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Replace the similarity function.
    pub fn with_similarity(mut self, similarity: Arc<dyn Similarity>) -> Self {
        self.similarity = similarity;
        self
    }

    /// Set the threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Best similarity of `content` against `entries`; 0 when empty.
    pub fn max_similarity<S: AsRef<str>>(&self, content: &str, entries: &[S]) -> f64 {
        entries
            .iter()
            .map(|entry| self.similarity.score(content, entry.as_ref()))
            .fold(0.0, f64::max)
    }

    /// Check `content` against a set of past entries.
    pub fn check_entries<S: AsRef<str>>(&self, content: &str, entries: &[S]) -> DuplicateCheck {
        let max_similarity = self.max_similarity(content, entries);
        debug!(
            "Max similarity {:.4} over {} entries (threshold {})",
            max_similarity,
            entries.len(),
            self.threshold
        );
        DuplicateCheck::from_score(max_similarity, self.threshold)
    }

    /// Check `content` against a corpus.
    pub fn check(
        &self,
        content: &str,
        corpus: &dyn CorpusSource,
    ) -> Result<DuplicateCheck, CorpusError> {
        let entries = corpus.snapshot()?;
        let check = self.check_entries(content, &entries);
        info!("Duplicate check: {}", check.reason);
        Ok(check)
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new()
    }
}
