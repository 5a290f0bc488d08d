//! Text similarity measures.

use std::collections::HashMap;

/// Pairwise text similarity in `[0, 1]`.
pub trait Similarity: Send + Sync {
    /// Score two texts. Must be symmetric and bounded in `[0, 1]`.
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Cosine similarity of term-frequency vectors.
///
/// Tokens are maximal runs of alphanumeric characters, lowercased. Counts
/// are non-negative, so the cosine is symmetric and lies in `[0, 1]`;
/// identical non-empty texts score 1.0 and a text without tokens scores 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineSimilarity;

impl CosineSimilarity {
    pub fn new() -> Self {
        Self
    }
}

impl Similarity for CosineSimilarity {
    fn score(&self, a: &str, b: &str) -> f64 {
        cosine(&term_frequencies(a), &term_frequencies(b))
    }
}

/// Count lowercased alphanumeric tokens.
pub fn term_frequencies(text: &str) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        *counts.entry(token.to_lowercase()).or_insert(0) += 1;
    }
    counts
}

fn cosine(a: &HashMap<String, u32>, b: &HashMap<String, u32>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Iterate the smaller map for the dot product
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(term, &x)| large.get(term).map(|&y| f64::from(x) * f64::from(y)))
        .sum();

    let norm_a = a.values().map(|&x| f64::from(x).powi(2)).sum::<f64>().sqrt();
    let norm_b = b.values().map(|&x| f64::from(x).powi(2)).sum::<f64>().sqrt();

    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}
