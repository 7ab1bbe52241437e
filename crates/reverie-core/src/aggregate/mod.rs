//! Vector Aggregator
//!
//! Collapses the word-emotion edge graph into one emotion-distribution
//! vector per word. Pure function of its input: no randomness, no I/O, and
//! accumulation goes through a `BTreeMap` so the output order is
//! lexicographic regardless of edge order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::signal::{Emotion, EmotionVector, GraphEdge};

// ============================================================================
// WORD VECTORS
// ============================================================================

/// Per-word emotion distribution, derived fresh on every run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordVector {
    /// The word
    pub key: String,
    /// Distribution over emotion labels, normalized to sum 1
    pub vector: EmotionVector,
    /// Raw accumulated edge weights before normalization
    pub raw: EmotionVector,
}

impl WordVector {
    /// Total accumulated edge weight across all labels
    pub fn total_weight(&self) -> f64 {
        self.raw.sum()
    }
}

/// Output of one aggregation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordVectorSet {
    /// Distinct emotion labels present in the edge set, in enum order
    pub emotions: Vec<Emotion>,
    /// One vector per word, lexicographic by word
    pub items: Vec<WordVector>,
}

impl WordVectorSet {
    /// Whether the pass produced nothing to cluster
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up one word's vector
    pub fn get(&self, word: &str) -> Option<&WordVector> {
        self.items.iter().find(|wv| wv.key == word)
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Collapse an edge set into per-word emotion distributions
///
/// Sums edge weights per (word, emotion); words whose total weight is zero
/// are excluded; each surviving vector is normalized to sum 1.
pub fn aggregate_edges(edges: &[GraphEdge]) -> WordVectorSet {
    let mut sums: BTreeMap<&str, EmotionVector> = BTreeMap::new();
    let mut present = [false; crate::signal::EMOTION_COUNT];

    for edge in edges {
        sums.entry(edge.word.as_str())
            .or_insert_with(EmotionVector::zero)
            .add(edge.emotion, edge.weight);
        present[edge.emotion.index()] = true;
    }

    let emotions: Vec<Emotion> = Emotion::ALL
        .iter()
        .copied()
        .filter(|e| present[e.index()])
        .collect();

    let items: Vec<WordVector> = sums
        .into_iter()
        .filter(|(_, raw)| raw.sum() > 0.0)
        .map(|(word, raw)| WordVector {
            key: word.to_string(),
            vector: raw.normalized_to_sum(),
            raw,
        })
        .collect();

    WordVectorSet { emotions, items }
}
