//! Hypothesis & Salience Scorer
//!
//! Turns clusters and temporal-recurrence scans into scored hypotheses.
//! Two independent sources feed the same pool:
//!
//! - **Cluster hypotheses**: a group of words shares a dominant emotion
//! - **Temporal hypotheses**: a word's occurrences skew late-night
//!
//! Salience folds evidence frequency, recency, and snapshot intensity into
//! each hypothesis's intrinsic confidence with documented fixed weights.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregate::{WordVector, WordVectorSet};
use crate::cluster::Cluster;
use crate::signal::{EmotionSnapshot, EmotionVector, GraphEdge};

/// Fixed confidence assigned to temporal-skew hypotheses
pub const TEMPORAL_CONFIDENCE: f64 = 0.45;

/// Minimum edge occurrences before a word qualifies for a temporal scan
pub const MIN_TEMPORAL_OCCURRENCES: usize = 3;

// ============================================================================
// TYPES
// ============================================================================

/// One scored claim about an association between words, emotions, or time
///
/// Hypotheses have no identity of their own; they live inside a Dream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hypothesis {
    /// The claim
    pub text: String,
    /// Intrinsic plausibility from clustering, in [0, 1]
    pub confidence: f64,
    /// Words backing the claim; each appears in the run's edge set
    pub evidence: Vec<String>,
    /// Composite score (confidence, frequency, recency, intensity), in [0, 1]
    pub salience: f64,
}

/// Salience blend weights. Documented constants, not tunables: changing
/// them changes what "salient" means across the whole store.
#[derive(Debug, Clone, Copy)]
pub struct SalienceWeights {
    /// Weight of intrinsic confidence
    pub confidence: f64,
    /// Weight of evidence frequency in the edge set
    pub frequency: f64,
    /// Weight of evidence recency
    pub recency: f64,
    /// Weight of snapshot intensity
    pub intensity: f64,
}

impl Default for SalienceWeights {
    fn default() -> Self {
        Self {
            confidence: 0.45,
            frequency: 0.25,
            recency: 0.20,
            intensity: 0.10,
        }
    }
}

/// Scorer knobs
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// How many top-weight words represent a cluster
    pub top_words_per_cluster: usize,
    /// Minimum occurrences before a temporal scan considers a word
    pub min_temporal_occurrences: usize,
    /// Late-night window start hour (inclusive)
    pub night_start_hour: f64,
    /// Late-night window end hour (exclusive); the window wraps midnight
    pub night_end_hour: f64,
    /// Fixed confidence for temporal hypotheses
    pub temporal_confidence: f64,
    /// Recency horizon for the salience blend, in days
    pub recency_window_days: i64,
    /// Salience blend weights
    pub weights: SalienceWeights,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            top_words_per_cluster: 4,
            min_temporal_occurrences: MIN_TEMPORAL_OCCURRENCES,
            night_start_hour: 22.0,
            night_end_hour: 6.0,
            temporal_confidence: TEMPORAL_CONFIDENCE,
            recency_window_days: 14,
            weights: SalienceWeights::default(),
        }
    }
}

// ============================================================================
// CLUSTER HYPOTHESES
// ============================================================================

/// One hypothesis per non-empty cluster: its top words associate with the
/// cluster's dominant emotion
pub fn cluster_hypotheses(
    clusters: &[Cluster],
    vectors: &WordVectorSet,
    config: &ScorerConfig,
) -> Vec<Hypothesis> {
    let mut hypotheses = Vec::new();

    for cluster in clusters {
        if cluster.members.is_empty() {
            continue;
        }

        // Rank members by accumulated edge weight, keep the top N
        let mut ranked: Vec<&WordVector> = cluster
            .members
            .iter()
            .filter_map(|word| vectors.get(word))
            .collect();
        ranked.sort_by(|a, b| {
            b.total_weight()
                .partial_cmp(&a.total_weight())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });
        ranked.truncate(config.top_words_per_cluster.max(1));

        if ranked.is_empty() {
            continue;
        }

        let member_vectors: Vec<EmotionVector> = ranked.iter().map(|wv| wv.vector).collect();
        let profile = EmotionVector::mean_of(&member_vectors);
        let dominant = profile.dominant();

        // Mean over the labels actually present in the signal: a
        // single-emotion signal yields confidence 1.0, a diffuse one less
        let confidence = profile.mean_over(&vectors.emotions).clamp(0.0, 1.0);

        let evidence: Vec<String> = ranked.iter().map(|wv| wv.key.clone()).collect();
        let text = format!(
            "words {} associate with {}",
            quote_words(&evidence),
            dominant
        );

        hypotheses.push(Hypothesis {
            text,
            confidence,
            evidence,
            salience: 0.0,
        });
    }

    hypotheses
}

// ============================================================================
// TEMPORAL HYPOTHESES
// ============================================================================

/// One fixed-confidence hypothesis per word whose mean occurrence hour
/// falls in the late-night window
pub fn temporal_hypotheses(edges: &[GraphEdge], config: &ScorerConfig) -> Vec<Hypothesis> {
    let mut hours_by_word: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for edge in edges {
        hours_by_word
            .entry(edge.word.as_str())
            .or_default()
            .push(edge.timestamp.hour() as f64);
    }

    let mut hypotheses = Vec::new();
    for (word, hours) in hours_by_word {
        if hours.len() < config.min_temporal_occurrences {
            continue;
        }
        let mean_hour = hours.iter().sum::<f64>() / hours.len() as f64;
        if !in_night_window(mean_hour, config.night_start_hour, config.night_end_hour) {
            continue;
        }

        hypotheses.push(Hypothesis {
            text: format!(
                "mentions of \"{}\" recur late at night (mean hour {:.1})",
                word, mean_hour
            ),
            confidence: config.temporal_confidence,
            evidence: vec![word.to_string()],
            salience: 0.0,
        });
    }

    hypotheses
}

/// Whether an hour-of-day falls in a window that wraps midnight
fn in_night_window(hour: f64, start: f64, end: f64) -> bool {
    if start <= end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

// ============================================================================
// SALIENCE
// ============================================================================

/// Fold frequency, recency, and snapshot intensity into each hypothesis
pub fn score_salience(
    hypotheses: &mut [Hypothesis],
    edges: &[GraphEdge],
    snapshots: &[EmotionSnapshot],
    config: &ScorerConfig,
    now: DateTime<Utc>,
) {
    let recency_floor = now - chrono::Duration::days(config.recency_window_days);
    let w = &config.weights;

    for hypothesis in hypotheses.iter_mut() {
        let occurrences: Vec<&GraphEdge> = edges
            .iter()
            .filter(|e| hypothesis.evidence.iter().any(|ev| ev == &e.word))
            .collect();

        let frequency = if edges.is_empty() {
            0.0
        } else {
            occurrences.len() as f64 / edges.len() as f64
        };

        let recency = if occurrences.is_empty() {
            0.0
        } else {
            let recent = occurrences
                .iter()
                .filter(|e| e.timestamp >= recency_floor)
                .count();
            recent as f64 / occurrences.len() as f64
        };

        let touching: Vec<&EmotionSnapshot> = snapshots
            .iter()
            .filter(|s| {
                s.keywords
                    .iter()
                    .any(|kw| hypothesis.evidence.iter().any(|ev| ev == kw))
            })
            .collect();
        let intensity = if touching.is_empty() {
            0.0
        } else {
            touching.iter().map(|s| s.intensity()).sum::<f64>() / touching.len() as f64
        };

        hypothesis.salience = (w.confidence * hypothesis.confidence
            + w.frequency * frequency
            + w.recency * recency
            + w.intensity * intensity)
            .clamp(0.0, 1.0);
    }
}

/// Full scoring pass: both hypothesis sources, salience, sorted descending
pub fn build_hypotheses(
    clusters: &[Cluster],
    vectors: &WordVectorSet,
    edges: &[GraphEdge],
    snapshots: &[EmotionSnapshot],
    config: &ScorerConfig,
    now: DateTime<Utc>,
) -> Vec<Hypothesis> {
    let mut hypotheses = cluster_hypotheses(clusters, vectors, config);
    hypotheses.extend(temporal_hypotheses(edges, config));
    score_salience(&mut hypotheses, edges, snapshots, config, now);
    hypotheses.sort_by(|a, b| {
        b.salience
            .partial_cmp(&a.salience)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.text.cmp(&b.text))
    });
    hypotheses
}

fn quote_words(words: &[String]) -> String {
    words
        .iter()
        .map(|w| format!("\"{w}\""))
        .collect::<Vec<_>>()
        .join(", ")
}
