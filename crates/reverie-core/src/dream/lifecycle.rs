//! Dream lifecycle: compose, reinforce-or-append, decay
//!
//! State machine per dream: `created -> (reinforced)* -> decayed-below-floor
//! -> removed`. There is no terminal success state; a dream survives only
//! through continued reinforcement or slow decay.

use chrono::{DateTime, Utc};

use super::{token_overlap, Dream, DreamKind};
use crate::hypothesis::Hypothesis;

/// Similarity above which a candidate merges into an existing dream
pub const SIMILARITY_THRESHOLD: f64 = 0.45;

/// Daily multiplier applied per decay-rate period
pub const DECAY_BASE: f64 = 0.92;

/// Confidence floor below which a dream is forgotten
pub const KEEP_FLOOR: f64 = 0.05;

// ============================================================================
// CONFIG
// ============================================================================

/// Lifecycle knobs
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Summary similarity above which a candidate reinforces instead of
    /// appending
    pub similarity_threshold: f64,
    /// Text similarity above which two hypotheses merge
    pub hypothesis_merge_threshold: f64,
    /// How many recent dreams the reinforcement scan considers. A tuning
    /// knob, not a correctness requirement.
    pub scan_window: usize,
    /// Confidence baseline for a freshly composed dream
    pub base_confidence: f64,
    /// Extra confidence available from mean hypothesis confidence
    pub confidence_span: f64,
    /// Hypotheses kept in a candidate dream
    pub max_hypotheses_per_dream: usize,
    /// Hypothesis texts concatenated into the summary
    pub summary_hypotheses: usize,
    /// Daily decay multiplier, < 1
    pub decay_base: f64,
    /// Days per decay-base step for new dreams
    pub default_decay_rate: f64,
    /// Confidence bonus per reinforcement hit, applied during decay
    pub hit_bonus: f64,
    /// Dreams below this confidence are removed during decay
    pub keep_floor: f64,
    /// Fraction of a candidate's confidence granted to the dream it
    /// reinforces
    pub reinforce_fraction: f64,
    /// Fraction of an incoming hypothesis's confidence granted to the
    /// hypothesis it merges into
    pub hypothesis_boost_fraction: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: SIMILARITY_THRESHOLD,
            hypothesis_merge_threshold: 0.45,
            scan_window: 12,
            base_confidence: 0.45,
            confidence_span: 0.45,
            max_hypotheses_per_dream: 6,
            summary_hypotheses: 3,
            decay_base: DECAY_BASE,
            default_decay_rate: 7.0,
            hit_bonus: 0.02,
            keep_floor: KEEP_FLOOR,
            reinforce_fraction: 0.3,
            hypothesis_boost_fraction: 0.25,
        }
    }
}

// ============================================================================
// COMPOSE
// ============================================================================

/// Build a candidate dream from salience-ordered hypotheses
///
/// The summary concatenates the top hypothesis texts; initial confidence
/// is the baseline plus a share of the mean hypothesis confidence.
pub fn compose_dream(
    owner: Option<&str>,
    hypotheses: &[Hypothesis],
    config: &LifecycleConfig,
    now: DateTime<Utc>,
) -> Dream {
    let kept: Vec<Hypothesis> = hypotheses
        .iter()
        .take(config.max_hypotheses_per_dream)
        .cloned()
        .collect();

    let summary = kept
        .iter()
        .take(config.summary_hypotheses)
        .map(|h| h.text.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    let mean_confidence = if kept.is_empty() {
        0.0
    } else {
        kept.iter().map(|h| h.confidence).sum::<f64>() / kept.len() as f64
    };
    let initial_confidence = config.base_confidence + config.confidence_span * mean_confidence;

    Dream::new(
        owner,
        summary,
        kept,
        initial_confidence,
        config.default_decay_rate,
        DreamKind::Dream,
        now,
    )
}

// ============================================================================
// REINFORCE OR APPEND
// ============================================================================

/// What happened to a candidate dream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReinforceOutcome {
    /// Merged into an existing dream
    Reinforced {
        /// The dream that absorbed the candidate
        dream_id: String,
    },
    /// Stored as a new dream
    Appended {
        /// The stored dream's id
        dream_id: String,
    },
    /// Dropped: no hypotheses and `force` not set
    Skipped,
}

/// Merge a candidate into the first sufficiently similar recent dream,
/// or append it as new
///
/// The scan covers the `scan_window` most recent dreams for the
/// candidate's owner, newest first; identity is never split - the first
/// match absorbs the candidate.
pub fn reinforce_or_append(
    dreams: &mut Vec<Dream>,
    candidate: Dream,
    force: bool,
    config: &LifecycleConfig,
    now: DateTime<Utc>,
) -> ReinforceOutcome {
    let owner = candidate.owner_key.clone();
    let recent: Vec<usize> = dreams
        .iter()
        .enumerate()
        .filter(|(_, d)| d.matches_owner(owner.as_deref()))
        .map(|(i, _)| i)
        .collect();

    for &i in recent.iter().rev().take(config.scan_window) {
        let similarity = token_overlap(&candidate.summary, &dreams[i].summary);
        if similarity > config.similarity_threshold {
            let dream = &mut dreams[i];
            merge_hypotheses(dream, &candidate.hypotheses, config);

            let boost = candidate.initial_confidence * config.reinforce_fraction;
            dream.confidence = (dream.confidence + boost).clamp(0.0, 1.0);
            dream.initial_confidence = (dream.initial_confidence + boost).clamp(0.0, 1.0);
            dream.hits += 1;
            dream.last_reinforced_at = now;

            return ReinforceOutcome::Reinforced {
                dream_id: dream.id.clone(),
            };
        }
    }

    if candidate.hypotheses.is_empty() && !force {
        tracing::warn!(owner = ?owner, "Dropping candidate dream with no hypotheses");
        return ReinforceOutcome::Skipped;
    }

    let dream_id = candidate.id.clone();
    dreams.push(candidate);
    ReinforceOutcome::Appended { dream_id }
}

/// Merge incoming hypotheses into a dream: text-similar hypotheses are
/// boosted and their evidence unioned, novel ones are appended
fn merge_hypotheses(dream: &mut Dream, incoming: &[Hypothesis], config: &LifecycleConfig) {
    // Appends stay bounded so repeated reinforcement cannot grow a dream
    // without limit
    let append_cap = config.max_hypotheses_per_dream * 2;

    for hypothesis in incoming {
        let existing = dream
            .hypotheses
            .iter_mut()
            .find(|h| token_overlap(&h.text, &hypothesis.text) > config.hypothesis_merge_threshold);

        match existing {
            Some(h) => {
                h.confidence = (h.confidence
                    + hypothesis.confidence * config.hypothesis_boost_fraction)
                    .clamp(0.0, 1.0);
                h.salience = h.salience.max(hypothesis.salience).clamp(0.0, 1.0);
                for word in &hypothesis.evidence {
                    if !h.evidence.contains(word) {
                        h.evidence.push(word.clone());
                    }
                }
            }
            None => {
                if dream.hypotheses.len() < append_cap {
                    dream.hypotheses.push(hypothesis.clone());
                }
            }
        }
    }
}

// ============================================================================
// DECAY
// ============================================================================

/// Recompute every dream's confidence from its age and remove the ones
/// below the keep floor. Runs unconditionally on every engine run, so
/// forgetting continues through idle periods.
///
/// Returns the number of dreams removed.
pub fn decay_dreams(dreams: &mut Vec<Dream>, config: &LifecycleConfig, now: DateTime<Utc>) -> usize {
    for dream in dreams.iter_mut() {
        let rate = if dream.decay_rate > 0.0 {
            dream.decay_rate
        } else {
            config.default_decay_rate
        };
        let retention = config.decay_base.powf(dream.age_days(now) / rate);
        dream.confidence = (dream.initial_confidence * retention
            + dream.hits as f64 * config.hit_bonus)
            .clamp(0.0, 1.0);
    }

    let before = dreams.len();
    dreams.retain(|d| d.confidence >= config.keep_floor);
    before - dreams.len()
}
