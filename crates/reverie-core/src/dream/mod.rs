//! Dreams - persisted, decaying bundles of hypotheses
//!
//! A dream is the engine's unit of synthesized insight. It is born from
//! one run's top hypotheses, strengthened when later runs produce a
//! textually similar candidate, weakened by wall-clock decay, and removed
//! once its confidence falls below the keep floor.
//!
//! Summary similarity is raw token overlap: approximate on purpose. Only
//! the threshold-crossing behavior is load-bearing, so a stronger string
//! metric can be substituted without changing the contract.

mod lifecycle;
mod meta;

pub use lifecycle::{
    compose_dream, decay_dreams, reinforce_or_append, LifecycleConfig, ReinforceOutcome,
};
pub use meta::{synthesize_meta_dreams, MetaConfig};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::hypothesis::Hypothesis;

// ============================================================================
// DREAM RECORDS
// ============================================================================

/// Whether a dream came from one run's signal or from clustering
/// hypotheses across existing dreams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DreamKind {
    /// Synthesized directly from one run's hypotheses
    #[default]
    Dream,
    /// Synthesized across the hypotheses of existing dreams
    MetaDream,
}

impl DreamKind {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DreamKind::Dream => "dream",
            DreamKind::MetaDream => "meta-dream",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Self {
        match s {
            "meta-dream" => DreamKind::MetaDream,
            _ => DreamKind::Dream,
        }
    }
}

impl std::fmt::Display for DreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted, decaying bundle of hypotheses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dream {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Owner of the underlying user data; None for global runs
    pub owner_key: Option<String>,
    /// When the dream was first composed
    pub created_at: DateTime<Utc>,
    /// Concatenation of the top hypothesis texts
    pub summary: String,
    /// The claims this dream bundles
    pub hypotheses: Vec<Hypothesis>,
    /// Confidence at composition time; grows with reinforcement
    pub initial_confidence: f64,
    /// Current confidence after decay and reinforcement, in [0, 1]
    pub confidence: f64,
    /// Days for one decay-base step of forgetting
    pub decay_rate: f64,
    /// How many times an equivalent dream was produced again.
    /// Monotonically increasing.
    pub hits: u32,
    /// When the dream last absorbed a candidate
    pub last_reinforced_at: DateTime<Utc>,
    /// Dream or meta-dream
    #[serde(rename = "type")]
    pub kind: DreamKind,
}

impl Dream {
    /// Build a fresh dream stamped at `now`
    pub fn new(
        owner_key: Option<&str>,
        summary: String,
        hypotheses: Vec<Hypothesis>,
        initial_confidence: f64,
        decay_rate: f64,
        kind: DreamKind,
        now: DateTime<Utc>,
    ) -> Self {
        let initial_confidence = initial_confidence.clamp(0.0, 1.0);
        Self {
            id: Uuid::new_v4().to_string(),
            owner_key: owner_key.map(String::from),
            created_at: now,
            summary,
            hypotheses,
            initial_confidence,
            confidence: initial_confidence,
            decay_rate,
            hits: 0,
            last_reinforced_at: now,
            kind,
        }
    }

    /// Whether this dream belongs to the given owner filter
    /// (None matches everything)
    pub fn matches_owner(&self, owner: Option<&str>) -> bool {
        match owner {
            None => true,
            Some(o) => self.owner_key.as_deref() == Some(o),
        }
    }

    /// Age in fractional days at `now`
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        ((now - self.created_at).num_seconds().max(0)) as f64 / 86_400.0
    }
}

// ============================================================================
// TOKEN SIMILARITY
// ============================================================================

/// Normalized token set of a text: lowercased, punctuation stripped,
/// tokens shorter than 3 characters dropped
pub fn normalize_tokens(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| w.len() >= 3)
        .collect()
}

/// Token-overlap similarity: intersection size over the larger set size
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let tokens_a = normalize_tokens(a);
    let tokens_b = normalize_tokens(b);

    let longest = tokens_a.len().max(tokens_b.len());
    if longest == 0 {
        return 0.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    intersection as f64 / longest as f64
}
