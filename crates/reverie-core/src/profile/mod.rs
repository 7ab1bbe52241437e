//! Profile Integrator
//!
//! One-directional bridge from the dream store into a per-owner profile:
//! the top dreams become compact insight records, and configurable risk
//! rules can raise named flags. The engine never reads a profile back to
//! influence scoring, so there is no feedback cycle.
//!
//! Profiles are shared documents. The merge touches only the keys this
//! engine owns (`insights`, `flags`, `lastDreamAt`) and preserves
//! everything else verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::RwLock;
use uuid::Uuid;

use crate::dream::Dream;
use crate::store::{Result, StoreError};

/// Insights appended to a profile per run, at most
pub const MAX_INSIGHTS_PER_RUN: usize = 3;

// ============================================================================
// TYPES
// ============================================================================

/// Compact projection of a dream written into a profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInsight {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// The dream's summary at integration time
    pub summary: String,
    /// The dream's confidence at integration time
    pub confidence: f64,
    /// When the insight was written
    pub at: DateTime<Utc>,
}

/// One run's contribution to a profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// Insight records to append
    pub insights: Vec<ProfileInsight>,
    /// Flags to raise (a set: raising twice is a no-op)
    pub flags: BTreeSet<String>,
    /// When the contributing run finished
    pub last_dream_at: DateTime<Utc>,
}

/// A configurable risk pattern
///
/// Fires when any hypothesis text of a sufficiently confident dream
/// contains one of the patterns. Patterns are matched as lowercase
/// substrings; the rule set is supplied by the caller, not baked into the
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskRule {
    /// Flag raised on the profile when the rule fires
    pub flag: String,
    /// Lowercase substrings to look for in hypothesis texts
    pub patterns: Vec<String>,
    /// Minimum dream confidence for the rule to fire
    pub min_confidence: f64,
}

impl RiskRule {
    /// Rule with the standard 0.5 confidence threshold
    pub fn new(flag: &str, patterns: &[&str]) -> Self {
        Self {
            flag: flag.to_string(),
            patterns: patterns.iter().map(|p| p.to_lowercase()).collect(),
            min_confidence: 0.5,
        }
    }

    /// Whether this rule fires for the given dream
    pub fn matches(&self, dream: &Dream) -> bool {
        if dream.confidence <= self.min_confidence {
            return false;
        }
        dream.hypotheses.iter().any(|h| {
            let text = h.text.to_lowercase();
            self.patterns.iter().any(|p| text.contains(p))
        })
    }
}

// ============================================================================
// INTEGRATION
// ============================================================================

/// Build one run's profile contribution from the stored dreams
///
/// Takes the `MAX_INSIGHTS_PER_RUN` highest-confidence dreams for the
/// owner; risk rules are checked against that same selection. Returns
/// None when the owner has no dreams at all.
pub fn build_profile_update(
    dreams: &[Dream],
    owner: &str,
    rules: &[RiskRule],
    now: DateTime<Utc>,
) -> Option<ProfileUpdate> {
    let mut owned: Vec<&Dream> = dreams
        .iter()
        .filter(|d| d.matches_owner(Some(owner)))
        .collect();
    if owned.is_empty() {
        return None;
    }

    owned.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    owned.truncate(MAX_INSIGHTS_PER_RUN);

    let insights = owned
        .iter()
        .map(|d| ProfileInsight {
            id: Uuid::new_v4().to_string(),
            summary: d.summary.clone(),
            confidence: d.confidence,
            at: now,
        })
        .collect();

    let flags = rules
        .iter()
        .filter(|rule| owned.iter().any(|d| rule.matches(d)))
        .map(|rule| rule.flag.clone())
        .collect();

    Some(ProfileUpdate {
        insights,
        flags,
        last_dream_at: now,
    })
}

/// Merge an update into a profile document, preserving foreign fields
///
/// Shared by every [`ProfileSink`] backend so the merge semantics cannot
/// drift between them.
pub fn merge_into_document(document: &mut Value, update: &ProfileUpdate) {
    if !document.is_object() {
        *document = json!({});
    }
    let Some(object) = document.as_object_mut() else {
        return;
    };

    let insights = object
        .entry("insights")
        .or_insert_with(|| json!([]));
    if let Some(list) = insights.as_array_mut() {
        for insight in &update.insights {
            if let Ok(value) = serde_json::to_value(insight) {
                list.push(value);
            }
        }
    }

    let mut flags: BTreeSet<String> = object
        .get("flags")
        .and_then(|v| v.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();
    flags.extend(update.flags.iter().cloned());
    object.insert("flags".to_string(), json!(flags));

    object.insert(
        "lastDreamAt".to_string(),
        json!(update.last_dream_at.to_rfc3339()),
    );
}

// ============================================================================
// SINK CONTRACT
// ============================================================================

/// Write side of the profile collaborator
pub trait ProfileSink: Send + Sync {
    /// Merge one run's contribution into the owner's profile
    fn merge_profile(&self, owner: &str, update: &ProfileUpdate) -> Result<()>;
}

/// In-memory profile sink
#[derive(Debug, Default)]
pub struct MemoryProfiles {
    documents: RwLock<BTreeMap<String, Value>>,
}

impl MemoryProfiles {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored document for one owner
    pub fn document(&self, owner: &str) -> Option<Value> {
        self.documents
            .read()
            .ok()
            .and_then(|docs| docs.get(owner).cloned())
    }

    /// Seed a document, e.g. with fields owned by other collaborators
    pub fn put_document(&self, owner: &str, document: Value) {
        if let Ok(mut docs) = self.documents.write() {
            docs.insert(owner.to_string(), document);
        }
    }
}

impl ProfileSink for MemoryProfiles {
    fn merge_profile(&self, owner: &str, update: &ProfileUpdate) -> Result<()> {
        let mut docs = self
            .documents
            .write()
            .map_err(|_| StoreError::Init("Profile lock poisoned".into()))?;
        let document = docs.entry(owner.to_string()).or_insert_with(|| json!({}));
        merge_into_document(document, update);
        Ok(())
    }
}
