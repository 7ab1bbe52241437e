//! Engine - the public surface of the insight-memory subsystem
//!
//! One [`Engine::run`] executes the whole pipeline strictly in sequence:
//! read signals, aggregate, cluster, score, compose/reinforce, decay,
//! meta-synthesize, persist, integrate the profile. The engine performs
//! no internal locking: the external scheduler guarantees at most one
//! active run per owner, and different owners touch disjoint data.
//!
//! Persistence is all-or-nothing. The dream collection is loaded once at
//! run start, mutated in memory, and written back whole; a failed write
//! discards the run and leaves the store in its last-known-good state.
//!
//! `run` never returns an error - every internal fault is folded into the
//! returned [`RunReport`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::aggregate::aggregate_edges;
use crate::cluster::{cluster_word_vectors, ClusterConfig};
use crate::dream::{
    compose_dream, decay_dreams, reinforce_or_append, synthesize_meta_dreams, Dream, DreamKind,
    LifecycleConfig, MetaConfig, ReinforceOutcome,
};
use crate::hypothesis::{build_hypotheses, Hypothesis, ScorerConfig};
use crate::profile::{build_profile_update, ProfileSink, RiskRule};
use crate::signal::SignalSource;
use crate::store::{DreamStore, StoreError};

/// Hypotheses echoed back in a run report
const TOP_HYPOTHESES_IN_REPORT: usize = 5;

/// Default clustering seed; overridable per run for reproducible tests
const DEFAULT_CLUSTER_SEED: u64 = 42;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Engine error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Engine result type
pub type Result<T> = std::result::Result<T, EngineError>;

// ============================================================================
// CONFIG
// ============================================================================

/// Engine knobs, grouping the per-stage configs
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How far back a run reads signal data, in days. None reads
    /// everything.
    pub signal_window_days: Option<i64>,
    /// Clustering knobs
    pub cluster: ClusterConfig,
    /// Hypothesis scoring knobs
    pub scorer: ScorerConfig,
    /// Dream lifecycle knobs
    pub lifecycle: LifecycleConfig,
    /// Meta-dream synthesis knobs
    pub meta: MetaConfig,
    /// Risk patterns checked during profile integration
    pub risk_rules: Vec<RiskRule>,
    /// Clustering seed used when a run does not supply one
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            signal_window_days: Some(30),
            cluster: ClusterConfig::default(),
            scorer: ScorerConfig::default(),
            lifecycle: LifecycleConfig::default(),
            meta: MetaConfig::default(),
            risk_rules: Vec::new(),
            seed: DEFAULT_CLUSTER_SEED,
        }
    }
}

/// Per-run options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Store a candidate dream even when it carries no hypotheses
    pub force: bool,
    /// Override the configured cluster cap for this run
    pub max_clusters: Option<usize>,
    /// Override the clustering seed for this run
    pub seed: Option<u64>,
}

// ============================================================================
// REPORTS
// ============================================================================

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// Pipeline ran to completion and persisted
    Completed,
    /// Not enough signal to cluster; store untouched
    NoData,
    /// Internal fault; store left in last-known-good state
    Failed,
}

/// Outcome of one engine run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// How the run ended
    pub status: RunStatus,
    /// Whether a new dream was appended
    pub produced_new: bool,
    /// Whether the candidate reinforced an existing dream
    pub reinforced: bool,
    /// The run's highest-salience hypotheses
    pub top_hypotheses: Vec<Hypothesis>,
    /// Meta-dreams synthesized this run (before any merged away)
    pub meta_dreams: Vec<Dream>,
    /// Dreams forgotten by decay this run
    pub dreams_removed: usize,
    /// Fault description when status is Failed
    pub error: Option<String>,
}

impl RunReport {
    fn empty(status: RunStatus) -> Self {
        Self {
            status,
            produced_new: false,
            reinforced: false,
            top_hypotheses: Vec::new(),
            meta_dreams: Vec::new(),
            dreams_removed: 0,
            error: None,
        }
    }

    fn failed(message: String) -> Self {
        let mut report = Self::empty(RunStatus::Failed);
        report.error = Some(message);
        report
    }
}

/// Outcome of a purge
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeReport {
    /// Dreams permanently deleted
    pub removed: usize,
    /// Dreams still stored
    pub remaining: usize,
}

/// Aggregate numbers over the stored dreams
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Ordinary dreams stored
    pub dreams: usize,
    /// Meta-dreams stored
    pub meta_dreams: usize,
    /// Mean confidence across both
    pub average_confidence: f64,
    /// Creation time of the oldest stored dream
    pub oldest: Option<DateTime<Utc>>,
    /// Creation time of the newest stored dream
    pub newest: Option<DateTime<Utc>>,
}

/// Display-safe projection of a hypothesis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayHypothesis {
    /// The claim
    pub text: String,
    /// Confidence rounded for display
    pub confidence: f64,
}

/// Display-safe projection of a dream: no scoring internals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayDream {
    /// Dream id
    pub id: String,
    /// Owner, if any
    pub owner_key: Option<String>,
    /// When the dream was composed
    pub created_at: DateTime<Utc>,
    /// Summary text
    pub summary: String,
    /// Confidence rounded for display
    pub confidence: f64,
    /// Dream or meta-dream
    pub kind: DreamKind,
    /// Reinforcement count
    pub hits: u32,
    /// The bundled claims
    pub hypotheses: Vec<DisplayHypothesis>,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// ============================================================================
// ENGINE
// ============================================================================

/// The insight-memory engine
///
/// Collaborators are injected, so the engine runs the same against the
/// in-memory stores (tests) and the SQLite backend (production).
pub struct Engine {
    signals: Arc<dyn SignalSource>,
    dreams: Arc<dyn DreamStore>,
    profiles: Arc<dyn ProfileSink>,
    config: EngineConfig,
}

impl Engine {
    /// Engine with default configuration
    pub fn new(
        signals: Arc<dyn SignalSource>,
        dreams: Arc<dyn DreamStore>,
        profiles: Arc<dyn ProfileSink>,
    ) -> Self {
        Self::with_config(signals, dreams, profiles, EngineConfig::default())
    }

    /// Engine with explicit configuration
    pub fn with_config(
        signals: Arc<dyn SignalSource>,
        dreams: Arc<dyn DreamStore>,
        profiles: Arc<dyn ProfileSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            signals,
            dreams,
            profiles,
            config,
        }
    }

    /// Execute one full pipeline run for an owner (None = global)
    pub fn run(&self, owner: Option<&str>, options: &RunOptions) -> RunReport {
        match self.run_inner(owner, options) {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(owner = ?owner, "Run failed, store left untouched: {}", e);
                RunReport::failed(e.to_string())
            }
        }
    }

    fn run_inner(&self, owner: Option<&str>, options: &RunOptions) -> Result<RunReport> {
        let now = Utc::now();
        let since = self.config.signal_window_days.map(|d| now - Duration::days(d));

        let snapshots = self.signals.snapshots(owner, since)?;
        let edges = self.signals.edges(owner, since)?;
        if snapshots.is_empty() && edges.is_empty() {
            return Ok(RunReport::empty(RunStatus::NoData));
        }

        let vectors = aggregate_edges(&edges);
        if vectors.is_empty() {
            return Ok(RunReport::empty(RunStatus::NoData));
        }

        let mut cluster_config = self.config.cluster.clone();
        if let Some(max) = options.max_clusters {
            cluster_config.max_clusters = max;
        }
        let seed = options.seed.unwrap_or(self.config.seed);
        let clusters = cluster_word_vectors(&vectors.items, &cluster_config, seed);

        let hypotheses = build_hypotheses(
            &clusters,
            &vectors,
            &edges,
            &snapshots,
            &self.config.scorer,
            now,
        );

        let mut stored = self.dreams.load()?;
        let lifecycle = &self.config.lifecycle;

        let candidate = compose_dream(owner, &hypotheses, lifecycle, now);
        let outcome = reinforce_or_append(&mut stored, candidate, options.force, lifecycle, now);

        let dreams_removed = decay_dreams(&mut stored, lifecycle, now);

        let meta_dreams =
            synthesize_meta_dreams(&stored, owner, &self.config.meta, lifecycle, now);
        for meta in &meta_dreams {
            reinforce_or_append(&mut stored, meta.clone(), false, lifecycle, now);
        }

        // The single suspension point: everything above is in-memory
        self.dreams.replace(&stored)?;

        if let Some(owner) = owner {
            if let Some(update) =
                build_profile_update(&stored, owner, &self.config.risk_rules, now)
            {
                self.profiles.merge_profile(owner, &update)?;
            }
        }

        let produced_new = matches!(outcome, ReinforceOutcome::Appended { .. });
        let reinforced = matches!(outcome, ReinforceOutcome::Reinforced { .. });
        tracing::info!(
            owner = ?owner,
            produced_new,
            reinforced,
            meta_dreams = meta_dreams.len(),
            dreams_removed,
            "Run completed"
        );

        Ok(RunReport {
            status: RunStatus::Completed,
            produced_new,
            reinforced,
            top_hypotheses: hypotheses
                .into_iter()
                .take(TOP_HYPOTHESES_IN_REPORT)
                .collect(),
            meta_dreams,
            dreams_removed,
            error: None,
        })
    }

    /// Stored dreams matching an owner, an age window, and a confidence
    /// floor, newest first
    pub fn query(
        &self,
        owner: Option<&str>,
        since_days: Option<i64>,
        min_confidence: f64,
    ) -> Result<Vec<Dream>> {
        let now = Utc::now();
        let floor = since_days.map(|d| now - Duration::days(d));

        let mut dreams: Vec<Dream> = self
            .dreams
            .load()?
            .into_iter()
            .filter(|d| d.matches_owner(owner))
            .filter(|d| floor.is_none_or(|f| d.created_at >= f))
            .filter(|d| d.confidence >= min_confidence)
            .collect();
        dreams.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(dreams)
    }

    /// Permanently delete dreams past an age cutoff
    pub fn purge(&self, older_than_days: i64) -> Result<PurgeReport> {
        let cutoff = Utc::now() - Duration::days(older_than_days);

        let mut dreams = self.dreams.load()?;
        let before = dreams.len();
        dreams.retain(|d| d.created_at >= cutoff);
        let removed = before - dreams.len();

        if removed > 0 {
            self.dreams.replace(&dreams)?;
        }
        tracing::info!(removed, remaining = dreams.len(), "Purged old dreams");

        Ok(PurgeReport {
            removed,
            remaining: dreams.len(),
        })
    }

    /// Display-safe projection of a dream
    pub fn summarize(&self, dream: &Dream) -> DisplayDream {
        DisplayDream {
            id: dream.id.clone(),
            owner_key: dream.owner_key.clone(),
            created_at: dream.created_at,
            summary: dream.summary.clone(),
            confidence: round2(dream.confidence),
            kind: dream.kind,
            hits: dream.hits,
            hypotheses: dream
                .hypotheses
                .iter()
                .map(|h| DisplayHypothesis {
                    text: h.text.clone(),
                    confidence: round2(h.confidence),
                })
                .collect(),
        }
    }

    /// Aggregate numbers over the stored dreams
    pub fn stats(&self, owner: Option<&str>) -> Result<StoreStats> {
        let dreams: Vec<Dream> = self
            .dreams
            .load()?
            .into_iter()
            .filter(|d| d.matches_owner(owner))
            .collect();

        let meta_count = dreams
            .iter()
            .filter(|d| d.kind == DreamKind::MetaDream)
            .count();
        let average_confidence = if dreams.is_empty() {
            0.0
        } else {
            dreams.iter().map(|d| d.confidence).sum::<f64>() / dreams.len() as f64
        };

        Ok(StoreStats {
            dreams: dreams.len() - meta_count,
            meta_dreams: meta_count,
            average_confidence,
            oldest: dreams.iter().map(|d| d.created_at).min(),
            newest: dreams.iter().map(|d| d.created_at).max(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::MemoryProfiles;
    use crate::signal::{Emotion, EmotionSnapshot, EmotionVector, GraphEdge, MemorySignals};
    use crate::store::MemoryDreams;

    struct Harness {
        signals: Arc<MemorySignals>,
        dreams: Arc<MemoryDreams>,
        profiles: Arc<MemoryProfiles>,
        engine: Engine,
    }

    fn harness() -> Harness {
        harness_with_config(EngineConfig::default())
    }

    fn harness_with_config(config: EngineConfig) -> Harness {
        let signals = Arc::new(MemorySignals::new());
        let dreams = Arc::new(MemoryDreams::new());
        let profiles = Arc::new(MemoryProfiles::new());
        let engine = Engine::with_config(
            signals.clone(),
            dreams.clone(),
            profiles.clone(),
            config,
        );
        Harness {
            signals,
            dreams,
            profiles,
            engine,
        }
    }

    fn seed_anxiety_signal(signals: &MemorySignals, owner: &str) {
        for weight in [0.5, 0.6, 0.7, 0.8] {
            signals.push_edge(GraphEdge::new(owner, "work", Emotion::Anxiety, weight));
        }
        signals.push_edge(GraphEdge::new(owner, "deadline", Emotion::Anxiety, 0.6));
        signals.push_snapshot(EmotionSnapshot::new(
            owner,
            EmotionVector::single(Emotion::Anxiety, 1.0),
            vec!["work".to_string()],
        ));
    }

    // ========== Run Tests ==========

    #[test]
    fn test_run_without_signal_reports_no_data() {
        let h = harness();

        let report = h.engine.run(Some("ada"), &RunOptions::default());
        assert_eq!(report.status, RunStatus::NoData);
        assert!(!report.produced_new);
        assert!(h.dreams.load().unwrap().is_empty());
        assert!(h.profiles.document("ada").is_none());
    }

    #[test]
    fn test_run_produces_a_dream() {
        let h = harness();
        seed_anxiety_signal(&h.signals, "ada");

        let report = h.engine.run(Some("ada"), &RunOptions::default());
        assert_eq!(report.status, RunStatus::Completed);
        assert!(report.produced_new);
        assert!(!report.reinforced);
        assert!(!report.top_hypotheses.is_empty());

        let dreams = h.engine.query(Some("ada"), None, 0.0).unwrap();
        assert_eq!(dreams.len(), 1);
        assert!(dreams[0].summary.contains("anxiety"));
    }

    #[test]
    fn test_second_identical_run_reinforces() {
        let h = harness();
        seed_anxiety_signal(&h.signals, "ada");

        let first = h.engine.run(Some("ada"), &RunOptions::default());
        assert!(first.produced_new);

        let second = h.engine.run(Some("ada"), &RunOptions::default());
        assert_eq!(second.status, RunStatus::Completed);
        assert!(second.reinforced);
        assert!(!second.produced_new);

        let dreams = h.engine.query(Some("ada"), None, 0.0).unwrap();
        assert_eq!(dreams.len(), 1);
        assert_eq!(dreams[0].hits, 1);
    }

    #[test]
    fn test_owners_stay_disjoint() {
        let h = harness();
        seed_anxiety_signal(&h.signals, "ada");
        for weight in [0.5, 0.6, 0.7] {
            h.signals
                .push_edge(GraphEdge::new("ben", "garden", Emotion::Calm, weight));
        }

        h.engine.run(Some("ada"), &RunOptions::default());
        h.engine.run(Some("ben"), &RunOptions::default());

        let ada = h.engine.query(Some("ada"), None, 0.0).unwrap();
        let ben = h.engine.query(Some("ben"), None, 0.0).unwrap();
        assert_eq!(ada.len(), 1);
        assert_eq!(ben.len(), 1);
        assert!(ben[0].summary.contains("calm"));
    }

    #[test]
    fn test_confidences_stay_clamped_across_runs() {
        let h = harness();
        seed_anxiety_signal(&h.signals, "ada");

        for _ in 0..8 {
            h.engine.run(Some("ada"), &RunOptions::default());
        }

        for dream in h.engine.query(None, None, 0.0).unwrap() {
            assert!((0.0..=1.0).contains(&dream.confidence));
            assert!((0.0..=1.0).contains(&dream.initial_confidence));
            for hypothesis in &dream.hypotheses {
                assert!((0.0..=1.0).contains(&hypothesis.confidence));
                assert!((0.0..=1.0).contains(&hypothesis.salience));
            }
        }
    }

    #[test]
    fn test_decayed_dream_leaves_query_results() {
        let h = harness();
        seed_anxiety_signal(&h.signals, "ada");

        // A long-forgotten dream sits in the store before the run
        let mut stale = crate::dream::compose_dream(
            Some("ada"),
            &[Hypothesis {
                text: "old faded unrelated theme".to_string(),
                confidence: 0.5,
                evidence: vec!["faded".to_string()],
                salience: 0.5,
            }],
            &LifecycleConfig::default(),
            Utc::now() - Duration::days(400),
        );
        stale.created_at = Utc::now() - Duration::days(400);
        h.dreams.replace(&[stale]).unwrap();

        let report = h.engine.run(Some("ada"), &RunOptions::default());
        assert_eq!(report.dreams_removed, 1);

        let dreams = h.engine.query(Some("ada"), None, 0.0).unwrap();
        assert_eq!(dreams.len(), 1);
        assert!(!dreams[0].summary.contains("faded"));
    }

    #[test]
    fn test_profile_receives_insights_and_flags() {
        let mut config = EngineConfig::default();
        config.risk_rules = vec![crate::profile::RiskRule::new(
            "sleep-disruption",
            &["late at night"],
        )];
        let h = harness_with_config(config);

        // Night-skewed edges so a temporal hypothesis lands in the dream
        for _ in 0..4 {
            let mut edge = GraphEdge::new("ada", "work", Emotion::Anxiety, 0.7);
            edge.timestamp = edge
                .timestamp
                .date_naive()
                .and_hms_opt(23, 30, 0)
                .map(|t| t.and_utc())
                .unwrap_or(edge.timestamp);
            h.signals.push_edge(edge);
        }
        h.signals.push_snapshot(EmotionSnapshot::new(
            "ada",
            EmotionVector::single(Emotion::Anxiety, 1.0),
            vec!["work".to_string()],
        ));

        let report = h.engine.run(Some("ada"), &RunOptions::default());
        assert_eq!(report.status, RunStatus::Completed);

        let document = h.profiles.document("ada").unwrap();
        assert!(!document["insights"].as_array().unwrap().is_empty());
        let flags = document["flags"].as_array().unwrap();
        assert!(flags.iter().any(|f| f == "sleep-disruption"));
        assert!(document["lastDreamAt"].is_string());
    }

    #[test]
    fn test_global_run_skips_profile() {
        let h = harness();
        seed_anxiety_signal(&h.signals, "ada");

        let report = h.engine.run(None, &RunOptions::default());
        assert_eq!(report.status, RunStatus::Completed);
        assert!(h.profiles.document("ada").is_none());

        let dreams = h.engine.query(None, None, 0.0).unwrap();
        assert_eq!(dreams[0].owner_key, None);
    }

    // ========== Query / Purge / Stats Tests ==========

    #[test]
    fn test_query_filters_and_orders() {
        let h = harness();
        let now = Utc::now();

        let mut old = crate::dream::compose_dream(
            Some("ada"),
            &[Hypothesis {
                text: "old theme".to_string(),
                confidence: 0.9,
                evidence: vec!["old".to_string()],
                salience: 0.9,
            }],
            &LifecycleConfig::default(),
            now - Duration::days(20),
        );
        old.created_at = now - Duration::days(20);
        let faint = {
            let mut d = old.clone();
            d.id = "faint".to_string();
            d.created_at = now;
            d.confidence = 0.1;
            d.summary = "faint theme".to_string();
            d
        };
        let fresh = {
            let mut d = old.clone();
            d.id = "fresh".to_string();
            d.created_at = now;
            d.confidence = 0.8;
            d.summary = "fresh theme".to_string();
            d
        };
        h.dreams.replace(&[old, faint, fresh]).unwrap();

        let recent = h.engine.query(Some("ada"), Some(7), 0.5).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].summary, "fresh theme");

        let all = h.engine.query(Some("ada"), None, 0.0).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].created_at >= all[2].created_at);
    }

    #[test]
    fn test_purge_removes_old_dreams() {
        let h = harness();
        seed_anxiety_signal(&h.signals, "ada");
        h.engine.run(Some("ada"), &RunOptions::default());

        let mut dreams = h.dreams.load().unwrap();
        dreams[0].created_at = Utc::now() - Duration::days(90);
        h.dreams.replace(&dreams).unwrap();

        let report = h.engine.purge(30).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(report.remaining, 0);
        assert!(h.engine.query(None, None, 0.0).unwrap().is_empty());
    }

    #[test]
    fn test_summarize_rounds_and_hides_internals() {
        let h = harness();
        seed_anxiety_signal(&h.signals, "ada");
        h.engine.run(Some("ada"), &RunOptions::default());

        let dreams = h.engine.query(Some("ada"), None, 0.0).unwrap();
        let display = h.engine.summarize(&dreams[0]);

        assert_eq!(display.id, dreams[0].id);
        assert_eq!(display.summary, dreams[0].summary);
        assert!((display.confidence * 100.0).fract().abs() < 1e-9);
        assert_eq!(display.hypotheses.len(), dreams[0].hypotheses.len());

        let json = serde_json::to_value(&display).unwrap();
        assert!(json.get("initialConfidence").is_none());
        assert!(json.get("decayRate").is_none());
    }

    #[test]
    fn test_stats_counts_kinds() {
        let h = harness();
        seed_anxiety_signal(&h.signals, "ada");
        h.engine.run(Some("ada"), &RunOptions::default());

        let stats = h.engine.stats(Some("ada")).unwrap();
        assert_eq!(stats.dreams + stats.meta_dreams, 1);
        assert!(stats.average_confidence > 0.0);
        assert!(stats.oldest.is_some());
    }
}
