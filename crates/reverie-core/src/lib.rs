//! # Reverie Core
//!
//! Associative insight-memory engine. Turns a time-ordered stream of
//! per-user emotional signals into a decaying, self-reinforcing set of
//! weighted associations, and periodically synthesizes higher-order
//! "dreams" - clustered hypotheses about recurring emotional and topical
//! patterns - that feed back into a user profile.
//!
//! ## Pipeline (one run, strictly sequential)
//!
//! 1. **Aggregate**: collapse the word-emotion edge graph into per-word
//!    emotion-distribution vectors
//! 2. **Cluster**: partition word vectors into `max(1, floor(sqrt(n)))`
//!    groups with a bounded, seeded heuristic
//! 3. **Score**: emit cluster and temporal hypotheses, blend salience
//!    from confidence, frequency, recency, and intensity
//! 4. **Compose / Reinforce**: merge the candidate dream into a similar
//!    recent one, or store it as new
//! 5. **Decay**: recompute every dream's confidence from its age and
//!    forget the ones below the keep floor
//! 6. **Meta-synthesize**: cluster hypotheses *across* dreams into
//!    meta-dreams
//! 7. **Persist & Integrate**: write the collection back whole, then push
//!    top dreams into the owner's profile
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use reverie_core::{Engine, RunOptions, SqliteStore};
//!
//! let store = Arc::new(SqliteStore::new(None)?);
//! let engine = Engine::new(store.clone(), store.clone(), store);
//!
//! let report = engine.run(Some("owner-1"), &RunOptions::default());
//! println!("produced_new={} reinforced={}", report.produced_new, report.reinforced);
//!
//! for dream in engine.query(Some("owner-1"), Some(30), 0.3)? {
//!     println!("{:?}", engine.summarize(&dream));
//! }
//! ```
//!
//! ## Concurrency model
//!
//! One logical owner, one active run: the engine performs no internal
//! locking and expects the external scheduler never to overlap two runs
//! over the same owner's data. Separate owners may run concurrently -
//! their data is disjoint and every collaborator is `Send + Sync`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod aggregate;
pub mod cluster;
pub mod dream;
pub mod engine;
pub mod hypothesis;
pub mod profile;
pub mod signal;
pub mod store;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Signal boundary
pub use signal::{
    Emotion, EmotionSnapshot, EmotionVector, GraphEdge, MemorySignals, SignalSource,
    EMOTION_COUNT, EMOTION_SCHEMA_VERSION,
};

// Aggregation
pub use aggregate::{aggregate_edges, WordVector, WordVectorSet};

// Clustering
pub use cluster::{cluster_count, cluster_with_k, cluster_word_vectors, Cluster, ClusterConfig};

// Hypotheses
pub use hypothesis::{
    build_hypotheses, cluster_hypotheses, score_salience, temporal_hypotheses, Hypothesis,
    SalienceWeights, ScorerConfig,
};

// Dream lifecycle
pub use dream::{
    compose_dream, decay_dreams, reinforce_or_append, synthesize_meta_dreams, token_overlap,
    Dream, DreamKind, LifecycleConfig, MetaConfig, ReinforceOutcome,
};

// Storage layer
pub use store::{DreamStore, MemoryDreams, SqliteStore, StoreError, MIGRATIONS};

// Profile integration
pub use profile::{
    build_profile_update, merge_into_document, MemoryProfiles, ProfileInsight, ProfileSink,
    ProfileUpdate, RiskRule,
};

// Engine surface
pub use engine::{
    DisplayDream, DisplayHypothesis, Engine, EngineConfig, EngineError, PurgeReport, Result,
    RunOptions, RunReport, RunStatus, StoreStats,
};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Dream, DreamKind, DreamStore, Emotion, EmotionSnapshot, EmotionVector, Engine,
        EngineConfig, EngineError, GraphEdge, Hypothesis, MemoryDreams, MemoryProfiles,
        MemorySignals, ProfileSink, Result, RunOptions, RunReport, RunStatus, SignalSource,
        SqliteStore,
    };
}
