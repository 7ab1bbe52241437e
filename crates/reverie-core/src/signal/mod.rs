//! Signal Store boundary
//!
//! The engine consumes two append-only collections produced by the upstream
//! emotion-extraction pipeline:
//!
//! - **Snapshots**: timestamped emotion-vector readings with keywords
//! - **Graph edges**: weighted (word, emotion) co-occurrence facts
//!
//! Both are read-only from this side of the boundary. [`SignalSource`] is
//! the read contract; [`MemorySignals`] is the in-process implementation
//! used by tests and embedding callers, and the SQLite backend implements
//! the same trait over its own tables.

mod emotion;

pub use emotion::{Emotion, EmotionVector, EMOTION_COUNT, EMOTION_SCHEMA_VERSION};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use uuid::Uuid;

use crate::store::Result;

// ============================================================================
// SIGNAL RECORDS
// ============================================================================

/// One timestamped emotion-vector reading derived from user input
///
/// Immutable once written; owned by the Signal Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionSnapshot {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,
    /// Owner of the underlying user data
    pub owner_key: String,
    /// L2-normalized emotion reading
    pub vector: EmotionVector,
    /// Keywords extracted alongside the reading
    pub keywords: Vec<String>,
}

impl EmotionSnapshot {
    /// Build a snapshot stamped now. The vector is L2-normalized on entry.
    pub fn new(owner_key: &str, vector: EmotionVector, keywords: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            owner_key: owner_key.to_string(),
            vector: vector.normalized_l2(),
            keywords,
        }
    }

    /// Peak emotional intensity of this reading
    pub fn intensity(&self) -> f64 {
        self.vector.peak()
    }
}

/// A weighted (word, emotion) co-occurrence fact
///
/// Append-only. Duplicates across time are expected and intentional:
/// frequency matters downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// The observed word, already normalized by the upstream pipeline
    pub word: String,
    /// The emotion it co-occurred with
    pub emotion: Emotion,
    /// Edge weight, clamped to [0, 1]
    pub weight: f64,
    /// Owner of the underlying user data
    pub owner_key: String,
    /// When the co-occurrence was observed
    pub timestamp: DateTime<Utc>,
}

impl GraphEdge {
    /// Build an edge stamped now
    pub fn new(owner_key: &str, word: &str, emotion: Emotion, weight: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            word: word.to_string(),
            emotion,
            weight: weight.clamp(0.0, 1.0),
            owner_key: owner_key.to_string(),
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// READ CONTRACT
// ============================================================================

/// Read-only view of the signal store
///
/// Both methods return filtered copies: by owner key (None = all owners)
/// and by a lower time bound (None = everything). Implementations must not
/// expose any way for the engine to mutate the underlying collections.
pub trait SignalSource: Send + Sync {
    /// Snapshots, filtered by owner and time window
    fn snapshots(
        &self,
        owner: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<EmotionSnapshot>>;

    /// Graph edges, filtered by owner and time window
    fn edges(&self, owner: Option<&str>, since: Option<DateTime<Utc>>) -> Result<Vec<GraphEdge>>;
}

// ============================================================================
// IN-MEMORY SIGNALS
// ============================================================================

/// In-memory signal store
///
/// Used by tests and by callers that feed the engine directly without an
/// on-disk store. Appends go through `&self` so the store can sit behind
/// an `Arc` next to the engine.
#[derive(Debug, Default)]
pub struct MemorySignals {
    snapshots: RwLock<Vec<EmotionSnapshot>>,
    edges: RwLock<Vec<GraphEdge>>,
}

impl MemorySignals {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot
    pub fn push_snapshot(&self, snapshot: EmotionSnapshot) {
        if let Ok(mut snapshots) = self.snapshots.write() {
            snapshots.push(snapshot);
        }
    }

    /// Append a graph edge
    pub fn push_edge(&self, edge: GraphEdge) {
        if let Ok(mut edges) = self.edges.write() {
            edges.push(edge);
        }
    }
}

fn matches_owner(owner: Option<&str>, key: &str) -> bool {
    owner.is_none_or(|o| o == key)
}

fn matches_since(since: Option<DateTime<Utc>>, at: DateTime<Utc>) -> bool {
    since.is_none_or(|s| at >= s)
}

impl SignalSource for MemorySignals {
    fn snapshots(
        &self,
        owner: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<EmotionSnapshot>> {
        let snapshots = self
            .snapshots
            .read()
            .map_err(|_| crate::store::StoreError::Init("Snapshot lock poisoned".into()))?;
        Ok(snapshots
            .iter()
            .filter(|s| matches_owner(owner, &s.owner_key) && matches_since(since, s.timestamp))
            .cloned()
            .collect())
    }

    fn edges(&self, owner: Option<&str>, since: Option<DateTime<Utc>>) -> Result<Vec<GraphEdge>> {
        let edges = self
            .edges
            .read()
            .map_err(|_| crate::store::StoreError::Init("Edge lock poisoned".into()))?;
        Ok(edges
            .iter()
            .filter(|e| matches_owner(owner, &e.owner_key) && matches_since(since, e.timestamp))
            .cloned()
            .collect())
    }
}
