//! Test harness: a disposable SQLite-backed engine plus signal seeding

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reverie_core::{
    Emotion, EmotionSnapshot, EmotionVector, Engine, EngineConfig, GraphEdge, SqliteStore,
};
use tempfile::TempDir;

/// A SQLite-backed engine over a temporary database
pub struct TestEngine {
    /// Keeps the database directory alive for the test's duration
    pub dir: TempDir,
    /// The shared backend (signals, dreams, and profiles)
    pub store: Arc<SqliteStore>,
    /// Engine under test
    pub engine: Engine,
}

/// Build an engine with default configuration
pub fn sqlite_engine() -> TestEngine {
    sqlite_engine_with_config(EngineConfig::default())
}

/// Build an engine with explicit configuration
pub fn sqlite_engine_with_config(config: EngineConfig) -> TestEngine {
    let dir = TempDir::new().expect("create temp dir");
    let store = Arc::new(
        SqliteStore::new(Some(dir.path().join("reverie.db"))).expect("open sqlite store"),
    );
    let engine = Engine::with_config(store.clone(), store.clone(), store.clone(), config);
    TestEngine { dir, store, engine }
}

/// Reopen an engine over an existing database directory
pub fn reopen(dir: TempDir) -> TestEngine {
    let store = Arc::new(
        SqliteStore::new(Some(dir.path().join("reverie.db"))).expect("reopen sqlite store"),
    );
    let engine = Engine::new(store.clone(), store.clone(), store.clone());
    TestEngine { dir, store, engine }
}

/// A timestamp `days_ago` days back, pinned to the given hour of day
pub fn at_hour(days_ago: i64, hour: u32) -> DateTime<Utc> {
    (Utc::now() - Duration::days(days_ago))
        .date_naive()
        .and_hms_opt(hour, 15, 0)
        .expect("valid hour")
        .and_utc()
}

/// Append one edge with an explicit timestamp
pub fn edge_at(
    store: &SqliteStore,
    owner: &str,
    word: &str,
    emotion: Emotion,
    weight: f64,
    timestamp: DateTime<Utc>,
) {
    let mut edge = GraphEdge::new(owner, word, emotion, weight);
    edge.timestamp = timestamp;
    store.append_edge(&edge).expect("append edge");
}

/// Seed the night-time anxiety scenario: snapshots tagged "work" and
/// repeated late-night work/anxiety edges
pub fn seed_night_anxiety(store: &SqliteStore, owner: &str) {
    for i in 0..5 {
        let mut snapshot = EmotionSnapshot::new(
            owner,
            EmotionVector::single(Emotion::Anxiety, 1.0),
            vec!["work".to_string()],
        );
        snapshot.timestamp = at_hour(i, 23);
        store.append_snapshot(&snapshot).expect("append snapshot");
    }

    for (i, weight) in [0.5, 0.6, 0.7, 0.8].into_iter().enumerate() {
        edge_at(
            store,
            owner,
            "work",
            Emotion::Anxiety,
            weight,
            at_hour(i as i64, 23),
        );
    }
}
