//! SQLite Storage Implementation
//!
//! Durable backend for the signal collections, the dream store, and the
//! profile documents. Uses separate reader/writer connections for
//! interior mutability: all methods take `&self`, so the store is
//! `Send + Sync` and callers can share it behind an `Arc`.
//!
//! The dream collection keeps its load-all / write-all contract: `replace`
//! rewrites the whole table inside one transaction, so a failed run never
//! leaves a partial store behind.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Mutex;

use super::{migrations, DreamStore, Result, StoreError};
use crate::dream::{Dream, DreamKind};
use crate::hypothesis::Hypothesis;
use crate::profile::{merge_into_document, ProfileSink, ProfileUpdate};
use crate::signal::{Emotion, EmotionSnapshot, EmotionVector, GraphEdge, SignalSource};

// ============================================================================
// STORE
// ============================================================================

/// Embedded SQLite store for signals, dreams, and profiles
pub struct SqliteStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl SqliteStore {
    /// Apply PRAGMAs to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(())
    }

    /// Open (or create) a store
    ///
    /// With no explicit path the database lives in the platform data
    /// directory.
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = ProjectDirs::from("com", "reverie", "core").ok_or_else(|| {
                    StoreError::Init("Could not determine project directories".to_string())
                })?;

                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                data_dir.join("reverie.db")
            }
        };

        let writer_conn = Connection::open(&path)?;
        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
        })
    }

    // ========================================================================
    // Producer side of the signal contract
    // ========================================================================

    /// Append one snapshot. Called by the upstream emotion pipeline, never
    /// by the engine itself.
    pub fn append_snapshot(&self, snapshot: &EmotionSnapshot) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::Init("Writer lock poisoned".into()))?;
        writer.execute(
            "INSERT INTO snapshots (id, owner_key, timestamp, vector, keywords)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                snapshot.id,
                snapshot.owner_key,
                snapshot.timestamp.to_rfc3339(),
                serde_json::to_string(&snapshot.vector)?,
                serde_json::to_string(&snapshot.keywords)?,
            ],
        )?;
        Ok(())
    }

    /// Append one graph edge. Producer-side, like [`Self::append_snapshot`].
    pub fn append_edge(&self, edge: &GraphEdge) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::Init("Writer lock poisoned".into()))?;
        writer.execute(
            "INSERT INTO edges (id, word, emotion, weight, owner_key, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                edge.id,
                edge.word,
                edge.emotion.as_str(),
                edge.weight,
                edge.owner_key,
                edge.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The stored profile document for one owner
    pub fn profile_document(&self, owner: &str) -> Result<Option<Value>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StoreError::Init("Reader lock poisoned".into()))?;
        let raw: Option<String> = reader
            .query_row(
                "SELECT document FROM profiles WHERE owner_key = ?1",
                params![owner],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }
}

// ============================================================================
// SIGNAL SOURCE
// ============================================================================

impl SignalSource for SqliteStore {
    fn snapshots(
        &self,
        owner: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<EmotionSnapshot>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StoreError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT id, owner_key, timestamp, vector, keywords FROM snapshots
             WHERE (?1 IS NULL OR owner_key = ?1)
               AND (?2 IS NULL OR timestamp >= ?2)
             ORDER BY timestamp",
        )?;

        let rows: Vec<(String, String, DateTime<Utc>, String, String)> = stmt
            .query_map(
                params![owner, since.map(|t| t.to_rfc3339())],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )?
            .collect::<std::result::Result<_, _>>()?;

        let mut snapshots = Vec::with_capacity(rows.len());
        for (id, owner_key, timestamp, vector, keywords) in rows {
            snapshots.push(EmotionSnapshot {
                id,
                owner_key,
                timestamp,
                vector: serde_json::from_str::<EmotionVector>(&vector)?,
                keywords: serde_json::from_str(&keywords)?,
            });
        }
        Ok(snapshots)
    }

    fn edges(&self, owner: Option<&str>, since: Option<DateTime<Utc>>) -> Result<Vec<GraphEdge>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StoreError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT id, word, emotion, weight, owner_key, timestamp FROM edges
             WHERE (?1 IS NULL OR owner_key = ?1)
               AND (?2 IS NULL OR timestamp >= ?2)
             ORDER BY timestamp",
        )?;

        let rows: Vec<(String, String, String, f64, String, DateTime<Utc>)> = stmt
            .query_map(
                params![owner, since.map(|t| t.to_rfc3339())],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )?
            .collect::<std::result::Result<_, _>>()?;

        let mut edges = Vec::with_capacity(rows.len());
        for (id, word, emotion, weight, owner_key, timestamp) in rows {
            let Some(emotion) = Emotion::parse_name(&emotion) else {
                tracing::warn!("Skipping edge {} with unknown emotion '{}'", id, emotion);
                continue;
            };
            edges.push(GraphEdge {
                id,
                word,
                emotion,
                weight,
                owner_key,
                timestamp,
            });
        }
        Ok(edges)
    }
}

// ============================================================================
// DREAM STORE
// ============================================================================

impl DreamStore for SqliteStore {
    fn load(&self) -> Result<Vec<Dream>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StoreError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT id, owner_key, created_at, summary, hypotheses,
                    initial_confidence, confidence, decay_rate, hits,
                    last_reinforced_at, kind
             FROM dreams ORDER BY position",
        )?;

        type DreamRow = (
            String,
            Option<String>,
            DateTime<Utc>,
            String,
            String,
            f64,
            f64,
            f64,
            u32,
            DateTime<Utc>,
            String,
        );
        let rows: Vec<DreamRow> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                    row.get(9)?,
                    row.get(10)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        let mut dreams = Vec::with_capacity(rows.len());
        for (
            id,
            owner_key,
            created_at,
            summary,
            hypotheses,
            initial_confidence,
            confidence,
            decay_rate,
            hits,
            last_reinforced_at,
            kind,
        ) in rows
        {
            dreams.push(Dream {
                id,
                owner_key,
                created_at,
                summary,
                hypotheses: serde_json::from_str::<Vec<Hypothesis>>(&hypotheses)?,
                initial_confidence,
                confidence,
                decay_rate,
                hits,
                last_reinforced_at,
                kind: DreamKind::parse_name(&kind),
            });
        }
        Ok(dreams)
    }

    fn replace(&self, dreams: &[Dream]) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::Init("Writer lock poisoned".into()))?;
        let tx = writer.transaction()?;

        tx.execute("DELETE FROM dreams", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO dreams (
                    id, owner_key, created_at, summary, hypotheses,
                    initial_confidence, confidence, decay_rate, hits,
                    last_reinforced_at, kind, position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for (position, dream) in dreams.iter().enumerate() {
                stmt.execute(params![
                    dream.id,
                    dream.owner_key,
                    dream.created_at.to_rfc3339(),
                    dream.summary,
                    serde_json::to_string(&dream.hypotheses)?,
                    dream.initial_confidence,
                    dream.confidence,
                    dream.decay_rate,
                    dream.hits,
                    dream.last_reinforced_at.to_rfc3339(),
                    dream.kind.as_str(),
                    position as i64,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

// ============================================================================
// PROFILE SINK
// ============================================================================

impl ProfileSink for SqliteStore {
    fn merge_profile(&self, owner: &str, update: &ProfileUpdate) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::Init("Writer lock poisoned".into()))?;
        let tx = writer.transaction()?;

        let raw: Option<String> = tx
            .query_row(
                "SELECT document FROM profiles WHERE owner_key = ?1",
                params![owner],
                |row| row.get(0),
            )
            .optional()?;
        let mut document: Value = match raw {
            Some(text) => serde_json::from_str(&text)?,
            None => serde_json::json!({}),
        };

        merge_into_document(&mut document, update);

        tx.execute(
            "INSERT INTO profiles (owner_key, document, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(owner_key) DO UPDATE SET document = ?2, updated_at = ?3",
            params![
                owner,
                serde_json::to_string(&document)?,
                Utc::now().to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }
}
