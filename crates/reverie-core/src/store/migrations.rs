//! Database Migrations
//!
//! Schema migration definitions for the SQLite backend.

/// A single schema migration
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: signal collections and dream store",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Per-owner profile documents",
        up: MIGRATION_V2_UP,
    },
];

/// V1: signal collections (append-only) and the dream collection
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS snapshots (
    id TEXT PRIMARY KEY,
    owner_key TEXT NOT NULL,
    timestamp TEXT NOT NULL,

    -- Positional over the closed emotion label set
    vector TEXT NOT NULL,
    keywords TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_snapshots_owner_time
    ON snapshots(owner_key, timestamp);

CREATE TABLE IF NOT EXISTS edges (
    id TEXT PRIMARY KEY,
    word TEXT NOT NULL,
    emotion TEXT NOT NULL,
    weight REAL NOT NULL DEFAULT 0.0,
    owner_key TEXT NOT NULL,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_edges_owner_time
    ON edges(owner_key, timestamp);

CREATE TABLE IF NOT EXISTS dreams (
    id TEXT PRIMARY KEY,
    owner_key TEXT,
    created_at TEXT NOT NULL,
    summary TEXT NOT NULL DEFAULT '',
    hypotheses TEXT NOT NULL DEFAULT '[]',
    initial_confidence REAL NOT NULL DEFAULT 0.0,
    confidence REAL NOT NULL DEFAULT 0.0,
    decay_rate REAL NOT NULL DEFAULT 7.0,
    hits INTEGER NOT NULL DEFAULT 0,
    last_reinforced_at TEXT NOT NULL,
    kind TEXT NOT NULL DEFAULT 'dream',

    -- Preserves insertion order across whole-collection rewrites
    position INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_dreams_owner ON dreams(owner_key);

INSERT INTO schema_version (version) VALUES (1);
"#;

/// V2: profile documents, merged key-by-key so foreign fields survive
const MIGRATION_V2_UP: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
    owner_key TEXT PRIMARY KEY,
    document TEXT NOT NULL DEFAULT '{}',
    updated_at TEXT NOT NULL
);

INSERT INTO schema_version (version) VALUES (2);
"#;

/// Get current schema version
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_migrations_apply_cleanly() {
        let conn = Connection::open_in_memory().unwrap();
        let applied = apply_migrations(&conn).unwrap();
        assert_eq!(applied as usize, MIGRATIONS.len());
        assert_eq!(
            get_current_version(&conn).unwrap(),
            MIGRATIONS.last().unwrap().version
        );
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        let applied = apply_migrations(&conn).unwrap();
        assert_eq!(applied, 0);
    }

    #[test]
    fn test_versions_ascend() {
        for pair in MIGRATIONS.windows(2) {
            assert!(pair[0].version < pair[1].version);
        }
    }
}
