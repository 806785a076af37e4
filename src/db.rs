//! SQLite connection and schema management for progression state.
//!
//! One database file (default `~/.levelup/progression.db`) holds the
//! per-user progression rows and the append-only event ledger.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::error::Result;

/// Database wrapper shared by the engine and the ledger.
#[derive(Clone)]
pub struct ProgressionDb {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl ProgressionDb {
    /// Open or create the database at the default location
    /// (`~/.levelup/progression.db`).
    pub fn open_default() -> Result<Self> {
        Self::open(&default_db_path())
    }

    /// Open or create the database at a specific path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL so readers are not blocked while a completion commits
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("progression db lock poisoned")
    }

    fn init_schema(&self) -> Result<()> {
        {
            let conn = self.conn();
            conn.execute_batch(SCHEMA_SQL)?;
        }
        self.run_migrations()?;
        Ok(())
    }

    /// Run any pending migrations.
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn();

        let version: i32 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
            .unwrap_or(0);

        // Migration 2: boost columns, for databases created before boosts existed
        if version < 2 {
            let has_boost: bool = conn
                .prepare("SELECT COUNT(*) FROM pragma_table_info('user_progression') WHERE name = 'boost_multiplier'")
                .and_then(|mut s| s.query_row([], |r| r.get::<_, i32>(0)))
                .map(|c| c > 0)
                .unwrap_or(false);

            if !has_boost {
                conn.execute_batch(
                    r#"
                    ALTER TABLE user_progression ADD COLUMN boost_multiplier REAL;
                    ALTER TABLE user_progression ADD COLUMN boost_expires_at INTEGER;
                    "#,
                )?;
            }
            conn.execute("INSERT OR REPLACE INTO schema_version VALUES (2)", [])?;
        }

        Ok(())
    }
}

/// Default database path (`~/.levelup/progression.db`).
fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".levelup")
        .join("progression.db")
}

/// SQL schema for the progression database.
const SCHEMA_SQL: &str = r#"
-- Per-user progression state (cached running totals; the ledger is the audit source)
CREATE TABLE IF NOT EXISTS user_progression (
    user_id TEXT PRIMARY KEY,
    level INTEGER NOT NULL DEFAULT 1,
    xp INTEGER NOT NULL DEFAULT 0,
    coins INTEGER NOT NULL DEFAULT 0,
    streak INTEGER NOT NULL DEFAULT 0,
    reborns INTEGER NOT NULL DEFAULT 0,
    boost_multiplier REAL,
    boost_expires_at INTEGER,
    gamification_enabled INTEGER NOT NULL DEFAULT 1,
    updated_at INTEGER NOT NULL
);

-- Append-only progression event ledger (never updated or deleted)
CREATE TABLE IF NOT EXISTS progression_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES user_progression(user_id),
    kind TEXT NOT NULL,
    value INTEGER NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    occurred_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_event_user_kind_time ON progression_events(user_id, kind, occurred_at);
CREATE INDEX IF NOT EXISTS idx_event_user_time ON progression_events(user_id, occurred_at);

-- Schema version
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (2);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_init() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test_progression.db");
        let db = ProgressionDb::open(&db_path).unwrap();

        let conn = db.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"user_progression".to_string()));
        assert!(tables.contains(&"progression_events".to_string()));
        assert!(tables.contains(&"schema_version".to_string()));
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test_progression.db");
        drop(ProgressionDb::open(&db_path).unwrap());
        // Second open re-runs schema and migrations against existing tables
        ProgressionDb::open(&db_path).unwrap();
    }
}
