//! Progression engine for a task-tracking service with a rewards layer.
//!
//! Converts "a task was completed" into durable changes to a user's
//! experience points, coins, level, daily streak, and an append-only
//! ledger of those changes, stored in a SQLite database
//! (`~/.levelup/progression.db` by default).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │   Task layer    │     │    API layer    │
//! │  (completions)  │     │   (snapshots)   │
//! └────────┬────────┘     └────────┬────────┘
//!          │                       │
//!          ▼                       ▼
//!   ProgressionEngine ──────► progression.db ◄────── Ledger
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let progression = ProgressionManager::new()?;
//! let engine = progression.engine();
//!
//! engine.create_user("ada")?;
//! let updated = engine.complete_task("ada", "high", 25.0, 10.0)?;
//!
//! let history = progression.ledger().events_for_user("ada")?;
//! ```

mod boost;
mod curve;
mod db;
mod engine;
mod error;
mod ledger;
mod models;
mod streak;

pub use boost::effective_multiplier;
pub use curve::{MAX_LEVEL, threshold};
pub use db::ProgressionDb;
pub use engine::ProgressionEngine;
pub use error::{ProgressionError, Result};
pub use ledger::Ledger;
pub use models::{Boost, EventKind, NewEvent, ProgressionEvent, TaskPriority, UserProgression};
pub use streak::updated_streak;

/// Central entry point for progression tracking.
///
/// Coordinates the engine (writes) and the ledger (audit reads) over one
/// shared database. Thread-safe through an internal mutex on the
/// connection; clones share the same database.
#[derive(Clone)]
pub struct ProgressionManager {
    db: ProgressionDb,
}

impl ProgressionManager {
    /// Create a manager backed by the default database location.
    pub fn new() -> Result<Self> {
        let db = ProgressionDb::open_default()?;
        Ok(Self { db })
    }

    /// Create a manager backed by a specific database path.
    pub fn with_path(path: &std::path::Path) -> Result<Self> {
        let db = ProgressionDb::open(path)?;
        Ok(Self { db })
    }

    /// Get the engine for applying completions and state changes.
    pub fn engine(&self) -> ProgressionEngine {
        ProgressionEngine::new(self.db.clone())
    }

    /// Get the ledger for reading a user's event history.
    pub fn ledger(&self) -> Ledger {
        Ledger::new(self.db.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_progression_roundtrip() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test_progression.db");
        let manager = ProgressionManager::with_path(&db_path).unwrap();
        let engine = manager.engine();

        let fresh = engine.create_user("ada").unwrap();
        assert_eq!(fresh.level, 1);
        assert_eq!(fresh.xp, 0);
        assert_eq!(fresh.coins, 0);
        assert_eq!(fresh.streak, 0);
        assert!(fresh.gamification_enabled);

        let updated = engine.complete_task("ada", "high", 25.0, 10.0).unwrap();
        assert_eq!(updated.xp, 25);
        assert_eq!(updated.coins, 10);

        let history = manager.ledger().events_for_user("ada").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, EventKind::Xp);
        assert_eq!(history[0].value, 25);
        assert_eq!(history[1].kind, EventKind::Coins);
        assert_eq!(history[1].value, 10);
    }
}
