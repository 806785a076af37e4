//! Append-only progression event ledger.
//!
//! Every xp/coin change leaves entries here; the ledger is the audit trail
//! and the sole source of "when did the user last earn xp" for streak
//! computation. Entries are never edited, removed, or reordered.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::db::ProgressionDb;
use crate::error::Result;
use crate::models::{EventKind, NewEvent, ProgressionEvent};

/// Read/append interface over a user's event history.
#[derive(Clone)]
pub struct Ledger {
    db: ProgressionDb,
}

impl Ledger {
    pub fn new(db: ProgressionDb) -> Self {
        Self { db }
    }

    /// Append one event. `occurred_at` defaults to the current instant.
    pub fn append(&self, user_id: &str, event: NewEvent) -> Result<ProgressionEvent> {
        let conn = self.db.conn();
        append_event(&conn, user_id, &event)
    }

    /// Most recent event of `kind` for the user, if any.
    pub fn last_of_kind(&self, user_id: &str, kind: EventKind) -> Result<Option<ProgressionEvent>> {
        let conn = self.db.conn();
        last_of_kind(&conn, user_id, kind)
    }

    /// Full event history for a user, oldest first.
    pub fn events_for_user(&self, user_id: &str) -> Result<Vec<ProgressionEvent>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, kind, value, description, occurred_at
             FROM progression_events
             WHERE user_id = ?1
             ORDER BY occurred_at, id",
        )?;
        let events = stmt
            .query_map([user_id], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    /// Number of events recorded for a user.
    pub fn count_for_user(&self, user_id: &str) -> Result<u64> {
        let conn = self.db.conn();
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM progression_events WHERE user_id = ?1",
            [user_id],
            |r| r.get(0),
        )?;
        Ok(count)
    }
}

/// Insert an event on an open connection or transaction.
pub(crate) fn append_event(
    conn: &Connection,
    user_id: &str,
    event: &NewEvent,
) -> Result<ProgressionEvent> {
    let occurred_at = event
        .occurred_at
        .unwrap_or_else(|| Utc::now().timestamp_millis());

    conn.execute(
        "INSERT INTO progression_events (user_id, kind, value, description, occurred_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            user_id,
            event.kind.as_str(),
            event.value,
            event.description,
            occurred_at,
        ],
    )?;

    Ok(ProgressionEvent {
        id: conn.last_insert_rowid(),
        user_id: user_id.to_string(),
        kind: event.kind,
        value: event.value,
        description: event.description.clone(),
        occurred_at,
    })
}

/// Indexed most-recent-by-kind lookup; never a history scan.
pub(crate) fn last_of_kind(
    conn: &Connection,
    user_id: &str,
    kind: EventKind,
) -> Result<Option<ProgressionEvent>> {
    let event = conn
        .query_row(
            "SELECT id, user_id, kind, value, description, occurred_at
             FROM progression_events
             WHERE user_id = ?1 AND kind = ?2
             ORDER BY occurred_at DESC, id DESC
             LIMIT 1",
            rusqlite::params![user_id, kind.as_str()],
            row_to_event,
        )
        .optional()?;
    Ok(event)
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<ProgressionEvent> {
    let kind_str: String = row.get(2)?;
    let kind = EventKind::from_str(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown event kind `{kind_str}`").into(),
        )
    })?;

    Ok(ProgressionEvent {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind,
        value: row.get(3)?,
        description: row.get(4)?,
        occurred_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_db() -> (tempfile::TempDir, ProgressionDb) {
        let dir = tempdir().unwrap();
        let db = ProgressionDb::open(&dir.path().join("test.db")).unwrap();
        db.conn()
            .execute(
                "INSERT INTO user_progression (user_id, updated_at) VALUES ('u1', 0)",
                [],
            )
            .unwrap();
        (dir, db)
    }

    fn event(kind: EventKind, value: i64, occurred_at: Option<i64>) -> NewEvent {
        NewEvent {
            kind,
            value,
            description: String::new(),
            occurred_at,
        }
    }

    #[test]
    fn test_append_assigns_timestamp() {
        let (_dir, db) = test_db();
        let ledger = Ledger::new(db);

        let before = Utc::now().timestamp_millis();
        let appended = ledger.append("u1", event(EventKind::Xp, 10, None)).unwrap();
        let after = Utc::now().timestamp_millis();

        assert!(appended.occurred_at >= before && appended.occurred_at <= after);
        assert_eq!(ledger.count_for_user("u1").unwrap(), 1);
    }

    #[test]
    fn test_last_of_kind_picks_latest_of_that_kind() {
        let (_dir, db) = test_db();
        let ledger = Ledger::new(db);

        ledger.append("u1", event(EventKind::Xp, 5, Some(1_000))).unwrap();
        ledger.append("u1", event(EventKind::Xp, 7, Some(3_000))).unwrap();
        ledger.append("u1", event(EventKind::Coins, 2, Some(9_000))).unwrap();

        let last = ledger.last_of_kind("u1", EventKind::Xp).unwrap().unwrap();
        assert_eq!(last.value, 7);
        assert_eq!(last.occurred_at, 3_000);
        assert!(ledger.last_of_kind("u1", EventKind::Badge).unwrap().is_none());
    }

    #[test]
    fn test_events_for_user_is_chronological() {
        let (_dir, db) = test_db();
        let ledger = Ledger::new(db);

        ledger.append("u1", event(EventKind::Coins, 1, Some(5_000))).unwrap();
        ledger.append("u1", event(EventKind::Xp, 2, Some(1_000))).unwrap();

        let events = ledger.events_for_user("u1").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Xp);
        assert_eq!(events[1].kind, EventKind::Coins);
    }
}
