//! Progression engine - converts task completions into durable xp, coin,
//! level, and streak changes.
//!
//! One `complete_task` call is one logical transaction: state load, boost
//! application, gain accrual, streak update, level cascade, and the paired
//! ledger appends either all commit together or leave no trace. Calls for
//! the same user are serialized; a lost database race is retried a bounded
//! number of times before surfacing a conflict.

use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use tracing::debug;

use crate::boost::effective_multiplier;
use crate::curve::{MAX_LEVEL, threshold};
use crate::db::ProgressionDb;
use crate::error::{ProgressionError, Result};
use crate::ledger;
use crate::models::{Boost, EventKind, NewEvent, UserProgression};
use crate::streak::updated_streak;

/// Bounded retries for a transaction that loses a write race.
const MAX_TX_ATTEMPTS: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// Sole writer of a user's xp, coins, level, and streak.
#[derive(Clone)]
pub struct ProgressionEngine {
    db: ProgressionDb,
}

impl ProgressionEngine {
    pub fn new(db: ProgressionDb) -> Self {
        Self { db }
    }

    /// Create the zero-valued progression row for a newly registered user
    /// (level 1, everything else 0, gamification enabled).
    ///
    /// Idempotent: an existing row is left untouched.
    pub fn create_user(&self, user_id: &str) -> Result<UserProgression> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT OR IGNORE INTO user_progression (user_id, updated_at) VALUES (?1, ?2)",
            rusqlite::params![user_id, Utc::now().timestamp_millis()],
        )?;
        load_progression(&conn, user_id)?
            .ok_or_else(|| ProgressionError::UserNotFound(user_id.to_string()))
    }

    /// Current progression snapshot for the API layer.
    pub fn get_progression(&self, user_id: &str) -> Result<UserProgression> {
        let conn = self.db.conn();
        load_progression(&conn, user_id)?
            .ok_or_else(|| ProgressionError::UserNotFound(user_id.to_string()))
    }

    /// Apply one task completion and return the updated state.
    ///
    /// The multipliers are caller-supplied gain hints, already scaled by
    /// priority on the task side; non-finite values coerce to zero. The
    /// priority string is carried through verbatim into the ledger
    /// descriptions, malformed or not. An active boost multiplies the xp
    /// gain only.
    pub fn complete_task(
        &self,
        user_id: &str,
        task_priority: &str,
        xp_multiplier: f64,
        coins_multiplier: f64,
    ) -> Result<UserProgression> {
        let now = Utc::now();
        self.with_write_tx(user_id, |tx| {
            apply_completion(tx, user_id, task_priority, xp_multiplier, coins_multiplier, now)
        })
    }

    /// Flip the gamification flag and return the new value.
    ///
    /// Leaves xp, coins, level, streak, and the ledger untouched.
    pub fn toggle_gamification(&self, user_id: &str) -> Result<bool> {
        self.with_write_tx(user_id, |tx| {
            let enabled: Option<bool> = tx
                .query_row(
                    "SELECT gamification_enabled FROM user_progression WHERE user_id = ?1",
                    [user_id],
                    |r| r.get(0),
                )
                .optional()?;
            let Some(enabled) = enabled else {
                return Err(ProgressionError::UserNotFound(user_id.to_string()));
            };

            let new_value = !enabled;
            tx.execute(
                "UPDATE user_progression SET gamification_enabled = ?1, updated_at = ?2
                 WHERE user_id = ?3",
                rusqlite::params![new_value, Utc::now().timestamp_millis(), user_id],
            )?;
            Ok(new_value)
        })
    }

    /// Attach a time-limited xp multiplier, replacing any existing boost.
    ///
    /// Expiry is evaluated lazily when gains are computed; nothing here or
    /// in the resolver sweeps expired state.
    pub fn grant_boost(
        &self,
        user_id: &str,
        multiplier: f64,
        expires_at: DateTime<Utc>,
    ) -> Result<UserProgression> {
        self.with_write_tx(user_id, |tx| {
            let changed = tx.execute(
                "UPDATE user_progression
                 SET boost_multiplier = ?1, boost_expires_at = ?2, updated_at = ?3
                 WHERE user_id = ?4",
                rusqlite::params![
                    multiplier,
                    expires_at.timestamp_millis(),
                    Utc::now().timestamp_millis(),
                    user_id,
                ],
            )?;
            if changed == 0 {
                return Err(ProgressionError::UserNotFound(user_id.to_string()));
            }
            load_progression(tx, user_id)?
                .ok_or_else(|| ProgressionError::UserNotFound(user_id.to_string()))
        })
    }

    /// Run `op` inside an IMMEDIATE transaction, retrying a bounded number
    /// of times when a concurrent writer holds the database file.
    fn with_write_tx<T>(
        &self,
        user_id: &str,
        mut op: impl FnMut(&Connection) -> Result<T>,
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = {
                let mut conn = self.db.conn();
                conn.transaction_with_behavior(TransactionBehavior::Immediate)
                    .map_err(ProgressionError::from)
                    .and_then(|tx| {
                        let value = op(&tx)?;
                        tx.commit()?;
                        Ok(value)
                    })
            };
            match result {
                Err(ProgressionError::Storage(e)) if is_busy(&e) => {
                    if attempt >= MAX_TX_ATTEMPTS {
                        return Err(ProgressionError::Conflict(user_id.to_string()));
                    }
                    debug!(
                        "Progression write for {} hit a busy database (attempt {}), retrying",
                        user_id, attempt
                    );
                    thread::sleep(RETRY_BACKOFF);
                }
                other => return other,
            }
        }
    }
}

/// One completion, applied on an open transaction.
fn apply_completion(
    conn: &Connection,
    user_id: &str,
    task_priority: &str,
    xp_multiplier: f64,
    coins_multiplier: f64,
    now: DateTime<Utc>,
) -> Result<UserProgression> {
    let mut user = load_progression(conn, user_id)?
        .ok_or_else(|| ProgressionError::UserNotFound(user_id.to_string()))?;

    // Non-finite hints coerce to zero at the boundary; everything below is total
    let mut xp_gain = coerce_gain(xp_multiplier);
    let coins_gain = coerce_gain(coins_multiplier);

    xp_gain *= effective_multiplier(user.boost.as_ref(), now);

    let xp_gain = xp_gain.round() as i64;
    let coins_gain = coins_gain.round() as i64;

    user.xp += xp_gain;
    user.coins += coins_gain;

    // Streak baseline is the previous completion's date, read before this
    // call's entries land
    let last_xp_day = ledger::last_of_kind(conn, user_id, EventKind::Xp)?
        .and_then(|e| DateTime::from_timestamp_millis(e.occurred_at))
        .map(|dt| dt.date_naive());
    user.streak = updated_streak(last_xp_day, now.date_naive(), user.streak);

    // Cascade: one gain can cross several thresholds. Surplus above the
    // level-100 cap is retained but never drained.
    let old_level = user.level;
    while user.level < MAX_LEVEL && user.xp >= threshold(user.level) {
        user.xp -= threshold(user.level);
        user.level += 1;
    }
    if user.level > old_level {
        debug!("User {} leveled up: {} -> {}", user_id, old_level, user.level);
    }

    let occurred_at = now.timestamp_millis();
    ledger::append_event(
        conn,
        user_id,
        &NewEvent {
            kind: EventKind::Xp,
            value: xp_gain,
            description: format!("XP earned for completing a {task_priority} priority task"),
            occurred_at: Some(occurred_at),
        },
    )?;
    ledger::append_event(
        conn,
        user_id,
        &NewEvent {
            kind: EventKind::Coins,
            value: coins_gain,
            description: format!("Coins earned for completing a {task_priority} priority task"),
            occurred_at: Some(occurred_at),
        },
    )?;

    conn.execute(
        "UPDATE user_progression
         SET level = ?1, xp = ?2, coins = ?3, streak = ?4, updated_at = ?5
         WHERE user_id = ?6",
        rusqlite::params![user.level, user.xp, user.coins, user.streak, occurred_at, user_id],
    )?;

    Ok(user)
}

fn coerce_gain(hint: f64) -> f64 {
    if hint.is_finite() { hint } else { 0.0 }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

pub(crate) fn load_progression(conn: &Connection, user_id: &str) -> Result<Option<UserProgression>> {
    let user = conn
        .query_row(
            "SELECT user_id, level, xp, coins, streak, reborns,
                    boost_multiplier, boost_expires_at, gamification_enabled
             FROM user_progression WHERE user_id = ?1",
            [user_id],
            row_to_progression,
        )
        .optional()?;
    Ok(user)
}

fn row_to_progression(row: &Row<'_>) -> rusqlite::Result<UserProgression> {
    let multiplier: Option<f64> = row.get(6)?;
    let expires_at_ms: Option<i64> = row.get(7)?;
    let boost = match (multiplier, expires_at_ms) {
        (Some(multiplier), Some(ms)) => DateTime::from_timestamp_millis(ms)
            .map(|expires_at| Boost { multiplier, expires_at }),
        _ => None,
    };

    Ok(UserProgression {
        user_id: row.get(0)?,
        level: row.get(1)?,
        xp: row.get(2)?,
        coins: row.get(3)?,
        streak: row.get(4)?,
        reborns: row.get(5)?,
        boost,
        gamification_enabled: row.get(8)?,
    })
}
