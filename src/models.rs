//! Data models for user progression and the event ledger.
//!
//! These structures are what the excluded API layer serializes back to
//! clients, so they all carry serde derives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of progression event recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Xp,
    Coins,
    Quest,
    Badge,
    Title,
    Reborn,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xp => "xp",
            Self::Coins => "coins",
            Self::Quest => "quest",
            Self::Badge => "badge",
            Self::Title => "title",
            Self::Reborn => "reborn",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "xp" => Some(Self::Xp),
            "coins" => Some(Self::Coins),
            "quest" => Some(Self::Quest),
            "badge" => Some(Self::Badge),
            "title" => Some(Self::Title),
            "reborn" => Some(Self::Reborn),
            _ => None,
        }
    }
}

/// Task priority vocabulary used by the task layer.
///
/// The engine stores whatever priority string it is handed verbatim in the
/// ledger description; this enum is the well-formed subset callers normally
/// send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// A time-limited XP multiplier.
///
/// Active only while `expires_at` is strictly in the future; an expired
/// boost stays on the record until a maintenance path clears it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boost {
    pub multiplier: f64,
    pub expires_at: DateTime<Utc>,
}

/// Per-user progression state.
///
/// `xp` and `coins` are cached running totals; the ledger is the audit
/// source and every mutation here is paired with a ledger append in the
/// same transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgression {
    pub user_id: String,
    /// 1..=100. No further level changes once at the cap.
    pub level: u32,
    pub xp: i64,
    pub coins: i64,
    /// Consecutive-day completion counter.
    pub streak: u32,
    /// Stable field; no code path in this engine mutates it.
    pub reborns: u32,
    pub boost: Option<Boost>,
    pub gamification_enabled: bool,
}

/// Ledger entry as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionEvent {
    pub id: i64,
    pub user_id: String,
    pub kind: EventKind,
    /// Signed magnitude of the change, normally positive.
    pub value: i64,
    /// Display-only free text, never parsed.
    pub description: String,
    /// Epoch milliseconds.
    pub occurred_at: i64,
}

/// Input for appending a ledger entry.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub kind: EventKind,
    pub value: i64,
    pub description: String,
    /// Epoch milliseconds; the ledger assigns "now" when absent.
    pub occurred_at: Option<i64>,
}
