//! Error types for the progression engine.

use std::io;

/// Failure surface of the progression engine.
///
/// The pure components (leveling curve, boost resolver, streak tracker) are
/// total; everything that can fail does so at the storage boundary and lands
/// here.
#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    #[error("no progression state for user `{0}`")]
    UserNotFound(String),

    #[error("concurrent update conflict for user `{0}`, retries exhausted")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ProgressionError>;
