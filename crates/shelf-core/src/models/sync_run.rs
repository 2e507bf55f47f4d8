//! Journal entry for a finished sync run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SyncDirection, SyncFailure};
use crate::state::SyncSignal;

/// A sync run as persisted in the local journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRun {
    /// Journal row identifier
    pub id: i64,
    pub direction: SyncDirection,
    pub signal: SyncSignal,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub failures: Vec<SyncFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
