//! Sync run outcome model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ProductKey, SyncConflict};
use crate::error::{Error, StoreError};

/// Which store is read and which is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncDirection {
    /// Read the local SQLite store, write the remote collection
    LocalToRemote,
    /// Read the remote collection, write the local SQLite store
    RemoteToLocal,
}

impl SyncDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocalToRemote => "local-to-remote",
            Self::RemoteToLocal => "remote-to-local",
        }
    }

    /// The opposite direction
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::LocalToRemote => Self::RemoteToLocal,
            Self::RemoteToLocal => Self::LocalToRemote,
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local-to-remote" => Ok(Self::LocalToRemote),
            "remote-to-local" => Ok(Self::RemoteToLocal),
            other => Err(Error::InvalidInput(format!("unknown sync direction: {other}"))),
        }
    }
}

/// Per-key decision taken by the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// Key absent from the target
    Insert,
    /// Source strictly newer than the target
    Update,
    /// Target already current (or newer)
    Skip,
}

/// A key whose read or write failed during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub key: ProductKey,
    pub error: StoreError,
}

/// Result of one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub direction: SyncDirection,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// One entry per failed key, with its cause
    pub failures: Vec<SyncFailure>,
    /// Skips where the target held a strictly newer version
    pub conflicts: Vec<SyncConflict>,
    /// Set when the run stopped early on a cancellation request
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncOutcome {
    /// Start an empty outcome for a run in `direction`
    pub fn new(direction: SyncDirection) -> Self {
        Self {
            direction,
            inserted: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
            failures: Vec::new(),
            conflicts: Vec::new(),
            cancelled: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Count a completed action
    pub fn record_action(&mut self, action: SyncAction) {
        match action {
            SyncAction::Insert => self.inserted += 1,
            SyncAction::Update => self.updated += 1,
            SyncAction::Skip => self.skipped += 1,
        }
    }

    /// Record a failed key
    pub fn record_failure(&mut self, key: ProductKey, error: StoreError) {
        self.failed += 1;
        self.failures.push(SyncFailure { key, error });
    }

    /// Stamp the end of the run
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
        self.failures.sort_by(|a, b| a.key.cmp(&b.key));
        self.conflicts.sort_by(|a, b| a.key.cmp(&b.key));
    }

    /// Records written to the target (inserts plus updates)
    pub const fn writes(&self) -> usize {
        self.inserted + self.updated
    }

    /// Keys whose processing completed, whatever the result
    pub const fn processed(&self) -> usize {
        self.inserted + self.updated + self.skipped + self.failed
    }

    /// Keys of every failure, in key order
    pub fn failed_keys(&self) -> Vec<&ProductKey> {
        self.failures.iter().map(|failure| &failure.key).collect()
    }
}
