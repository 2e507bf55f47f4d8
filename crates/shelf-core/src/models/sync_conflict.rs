//! Sync conflict model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProductKey, SyncDirection};

/// Name of the only resolution strategy the reconciler applies
pub const LWW_STRATEGY: &str = "lww";

/// An incoming version rejected because the target already held a newer one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Product involved in the conflict
    pub key: ProductKey,
    /// Direction of the run that saw the conflict
    pub direction: SyncDirection,
    /// Timestamp of the source version that lost
    pub source_updated_at: Option<DateTime<Utc>>,
    /// Timestamp of the target version that was kept
    pub target_updated_at: Option<DateTime<Utc>>,
    /// When the conflict was resolved
    pub resolved_at: DateTime<Utc>,
    /// Resolution strategy name
    pub strategy: String,
}
