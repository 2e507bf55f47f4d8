//! Sync status signal handed back to the UI layer.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;
use crate::models::SyncOutcome;

/// Coarse result of one sync run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSignal {
    /// Every key was written or already current
    Succeeded,
    /// Some keys failed, others went through
    PartialFailure,
    /// Every processed key failed
    Failed,
    /// The run stopped early on request
    Cancelled,
}

impl SyncSignal {
    /// Classify an outcome.
    ///
    /// Cancellation wins over everything else; an empty run with no failures
    /// counts as a success.
    pub const fn from_outcome(outcome: &SyncOutcome) -> Self {
        if outcome.cancelled {
            Self::Cancelled
        } else if outcome.failed == 0 {
            Self::Succeeded
        } else if outcome.writes() + outcome.skipped == 0 {
            Self::Failed
        } else {
            Self::PartialFailure
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::PartialFailure => "partial_failure",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for SyncSignal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "succeeded" => Ok(Self::Succeeded),
            "partial_failure" => Ok(Self::PartialFailure),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(Error::InvalidInput(format!("unknown sync signal: {other}"))),
        }
    }
}
