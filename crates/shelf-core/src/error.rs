//! Error types for shelf-core

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::SyncDirection;

/// Result type alias using shelf-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for single-store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by a store adapter for a single operation.
///
/// These are the per-record causes recorded in a sync outcome; none of them
/// aborts a sync run on its own.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreError {
    /// The store could not be reached (transient)
    #[error("{store} store unavailable: {reason}")]
    Unavailable { store: String, reason: String },

    /// The record failed the store's constraints
    #[error("Validation error: {reason}")]
    Validation { reason: String },

    /// The store returned data that could not be decoded
    #[error("Malformed record: {reason}")]
    Malformed { reason: String },
}

impl StoreError {
    pub fn unavailable(store: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unavailable {
            store: store.into(),
            reason: reason.to_string(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Whether retrying the same operation later may succeed
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Errors that can occur in shelf-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A store operation failed outside of a per-record context
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A sync in the same direction is already running
    #[error("A {0} sync is already in progress")]
    SyncInProgress(SyncDirection),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
