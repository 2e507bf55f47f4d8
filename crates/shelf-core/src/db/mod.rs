//! Database layer for Shelf's local store

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::SqliteProductRepository;

use rusqlite::ErrorCode;

use crate::error::StoreError;

/// Label of the local store in logs and errors
pub const LOCAL_STORE: &str = "local";

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        match &error {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Self::validation(error.to_string())
            }
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..) => Self::malformed(error.to_string()),
            _ => Self::unavailable(LOCAL_STORE, error),
        }
    }
}
