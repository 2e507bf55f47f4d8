//! Shared services used by CLI and future clients.

pub mod database;

pub use database::DatabaseService;
