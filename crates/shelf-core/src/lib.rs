//! shelf-core - Core library for Shelf
//!
//! This crate contains the product model, the local SQLite and remote
//! document store adapters, and the last-write-wins sync engine shared by
//! every Shelf client.

pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod sync;
pub mod util;

pub use config::{RemoteConfig, ShelfConfig};
pub use document::{FirestoreStore, MemoryDocumentStore};
pub use error::{Error, Result, StoreError, StoreResult};
pub use models::{Product, ProductKey, SyncConflict, SyncDirection, SyncOutcome, SyncRun};
pub use services::DatabaseService;
pub use state::SyncSignal;
pub use store::ProductStore;
pub use sync::{Reconciler, SyncCoordinator, SyncReport};

pub use tokio_util::sync::CancellationToken;
