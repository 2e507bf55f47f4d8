//! Local SQLite store, shared across tasks.
//!
//! `rusqlite` is synchronous, so every repository call runs on tokio's
//! blocking pool while it holds the connection lock.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{Database, SqliteProductRepository, LOCAL_STORE};
use crate::error::{StoreError, StoreResult};
use crate::models::{Product, ProductKey, SyncConflict, SyncOutcome, SyncRun};
use crate::store::ProductStore;

/// Thread-safe service for the local product table and sync journal.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub fn open_path(db_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|error| StoreError::unavailable(LOCAL_STORE, error))?;
        }

        tracing::info!("Opening local store at {}", db_path.display());
        let db = Database::open(&db_path)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Path of the backing database file, if any.
    pub fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    async fn with_repo<T, F>(&self, operation: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteProductRepository<'_>) -> StoreResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let db = db.blocking_lock();
            operation(&SqliteProductRepository::new(db.connection()))
        })
        .await
        .map_err(|error| StoreError::unavailable(LOCAL_STORE, error))?
    }

    /// Create or edit a product on behalf of the UI.
    ///
    /// Unlike [`ProductStore::upsert`], this stamps `updated_at` because the
    /// local store is the one performing the write.
    pub async fn save_product(&self, product: &mut Product) -> StoreResult<()> {
        product.touch();
        product.validate()?;

        let product = product.clone();
        self.with_repo(move |repo| repo.upsert(&product)).await
    }

    /// List products newest-first.
    pub async fn list_products(&self, limit: usize, offset: usize) -> StoreResult<Vec<Product>> {
        self.with_repo(move |repo| repo.list(limit, offset)).await
    }

    /// Number of stored products.
    pub async fn count_products(&self) -> StoreResult<usize> {
        self.with_repo(|repo| repo.count()).await
    }

    /// Journal a finished sync run.
    pub async fn record_run(&self, outcome: &SyncOutcome) -> StoreResult<i64> {
        let outcome = outcome.clone();
        self.with_repo(move |repo| repo.record_run(&outcome)).await
    }

    /// List recent sync runs.
    pub async fn list_runs(&self, limit: usize) -> StoreResult<Vec<SyncRun>> {
        self.with_repo(move |repo| repo.list_runs(limit)).await
    }

    /// List recently resolved sync conflicts.
    pub async fn list_conflicts(&self, limit: usize) -> StoreResult<Vec<SyncConflict>> {
        self.with_repo(move |repo| repo.list_conflicts(limit)).await
    }
}

impl ProductStore for DatabaseService {
    fn name(&self) -> &str {
        LOCAL_STORE
    }

    async fn enumerate(&self) -> StoreResult<Vec<Product>> {
        self.with_repo(|repo| repo.list_all()).await
    }

    async fn get(&self, key: &ProductKey) -> StoreResult<Option<Product>> {
        let key = key.clone();
        self.with_repo(move |repo| repo.get(&key)).await
    }

    async fn upsert(&self, product: &Product) -> StoreResult<()> {
        product.validate()?;

        let product = product.clone();
        self.with_repo(move |repo| repo.upsert(&product)).await
    }
}
