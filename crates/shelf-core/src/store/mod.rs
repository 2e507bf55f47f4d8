//! Uniform contract over the local and remote product stores.
//!
//! The reconciler only ever talks to this trait, so it never needs to know
//! whether it is reading rows from SQLite or documents from a remote
//! collection.

use crate::error::StoreResult;
use crate::models::{Product, ProductKey};

/// Store operations needed by the sync engine (async)
#[allow(async_fn_in_trait)]
pub trait ProductStore {
    /// Short label used in logs and error messages
    fn name(&self) -> &str;

    /// Read every product currently stored.
    ///
    /// Each call re-reads current state. Ordering is unspecified.
    async fn enumerate(&self) -> StoreResult<Vec<Product>>;

    /// Point lookup; a missing key is `Ok(None)`
    async fn get(&self, key: &ProductKey) -> StoreResult<Option<Product>>;

    /// Insert or fully replace the product stored under `product.key`.
    ///
    /// The write is atomic per record.
    async fn upsert(&self, product: &Product) -> StoreResult<()>;
}
