//! In-process document store.
//!
//! Holds documents in their encoded form so every read and write goes through
//! the same codec as the REST client. Faults can be injected per key or for
//! the whole store.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;

use super::codec::{self, Fields};
use super::REMOTE_STORE;
use crate::error::{StoreError, StoreResult};
use crate::models::{Product, ProductKey};
use crate::store::ProductStore;

#[derive(Default)]
struct State {
    documents: BTreeMap<String, Fields>,
    write_faults: HashMap<String, StoreError>,
    offline: bool,
    writes: usize,
}

/// Document collection kept in memory
pub struct MemoryDocumentStore {
    name: String,
    state: RwLock<State>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new(REMOTE_STORE)
    }
}

impl MemoryDocumentStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(State::default()),
        }
    }

    /// Store raw fields under `id`, bypassing encoding
    pub async fn insert_raw(&self, id: impl Into<String>, fields: Fields) {
        self.state.write().await.documents.insert(id.into(), fields);
    }

    /// Make every operation fail as unavailable while `offline` is set
    pub async fn set_offline(&self, offline: bool) {
        self.state.write().await.offline = offline;
    }

    /// Reject writes of `key` with `error` until cleared
    pub async fn fail_writes_for(&self, key: &ProductKey, error: StoreError) {
        self.state
            .write()
            .await
            .write_faults
            .insert(key.as_str().to_string(), error);
    }

    pub async fn clear_faults(&self) {
        let mut state = self.state.write().await;
        state.write_faults.clear();
        state.offline = false;
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Successful writes since creation
    pub async fn write_count(&self) -> usize {
        self.state.read().await.writes
    }

    fn check_online(&self, state: &State) -> StoreResult<()> {
        if state.offline {
            return Err(StoreError::unavailable(&self.name, "store is offline"));
        }
        Ok(())
    }
}

impl ProductStore for MemoryDocumentStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enumerate(&self) -> StoreResult<Vec<Product>> {
        let state = self.state.read().await;
        self.check_online(&state)?;
        state
            .documents
            .iter()
            .map(|(id, fields)| codec::decode(id, fields))
            .collect()
    }

    async fn get(&self, key: &ProductKey) -> StoreResult<Option<Product>> {
        let state = self.state.read().await;
        self.check_online(&state)?;
        state
            .documents
            .get(key.as_str())
            .map(|fields| codec::decode(key.as_str(), fields))
            .transpose()
    }

    async fn upsert(&self, product: &Product) -> StoreResult<()> {
        product.validate()?;

        let mut state = self.state.write().await;
        self.check_online(&state)?;
        if let Some(error) = state.write_faults.get(product.key.as_str()) {
            return Err(error.clone());
        }

        state
            .documents
            .insert(product.key.as_str().to_string(), codec::encode(product));
        state.writes += 1;
        Ok(())
    }
}
