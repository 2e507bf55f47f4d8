//! One-directional last-write-wins reconciliation.

use std::collections::BTreeMap;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, StoreError};
use crate::models::{
    Product, ProductKey, SyncAction, SyncConflict, SyncDirection, SyncOutcome, LWW_STRATEGY,
};
use crate::store::ProductStore;

/// Decide what to do with one source record.
///
/// Only a strictly newer source replaces the target; ties keep the target.
pub fn plan(source: &Product, target: Option<&Product>) -> SyncAction {
    match target {
        None => SyncAction::Insert,
        Some(target) if source.is_newer_than(target) => SyncAction::Update,
        Some(_) => SyncAction::Skip,
    }
}

/// Result of reconciling a single key
enum RecordResult {
    Applied {
        key: ProductKey,
        action: SyncAction,
        conflict: Option<SyncConflict>,
    },
    Failed {
        key: ProductKey,
        error: StoreError,
    },
}

/// Makes a target store converge toward a source store.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    concurrency: usize,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Reconciler {
    /// `concurrency` bounds how many keys are in flight; zero is treated as one
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Push every source record into `target` where it is missing or older.
    ///
    /// Keys only present in the target are left alone. Per-key failures are
    /// recorded in the outcome; only a failing source enumeration fails the
    /// run. Cancellation is checked before each key is started.
    pub async fn reconcile<S, T>(
        &self,
        source: &S,
        target: &T,
        direction: SyncDirection,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome>
    where
        S: ProductStore,
        T: ProductStore,
    {
        let mut outcome = SyncOutcome::new(direction);

        let records = source.enumerate().await.map_err(|error| {
            tracing::error!("Failed to enumerate {} store: {error}", source.name());
            error
        })?;
        let records: BTreeMap<ProductKey, Product> = records
            .into_iter()
            .map(|product| (product.key.clone(), product))
            .collect();
        let total = records.len();

        tracing::info!(
            "Reconciling {total} records from {} into {} ({direction})",
            source.name(),
            target.name()
        );

        let mut results = stream::iter(records.into_values())
            .take_while(|_| futures::future::ready(!cancel.is_cancelled()))
            .map(|record| sync_record(target, direction, record))
            .buffer_unordered(self.concurrency);

        while let Some(result) = results.next().await {
            match result {
                RecordResult::Applied {
                    key,
                    action,
                    conflict,
                } => {
                    tracing::debug!("{direction} {key}: {action:?}");
                    outcome.record_action(action);
                    outcome.conflicts.extend(conflict);
                }
                RecordResult::Failed { key, error } => {
                    tracing::warn!("{direction} {key} failed: {error}");
                    outcome.record_failure(key, error);
                }
            }
        }

        outcome.cancelled = outcome.processed() < total;
        outcome.finish();

        if outcome.cancelled {
            tracing::warn!(
                "{direction} cancelled after {} of {total} records",
                outcome.processed()
            );
        }
        tracing::info!(
            "{direction} finished: {} inserted, {} updated, {} skipped, {} failed",
            outcome.inserted,
            outcome.updated,
            outcome.skipped,
            outcome.failed
        );
        Ok(outcome)
    }
}

async fn sync_record<T: ProductStore>(
    target: &T,
    direction: SyncDirection,
    record: Product,
) -> RecordResult {
    let existing = match target.get(&record.key).await {
        Ok(existing) => existing,
        Err(error) => {
            return RecordResult::Failed {
                key: record.key,
                error,
            }
        }
    };

    let action = plan(&record, existing.as_ref());
    let conflict = match (&action, &existing) {
        (SyncAction::Skip, Some(existing)) if existing.is_newer_than(&record) => {
            Some(SyncConflict {
                key: record.key.clone(),
                direction,
                source_updated_at: record.updated_at,
                target_updated_at: existing.updated_at,
                resolved_at: Utc::now(),
                strategy: LWW_STRATEGY.to_string(),
            })
        }
        _ => None,
    };

    if action != SyncAction::Skip {
        if let Err(error) = target.upsert(&record).await {
            return RecordResult::Failed {
                key: record.key,
                error,
            };
        }
    }

    RecordResult::Applied {
        key: record.key,
        action,
        conflict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocumentStore;
    use crate::models::parse_timestamp;
    use crate::Error;
    use pretty_assertions::assert_eq;

    fn product(key: &str, updated_at: &str, likes: u64) -> Product {
        let mut product = Product::with_key(key, key.to_uppercase()).unwrap();
        product.updated_at = parse_timestamp(updated_at);
        product.likes = likes;
        product
    }

    fn key(value: &str) -> ProductKey {
        ProductKey::parse(value).unwrap()
    }

    async fn store_with(name: &str, products: &[Product]) -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new(name);
        for product in products {
            store.upsert(product).await.unwrap();
        }
        store
    }

    /// Cancels a token the first time a key is looked up
    struct CancellingStore {
        inner: MemoryDocumentStore,
        token: CancellationToken,
    }

    impl ProductStore for CancellingStore {
        fn name(&self) -> &str {
            self.inner.name()
        }

        async fn enumerate(&self) -> crate::StoreResult<Vec<Product>> {
            self.inner.enumerate().await
        }

        async fn get(&self, key: &ProductKey) -> crate::StoreResult<Option<Product>> {
            self.token.cancel();
            self.inner.get(key).await
        }

        async fn upsert(&self, product: &Product) -> crate::StoreResult<()> {
            self.inner.upsert(product).await
        }
    }

    #[test]
    fn plan_follows_last_write_wins() {
        let older = product("mug", "2024-01-01T00:00:00Z", 2);
        let newer = product("mug", "2024-01-02T00:00:00Z", 5);

        assert_eq!(plan(&newer, None), SyncAction::Insert);
        assert_eq!(plan(&newer, Some(&older)), SyncAction::Update);
        assert_eq!(plan(&older, Some(&newer)), SyncAction::Skip);
        assert_eq!(plan(&newer, Some(&newer.clone())), SyncAction::Skip);
    }

    #[test]
    fn plan_treats_missing_timestamp_as_oldest() {
        let stamped = product("mug", "2024-01-01T00:00:00Z", 1);
        let mut unstamped = stamped.clone();
        unstamped.updated_at = None;

        assert_eq!(plan(&stamped, Some(&unstamped)), SyncAction::Update);
        assert_eq!(plan(&unstamped, Some(&stamped)), SyncAction::Skip);
        assert_eq!(plan(&unstamped, Some(&unstamped.clone())), SyncAction::Skip);
    }

    #[tokio::test]
    async fn reconcile_counts_each_action() {
        let source = store_with(
            "local",
            &[
                product("lamp", "2024-01-01T00:00:00Z", 1),
                product("mug", "2024-01-02T00:00:00Z", 5),
                product("pen", "2024-01-01T00:00:00Z", 1),
            ],
        )
        .await;
        let target = store_with(
            "remote",
            &[
                product("mug", "2024-01-01T00:00:00Z", 2),
                product("pen", "2024-01-05T00:00:00Z", 9),
                product("cup", "2024-01-01T00:00:00Z", 0),
            ],
        )
        .await;

        let outcome = Reconciler::new(4)
            .reconcile(
                &source,
                &target,
                SyncDirection::LocalToRemote,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(
            (outcome.inserted, outcome.updated, outcome.skipped, outcome.failed),
            (1, 1, 1, 0)
        );
        assert!(!outcome.cancelled);
        assert!(outcome.finished_at.is_some());
        assert_eq!(target.len().await, 4);
        assert_eq!(target.get(&key("mug")).await.unwrap().unwrap().likes, 5);
        assert_eq!(target.get(&key("pen")).await.unwrap().unwrap().likes, 9);

        assert_eq!(outcome.conflicts.len(), 1);
        let conflict = &outcome.conflicts[0];
        assert_eq!(conflict.key, key("pen"));
        assert_eq!(conflict.strategy, LWW_STRATEGY);
        assert_eq!(conflict.target_updated_at, parse_timestamp("2024-01-05T00:00:00Z"));
    }

    #[tokio::test]
    async fn equal_timestamps_are_not_conflicts() {
        let mug = product("mug", "2024-01-01T00:00:00Z", 2);
        let source = store_with("local", &[mug.clone()]).await;
        let target = store_with("remote", &[mug]).await;

        let outcome = Reconciler::default()
            .reconcile(
                &source,
                &target,
                SyncDirection::LocalToRemote,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.skipped, 1);
        assert!(outcome.conflicts.is_empty());
    }

    #[tokio::test]
    async fn failing_writes_are_recorded_per_key() {
        let source = store_with(
            "local",
            &[
                product("lamp", "2024-01-01T00:00:00Z", 1),
                product("mug", "2024-01-01T00:00:00Z", 1),
            ],
        )
        .await;
        let target = MemoryDocumentStore::new("remote");
        target
            .fail_writes_for(&key("mug"), StoreError::validation("rejected"))
            .await;

        let outcome = Reconciler::new(2)
            .reconcile(
                &source,
                &target,
                SyncDirection::LocalToRemote,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.failed_keys(), vec![&key("mug")]);
        assert_eq!(outcome.failures[0].error, StoreError::validation("rejected"));
    }

    #[tokio::test]
    async fn failing_target_reads_are_recorded_per_key() {
        let source = store_with("local", &[product("lamp", "2024-01-01T00:00:00Z", 1)]).await;
        let target = MemoryDocumentStore::new("remote");
        target.set_offline(true).await;

        let outcome = Reconciler::default()
            .reconcile(
                &source,
                &target,
                SyncDirection::LocalToRemote,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.failed, 1);
        assert!(outcome.failures[0].error.is_transient());
    }

    #[tokio::test]
    async fn source_enumeration_failure_fails_the_run() {
        let source = MemoryDocumentStore::new("local");
        source.set_offline(true).await;
        let target = MemoryDocumentStore::new("remote");

        let error = Reconciler::default()
            .reconcile(
                &source,
                &target,
                SyncDirection::LocalToRemote,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Store(StoreError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn cancelled_before_start_writes_nothing() {
        let source = store_with("local", &[product("lamp", "2024-01-01T00:00:00Z", 1)]).await;
        let target = MemoryDocumentStore::new("remote");
        let token = CancellationToken::new();
        token.cancel();

        let outcome = Reconciler::default()
            .reconcile(&source, &target, SyncDirection::LocalToRemote, &token)
            .await
            .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.processed(), 0);
        assert!(target.is_empty().await);
    }

    #[tokio::test]
    async fn cancellation_mid_run_returns_partial_outcome() {
        let source = store_with(
            "local",
            &[
                product("a", "2024-01-01T00:00:00Z", 1),
                product("b", "2024-01-01T00:00:00Z", 1),
                product("c", "2024-01-01T00:00:00Z", 1),
            ],
        )
        .await;
        let token = CancellationToken::new();
        let target = CancellingStore {
            inner: MemoryDocumentStore::new("remote"),
            token: token.clone(),
        };

        let outcome = Reconciler::new(1)
            .reconcile(&source, &target, SyncDirection::LocalToRemote, &token)
            .await
            .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.inserted, 1);
        assert_eq!(target.inner.len().await, 1);
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        assert_eq!(Reconciler::new(0).concurrency(), 1);
    }
}
