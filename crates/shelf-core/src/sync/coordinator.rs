//! Directional sync entry points for clients.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::Reconciler;
use crate::error::{Error, Result};
use crate::models::{SyncDirection, SyncOutcome};
use crate::state::SyncSignal;
use crate::store::ProductStore;

/// Outcome of a run plus its coarse classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub signal: SyncSignal,
    pub outcome: SyncOutcome,
}

impl From<SyncOutcome> for SyncReport {
    fn from(outcome: SyncOutcome) -> Self {
        Self {
            signal: SyncSignal::from_outcome(&outcome),
            outcome,
        }
    }
}

/// Holds a direction's busy flag until dropped
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool, direction: SyncDirection) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::SyncInProgress(direction))?;
        Ok(Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Runs reconciliations between a local and a remote store.
///
/// At most one run per direction is active; the two directions may overlap.
pub struct SyncCoordinator<L, R> {
    local: L,
    remote: R,
    reconciler: Reconciler,
    pushing: AtomicBool,
    pulling: AtomicBool,
}

impl<L: ProductStore, R: ProductStore> SyncCoordinator<L, R> {
    pub fn new(local: L, remote: R) -> Self {
        Self {
            local,
            remote,
            reconciler: Reconciler::default(),
            pushing: AtomicBool::new(false),
            pulling: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.reconciler = Reconciler::new(concurrency);
        self
    }

    pub const fn local(&self) -> &L {
        &self.local
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Whether a run in `direction` is active
    pub fn is_running(&self, direction: SyncDirection) -> bool {
        self.flag(direction).load(Ordering::Acquire)
    }

    /// Push local records to the remote store
    pub async fn sync_local_to_remote(&self) -> Result<SyncReport> {
        self.sync(SyncDirection::LocalToRemote, &CancellationToken::new())
            .await
    }

    /// Pull remote records into the local store
    pub async fn sync_remote_to_local(&self) -> Result<SyncReport> {
        self.sync(SyncDirection::RemoteToLocal, &CancellationToken::new())
            .await
    }

    /// Run one direction, rejecting the call if that direction is busy
    pub async fn sync(
        &self,
        direction: SyncDirection,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let _guard = RunGuard::acquire(self.flag(direction), direction).map_err(|error| {
            tracing::warn!("Rejected {direction} sync: already running");
            error
        })?;

        let outcome = match direction {
            SyncDirection::LocalToRemote => {
                self.reconciler
                    .reconcile(&self.local, &self.remote, direction, cancel)
                    .await?
            }
            SyncDirection::RemoteToLocal => {
                self.reconciler
                    .reconcile(&self.remote, &self.local, direction, cancel)
                    .await?
            }
        };

        let report = SyncReport::from(outcome);
        tracing::info!("{direction} sync {}", report.signal.as_str());
        Ok(report)
    }

    /// Push then pull; the pull is skipped if the push was cancelled
    pub async fn sync_both(&self, cancel: &CancellationToken) -> Result<Vec<SyncReport>> {
        let push = self.sync(SyncDirection::LocalToRemote, cancel).await?;
        if push.signal == SyncSignal::Cancelled {
            return Ok(vec![push]);
        }

        let pull = self.sync(SyncDirection::RemoteToLocal, cancel).await?;
        Ok(vec![push, pull])
    }

    const fn flag(&self, direction: SyncDirection) -> &AtomicBool {
        match direction {
            SyncDirection::LocalToRemote => &self.pushing,
            SyncDirection::RemoteToLocal => &self.pulling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocumentStore;
    use crate::models::{parse_timestamp, Product, ProductKey};
    use crate::StoreResult;
    use pretty_assertions::assert_eq;
    use tokio::sync::Semaphore;

    /// Blocks enumeration until opened
    struct GatedStore {
        inner: MemoryDocumentStore,
        gate: Semaphore,
    }

    impl GatedStore {
        fn new(name: &str) -> Self {
            Self {
                inner: MemoryDocumentStore::new(name),
                gate: Semaphore::new(0),
            }
        }

        fn open(&self) {
            self.gate.add_permits(64);
        }
    }

    impl ProductStore for GatedStore {
        fn name(&self) -> &str {
            self.inner.name()
        }

        async fn enumerate(&self) -> StoreResult<Vec<Product>> {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|error| crate::StoreError::unavailable(self.name(), error))?;
            self.inner.enumerate().await
        }

        async fn get(&self, key: &ProductKey) -> StoreResult<Option<Product>> {
            self.inner.get(key).await
        }

        async fn upsert(&self, product: &Product) -> StoreResult<()> {
            self.inner.upsert(product).await
        }
    }

    fn product(key: &str) -> Product {
        let mut product = Product::with_key(key, key).unwrap();
        product.updated_at = parse_timestamp("2024-01-01T00:00:00Z");
        product
    }

    #[tokio::test]
    async fn directional_syncs_move_records() {
        let local = MemoryDocumentStore::new("local");
        let remote = MemoryDocumentStore::new("remote");
        local.upsert(&product("lamp")).await.unwrap();
        remote.upsert(&product("mug")).await.unwrap();

        let coordinator = SyncCoordinator::new(local, remote).with_concurrency(4);
        let push = coordinator.sync_local_to_remote().await.unwrap();
        let pull = coordinator.sync_remote_to_local().await.unwrap();

        assert_eq!(push.signal, SyncSignal::Succeeded);
        assert_eq!(push.outcome.inserted, 1);
        assert_eq!(pull.outcome.inserted, 1);
        assert_eq!(pull.outcome.skipped, 1);
        assert_eq!(coordinator.local().len().await, 2);
        assert_eq!(coordinator.remote().len().await, 2);
    }

    #[tokio::test]
    async fn busy_direction_is_rejected() {
        let coordinator =
            SyncCoordinator::new(GatedStore::new("local"), MemoryDocumentStore::new("remote"));
        coordinator.local().inner.upsert(&product("lamp")).await.unwrap();
        let token = CancellationToken::new();

        let first = coordinator.sync(SyncDirection::LocalToRemote, &token);
        tokio::pin!(first);
        tokio::select! {
            biased;
            _ = &mut first => panic!("gated sync finished early"),
            () = tokio::task::yield_now() => {}
        }
        assert!(coordinator.is_running(SyncDirection::LocalToRemote));

        let second = coordinator
            .sync(SyncDirection::LocalToRemote, &token)
            .await
            .unwrap_err();
        assert!(matches!(
            second,
            Error::SyncInProgress(SyncDirection::LocalToRemote)
        ));

        let other_direction = coordinator
            .sync(SyncDirection::RemoteToLocal, &token)
            .await
            .unwrap();
        assert_eq!(other_direction.signal, SyncSignal::Succeeded);

        coordinator.local().open();
        let report = first.await.unwrap();
        assert_eq!(report.outcome.inserted, 1);
        assert!(!coordinator.is_running(SyncDirection::LocalToRemote));

        let again = coordinator.sync_local_to_remote().await.unwrap();
        assert_eq!(again.outcome.skipped, 1);
    }

    #[tokio::test]
    async fn flag_is_released_after_errors() {
        let local = MemoryDocumentStore::new("local");
        local.set_offline(true).await;
        let coordinator = SyncCoordinator::new(local, MemoryDocumentStore::new("remote"));

        assert!(coordinator.sync_local_to_remote().await.is_err());
        assert!(!coordinator.is_running(SyncDirection::LocalToRemote));

        coordinator.local().set_offline(false).await;
        assert!(coordinator.sync_local_to_remote().await.is_ok());
    }

    #[tokio::test]
    async fn partial_failure_is_signalled() {
        let local = MemoryDocumentStore::new("local");
        local.upsert(&product("lamp")).await.unwrap();
        local.upsert(&product("mug")).await.unwrap();
        let remote = MemoryDocumentStore::new("remote");
        remote
            .fail_writes_for(
                &ProductKey::parse("mug").unwrap(),
                crate::StoreError::unavailable("remote", "timeout"),
            )
            .await;

        let report = SyncCoordinator::new(local, remote)
            .sync_local_to_remote()
            .await
            .unwrap();

        assert_eq!(report.signal, SyncSignal::PartialFailure);
        assert_eq!(report.outcome.failed, 1);
    }

    #[tokio::test]
    async fn sync_both_stops_after_cancelled_push() {
        let local = MemoryDocumentStore::new("local");
        local.upsert(&product("lamp")).await.unwrap();
        let coordinator = SyncCoordinator::new(local, MemoryDocumentStore::new("remote"));
        let token = CancellationToken::new();
        token.cancel();

        let reports = coordinator.sync_both(&token).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].signal, SyncSignal::Cancelled);
    }
}
