//! End-to-end sync behaviour between a SQLite local store and a document store.

use pretty_assertions::assert_eq;
use shelf_core::models::parse_timestamp;
use shelf_core::{
    CancellationToken, DatabaseService, MemoryDocumentStore, Product, ProductKey, ProductStore,
    StoreError, SyncCoordinator, SyncDirection, SyncSignal,
};

type Coordinator = SyncCoordinator<DatabaseService, MemoryDocumentStore>;

fn coordinator() -> Coordinator {
    SyncCoordinator::new(
        DatabaseService::open_in_memory().unwrap(),
        MemoryDocumentStore::default(),
    )
    .with_concurrency(4)
}

fn key(value: &str) -> ProductKey {
    ProductKey::parse(value).unwrap()
}

fn product(key: &str, updated_at: &str) -> Product {
    let mut product = Product::with_key(key, format!("{key} product")).unwrap();
    product.category = "Home".to_string();
    product.updated_at = parse_timestamp(updated_at);
    product
}

#[tokio::test]
async fn scenario_newer_source_overwrites_target() {
    let coordinator = coordinator();
    let mut source = product("mug", "2024-01-02T00:00:00Z");
    source.likes = 5;
    let mut target = product("mug", "2024-01-01T00:00:00Z");
    target.likes = 2;
    coordinator.local().upsert(&source).await.unwrap();
    coordinator.remote().upsert(&target).await.unwrap();

    let report = coordinator.sync_local_to_remote().await.unwrap();

    assert_eq!(report.outcome.updated, 1);
    let stored = coordinator.remote().get(&key("mug")).await.unwrap().unwrap();
    assert_eq!(stored.likes, 5);
    assert_eq!(stored.updated_at, parse_timestamp("2024-01-02T00:00:00Z"));
}

#[tokio::test]
async fn scenario_missing_key_is_inserted_with_all_fields() {
    let coordinator = coordinator();
    let mut lamp = product("lamp", "2024-01-01T00:00:00Z");
    lamp.sub_category = "Lighting".to_string();
    lamp.link = Some("https://shop.example.com/lamp".to_string());
    lamp.comments = 3;
    lamp.supplier_orders = 40;
    lamp.rating = 4.25;
    lamp.supplier_price = 12.5;
    lamp.store_price = 29.99;
    coordinator.local().upsert(&lamp).await.unwrap();

    let report = coordinator.sync_local_to_remote().await.unwrap();

    assert_eq!(report.outcome.inserted, 1);
    assert_eq!(
        coordinator.remote().get(&key("lamp")).await.unwrap(),
        Some(lamp)
    );
}

#[tokio::test]
async fn scenario_newer_target_is_skipped() {
    let coordinator = coordinator();
    let source = product("pen", "2024-01-01T00:00:00Z");
    let mut target = product("pen", "2024-01-05T00:00:00Z");
    target.likes = 8;
    coordinator.local().upsert(&source).await.unwrap();
    coordinator.remote().upsert(&target).await.unwrap();

    let report = coordinator.sync_local_to_remote().await.unwrap();

    assert_eq!(report.outcome.skipped, 1);
    assert_eq!(report.outcome.updated, 0);
    assert_eq!(report.outcome.conflicts.len(), 1);
    assert_eq!(
        coordinator.remote().get(&key("pen")).await.unwrap(),
        Some(target)
    );
}

#[tokio::test]
async fn second_run_in_same_direction_writes_nothing() {
    let coordinator = coordinator();
    for (name, stamp) in [
        ("a", "2024-01-01T00:00:00.123Z"),
        ("b", "2024-02-01T10:00:00Z"),
        ("c", "2024-03-01T00:00:00.999Z"),
    ] {
        coordinator.local().upsert(&product(name, stamp)).await.unwrap();
    }
    coordinator
        .remote()
        .upsert(&product("b", "2023-12-31T00:00:00Z"))
        .await
        .unwrap();

    for direction in [SyncDirection::LocalToRemote, SyncDirection::RemoteToLocal] {
        let token = CancellationToken::new();
        let first = coordinator.sync(direction, &token).await.unwrap();
        assert_eq!(first.signal, SyncSignal::Succeeded);

        let writes_before = coordinator.remote().write_count().await;
        let second = coordinator.sync(direction, &token).await.unwrap();
        assert_eq!(second.outcome.writes(), 0, "{direction} was not idempotent");
        assert_eq!(coordinator.remote().write_count().await, writes_before);
    }
}

#[tokio::test]
async fn target_keeps_the_newest_version_per_key() {
    let cases = [
        ("older-source", "2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z"),
        ("newer-source", "2024-01-03T00:00:00Z", "2024-01-02T00:00:00Z"),
        ("tied", "2024-01-02T00:00:00Z", "2024-01-02T00:00:00Z"),
    ];

    let coordinator = coordinator();
    for (name, source_at, target_at) in cases {
        let mut source = product(name, source_at);
        source.name = format!("{name} from local");
        let mut target = product(name, target_at);
        target.name = format!("{name} from remote");
        coordinator.local().upsert(&source).await.unwrap();
        coordinator.remote().upsert(&target).await.unwrap();
    }

    coordinator.sync_local_to_remote().await.unwrap();

    for (name, source_at, target_at) in cases {
        let stored = coordinator.remote().get(&key(name)).await.unwrap().unwrap();
        let expected = if source_at > target_at {
            coordinator.local().get(&key(name)).await.unwrap().unwrap()
        } else {
            product_named(name, target_at, &format!("{name} from remote"))
        };
        assert_eq!(stored, expected, "wrong winner for {name}");
    }
}

fn product_named(key: &str, updated_at: &str, name: &str) -> Product {
    let mut product = product(key, updated_at);
    product.name = name.to_string();
    product
}

#[tokio::test]
async fn one_failing_record_does_not_stop_the_run() {
    let coordinator = coordinator();
    for name in ["a", "b", "c", "d"] {
        coordinator
            .local()
            .upsert(&product(name, "2024-01-01T00:00:00Z"))
            .await
            .unwrap();
    }
    coordinator
        .remote()
        .fail_writes_for(&key("b"), StoreError::unavailable("remote", "deadline exceeded"))
        .await;
    coordinator
        .remote()
        .fail_writes_for(&key("d"), StoreError::validation("document too large"))
        .await;

    let report = coordinator.sync_local_to_remote().await.unwrap();

    assert_eq!(report.signal, SyncSignal::PartialFailure);
    assert_eq!(report.outcome.inserted, 2);
    assert_eq!(report.outcome.failed_keys(), vec![&key("b"), &key("d")]);
    assert_eq!(coordinator.remote().len().await, 2);
}

#[tokio::test]
async fn every_record_failing_is_a_failed_run() {
    let coordinator = coordinator();
    coordinator
        .local()
        .upsert(&product("a", "2024-01-01T00:00:00Z"))
        .await
        .unwrap();
    coordinator
        .remote()
        .fail_writes_for(&key("a"), StoreError::validation("rejected"))
        .await;

    let report = coordinator.sync_local_to_remote().await.unwrap();
    assert_eq!(report.signal, SyncSignal::Failed);
}

#[tokio::test]
async fn equal_timestamps_never_write() {
    let coordinator = coordinator();
    let mut local = product("mug", "2024-01-01T00:00:00Z");
    local.likes = 1;
    let mut remote = local.clone();
    remote.likes = 99;
    coordinator.local().upsert(&local).await.unwrap();
    coordinator.remote().upsert(&remote).await.unwrap();
    let writes_before = coordinator.remote().write_count().await;

    let push = coordinator.sync_local_to_remote().await.unwrap();
    let pull = coordinator.sync_remote_to_local().await.unwrap();

    assert_eq!((push.outcome.skipped, pull.outcome.skipped), (1, 1));
    assert!(push.outcome.conflicts.is_empty());
    assert_eq!(coordinator.remote().write_count().await, writes_before);
    assert_eq!(
        coordinator.local().get(&key("mug")).await.unwrap().unwrap().likes,
        1
    );
}

#[tokio::test]
async fn both_directions_converge() {
    let coordinator = coordinator();
    coordinator
        .local()
        .upsert(&product("local-only", "2024-01-01T00:00:00Z"))
        .await
        .unwrap();
    coordinator
        .remote()
        .upsert(&product("remote-only", "2024-01-01T00:00:00Z"))
        .await
        .unwrap();
    let mut edited = product("shared", "2024-04-01T00:00:00Z");
    edited.store_price = 15.0;
    coordinator.local().upsert(&product("shared", "2024-01-01T00:00:00Z")).await.unwrap();
    coordinator.remote().upsert(&edited).await.unwrap();

    let reports = coordinator
        .sync_both(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(reports.len(), 2);

    let mut local = coordinator.local().enumerate().await.unwrap();
    let mut remote = coordinator.remote().enumerate().await.unwrap();
    local.sort_by(|a, b| a.key.cmp(&b.key));
    remote.sort_by(|a, b| a.key.cmp(&b.key));
    assert_eq!(local, remote);
    assert_eq!(local.len(), 3);
    assert!(local.iter().any(|product| product.store_price > 14.0));
}

#[tokio::test]
async fn pulled_runs_are_journaled() {
    let coordinator = coordinator();
    coordinator
        .remote()
        .upsert(&product("lamp", "2024-01-01T00:00:00Z"))
        .await
        .unwrap();
    coordinator
        .local()
        .upsert(&product("pen", "2024-01-09T00:00:00Z"))
        .await
        .unwrap();
    coordinator
        .remote()
        .upsert(&product("pen", "2024-01-01T00:00:00Z"))
        .await
        .unwrap();

    let report = coordinator.sync_remote_to_local().await.unwrap();
    coordinator.local().record_run(&report.outcome).await.unwrap();

    let runs = coordinator.local().list_runs(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].direction, SyncDirection::RemoteToLocal);
    assert_eq!(runs[0].inserted, 1);

    let conflicts = coordinator.local().list_conflicts(10).await.unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].key, key("pen"));
}

#[tokio::test]
async fn legacy_name_key_with_trailing_space_keeps_its_document() {
    let coordinator = coordinator();
    let fields = serde_json::from_value(serde_json::json!({
        "product_name": { "stringValue": "Mug" },
        "likes": { "integerValue": "4" },
        "updated_at": { "timestampValue": "2024-01-05T00:00:00Z" }
    }))
    .unwrap();
    coordinator.remote().insert_raw("Mug ", fields).await;

    let pull = coordinator.sync_remote_to_local().await.unwrap();
    assert_eq!(pull.outcome.inserted, 1);
    assert!(coordinator.local().get(&key("Mug ")).await.unwrap().is_some());

    let push = coordinator.sync_local_to_remote().await.unwrap();
    assert_eq!(push.outcome.inserted, 0);
    assert_eq!(push.outcome.updated, 0);
    assert_eq!(push.outcome.skipped, 1);
    assert_eq!(coordinator.remote().len().await, 1);

    let remote = coordinator.remote().enumerate().await.unwrap();
    assert_eq!(remote[0].key, key("Mug "));
}
