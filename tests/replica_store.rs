//! SQLite Store Tests
//!
//! Exercises the repository traits against a real SQLite schema:
//! - Newly created replicas are hidden from every public read
//! - Timestamp ranges exclude the lower bound and include the upper
//! - Default ordering is newest first
//! - Deleting a replica removes its files
//! - Deletes on a file-backed database run concurrently without lock errors
//! - Bulk operations are not bounded by the SQLite variable limit

mod common;

use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

use common::{at, create_body, random_layer_id, snapshot_points, sqlite_store};
use replica_server::replica::{PrivateFilter, PublicFilter, Replica, ReplicaMetadata};
use replica_server::store::{
    FileRepository, ReplicaRepository, SqliteStore, StoreConfig, StoreError,
};
use replica_server::types::{GeometryType, ReplicaType, SortOrder};

// =============================================================================
// Helper Functions
// =============================================================================

async fn insert_published(
    store: &replica_server::store::SqliteStore,
    filter: &replica_server::replica::BaseFilter,
    minutes: i64,
) -> Uuid {
    let replica = create_body(filter, at(minutes)).into_replica(Utc::now());
    let id = replica.replica_id;
    store.create_replica(replica).await.unwrap();
    store
        .update_one_replica(id, &ReplicaMetadata::visibility(false))
        .await
        .unwrap();
    id
}

/// A SQLite store on disk, so connections in the pool share one database
async fn file_store(dir: &TempDir) -> Arc<SqliteStore> {
    let config = StoreConfig {
        url: format!("sqlite://{}", dir.path().join("replicas.db").display()),
        ..Default::default()
    };
    Arc::new(SqliteStore::connect(&config).await.unwrap())
}

/// Insert `count` visible point snapshots on `layer_id`, each with one file
async fn bulk_insert(store: &SqliteStore, layer_id: i32, count: i64) {
    sqlx::query(
        r#"
        WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < ?)
        INSERT INTO replica (
            replica_id, layer_id, geometry_type, replica_type, is_hidden,
            bucket_name, sync_id, timestamp, created_at, updated_at
        )
        SELECT printf('%08x-0000-4000-8000-%012x', n, n), ?, 'point', 'snapshot', 0,
               'bucket', NULL, n, 0, 0
        FROM seq
        "#,
    )
    .bind(count)
    .bind(layer_id)
    .execute(store.pool())
    .await
    .unwrap();

    sqlx::query(
        r#"
        INSERT INTO file (file_id, replica_id, created_at)
        SELECT printf('%08x-1111-4000-9000-%012x', rowid, rowid), replica_id, 0
        FROM replica WHERE layer_id = ?
        "#,
    )
    .bind(layer_id)
    .execute(store.pool())
    .await
    .unwrap();
}

// =============================================================================
// Visibility Tests
// =============================================================================

#[tokio::test]
async fn test_created_replica_is_hidden_from_public_reads() {
    let store = sqlite_store().await;
    let filter = snapshot_points(random_layer_id());

    let mut replica = create_body(&filter, at(0)).into_replica(Utc::now());
    replica.is_hidden = false;
    let id = replica.replica_id;
    store.create_replica(replica).await.unwrap();

    let stored = store.find_one_replica(id).await.unwrap().unwrap();
    assert!(stored.is_hidden);

    assert!(store.find_one_replica_with_files(id).await.unwrap().is_none());
    assert!(store
        .find_latest_replica_with_files(&filter)
        .await
        .unwrap()
        .is_none());
    assert!(store
        .find_replicas(&PublicFilter::from(filter))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_publish_then_read_with_no_files() {
    let store = sqlite_store().await;
    let filter = snapshot_points(random_layer_id());

    let mut replica = create_body(&filter, at(0)).into_replica(Utc::now());
    replica.sync_id = Some(Uuid::new_v4());
    let id = replica.replica_id;
    store.create_replica(replica.clone()).await.unwrap();
    store
        .update_one_replica(id, &ReplicaMetadata::visibility(false))
        .await
        .unwrap();

    let found = store.find_one_replica_with_files(id).await.unwrap().unwrap();
    assert!(found.files.is_empty());
    assert!(found.replica.updated_at >= found.replica.created_at);

    let expected = Replica {
        is_hidden: false,
        created_at: found.replica.created_at,
        updated_at: found.replica.updated_at,
        ..replica
    };
    assert_eq!(found.replica, expected);
    assert_eq!(found.replica.layer_id, filter.layer_id);
    assert_eq!(found.replica.geometry_type, GeometryType::Point);
    assert_eq!(found.replica.replica_type, ReplicaType::Snapshot);
    assert_eq!(found.replica.bucket_name, common::BUCKET);
    assert!(found.replica.sync_id.is_some());
}

#[tokio::test]
async fn test_duplicate_replica_is_unique_violation() {
    let store = sqlite_store().await;
    let replica = create_body(&snapshot_points(1), at(0)).into_replica(Utc::now());

    store.create_replica(replica.clone()).await.unwrap();
    let err = store.create_replica(replica).await.unwrap_err();
    assert!(matches!(err, StoreError::UniqueViolation(_)));
}

// =============================================================================
// Range and Ordering Tests
// =============================================================================

#[tokio::test]
async fn test_range_excludes_from_and_includes_to() {
    let store = sqlite_store().await;
    let filter = snapshot_points(random_layer_id());

    let _early = insert_published(&store, &filter, 0).await;
    let middle = insert_published(&store, &filter, 10).await;
    let edge = insert_published(&store, &filter, 20).await;
    let _late = insert_published(&store, &filter, 30).await;

    let found = store
        .find_replicas(&PublicFilter::from(filter).with_range(Some(at(0)), Some(at(20))))
        .await
        .unwrap();
    let ids: Vec<Uuid> = found.iter().map(|r| r.replica.replica_id).collect();
    assert_eq!(ids, vec![edge, middle]);
}

#[tokio::test]
async fn test_range_with_only_to_includes_the_bound() {
    let store = sqlite_store().await;
    let filter = snapshot_points(random_layer_id());

    let early = insert_published(&store, &filter, 0).await;
    let edge = insert_published(&store, &filter, 10).await;
    let _late = insert_published(&store, &filter, 20).await;

    let found = store
        .find_replicas(&PublicFilter::from(filter).with_range(None, Some(at(10))))
        .await
        .unwrap();
    let ids: Vec<Uuid> = found.iter().map(|r| r.replica.replica_id).collect();
    assert_eq!(ids, vec![edge, early]);
}

#[tokio::test]
async fn test_inverted_range_is_empty() {
    let store = sqlite_store().await;
    let filter = snapshot_points(random_layer_id());
    insert_published(&store, &filter, 10).await;

    let found = store
        .find_replicas(&PublicFilter::from(filter).with_range(Some(at(20)), Some(at(0))))
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_default_order_is_desc_and_asc_on_request() {
    let store = sqlite_store().await;
    let filter = snapshot_points(random_layer_id());

    let first = insert_published(&store, &filter, 0).await;
    let second = insert_published(&store, &filter, 5).await;
    let third = insert_published(&store, &filter, 10).await;

    let desc: Vec<Uuid> = store
        .find_replicas(&PublicFilter::from(filter))
        .await
        .unwrap()
        .iter()
        .map(|r| r.replica.replica_id)
        .collect();
    assert_eq!(desc, vec![third, second, first]);

    let asc: Vec<Uuid> = store
        .find_replicas(&PublicFilter::from(filter).with_sort(SortOrder::Asc))
        .await
        .unwrap()
        .iter()
        .map(|r| r.replica.replica_id)
        .collect();
    assert_eq!(asc, vec![first, second, third]);
}

#[tokio::test]
async fn test_latest_ignores_other_geometry_and_type() {
    let store = sqlite_store().await;
    let layer_id = random_layer_id();
    let filter = snapshot_points(layer_id);

    let wanted = insert_published(&store, &filter, 0).await;
    let polygon = replica_server::replica::BaseFilter::new(
        ReplicaType::Snapshot,
        GeometryType::Polygon,
        layer_id,
    );
    insert_published(&store, &polygon, 50).await;
    let delta =
        replica_server::replica::BaseFilter::new(ReplicaType::Delta, GeometryType::Point, layer_id);
    insert_published(&store, &delta, 60).await;

    let latest = store
        .find_latest_replica_with_files(&filter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.replica.replica_id, wanted);
}

// =============================================================================
// File Tests
// =============================================================================

#[tokio::test]
async fn test_files_come_back_in_insertion_order() {
    let store = sqlite_store().await;
    let filter = snapshot_points(random_layer_id());
    let id = insert_published(&store, &filter, 0).await;

    let files: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
    for file_id in &files {
        store.create_file_on_replica(id, *file_id).await.unwrap();
    }

    let found = store.find_one_replica_with_files(id).await.unwrap().unwrap();
    assert_eq!(found.file_ids(), files);
    assert_eq!(store.find_files_of_replica(id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_file_on_missing_replica_is_foreign_key_violation() {
    let store = sqlite_store().await;
    let err = store
        .create_file_on_replica(Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation(_)));
}

// =============================================================================
// Delete Tests
// =============================================================================

#[tokio::test]
async fn test_delete_one_replica_removes_files() {
    let store = sqlite_store().await;
    let filter = snapshot_points(random_layer_id());
    let id = insert_published(&store, &filter, 0).await;
    store.create_file_on_replica(id, Uuid::new_v4()).await.unwrap();
    store.create_file_on_replica(id, Uuid::new_v4()).await.unwrap();
    assert_eq!(store.file_count(id).await.unwrap(), 2);

    let deleted = store.delete_one_replica(id).await.unwrap().unwrap();
    assert_eq!(deleted.files.len(), 2);
    assert_eq!(store.file_count(id).await.unwrap(), 0);
    assert!(store.find_one_replica(id).await.unwrap().is_none());

    assert!(store.delete_one_replica(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_replicas_twice_second_is_empty() {
    let store = sqlite_store().await;
    let layer_id = random_layer_id();
    let filter = snapshot_points(layer_id);
    insert_published(&store, &filter, 0).await;
    insert_published(&store, &filter, 1).await;

    let private = PrivateFilter::new().layer_id(layer_id);
    assert_eq!(store.delete_replicas(&private).await.unwrap().len(), 2);
    assert!(store.delete_replicas(&private).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_replicas_respects_hidden_flag() {
    let store = sqlite_store().await;
    let filter = snapshot_points(random_layer_id());
    let published = insert_published(&store, &filter, 0).await;

    let hidden = create_body(&filter, at(5)).into_replica(Utc::now());
    let hidden_id = hidden.replica_id;
    store.create_replica(hidden).await.unwrap();

    let deleted = store
        .delete_replicas(&PrivateFilter::new().is_hidden(true))
        .await
        .unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].replica.replica_id, hidden_id);
    assert!(store.find_one_replica(published).await.unwrap().is_some());
}

// =============================================================================
// Bulk Update Tests
// =============================================================================

#[tokio::test]
async fn test_update_replicas_by_range_publishes_matches_only() {
    let store = sqlite_store().await;
    let layer_id = random_layer_id();
    let filter = snapshot_points(layer_id);

    let mut ids = Vec::new();
    for minutes in [0, 10, 20] {
        let replica = create_body(&filter, at(minutes)).into_replica(Utc::now());
        ids.push(replica.replica_id);
        store.create_replica(replica).await.unwrap();
    }

    let touched = store
        .update_replicas(
            &PrivateFilter::new().layer_id(layer_id).range(Some(at(0)), None),
            &ReplicaMetadata::visibility(false),
        )
        .await
        .unwrap();
    assert_eq!(touched, 2);

    assert!(store.find_one_replica(ids[0]).await.unwrap().unwrap().is_hidden);
    assert!(!store.find_one_replica(ids[1]).await.unwrap().unwrap().is_hidden);
    assert!(!store.find_one_replica(ids[2]).await.unwrap().unwrap().is_hidden);
}

#[tokio::test]
async fn test_private_filter_by_sync_id() {
    let store = sqlite_store().await;
    let filter = snapshot_points(random_layer_id());
    let sync_id = Uuid::new_v4();

    let mut synced = create_body(&filter, at(0)).into_replica(Utc::now());
    synced.sync_id = Some(sync_id);
    let synced_id = synced.replica_id;
    store.create_replica(synced).await.unwrap();

    let mut other = create_body(&filter, at(5)).into_replica(Utc::now());
    other.sync_id = Some(Uuid::new_v4());
    let other_id = other.replica_id;
    store.create_replica(other).await.unwrap();

    let unsynced = create_body(&filter, at(10)).into_replica(Utc::now());
    let unsynced_id = unsynced.replica_id;
    store.create_replica(unsynced).await.unwrap();

    let by_sync = PrivateFilter::new().sync_id(sync_id);
    let touched = store
        .update_replicas(&by_sync, &ReplicaMetadata::visibility(false))
        .await
        .unwrap();
    assert_eq!(touched, 1);
    assert!(!store.find_one_replica(synced_id).await.unwrap().unwrap().is_hidden);
    assert!(store.find_one_replica(other_id).await.unwrap().unwrap().is_hidden);
    assert!(store.find_one_replica(unsynced_id).await.unwrap().unwrap().is_hidden);

    let deleted = store.delete_replicas(&by_sync).await.unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].replica.replica_id, synced_id);
    assert_eq!(deleted[0].replica.sync_id, Some(sync_id));
    assert!(store.find_one_replica(other_id).await.unwrap().is_some());
    assert!(store.find_one_replica(unsynced_id).await.unwrap().is_some());
}

// =============================================================================
// Concurrency and Scale Tests
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deletes_on_file_database() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;
    let filter = snapshot_points(random_layer_id());

    let mut ids = Vec::new();
    for minutes in 0..200 {
        let id = insert_published(&store, &filter, minutes).await;
        store.create_file_on_replica(id, Uuid::new_v4()).await.unwrap();
        ids.push(id);
    }

    let tasks: Vec<_> = ids
        .iter()
        .map(|&id| {
            let store = store.clone();
            tokio::spawn(async move { (id, store.delete_one_replica(id).await) })
        })
        .collect();

    for task in tasks {
        let (id, result) = task.await.unwrap();
        let deleted = result
            .unwrap_or_else(|e| panic!("delete of {} failed: {}", id, e))
            .unwrap();
        assert_eq!(deleted.replica.replica_id, id);
        assert_eq!(deleted.files.len(), 1);
    }

    for id in ids {
        assert_eq!(store.file_count(id).await.unwrap(), 0);
        assert!(store.find_one_replica(id).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_bulk_operations_beyond_sqlite_variable_limit() {
    let store = sqlite_store().await;
    let layer_id = 2;
    bulk_insert(&store, layer_id, 33_000).await;

    let found = store
        .find_replicas(&PublicFilter::from(snapshot_points(layer_id)))
        .await
        .unwrap();
    assert_eq!(found.len(), 33_000);
    assert!(found.iter().all(|r| r.files.len() == 1));

    let private = PrivateFilter::new().layer_id(layer_id);
    let touched = store
        .update_replicas(&private, &ReplicaMetadata::visibility(true))
        .await
        .unwrap();
    assert_eq!(touched, 33_000);

    let deleted = store.delete_replicas(&private).await.unwrap();
    assert_eq!(deleted.len(), 33_000);
    assert!(deleted.iter().all(|r| r.files.len() == 1));
    assert!(store.delete_replicas(&private).await.unwrap().is_empty());
}
