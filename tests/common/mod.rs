//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::Rng;
use uuid::Uuid;

use replica_server::object_storage::ObjectStorageConfig;
use replica_server::replica::{BaseFilter, ReplicaCreateBody, ReplicaManager};
use replica_server::store::{SqliteStore, StoreConfig, StoreHandle};
use replica_server::types::{GeometryType, ReplicaType};

pub const BUCKET: &str = "layers-bucket";

/// A fresh private in-memory SQLite store
pub async fn sqlite_store() -> Arc<SqliteStore> {
    Arc::new(
        SqliteStore::connect(&StoreConfig::in_memory())
            .await
            .unwrap(),
    )
}

pub fn manager_over(store: Arc<SqliteStore>) -> ReplicaManager {
    ReplicaManager::new(&StoreHandle::new(store), ObjectStorageConfig::default())
}

/// A layer id no other fixture in the same test is likely to share
pub fn random_layer_id() -> i32 {
    rand::thread_rng().gen_range(1..100_000)
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 3, 1, 8, 0, 0).unwrap()
}

/// `base_time` shifted by `minutes`
pub fn at(minutes: i64) -> DateTime<Utc> {
    base_time() + Duration::minutes(minutes)
}

pub fn create_body(filter: &BaseFilter, timestamp: DateTime<Utc>) -> ReplicaCreateBody {
    ReplicaCreateBody {
        replica_id: Uuid::new_v4(),
        layer_id: filter.layer_id,
        geometry_type: filter.geometry_type,
        replica_type: filter.replica_type,
        bucket_name: BUCKET.to_string(),
        sync_id: None,
        timestamp,
    }
}

pub fn snapshot_points(layer_id: i32) -> BaseFilter {
    BaseFilter::new(ReplicaType::Snapshot, GeometryType::Point, layer_id)
}
