//! # Replica Store
//!
//! One trait per repository with a fixed method set, implemented by
//! [`SqliteStore`] (sqlx over SQLite) and [`MemoryStore`] (in-process tables).
//! Handles are injected into managers at construction; there is no global
//! connection.

pub mod errors;
pub mod memory;
pub mod predicate;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::layer::model::Layer;
use crate::replica::filter::{BaseFilter, PrivateFilter, PublicFilter};
use crate::replica::model::{File, Replica, ReplicaMetadata, ReplicaWithFiles};

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, StoreConfig};

/// Replica rows and their cascading files
#[async_trait]
pub trait ReplicaRepository: Send + Sync {
    /// Exact id lookup, hidden rows included
    async fn find_one_replica(&self, replica_id: Uuid) -> StoreResult<Option<Replica>>;

    /// Id lookup restricted to visible rows, with files
    async fn find_one_replica_with_files(
        &self,
        replica_id: Uuid,
    ) -> StoreResult<Option<ReplicaWithFiles>>;

    /// Visible rows matching the filter, ordered by timestamp
    async fn find_replicas(&self, filter: &PublicFilter) -> StoreResult<Vec<ReplicaWithFiles>>;

    /// Newest visible row matching the filter
    async fn find_latest_replica_with_files(
        &self,
        filter: &BaseFilter,
    ) -> StoreResult<Option<ReplicaWithFiles>>;

    /// Insert a replica. It is always stored hidden.
    async fn create_replica(&self, replica: Replica) -> StoreResult<()>;

    async fn update_one_replica(
        &self,
        replica_id: Uuid,
        metadata: &ReplicaMetadata,
    ) -> StoreResult<()>;

    /// Returns how many rows were touched
    async fn update_replicas(
        &self,
        filter: &PrivateFilter,
        metadata: &ReplicaMetadata,
    ) -> StoreResult<u64>;

    /// Load and remove a replica and its files in one transaction
    async fn delete_one_replica(&self, replica_id: Uuid) -> StoreResult<Option<ReplicaWithFiles>>;

    /// Load and remove every match and their files in one transaction
    async fn delete_replicas(&self, filter: &PrivateFilter) -> StoreResult<Vec<ReplicaWithFiles>>;
}

#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn find_one_file(&self, file_id: Uuid) -> StoreResult<Option<File>>;

    async fn create_file_on_replica(&self, replica_id: Uuid, file_id: Uuid) -> StoreResult<()>;

    async fn find_files_of_replica(&self, replica_id: Uuid) -> StoreResult<Vec<File>>;
}

#[async_trait]
pub trait LayerRepository: Send + Sync {
    /// All layers ordered by id
    async fn find_all_layers(&self) -> StoreResult<Vec<Layer>>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;
}

/// Every repository backed by the same store
#[derive(Clone)]
pub struct StoreHandle {
    pub replicas: Arc<dyn ReplicaRepository>,
    pub files: Arc<dyn FileRepository>,
    pub layers: Arc<dyn LayerRepository>,
    pub health: Arc<dyn HealthCheck>,
}

impl StoreHandle {
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: ReplicaRepository + FileRepository + LayerRepository + HealthCheck + 'static,
    {
        Self {
            replicas: store.clone(),
            files: store.clone(),
            layers: store.clone(),
            health: store,
        }
    }
}
