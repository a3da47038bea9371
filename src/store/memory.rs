//! # In-Memory Store
//!
//! Tables live behind a single lock. Every operation holds the lock for its
//! whole read/modify sequence, which gives the same atomicity the SQLite
//! backend gets from a transaction. Primary and foreign keys are enforced.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::predicate::FilterSet;
use super::{FileRepository, HealthCheck, LayerRepository, ReplicaRepository};
use crate::layer::model::Layer;
use crate::replica::filter::{BaseFilter, PrivateFilter, PublicFilter};
use crate::replica::model::{File, Replica, ReplicaMetadata, ReplicaWithFiles};
use crate::replica::visibility::Visibility;
use crate::types::SortOrder;

/// Same precision the SQLite backend keeps
fn to_micros(time: DateTime<Utc>) -> DateTime<Utc> {
    time.trunc_subsecs(6)
}

fn now_micros() -> DateTime<Utc> {
    to_micros(Utc::now())
}

fn apply_metadata(metadata: &ReplicaMetadata, replica: &mut Replica, now: DateTime<Utc>) {
    metadata.apply_to(replica, now);
    replica.timestamp = to_micros(replica.timestamp);
}

#[derive(Debug, Default)]
struct Tables {
    replicas: HashMap<Uuid, Replica>,
    /// Insertion ordered
    files: Vec<File>,
    layers: Vec<Layer>,
}

impl Tables {
    fn files_of(&self, replica_id: Uuid) -> Vec<File> {
        self.files
            .iter()
            .filter(|f| f.replica_id == replica_id)
            .cloned()
            .collect()
    }

    fn with_files(&self, replica: &Replica) -> ReplicaWithFiles {
        ReplicaWithFiles::new(replica.clone(), self.files_of(replica.replica_id))
    }

    fn select(&self, filters: &FilterSet, sort: SortOrder) -> Vec<&Replica> {
        let mut rows: Vec<&Replica> = self
            .replicas
            .values()
            .filter(|r| filters.matches(r))
            .collect();
        match sort {
            SortOrder::Asc => rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
            SortOrder::Desc => rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        }
        rows
    }

    fn remove(&mut self, replica_ids: &[Uuid]) {
        self.files.retain(|f| !replica_ids.contains(&f.replica_id));
        for id in replica_ids {
            self.replicas.remove(id);
        }
    }
}

/// In-memory store for tests and local runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layers(layers: Vec<Layer>) -> Self {
        let store = Self::new();
        if let Ok(mut tables) = store.tables.write() {
            tables.layers = layers;
        }
        store
    }

    /// Number of file rows owned by `replica_id`, regardless of visibility
    pub fn file_count(&self, replica_id: Uuid) -> StoreResult<usize> {
        Ok(self.read()?.files_of(replica_id).len())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Internal("Lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Internal("Lock poisoned".to_string()))
    }
}

#[async_trait]
impl ReplicaRepository for MemoryStore {
    async fn find_one_replica(&self, replica_id: Uuid) -> StoreResult<Option<Replica>> {
        Ok(self.read()?.replicas.get(&replica_id).cloned())
    }

    async fn find_one_replica_with_files(
        &self,
        replica_id: Uuid,
    ) -> StoreResult<Option<ReplicaWithFiles>> {
        let tables = self.read()?;
        Ok(tables
            .replicas
            .get(&replica_id)
            .filter(|r| Visibility::of(r).is_readable())
            .map(|r| tables.with_files(r)))
    }

    async fn find_replicas(&self, filter: &PublicFilter) -> StoreResult<Vec<ReplicaWithFiles>> {
        let tables = self.read()?;
        let filters = FilterSet::from(filter);
        Ok(tables
            .select(&filters, filter.sort)
            .into_iter()
            .map(|r| tables.with_files(r))
            .collect())
    }

    async fn find_latest_replica_with_files(
        &self,
        filter: &BaseFilter,
    ) -> StoreResult<Option<ReplicaWithFiles>> {
        let tables = self.read()?;
        let filters = FilterSet::from(filter).visible();
        Ok(tables
            .select(&filters, SortOrder::Desc)
            .first()
            .map(|r| tables.with_files(r)))
    }

    async fn create_replica(&self, mut replica: Replica) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.replicas.contains_key(&replica.replica_id) {
            return Err(StoreError::UniqueViolation(format!(
                "replica.replica_id {}",
                replica.replica_id
            )));
        }

        let now = now_micros();
        replica.is_hidden = true;
        replica.timestamp = to_micros(replica.timestamp);
        replica.created_at = now;
        replica.updated_at = now;
        tables.replicas.insert(replica.replica_id, replica);
        Ok(())
    }

    async fn update_one_replica(
        &self,
        replica_id: Uuid,
        metadata: &ReplicaMetadata,
    ) -> StoreResult<()> {
        let mut tables = self.write()?;
        if let Some(replica) = tables.replicas.get_mut(&replica_id) {
            apply_metadata(metadata, replica, now_micros());
        }
        Ok(())
    }

    async fn update_replicas(
        &self,
        filter: &PrivateFilter,
        metadata: &ReplicaMetadata,
    ) -> StoreResult<u64> {
        let mut tables = self.write()?;
        let filters = FilterSet::from(filter);
        let now = now_micros();

        let mut touched = 0;
        for replica in tables.replicas.values_mut().filter(|r| filters.matches(r)) {
            apply_metadata(metadata, replica, now);
            touched += 1;
        }
        Ok(touched)
    }

    async fn delete_one_replica(&self, replica_id: Uuid) -> StoreResult<Option<ReplicaWithFiles>> {
        let mut tables = self.write()?;
        let snapshot = match tables.replicas.get(&replica_id) {
            Some(replica) => tables.with_files(replica),
            None => return Ok(None),
        };

        tables.remove(&[replica_id]);
        Ok(Some(snapshot))
    }

    async fn delete_replicas(&self, filter: &PrivateFilter) -> StoreResult<Vec<ReplicaWithFiles>> {
        let mut tables = self.write()?;
        let filters = FilterSet::from(filter);
        let snapshots: Vec<ReplicaWithFiles> = tables
            .select(&filters, SortOrder::Desc)
            .into_iter()
            .map(|r| tables.with_files(r))
            .collect();

        let ids: Vec<Uuid> = snapshots.iter().map(|s| s.replica.replica_id).collect();
        tables.remove(&ids);
        Ok(snapshots)
    }
}

#[async_trait]
impl FileRepository for MemoryStore {
    async fn find_one_file(&self, file_id: Uuid) -> StoreResult<Option<File>> {
        Ok(self
            .read()?
            .files
            .iter()
            .find(|f| f.file_id == file_id)
            .cloned())
    }

    async fn create_file_on_replica(&self, replica_id: Uuid, file_id: Uuid) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.replicas.contains_key(&replica_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "file.replica_id {}",
                replica_id
            )));
        }
        if tables.files.iter().any(|f| f.file_id == file_id) {
            return Err(StoreError::UniqueViolation(format!("file.file_id {}", file_id)));
        }

        tables.files.push(File {
            file_id,
            replica_id,
            created_at: now_micros(),
        });
        Ok(())
    }

    async fn find_files_of_replica(&self, replica_id: Uuid) -> StoreResult<Vec<File>> {
        Ok(self.read()?.files_of(replica_id))
    }
}

#[async_trait]
impl LayerRepository for MemoryStore {
    async fn find_all_layers(&self) -> StoreResult<Vec<Layer>> {
        let mut layers = self.read()?.layers.clone();
        layers.sort_by_key(|l| l.layer_id);
        Ok(layers)
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.read().map(|_| ())
    }
}
