//! # Replica Lifecycle Manager
//!
//! Public reads only ever see visible replicas and answer with the response
//! shape carrying object-storage URLs. Administrative writes go through the
//! private filter and may target hidden replicas.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::errors::{ReplicaError, ReplicaResult};
use super::filter::{BaseFilter, PrivateFilter, PublicFilter};
use super::model::{ReplicaCreateBody, ReplicaMetadata, ReplicaResponse, ReplicaWithFiles};
use super::visibility::Visibility;
use crate::object_storage::ObjectStorageConfig;
use crate::log_event;
use crate::observability::{Event, ObservationScope};
use crate::store::{FileRepository, ReplicaRepository, StoreError, StoreHandle};

fn replica_not_found(replica_id: Uuid) -> ReplicaError {
    ReplicaError::ReplicaNotFound(format!("replica with id {} was not found", replica_id))
}

pub struct ReplicaManager {
    replicas: Arc<dyn ReplicaRepository>,
    files: Arc<dyn FileRepository>,
    object_storage: ObjectStorageConfig,
}

impl ReplicaManager {
    pub fn new(store: &StoreHandle, object_storage: ObjectStorageConfig) -> Self {
        Self {
            replicas: store.replicas.clone(),
            files: store.files.clone(),
            object_storage,
        }
    }

    fn to_response(&self, replica: &ReplicaWithFiles) -> ReplicaResponse {
        ReplicaResponse::new(&replica.replica, self.object_storage.urls_for(replica))
    }

    /// A visible replica by id. Hidden and missing replicas are indistinguishable.
    pub async fn get_replica_by_id(&self, replica_id: Uuid) -> ReplicaResult<ReplicaResponse> {
        let replica = self
            .replicas
            .find_one_replica_with_files(replica_id)
            .await?
            .ok_or_else(|| replica_not_found(replica_id))?;
        Ok(self.to_response(&replica))
    }

    /// The newest visible replica of a layer, geometry type and replica type
    pub async fn get_latest_replica(&self, filter: &BaseFilter) -> ReplicaResult<ReplicaResponse> {
        let replica = self
            .replicas
            .find_latest_replica_with_files(filter)
            .await?
            .ok_or_else(|| {
                ReplicaError::ReplicaNotFound(format!(
                    "replica of type {} with geometry type of {} on layer {} was not found",
                    filter.replica_type, filter.geometry_type, filter.layer_id
                ))
            })?;
        Ok(self.to_response(&replica))
    }

    pub async fn get_replicas(&self, filter: &PublicFilter) -> ReplicaResult<Vec<ReplicaResponse>> {
        let replicas = self.replicas.find_replicas(filter).await?;
        Ok(replicas.iter().map(|r| self.to_response(r)).collect())
    }

    /// Register a replica. It stays hidden until explicitly published.
    pub async fn create_replica(&self, body: ReplicaCreateBody) -> ReplicaResult<()> {
        body.validate()?;

        let replica_id = body.replica_id;
        let already_exists = || {
            ReplicaError::ReplicaAlreadyExists(format!(
                "replica with id {} already exists",
                replica_id
            ))
        };
        if self.replicas.find_one_replica(replica_id).await?.is_some() {
            return Err(already_exists());
        }

        let replica = body.into_replica(Utc::now());
        let layer_id = replica.layer_id;
        match self.replicas.create_replica(replica).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation(_)) => return Err(already_exists()),
            Err(e) => return Err(e.into()),
        }

        log_event!(Event::ReplicaCreated, replica_id = %replica_id, layer_id);
        Ok(())
    }

    pub async fn create_file_on_replica(
        &self,
        replica_id: Uuid,
        file_id: Uuid,
    ) -> ReplicaResult<()> {
        if self.replicas.find_one_replica(replica_id).await?.is_none() {
            return Err(replica_not_found(replica_id));
        }

        let file_exists =
            || ReplicaError::FileAlreadyExists(format!("file with id {} already exists", file_id));
        if self.files.find_one_file(file_id).await?.is_some() {
            return Err(file_exists());
        }

        match self.files.create_file_on_replica(replica_id, file_id).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation(_)) => return Err(file_exists()),
            Err(StoreError::ForeignKeyViolation(_)) => {
                return Err(replica_not_found(replica_id))
            }
            Err(e) => return Err(e.into()),
        }

        log_event!(Event::FileCreated, replica_id = %replica_id, file_id = %file_id);
        Ok(())
    }

    /// Update a single replica, hidden or not
    pub async fn update_replica(
        &self,
        replica_id: Uuid,
        metadata: ReplicaMetadata,
    ) -> ReplicaResult<()> {
        metadata.validate()?;

        let existing = self
            .replicas
            .find_one_replica(replica_id)
            .await?
            .ok_or_else(|| replica_not_found(replica_id))?;

        self.replicas.update_one_replica(replica_id, &metadata).await?;

        log_event!(Event::ReplicaUpdated, replica_id = %replica_id);

        let before = Visibility::of(&existing);
        match (before, before.after(&metadata)) {
            (Visibility::Hidden, Visibility::Visible) => {
                log_event!(Event::ReplicaPublished, replica_id = %replica_id)
            }
            (Visibility::Visible, Visibility::Hidden) => {
                log_event!(Event::ReplicaHidden, replica_id = %replica_id)
            }
            _ => {}
        }
        Ok(())
    }

    /// Update every replica matching the filter. Matching nothing is not an error.
    pub async fn update_replicas(
        &self,
        filter: &PrivateFilter,
        metadata: ReplicaMetadata,
    ) -> ReplicaResult<u64> {
        metadata.validate()?;

        let scope = ObservationScope::new("UPDATE_REPLICAS");
        let touched = match self.replicas.update_replicas(filter, &metadata).await {
            Ok(touched) => touched,
            Err(e) => {
                scope.fail(&e.to_string());
                return Err(e.into());
            }
        };
        scope.complete_with_count(touched);
        Ok(touched)
    }

    /// Delete a replica and its files, answering with what was removed
    pub async fn delete_replica(&self, replica_id: Uuid) -> ReplicaResult<ReplicaResponse> {
        let deleted = self
            .replicas
            .delete_one_replica(replica_id)
            .await?
            .ok_or_else(|| replica_not_found(replica_id))?;

        log_event!(
            Event::ReplicaDeleted,
            replica_id = %replica_id,
            files = deleted.files.len()
        );
        Ok(self.to_response(&deleted))
    }

    /// Delete every replica matching the filter. An empty result is success.
    pub async fn delete_replicas(
        &self,
        filter: &PrivateFilter,
    ) -> ReplicaResult<Vec<ReplicaResponse>> {
        let scope = ObservationScope::new("DELETE_REPLICAS");
        let deleted = match self.replicas.delete_replicas(filter).await {
            Ok(deleted) => deleted,
            Err(e) => {
                scope.fail(&e.to_string());
                return Err(e.into());
            }
        };
        scope.complete_with_count(deleted.len() as u64);

        Ok(deleted.iter().map(|r| self.to_response(r)).collect())
    }
}
