//! # Replica Model
//!
//! Records, request bodies and the read response shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{ReplicaError, ReplicaResult};
use crate::store::predicate::{Column, FieldValue};
use crate::types::{GeometryType, ReplicaType};

pub const BUCKET_NAME_MIN_LENGTH_LIMIT: usize = 3;

pub const BUCKET_NAME_MAX_LENGTH_LIMIT: usize = 63;

/// A tracked snapshot or delta of a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Replica {
    pub replica_id: Uuid,
    pub layer_id: i32,
    pub geometry_type: GeometryType,
    pub replica_type: ReplicaType,
    pub is_hidden: bool,
    pub bucket_name: String,
    #[serde(default)]
    pub sync_id: Option<Uuid>,
    /// Business clock of the replica, unrelated to the audit columns
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An opaque object-storage artifact owned by a replica
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub file_id: Uuid,
    pub replica_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A replica together with every file it owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaWithFiles {
    #[serde(flatten)]
    pub replica: Replica,
    pub files: Vec<File>,
}

impl ReplicaWithFiles {
    pub fn new(replica: Replica, files: Vec<File>) -> Self {
        Self { replica, files }
    }

    pub fn file_ids(&self) -> Vec<Uuid> {
        self.files.iter().map(|f| f.file_id).collect()
    }
}

/// Body accepted when registering a replica. Visibility is not part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaCreateBody {
    pub replica_id: Uuid,
    pub layer_id: i32,
    pub geometry_type: GeometryType,
    pub replica_type: ReplicaType,
    pub bucket_name: String,
    #[serde(default)]
    pub sync_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

impl ReplicaCreateBody {
    pub fn validate(&self) -> ReplicaResult<()> {
        validate_bucket_name(&self.bucket_name)
    }

    /// Build the hidden record that gets persisted.
    pub fn into_replica(self, now: DateTime<Utc>) -> Replica {
        Replica {
            replica_id: self.replica_id,
            layer_id: self.layer_id,
            geometry_type: self.geometry_type,
            replica_type: self.replica_type,
            is_hidden: true,
            bucket_name: self.bucket_name,
            sync_id: self.sync_id,
            timestamp: self.timestamp,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of any replica field except its id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReplicaMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<GeometryType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_type: Option<ReplicaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ReplicaMetadata {
    /// Metadata that only flips visibility
    pub fn visibility(is_hidden: bool) -> Self {
        Self {
            is_hidden: Some(is_hidden),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }

    pub fn validate(&self) -> ReplicaResult<()> {
        match &self.bucket_name {
            Some(name) => validate_bucket_name(name),
            None => Ok(()),
        }
    }

    /// Column assignments for the fields that are present, in a stable order.
    pub fn assignments(&self) -> Vec<(Column, FieldValue)> {
        let mut out = Vec::new();
        if let Some(layer_id) = self.layer_id {
            out.push((Column::LayerId, FieldValue::from(layer_id)));
        }
        if let Some(geometry_type) = self.geometry_type {
            out.push((Column::GeometryType, FieldValue::from(geometry_type)));
        }
        if let Some(replica_type) = self.replica_type {
            out.push((Column::ReplicaType, FieldValue::from(replica_type)));
        }
        if let Some(is_hidden) = self.is_hidden {
            out.push((Column::IsHidden, FieldValue::from(is_hidden)));
        }
        if let Some(bucket_name) = &self.bucket_name {
            out.push((Column::BucketName, FieldValue::from(bucket_name.as_str())));
        }
        if let Some(sync_id) = self.sync_id {
            out.push((Column::SyncId, FieldValue::from(sync_id)));
        }
        if let Some(timestamp) = self.timestamp {
            out.push((Column::Timestamp, FieldValue::from(timestamp)));
        }
        out
    }

    /// Apply the present fields to an in-memory record.
    pub fn apply_to(&self, replica: &mut Replica, now: DateTime<Utc>) {
        if let Some(layer_id) = self.layer_id {
            replica.layer_id = layer_id;
        }
        if let Some(geometry_type) = self.geometry_type {
            replica.geometry_type = geometry_type;
        }
        if let Some(replica_type) = self.replica_type {
            replica.replica_type = replica_type;
        }
        if let Some(is_hidden) = self.is_hidden {
            replica.is_hidden = is_hidden;
        }
        if let Some(bucket_name) = &self.bucket_name {
            replica.bucket_name = bucket_name.clone();
        }
        if let Some(sync_id) = self.sync_id {
            replica.sync_id = Some(sync_id);
        }
        if let Some(timestamp) = self.timestamp {
            replica.timestamp = timestamp;
        }
        replica.updated_at = now;
    }
}

/// What a reader gets back for a visible replica
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaResponse {
    pub replica_type: ReplicaType,
    pub layer_id: i32,
    pub geometry_type: GeometryType,
    pub timestamp: DateTime<Utc>,
    pub urls: Vec<String>,
}

impl ReplicaResponse {
    pub fn new(replica: &Replica, urls: Vec<String>) -> Self {
        Self {
            replica_type: replica.replica_type,
            layer_id: replica.layer_id,
            geometry_type: replica.geometry_type,
            timestamp: replica.timestamp,
            urls,
        }
    }
}

pub fn validate_bucket_name(name: &str) -> ReplicaResult<()> {
    let len = name.chars().count();
    if !(BUCKET_NAME_MIN_LENGTH_LIMIT..=BUCKET_NAME_MAX_LENGTH_LIMIT).contains(&len) {
        return Err(ReplicaError::Validation(format!(
            "bucketName must be between {} and {} characters long, got {}",
            BUCKET_NAME_MIN_LENGTH_LIMIT, BUCKET_NAME_MAX_LENGTH_LIMIT, len
        )));
    }
    Ok(())
}
