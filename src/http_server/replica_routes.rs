//! Replica HTTP Routes
//!
//! Query strings are snake_case, JSON bodies camelCase.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, rejection::QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::errors::ApiResult;
use crate::replica::{
    BaseFilter, PrivateFilter, PublicFilter, ReplicaCreateBody, ReplicaManager, ReplicaMetadata,
    ReplicaResponse,
};
use crate::types::{GeometryType, ReplicaType, SortOrder};

// ==================
// Request Types
// ==================

/// `GET /replica/latest`
#[derive(Debug, Deserialize)]
pub struct BaseQuery {
    pub replica_type: ReplicaType,
    pub geometry_type: GeometryType,
    pub layer_id: i32,
}

impl From<BaseQuery> for BaseFilter {
    fn from(q: BaseQuery) -> Self {
        BaseFilter::new(q.replica_type, q.geometry_type, q.layer_id)
    }
}

/// `GET /replica`
#[derive(Debug, Deserialize)]
pub struct PublicQuery {
    pub replica_type: ReplicaType,
    pub geometry_type: GeometryType,
    pub layer_id: i32,
    #[serde(default)]
    pub exclusive_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sort: Option<SortOrder>,
}

impl From<PublicQuery> for PublicFilter {
    fn from(q: PublicQuery) -> Self {
        PublicFilter::from(BaseFilter::new(q.replica_type, q.geometry_type, q.layer_id))
            .with_range(q.exclusive_from, q.to)
            .with_sort(q.sort.unwrap_or_default())
    }
}

/// Administrative filter for `PATCH /replica` and `DELETE /replica`
#[derive(Debug, Default, Deserialize)]
pub struct PrivateQuery {
    #[serde(default)]
    pub replica_type: Option<ReplicaType>,
    #[serde(default)]
    pub geometry_type: Option<GeometryType>,
    #[serde(default)]
    pub layer_id: Option<i32>,
    #[serde(default)]
    pub sync_id: Option<Uuid>,
    #[serde(default)]
    pub is_hidden: Option<bool>,
    #[serde(default)]
    pub exclusive_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl From<PrivateQuery> for PrivateFilter {
    fn from(q: PrivateQuery) -> Self {
        PrivateFilter {
            replica_type: q.replica_type,
            geometry_type: q.geometry_type,
            layer_id: q.layer_id,
            sync_id: q.sync_id,
            is_hidden: q.is_hidden,
            exclusive_from: q.exclusive_from,
            to: q.to,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileBody {
    pub file_id: Uuid,
}

// ==================
// Replica Routes
// ==================

/// Create replica routes
pub fn replica_routes(manager: Arc<ReplicaManager>) -> Router {
    Router::new()
        .route(
            "/replica",
            get(get_replicas_handler)
                .post(create_replica_handler)
                .patch(update_replicas_handler)
                .delete(delete_replicas_handler),
        )
        .route("/replica/latest", get(get_latest_replica_handler))
        .route(
            "/replica/:replica_id",
            get(get_replica_handler)
                .patch(update_replica_handler)
                .delete(delete_replica_handler),
        )
        .route("/replica/:replica_id/file", post(create_file_handler))
        .with_state(manager)
}

// ==================
// Read Handlers
// ==================

async fn get_replicas_handler(
    State(manager): State<Arc<ReplicaManager>>,
    query: Result<Query<PublicQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ReplicaResponse>>> {
    let Query(query) = query?;
    let replicas = manager.get_replicas(&PublicFilter::from(query)).await?;
    Ok(Json(replicas))
}

async fn get_latest_replica_handler(
    State(manager): State<Arc<ReplicaManager>>,
    query: Result<Query<BaseQuery>, QueryRejection>,
) -> ApiResult<Json<ReplicaResponse>> {
    let Query(query) = query?;
    let replica = manager.get_latest_replica(&BaseFilter::from(query)).await?;
    Ok(Json(replica))
}

async fn get_replica_handler(
    State(manager): State<Arc<ReplicaManager>>,
    replica_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ReplicaResponse>> {
    let Path(replica_id) = replica_id?;
    Ok(Json(manager.get_replica_by_id(replica_id).await?))
}

// ==================
// Write Handlers
// ==================

async fn create_replica_handler(
    State(manager): State<Arc<ReplicaManager>>,
    body: Result<Json<ReplicaCreateBody>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(body) = body?;
    manager.create_replica(body).await?;
    Ok(StatusCode::CREATED)
}

async fn create_file_handler(
    State(manager): State<Arc<ReplicaManager>>,
    replica_id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<FileBody>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Path(replica_id) = replica_id?;
    let Json(body) = body?;
    manager.create_file_on_replica(replica_id, body.file_id).await?;
    Ok(StatusCode::CREATED)
}

async fn update_replica_handler(
    State(manager): State<Arc<ReplicaManager>>,
    replica_id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ReplicaMetadata>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Path(replica_id) = replica_id?;
    let Json(metadata) = body?;
    manager.update_replica(replica_id, metadata).await?;
    Ok(StatusCode::OK)
}

async fn update_replicas_handler(
    State(manager): State<Arc<ReplicaManager>>,
    query: Result<Query<PrivateQuery>, QueryRejection>,
    body: Result<Json<ReplicaMetadata>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Query(query) = query?;
    let Json(metadata) = body?;
    manager
        .update_replicas(&PrivateFilter::from(query), metadata)
        .await?;
    Ok(StatusCode::OK)
}

// ==================
// Delete Handlers
// ==================

async fn delete_replica_handler(
    State(manager): State<Arc<ReplicaManager>>,
    replica_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ReplicaResponse>> {
    let Path(replica_id) = replica_id?;
    Ok(Json(manager.delete_replica(replica_id).await?))
}

async fn delete_replicas_handler(
    State(manager): State<Arc<ReplicaManager>>,
    query: Result<Query<PrivateQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ReplicaResponse>>> {
    let Query(query) = query?;
    let deleted = manager.delete_replicas(&PrivateFilter::from(query)).await?;
    Ok(Json(deleted))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<T: serde::de::DeserializeOwned>(query: &str) -> T {
        let uri = format!("/replica?{}", query).parse().unwrap();
        Query::<T>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_public_query_defaults_to_desc() {
        let query: PublicQuery = parse("replica_type=snapshot&geometry_type=point&layer_id=3");
        let filter = PublicFilter::from(query);
        assert_eq!(filter.sort, SortOrder::Desc);
        assert_eq!(filter.base.layer_id, 3);
        assert!(filter.timestamp_range().is_none());
    }

    #[test]
    fn test_private_query_parses_every_field() {
        let query: PrivateQuery = parse(concat!(
            "layer_id=4&is_hidden=true&to=2023-01-01T00:00:00Z",
            "&sync_id=6f1c1e1a-3f55-4a37-9a3e-4e1b3b0a2d11",
        ));
        let filter = PrivateFilter::from(query);
        assert_eq!(filter.layer_id, Some(4));
        assert_eq!(filter.is_hidden, Some(true));
        assert!(filter.to.is_some());
        assert!(filter.sync_id.is_some());
        assert!(filter.replica_type.is_none());
    }

    #[test]
    fn test_empty_private_query_is_unconstrained() {
        let query: PrivateQuery = parse("");
        assert!(PrivateFilter::from(query).is_unconstrained());
    }

    #[test]
    fn test_file_body_is_camel_case() {
        let body: FileBody =
            serde_json::from_str(r#"{"fileId": "6f1c1e1a-3f55-4a37-9a3e-4e1b3b0a2d11"}"#).unwrap();
        assert_eq!(body.file_id.to_string(), "6f1c1e1a-3f55-4a37-9a3e-4e1b3b0a2d11");
    }
}
