//! # SQLite Store
//!
//! sqlx over SQLite. Uuids are stored as hyphenated TEXT, enums as their
//! lowercase names and every timestamp as INTEGER microseconds since the
//! epoch, so range comparisons happen on integers in the database.
//!
//! Deletes remove and return rows with `DELETE ... RETURNING` inside one
//! transaction, so the first statement already holds the write lock. A
//! transaction that is dropped without `commit` rolls back. File-backed
//! databases run in WAL mode.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::predicate::{Column, FieldValue, FilterExpr, FilterSet};
use super::{FileRepository, HealthCheck, LayerRepository, ReplicaRepository};
use crate::layer::model::Layer;
use crate::replica::filter::{BaseFilter, PrivateFilter, PublicFilter};
use crate::replica::model::{File, Replica, ReplicaMetadata, ReplicaWithFiles};
use crate::types::SortOrder;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS replica (
    replica_id    TEXT PRIMARY KEY NOT NULL,
    layer_id      INTEGER NOT NULL,
    geometry_type TEXT NOT NULL,
    replica_type  TEXT NOT NULL,
    is_hidden     INTEGER NOT NULL DEFAULT 1,
    bucket_name   TEXT NOT NULL,
    sync_id       TEXT,
    timestamp     INTEGER NOT NULL,
    created_at    INTEGER NOT NULL,
    updated_at    INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_replica_layer_id ON replica (layer_id);
CREATE INDEX IF NOT EXISTS idx_replica_bucket_name ON replica (bucket_name);
CREATE INDEX IF NOT EXISTS idx_replica_timestamp ON replica (timestamp);

CREATE TABLE IF NOT EXISTS file (
    file_id    TEXT PRIMARY KEY NOT NULL,
    replica_id TEXT NOT NULL REFERENCES replica (replica_id) ON DELETE CASCADE,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_file_replica_id ON file (replica_id);

CREATE TABLE IF NOT EXISTS layer (
    layer_id       INTEGER PRIMARY KEY NOT NULL,
    layer_name     TEXT NOT NULL,
    geometry_types TEXT NOT NULL
);
"#;

const REPLICA_TABLE: &str = "replica";

/// Database section of the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// sqlx connection url, e.g. `sqlite://replica.db` or `sqlite::memory:`
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a statement waits on a locked database before failing
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_url() -> String {
    "sqlite://replica.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// A private in-memory database
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            ..Default::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReplicaRow {
    replica_id: String,
    layer_id: i32,
    geometry_type: String,
    replica_type: String,
    is_hidden: bool,
    bucket_name: String,
    sync_id: Option<String>,
    timestamp: i64,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<ReplicaRow> for Replica {
    type Error = StoreError;

    fn try_from(row: ReplicaRow) -> StoreResult<Self> {
        Ok(Replica {
            replica_id: parse_uuid(&row.replica_id)?,
            layer_id: row.layer_id,
            geometry_type: row.geometry_type.parse().map_err(StoreError::Corrupt)?,
            replica_type: row.replica_type.parse().map_err(StoreError::Corrupt)?,
            is_hidden: row.is_hidden,
            bucket_name: row.bucket_name,
            sync_id: row.sync_id.as_deref().map(parse_uuid).transpose()?,
            timestamp: from_micros(row.timestamp)?,
            created_at: from_micros(row.created_at)?,
            updated_at: from_micros(row.updated_at)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FileRow {
    file_id: String,
    replica_id: String,
    created_at: i64,
}

impl TryFrom<FileRow> for File {
    type Error = StoreError;

    fn try_from(row: FileRow) -> StoreResult<Self> {
        Ok(File {
            file_id: parse_uuid(&row.file_id)?,
            replica_id: parse_uuid(&row.replica_id)?,
            created_at: from_micros(row.created_at)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LayerRow {
    layer_id: i32,
    layer_name: String,
    geometry_types: String,
}

impl TryFrom<LayerRow> for Layer {
    type Error = StoreError;

    fn try_from(row: LayerRow) -> StoreResult<Self> {
        let geometry_types = serde_json::from_str(&row.geometry_types).map_err(|e| {
            StoreError::Corrupt(format!("layer {} geometry_types: {}", row.layer_id, e))
        })?;
        Ok(Layer::new(row.layer_id, row.layer_name, geometry_types))
    }
}

fn parse_uuid(value: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| StoreError::Corrupt(format!("uuid {:?}: {}", value, e)))
}

fn from_micros(value: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(value)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {}", value)))
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &FieldValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        FieldValue::Uuid(v) => query.bind(v.to_string()),
        FieldValue::Integer(v) => query.bind(*v),
        FieldValue::Bool(v) => query.bind(*v),
        FieldValue::Text(v) => query.bind(v.clone()),
        FieldValue::Timestamp(v) => query.bind(v.timestamp_micros()),
    }
}

fn bind_value_as<'q, O>(
    query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    value: &FieldValue,
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    match value {
        FieldValue::Uuid(v) => query.bind(v.to_string()),
        FieldValue::Integer(v) => query.bind(*v),
        FieldValue::Bool(v) => query.bind(*v),
        FieldValue::Text(v) => query.bind(v.clone()),
        FieldValue::Timestamp(v) => query.bind(v.timestamp_micros()),
    }
}

async fn select_replicas(
    conn: &mut SqliteConnection,
    filters: &FilterSet,
    sort: SortOrder,
    limit: Option<u32>,
) -> StoreResult<Vec<Replica>> {
    let (clause, params) = filters.to_sql(REPLICA_TABLE);
    let mut sql = format!(
        "SELECT * FROM replica WHERE {} ORDER BY replica.timestamp {}",
        clause,
        sort.as_sql()
    );
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut query = sqlx::query_as::<_, ReplicaRow>(&sql);
    for value in params {
        query = bind_value_as(query, value);
    }

    query
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(Replica::try_from)
        .collect()
}

/// Files of every replica matching `filters`, keyed by replica in insertion order.
///
/// The filter is joined rather than expanded into an id list, so the number
/// of bound parameters does not grow with the number of matches.
async fn files_matching(
    conn: &mut SqliteConnection,
    filters: &FilterSet,
) -> StoreResult<HashMap<Uuid, Vec<File>>> {
    let (clause, params) = filters.to_sql(REPLICA_TABLE);
    let sql = format!(
        "SELECT file.file_id, file.replica_id, file.created_at FROM file
         JOIN replica ON replica.replica_id = file.replica_id
         WHERE {}
         ORDER BY file.created_at, file.rowid",
        clause
    );

    let mut query = sqlx::query_as::<_, FileRow>(&sql);
    for value in params {
        query = bind_value_as(query, value);
    }

    let mut by_replica: HashMap<Uuid, Vec<File>> = HashMap::new();
    for row in query.fetch_all(&mut *conn).await? {
        let file = File::try_from(row)?;
        by_replica.entry(file.replica_id).or_default().push(file);
    }
    Ok(by_replica)
}

fn attach_files(
    replicas: Vec<Replica>,
    mut files: HashMap<Uuid, Vec<File>>,
) -> Vec<ReplicaWithFiles> {
    replicas
        .into_iter()
        .map(|replica| {
            let files = files.remove(&replica.replica_id).unwrap_or_default();
            ReplicaWithFiles::new(replica, files)
        })
        .collect()
}

/// Delete every match and its files, answering with what was removed.
///
/// Both statements write, so the transaction takes the write lock on its
/// first statement and a concurrent writer waits on `busy_timeout` instead
/// of failing a lock upgrade.
async fn remove_matching(
    conn: &mut SqliteConnection,
    filters: &FilterSet,
) -> StoreResult<Vec<ReplicaWithFiles>> {
    let (clause, params) = filters.to_sql(REPLICA_TABLE);

    let sql = format!(
        "DELETE FROM file WHERE replica_id IN (SELECT replica_id FROM replica WHERE {})
         RETURNING file_id, replica_id, created_at",
        clause
    );
    let mut query = sqlx::query_as::<_, FileRow>(&sql);
    for value in &params {
        query = bind_value_as(query, value);
    }
    let mut removed_files = query
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(File::try_from)
        .collect::<StoreResult<Vec<File>>>()?;
    removed_files.sort_by_key(|f| f.created_at);

    let mut files: HashMap<Uuid, Vec<File>> = HashMap::new();
    for file in removed_files {
        files.entry(file.replica_id).or_default().push(file);
    }

    let sql = format!("DELETE FROM replica WHERE {} RETURNING *", clause);
    let mut query = sqlx::query_as::<_, ReplicaRow>(&sql);
    for value in &params {
        query = bind_value_as(query, value);
    }
    let mut replicas = query
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(Replica::try_from)
        .collect::<StoreResult<Vec<Replica>>>()?;
    replicas.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Ok(attach_files(replicas, files))
}

async fn update_matching(
    pool: &Pool<Sqlite>,
    filters: &FilterSet,
    metadata: &ReplicaMetadata,
) -> StoreResult<u64> {
    let assignments = metadata.assignments();
    let mut sets: Vec<String> = assignments
        .iter()
        .map(|(column, _)| format!("{} = ?", column.as_sql()))
        .collect();
    sets.push("updated_at = ?".to_string());

    let (clause, params) = filters.to_sql(REPLICA_TABLE);
    let sql = format!("UPDATE replica SET {} WHERE {}", sets.join(", "), clause);

    let mut query = sqlx::query(&sql);
    for (_, value) in &assignments {
        query = bind_value(query, value);
    }
    query = query.bind(Utc::now().timestamp_micros());
    for value in params {
        query = bind_value(query, value);
    }

    Ok(query.execute(pool).await?.rows_affected())
}

/// SQLite-backed store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open the pool and create the schema if it does not exist yet.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let mut opts = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms));
        if !config.is_in_memory() {
            // Readers keep going while a delete holds the write lock.
            opts = opts
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        // Every connection to `:memory:` is its own database, so pin one.
        let pool_opts = if config.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };
        let pool = pool_opts.connect_with(opts).await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::debug!(url = %config.url, "sqlite store ready");
        Ok(store)
    }

    /// Create tables and indexes. Safe to run repeatedly.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Insert or replace a layer definition
    pub async fn upsert_layer(&self, layer: &Layer) -> StoreResult<()> {
        let geometry_types = serde_json::to_string(&layer.geometry_types)
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        sqlx::query(
            "INSERT INTO layer (layer_id, layer_name, geometry_types) VALUES (?, ?, ?)
             ON CONFLICT (layer_id) DO UPDATE SET
                layer_name = excluded.layer_name,
                geometry_types = excluded.geometry_types",
        )
        .bind(layer.layer_id)
        .bind(&layer.layer_name)
        .bind(geometry_types)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Number of file rows owned by `replica_id`, regardless of visibility
    pub async fn file_count(&self, replica_id: Uuid) -> StoreResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM file WHERE replica_id = ?")
            .bind(replica_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl ReplicaRepository for SqliteStore {
    async fn find_one_replica(&self, replica_id: Uuid) -> StoreResult<Option<Replica>> {
        let row = sqlx::query_as::<_, ReplicaRow>("SELECT * FROM replica WHERE replica_id = ?")
            .bind(replica_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Replica::try_from).transpose()
    }

    async fn find_one_replica_with_files(
        &self,
        replica_id: Uuid,
    ) -> StoreResult<Option<ReplicaWithFiles>> {
        let mut conn = self.pool.acquire().await?;
        let filters = FilterSet::new()
            .and(FilterExpr::eq(Column::ReplicaId, replica_id))
            .visible();

        let replicas = select_replicas(&mut conn, &filters, SortOrder::Desc, Some(1)).await?;
        let files = files_matching(&mut conn, &filters).await?;
        Ok(attach_files(replicas, files).into_iter().next())
    }

    async fn find_replicas(&self, filter: &PublicFilter) -> StoreResult<Vec<ReplicaWithFiles>> {
        let mut conn = self.pool.acquire().await?;
        let filters = FilterSet::from(filter);
        let replicas = select_replicas(&mut conn, &filters, filter.sort, None).await?;
        let files = files_matching(&mut conn, &filters).await?;
        Ok(attach_files(replicas, files))
    }

    async fn find_latest_replica_with_files(
        &self,
        filter: &BaseFilter,
    ) -> StoreResult<Option<ReplicaWithFiles>> {
        let mut conn = self.pool.acquire().await?;
        let filters = FilterSet::from(filter).visible();
        let Some(latest) = select_replicas(&mut conn, &filters, SortOrder::Desc, Some(1))
            .await?
            .into_iter()
            .next()
        else {
            return Ok(None);
        };

        let by_id = FilterSet::new().and(FilterExpr::eq(Column::ReplicaId, latest.replica_id));
        let files = files_matching(&mut conn, &by_id).await?;
        Ok(attach_files(vec![latest], files).into_iter().next())
    }

    async fn create_replica(&self, replica: Replica) -> StoreResult<()> {
        let now = Utc::now().timestamp_micros();
        sqlx::query(
            "INSERT INTO replica
                (replica_id, layer_id, geometry_type, replica_type, is_hidden,
                 bucket_name, sync_id, timestamp, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(replica.replica_id.to_string())
        .bind(replica.layer_id)
        .bind(replica.geometry_type.as_str())
        .bind(replica.replica_type.as_str())
        .bind(true)
        .bind(&replica.bucket_name)
        .bind(replica.sync_id.map(|id| id.to_string()))
        .bind(replica.timestamp.timestamp_micros())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_one_replica(
        &self,
        replica_id: Uuid,
        metadata: &ReplicaMetadata,
    ) -> StoreResult<()> {
        let filters = FilterSet::new().and(FilterExpr::eq(Column::ReplicaId, replica_id));
        update_matching(&self.pool, &filters, metadata).await?;
        Ok(())
    }

    async fn update_replicas(
        &self,
        filter: &PrivateFilter,
        metadata: &ReplicaMetadata,
    ) -> StoreResult<u64> {
        update_matching(&self.pool, &FilterSet::from(filter), metadata).await
    }

    async fn delete_one_replica(&self, replica_id: Uuid) -> StoreResult<Option<ReplicaWithFiles>> {
        let filters = FilterSet::new().and(FilterExpr::eq(Column::ReplicaId, replica_id));

        let mut tx = self.pool.begin().await?;
        let deleted = remove_matching(&mut tx, &filters).await?;
        tx.commit().await?;
        Ok(deleted.into_iter().next())
    }

    async fn delete_replicas(&self, filter: &PrivateFilter) -> StoreResult<Vec<ReplicaWithFiles>> {
        let mut tx = self.pool.begin().await?;
        let deleted = remove_matching(&mut tx, &FilterSet::from(filter)).await?;
        tx.commit().await?;
        Ok(deleted)
    }
}

#[async_trait]
impl FileRepository for SqliteStore {
    async fn find_one_file(&self, file_id: Uuid) -> StoreResult<Option<File>> {
        let row = sqlx::query_as::<_, FileRow>(
            "SELECT file_id, replica_id, created_at FROM file WHERE file_id = ?",
        )
        .bind(file_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(File::try_from).transpose()
    }

    async fn create_file_on_replica(&self, replica_id: Uuid, file_id: Uuid) -> StoreResult<()> {
        sqlx::query("INSERT INTO file (file_id, replica_id, created_at) VALUES (?, ?, ?)")
            .bind(file_id.to_string())
            .bind(replica_id.to_string())
            .bind(Utc::now().timestamp_micros())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_files_of_replica(&self, replica_id: Uuid) -> StoreResult<Vec<File>> {
        sqlx::query_as::<_, FileRow>(
            r#"
            SELECT file_id, replica_id, created_at FROM file
            WHERE replica_id = ?
            ORDER BY created_at, rowid
            "#,
        )
        .bind(replica_id.to_string())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(File::try_from)
        .collect()
    }
}

#[async_trait]
impl LayerRepository for SqliteStore {
    async fn find_all_layers(&self) -> StoreResult<Vec<Layer>> {
        sqlx::query_as::<_, LayerRow>(
            "SELECT layer_id, layer_name, geometry_types FROM layer ORDER BY layer_id ASC",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Layer::try_from)
        .collect()
    }
}

#[async_trait]
impl HealthCheck for SqliteStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
