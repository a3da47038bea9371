//! # Object Storage URLs
//!
//! Files are opaque ids; this module only knows how to address them.
//! A file lives at `{protocol}://{host}:{port}/{bucket}/{layerId}/{geometryType}/{fileId}`
//! where `{bucket}` becomes `{projectId}:{bucketName}` when a project id is configured.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::replica::model::ReplicaWithFiles;

/// Object storage section of the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

fn default_protocol() -> String {
    "http".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    9000
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            host: default_host(),
            port: default_port(),
            project_id: None,
        }
    }
}

impl ObjectStorageConfig {
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// `{protocol}://{host}:{port}`
    pub fn url_header(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    pub fn bucket_segment(&self, bucket_name: &str) -> String {
        match &self.project_id {
            Some(project_id) => format!("{}:{}", project_id, bucket_name),
            None => bucket_name.to_string(),
        }
    }

    /// One URL per file, in file order. No files means no URLs.
    pub fn urls_for(&self, replica: &ReplicaWithFiles) -> Vec<String> {
        let r = &replica.replica;
        let sub_paths = [
            self.bucket_segment(&r.bucket_name),
            r.layer_id.to_string(),
            r.geometry_type.to_string(),
        ];
        create_url_paths(&self.url_header(), &sub_paths, &replica.file_ids())
    }
}

/// Join `header`, every sub path and each file id into a URL per file id.
pub fn create_url_paths<S: AsRef<str>>(
    header: &str,
    sub_paths: &[S],
    file_ids: &[Uuid],
) -> Vec<String> {
    let prefix = sub_paths
        .iter()
        .fold(header.to_string(), |acc, part| format!("{}/{}", acc, part.as_ref()));
    file_ids
        .iter()
        .map(|file_id| format!("{}/{}", prefix, file_id))
        .collect()
}
