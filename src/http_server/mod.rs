//! # HTTP Server Module
//!
//! axum server exposing the replica lifecycle.
//!
//! # Endpoints
//!
//! - `/replica` - Replica reads, registration, bulk update and delete
//! - `/replica/latest` - Newest visible replica
//! - `/replica/:replica_id` - Single replica read, update, delete
//! - `/replica/:replica_id/file` - Attach a file
//! - `/layer` - Layer listing
//! - `/liveness`, `/readiness` - Store reachability check

pub mod config;
pub mod errors;
pub mod health_routes;
pub mod layer_routes;
pub mod replica_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use server::HttpServer;
