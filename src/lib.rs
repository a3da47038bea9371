//! replica-server - Query and mutation engine for geospatial layer replicas
//!
//! A replica is a timestamped, hidden-until-published package of files
//! describing one layer in one geometry encoding. Readers only ever see
//! published replicas; administrators manage the full set.

pub mod cli;
pub mod http_server;
pub mod layer;
pub mod object_storage;
pub mod observability;
pub mod replica;
pub mod store;
pub mod types;
