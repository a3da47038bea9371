//! Replica lifecycle: records, filters, visibility and the manager that
//! drives them against a store.

pub mod errors;
pub mod filter;
pub mod manager;
pub mod model;
pub mod range;
pub mod visibility;

pub use errors::{ReplicaError, ReplicaResult};
pub use filter::{BaseFilter, PrivateFilter, PublicFilter};
pub use manager::ReplicaManager;
pub use model::{
    File, Replica, ReplicaCreateBody, ReplicaMetadata, ReplicaResponse, ReplicaWithFiles,
};
pub use range::{build_range_filter, RangePredicate};
pub use visibility::Visibility;
