//! Read-only view over the layers replicas are taken of.

pub mod manager;
pub mod model;

pub use manager::LayerManager;
pub use model::Layer;
