//! # Layer Model

use serde::{Deserialize, Serialize};

use crate::types::GeometryType;

/// A named geospatial dataset that replicas are taken of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub layer_id: i32,
    pub layer_name: String,
    pub geometry_types: Vec<GeometryType>,
}

impl Layer {
    pub fn new(
        layer_id: i32,
        layer_name: impl Into<String>,
        geometry_types: Vec<GeometryType>,
    ) -> Self {
        Self {
            layer_id,
            layer_name: layer_name.into(),
            geometry_types,
        }
    }

    pub fn supports(&self, geometry_type: GeometryType) -> bool {
        self.geometry_types.contains(&geometry_type)
    }
}
