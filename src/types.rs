//! # Shared Domain Enums
//!
//! Geometry and replica kinds shared by replicas, layers and the store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Geometry type of a layer or replica
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryType {
    Point,
    Linestring,
    Polygon,
}

impl GeometryType {
    pub const ALL: [GeometryType; 3] = [Self::Point, Self::Linestring, Self::Polygon];

    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryType::Point => "point",
            GeometryType::Linestring => "linestring",
            GeometryType::Polygon => "polygon",
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeometryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "point" => Ok(GeometryType::Point),
            "linestring" => Ok(GeometryType::Linestring),
            "polygon" => Ok(GeometryType::Polygon),
            other => Err(format!("unknown geometry type: {}", other)),
        }
    }
}

/// Whether a replica is a full snapshot or a delta on top of one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicaType {
    Delta,
    Snapshot,
}

impl ReplicaType {
    pub const ALL: [ReplicaType; 2] = [Self::Delta, Self::Snapshot];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicaType::Delta => "delta",
            ReplicaType::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for ReplicaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplicaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delta" => Ok(ReplicaType::Delta),
            "snapshot" => Ok(ReplicaType::Snapshot),
            other => Err(format!("unknown replica type: {}", other)),
        }
    }
}

/// Ordering of replicas by their business timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    /// Newest first
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}
