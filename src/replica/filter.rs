//! # Replica Filters
//!
//! - `BaseFilter`: exact match on replica type, geometry type and layer
//! - `PublicFilter`: base + optional time range + sort, always visible rows only
//! - `PrivateFilter`: any subset of fields plus `sync_id` / `is_hidden`, used by
//!   administrative updates and deletes. An absent field is unconstrained.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::range::{build_range_filter, RangePredicate};
use crate::store::predicate::{Column, FilterExpr, FilterSet};
use crate::types::{GeometryType, ReplicaType, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseFilter {
    pub replica_type: ReplicaType,
    pub geometry_type: GeometryType,
    pub layer_id: i32,
}

impl BaseFilter {
    pub fn new(replica_type: ReplicaType, geometry_type: GeometryType, layer_id: i32) -> Self {
        Self {
            replica_type,
            geometry_type,
            layer_id,
        }
    }

    fn exprs(&self) -> [FilterExpr; 3] {
        [
            FilterExpr::eq(Column::ReplicaType, self.replica_type),
            FilterExpr::eq(Column::GeometryType, self.geometry_type),
            FilterExpr::eq(Column::LayerId, self.layer_id),
        ]
    }
}

/// Equality on the three dimensions. Visibility is added by the caller.
impl From<&BaseFilter> for FilterSet {
    fn from(filter: &BaseFilter) -> Self {
        FilterSet::new().and_all(filter.exprs())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicFilter {
    pub base: BaseFilter,
    pub exclusive_from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub sort: SortOrder,
}

impl PublicFilter {
    pub fn with_range(
        mut self,
        exclusive_from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.exclusive_from = exclusive_from;
        self.to = to;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn timestamp_range(&self) -> Option<RangePredicate> {
        build_range_filter(self.exclusive_from, self.to)
    }
}

impl From<BaseFilter> for PublicFilter {
    fn from(base: BaseFilter) -> Self {
        Self {
            base,
            exclusive_from: None,
            to: None,
            sort: SortOrder::default(),
        }
    }
}

impl From<&PublicFilter> for FilterSet {
    fn from(filter: &PublicFilter) -> Self {
        let set = FilterSet::from(&filter.base).visible();
        match filter.timestamp_range() {
            Some(range) => set.and_all(range.to_exprs(Column::Timestamp)),
            None => set,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrivateFilter {
    pub replica_type: Option<ReplicaType>,
    pub geometry_type: Option<GeometryType>,
    pub layer_id: Option<i32>,
    pub sync_id: Option<Uuid>,
    pub is_hidden: Option<bool>,
    pub exclusive_from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl PrivateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replica_type(mut self, replica_type: ReplicaType) -> Self {
        self.replica_type = Some(replica_type);
        self
    }

    pub fn geometry_type(mut self, geometry_type: GeometryType) -> Self {
        self.geometry_type = Some(geometry_type);
        self
    }

    pub fn layer_id(mut self, layer_id: i32) -> Self {
        self.layer_id = Some(layer_id);
        self
    }

    pub fn sync_id(mut self, sync_id: Uuid) -> Self {
        self.sync_id = Some(sync_id);
        self
    }

    pub fn is_hidden(mut self, is_hidden: bool) -> Self {
        self.is_hidden = Some(is_hidden);
        self
    }

    pub fn range(
        mut self,
        exclusive_from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.exclusive_from = exclusive_from;
        self.to = to;
        self
    }

    pub fn timestamp_range(&self) -> Option<RangePredicate> {
        build_range_filter(self.exclusive_from, self.to)
    }

    /// True when no field constrains the match, i.e. every replica is targeted.
    pub fn is_unconstrained(&self) -> bool {
        FilterSet::from(self).is_empty()
    }
}

impl From<BaseFilter> for PrivateFilter {
    fn from(base: BaseFilter) -> Self {
        PrivateFilter::new()
            .replica_type(base.replica_type)
            .geometry_type(base.geometry_type)
            .layer_id(base.layer_id)
    }
}

impl From<&PrivateFilter> for FilterSet {
    fn from(filter: &PrivateFilter) -> Self {
        let mut set = FilterSet::new();
        if let Some(replica_type) = filter.replica_type {
            set = set.and(FilterExpr::eq(Column::ReplicaType, replica_type));
        }
        if let Some(geometry_type) = filter.geometry_type {
            set = set.and(FilterExpr::eq(Column::GeometryType, geometry_type));
        }
        if let Some(layer_id) = filter.layer_id {
            set = set.and(FilterExpr::eq(Column::LayerId, layer_id));
        }
        if let Some(sync_id) = filter.sync_id {
            set = set.and(FilterExpr::eq(Column::SyncId, sync_id));
        }
        if let Some(is_hidden) = filter.is_hidden {
            set = set.and(FilterExpr::eq(Column::IsHidden, is_hidden));
        }
        if let Some(range) = filter.timestamp_range() {
            set = set.and_all(range.to_exprs(Column::Timestamp));
        }
        set
    }
}
