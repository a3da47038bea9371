//! # Filter Expression AST
//!
//! Typed predicates over replica columns. The memory backend evaluates them
//! against records, the SQLite backend renders them into a `WHERE` clause.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::replica::model::Replica;
use crate::types::{GeometryType, ReplicaType};

/// Filterable / assignable replica columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    ReplicaId,
    LayerId,
    GeometryType,
    ReplicaType,
    IsHidden,
    BucketName,
    SyncId,
    Timestamp,
}

impl Column {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Column::ReplicaId => "replica_id",
            Column::LayerId => "layer_id",
            Column::GeometryType => "geometry_type",
            Column::ReplicaType => "replica_type",
            Column::IsHidden => "is_hidden",
            Column::BucketName => "bucket_name",
            Column::SyncId => "sync_id",
            Column::Timestamp => "timestamp",
        }
    }

    /// Read the column off a record. `None` stands for SQL NULL.
    pub fn value_of(&self, replica: &Replica) -> Option<FieldValue> {
        let value = match self {
            Column::ReplicaId => FieldValue::from(replica.replica_id),
            Column::LayerId => FieldValue::from(replica.layer_id),
            Column::GeometryType => FieldValue::from(replica.geometry_type),
            Column::ReplicaType => FieldValue::from(replica.replica_type),
            Column::IsHidden => FieldValue::from(replica.is_hidden),
            Column::BucketName => FieldValue::from(replica.bucket_name.as_str()),
            Column::SyncId => FieldValue::from(replica.sync_id?),
            Column::Timestamp => FieldValue::from(replica.timestamp),
        };
        Some(value)
    }
}

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equals
    Eq,
    /// Greater than
    Gt,
    /// Less than or equal
    Lte,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Gt => "gt",
            FilterOperator::Lte => "lte",
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Gt => ">",
            FilterOperator::Lte => "<=",
        }
    }
}

/// A typed column value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Uuid(Uuid),
    Integer(i64),
    Bool(bool),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.partial_cmp(b),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.partial_cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.partial_cmp(b),
            (FieldValue::Uuid(a), FieldValue::Uuid(b)) => a.partial_cmp(b),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl From<GeometryType> for FieldValue {
    fn from(value: GeometryType) -> Self {
        FieldValue::Text(value.as_str().to_string())
    }
}

impl From<ReplicaType> for FieldValue {
    fn from(value: ReplicaType) -> Self {
        FieldValue::Text(value.as_str().to_string())
    }
}

/// A filter expression
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr {
    pub column: Column,
    pub operator: FilterOperator,
    pub value: FieldValue,
}

impl FilterExpr {
    pub fn new(column: Column, operator: FilterOperator, value: FieldValue) -> Self {
        Self {
            column,
            operator,
            value,
        }
    }

    /// Create an equality filter
    pub fn eq(column: Column, value: impl Into<FieldValue>) -> Self {
        Self::new(column, FilterOperator::Eq, value.into())
    }

    /// Create a greater than filter
    pub fn gt(column: Column, value: impl Into<FieldValue>) -> Self {
        Self::new(column, FilterOperator::Gt, value.into())
    }

    /// Create a less than or equal filter
    pub fn lte(column: Column, value: impl Into<FieldValue>) -> Self {
        Self::new(column, FilterOperator::Lte, value.into())
    }

    /// Check if a record matches this filter. NULL never matches.
    pub fn matches(&self, replica: &Replica) -> bool {
        let field_value = match self.column.value_of(replica) {
            Some(v) => v,
            None => return false,
        };

        match self.operator {
            FilterOperator::Eq => field_value == self.value,
            FilterOperator::Gt => field_value.compare(&self.value) == Some(Ordering::Greater),
            FilterOperator::Lte => matches!(
                field_value.compare(&self.value),
                Some(Ordering::Less) | Some(Ordering::Equal)
            ),
        }
    }
}

/// A set of filters combined with AND logic
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    pub filters: Vec<FilterExpr>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, filter: FilterExpr) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn and_all(mut self, filters: impl IntoIterator<Item = FilterExpr>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Only rows with `is_hidden = false`
    pub fn visible(self) -> Self {
        self.and(FilterExpr::eq(Column::IsHidden, false))
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Check if a record matches all filters
    pub fn matches(&self, replica: &Replica) -> bool {
        self.filters.iter().all(|f| f.matches(replica))
    }

    /// Render as a SQL condition with `?` placeholders, prefixing every
    /// column with `alias`. An empty set renders as an always-true condition.
    pub fn to_sql(&self, alias: &str) -> (String, Vec<&FieldValue>) {
        if self.filters.is_empty() {
            return ("1 = 1".to_string(), Vec::new());
        }

        let clause = self
            .filters
            .iter()
            .map(|f| format!("{}.{} {} ?", alias, f.column.as_sql(), f.operator.as_sql()))
            .collect::<Vec<_>>()
            .join(" AND ");
        let params = self.filters.iter().map(|f| &f.value).collect();

        (clause, params)
    }
}
