//! # Timestamp Range Predicate
//!
//! The lower bound is exclusive and the upper bound inclusive. Callers walk
//! non-overlapping windows of replicas by feeding the last `to` back in as
//! the next `exclusive_from`, so a replica sitting exactly on a boundary is
//! selected by exactly one window.

use chrono::{DateTime, Utc};

use crate::store::predicate::{Column, FilterExpr, FieldValue};

/// A constraint on a timestamp column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePredicate {
    /// `value > from`
    After(DateTime<Utc>),
    /// `value <= to`
    UpTo(DateTime<Utc>),
    /// `from < value <= to`
    Between {
        exclusive_from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

/// Build the predicate for an optional `(exclusive_from, to)` pair.
///
/// Returns `None` when both bounds are absent, leaving the field unconstrained.
pub fn build_range_filter(
    exclusive_from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Option<RangePredicate> {
    match (exclusive_from, to) {
        (Some(exclusive_from), Some(to)) => Some(RangePredicate::Between { exclusive_from, to }),
        (Some(from), None) => Some(RangePredicate::After(from)),
        (None, Some(to)) => Some(RangePredicate::UpTo(to)),
        (None, None) => None,
    }
}

impl RangePredicate {
    pub fn matches(&self, value: &DateTime<Utc>) -> bool {
        match self {
            RangePredicate::After(from) => value > from,
            RangePredicate::UpTo(to) => value <= to,
            RangePredicate::Between { exclusive_from, to } => value > exclusive_from && value <= to,
        }
    }

    /// Lower the predicate onto `column` as AND-ed expressions.
    pub fn to_exprs(&self, column: Column) -> Vec<FilterExpr> {
        match *self {
            RangePredicate::After(from) => vec![FilterExpr::gt(column, FieldValue::from(from))],
            RangePredicate::UpTo(to) => vec![FilterExpr::lte(column, FieldValue::from(to))],
            RangePredicate::Between { exclusive_from, to } => vec![
                FilterExpr::gt(column, FieldValue::from(exclusive_from)),
                FilterExpr::lte(column, FieldValue::from(to)),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 3, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_no_bounds_is_unconstrained() {
        assert_eq!(build_range_filter(None, None), None);
    }

    #[test]
    fn test_from_only_is_exclusive() {
        let range = build_range_filter(Some(at(10)), None).unwrap();
        assert!(!range.matches(&at(10)));
        assert!(range.matches(&at(11)));
        assert!(!range.matches(&at(9)));
    }

    #[test]
    fn test_to_only_is_inclusive() {
        let range = build_range_filter(None, Some(at(10))).unwrap();
        assert!(range.matches(&at(10)));
        assert!(range.matches(&at(1)));
        assert!(!range.matches(&at(11)));
    }

    #[test]
    fn test_both_bounds() {
        let range = build_range_filter(Some(at(5)), Some(at(10))).unwrap();
        assert!(!range.matches(&at(5)));
        assert!(range.matches(&at(6)));
        assert!(range.matches(&at(10)));
        assert!(!range.matches(&at(11)));
    }

    #[test]
    fn test_inverted_bounds_match_nothing() {
        let range = build_range_filter(Some(at(20)), Some(at(10))).unwrap();
        for day in 1..=28 {
            assert!(!range.matches(&at(day)));
        }
    }

    #[test]
    fn test_chained_windows_do_not_overlap() {
        let boundaries = [at(1), at(5), at(9), at(13)];
        let samples: Vec<_> = (1..=13).map(at).collect();

        for sample in &samples[1..] {
            let hits = boundaries
                .windows(2)
                .filter(|w| build_range_filter(Some(w[0]), Some(w[1])).unwrap().matches(sample))
                .count();
            assert_eq!(hits, 1, "sample {} matched {} windows", sample, hits);
        }
    }

    #[test]
    fn test_to_exprs_shapes() {
        assert_eq!(RangePredicate::After(at(1)).to_exprs(Column::Timestamp).len(), 1);
        assert_eq!(RangePredicate::UpTo(at(1)).to_exprs(Column::Timestamp).len(), 1);
        let both = RangePredicate::Between {
            exclusive_from: at(1),
            to: at(2),
        }
        .to_exprs(Column::Timestamp);
        assert_eq!(both.len(), 2);
    }
}
