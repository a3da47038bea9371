//! ObservationScope for automatic begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` with elapsed time on `complete()`
//! - Logs `{name}_ERROR` on drop if never completed
//!
//! Every line carries the scope name under `scope`.

use std::time::Instant;

/// A scope that automatically logs begin and complete events
///
/// # Usage
///
/// ```ignore
/// let scope = ObservationScope::new("DELETE_REPLICAS");
/// let deleted = store.delete_replicas(&filter).await?; // early return logs DELETE_REPLICAS_ERROR
/// scope.complete_with_count(deleted.len() as u64);
/// ```
pub struct ObservationScope {
    name: &'static str,
    started: Instant,
    completed: bool,
}

impl ObservationScope {
    /// Create a new observation scope. Logs `{name}_BEGIN` immediately.
    pub fn new(name: &'static str) -> Self {
        tracing::info!(event = %format!("{}_BEGIN", name), scope = name);
        Self {
            name,
            started: Instant::now(),
            completed: false,
        }
    }

    /// Mark the scope as successfully completed
    pub fn complete(mut self) {
        self.completed = true;
        tracing::info!(
            event = %format!("{}_COMPLETE", self.name),
            scope = self.name,
            elapsed_ms = self.elapsed_ms()
        );
    }

    /// Mark the scope as completed, recording how many rows it affected
    pub fn complete_with_count(mut self, count: u64) {
        self.completed = true;
        tracing::info!(
            event = %format!("{}_COMPLETE", self.name),
            scope = self.name,
            elapsed_ms = self.elapsed_ms(),
            count
        );
    }

    /// Mark the scope as failed with a reason
    pub fn fail(mut self, reason: &str) {
        self.completed = true;
        tracing::error!(
            event = %format!("{}_FAILED", self.name),
            scope = self.name,
            elapsed_ms = self.elapsed_ms(),
            reason
        );
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.completed {
            tracing::error!(
                event = %format!("{}_ERROR", self.name),
                scope = self.name,
                elapsed_ms = self.elapsed_ms(),
                "scope dropped without completion"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::test_support::capture_json;

    #[test]
    fn test_scope_creation() {
        let scope = ObservationScope::new("TEST");
        assert!(!scope.is_completed());
        scope.complete();
    }

    #[test]
    fn test_complete_with_count_is_a_numeric_field() {
        let lines =
            capture_json(|| ObservationScope::new("DELETE_REPLICAS").complete_with_count(2));

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["fields"]["event"], "DELETE_REPLICAS_BEGIN");
        assert_eq!(lines[1]["fields"]["event"], "DELETE_REPLICAS_COMPLETE");
        assert_eq!(lines[1]["fields"]["scope"], "DELETE_REPLICAS");
        assert_eq!(lines[1]["fields"]["count"], 2);
    }

    #[test]
    fn test_scope_fail() {
        let lines = capture_json(|| ObservationScope::new("TEST").fail("something went wrong"));
        assert_eq!(lines[1]["fields"]["event"], "TEST_FAILED");
        assert_eq!(lines[1]["fields"]["reason"], "something went wrong");
    }

    #[test]
    fn test_scope_drop_without_complete() {
        let lines = capture_json(|| drop(ObservationScope::new("TEST")));
        assert_eq!(lines.last().unwrap()["fields"]["event"], "TEST_ERROR");
    }
}
