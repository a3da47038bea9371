//! Observable events of the replica service
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events
///
/// These cover:
/// - Boot & lifecycle
/// - Replica writes
/// - Visibility transitions
/// - Store health
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Boot & Lifecycle
    /// Startup begins
    BootStart,
    /// Startup complete, ready to serve
    BootComplete,
    /// Shutdown initiated
    ShutdownStart,
    /// Shutdown complete
    ShutdownComplete,
    /// Server bound and accepting requests
    Serving,

    // Configuration
    /// Configuration loaded
    ConfigLoaded,
    /// Default configuration written
    ConfigWritten,

    // Store
    /// Store connected and schema in place
    StoreConnected,
    /// A health check could not reach the store
    StoreUnreachable,

    // Replica writes
    /// Replica registered (hidden)
    ReplicaCreated,
    /// File attached to a replica
    FileCreated,
    /// Single replica updated
    ReplicaUpdated,
    /// Single replica deleted
    ReplicaDeleted,

    // Visibility
    /// Replica became visible to readers
    ReplicaPublished,
    /// Replica hidden from readers
    ReplicaHidden,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            // Boot & Lifecycle
            Event::BootStart => "REPLICA_SERVER_STARTUP_BEGIN",
            Event::BootComplete => "REPLICA_SERVER_STARTUP_COMPLETE",
            Event::ShutdownStart => "SHUTDOWN_START",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",
            Event::Serving => "REPLICA_SERVER_SERVING",

            // Configuration
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ConfigWritten => "CONFIG_WRITTEN",

            // Store
            Event::StoreConnected => "STORE_CONNECTED",
            Event::StoreUnreachable => "STORE_UNREACHABLE",

            // Replica writes
            Event::ReplicaCreated => "REPLICA_CREATED",
            Event::FileCreated => "FILE_CREATED",
            Event::ReplicaUpdated => "REPLICA_UPDATED",
            Event::ReplicaDeleted => "REPLICA_DELETED",

            // Visibility
            Event::ReplicaPublished => "REPLICA_PUBLISHED",
            Event::ReplicaHidden => "REPLICA_HIDDEN",
        }
    }

    /// Returns true if this event should be logged as a warning
    pub fn is_warning(&self) -> bool {
        matches!(self, Event::StoreUnreachable)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::BootStart,
            Event::BootComplete,
            Event::ShutdownStart,
            Event::ShutdownComplete,
            Event::Serving,
            Event::ConfigLoaded,
            Event::ConfigWritten,
            Event::StoreConnected,
            Event::StoreUnreachable,
            Event::ReplicaCreated,
            Event::FileCreated,
            Event::ReplicaUpdated,
            Event::ReplicaDeleted,
            Event::ReplicaPublished,
            Event::ReplicaHidden,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_warning_events() {
        assert!(Event::StoreUnreachable.is_warning());
        assert!(!Event::ReplicaCreated.is_warning());
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::BootStart), "REPLICA_SERVER_STARTUP_BEGIN");
        assert_eq!(format!("{}", Event::ReplicaPublished), "REPLICA_PUBLISHED");
    }
}
