//! # Replica Visibility
//!
//! A replica starts `Hidden`, becomes `Visible` only through an update that
//! sets `is_hidden = false`, and can be hidden again the same way. Deletion
//! is terminal and is represented by the row being gone.

use super::model::{Replica, ReplicaMetadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    Visible,
}

impl Visibility {
    pub fn from_is_hidden(is_hidden: bool) -> Self {
        if is_hidden {
            Visibility::Hidden
        } else {
            Visibility::Visible
        }
    }

    pub fn of(replica: &Replica) -> Self {
        Self::from_is_hidden(replica.is_hidden)
    }

    /// State after applying `metadata`. Untouched when it does not set `is_hidden`.
    pub fn after(self, metadata: &ReplicaMetadata) -> Self {
        metadata.is_hidden.map(Self::from_is_hidden).unwrap_or(self)
    }

    /// Public read paths only ever see visible replicas
    pub fn is_readable(self) -> bool {
        self == Visibility::Visible
    }
}
