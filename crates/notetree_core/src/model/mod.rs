//! Client-side domain model for notes and note collections.
//!
//! # Responsibility
//! - Define the entity shapes exchanged with the gateway.
//! - Define the minimal field sets used by create/update mutations.
//!
//! # Invariants
//! - Ids are opaque and assigned by the gateway; the client never mints one.
//! - A note references at most one collection (`note_collection_id`).
//! - Collection membership is never stored on the collection itself; it is
//!   projected from the note set (see `crate::projection`).

pub mod collection;
pub mod note;

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The two mutable resource types managed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Note,
    NoteCollection,
}

impl EntityKind {
    /// Stable label used in log events and user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Note => "Note",
            Self::NoteCollection => "NoteCollection",
        }
    }

    /// REST-style collection segment used for request diagnostics.
    pub fn resource_path(self) -> &'static str {
        match self {
            Self::Note => "notes",
            Self::NoteCollection => "note-collections",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Returns whether a required title counts as empty input.
///
/// Whitespace-only titles are treated as empty.
pub fn is_blank_title(title: &str) -> bool {
    title.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::{is_blank_title, EntityKind};

    #[test]
    fn blank_title_includes_whitespace_only() {
        assert!(is_blank_title(""));
        assert!(is_blank_title("  \t\n"));
        assert!(!is_blank_title(" a "));
    }

    #[test]
    fn kind_labels_match_user_facing_names() {
        assert_eq!(EntityKind::Note.to_string(), "Note");
        assert_eq!(EntityKind::NoteCollection.resource_path(), "note-collections");
    }
}
