//! Note collection entity and mutation inputs.

use super::is_blank_title;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Opaque gateway-assigned collection identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteCollectionId(String);

impl NoteCollectionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for NoteCollectionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteCollectionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Canonical collection record.
///
/// Gateways may send an embedded `notes` array; it is ignored on decode.
/// Members are always projected from the note set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteCollection {
    pub id: NoteCollectionId,
    pub title: String,
}

/// Field set for creating one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteCollectionDraft {
    pub title: String,
}

impl NoteCollectionDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    pub fn is_actionable(&self) -> bool {
        !is_blank_title(&self.title)
    }
}

/// Changed fields for updating one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteCollectionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl NoteCollectionPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
        }
    }

    pub fn is_actionable(&self) -> bool {
        matches!(self.title.as_deref(), Some(title) if !is_blank_title(title))
    }

    pub fn apply_to(&self, collection: &mut NoteCollection) {
        if let Some(title) = &self.title {
            collection.title = title.clone();
        }
    }
}
