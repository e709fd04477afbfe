//! Note entity and mutation inputs.

use super::collection::NoteCollectionId;
use super::is_blank_title;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Opaque gateway-assigned note identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Canonical note record as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// `None` means the note is unfiled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_collection_id: Option<NoteCollectionId>,
}

impl Note {
    /// Returns whether this note is a member of `collection_id`.
    pub fn is_in(&self, collection_id: &NoteCollectionId) -> bool {
        self.note_collection_id.as_ref() == Some(collection_id)
    }

    pub fn is_unfiled(&self) -> bool {
        self.note_collection_id.is_none()
    }
}

/// Field set for creating one note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_collection_id: Option<NoteCollectionId>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            note_collection_id: None,
        }
    }

    pub fn in_collection(mut self, collection_id: NoteCollectionId) -> Self {
        self.note_collection_id = Some(collection_id);
        self
    }

    /// Empty titles make the create a no-op.
    pub fn is_actionable(&self) -> bool {
        !is_blank_title(&self.title)
    }
}

/// Changed fields for updating one note. `None` leaves a field untouched.
///
/// `note_collection_id: Some(None)` detaches the note from its collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_collection_id: Option<Option<NoteCollectionId>>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn move_to(collection_id: Option<NoteCollectionId>) -> Self {
        Self {
            note_collection_id: Some(collection_id),
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.note_collection_id.is_none()
    }

    /// A patch is a no-op when it changes nothing or blanks the title.
    pub fn is_actionable(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        !matches!(self.title.as_deref(), Some(title) if is_blank_title(title))
    }

    /// Applies this patch to a local copy. Used by gateways that persist
    /// full records.
    pub fn apply_to(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(content) = &self.content {
            note.content = content.clone();
        }
        if let Some(collection_id) = &self.note_collection_id {
            note.note_collection_id = collection_id.clone();
        }
    }
}
