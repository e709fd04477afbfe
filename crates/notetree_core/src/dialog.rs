//! Dialog controllers gating every create, update and delete.
//!
//! # Responsibility
//! - Model the open/confirm/close protocol for one entity kind.
//! - Carry the editable form and the last failure while open.
//!
//! # Invariants
//! - At most one open dialog per controller; opening twice is rejected.
//! - Create dialogs have no target, update and delete dialogs always do.
//! - A recorded failure never changes the mode or target.

use crate::gateway::FailureReport;
use crate::model::collection::{
    NoteCollection, NoteCollectionDraft, NoteCollectionId, NoteCollectionPatch,
};
use crate::model::note::{Note, NoteDraft, NoteId, NotePatch};
use crate::model::EntityKind;
use crate::store::StoreError;
use log::debug;
use std::fmt::Display;

#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("{0} dialog is not open")]
    NotOpen(EntityKind),
    #[error("{0} dialog is already open")]
    AlreadyOpen(EntityKind),
    /// Another dialog is open and dialogs are exclusive.
    #[error("blocked by open {0} dialog")]
    Blocked(EntityKind),
    #[error("entity not found: {0}")]
    UnknownEntity(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DialogError {
    /// Diagnostics for gateway failures, if this is one.
    pub fn failure_report(&self) -> Option<FailureReport> {
        match self {
            Self::Store(err) => err.gateway_error().map(|err| err.report()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode {
    Create,
    Update,
    Delete,
}

impl DialogMode {
    /// Past-tense verb used in success messages.
    pub fn verb(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
        }
    }
}

/// What an open dialog will do on confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogIntent<Id> {
    Create,
    Update(Id),
    Delete(Id),
}

impl<Id> DialogIntent<Id> {
    pub fn mode(&self) -> DialogMode {
        match self {
            Self::Create => DialogMode::Create,
            Self::Update(_) => DialogMode::Update,
            Self::Delete(_) => DialogMode::Delete,
        }
    }

    pub fn target(&self) -> Option<&Id> {
        match self {
            Self::Create => None,
            Self::Update(id) | Self::Delete(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDialog<Id, F> {
    pub intent: DialogIntent<Id>,
    pub form: F,
    pub last_failure: Option<FailureReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogState<Id, F> {
    Closed,
    Open(OpenDialog<Id, F>),
}

/// Open/confirm/close state machine for one entity kind.
#[derive(Debug, Clone)]
pub struct DialogController<Id, F> {
    kind: EntityKind,
    state: DialogState<Id, F>,
}

pub type NoteDialog = DialogController<NoteId, NoteForm>;
pub type NoteCollectionDialog = DialogController<NoteCollectionId, NoteCollectionForm>;

impl<Id, F> DialogController<Id, F>
where
    Id: Clone + Display,
    F: Default,
{
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            state: DialogState::Closed,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn state(&self) -> &DialogState<Id, F> {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, DialogState::Open(_))
    }

    pub fn mode(&self) -> Option<DialogMode> {
        self.open_dialog().map(|open| open.intent.mode())
    }

    pub fn intent(&self) -> Option<&DialogIntent<Id>> {
        self.open_dialog().map(|open| &open.intent)
    }

    pub fn target(&self) -> Option<&Id> {
        self.open_dialog().and_then(|open| open.intent.target())
    }

    pub fn form(&self) -> Option<&F> {
        self.open_dialog().map(|open| &open.form)
    }

    pub fn form_mut(&mut self) -> Result<&mut F, DialogError> {
        match &mut self.state {
            DialogState::Open(open) => Ok(&mut open.form),
            DialogState::Closed => Err(DialogError::NotOpen(self.kind)),
        }
    }

    pub fn last_failure(&self) -> Option<&FailureReport> {
        self.open_dialog().and_then(|open| open.last_failure.as_ref())
    }

    pub fn open_create(&mut self, form: F) -> Result<(), DialogError> {
        self.open(DialogIntent::Create, form)
    }

    /// Opens in update mode with a form pre-filled from the target.
    pub fn open_update(&mut self, target: Id, form: F) -> Result<(), DialogError> {
        self.open(DialogIntent::Update(target), form)
    }

    pub fn open_delete(&mut self, target: Id) -> Result<(), DialogError> {
        self.open(DialogIntent::Delete(target), F::default())
    }

    /// Closes the dialog. Returns whether it was open.
    pub fn close(&mut self) -> bool {
        let was_open = self.is_open();
        if was_open {
            debug!("event=dialog_close module=dialog status=ok kind={}", self.kind);
        }
        self.state = DialogState::Closed;
        was_open
    }

    /// Keeps the dialog open and remembers why the last confirm failed.
    pub fn record_failure(&mut self, report: FailureReport) {
        if let DialogState::Open(open) = &mut self.state {
            debug!(
                "event=dialog_failure module=dialog status=error kind={} code={}",
                self.kind,
                report
                    .code
                    .map_or_else(|| "-".to_string(), |code| code.to_string())
            );
            open.last_failure = Some(report);
        }
    }

    pub fn clear_failure(&mut self) {
        if let DialogState::Open(open) = &mut self.state {
            open.last_failure = None;
        }
    }

    /// Turns an open create dialog into an update of the entity it created,
    /// keeping the form.
    pub fn retarget(&mut self, target: Id) -> Result<(), DialogError> {
        match &mut self.state {
            DialogState::Open(open) => {
                debug!(
                    "event=dialog_retarget module=dialog status=ok kind={} target={target}",
                    self.kind
                );
                open.intent = DialogIntent::Update(target);
                Ok(())
            }
            DialogState::Closed => Err(DialogError::NotOpen(self.kind)),
        }
    }

    fn open(&mut self, intent: DialogIntent<Id>, form: F) -> Result<(), DialogError> {
        if self.is_open() {
            return Err(DialogError::AlreadyOpen(self.kind));
        }
        debug!(
            "event=dialog_open module=dialog status=ok kind={} mode={:?}",
            self.kind,
            intent.mode()
        );
        self.state = DialogState::Open(OpenDialog {
            intent,
            form,
            last_failure: None,
        });
        Ok(())
    }

    fn open_dialog(&self) -> Option<&OpenDialog<Id, F>> {
        match &self.state {
            DialogState::Open(open) => Some(open),
            DialogState::Closed => None,
        }
    }
}

/// Editable fields of the note dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteForm {
    pub title: String,
    pub content: String,
    pub note_collection_id: Option<NoteCollectionId>,
}

impl NoteForm {
    pub fn from_note(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            note_collection_id: note.note_collection_id.clone(),
        }
    }

    pub fn to_draft(&self) -> NoteDraft {
        NoteDraft {
            title: self.title.clone(),
            content: self.content.clone(),
            note_collection_id: self.note_collection_id.clone(),
        }
    }

    /// Fields that differ from `current`.
    pub fn patch_against(&self, current: &Note) -> NotePatch {
        NotePatch {
            title: (self.title != current.title).then(|| self.title.clone()),
            content: (self.content != current.content).then(|| self.content.clone()),
            note_collection_id: (self.note_collection_id != current.note_collection_id)
                .then(|| self.note_collection_id.clone()),
        }
    }
}

/// Editable fields of the collection dialog, including its member selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteCollectionForm {
    pub title: String,
    pub note_ids: Vec<NoteId>,
}

impl NoteCollectionForm {
    pub fn from_collection<'a>(
        collection: &NoteCollection,
        members: impl IntoIterator<Item = &'a Note>,
    ) -> Self {
        Self {
            title: collection.title.clone(),
            note_ids: members.into_iter().map(|note| note.id.clone()).collect(),
        }
    }

    pub fn to_draft(&self) -> NoteCollectionDraft {
        NoteCollectionDraft::new(self.title.clone())
    }

    pub fn patch_against(&self, current: &NoteCollection) -> NoteCollectionPatch {
        NoteCollectionPatch {
            title: (self.title != current.title).then(|| self.title.clone()),
        }
    }

    /// Adds or removes one note from the selection.
    pub fn toggle_note(&mut self, id: &NoteId) {
        if let Some(index) = self.note_ids.iter().position(|selected| selected == id) {
            self.note_ids.remove(index);
        } else {
            self.note_ids.push(id.clone());
        }
    }

    /// Whether the selection differs from `members`, ignoring order.
    pub fn membership_differs<'a>(&self, members: impl IntoIterator<Item = &'a Note>) -> bool {
        let mut current: Vec<&NoteId> = members.into_iter().map(|note| &note.id).collect();
        let mut selected: Vec<&NoteId> = self.note_ids.iter().collect();
        current.sort();
        current.dedup();
        selected.sort();
        selected.dedup();
        current != selected
    }
}
