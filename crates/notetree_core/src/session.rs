//! View-layer interface: one owned aggregate of store, dialogs, notification
//! channel and tree tracker.
//!
//! # Responsibility
//! - Expose read accessors for everything the view renders.
//! - Expose one action per dialog and tree transition.
//! - Turn confirmed mutations into notifications and dialog transitions.
//!
//! # Invariants
//! - A successful confirm posts exactly one success message and closes the
//!   dialog.
//! - A failed confirm leaves the dialog open in the same mode with the failure
//!   report attached.
//! - A skipped confirm changes nothing.
//! - Deleting a collection removes it from the expansion tracker.

use crate::config::ClientConfig;
use crate::dialog::{
    DialogController, DialogError, DialogIntent, DialogMode, NoteCollectionDialog,
    NoteCollectionForm, NoteDialog, NoteForm,
};
use crate::gateway::{FailureReport, Gateway};
use crate::model::collection::{NoteCollection, NoteCollectionId};
use crate::model::note::{Note, NoteId};
use crate::model::EntityKind;
use crate::notification::{Notification, NotificationChannel};
use crate::projection;
use crate::store::{EntityStore, MutationOutcome, StoreResult};
use crate::tree::{build_tree, BulkToggle, TreeExpansionTracker, TreeRow};
use log::{info, warn};
use std::fmt::Display;
use tokio::sync::watch;

pub type DialogResult<T> = Result<T, DialogError>;

/// Result of a backend reachability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Unreachable(FailureReport),
}

/// Text posted after a confirmed mutation.
pub fn success_message(kind: EntityKind, mode: DialogMode) -> String {
    format!("{} {} successfully!", kind.label(), mode.verb())
}

/// Client session over one gateway.
pub struct Session<G: Gateway> {
    gateway: G,
    config: ClientConfig,
    store: EntityStore,
    note_dialog: NoteDialog,
    collection_dialog: NoteCollectionDialog,
    notification: NotificationChannel,
    tracker: TreeExpansionTracker,
}

impl<G: Gateway> Session<G> {
    pub fn new(gateway: G, config: ClientConfig) -> Self {
        let notification = NotificationChannel::new(config.notification.expiry());
        Self {
            gateway,
            config,
            store: EntityStore::new(),
            note_dialog: NoteDialog::new(EntityKind::Note),
            collection_dialog: NoteCollectionDialog::new(EntityKind::NoteCollection),
            notification,
            tracker: TreeExpansionTracker::new(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    // Read accessors.

    pub fn notes(&self) -> &[Note] {
        self.store.notes()
    }

    pub fn note_collections(&self) -> &[NoteCollection] {
        self.store.note_collections()
    }

    pub fn notes_of<'a>(&'a self, id: &'a NoteCollectionId) -> Vec<&'a Note> {
        self.store.notes_in(id).collect()
    }

    pub fn unfiled_notes(&self) -> Vec<&Note> {
        projection::unfiled_notes(self.store.notes()).collect()
    }

    pub fn collection_summary(&self, id: &NoteCollectionId) -> String {
        projection::collection_summary(self.store.notes(), id)
    }

    /// Blank-state check for the view.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn tree(&self) -> Vec<TreeRow<'_>> {
        build_tree(self.store.notes(), self.store.note_collections(), &self.tracker)
    }

    pub fn tracker(&self) -> &TreeExpansionTracker {
        &self.tracker
    }

    pub fn bulk_toggle(&self) -> BulkToggle {
        self.tracker.bulk_toggle()
    }

    pub fn note_dialog(&self) -> &NoteDialog {
        &self.note_dialog
    }

    pub fn note_collection_dialog(&self) -> &NoteCollectionDialog {
        &self.collection_dialog
    }

    pub fn notification(&self) -> Notification {
        self.notification.current()
    }

    pub fn subscribe_notifications(&self) -> watch::Receiver<Notification> {
        self.notification.subscribe()
    }

    pub fn is_mutating(&self, kind: EntityKind) -> bool {
        self.store.in_flight(kind) > 0
    }

    // Lifecycle.

    /// Reloads both sets and prunes expansion state to surviving collections.
    pub async fn refresh(&mut self) -> StoreResult<MutationOutcome<()>> {
        let outcome = self.store.refresh(&self.gateway).await?;
        if matches!(outcome, MutationOutcome::Applied(())) {
            let store = &self.store;
            self.tracker.retain(|id| store.note_collection(id).is_some());
        }
        Ok(outcome)
    }

    pub async fn check_connection(&self) -> ConnectionStatus {
        match self.gateway.health().await {
            Ok(()) => ConnectionStatus::Connected,
            Err(err) => {
                warn!(
                    "event=connection_check module=session status=error code={}",
                    err.status.map_or_else(|| "-".to_string(), |code| code.to_string())
                );
                ConnectionStatus::Unreachable(err.report())
            }
        }
    }

    /// Detaches the view: later responses are discarded, dialogs close and the
    /// notification is hidden.
    pub fn teardown(&mut self) {
        self.store.invalidate_in_flight();
        self.note_dialog.close();
        self.collection_dialog.close();
        self.notification.dismiss();
        info!("event=session_teardown module=session status=ok");
    }

    // Tree actions.

    pub fn toggle_collection(&mut self, id: &NoteCollectionId) -> bool {
        self.tracker.toggle(id)
    }

    pub fn set_collection_expanded(&mut self, id: &NoteCollectionId, expanded: bool) {
        self.tracker.set_expanded(id, expanded);
    }

    pub fn expand_all(&mut self) {
        let ids = self.store.note_collections().iter().map(|c| &c.id);
        self.tracker.expand_all(ids);
    }

    pub fn collapse_all(&mut self) {
        self.tracker.collapse_all();
    }

    /// Runs whatever the bulk control currently offers.
    pub fn toggle_all(&mut self) -> BulkToggle {
        let ids = self.store.note_collections().iter().map(|c| &c.id);
        self.tracker.apply_bulk_toggle(ids)
    }

    // Note dialog actions.

    pub fn open_create_note(&mut self) -> DialogResult<()> {
        self.gate(EntityKind::Note)?;
        self.note_dialog.open_create(NoteForm::default())
    }

    pub fn open_update_note(&mut self, id: &NoteId) -> DialogResult<()> {
        self.gate(EntityKind::Note)?;
        let note = self
            .store
            .note(id)
            .ok_or_else(|| DialogError::UnknownEntity(id.to_string()))?;
        let form = NoteForm::from_note(note);
        self.note_dialog.open_update(id.clone(), form)
    }

    pub fn open_delete_note(&mut self, id: &NoteId) -> DialogResult<()> {
        self.gate(EntityKind::Note)?;
        if self.store.note(id).is_none() {
            return Err(DialogError::UnknownEntity(id.to_string()));
        }
        self.note_dialog.open_delete(id.clone())
    }

    pub fn note_form_mut(&mut self) -> DialogResult<&mut NoteForm> {
        self.note_dialog.form_mut()
    }

    pub fn cancel_note_dialog(&mut self) -> bool {
        self.note_dialog.close()
    }

    /// Runs the open note dialog's mutation.
    pub async fn confirm_note_dialog(&mut self) -> DialogResult<MutationOutcome<DialogMode>> {
        let (intent, form) = match (self.note_dialog.intent(), self.note_dialog.form()) {
            (Some(intent), Some(form)) => (intent.clone(), form.clone()),
            _ => return Err(DialogError::NotOpen(EntityKind::Note)),
        };
        let mode = intent.mode();

        let result = match &intent {
            DialogIntent::Create => self
                .store
                .create_note(&self.gateway, &form.to_draft())
                .await
                .map(discard_value),
            DialogIntent::Update(id) => {
                let patch = match self.store.note(id) {
                    Some(current) => form.patch_against(current),
                    None => return Err(DialogError::UnknownEntity(id.to_string())),
                };
                self.store
                    .update_note(&self.gateway, id, &patch)
                    .await
                    .map(discard_value)
            }
            DialogIntent::Delete(id) => self
                .store
                .delete_note(&self.gateway, id)
                .await
                .map(discard_value),
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => return Err(fail_dialog(&mut self.note_dialog, err)),
        };
        Ok(self.finish(EntityKind::Note, mode, outcome))
    }

    // Collection dialog actions.

    pub fn open_create_note_collection(&mut self) -> DialogResult<()> {
        self.gate(EntityKind::NoteCollection)?;
        self.collection_dialog.open_create(NoteCollectionForm::default())
    }

    /// Opens in update mode with title and current members pre-selected.
    pub fn open_update_note_collection(&mut self, id: &NoteCollectionId) -> DialogResult<()> {
        self.gate(EntityKind::NoteCollection)?;
        let collection = self
            .store
            .note_collection(id)
            .ok_or_else(|| DialogError::UnknownEntity(id.to_string()))?;
        let form = NoteCollectionForm::from_collection(collection, self.store.notes_in(id));
        self.collection_dialog.open_update(id.clone(), form)
    }

    pub fn open_delete_note_collection(&mut self, id: &NoteCollectionId) -> DialogResult<()> {
        self.gate(EntityKind::NoteCollection)?;
        if self.store.note_collection(id).is_none() {
            return Err(DialogError::UnknownEntity(id.to_string()));
        }
        self.collection_dialog.open_delete(id.clone())
    }

    pub fn note_collection_form_mut(&mut self) -> DialogResult<&mut NoteCollectionForm> {
        self.collection_dialog.form_mut()
    }

    pub fn cancel_note_collection_dialog(&mut self) -> bool {
        self.collection_dialog.close()
    }

    /// Runs the open collection dialog's mutation, including member moves.
    pub async fn confirm_note_collection_dialog(
        &mut self,
    ) -> DialogResult<MutationOutcome<DialogMode>> {
        let (intent, form) = match (
            self.collection_dialog.intent(),
            self.collection_dialog.form(),
        ) {
            (Some(intent), Some(form)) => (intent.clone(), form.clone()),
            _ => return Err(DialogError::NotOpen(EntityKind::NoteCollection)),
        };
        let mode = intent.mode();

        let result = match &intent {
            DialogIntent::Create => self.create_collection_with_members(&form).await,
            DialogIntent::Update(id) => self.update_collection_with_members(id, &form).await,
            DialogIntent::Delete(id) => {
                let policy = self.config.collections.delete_policy;
                let result = self
                    .store
                    .delete_note_collection(&self.gateway, id, policy)
                    .await
                    .map(discard_value)
                    .map_err(DialogError::from);
                if matches!(result, Ok(MutationOutcome::Applied(()))) {
                    self.tracker.remove(id);
                }
                result
            }
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => return Err(fail_dialog(&mut self.collection_dialog, err)),
        };
        Ok(self.finish(EntityKind::NoteCollection, mode, outcome))
    }

    async fn create_collection_with_members(
        &mut self,
        form: &NoteCollectionForm,
    ) -> Result<MutationOutcome<()>, DialogError> {
        let created = match self
            .store
            .create_note_collection(&self.gateway, &form.to_draft())
            .await?
        {
            MutationOutcome::Applied(created) => created,
            MutationOutcome::Skipped => return Ok(MutationOutcome::Skipped),
            MutationOutcome::Superseded => return Ok(MutationOutcome::Superseded),
        };

        if form.note_ids.is_empty() {
            return Ok(MutationOutcome::Applied(()));
        }
        if let Err(err) = self
            .store
            .assign_notes(&self.gateway, &created.id, &form.note_ids)
            .await
        {
            // The collection exists now; a retry must update it, not create
            // a second one.
            self.collection_dialog.retarget(created.id.clone())?;
            return Err(err.into());
        }
        Ok(MutationOutcome::Applied(()))
    }

    async fn update_collection_with_members(
        &mut self,
        id: &NoteCollectionId,
        form: &NoteCollectionForm,
    ) -> Result<MutationOutcome<()>, DialogError> {
        let current = self
            .store
            .note_collection(id)
            .ok_or_else(|| DialogError::UnknownEntity(id.to_string()))?;
        let patch = form.patch_against(current);
        let membership_changed = form.membership_differs(self.store.notes_in(id));

        if crate::model::is_blank_title(&form.title)
            || (patch.title.is_none() && !membership_changed)
        {
            return Ok(MutationOutcome::Skipped);
        }

        if patch.is_actionable() {
            let outcome = self
                .store
                .update_note_collection(&self.gateway, id, &patch)
                .await?;
            if matches!(outcome, MutationOutcome::Superseded) {
                return Ok(MutationOutcome::Superseded);
            }
        }
        if membership_changed {
            self.store
                .assign_notes(&self.gateway, id, &form.note_ids)
                .await?;
        }
        Ok(MutationOutcome::Applied(()))
    }

    fn finish(
        &mut self,
        kind: EntityKind,
        mode: DialogMode,
        outcome: MutationOutcome<()>,
    ) -> MutationOutcome<DialogMode> {
        let dialog_closed = match outcome {
            MutationOutcome::Applied(()) => {
                self.notification.post(success_message(kind, mode));
                true
            }
            MutationOutcome::Superseded => true,
            MutationOutcome::Skipped => false,
        };
        if dialog_closed {
            match kind {
                EntityKind::Note => self.note_dialog.close(),
                EntityKind::NoteCollection => self.collection_dialog.close(),
            };
        }
        match outcome {
            MutationOutcome::Applied(()) => MutationOutcome::Applied(mode),
            MutationOutcome::Skipped => MutationOutcome::Skipped,
            MutationOutcome::Superseded => MutationOutcome::Superseded,
        }
    }

    /// Enforces the exclusive-dialog setting before `kind` opens.
    fn gate(&self, kind: EntityKind) -> DialogResult<()> {
        if !self.config.dialogs.exclusive {
            return Ok(());
        }
        let other_open = match kind {
            EntityKind::Note => self.collection_dialog.is_open(),
            EntityKind::NoteCollection => self.note_dialog.is_open(),
        };
        if other_open {
            let blocker = match kind {
                EntityKind::Note => EntityKind::NoteCollection,
                EntityKind::NoteCollection => EntityKind::Note,
            };
            return Err(DialogError::Blocked(blocker));
        }
        Ok(())
    }
}

fn discard_value<T>(outcome: MutationOutcome<T>) -> MutationOutcome<()> {
    match outcome {
        MutationOutcome::Applied(_) => MutationOutcome::Applied(()),
        MutationOutcome::Skipped => MutationOutcome::Skipped,
        MutationOutcome::Superseded => MutationOutcome::Superseded,
    }
}

/// Keeps the dialog open with the failure attached and hands the error back.
fn fail_dialog<Id, F>(
    dialog: &mut DialogController<Id, F>,
    err: impl Into<DialogError>,
) -> DialogError
where
    Id: Clone + Display,
    F: Default,
{
    let err = err.into();
    if let Some(report) = err.failure_report() {
        dialog.record_failure(report);
    }
    err
}
