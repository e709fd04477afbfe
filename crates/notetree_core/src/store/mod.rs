//! Entity store: the client's single source of truth for notes and
//! note collections.
//!
//! # Responsibility
//! - Hold the current note and collection sets in gateway order.
//! - Route every mutation through the gateway and apply only the
//!   gateway-returned result.
//! - Reject superseded responses through request tickets.
//!
//! # Invariants
//! - Nothing is applied optimistically; a failed call leaves state untouched.
//! - Blank titles are a silent skip: no gateway call, no state change.
//! - No note references a collection the store does not hold once a
//!   collection removal has been committed.
//! - Collection membership is projected from notes, never stored.

mod ledger;

pub use ledger::Ticket;

use crate::gateway::{Gateway, GatewayError, GatewayResult};
use crate::logging::sanitize_message;
use crate::model::collection::{
    NoteCollection, NoteCollectionDraft, NoteCollectionId, NoteCollectionPatch,
};
use crate::model::note::{Note, NoteDraft, NoteId, NotePatch};
use crate::model::EntityKind;
use crate::projection;
use ledger::MutationLedger;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::future::Future;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Remote call failed; local state is unchanged.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// A note input references a collection the store does not hold.
    #[error("note collection not found: {0}")]
    UnknownCollection(NoteCollectionId),
}

impl StoreError {
    pub fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            Self::Gateway(err) => Some(err),
            Self::UnknownCollection(_) => None,
        }
    }
}

/// Result of a mutation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome<T> {
    /// The gateway confirmed the change and the store applied it.
    Applied(T),
    /// Input was empty; nothing was sent.
    Skipped,
    /// The gateway confirmed the change but a newer write already landed, or
    /// the session was torn down, so the response was dropped.
    Superseded,
}

impl<T> MutationOutcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Skipped | Self::Superseded => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// Whether the gateway accepted the request.
    pub fn reached_gateway(&self) -> bool {
        !self.is_skipped()
    }
}

/// Fate of member notes when their collection is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionDeletePolicy {
    /// Member notes become unfiled.
    #[default]
    Detach,
    /// Member notes are deleted with the collection.
    Cascade,
}

/// What a committed collection delete did to the note set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionRemoval {
    pub detached: Vec<NoteId>,
    pub deleted: Vec<NoteId>,
}

/// Membership moves performed by `assign_notes`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipChange {
    pub attached: Vec<NoteId>,
    pub detached: Vec<NoteId>,
}

impl MembershipChange {
    pub fn is_empty(&self) -> bool {
        self.attached.is_empty() && self.detached.is_empty()
    }
}

/// In-memory note and collection sets kept consistent with a gateway.
#[derive(Debug, Default)]
pub struct EntityStore {
    notes: Vec<Note>,
    collections: Vec<NoteCollection>,
    ledger: MutationLedger,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note_collections(&self) -> &[NoteCollection] {
        &self.collections
    }

    pub fn note(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| &note.id == id)
    }

    pub fn note_collection(&self, id: &NoteCollectionId) -> Option<&NoteCollection> {
        self.collections.iter().find(|collection| &collection.id == id)
    }

    /// Members of one collection, in store order.
    pub fn notes_in<'a>(&'a self, id: &'a NoteCollectionId) -> impl Iterator<Item = &'a Note> {
        projection::notes_in(&self.notes, id)
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.collections.is_empty()
    }

    /// Number of dispatched, unresolved mutations of `kind`.
    pub fn in_flight(&self, kind: EntityKind) -> usize {
        self.ledger.in_flight(kind)
    }

    pub fn is_refreshing(&self) -> bool {
        self.ledger.refreshing()
    }

    /// Drops all outstanding tickets; responses that arrive later are
    /// reported as `Superseded` and not applied.
    pub fn invalidate_in_flight(&mut self) {
        debug!("event=store_invalidate module=store status=ok");
        self.ledger.invalidate();
    }

    // Two-phase API: callers that dispatch gateway requests themselves take
    // a ticket before the call and commit or release it afterwards.

    pub fn begin(&mut self, kind: EntityKind) -> Ticket {
        self.ledger.issue(kind)
    }

    pub fn begin_refresh(&mut self) -> Ticket {
        self.ledger.issue_refresh()
    }

    /// Releases a ticket whose request failed.
    pub fn release(&mut self, ticket: Ticket) {
        self.ledger.settle(&ticket);
    }

    /// Inserts or replaces one note with the gateway's copy.
    pub fn commit_note(&mut self, ticket: Ticket, note: Note) -> bool {
        self.ledger.settle(&ticket);
        if !self.ledger.admit_note(&ticket, &note.id) {
            return false;
        }
        match self.notes.iter_mut().find(|existing| existing.id == note.id) {
            Some(existing) => *existing = note,
            None => self.notes.push(note),
        }
        true
    }

    pub fn commit_note_removal(&mut self, ticket: Ticket, id: &NoteId) -> bool {
        self.ledger.settle(&ticket);
        if !self.ledger.admit_note(&ticket, id) {
            return false;
        }
        self.notes.retain(|note| &note.id != id);
        self.ledger.retire_note(id);
        true
    }

    pub fn commit_note_collection(&mut self, ticket: Ticket, collection: NoteCollection) -> bool {
        self.ledger.settle(&ticket);
        if !self.ledger.admit_collection(&ticket, &collection.id) {
            return false;
        }
        match self
            .collections
            .iter_mut()
            .find(|existing| existing.id == collection.id)
        {
            Some(existing) => *existing = collection,
            None => self.collections.push(collection),
        }
        true
    }

    /// Removes one collection and unfiles any notes still referencing it.
    pub fn commit_note_collection_removal(&mut self, ticket: Ticket, id: &NoteCollectionId) -> bool {
        self.ledger.settle(&ticket);
        if !self.ledger.admit_collection(&ticket, id) {
            return false;
        }
        self.collections.retain(|collection| &collection.id != id);
        self.ledger.retire_collection(id);
        for note in self.notes.iter_mut().filter(|note| note.is_in(id)) {
            note.note_collection_id = None;
        }
        true
    }

    /// Replaces both sets wholesale.
    pub fn commit_snapshot(
        &mut self,
        ticket: Ticket,
        notes: Vec<Note>,
        collections: Vec<NoteCollection>,
    ) -> bool {
        self.ledger.settle(&ticket);
        if !self.ledger.admit_snapshot(&ticket) {
            return false;
        }
        self.notes = notes;
        self.collections = collections;
        true
    }

    /// Re-fetches both sets in full and replaces local state.
    pub async fn refresh<G: Gateway>(&mut self, gateway: &G) -> StoreResult<MutationOutcome<()>> {
        let ticket = self.begin_refresh();
        match fetch_all(gateway).await {
            Ok((notes, collections)) => {
                let (note_count, collection_count) = (notes.len(), collections.len());
                if self.commit_snapshot(ticket, notes, collections) {
                    info!(
                        "event=store_refresh module=store status=ok notes={note_count} collections={collection_count}"
                    );
                    Ok(MutationOutcome::Applied(()))
                } else {
                    info!("event=store_refresh module=store status=superseded");
                    Ok(MutationOutcome::Superseded)
                }
            }
            Err(err) => {
                self.release(ticket);
                log_failure("refresh", &err);
                Err(err.into())
            }
        }
    }

    pub async fn create_note<G: Gateway>(
        &mut self,
        gateway: &G,
        draft: &NoteDraft,
    ) -> StoreResult<MutationOutcome<Note>> {
        if !draft.is_actionable() {
            debug!("event=note_create module=store status=skipped reason=blank_title");
            return Ok(MutationOutcome::Skipped);
        }
        if let Some(collection_id) = &draft.note_collection_id {
            self.ensure_collection(collection_id)?;
        }

        let (ticket, note) = self
            .dispatch(EntityKind::Note, "note_create", gateway.create_note(draft))
            .await?;
        Ok(self.apply_note(ticket, note, "note_create"))
    }

    pub async fn update_note<G: Gateway>(
        &mut self,
        gateway: &G,
        id: &NoteId,
        patch: &NotePatch,
    ) -> StoreResult<MutationOutcome<Note>> {
        if !patch.is_actionable() {
            debug!("event=note_update module=store status=skipped id={id}");
            return Ok(MutationOutcome::Skipped);
        }
        if let Some(Some(collection_id)) = &patch.note_collection_id {
            self.ensure_collection(collection_id)?;
        }

        let (ticket, note) = self
            .dispatch(EntityKind::Note, "note_update", gateway.update_note(id, patch))
            .await?;
        Ok(self.apply_note(ticket, note, "note_update"))
    }

    pub async fn delete_note<G: Gateway>(
        &mut self,
        gateway: &G,
        id: &NoteId,
    ) -> StoreResult<MutationOutcome<NoteId>> {
        let (ticket, ()) = self
            .dispatch(EntityKind::Note, "note_delete", gateway.delete_note(id))
            .await?;
        if self.commit_note_removal(ticket, id) {
            info!("event=note_delete module=store status=ok id={id}");
            Ok(MutationOutcome::Applied(id.clone()))
        } else {
            info!("event=note_delete module=store status=superseded id={id}");
            Ok(MutationOutcome::Superseded)
        }
    }

    pub async fn create_note_collection<G: Gateway>(
        &mut self,
        gateway: &G,
        draft: &NoteCollectionDraft,
    ) -> StoreResult<MutationOutcome<NoteCollection>> {
        if !draft.is_actionable() {
            debug!("event=note_collection_create module=store status=skipped reason=blank_title");
            return Ok(MutationOutcome::Skipped);
        }

        let (ticket, collection) = self
            .dispatch(
                EntityKind::NoteCollection,
                "note_collection_create",
                gateway.create_note_collection(draft),
            )
            .await?;
        Ok(self.apply_collection(ticket, collection, "note_collection_create"))
    }

    pub async fn update_note_collection<G: Gateway>(
        &mut self,
        gateway: &G,
        id: &NoteCollectionId,
        patch: &NoteCollectionPatch,
    ) -> StoreResult<MutationOutcome<NoteCollection>> {
        if !patch.is_actionable() {
            debug!("event=note_collection_update module=store status=skipped id={id}");
            return Ok(MutationOutcome::Skipped);
        }

        let (ticket, collection) = self
            .dispatch(
                EntityKind::NoteCollection,
                "note_collection_update",
                gateway.update_note_collection(id, patch),
            )
            .await?;
        Ok(self.apply_collection(ticket, collection, "note_collection_update"))
    }

    /// Deletes one collection, first detaching or deleting its members per
    /// `policy`.
    ///
    /// Member steps are applied as each one succeeds. When a step fails the
    /// collection itself is left in place.
    pub async fn delete_note_collection<G: Gateway>(
        &mut self,
        gateway: &G,
        id: &NoteCollectionId,
        policy: CollectionDeletePolicy,
    ) -> StoreResult<MutationOutcome<CollectionRemoval>> {
        let members: Vec<NoteId> = self.notes_in(id).map(|note| note.id.clone()).collect();
        let mut removal = CollectionRemoval::default();

        for note_id in members {
            match policy {
                CollectionDeletePolicy::Detach => {
                    let outcome = self
                        .update_note(gateway, &note_id, &NotePatch::move_to(None))
                        .await?;
                    if outcome.applied().is_some() {
                        removal.detached.push(note_id);
                    }
                }
                CollectionDeletePolicy::Cascade => {
                    if let Some(deleted) = self.delete_note(gateway, &note_id).await?.applied() {
                        removal.deleted.push(deleted);
                    }
                }
            }
        }

        let (ticket, ()) = self
            .dispatch(
                EntityKind::NoteCollection,
                "note_collection_delete",
                gateway.delete_note_collection(id),
            )
            .await?;
        if self.commit_note_collection_removal(ticket, id) {
            info!(
                "event=note_collection_delete module=store status=ok id={id} policy={policy:?} detached={} deleted={}",
                removal.detached.len(),
                removal.deleted.len()
            );
            Ok(MutationOutcome::Applied(removal))
        } else {
            info!("event=note_collection_delete module=store status=superseded id={id}");
            Ok(MutationOutcome::Superseded)
        }
    }

    /// Makes `members` the exact member set of one collection.
    ///
    /// Selected notes filed elsewhere are reassigned; current members not
    /// selected become unfiled.
    pub async fn assign_notes<G: Gateway>(
        &mut self,
        gateway: &G,
        collection_id: &NoteCollectionId,
        members: &[NoteId],
    ) -> StoreResult<MembershipChange> {
        self.ensure_collection(collection_id)?;

        let to_attach: Vec<NoteId> = members
            .iter()
            .filter(|id| self.note(id).is_some_and(|note| !note.is_in(collection_id)))
            .cloned()
            .collect();
        let to_detach: Vec<NoteId> = self
            .notes_in(collection_id)
            .filter(|note| !members.contains(&note.id))
            .map(|note| note.id.clone())
            .collect();

        let mut change = MembershipChange::default();
        for note_id in to_attach {
            let patch = NotePatch::move_to(Some(collection_id.clone()));
            if self.update_note(gateway, &note_id, &patch).await?.applied().is_some() {
                change.attached.push(note_id);
            }
        }
        for note_id in to_detach {
            let patch = NotePatch::move_to(None);
            if self.update_note(gateway, &note_id, &patch).await?.applied().is_some() {
                change.detached.push(note_id);
            }
        }
        Ok(change)
    }

    async fn dispatch<T>(
        &mut self,
        kind: EntityKind,
        event: &'static str,
        call: impl Future<Output = GatewayResult<T>>,
    ) -> StoreResult<(Ticket, T)> {
        let ticket = self.begin(kind);
        match call.await {
            Ok(value) => Ok((ticket, value)),
            Err(err) => {
                self.release(ticket);
                log_failure(event, &err);
                Err(err.into())
            }
        }
    }

    fn apply_note(&mut self, ticket: Ticket, note: Note, event: &str) -> MutationOutcome<Note> {
        let id = note.id.clone();
        if self.commit_note(ticket, note) {
            info!("event={event} module=store status=ok id={id}");
            self.note(&id)
                .cloned()
                .map_or(MutationOutcome::Superseded, MutationOutcome::Applied)
        } else {
            info!("event={event} module=store status=superseded id={id}");
            MutationOutcome::Superseded
        }
    }

    fn apply_collection(
        &mut self,
        ticket: Ticket,
        collection: NoteCollection,
        event: &str,
    ) -> MutationOutcome<NoteCollection> {
        let id = collection.id.clone();
        if self.commit_note_collection(ticket, collection) {
            info!("event={event} module=store status=ok id={id}");
            self.note_collection(&id)
                .cloned()
                .map_or(MutationOutcome::Superseded, MutationOutcome::Applied)
        } else {
            info!("event={event} module=store status=superseded id={id}");
            MutationOutcome::Superseded
        }
    }

    fn ensure_collection(&self, id: &NoteCollectionId) -> StoreResult<()> {
        if self.note_collection(id).is_none() {
            return Err(StoreError::UnknownCollection(id.clone()));
        }
        Ok(())
    }
}

async fn fetch_all<G: Gateway>(gateway: &G) -> GatewayResult<(Vec<Note>, Vec<NoteCollection>)> {
    let notes = gateway.list_notes().await?;
    let collections = gateway.list_note_collections().await?;
    Ok((notes, collections))
}

fn log_failure(event: &str, err: &GatewayError) {
    warn!(
        "event={event} module=store status=error method={} url={} code={} error={}",
        err.request.method,
        err.request.url(),
        err.status.map_or_else(|| "-".to_string(), |code| code.to_string()),
        sanitize_message(&err.message, 160)
    );
}
