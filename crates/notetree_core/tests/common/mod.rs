#![allow(dead_code)]

use notetree_core::{
    ClientConfig, EntityKind, Gateway, GatewayError, GatewayResult, Method, Note, NoteCollection,
    NoteCollectionDraft, NoteCollectionId, NoteCollectionPatch, NoteDraft, NoteId, NotePatch,
    RequestInfo, Session,
};
use std::cell::RefCell;

pub const BASE_URL: &str = "http://scripted.test";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Health,
    ListNotes,
    CreateNote,
    UpdateNote,
    DeleteNote,
    ListCollections,
    CreateCollection,
    UpdateCollection,
    DeleteCollection,
}

#[derive(Debug, Clone)]
struct Failure {
    op: Op,
    target: Option<String>,
    status: u16,
    message: String,
}

#[derive(Debug, Default)]
struct State {
    notes: Vec<Note>,
    collections: Vec<NoteCollection>,
    next_note: u32,
    next_collection: u32,
    failures: Vec<Failure>,
    calls: Vec<Op>,
}

/// In-memory gateway with sequential ids (`n1`, `c1`, ...) and scripted
/// failures.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    state: RefCell<State>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `op` fail with `status`.
    pub fn fail(&self, op: Op, status: u16, message: &str) {
        self.state.borrow_mut().failures.push(Failure {
            op,
            target: None,
            status,
            message: message.to_string(),
        });
    }

    /// Makes later calls of `op` against one id fail with `status`.
    pub fn fail_for(&self, op: Op, id: &str, status: u16, message: &str) {
        self.state.borrow_mut().failures.push(Failure {
            op,
            target: Some(id.to_string()),
            status,
            message: message.to_string(),
        });
    }

    pub fn clear_failures(&self) {
        self.state.borrow_mut().failures.clear();
    }

    pub fn calls(&self) -> Vec<Op> {
        self.state.borrow().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.borrow().calls.len()
    }

    pub fn server_notes(&self) -> Vec<Note> {
        self.state.borrow().notes.clone()
    }

    pub fn server_collections(&self) -> Vec<NoteCollection> {
        self.state.borrow().collections.clone()
    }

    /// Inserts a collection directly on the server side.
    pub fn seed_collection(&self, title: &str) -> NoteCollectionId {
        let mut state = self.state.borrow_mut();
        state.next_collection += 1;
        let id = NoteCollectionId::new(format!("c{}", state.next_collection));
        state.collections.push(NoteCollection {
            id: id.clone(),
            title: title.to_string(),
        });
        id
    }

    /// Inserts a note directly on the server side.
    pub fn seed_note(&self, title: &str, collection: Option<&NoteCollectionId>) -> NoteId {
        let mut state = self.state.borrow_mut();
        state.next_note += 1;
        let id = NoteId::new(format!("n{}", state.next_note));
        state.notes.push(Note {
            id: id.clone(),
            title: title.to_string(),
            content: String::new(),
            note_collection_id: collection.cloned(),
        });
        id
    }

    fn enter(&self, op: Op, method: Method, kind: EntityKind, id: Option<&str>) -> GatewayResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(op);
        let request = match id {
            Some(id) => RequestInfo::for_item(method, BASE_URL, kind, id),
            None => RequestInfo::for_kind(method, BASE_URL, kind),
        };
        let failure = state.failures.iter().find(|failure| {
            failure.op == op
                && failure
                    .target
                    .as_deref()
                    .map_or(true, |target| Some(target) == id)
        });
        match failure {
            Some(failure) => Err(GatewayError::new(request, failure.message.clone())
                .with_status(failure.status)),
            None => Ok(()),
        }
    }

    fn missing(method: Method, kind: EntityKind, id: &str) -> GatewayError {
        GatewayError::not_found(RequestInfo::for_item(method, BASE_URL, kind, id))
    }

    fn check_reference(
        state: &State,
        method: Method,
        path_id: Option<&str>,
        reference: Option<&NoteCollectionId>,
    ) -> GatewayResult<()> {
        match reference {
            Some(collection_id) if !state.collections.iter().any(|c| &c.id == collection_id) => {
                let request = match path_id {
                    Some(id) => RequestInfo::for_item(method, BASE_URL, EntityKind::Note, id),
                    None => RequestInfo::for_kind(method, BASE_URL, EntityKind::Note),
                };
                Err(GatewayError::new(request, "unknown note collection").with_status(422))
            }
            _ => Ok(()),
        }
    }
}

impl Gateway for ScriptedGateway {
    fn base_url(&self) -> &str {
        BASE_URL
    }

    async fn health(&self) -> GatewayResult<()> {
        self.enter(Op::Health, Method::Get, EntityKind::Note, None)
    }

    async fn list_notes(&self) -> GatewayResult<Vec<Note>> {
        self.enter(Op::ListNotes, Method::Get, EntityKind::Note, None)?;
        Ok(self.state.borrow().notes.clone())
    }

    async fn create_note(&self, draft: &NoteDraft) -> GatewayResult<Note> {
        self.enter(Op::CreateNote, Method::Post, EntityKind::Note, None)?;
        let mut state = self.state.borrow_mut();
        Self::check_reference(&state, Method::Post, None, draft.note_collection_id.as_ref())?;
        state.next_note += 1;
        let note = Note {
            id: NoteId::new(format!("n{}", state.next_note)),
            title: draft.title.clone(),
            content: draft.content.clone(),
            note_collection_id: draft.note_collection_id.clone(),
        };
        state.notes.push(note.clone());
        Ok(note)
    }

    async fn update_note(&self, id: &NoteId, patch: &NotePatch) -> GatewayResult<Note> {
        self.enter(Op::UpdateNote, Method::Put, EntityKind::Note, Some(id.as_str()))?;
        let mut state = self.state.borrow_mut();
        if let Some(reference) = &patch.note_collection_id {
            Self::check_reference(&state, Method::Put, Some(id.as_str()), reference.as_ref())?;
        }
        let note = state
            .notes
            .iter_mut()
            .find(|note| &note.id == id)
            .ok_or_else(|| Self::missing(Method::Put, EntityKind::Note, id.as_str()))?;
        patch.apply_to(note);
        Ok(note.clone())
    }

    async fn delete_note(&self, id: &NoteId) -> GatewayResult<()> {
        self.enter(Op::DeleteNote, Method::Delete, EntityKind::Note, Some(id.as_str()))?;
        let mut state = self.state.borrow_mut();
        let before = state.notes.len();
        state.notes.retain(|note| &note.id != id);
        if state.notes.len() == before {
            return Err(Self::missing(Method::Delete, EntityKind::Note, id.as_str()));
        }
        Ok(())
    }

    async fn list_note_collections(&self) -> GatewayResult<Vec<NoteCollection>> {
        self.enter(Op::ListCollections, Method::Get, EntityKind::NoteCollection, None)?;
        Ok(self.state.borrow().collections.clone())
    }

    async fn create_note_collection(
        &self,
        draft: &NoteCollectionDraft,
    ) -> GatewayResult<NoteCollection> {
        self.enter(Op::CreateCollection, Method::Post, EntityKind::NoteCollection, None)?;
        let mut state = self.state.borrow_mut();
        state.next_collection += 1;
        let collection = NoteCollection {
            id: NoteCollectionId::new(format!("c{}", state.next_collection)),
            title: draft.title.clone(),
        };
        state.collections.push(collection.clone());
        Ok(collection)
    }

    async fn update_note_collection(
        &self,
        id: &NoteCollectionId,
        patch: &NoteCollectionPatch,
    ) -> GatewayResult<NoteCollection> {
        self.enter(
            Op::UpdateCollection,
            Method::Put,
            EntityKind::NoteCollection,
            Some(id.as_str()),
        )?;
        let mut state = self.state.borrow_mut();
        let collection = state
            .collections
            .iter_mut()
            .find(|collection| &collection.id == id)
            .ok_or_else(|| Self::missing(Method::Put, EntityKind::NoteCollection, id.as_str()))?;
        patch.apply_to(collection);
        Ok(collection.clone())
    }

    async fn delete_note_collection(&self, id: &NoteCollectionId) -> GatewayResult<()> {
        self.enter(
            Op::DeleteCollection,
            Method::Delete,
            EntityKind::NoteCollection,
            Some(id.as_str()),
        )?;
        let mut state = self.state.borrow_mut();
        let before = state.collections.len();
        state.collections.retain(|collection| &collection.id != id);
        if state.collections.len() == before {
            return Err(Self::missing(
                Method::Delete,
                EntityKind::NoteCollection,
                id.as_str(),
            ));
        }
        for note in state.notes.iter_mut().filter(|note| note.is_in(id)) {
            note.note_collection_id = None;
        }
        Ok(())
    }
}

pub fn session() -> Session<ScriptedGateway> {
    Session::new(ScriptedGateway::new(), ClientConfig::default())
}

pub fn session_with(config: ClientConfig) -> Session<ScriptedGateway> {
    Session::new(ScriptedGateway::new(), config)
}

/// No note references a collection the session does not hold.
pub fn assert_no_dangling_references<G: Gateway>(session: &Session<G>) {
    for note in session.notes() {
        if let Some(collection_id) = &note.note_collection_id {
            assert!(
                session
                    .note_collections()
                    .iter()
                    .any(|collection| &collection.id == collection_id),
                "note {} references missing collection {}",
                note.id,
                collection_id
            );
        }
    }
}
