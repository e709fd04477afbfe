//! Remote data gateway contract.
//!
//! # Responsibility
//! - Define the CRUD boundary the store calls for notes and collections.
//! - Carry request diagnostics (method + URL) on every failure.
//!
//! # Invariants
//! - Gateways assign entity ids; callers never pass ids on create.
//! - A failed call has no effect the client must undo.
//! - A stale id on update/delete surfaces as status 404, not a panic.

mod sqlite;

pub use sqlite::SqliteGateway;

use crate::model::collection::{
    NoteCollection, NoteCollectionDraft, NoteCollectionId, NoteCollectionPatch,
};
use crate::model::note::{Note, NoteDraft, NoteId, NotePatch};
use crate::model::EntityKind;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type GatewayResult<T> = Result<T, GatewayError>;

/// HTTP-style verb recorded for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Originating request of a gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: Method,
    pub base_url: String,
    /// Path relative to `base_url`, always starting with `/`.
    pub path: String,
}

impl RequestInfo {
    pub fn new(method: Method, base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method,
            base_url: base_url.into(),
            path: path.into(),
        }
    }

    /// Builds the request for a collection-level call (`list`, `create`).
    pub fn for_kind(method: Method, base_url: &str, kind: EntityKind) -> Self {
        Self::new(method, base_url, format!("/{}", kind.resource_path()))
    }

    /// Builds the request for an item-level call (`update`, `delete`).
    pub fn for_item(method: Method, base_url: &str, kind: EntityKind, id: &str) -> Self {
        Self::new(method, base_url, format!("/{}/{id}", kind.resource_path()))
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.path)
    }
}

/// Transport, status or server failure of one gateway call.
#[derive(Debug)]
pub struct GatewayError {
    pub message: String,
    /// Status code reported by the remote side, when there was one.
    pub status: Option<u16>,
    pub request: RequestInfo,
    pub cause: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} failed: {}",
            self.request.method,
            self.request.url(),
            self.message
        )
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn Error + 'static))
    }
}

impl GatewayError {
    pub fn new(request: RequestInfo, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            request,
            cause: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source(mut self, cause: impl Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn not_found(request: RequestInfo) -> Self {
        let message = format!("resource not found: {}", request.path);
        Self::new(request, message).with_status(404)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    /// View-facing snapshot of this failure.
    pub fn report(&self) -> FailureReport {
        FailureReport {
            message: self.message.clone(),
            code: self.status,
            method: self.request.method,
            base_url: self.request.base_url.clone(),
            url: self.request.path.clone(),
        }
    }
}

/// Cloneable diagnostics shown to the user while a dialog stays open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub message: String,
    pub code: Option<u16>,
    pub method: Method,
    pub base_url: String,
    pub url: String,
}

impl FailureReport {
    /// Labelled rows in display order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Message", self.message.clone()),
            (
                "Code",
                self.code
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            ("Method", self.method.to_string()),
            ("Base URL", self.base_url.clone()),
            ("URL", self.url.clone()),
        ]
    }
}

/// CRUD operations the client needs from the remote store.
///
/// Calls run on the client's single event loop, so implementations need not
/// be `Send`.
#[allow(async_fn_in_trait)]
pub trait Gateway {
    /// Base URL recorded in request diagnostics.
    fn base_url(&self) -> &str;

    /// Cheap reachability probe.
    async fn health(&self) -> GatewayResult<()> {
        Ok(())
    }

    async fn list_notes(&self) -> GatewayResult<Vec<Note>>;
    async fn create_note(&self, draft: &NoteDraft) -> GatewayResult<Note>;
    async fn update_note(&self, id: &NoteId, patch: &NotePatch) -> GatewayResult<Note>;
    async fn delete_note(&self, id: &NoteId) -> GatewayResult<()>;

    async fn list_note_collections(&self) -> GatewayResult<Vec<NoteCollection>>;
    async fn create_note_collection(
        &self,
        draft: &NoteCollectionDraft,
    ) -> GatewayResult<NoteCollection>;
    async fn update_note_collection(
        &self,
        id: &NoteCollectionId,
        patch: &NoteCollectionPatch,
    ) -> GatewayResult<NoteCollection>;
    async fn delete_note_collection(&self, id: &NoteCollectionId) -> GatewayResult<()>;
}
