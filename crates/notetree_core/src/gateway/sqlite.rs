//! Local gateway backed by a migrated SQLite connection.
//!
//! # Responsibility
//! - Satisfy the `Gateway` contract without a network hop (CLI, tests).
//! - Report failures with REST-shaped diagnostics and status codes.
//!
//! # Invariants
//! - Ids are UUID v4 strings minted here, never by the client.
//! - Lists are returned in insertion order.
//! - Deleting a collection detaches its notes (`ON DELETE SET NULL`).

use super::{Gateway, GatewayError, GatewayResult, Method, RequestInfo};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::collection::{
    NoteCollection, NoteCollectionDraft, NoteCollectionId, NoteCollectionPatch,
};
use crate::model::note::{Note, NoteDraft, NoteId, NotePatch};
use crate::model::EntityKind;
use log::debug;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use uuid::Uuid;

const NOTE_SELECT_SQL: &str = "SELECT id, title, content, note_collection_id FROM notes";
const COLLECTION_SELECT_SQL: &str = "SELECT id, title FROM note_collections";

/// `Gateway` over a local SQLite database.
pub struct SqliteGateway {
    conn: Connection,
    base_url: String,
}

impl SqliteGateway {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection, base_url: impl Into<String>) -> Self {
        Self {
            conn,
            base_url: base_url.into(),
        }
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let base_url = format!("sqlite://{}", path.as_ref().display());
        Ok(Self::new(open_db(path)?, base_url))
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        Ok(Self::new(open_db_in_memory()?, "sqlite::memory:"))
    }

    /// Raw connection, for inspection in tests and tooling.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn request_for_kind(&self, method: Method, kind: EntityKind) -> RequestInfo {
        RequestInfo::for_kind(method, &self.base_url, kind)
    }

    fn request_for_item(&self, method: Method, kind: EntityKind, id: &str) -> RequestInfo {
        RequestInfo::for_item(method, &self.base_url, kind, id)
    }

    fn load_note(&self, id: &str) -> rusqlite::Result<Option<Note>> {
        self.conn
            .query_row(
                &format!("{NOTE_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_note_row,
            )
            .optional()
    }

    fn load_collection(&self, id: &str) -> rusqlite::Result<Option<NoteCollection>> {
        self.conn
            .query_row(
                &format!("{COLLECTION_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_collection_row,
            )
            .optional()
    }
}

impl Gateway for SqliteGateway {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn health(&self) -> GatewayResult<()> {
        let request = RequestInfo::new(Method::Get, &self.base_url, "/health");
        self.conn
            .query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|err| db_failure(request, err))
    }

    async fn list_notes(&self) -> GatewayResult<Vec<Note>> {
        let request = self.request_for_kind(Method::Get, EntityKind::Note);
        let query = || -> rusqlite::Result<Vec<Note>> {
            let mut stmt = self
                .conn
                .prepare(&format!("{NOTE_SELECT_SQL} ORDER BY rowid ASC;"))?;
            let rows = stmt.query_map([], parse_note_row)?;
            rows.collect()
        };
        query().map_err(|err| db_failure(request, err))
    }

    async fn create_note(&self, draft: &NoteDraft) -> GatewayResult<Note> {
        let request = self.request_for_kind(Method::Post, EntityKind::Note);
        let id = Uuid::new_v4().to_string();
        let insert = || -> rusqlite::Result<Option<Note>> {
            self.conn.execute(
                "INSERT INTO notes (id, title, content, note_collection_id)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    id,
                    draft.title,
                    draft.content,
                    draft.note_collection_id.as_ref().map(|c| c.as_str()),
                ],
            )?;
            self.load_note(&id)
        };

        match insert() {
            Ok(Some(note)) => {
                debug!("event=gateway_write module=gateway status=ok op=create_note id={id}");
                Ok(note)
            }
            Ok(None) => Err(GatewayError::new(request, "created note missing in read-back")
                .with_status(500)),
            Err(err) => Err(db_failure(request, err)),
        }
    }

    async fn update_note(&self, id: &NoteId, patch: &NotePatch) -> GatewayResult<Note> {
        let request = self.request_for_item(Method::Put, EntityKind::Note, id.as_str());
        let mut note = match self.load_note(id.as_str()) {
            Ok(Some(note)) => note,
            Ok(None) => return Err(GatewayError::not_found(request)),
            Err(err) => return Err(db_failure(request, err)),
        };
        patch.apply_to(&mut note);

        let changed = self.conn.execute(
            "UPDATE notes SET title = ?2, content = ?3, note_collection_id = ?4 WHERE id = ?1;",
            params![
                note.id.as_str(),
                note.title,
                note.content,
                note.note_collection_id.as_ref().map(|c| c.as_str()),
            ],
        );
        match changed {
            Ok(0) => Err(GatewayError::not_found(request)),
            Ok(_) => Ok(note),
            Err(err) => Err(db_failure(request, err)),
        }
    }

    async fn delete_note(&self, id: &NoteId) -> GatewayResult<()> {
        let request = self.request_for_item(Method::Delete, EntityKind::Note, id.as_str());
        match self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [id.as_str()])
        {
            Ok(0) => Err(GatewayError::not_found(request)),
            Ok(_) => Ok(()),
            Err(err) => Err(db_failure(request, err)),
        }
    }

    async fn list_note_collections(&self) -> GatewayResult<Vec<NoteCollection>> {
        let request = self.request_for_kind(Method::Get, EntityKind::NoteCollection);
        let query = || -> rusqlite::Result<Vec<NoteCollection>> {
            let mut stmt = self
                .conn
                .prepare(&format!("{COLLECTION_SELECT_SQL} ORDER BY rowid ASC;"))?;
            let rows = stmt.query_map([], parse_collection_row)?;
            rows.collect()
        };
        query().map_err(|err| db_failure(request, err))
    }

    async fn create_note_collection(
        &self,
        draft: &NoteCollectionDraft,
    ) -> GatewayResult<NoteCollection> {
        let request = self.request_for_kind(Method::Post, EntityKind::NoteCollection);
        let id = Uuid::new_v4().to_string();
        match self.conn.execute(
            "INSERT INTO note_collections (id, title) VALUES (?1, ?2);",
            params![id, draft.title],
        ) {
            Ok(_) => {
                debug!(
                    "event=gateway_write module=gateway status=ok op=create_note_collection id={id}"
                );
                Ok(NoteCollection {
                    id: NoteCollectionId::new(id),
                    title: draft.title.clone(),
                })
            }
            Err(err) => Err(db_failure(request, err)),
        }
    }

    async fn update_note_collection(
        &self,
        id: &NoteCollectionId,
        patch: &NoteCollectionPatch,
    ) -> GatewayResult<NoteCollection> {
        let request =
            self.request_for_item(Method::Put, EntityKind::NoteCollection, id.as_str());
        let mut collection = match self.load_collection(id.as_str()) {
            Ok(Some(collection)) => collection,
            Ok(None) => return Err(GatewayError::not_found(request)),
            Err(err) => return Err(db_failure(request, err)),
        };
        patch.apply_to(&mut collection);

        match self.conn.execute(
            "UPDATE note_collections SET title = ?2 WHERE id = ?1;",
            params![collection.id.as_str(), collection.title],
        ) {
            Ok(0) => Err(GatewayError::not_found(request)),
            Ok(_) => Ok(collection),
            Err(err) => Err(db_failure(request, err)),
        }
    }

    async fn delete_note_collection(&self, id: &NoteCollectionId) -> GatewayResult<()> {
        let request =
            self.request_for_item(Method::Delete, EntityKind::NoteCollection, id.as_str());
        match self
            .conn
            .execute("DELETE FROM note_collections WHERE id = ?1;", [id.as_str()])
        {
            Ok(0) => Err(GatewayError::not_found(request)),
            Ok(_) => Ok(()),
            Err(err) => Err(db_failure(request, err)),
        }
    }
}

fn parse_note_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: NoteId::new(row.get::<_, String>("id")?),
        title: row.get("title")?,
        content: row.get("content")?,
        note_collection_id: row
            .get::<_, Option<String>>("note_collection_id")?
            .map(NoteCollectionId::new),
    })
}

fn parse_collection_row(row: &Row<'_>) -> rusqlite::Result<NoteCollection> {
    Ok(NoteCollection {
        id: NoteCollectionId::new(row.get::<_, String>("id")?),
        title: row.get("title")?,
    })
}

fn db_failure(request: RequestInfo, err: rusqlite::Error) -> GatewayError {
    let status = match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            422
        }
        _ => 500,
    };
    GatewayError::new(request, err.to_string())
        .with_status(status)
        .with_source(err)
}

#[cfg(test)]
mod tests {
    use super::SqliteGateway;
    use crate::gateway::{Gateway, Method};
    use crate::model::collection::{NoteCollectionDraft, NoteCollectionId};
    use crate::model::note::{NoteDraft, NoteId, NotePatch};

    #[tokio::test]
    async fn create_assigns_ids_and_lists_in_insertion_order() {
        let gateway = SqliteGateway::open_in_memory().unwrap();
        let first = gateway.create_note(&NoteDraft::new("first", "a")).await.unwrap();
        let second = gateway.create_note(&NoteDraft::new("second", "b")).await.unwrap();
        assert_ne!(first.id, second.id);

        let listed = gateway.list_notes().await.unwrap();
        assert_eq!(listed, vec![first, second]);
    }

    #[tokio::test]
    async fn unknown_collection_reference_is_unprocessable() {
        let gateway = SqliteGateway::open_in_memory().unwrap();
        let draft = NoteDraft::new("t", "c").in_collection(NoteCollectionId::from("missing"));
        let err = gateway.create_note(&draft).await.unwrap_err();
        assert_eq!(err.status, Some(422));
        assert_eq!(err.request.method, Method::Post);
        assert_eq!(err.request.path, "/notes");
    }

    #[tokio::test]
    async fn stale_ids_report_not_found() {
        let gateway = SqliteGateway::open_in_memory().unwrap();
        let id = NoteId::from("ghost");
        let err = gateway
            .update_note(&id, &NotePatch::title("x"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.request.path, "/notes/ghost");

        let err = gateway.delete_note(&id).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.request.method, Method::Delete);
    }

    #[tokio::test]
    async fn deleting_collection_detaches_member_notes() {
        let gateway = SqliteGateway::open_in_memory().unwrap();
        let collection = gateway
            .create_note_collection(&NoteCollectionDraft::new("Work"))
            .await
            .unwrap();
        let note = gateway
            .create_note(&NoteDraft::new("t", "c").in_collection(collection.id.clone()))
            .await
            .unwrap();
        assert_eq!(note.note_collection_id.as_ref(), Some(&collection.id));

        gateway.delete_note_collection(&collection.id).await.unwrap();
        let notes = gateway.list_notes().await.unwrap();
        assert!(notes[0].is_unfiled());
        assert!(gateway.list_note_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_applies_only_changed_fields() {
        let gateway = SqliteGateway::open_in_memory().unwrap();
        let note = gateway.create_note(&NoteDraft::new("t", "body")).await.unwrap();
        let updated = gateway
            .update_note(&note.id, &NotePatch::title("renamed"))
            .await
            .unwrap();
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.content, "body");
        assert!(gateway.health().await.is_ok());
    }
}
