//! Core client logic for NoteTree.
//! This crate is the single source of truth for the client's state and
//! mutation workflow; views only read from a [`Session`] and call its actions.

pub mod config;
pub mod db;
pub mod dialog;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod notification;
pub mod projection;
pub mod session;
pub mod store;
pub mod tree;

pub use config::{ClientConfig, ConfigError};
pub use db::DbError;
pub use dialog::{
    DialogError, DialogIntent, DialogMode, DialogState, NoteCollectionDialog, NoteCollectionForm,
    NoteDialog, NoteForm,
};
pub use gateway::{
    FailureReport, Gateway, GatewayError, GatewayResult, Method, RequestInfo, SqliteGateway,
};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::collection::{
    NoteCollection, NoteCollectionDraft, NoteCollectionId, NoteCollectionPatch,
};
pub use model::note::{Note, NoteDraft, NoteId, NotePatch};
pub use model::EntityKind;
pub use notification::{Notification, NotificationChannel};
pub use session::{success_message, ConnectionStatus, DialogResult, Session};
pub use store::{
    CollectionDeletePolicy, CollectionRemoval, EntityStore, MembershipChange, MutationOutcome,
    StoreError, StoreResult, Ticket,
};
pub use tree::{BulkToggle, NoteRow, TreeExpansionTracker, TreeRow};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
