use notetree_core::db::migrations::{current_user_version, latest_version};
use notetree_core::{
    ClientConfig, DialogMode, MutationOutcome, NoteCollectionId, Session, SqliteGateway,
};

#[tokio::test]
async fn full_workflow_persists_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("notes.sqlite3");

    let collection_id: NoteCollectionId;
    {
        let gateway = SqliteGateway::open(&db_path).unwrap();
        let mut session = Session::new(gateway, ClientConfig::default());
        session.refresh().await.unwrap();
        assert!(session.is_empty());

        session.open_create_note_collection().unwrap();
        session.note_collection_form_mut().unwrap().title = "Work".to_string();
        session.confirm_note_collection_dialog().await.unwrap();
        collection_id = session.note_collections()[0].id.clone();

        session.open_create_note().unwrap();
        {
            let form = session.note_form_mut().unwrap();
            form.title = "Standup".to_string();
            form.content = "- yesterday\n- today".to_string();
            form.note_collection_id = Some(collection_id.clone());
        }
        let outcome = session.confirm_note_dialog().await.unwrap();
        assert_eq!(outcome, MutationOutcome::Applied(DialogMode::Create));
    }

    let gateway = SqliteGateway::open(&db_path).unwrap();
    assert_eq!(
        current_user_version(gateway.connection()).unwrap(),
        latest_version()
    );
    let mut session = Session::new(gateway, ClientConfig::default());
    session.refresh().await.unwrap();
    assert_eq!(session.notes().len(), 1);
    assert_eq!(session.notes_of(&collection_id).len(), 1);
    assert_eq!(session.collection_summary(&collection_id), "Standup");

    session.open_delete_note_collection(&collection_id).unwrap();
    session.confirm_note_collection_dialog().await.unwrap();
    assert!(session.note_collections().is_empty());
    assert!(session.notes()[0].is_unfiled());
}

#[tokio::test]
async fn constraint_failure_is_reported_with_request_details() {
    let gateway = SqliteGateway::open_in_memory().unwrap();
    let mut session = Session::new(gateway, ClientConfig::default());
    session.refresh().await.unwrap();

    session.open_create_note_collection().unwrap();
    session.note_collection_form_mut().unwrap().title = "Temp".to_string();
    session.confirm_note_collection_dialog().await.unwrap();
    let collection_id = session.note_collections()[0].id.clone();

    // Delete behind the session's back so its copy goes stale.
    session
        .gateway()
        .connection()
        .execute("DELETE FROM note_collections;", [])
        .unwrap();

    session.open_create_note().unwrap();
    {
        let form = session.note_form_mut().unwrap();
        form.title = "Orphan".to_string();
        form.note_collection_id = Some(collection_id);
    }
    let err = session.confirm_note_dialog().await.unwrap_err();
    let report = err.failure_report().expect("gateway failure");
    assert_eq!(report.code, Some(422));
    assert_eq!(report.base_url, "sqlite::memory:");
    assert_eq!(report.url, "/notes");
    assert!(session.notes().is_empty());
    assert!(session.note_dialog().is_open());
}
