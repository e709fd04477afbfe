mod common;

use common::{session, session_with, ScriptedGateway};
use notetree_core::{ClientConfig, ConnectionStatus, Method, Session};
use std::time::Duration;

async fn create_note(session: &mut Session<ScriptedGateway>, title: &str) {
    session.open_create_note().unwrap();
    session.note_form_mut().unwrap().title = title.to_string();
    session.confirm_note_dialog().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn later_message_replaces_earlier_and_expires_on_its_own_timer() {
    let mut session = session();
    create_note(&mut session, "first").await;
    tokio::time::sleep(Duration::from_secs(6)).await;

    session.open_create_note_collection().unwrap();
    session.note_collection_form_mut().unwrap().title = "Work".to_string();
    session.confirm_note_collection_dialog().await.unwrap();

    // The first message's timer would have fired here.
    tokio::time::sleep(Duration::from_secs(6)).await;
    let current = session.notification();
    assert!(current.visible);
    assert_eq!(current.text, "NoteCollection created successfully!");

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!session.notification().visible);
}

#[tokio::test(start_paused = true)]
async fn expiry_window_comes_from_config() {
    let config = ClientConfig::from_json_str(r#"{"notification":{"expiry_ms":500}}"#).unwrap();
    let mut session = session_with(config);
    let mut changes = session.subscribe_notifications();

    create_note(&mut session, "quick").await;
    changes.changed().await.unwrap();
    assert!(changes.borrow_and_update().visible);

    tokio::time::sleep(Duration::from_millis(501)).await;
    assert!(!session.notification().visible);
}

#[tokio::test]
async fn unreachable_backend_reports_diagnostics() {
    let session = session();
    assert_eq!(session.check_connection().await, ConnectionStatus::Connected);

    session
        .gateway()
        .fail(common::Op::Health, 503, "service unavailable");
    match session.check_connection().await {
        ConnectionStatus::Unreachable(report) => {
            assert_eq!(report.code, Some(503));
            assert_eq!(report.method, Method::Get);
            let labels: Vec<_> = report.rows().into_iter().map(|(label, _)| label).collect();
            assert_eq!(labels, ["Message", "Code", "Method", "Base URL", "URL"]);
        }
        other => panic!("expected unreachable, got {other:?}"),
    }
}
