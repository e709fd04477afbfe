//! Subcommand handlers. Every mutation goes through the session's dialog
//! protocol: open, fill the form, confirm.

use crate::commands::{CollectionAction, Commands, NoteAction};
use log::info;
use notetree_core::logging::LoggingError;
use notetree_core::{
    ClientConfig, CollectionDeletePolicy, ConfigError, ConnectionStatus, DbError, DialogError,
    DialogMode, DialogResult, Gateway, MutationOutcome, NoteCollectionId, NoteId, NoteRow,
    Session, SqliteGateway, StoreError, TreeRow,
};
use std::path::Path;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Dialog(#[from] DialogError),
    #[error("nothing to change")]
    NothingToChange,
}

pub fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    match path {
        Some(path) => Ok(ClientConfig::load(path)?),
        None => Ok(ClientConfig::default()),
    }
}

pub async fn run(db: Option<&Path>, mut config: ClientConfig, command: Commands) -> Result<()> {
    notetree_core::init_from_config(&config.logging)?;

    if let Commands::Collection(cmd) = &command {
        if let CollectionAction::Rm { cascade: true, .. } = cmd.action {
            config.collections.delete_policy = CollectionDeletePolicy::Cascade;
        }
    }

    let gateway = match db {
        Some(path) => SqliteGateway::open(path)?,
        None => SqliteGateway::open_in_memory()?,
    };
    let mut session = Session::new(gateway, config);
    info!("event=cli_start module=cli status=ok");

    match command {
        Commands::Ping => handle_ping(&session).await,
        Commands::Tree { expand_all } => handle_tree(&mut session, expand_all).await,
        Commands::Note(cmd) => {
            session.refresh().await?;
            handle_note(&mut session, cmd.action).await
        }
        Commands::Collection(cmd) => {
            session.refresh().await?;
            handle_collection(&mut session, cmd.action).await
        }
    }
}

async fn handle_ping(session: &Session<SqliteGateway>) -> Result<()> {
    println!("notetree_core ping={}", notetree_core::ping());
    println!("notetree_core version={}", notetree_core::core_version());
    match session.check_connection().await {
        ConnectionStatus::Connected => {
            println!("backend={} status=connected", session.gateway().base_url());
        }
        ConnectionStatus::Unreachable(report) => {
            println!("backend={} status=unreachable", session.gateway().base_url());
            for (label, value) in report.rows() {
                println!("  {label}: {value}");
            }
        }
    }
    Ok(())
}

async fn handle_tree(session: &mut Session<SqliteGateway>, expand_all: bool) -> Result<()> {
    session.refresh().await?;
    if session.is_empty() {
        println!("No notes or collections yet.");
        return Ok(());
    }
    if expand_all {
        session.expand_all();
    }

    for row in session.tree() {
        match row {
            TreeRow::Collection {
                collection,
                expanded,
                summary,
                children,
            } => {
                let marker = if expanded { "[-]" } else { "[+]" };
                if summary.is_empty() {
                    println!("{marker} {} ({})", collection.title, collection.id);
                } else {
                    println!("{marker} {} ({}) - {summary}", collection.title, collection.id);
                }
                for child in children {
                    print_note_row(&child, "    ");
                }
            }
            TreeRow::Note(row) => print_note_row(&row, "- "),
        }
    }
    Ok(())
}

fn print_note_row(row: &NoteRow<'_>, bullet: &str) {
    println!("{bullet}{} ({})", row.note.title, row.note.id);
    if let Some(preview) = &row.preview {
        println!("{}  {preview}", " ".repeat(bullet.len()));
    }
}

async fn handle_note(session: &mut Session<SqliteGateway>, action: NoteAction) -> Result<()> {
    match action {
        NoteAction::Add {
            title,
            content,
            collection,
        } => {
            session.open_create_note()?;
            let form = session.note_form_mut()?;
            form.title = title;
            form.content = content;
            form.note_collection_id = collection.map(NoteCollectionId::new);
        }
        NoteAction::Edit { id, title, content } => {
            session.open_update_note(&NoteId::new(id))?;
            let form = session.note_form_mut()?;
            if let Some(title) = title {
                form.title = title;
            }
            if let Some(content) = content {
                form.content = content;
            }
        }
        NoteAction::Move { id, to } => {
            session.open_update_note(&NoteId::new(id))?;
            session.note_form_mut()?.note_collection_id = to.map(NoteCollectionId::new);
        }
        NoteAction::Rm { id } => session.open_delete_note(&NoteId::new(id))?,
    }

    let result = session.confirm_note_dialog().await;
    print_outcome(session, result)
}

async fn handle_collection(
    session: &mut Session<SqliteGateway>,
    action: CollectionAction,
) -> Result<()> {
    match action {
        CollectionAction::Add { title, notes } => {
            session.open_create_note_collection()?;
            let form = session.note_collection_form_mut()?;
            form.title = title;
            form.note_ids = notes.into_iter().map(NoteId::new).collect();
        }
        CollectionAction::Rename { id, title } => {
            session.open_update_note_collection(&NoteCollectionId::new(id))?;
            session.note_collection_form_mut()?.title = title;
        }
        CollectionAction::Rm { id, .. } => {
            session.open_delete_note_collection(&NoteCollectionId::new(id))?;
        }
    }

    let result = session.confirm_note_collection_dialog().await;
    print_outcome(session, result)
}

fn print_outcome(
    session: &Session<SqliteGateway>,
    result: DialogResult<MutationOutcome<DialogMode>>,
) -> Result<()> {
    match result {
        Ok(MutationOutcome::Applied(_)) => {
            println!("{}", session.notification().text);
            Ok(())
        }
        Ok(MutationOutcome::Superseded) => Ok(()),
        Ok(MutationOutcome::Skipped) => Err(CliError::NothingToChange),
        Err(err) => {
            if let Some(report) = err.failure_report() {
                for (label, value) in report.rows() {
                    eprintln!("{label}: {value}");
                }
            }
            Err(err.into())
        }
    }
}
