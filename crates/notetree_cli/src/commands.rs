use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "notetree")]
#[command(version, about = "Notes organized in collections, driven from the terminal")]
#[command(propagate_version = true)]
pub struct Cli {
    /// SQLite database file (in-memory when omitted)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// JSON client config
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check core linkage and backend reachability
    Ping,

    /// Print collections and unfiled notes
    Tree {
        /// Show members of every collection
        #[arg(long)]
        expand_all: bool,
    },

    /// Create, edit, move or delete notes
    Note(NoteCommand),

    /// Create, rename or delete note collections
    Collection(CollectionCommand),
}

#[derive(Args, Debug)]
pub struct NoteCommand {
    #[command(subcommand)]
    pub action: NoteAction,
}

#[derive(Subcommand, Debug)]
pub enum NoteAction {
    /// Add a new note
    Add {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        content: String,

        /// Collection to file the note under
        #[arg(long, value_name = "ID")]
        collection: Option<String>,
    },

    /// Change a note's title or content
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        content: Option<String>,
    },

    /// Move a note into a collection, or unfile it
    Move {
        id: String,

        /// Target collection; the note becomes unfiled when omitted
        #[arg(long, value_name = "ID")]
        to: Option<String>,
    },

    /// Delete a note
    Rm { id: String },
}

#[derive(Args, Debug)]
pub struct CollectionCommand {
    #[command(subcommand)]
    pub action: CollectionAction,
}

#[derive(Subcommand, Debug)]
pub enum CollectionAction {
    /// Add a new collection
    Add {
        #[arg(long)]
        title: String,

        /// Notes to move into the collection (can be specified multiple times)
        #[arg(long = "note", short = 'n', value_name = "ID")]
        notes: Vec<String>,
    },

    /// Rename a collection
    Rename {
        id: String,

        #[arg(long)]
        title: String,
    },

    /// Delete a collection
    Rm {
        id: String,

        /// Delete member notes instead of unfiling them
        #[arg(long)]
        cascade: bool,
    },
}
