//! `notetree` command-line entry point.
//!
//! # Responsibility
//! - Parse arguments and load the optional client config.
//! - Drive one `Session` against the local SQLite gateway per invocation.

mod commands;
mod handlers;

use clap::Parser;
use commands::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let result = match handlers::load_config(cli.config.as_deref()) {
        Ok(config) => handlers::run(cli.db.as_deref(), config, cli.command).await,
        Err(err) => Err(err),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
