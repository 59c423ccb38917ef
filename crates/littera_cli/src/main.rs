//! The `littera` command: the authoritative command surface.
//!
//! # Responsibility
//! - Parse noun/verb commands and dispatch to `littera_core`.
//! - Map the error taxonomy to exit codes and deterministic output.
//!
//! This crate contains no business logic.

mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use output::OutputCtx;

fn main() {
    let cli = Cli::parse();

    // Logging is routed into the work's `.littera/logs/` by whichever
    // command resolves a work first; nothing to set up here.
    let ctx = OutputCtx {
        json: cli.json,
        dry_run: cli.dry_run,
        force: cli.force,
    };

    let result = match cli.command {
        Commands::Init { path, port } => commands::init::run(&ctx, path, port),
        Commands::Status => commands::status::run(&ctx),
        Commands::Work { command } => commands::work::run(&ctx, command),
        Commands::Doc { command } => commands::doc::run(&ctx, command),
        Commands::Section { command } => commands::section::run(&ctx, command),
        Commands::Block { command } => commands::block::run(&ctx, command),
        Commands::Entity { command } => commands::entity::run(&ctx, command),
        Commands::Mention { command } => commands::mention::run(&ctx, command),
        Commands::Alignment { command } => commands::alignment::run(&ctx, command),
        Commands::Review { command } => commands::review::run(&ctx, command),
        Commands::Export { command } => commands::io::run_export(&ctx, command),
        Commands::Import { command } => commands::io::run_import(&ctx, command),
        Commands::Db { command } => commands::db::run(&ctx, command),
        Commands::Inflect(args) => commands::inflect::run(&ctx, args),
    };

    if let Err(err) = result {
        if ctx.json {
            let payload = serde_json::json!({
                "error": {
                    "code": err.kind.code(),
                    "message": err.message,
                }
            });
            eprintln!("{}", serde_json::to_string_pretty(&payload).expect("error serializes"));
        } else {
            eprintln!("{}", err.message);
        }
        std::process::exit(err.kind.exit_code());
    }
}
