//! `littera export json|markdown` and `littera import json`.

use crate::cli::{ExportCommands, ImportCommands};
use crate::output::{CliError, CliResult, OutputCtx};
use littera_core::db::open_work_db;
use littera_core::io::{export_markdown, export_work, import_work, WorkExport};
use std::path::PathBuf;

pub fn run_export(ctx: &OutputCtx, command: ExportCommands) -> CliResult<()> {
    let mut db = open_work_db()?;
    let client = db.client();

    match command {
        ExportCommands::Json { output } => {
            let export = export_work(client)?;
            let text = serde_json::to_string_pretty(&export)?;
            write_or_print(ctx, output, &text)
        }
        ExportCommands::Markdown { output } => {
            let text = export_markdown(client)?;
            write_or_print(ctx, output, &text)
        }
    }
}

pub fn run_import(ctx: &OutputCtx, command: ImportCommands) -> CliResult<()> {
    match command {
        ImportCommands::Json { file } => {
            if !file.exists() {
                return Err(CliError::not_found(format!(
                    "file not found: {}",
                    file.display()
                )));
            }
            let raw = std::fs::read_to_string(&file)?;
            let data: WorkExport = serde_json::from_str(&raw)?;

            if ctx.dry_run {
                let body = data.work.as_ref();
                if ctx.json {
                    ctx.emit_json(&serde_json::json!({
                        "dry_run": true,
                        "action": "import json",
                        "documents": body.map(|work| work.documents.len()).unwrap_or(0),
                        "entities": body.map(|work| work.entities.len()).unwrap_or(0),
                    }));
                } else {
                    println!(
                        "Would import {} document(s) and {} entit(ies)",
                        body.map(|work| work.documents.len()).unwrap_or(0),
                        body.map(|work| work.entities.len()).unwrap_or(0)
                    );
                }
                return Ok(());
            }

            let mut db = open_work_db()?;
            let counts = import_work(db.client(), &data)?;

            if ctx.json {
                ctx.emit_json(&counts);
                return Ok(());
            }
            let mut parts: Vec<String> = Vec::new();
            for (count, what) in [
                (counts.documents, "documents"),
                (counts.sections, "sections"),
                (counts.blocks, "blocks"),
                (counts.entities, "entities"),
                (counts.labels, "labels"),
                (counts.mentions, "mentions"),
                (counts.alignments, "alignments"),
                (counts.reviews, "reviews"),
            ] {
                if count > 0 {
                    parts.push(format!("{count} {what}"));
                }
            }
            let summary = if parts.is_empty() {
                "nothing".to_string()
            } else {
                parts.join(", ")
            };
            println!("Imported: {summary}");
            Ok(())
        }
    }
}

fn write_or_print(ctx: &OutputCtx, output: Option<PathBuf>, text: &str) -> CliResult<()> {
    match output {
        Some(path) => {
            std::fs::write(&path, text)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "exported": path.display().to_string() }));
            } else {
                println!("Exported to {}", path.display());
            }
        }
        None => println!("{text}"),
    }
    Ok(())
}
