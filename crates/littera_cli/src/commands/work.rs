//! `littera work show|set|delete`.

use crate::cli::WorkCommands;
use crate::commands::support::require_work;
use crate::output::{CliError, CliResult, OutputCtx};
use littera_core::db::open_work_db;
use littera_core::repo::document_repo::{DocumentRepository, PgDocumentRepository};
use littera_core::repo::work_repo::{PgWorkRepository, WorkPatch, WorkRepository};

pub fn run(ctx: &OutputCtx, command: WorkCommands) -> CliResult<()> {
    let mut db = open_work_db()?;
    let client = db.client();

    match command {
        WorkCommands::Show => {
            let work = require_work(client)?;
            if ctx.json {
                ctx.emit_json(&work);
            } else {
                println!("Work: {}", work.title.as_deref().unwrap_or("Untitled"));
                println!("  id: {}", work.id);
                println!("  default language: {}", work.default_language);
                if let Some(description) = &work.description {
                    println!("  description: {description}");
                }
            }
            Ok(())
        }

        WorkCommands::Set {
            title,
            description,
            language,
        } => {
            let work = require_work(client)?;
            if title.is_none() && description.is_none() && language.is_none() {
                return Err(CliError::invalid("nothing to update"));
            }
            let patch = WorkPatch {
                title,
                description,
                default_language: language,
                metadata: None,
            };
            if ctx.dry_run {
                println!("Would update work {}", work.id);
                return Ok(());
            }
            PgWorkRepository::new(client).update_work(work.id, &patch)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "updated": work.id }));
            } else {
                println!("✓ Work updated");
            }
            Ok(())
        }

        WorkCommands::Delete => {
            let work = require_work(client)?;
            let counts = PgWorkRepository::new(client).descendant_counts(work.id)?;

            if ctx.dry_run {
                if ctx.json {
                    ctx.emit_json(&serde_json::json!({
                        "dry_run": true,
                        "action": "work delete",
                        "would_delete": counts,
                    }));
                } else {
                    println!(
                        "Would delete work {} with {} document(s), {} section(s), {} block(s)",
                        work.id, counts.documents, counts.sections, counts.blocks
                    );
                }
                return Ok(());
            }

            if counts.documents > 0 && !ctx.force {
                let documents = PgDocumentRepository::new(client).list_documents(work.id)?;
                let titles: Vec<String> = documents
                    .iter()
                    .map(|document| document.title.clone().unwrap_or_else(|| document.id.to_string()))
                    .collect();
                return Err(CliError::invariant(format!(
                    "work has {} document(s): {}; re-run with --force to cascade",
                    counts.documents,
                    titles.join(", ")
                )));
            }

            let deleted = PgWorkRepository::new(client).delete_work(work.id)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "deleted": work.id, "cascaded": deleted }));
            } else {
                println!(
                    "✓ Work deleted (cascaded: {} document(s), {} section(s), {} block(s))",
                    deleted.documents, deleted.sections, deleted.blocks
                );
            }
            Ok(())
        }
    }
}
