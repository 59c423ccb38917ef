//! `littera doc add|list|show|set|move|delete`.

use crate::cli::DocCommands;
use crate::commands::support::{require_work, resolve_document};
use crate::output::{CliError, CliResult, OutputCtx};
use littera_core::db::open_work_db;
use littera_core::model::hierarchy::Document;
use littera_core::repo::document_repo::{DocumentPatch, DocumentRepository, PgDocumentRepository};
use littera_core::repo::section_repo::SectionRepository;

pub fn run(ctx: &OutputCtx, command: DocCommands) -> CliResult<()> {
    let mut db = open_work_db()?;
    let client = db.client();

    match command {
        DocCommands::Add { title } => {
            let work = require_work(client)?;
            let document = Document::new(work.id, Some(title.clone()));
            if ctx.dry_run {
                println!("Would add document '{title}'");
                return Ok(());
            }
            let id = PgDocumentRepository::new(client).create_document(&document)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "id": id, "title": title }));
            } else {
                println!("✓ Document added: {title}");
            }
            Ok(())
        }

        DocCommands::List => {
            let work = require_work(client)?;
            let documents = PgDocumentRepository::new(client).list_documents(work.id)?;
            if ctx.json {
                let rows: Vec<_> = documents
                    .iter()
                    .map(|document| {
                        serde_json::json!({
                            "id": document.id,
                            "title": document.title,
                            "order_index": document.order_index,
                        })
                    })
                    .collect();
                ctx.emit_json(&rows);
                return Ok(());
            }
            if documents.is_empty() {
                println!("No documents yet.");
                return Ok(());
            }
            println!("Documents:");
            for (index, document) in documents.iter().enumerate() {
                println!(
                    "[{}] {}",
                    index + 1,
                    document.title.as_deref().unwrap_or("Untitled")
                );
            }
            Ok(())
        }

        DocCommands::Show { document } => {
            let document = resolve_document(client, &document)?;
            let section_count = PgDocumentRepository::new(client).section_count(document.id)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({
                    "id": document.id,
                    "title": document.title,
                    "order_index": document.order_index,
                    "sections": section_count,
                }));
            } else {
                println!(
                    "Document: {}",
                    document.title.as_deref().unwrap_or("Untitled")
                );
                println!("  id: {}", document.id);
                println!("  sections: {section_count}");
            }
            Ok(())
        }

        DocCommands::Set { document, title } => {
            let document = resolve_document(client, &document)?;
            if title.is_none() {
                return Err(CliError::invalid("nothing to update"));
            }
            if ctx.dry_run {
                println!("Would update document {}", document.id);
                return Ok(());
            }
            let patch = DocumentPatch {
                title,
                metadata: None,
            };
            PgDocumentRepository::new(client).update_document(document.id, &patch)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "updated": document.id }));
            } else {
                println!("✓ Document updated");
            }
            Ok(())
        }

        DocCommands::Move { document, position } => {
            let document = resolve_document(client, &document)?;
            if ctx.dry_run {
                println!("Would move document {} to position {position}", document.id);
                return Ok(());
            }
            PgDocumentRepository::new(client).move_document(document.id, position)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "moved": document.id, "position": position }));
            } else {
                println!(
                    "✓ Document moved: {} → position {position}",
                    document.title.as_deref().unwrap_or("Untitled")
                );
            }
            Ok(())
        }

        DocCommands::Delete { document } => {
            let document = resolve_document(client, &document)?;
            let section_count = PgDocumentRepository::new(client).section_count(document.id)?;

            if ctx.dry_run {
                println!(
                    "Would delete document {} (cascading {section_count} section(s))",
                    document.id
                );
                return Ok(());
            }

            if section_count > 0 && !ctx.force {
                let sections = littera_core::repo::section_repo::PgSectionRepository::new(client)
                    .list_sections(document.id)?;
                let titles: Vec<String> = sections
                    .iter()
                    .map(|section| section.title.clone().unwrap_or_else(|| section.id.to_string()))
                    .collect();
                return Err(CliError::invariant(format!(
                    "document has {section_count} section(s): {}; re-run with --force to cascade",
                    titles.join(", ")
                )));
            }

            PgDocumentRepository::new(client).delete_document(document.id)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({
                    "deleted": document.id,
                    "cascaded_sections": section_count,
                }));
            } else {
                let suffix = if section_count > 0 {
                    format!(" (cascaded: {section_count} section(s))")
                } else {
                    String::new()
                };
                println!(
                    "✓ Document deleted: {}{suffix}",
                    document.title.as_deref().unwrap_or("Untitled")
                );
            }
            Ok(())
        }
    }
}
