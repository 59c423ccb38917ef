//! `littera section add|list|set|move|delete`.

use crate::cli::SectionCommands;
use crate::commands::support::{resolve_document, resolve_section};
use crate::output::{CliError, CliResult, OutputCtx};
use littera_core::db::open_work_db;
use littera_core::model::hierarchy::Section;
use littera_core::repo::block_repo::BlockRepository;
use littera_core::repo::section_repo::{PgSectionRepository, SectionPatch, SectionRepository};

pub fn run(ctx: &OutputCtx, command: SectionCommands) -> CliResult<()> {
    let mut db = open_work_db()?;
    let client = db.client();

    match command {
        SectionCommands::Add {
            document,
            title,
            parent,
        } => {
            let document = resolve_document(client, &document)?;
            let parent_section = parent
                .map(|selector| resolve_section(client, document.id, &selector))
                .transpose()?;

            let mut section = Section::new(document.id, Some(title.clone()));
            section.parent_section_id = parent_section.map(|parent| parent.id);

            if ctx.dry_run {
                println!("Would add section '{title}'");
                return Ok(());
            }
            let id = PgSectionRepository::new(client).create_section(&section)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "id": id, "title": title }));
            } else {
                println!("✓ Section added: {title}");
            }
            Ok(())
        }

        SectionCommands::List { document } => {
            let document = resolve_document(client, &document)?;
            let sections = PgSectionRepository::new(client).list_sections(document.id)?;
            if ctx.json {
                let rows: Vec<_> = sections
                    .iter()
                    .map(|section| {
                        serde_json::json!({
                            "id": section.id,
                            "title": section.title,
                            "parent_section_id": section.parent_section_id,
                            "order_index": section.order_index,
                        })
                    })
                    .collect();
                ctx.emit_json(&rows);
                return Ok(());
            }
            if sections.is_empty() {
                println!(
                    "No sections in '{}' yet.",
                    document.title.as_deref().unwrap_or("Untitled")
                );
                return Ok(());
            }
            println!(
                "Sections in '{}':",
                document.title.as_deref().unwrap_or("Untitled")
            );
            for (index, section) in sections.iter().enumerate() {
                let nested = if section.parent_section_id.is_some() {
                    "  └ "
                } else {
                    ""
                };
                println!(
                    "[{}] {nested}{}",
                    index + 1,
                    section.title.as_deref().unwrap_or("Untitled")
                );
            }
            Ok(())
        }

        SectionCommands::Set {
            document,
            section,
            title,
        } => {
            let document = resolve_document(client, &document)?;
            let section = resolve_section(client, document.id, &section)?;
            if title.is_none() {
                return Err(CliError::invalid("nothing to update"));
            }
            if ctx.dry_run {
                println!("Would update section {}", section.id);
                return Ok(());
            }
            let patch = SectionPatch {
                title,
                metadata: None,
            };
            PgSectionRepository::new(client).update_section(section.id, &patch)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "updated": section.id }));
            } else {
                println!("✓ Section updated");
            }
            Ok(())
        }

        SectionCommands::Move {
            document,
            section,
            position,
        } => {
            let document = resolve_document(client, &document)?;
            let section = resolve_section(client, document.id, &section)?;
            if ctx.dry_run {
                println!("Would move section {} to position {position}", section.id);
                return Ok(());
            }
            PgSectionRepository::new(client).move_section(section.id, position)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "moved": section.id, "position": position }));
            } else {
                println!(
                    "✓ Section moved: {} → position {position}",
                    section.title.as_deref().unwrap_or("Untitled")
                );
            }
            Ok(())
        }

        SectionCommands::Delete { document, section } => {
            let document = resolve_document(client, &document)?;
            let section = resolve_section(client, document.id, &section)?;
            let block_count = PgSectionRepository::new(client).block_count(section.id)?;

            if ctx.dry_run {
                println!(
                    "Would delete section {} (cascading {block_count} block(s))",
                    section.id
                );
                return Ok(());
            }

            if block_count > 0 && !ctx.force {
                let blocks = littera_core::repo::block_repo::PgBlockRepository::new(client)
                    .list_blocks(section.id)?;
                let previews: Vec<String> = blocks
                    .iter()
                    .map(|block| format!("\"{}\"", crate::output::preview(&block.source_text, 30)))
                    .collect();
                return Err(CliError::invariant(format!(
                    "section has {block_count} block(s): {}; re-run with --force to cascade",
                    previews.join(", ")
                )));
            }

            PgSectionRepository::new(client).delete_section(section.id)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({
                    "deleted": section.id,
                    "cascaded_blocks": block_count,
                }));
            } else {
                let suffix = if block_count > 0 {
                    format!(" (cascaded: {block_count} block(s))")
                } else {
                    String::new()
                };
                println!(
                    "✓ Section deleted: {}{suffix}",
                    section.title.as_deref().unwrap_or("Untitled")
                );
            }
            Ok(())
        }
    }
}
