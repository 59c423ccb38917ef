//! `littera block add|list|show|set-text|move|delete`.
//!
//! Prose always passes through the canonical parser/serializer on the way
//! in, so stored `source_text` is the serializer's fixed point.

use crate::cli::BlockCommands;
use crate::commands::support::{resolve_block_global, resolve_section_global};
use crate::output::{preview, CliError, CliResult, OutputCtx};
use littera_core::db::open_work_db;
use littera_core::editor::markdown;
use littera_core::model::hierarchy::Block;
use littera_core::repo::block_repo::{BlockRepository, PgBlockRepository};
use littera_core::repo::mention_repo::{MentionRepository, PgMentionRepository};

pub fn run(ctx: &OutputCtx, command: BlockCommands) -> CliResult<()> {
    let mut db = open_work_db()?;
    let client = db.client();

    match command {
        BlockCommands::Add {
            section,
            text,
            lang,
        } => {
            let section = resolve_section_global(client, &section)?;
            // Canonicalize on the way in: stored text is always the
            // serializer's output.
            let canonical = markdown::serialize(&markdown::parse(&text));
            let block = Block::new(section.id, lang.clone(), canonical);

            if ctx.dry_run {
                println!("Would add block ({lang}) to '{}'", section_title(&section));
                return Ok(());
            }
            let id = PgBlockRepository::new(client).create_block(&block)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "id": id, "language": lang }));
            } else {
                println!("✓ Block added ({lang})");
            }
            Ok(())
        }

        BlockCommands::List { section } => {
            let section = resolve_section_global(client, &section)?;
            let blocks = PgBlockRepository::new(client).list_blocks(section.id)?;
            if ctx.json {
                let rows: Vec<_> = blocks
                    .iter()
                    .map(|block| {
                        serde_json::json!({
                            "id": block.id,
                            "block_type": block.kind,
                            "language": block.language,
                            "source_text": block.source_text,
                            "order_index": block.order_index,
                        })
                    })
                    .collect();
                ctx.emit_json(&rows);
                return Ok(());
            }
            if blocks.is_empty() {
                println!("No blocks in '{}' yet.", section_title(&section));
                return Ok(());
            }
            println!("Blocks in '{}':", section_title(&section));
            for (index, block) in blocks.iter().enumerate() {
                println!(
                    "[{}] ({}) {}",
                    index + 1,
                    block.language,
                    preview(&block.source_text, 60)
                );
            }
            Ok(())
        }

        BlockCommands::Show { block } => {
            let block = resolve_block_global(client, &block)?;
            let mentions = PgMentionRepository::new(client).list_by_block(block.id)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({
                    "id": block.id,
                    "section_id": block.section_id,
                    "block_type": block.kind,
                    "language": block.language,
                    "source_text": block.source_text,
                    "mentions": mentions.len(),
                }));
                return Ok(());
            }
            println!("Block ({})", block.language);
            println!("  id: {}", block.id);
            if !mentions.is_empty() {
                println!("  mentions: {}", mentions.len());
            }
            println!("\n{}", block.source_text);
            Ok(())
        }

        BlockCommands::SetText { block, text } => {
            let block = resolve_block_global(client, &block)?;
            let canonical = markdown::serialize(&markdown::parse(&text));
            if ctx.dry_run {
                println!("Would update block {} ({})", block.id, block.language);
                return Ok(());
            }
            PgBlockRepository::new(client).update_source_text(block.id, &canonical)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "updated": block.id }));
            } else {
                println!("✓ Block updated ({})", block.language);
            }
            Ok(())
        }

        BlockCommands::Move { block, position } => {
            let block = resolve_block_global(client, &block)?;
            if ctx.dry_run {
                println!("Would move block {} to position {position}", block.id);
                return Ok(());
            }
            PgBlockRepository::new(client).move_block(block.id, position)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "moved": block.id, "position": position }));
            } else {
                println!("✓ Block moved → position {position}");
            }
            Ok(())
        }

        BlockCommands::Delete { block } => {
            let block = resolve_block_global(client, &block)?;
            let mentions = PgMentionRepository::new(client).list_by_block(block.id)?;

            if ctx.dry_run {
                println!(
                    "Would delete block {} (cascading {} mention(s))",
                    block.id,
                    mentions.len()
                );
                return Ok(());
            }

            if !mentions.is_empty() && !ctx.force {
                return Err(CliError::invariant(format!(
                    "block has {} mention(s); re-run with --force to cascade",
                    mentions.len()
                )));
            }

            PgBlockRepository::new(client).delete_block(block.id)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({
                    "deleted": block.id,
                    "cascaded_mentions": mentions.len(),
                }));
            } else {
                println!(
                    "✓ Block deleted: ({}) {}",
                    block.language,
                    preview(&block.source_text, 40)
                );
            }
            Ok(())
        }
    }
}

fn section_title(section: &littera_core::model::hierarchy::Section) -> &str {
    section.title.as_deref().unwrap_or("Untitled")
}
