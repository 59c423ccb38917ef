//! `littera alignment add|list|delete|gaps`.

use crate::cli::AlignmentCommands;
use crate::commands::support::resolve_block_global;
use crate::output::{preview, CliError, CliResult, OutputCtx};
use littera_core::db::open_work_db;
use littera_core::model::derived::BlockAlignment;
use littera_core::repo::alignment_repo::{AlignmentRepository, PgAlignmentRepository};
use uuid::Uuid;

pub fn run(ctx: &OutputCtx, command: AlignmentCommands) -> CliResult<()> {
    let mut db = open_work_db()?;
    let client = db.client();

    match command {
        AlignmentCommands::Add {
            source_block,
            target_block,
            r#type,
        } => {
            let source = resolve_block_global(client, &source_block)?;
            let target = resolve_block_global(client, &target_block)?;
            let alignment = BlockAlignment::new(source.id, target.id, r#type);

            if ctx.dry_run {
                println!(
                    "Would align ({}) \"{}\" ↔ ({}) \"{}\"",
                    source.language,
                    preview(&source.source_text, 40),
                    target.language,
                    preview(&target.source_text, 40)
                );
                return Ok(());
            }

            let id = PgAlignmentRepository::new(client).create_alignment(&alignment)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({
                    "id": id,
                    "source_block_id": source.id,
                    "target_block_id": target.id,
                }));
            } else {
                println!(
                    "✓ Alignment added: ({}) \"{}\" ↔ ({}) \"{}\"",
                    source.language,
                    preview(&source.source_text, 40),
                    target.language,
                    preview(&target.source_text, 40)
                );
            }
            Ok(())
        }

        AlignmentCommands::List { block } => {
            let block_id = block
                .map(|selector| resolve_block_global(client, &selector).map(|block| block.id))
                .transpose()?;
            let alignments = PgAlignmentRepository::new(client).list_alignments(block_id)?;

            if ctx.json {
                let rows: Vec<_> = alignments
                    .iter()
                    .map(|aligned| {
                        serde_json::json!({
                            "id": aligned.alignment.id,
                            "source_block_id": aligned.alignment.source_block_id,
                            "source_language": aligned.source_language,
                            "target_block_id": aligned.alignment.target_block_id,
                            "target_language": aligned.target_language,
                            "alignment_type": aligned.alignment.alignment_type,
                        })
                    })
                    .collect();
                ctx.emit_json(&rows);
                return Ok(());
            }
            if alignments.is_empty() {
                println!("No alignments yet.");
                return Ok(());
            }
            println!("Alignments:");
            for (index, aligned) in alignments.iter().enumerate() {
                println!(
                    "[{}] ({}) \"{}\" ↔ ({}) \"{}\" [{}]",
                    index + 1,
                    aligned.source_language,
                    preview(&aligned.source_text, 40),
                    aligned.target_language,
                    preview(&aligned.target_text, 40),
                    aligned.alignment.alignment_type
                );
            }
            Ok(())
        }

        AlignmentCommands::Delete { selector } => {
            let aligned = resolve_alignment(client, &selector)?;
            if ctx.dry_run {
                println!("Would delete alignment {}", aligned.0);
                return Ok(());
            }
            PgAlignmentRepository::new(client).delete_alignment(aligned.0)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "deleted": aligned.0 }));
            } else {
                println!("✓ Alignment deleted: {}", aligned.1);
            }
            Ok(())
        }

        AlignmentCommands::Gaps { block } => {
            let block_id = block
                .map(|selector| resolve_block_global(client, &selector).map(|block| block.id))
                .transpose()?;
            let gaps = PgAlignmentRepository::new(client).label_gaps(block_id)?;

            if ctx.json {
                ctx.emit_json(&gaps);
                return Ok(());
            }
            if gaps.is_empty() {
                println!("No gaps found.");
                return Ok(());
            }
            for gap in &gaps {
                println!(
                    "{} \"{}\" — no label for {}",
                    gap.entity_type, gap.canonical_label, gap.missing_language
                );
                println!(
                    "  → littera entity label add \"{}\" {} <base_form>",
                    gap.canonical_label, gap.missing_language
                );
            }
            println!("\n{} gap(s) found.", gaps.len());
            Ok(())
        }
    }
}

/// Resolves an alignment selector to `(id, description)`.
fn resolve_alignment(client: &mut postgres::Client, selector: &str) -> CliResult<(Uuid, String)> {
    let alignments = PgAlignmentRepository::new(client).list_alignments(None)?;

    if let Ok(index) = selector.parse::<usize>() {
        if index >= 1 && index <= alignments.len() {
            let aligned = &alignments[index - 1];
            return Ok((aligned.alignment.id, describe(aligned)));
        }
        return Err(CliError::invalid(format!(
            "invalid alignment index: {selector} (have {})",
            alignments.len()
        )));
    }

    if let Ok(id) = Uuid::parse_str(selector) {
        if let Some(aligned) = alignments.iter().find(|aligned| aligned.alignment.id == id) {
            return Ok((aligned.alignment.id, describe(aligned)));
        }
    }
    Err(CliError::not_found(format!(
        "alignment not found: {selector}"
    )))
}

fn describe(aligned: &littera_core::repo::alignment_repo::AlignmentWithBlocks) -> String {
    format!(
        "({}) \"{}\" ↔ ({}) \"{}\"",
        aligned.source_language,
        preview(&aligned.source_text, 40),
        aligned.target_language,
        preview(&aligned.target_text, 40)
    )
}
