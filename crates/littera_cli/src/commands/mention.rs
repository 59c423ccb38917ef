//! `littera mention add|list|delete`.
//!
//! A mention's language defaults to its block's language. A differing
//! language is allowed and reported as a warning, never an error.

use crate::cli::MentionCommands;
use crate::commands::support::{
    parse_pairs, resolve_block_global, resolve_entity, resolve_entity_by_type_name,
};
use crate::output::{preview, CliError, CliResult, OutputCtx};
use littera_core::db::open_work_db;
use littera_core::model::semantic::Mention;
use littera_core::repo::mention_repo::{MentionRepository, PgMentionRepository};
use uuid::Uuid;

pub fn run(ctx: &OutputCtx, command: MentionCommands) -> CliResult<()> {
    let mut db = open_work_db()?;
    let client = db.client();

    match command {
        MentionCommands::Add {
            block,
            entity_type,
            name,
            lang,
            surface,
            features,
        } => {
            let block = resolve_block_global(client, &block)?;
            let entity = resolve_entity_by_type_name(client, &entity_type, &name)?;
            let language = lang.unwrap_or_else(|| block.language.clone());

            let mut mention = Mention::new(block.id, entity.id, language.clone());
            mention.surface_form = surface;
            mention.features = parse_pairs(&features)?;

            if ctx.dry_run {
                println!("Would add mention: block → {entity_type} {name} ({language})");
                return Ok(());
            }

            let created = PgMentionRepository::new(client).create_mention(&mention)?;
            let warning = (created.block_language != language).then(|| {
                format!(
                    "mention language `{language}` differs from block language `{}`",
                    created.block_language
                )
            });

            if ctx.json {
                ctx.emit_json(&serde_json::json!({
                    "id": created.id,
                    "block_id": block.id,
                    "entity_id": entity.id,
                    "language": language,
                    "warning": warning,
                }));
            } else {
                println!("✓ Mention added: block → {entity_type} {name}");
                if let Some(warning) = warning {
                    println!("  warning: {warning}");
                }
            }
            Ok(())
        }

        MentionCommands::List { block, entity } => {
            if block.is_some() && entity.is_some() {
                return Err(CliError::invalid(
                    "--block and --entity are mutually exclusive",
                ));
            }

            if let Some(selector) = entity {
                let entity = resolve_entity(client, &selector)?;
                let mentions = PgMentionRepository::new(client).list_by_entity(entity.id)?;
                if ctx.json {
                    ctx.emit_json(&mentions);
                    return Ok(());
                }
                if mentions.is_empty() {
                    println!("No mentions of {}.", entity.canonical_label);
                    return Ok(());
                }
                println!("Mentions of {}:", entity.canonical_label);
                for (index, mention) in mentions.iter().enumerate() {
                    println!(
                        "[{}] block {} ({})",
                        index + 1,
                        mention.block_id,
                        mention.language
                    );
                }
                return Ok(());
            }

            let mentions = match block {
                Some(selector) => {
                    let block = resolve_block_global(client, &selector)?;
                    PgMentionRepository::new(client).list_by_block(block.id)?
                }
                None => PgMentionRepository::new(client).list_all()?,
            };

            if ctx.json {
                let rows: Vec<_> = mentions
                    .iter()
                    .map(|item| {
                        serde_json::json!({
                            "id": item.mention.id,
                            "block_id": item.mention.block_id,
                            "entity_id": item.mention.entity_id,
                            "entity_type": item.entity_type,
                            "label": item.canonical_label,
                            "language": item.mention.language,
                        })
                    })
                    .collect();
                ctx.emit_json(&rows);
                return Ok(());
            }
            if mentions.is_empty() {
                println!("No mentions yet.");
                return Ok(());
            }
            println!("Mentions:");
            for (index, item) in mentions.iter().enumerate() {
                println!(
                    "[{}] → {}: {} ({})",
                    index + 1,
                    item.entity_type,
                    item.canonical_label,
                    item.mention.language
                );
            }
            Ok(())
        }

        MentionCommands::Delete { selector } => {
            let mention = resolve_mention(client, &selector)?;
            if ctx.dry_run {
                println!("Would delete mention {}", mention.0);
                return Ok(());
            }
            PgMentionRepository::new(client).delete_mention(mention.0)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "deleted": mention.0 }));
            } else {
                println!("✓ Mention deleted: → {}", preview(&mention.1, 40));
            }
            Ok(())
        }
    }
}

/// Resolves a mention selector to `(id, description)`.
fn resolve_mention(client: &mut postgres::Client, selector: &str) -> CliResult<(Uuid, String)> {
    let mentions = PgMentionRepository::new(client).list_all()?;

    if let Ok(index) = selector.parse::<usize>() {
        if index >= 1 && index <= mentions.len() {
            let item = &mentions[index - 1];
            return Ok((
                item.mention.id,
                format!("{}: {}", item.entity_type, item.canonical_label),
            ));
        }
        return Err(CliError::invalid(format!(
            "invalid mention index: {selector} (have {})",
            mentions.len()
        )));
    }

    if let Ok(id) = Uuid::parse_str(selector) {
        if let Some(item) = mentions.iter().find(|item| item.mention.id == id) {
            return Ok((
                item.mention.id,
                format!("{}: {}", item.entity_type, item.canonical_label),
            ));
        }
    }
    Err(CliError::not_found(format!("mention not found: {selector}")))
}
