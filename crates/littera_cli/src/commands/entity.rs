//! `littera entity ...`: entities, properties, work notes, labels.

use crate::cli::{EntityCommands, LabelCommands, NoteCommands, PropertyCommands};
use crate::commands::support::{parse_pairs, resolve_entity};
use crate::output::{CliError, CliResult, OutputCtx};
use littera_core::db::open_work_db;
use littera_core::model::semantic::{Entity, EntityLabel};
use littera_core::repo::entity_repo::{
    EntityPatch, EntityRepository, LabelPatch, PgEntityRepository,
};
use postgres::Client;

pub fn run(ctx: &OutputCtx, command: EntityCommands) -> CliResult<()> {
    let mut db = open_work_db()?;
    let work_id = db.config.work.id;
    let client = db.client();

    match command {
        EntityCommands::Add { entity_type, name } => {
            let entity = Entity::new(entity_type.clone(), name.clone());
            if ctx.dry_run {
                println!("Would add entity: {entity_type} {name}");
                return Ok(());
            }
            let id = PgEntityRepository::new(client).create_entity(&entity)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({
                    "id": id,
                    "entity_type": entity_type,
                    "label": name,
                }));
            } else {
                println!("✓ Entity added: {entity_type} {name}");
            }
            Ok(())
        }

        EntityCommands::List => {
            let entities = PgEntityRepository::new(client).list_entities()?;
            if ctx.json {
                let rows: Vec<_> = entities
                    .iter()
                    .map(|entity| {
                        serde_json::json!({
                            "id": entity.id,
                            "entity_type": entity.entity_type,
                            "label": entity.canonical_label,
                            "status": entity.status,
                        })
                    })
                    .collect();
                ctx.emit_json(&rows);
                return Ok(());
            }
            if entities.is_empty() {
                println!("No entities yet.");
                return Ok(());
            }
            println!("Entities:");
            for (index, entity) in entities.iter().enumerate() {
                println!(
                    "[{}] {}: {}",
                    index + 1,
                    entity.entity_type,
                    entity.canonical_label
                );
            }
            Ok(())
        }

        EntityCommands::Show { entity } => {
            let entity = resolve_entity(client, &entity)?;
            let mut repo = PgEntityRepository::new(client);
            let labels = repo.list_labels(entity.id)?;
            let note = repo.get_work_note(entity.id, work_id)?;
            let mention_count = repo.mention_count(entity.id)?;

            if ctx.json {
                ctx.emit_json(&serde_json::json!({
                    "id": entity.id,
                    "entity_type": entity.entity_type,
                    "label": entity.canonical_label,
                    "status": entity.status,
                    "notes": entity.notes,
                    "properties": entity.properties,
                    "labels": labels,
                    "work_note": note,
                    "mentions": mention_count,
                }));
                return Ok(());
            }

            println!("Entity: {} {}", entity.entity_type, entity.canonical_label);
            if !labels.is_empty() {
                println!("\nLabels:");
                for label in &labels {
                    println!("  - {}: {}", label.language, label.base_form);
                    if !label.aliases.is_empty() {
                        println!("    aliases: {}", label.aliases.join(", "));
                    }
                }
            }
            if !entity.properties.is_empty() {
                println!("\nProperties:");
                for (key, value) in &entity.properties {
                    println!(
                        "  {key}: {}",
                        serde_json::to_string(value).unwrap_or_default()
                    );
                }
            }
            println!("\nNote (work-scoped):");
            println!("{}", note.as_deref().unwrap_or("(no note)"));
            println!("\nMentions: {mention_count}");
            Ok(())
        }

        EntityCommands::Set {
            entity,
            entity_type,
            label,
            status,
            notes,
        } => {
            let entity = resolve_entity(client, &entity)?;
            if entity_type.is_none() && label.is_none() && status.is_none() && notes.is_none() {
                return Err(CliError::invalid("nothing to update"));
            }
            if ctx.dry_run {
                println!("Would update entity {}", entity.id);
                return Ok(());
            }
            let patch = EntityPatch {
                entity_type,
                canonical_label: label,
                status,
                notes,
            };
            PgEntityRepository::new(client).update_entity(entity.id, &patch)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "updated": entity.id }));
            } else {
                println!("✓ Entity updated");
            }
            Ok(())
        }

        EntityCommands::Delete { entity } => {
            let entity = resolve_entity(client, &entity)?;
            let mention_count = PgEntityRepository::new(client).mention_count(entity.id)?;

            if ctx.dry_run {
                println!(
                    "Would delete entity {} (cascading {mention_count} mention(s))",
                    entity.id
                );
                return Ok(());
            }

            if mention_count > 0 && !ctx.force {
                return Err(CliError::invariant(format!(
                    "entity has {mention_count} mention(s); re-run with --force to cascade"
                )));
            }

            PgEntityRepository::new(client).delete_entity(entity.id)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({
                    "deleted": entity.id,
                    "cascaded_mentions": mention_count,
                }));
            } else {
                println!(
                    "✓ Entity deleted: {} {}",
                    entity.entity_type, entity.canonical_label
                );
            }
            Ok(())
        }

        EntityCommands::Property { command } => run_property(ctx, client, command),
        EntityCommands::Note { command } => run_note(ctx, client, work_id, command),
        EntityCommands::Label { command } => run_label(ctx, client, command),
    }
}

fn run_property(ctx: &OutputCtx, client: &mut Client, command: PropertyCommands) -> CliResult<()> {
    match command {
        PropertyCommands::Set { entity, pairs } => {
            let entity = resolve_entity(client, &entity)?;
            let updates = parse_pairs(&pairs)?;
            if ctx.dry_run {
                println!("Would set {} propert(ies) on {}", updates.len(), entity.id);
                return Ok(());
            }
            PgEntityRepository::new(client).set_properties(entity.id, &updates)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "updated": entity.id, "set": updates }));
            } else {
                println!("✓ Properties set on {}", entity.canonical_label);
            }
            Ok(())
        }

        PropertyCommands::List { entity } => {
            let entity = resolve_entity(client, &entity)?;
            if ctx.json {
                ctx.emit_json(&entity.properties);
                return Ok(());
            }
            if entity.properties.is_empty() {
                println!("No properties on {}.", entity.canonical_label);
                return Ok(());
            }
            println!("Properties of {}:", entity.canonical_label);
            for (key, value) in &entity.properties {
                println!(
                    "  {key}: {}",
                    serde_json::to_string(value).unwrap_or_default()
                );
            }
            Ok(())
        }

        PropertyCommands::Unset { entity, key } => {
            let entity = resolve_entity(client, &entity)?;
            if !entity.properties.contains_key(&key) {
                return Err(CliError::not_found(format!(
                    "no property `{key}` on {}",
                    entity.canonical_label
                )));
            }
            if ctx.dry_run {
                println!("Would unset `{key}` on {}", entity.id);
                return Ok(());
            }
            PgEntityRepository::new(client).unset_property(entity.id, &key)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "updated": entity.id, "unset": key }));
            } else {
                println!("✓ Property `{key}` removed");
            }
            Ok(())
        }
    }
}

fn run_note(
    ctx: &OutputCtx,
    client: &mut Client,
    work_id: uuid::Uuid,
    command: NoteCommands,
) -> CliResult<()> {
    match command {
        NoteCommands::Set { entity, note } => {
            let entity = resolve_entity(client, &entity)?;
            if ctx.dry_run {
                println!("Would set the note on {}", entity.id);
                return Ok(());
            }
            PgEntityRepository::new(client).set_work_note(entity.id, work_id, &note)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "updated": entity.id }));
            } else {
                println!("✓ Note set on {}", entity.canonical_label);
            }
            Ok(())
        }

        NoteCommands::Show { entity } => {
            let entity = resolve_entity(client, &entity)?;
            let note = PgEntityRepository::new(client).get_work_note(entity.id, work_id)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "entity": entity.id, "note": note }));
                return Ok(());
            }
            println!("{}", note.as_deref().unwrap_or("(no note)"));
            Ok(())
        }

        NoteCommands::Clear { entity } => {
            let entity = resolve_entity(client, &entity)?;
            if ctx.dry_run {
                println!("Would clear the note on {}", entity.id);
                return Ok(());
            }
            PgEntityRepository::new(client).clear_work_note(entity.id, work_id)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "cleared": entity.id }));
            } else {
                println!("✓ Note cleared");
            }
            Ok(())
        }
    }
}

fn run_label(ctx: &OutputCtx, client: &mut Client, command: LabelCommands) -> CliResult<()> {
    match command {
        LabelCommands::Add {
            entity,
            language,
            base_form,
            aliases,
        } => {
            let entity = resolve_entity(client, &entity)?;
            let mut label = EntityLabel::new(entity.id, language.clone(), base_form.clone());
            label.aliases = aliases;

            if ctx.dry_run {
                println!("Would add label {language}: {base_form} to {}", entity.id);
                return Ok(());
            }
            PgEntityRepository::new(client).add_label(&label)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({
                    "id": label.id,
                    "entity": entity.id,
                    "language": language,
                    "base_form": base_form,
                }));
            } else {
                println!(
                    "✓ Label added: {} {language} → {base_form}",
                    entity.canonical_label
                );
            }
            Ok(())
        }

        LabelCommands::List { entity } => {
            let entity = resolve_entity(client, &entity)?;
            let labels = PgEntityRepository::new(client).list_labels(entity.id)?;
            if ctx.json {
                ctx.emit_json(&labels);
                return Ok(());
            }
            if labels.is_empty() {
                println!("No labels on {}.", entity.canonical_label);
                return Ok(());
            }
            println!("Labels of {}:", entity.canonical_label);
            for label in &labels {
                println!("  - {}: {}", label.language, label.base_form);
                if !label.aliases.is_empty() {
                    println!("    aliases: {}", label.aliases.join(", "));
                }
            }
            Ok(())
        }

        LabelCommands::Set {
            entity,
            language,
            base_form,
            aliases,
        } => {
            let entity = resolve_entity(client, &entity)?;
            if base_form.is_none() && aliases.is_none() {
                return Err(CliError::invalid("nothing to update"));
            }
            if ctx.dry_run {
                println!("Would update label {language} on {}", entity.id);
                return Ok(());
            }
            let patch = LabelPatch { base_form, aliases };
            PgEntityRepository::new(client).update_label(entity.id, &language, &patch)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "updated": entity.id, "language": language }));
            } else {
                println!("✓ Label updated ({language})");
            }
            Ok(())
        }

        LabelCommands::Delete { entity, language } => {
            let entity = resolve_entity(client, &entity)?;
            if ctx.dry_run {
                println!("Would delete label {language} on {}", entity.id);
                return Ok(());
            }
            PgEntityRepository::new(client).delete_label(entity.id, &language)?;
            if ctx.json {
                ctx.emit_json(&serde_json::json!({ "deleted": entity.id, "language": language }));
            } else {
                println!("✓ Label deleted ({language})");
            }
            Ok(())
        }
    }
}
