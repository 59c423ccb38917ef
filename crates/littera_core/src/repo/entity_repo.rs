//! Entity repository: entities, language labels, per-work overlays.
//!
//! # Invariants
//! - At most one label per (entity, language); the conflict carries the
//!   existing label's language.
//! - Property writes merge into the JSONB bag; unset removes one key.
//! - Work-scoped notes live in the overlay bag under the `note` key and
//!   never alter the global entity.

use crate::model::meta::{self, MetaMap, MetaValue};
use crate::model::semantic::{Entity, EntityId, EntityLabel, EntityLabelId, EntityWorkMetadata};
use crate::repo::{meta_from_json, string_list_from_json, RepoError, RepoResult};
use postgres::{Client, Row};
use uuid::Uuid;

const ENTITY_SELECT_SQL: &str = "SELECT
    id,
    created_at,
    entity_type,
    canonical_label,
    properties,
    status,
    notes
FROM entities";

const LABEL_SELECT_SQL: &str = "SELECT
    id,
    entity_id,
    language,
    base_form,
    aliases
FROM entity_labels";

/// Partial update for an Entity.
#[derive(Debug, Clone, Default)]
pub struct EntityPatch {
    pub entity_type: Option<String>,
    pub canonical_label: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Partial update for an EntityLabel.
#[derive(Debug, Clone, Default)]
pub struct LabelPatch {
    pub base_form: Option<String>,
    pub aliases: Option<Vec<String>>,
}

/// Repository interface for the semantic graph's entity side.
pub trait EntityRepository {
    fn create_entity(&mut self, entity: &Entity) -> RepoResult<EntityId>;
    fn get_entity(&mut self, id: EntityId) -> RepoResult<Option<Entity>>;
    fn list_entities(&mut self) -> RepoResult<Vec<Entity>>;
    /// Entities whose canonical label equals `label` exactly.
    fn find_by_label(&mut self, label: &str) -> RepoResult<Vec<Entity>>;
    fn update_entity(&mut self, id: EntityId, patch: &EntityPatch) -> RepoResult<()>;
    /// Mentions currently referencing the entity (delete guard input).
    fn mention_count(&mut self, id: EntityId) -> RepoResult<u64>;
    fn delete_entity(&mut self, id: EntityId) -> RepoResult<()>;

    /// Merges `updates` into the entity's property bag.
    fn set_properties(&mut self, id: EntityId, updates: &MetaMap) -> RepoResult<()>;
    fn unset_property(&mut self, id: EntityId, key: &str) -> RepoResult<()>;

    fn add_label(&mut self, label: &EntityLabel) -> RepoResult<EntityLabelId>;
    fn list_labels(&mut self, entity_id: EntityId) -> RepoResult<Vec<EntityLabel>>;
    fn get_label(&mut self, entity_id: EntityId, language: &str) -> RepoResult<Option<EntityLabel>>;
    fn update_label(
        &mut self,
        entity_id: EntityId,
        language: &str,
        patch: &LabelPatch,
    ) -> RepoResult<()>;
    fn delete_label(&mut self, entity_id: EntityId, language: &str) -> RepoResult<()>;

    fn get_work_overlay(
        &mut self,
        entity_id: EntityId,
        work_id: Uuid,
    ) -> RepoResult<Option<EntityWorkMetadata>>;
    /// Merges `updates` into the overlay bag, creating the overlay row on
    /// first write.
    fn merge_work_overlay(
        &mut self,
        entity_id: EntityId,
        work_id: Uuid,
        updates: &MetaMap,
    ) -> RepoResult<()>;
    fn set_work_note(&mut self, entity_id: EntityId, work_id: Uuid, note: &str) -> RepoResult<()>;
    fn get_work_note(&mut self, entity_id: EntityId, work_id: Uuid) -> RepoResult<Option<String>>;
    fn clear_work_note(&mut self, entity_id: EntityId, work_id: Uuid) -> RepoResult<()>;
}

/// Postgres-backed entity repository.
pub struct PgEntityRepository<'c> {
    client: &'c mut Client,
}

impl<'c> PgEntityRepository<'c> {
    pub fn new(client: &'c mut Client) -> Self {
        Self { client }
    }

    fn require_entity(&mut self, id: EntityId) -> RepoResult<()> {
        let exists = self
            .client
            .query_opt("SELECT id FROM entities WHERE id = $1;", &[&id])?;
        if exists.is_none() {
            return Err(RepoError::NotFound { kind: "entity", id });
        }
        Ok(())
    }
}

impl EntityRepository for PgEntityRepository<'_> {
    fn create_entity(&mut self, entity: &Entity) -> RepoResult<EntityId> {
        entity.validate()?;

        let duplicate = self
            .client
            .query_opt("SELECT id FROM entities WHERE id = $1;", &[&entity.id])?;
        if duplicate.is_some() {
            return Err(RepoError::Conflict {
                kind: "entity",
                id: entity.id,
            });
        }

        self.client.execute(
            "INSERT INTO entities
                 (id, created_at, entity_type, canonical_label, properties, status, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7);",
            &[
                &entity.id,
                &entity.created_at,
                &entity.entity_type,
                &entity.canonical_label,
                &meta::to_json(&entity.properties),
                &entity.status,
                &entity.notes,
            ],
        )?;
        Ok(entity.id)
    }

    fn get_entity(&mut self, id: EntityId) -> RepoResult<Option<Entity>> {
        let row = self
            .client
            .query_opt(&format!("{ENTITY_SELECT_SQL} WHERE id = $1;"), &[&id])?;
        row.map(|row| parse_entity_row(&row)).transpose()
    }

    fn list_entities(&mut self) -> RepoResult<Vec<Entity>> {
        let rows = self.client.query(
            &format!("{ENTITY_SELECT_SQL} ORDER BY created_at ASC, id ASC;"),
            &[],
        )?;
        rows.iter().map(parse_entity_row).collect()
    }

    fn find_by_label(&mut self, label: &str) -> RepoResult<Vec<Entity>> {
        let rows = self.client.query(
            &format!(
                "{ENTITY_SELECT_SQL}
                 WHERE canonical_label = $1
                 ORDER BY created_at ASC, id ASC;"
            ),
            &[&label],
        )?;
        rows.iter().map(parse_entity_row).collect()
    }

    fn update_entity(&mut self, id: EntityId, patch: &EntityPatch) -> RepoResult<()> {
        let changed = self.client.execute(
            "UPDATE entities
             SET entity_type = COALESCE($2, entity_type),
                 canonical_label = COALESCE($3, canonical_label),
                 status = COALESCE($4, status),
                 notes = COALESCE($5, notes)
             WHERE id = $1;",
            &[
                &id,
                &patch.entity_type,
                &patch.canonical_label,
                &patch.status,
                &patch.notes,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: "entity", id });
        }
        Ok(())
    }

    fn mention_count(&mut self, id: EntityId) -> RepoResult<u64> {
        let row = self.client.query_one(
            "SELECT COUNT(*) FROM mentions WHERE entity_id = $1;",
            &[&id],
        )?;
        Ok(row.get::<_, i64>(0) as u64)
    }

    fn delete_entity(&mut self, id: EntityId) -> RepoResult<()> {
        let changed = self
            .client
            .execute("DELETE FROM entities WHERE id = $1;", &[&id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: "entity", id });
        }
        Ok(())
    }

    fn set_properties(&mut self, id: EntityId, updates: &MetaMap) -> RepoResult<()> {
        let current = match self.get_entity(id)? {
            Some(entity) => entity.properties,
            None => return Err(RepoError::NotFound { kind: "entity", id }),
        };

        let mut merged = current;
        for (key, value) in updates {
            merged.insert(key.clone(), value.clone());
        }

        self.client.execute(
            "UPDATE entities SET properties = $2 WHERE id = $1;",
            &[&id, &meta::to_json(&merged)],
        )?;
        Ok(())
    }

    fn unset_property(&mut self, id: EntityId, key: &str) -> RepoResult<()> {
        let mut properties = match self.get_entity(id)? {
            Some(entity) => entity.properties,
            None => return Err(RepoError::NotFound { kind: "entity", id }),
        };
        properties.remove(key);

        self.client.execute(
            "UPDATE entities SET properties = $2 WHERE id = $1;",
            &[&id, &meta::to_json(&properties)],
        )?;
        Ok(())
    }

    fn add_label(&mut self, label: &EntityLabel) -> RepoResult<EntityLabelId> {
        label.validate()?;
        self.require_entity(label.entity_id)?;

        let existing = self.client.query_opt(
            "SELECT id FROM entity_labels WHERE entity_id = $1 AND language = $2;",
            &[&label.entity_id, &label.language],
        )?;
        if existing.is_some() {
            return Err(RepoError::UniqueViolation {
                constraint: "entity label",
                detail: format!(
                    "entity {} already has a label for language `{}`",
                    label.entity_id, label.language
                ),
            });
        }

        self.client.execute(
            "INSERT INTO entity_labels (id, entity_id, language, base_form, aliases)
             VALUES ($1, $2, $3, $4, $5);",
            &[
                &label.id,
                &label.entity_id,
                &label.language,
                &label.base_form,
                &serde_json::to_value(&label.aliases)
                    .map_err(|err| RepoError::InvalidData(err.to_string()))?,
            ],
        )?;
        Ok(label.id)
    }

    fn list_labels(&mut self, entity_id: EntityId) -> RepoResult<Vec<EntityLabel>> {
        let rows = self.client.query(
            &format!(
                "{LABEL_SELECT_SQL}
                 WHERE entity_id = $1
                 ORDER BY language ASC;"
            ),
            &[&entity_id],
        )?;
        rows.iter().map(parse_label_row).collect()
    }

    fn get_label(&mut self, entity_id: EntityId, language: &str) -> RepoResult<Option<EntityLabel>> {
        let row = self.client.query_opt(
            &format!("{LABEL_SELECT_SQL} WHERE entity_id = $1 AND language = $2;"),
            &[&entity_id, &language],
        )?;
        row.map(|row| parse_label_row(&row)).transpose()
    }

    fn update_label(
        &mut self,
        entity_id: EntityId,
        language: &str,
        patch: &LabelPatch,
    ) -> RepoResult<()> {
        let aliases_json = patch
            .aliases
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|err| RepoError::InvalidData(err.to_string()))?;

        let changed = self.client.execute(
            "UPDATE entity_labels
             SET base_form = COALESCE($3, base_form),
                 aliases = COALESCE($4, aliases)
             WHERE entity_id = $1 AND language = $2;",
            &[&entity_id, &language, &patch.base_form, &aliases_json],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: "entity label",
                id: entity_id,
            });
        }
        Ok(())
    }

    fn delete_label(&mut self, entity_id: EntityId, language: &str) -> RepoResult<()> {
        let changed = self.client.execute(
            "DELETE FROM entity_labels WHERE entity_id = $1 AND language = $2;",
            &[&entity_id, &language],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: "entity label",
                id: entity_id,
            });
        }
        Ok(())
    }

    fn get_work_overlay(
        &mut self,
        entity_id: EntityId,
        work_id: Uuid,
    ) -> RepoResult<Option<EntityWorkMetadata>> {
        let row = self.client.query_opt(
            "SELECT metadata FROM entity_work_metadata
             WHERE entity_id = $1 AND work_id = $2;",
            &[&entity_id, &work_id],
        )?;
        row.map(|row| {
            Ok(EntityWorkMetadata {
                entity_id,
                work_id,
                metadata: meta_from_json(row.get(0), "entity_work_metadata.metadata")?,
            })
        })
        .transpose()
    }

    fn merge_work_overlay(
        &mut self,
        entity_id: EntityId,
        work_id: Uuid,
        updates: &MetaMap,
    ) -> RepoResult<()> {
        self.require_entity(entity_id)?;

        let mut merged = self
            .get_work_overlay(entity_id, work_id)?
            .map(|overlay| overlay.metadata)
            .unwrap_or_default();
        for (key, value) in updates {
            merged.insert(key.clone(), value.clone());
        }

        self.client.execute(
            "INSERT INTO entity_work_metadata (entity_id, work_id, metadata)
             VALUES ($1, $2, $3)
             ON CONFLICT (entity_id, work_id) DO UPDATE SET metadata = $3;",
            &[&entity_id, &work_id, &meta::to_json(&merged)],
        )?;
        Ok(())
    }

    fn set_work_note(&mut self, entity_id: EntityId, work_id: Uuid, note: &str) -> RepoResult<()> {
        let mut updates = MetaMap::new();
        updates.insert("note".to_string(), MetaValue::from(note));
        self.merge_work_overlay(entity_id, work_id, &updates)
    }

    fn get_work_note(&mut self, entity_id: EntityId, work_id: Uuid) -> RepoResult<Option<String>> {
        Ok(self
            .get_work_overlay(entity_id, work_id)?
            .and_then(|overlay| {
                meta::get_str(&overlay.metadata, "note").map(|note| note.to_string())
            }))
    }

    fn clear_work_note(&mut self, entity_id: EntityId, work_id: Uuid) -> RepoResult<()> {
        let Some(overlay) = self.get_work_overlay(entity_id, work_id)? else {
            return Ok(());
        };
        let mut metadata = overlay.metadata;
        metadata.remove("note");

        self.client.execute(
            "UPDATE entity_work_metadata SET metadata = $3
             WHERE entity_id = $1 AND work_id = $2;",
            &[&entity_id, &work_id, &meta::to_json(&metadata)],
        )?;
        Ok(())
    }
}

fn parse_entity_row(row: &Row) -> RepoResult<Entity> {
    Ok(Entity {
        id: row.get("id"),
        created_at: row.get("created_at"),
        entity_type: row.get("entity_type"),
        canonical_label: row.get("canonical_label"),
        properties: meta_from_json(row.get("properties"), "entities.properties")?,
        status: row.get("status"),
        notes: row.get("notes"),
    })
}

fn parse_label_row(row: &Row) -> RepoResult<EntityLabel> {
    Ok(EntityLabel {
        id: row.get("id"),
        entity_id: row.get("entity_id"),
        language: row.get("language"),
        base_form: row.get("base_form"),
        aliases: string_list_from_json(row.get("aliases"), "entity_labels.aliases")?,
    })
}
