//! Mention repository: the bipartite Block ↔ Entity relation.
//!
//! # Invariants
//! - At most one mention per (block, entity, language).
//! - Creating a mention validates both endpoints.
//! - A mention whose language differs from its block's is allowed; the
//!   caller receives the block language so it can surface a warning.

use crate::model::meta;
use crate::model::semantic::{Mention, MentionId};
use crate::repo::{meta_from_json, RepoError, RepoResult};
use postgres::{Client, Row};
use uuid::Uuid;

const MENTION_SELECT_SQL: &str = "SELECT
    id,
    block_id,
    entity_id,
    language,
    surface_form,
    features,
    created_at
FROM mentions";

/// Result of creating a mention; carries the block language so the command
/// surface can report cross-language mentions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedMention {
    pub id: MentionId,
    pub block_language: String,
}

/// A mention joined with its entity, for block-scoped listings.
#[derive(Debug, Clone, PartialEq)]
pub struct MentionWithEntity {
    pub mention: Mention,
    pub entity_type: String,
    pub canonical_label: String,
}

/// Repository interface for Mention operations.
pub trait MentionRepository {
    fn create_mention(&mut self, mention: &Mention) -> RepoResult<CreatedMention>;
    fn get_mention(&mut self, id: MentionId) -> RepoResult<Option<Mention>>;
    /// Mentions of one block, ordered by entity canonical label.
    fn list_by_block(&mut self, block_id: Uuid) -> RepoResult<Vec<MentionWithEntity>>;
    /// Mentions of one entity, newest block first.
    fn list_by_entity(&mut self, entity_id: Uuid) -> RepoResult<Vec<Mention>>;
    fn list_all(&mut self) -> RepoResult<Vec<MentionWithEntity>>;
    fn update_features(&mut self, id: MentionId, features: &meta::MetaMap) -> RepoResult<()>;
    fn delete_mention(&mut self, id: MentionId) -> RepoResult<()>;
}

/// Postgres-backed mention repository.
pub struct PgMentionRepository<'c> {
    client: &'c mut Client,
}

impl<'c> PgMentionRepository<'c> {
    pub fn new(client: &'c mut Client) -> Self {
        Self { client }
    }
}

impl MentionRepository for PgMentionRepository<'_> {
    fn create_mention(&mut self, mention: &Mention) -> RepoResult<CreatedMention> {
        mention.validate()?;

        let block = self.client.query_opt(
            "SELECT language FROM blocks WHERE id = $1;",
            &[&mention.block_id],
        )?;
        let block_language: String = match block {
            Some(row) => row.get(0),
            None => {
                return Err(RepoError::ParentNotFound {
                    kind: "block",
                    id: mention.block_id,
                })
            }
        };

        let entity = self.client.query_opt(
            "SELECT id FROM entities WHERE id = $1;",
            &[&mention.entity_id],
        )?;
        if entity.is_none() {
            return Err(RepoError::ParentNotFound {
                kind: "entity",
                id: mention.entity_id,
            });
        }

        let duplicate = self.client.query_opt(
            "SELECT id FROM mentions
             WHERE block_id = $1 AND entity_id = $2 AND language = $3;",
            &[&mention.block_id, &mention.entity_id, &mention.language],
        )?;
        if duplicate.is_some() {
            return Err(RepoError::UniqueViolation {
                constraint: "mention",
                detail: format!(
                    "block {} already mentions entity {} in language `{}`",
                    mention.block_id, mention.entity_id, mention.language
                ),
            });
        }

        self.client.execute(
            "INSERT INTO mentions
                 (id, block_id, entity_id, language, surface_form, features, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7);",
            &[
                &mention.id,
                &mention.block_id,
                &mention.entity_id,
                &mention.language,
                &mention.surface_form,
                &meta::to_json(&mention.features),
                &mention.created_at,
            ],
        )?;
        Ok(CreatedMention {
            id: mention.id,
            block_language,
        })
    }

    fn get_mention(&mut self, id: MentionId) -> RepoResult<Option<Mention>> {
        let row = self
            .client
            .query_opt(&format!("{MENTION_SELECT_SQL} WHERE id = $1;"), &[&id])?;
        row.map(|row| parse_mention_row(&row)).transpose()
    }

    fn list_by_block(&mut self, block_id: Uuid) -> RepoResult<Vec<MentionWithEntity>> {
        let rows = self.client.query(
            "SELECT
                m.id, m.block_id, m.entity_id, m.language, m.surface_form,
                m.features, m.created_at,
                e.entity_type, e.canonical_label
             FROM mentions m
             JOIN entities e ON e.id = m.entity_id
             WHERE m.block_id = $1
             ORDER BY e.canonical_label ASC, m.id ASC;",
            &[&block_id],
        )?;
        rows.iter().map(parse_mention_with_entity_row).collect()
    }

    fn list_by_entity(&mut self, entity_id: Uuid) -> RepoResult<Vec<Mention>> {
        let rows = self.client.query(
            "SELECT
                m.id, m.block_id, m.entity_id, m.language, m.surface_form,
                m.features, m.created_at
             FROM mentions m
             JOIN blocks b ON b.id = m.block_id
             WHERE m.entity_id = $1
             ORDER BY b.created_at DESC, m.id ASC;",
            &[&entity_id],
        )?;
        rows.iter().map(parse_mention_row).collect()
    }

    fn list_all(&mut self) -> RepoResult<Vec<MentionWithEntity>> {
        let rows = self.client.query(
            "SELECT
                m.id, m.block_id, m.entity_id, m.language, m.surface_form,
                m.features, m.created_at,
                e.entity_type, e.canonical_label
             FROM mentions m
             JOIN entities e ON e.id = m.entity_id
             JOIN blocks b ON b.id = m.block_id
             ORDER BY b.created_at ASC, e.canonical_label ASC, m.id ASC;",
            &[],
        )?;
        rows.iter().map(parse_mention_with_entity_row).collect()
    }

    fn update_features(&mut self, id: MentionId, features: &meta::MetaMap) -> RepoResult<()> {
        let changed = self.client.execute(
            "UPDATE mentions SET features = $2 WHERE id = $1;",
            &[&id, &meta::to_json(features)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: "mention", id });
        }
        Ok(())
    }

    fn delete_mention(&mut self, id: MentionId) -> RepoResult<()> {
        let changed = self
            .client
            .execute("DELETE FROM mentions WHERE id = $1;", &[&id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: "mention", id });
        }
        Ok(())
    }
}

fn parse_mention_row(row: &Row) -> RepoResult<Mention> {
    Ok(Mention {
        id: row.get("id"),
        block_id: row.get("block_id"),
        entity_id: row.get("entity_id"),
        language: row.get("language"),
        surface_form: row.get("surface_form"),
        features: meta_from_json(row.get("features"), "mentions.features")?,
        created_at: row.get("created_at"),
    })
}

fn parse_mention_with_entity_row(row: &Row) -> RepoResult<MentionWithEntity> {
    Ok(MentionWithEntity {
        mention: parse_mention_row(row)?,
        entity_type: row.get("entity_type"),
        canonical_label: row.get("canonical_label"),
    })
}
