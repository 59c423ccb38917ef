//! Block repository: the only path that touches prose.
//!
//! # Responsibility
//! - CRUD over canonical `blocks` rows.
//! - Atomic multi-block writes (`save_batch`) for the editor save protocol.
//!
//! # Invariants
//! - `source_text` writes go through `update_source_text` or `save_batch`;
//!   nothing else mutates prose.
//! - `save_batch` commits creates, updates and deletes together or not at
//!   all.
//! - Section listing is ordered by `(order_index, created_at, id)`.

use crate::model::hierarchy::{Block, BlockId, SectionId};
use crate::model::meta;
use crate::repo::{meta_from_json, RepoError, RepoResult};
use postgres::{Client, Row};

const BLOCK_SELECT_SQL: &str = "SELECT
    id,
    section_id,
    created_at,
    block_type,
    language,
    source_text,
    order_index,
    metadata
FROM blocks";

/// Partial update for a Block's non-prose fields.
#[derive(Debug, Clone, Default)]
pub struct BlockPatch {
    pub language: Option<String>,
    pub metadata: Option<meta::MetaMap>,
}

/// One prose update inside a batch save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTextUpdate {
    pub id: BlockId,
    pub source_text: String,
}

/// Atomic multi-block write issued by one editor save.
#[derive(Debug, Clone, Default)]
pub struct BlockBatch {
    pub creates: Vec<Block>,
    pub updates: Vec<BlockTextUpdate>,
    pub deletes: Vec<BlockId>,
}

impl BlockBatch {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Row counts applied by a batch save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BatchOutcome {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Repository interface for Block operations.
pub trait BlockRepository {
    fn create_block(&mut self, block: &Block) -> RepoResult<BlockId>;
    fn get_block(&mut self, id: BlockId) -> RepoResult<Option<Block>>;
    fn list_blocks(&mut self, section_id: SectionId) -> RepoResult<Vec<Block>>;
    fn update_source_text(&mut self, id: BlockId, source_text: &str) -> RepoResult<()>;
    fn update_block(&mut self, id: BlockId, patch: &BlockPatch) -> RepoResult<()>;
    /// Moves a block to a 1-based position among its section siblings.
    fn move_block(&mut self, id: BlockId, position: usize) -> RepoResult<()>;
    fn delete_block(&mut self, id: BlockId) -> RepoResult<()>;
    /// Applies one editor save as a single transaction.
    fn save_batch(&mut self, batch: &BlockBatch) -> RepoResult<BatchOutcome>;
}

/// Postgres-backed block repository.
pub struct PgBlockRepository<'c> {
    client: &'c mut Client,
}

impl<'c> PgBlockRepository<'c> {
    pub fn new(client: &'c mut Client) -> Self {
        Self { client }
    }
}

impl BlockRepository for PgBlockRepository<'_> {
    fn create_block(&mut self, block: &Block) -> RepoResult<BlockId> {
        block.validate()?;

        let parent = self.client.query_opt(
            "SELECT id FROM sections WHERE id = $1;",
            &[&block.section_id],
        )?;
        if parent.is_none() {
            return Err(RepoError::ParentNotFound {
                kind: "section",
                id: block.section_id,
            });
        }

        let duplicate = self
            .client
            .query_opt("SELECT id FROM blocks WHERE id = $1;", &[&block.id])?;
        if duplicate.is_some() {
            return Err(RepoError::Conflict {
                kind: "block",
                id: block.id,
            });
        }

        self.client.execute(
            "INSERT INTO blocks
                 (id, section_id, created_at, block_type, language, source_text,
                  order_index, metadata)
             VALUES ($1, $2, $3, $4, $5, $6,
                 CASE WHEN $7 > 0 THEN $7
                      ELSE COALESCE(
                          (SELECT MAX(order_index) + 1 FROM blocks WHERE section_id = $2),
                          1)
                 END,
                 $8);",
            &[
                &block.id,
                &block.section_id,
                &block.created_at,
                &block.kind.as_db(),
                &block.language,
                &block.source_text,
                &block.order_index,
                &meta::to_json(&block.metadata),
            ],
        )?;
        Ok(block.id)
    }

    fn get_block(&mut self, id: BlockId) -> RepoResult<Option<Block>> {
        let row = self
            .client
            .query_opt(&format!("{BLOCK_SELECT_SQL} WHERE id = $1;"), &[&id])?;
        row.map(|row| parse_block_row(&row)).transpose()
    }

    fn list_blocks(&mut self, section_id: SectionId) -> RepoResult<Vec<Block>> {
        let rows = self.client.query(
            &format!(
                "{BLOCK_SELECT_SQL}
                 WHERE section_id = $1
                 ORDER BY order_index ASC, created_at ASC, id ASC;"
            ),
            &[&section_id],
        )?;
        rows.iter().map(parse_block_row).collect()
    }

    fn update_source_text(&mut self, id: BlockId, source_text: &str) -> RepoResult<()> {
        let changed = self.client.execute(
            "UPDATE blocks SET source_text = $2 WHERE id = $1;",
            &[&id, &source_text],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: "block", id });
        }
        Ok(())
    }

    fn update_block(&mut self, id: BlockId, patch: &BlockPatch) -> RepoResult<()> {
        if let Some(language) = &patch.language {
            crate::model::validate_language_tag(language)?;
        }

        let changed = self.client.execute(
            "UPDATE blocks
             SET language = COALESCE($2, language),
                 metadata = COALESCE($3, metadata)
             WHERE id = $1;",
            &[
                &id,
                &patch.language,
                &patch.metadata.as_ref().map(meta::to_json),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: "block", id });
        }
        Ok(())
    }

    fn move_block(&mut self, id: BlockId, position: usize) -> RepoResult<()> {
        let section_id: SectionId = match self
            .client
            .query_opt("SELECT section_id FROM blocks WHERE id = $1;", &[&id])?
        {
            Some(row) => row.get(0),
            None => return Err(RepoError::NotFound { kind: "block", id }),
        };

        let mut tx = self.client.transaction()?;
        let rows = tx.query(
            "SELECT id FROM blocks
             WHERE section_id = $1
             ORDER BY order_index ASC, created_at ASC, id ASC;",
            &[&section_id],
        )?;
        let mut ids: Vec<BlockId> = rows.iter().map(|row| row.get(0)).collect();

        if position < 1 || position > ids.len() {
            return Err(RepoError::InvariantViolation(format!(
                "position must be between 1 and {}",
                ids.len()
            )));
        }

        ids.retain(|sibling| *sibling != id);
        ids.insert(position - 1, id);

        for (index, sibling) in ids.iter().enumerate() {
            tx.execute(
                "UPDATE blocks SET order_index = $2 WHERE id = $1;",
                &[sibling, &((index + 1) as i64)],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_block(&mut self, id: BlockId) -> RepoResult<()> {
        let changed = self
            .client
            .execute("DELETE FROM blocks WHERE id = $1;", &[&id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: "block", id });
        }
        Ok(())
    }

    fn save_batch(&mut self, batch: &BlockBatch) -> RepoResult<BatchOutcome> {
        for block in &batch.creates {
            block.validate()?;
        }

        let mut tx = self.client.transaction()?;
        let mut outcome = BatchOutcome::default();

        for update in &batch.updates {
            let changed = tx.execute(
                "UPDATE blocks SET source_text = $2 WHERE id = $1;",
                &[&update.id, &update.source_text],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    kind: "block",
                    id: update.id,
                });
            }
            outcome.updated += 1;
        }

        for block in &batch.creates {
            tx.execute(
                "INSERT INTO blocks
                     (id, section_id, created_at, block_type, language, source_text,
                      order_index, metadata)
                 VALUES ($1, $2, $3, $4, $5, $6,
                     CASE WHEN $7 > 0 THEN $7
                          ELSE COALESCE(
                              (SELECT MAX(order_index) + 1 FROM blocks WHERE section_id = $2),
                              1)
                     END,
                     $8);",
                &[
                    &block.id,
                    &block.section_id,
                    &block.created_at,
                    &block.kind.as_db(),
                    &block.language,
                    &block.source_text,
                    &block.order_index,
                    &meta::to_json(&block.metadata),
                ],
            )?;
            outcome.created += 1;
        }

        for id in &batch.deletes {
            let changed = tx.execute("DELETE FROM blocks WHERE id = $1;", &[id])?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    kind: "block",
                    id: *id,
                });
            }
            outcome.deleted += 1;
        }

        tx.commit()?;
        Ok(outcome)
    }
}

fn parse_block_row(row: &Row) -> RepoResult<Block> {
    let kind_text: String = row.get("block_type");
    let kind = crate::model::hierarchy::BlockKind::parse(&kind_text)
        .map_err(|_| RepoError::InvalidData(format!("invalid block kind `{kind_text}`")))?;

    Ok(Block {
        id: row.get("id"),
        section_id: row.get("section_id"),
        created_at: row.get("created_at"),
        kind,
        language: row.get("language"),
        source_text: row.get("source_text"),
        order_index: row.get("order_index"),
        metadata: meta_from_json(row.get("metadata"), "blocks.metadata")?,
    })
}
