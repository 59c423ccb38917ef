//! Block alignment repository and the label-gaps report.
//!
//! # Invariants
//! - Aligned blocks must be in different languages.
//! - Alignments are derived data: many-to-many, rebuildable, safe to
//!   delete and re-create.

use crate::model::derived::{AlignmentId, BlockAlignment};
use crate::repo::{RepoError, RepoResult};
use postgres::{Client, Row};
use uuid::Uuid;

const ALIGNMENT_SELECT_SQL: &str = "SELECT
    id,
    source_block_id,
    target_block_id,
    alignment_type,
    confidence,
    created_at
FROM block_alignments";

/// An alignment joined with both blocks, for listings.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentWithBlocks {
    pub alignment: BlockAlignment,
    pub source_language: String,
    pub source_text: String,
    pub target_language: String,
    pub target_text: String,
}

/// One entity missing a label in an aligned language.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LabelGap {
    pub alignment_id: AlignmentId,
    pub entity_id: Uuid,
    pub entity_type: String,
    pub canonical_label: String,
    pub from_language: String,
    pub missing_language: String,
}

/// Repository interface for alignment CRUD and gap detection.
pub trait AlignmentRepository {
    fn create_alignment(&mut self, alignment: &BlockAlignment) -> RepoResult<AlignmentId>;
    fn get_alignment(&mut self, id: AlignmentId) -> RepoResult<Option<BlockAlignment>>;
    /// Alignments touching `block_id`, or all when `None`.
    fn list_alignments(&mut self, block_id: Option<Uuid>) -> RepoResult<Vec<AlignmentWithBlocks>>;
    fn delete_alignment(&mut self, id: AlignmentId) -> RepoResult<()>;
    /// For each alignment, entities mentioned on either side that lack a
    /// label in the opposite side's language. Both directions are checked
    /// and duplicates collapsed.
    fn label_gaps(&mut self, block_id: Option<Uuid>) -> RepoResult<Vec<LabelGap>>;
}

/// Postgres-backed alignment repository.
pub struct PgAlignmentRepository<'c> {
    client: &'c mut Client,
}

impl<'c> PgAlignmentRepository<'c> {
    pub fn new(client: &'c mut Client) -> Self {
        Self { client }
    }

    fn block_language(&mut self, id: Uuid) -> RepoResult<String> {
        let row = self
            .client
            .query_opt("SELECT language FROM blocks WHERE id = $1;", &[&id])?;
        match row {
            Some(row) => Ok(row.get(0)),
            None => Err(RepoError::ParentNotFound { kind: "block", id }),
        }
    }
}

impl AlignmentRepository for PgAlignmentRepository<'_> {
    fn create_alignment(&mut self, alignment: &BlockAlignment) -> RepoResult<AlignmentId> {
        let source_language = self.block_language(alignment.source_block_id)?;
        let target_language = self.block_language(alignment.target_block_id)?;

        if source_language == target_language {
            return Err(RepoError::InvariantViolation(format!(
                "cannot align blocks in the same language ({source_language})"
            )));
        }

        self.client.execute(
            "INSERT INTO block_alignments
                 (id, source_block_id, target_block_id, alignment_type, confidence, created_at)
             VALUES ($1, $2, $3, $4, $5, $6);",
            &[
                &alignment.id,
                &alignment.source_block_id,
                &alignment.target_block_id,
                &alignment.alignment_type,
                &alignment.confidence,
                &alignment.created_at,
            ],
        )?;
        Ok(alignment.id)
    }

    fn get_alignment(&mut self, id: AlignmentId) -> RepoResult<Option<BlockAlignment>> {
        let row = self
            .client
            .query_opt(&format!("{ALIGNMENT_SELECT_SQL} WHERE id = $1;"), &[&id])?;
        Ok(row.map(|row| parse_alignment_row(&row)))
    }

    fn list_alignments(&mut self, block_id: Option<Uuid>) -> RepoResult<Vec<AlignmentWithBlocks>> {
        let base = "SELECT
                a.id, a.source_block_id, a.target_block_id, a.alignment_type,
                a.confidence, a.created_at,
                sb.language AS source_language, sb.source_text AS source_text,
                tb.language AS target_language, tb.source_text AS target_text
             FROM block_alignments a
             JOIN blocks sb ON sb.id = a.source_block_id
             JOIN blocks tb ON tb.id = a.target_block_id";

        let rows = match block_id {
            Some(block_id) => self.client.query(
                &format!(
                    "{base}
                     WHERE a.source_block_id = $1 OR a.target_block_id = $1
                     ORDER BY a.created_at ASC, a.id ASC;"
                ),
                &[&block_id],
            )?,
            None => self.client.query(
                &format!("{base} ORDER BY a.created_at ASC, a.id ASC;"),
                &[],
            )?,
        };

        Ok(rows
            .iter()
            .map(|row| AlignmentWithBlocks {
                alignment: parse_alignment_row(row),
                source_language: row.get("source_language"),
                source_text: row.get("source_text"),
                target_language: row.get("target_language"),
                target_text: row.get("target_text"),
            })
            .collect())
    }

    fn delete_alignment(&mut self, id: AlignmentId) -> RepoResult<()> {
        let changed = self
            .client
            .execute("DELETE FROM block_alignments WHERE id = $1;", &[&id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: "alignment",
                id,
            });
        }
        Ok(())
    }

    fn label_gaps(&mut self, block_id: Option<Uuid>) -> RepoResult<Vec<LabelGap>> {
        let alignments = self.list_alignments(block_id)?;
        let mut gaps = Vec::new();
        let mut seen = std::collections::BTreeSet::new();

        for aligned in &alignments {
            let directions = [
                (
                    aligned.alignment.source_block_id,
                    aligned.source_language.as_str(),
                    aligned.target_language.as_str(),
                ),
                (
                    aligned.alignment.target_block_id,
                    aligned.target_language.as_str(),
                    aligned.source_language.as_str(),
                ),
            ];

            for (from_block, from_language, to_language) in directions {
                let rows = self.client.query(
                    "SELECT DISTINCT e.id, e.entity_type, e.canonical_label
                     FROM mentions m
                     JOIN entities e ON e.id = m.entity_id
                     WHERE m.block_id = $1
                       AND NOT EXISTS (
                           SELECT 1 FROM entity_labels l
                           WHERE l.entity_id = e.id AND l.language = $2
                       )
                     ORDER BY e.canonical_label ASC, e.id ASC;",
                    &[&from_block, &to_language],
                )?;

                for row in rows {
                    let entity_id: Uuid = row.get(0);
                    let key = (aligned.alignment.id, entity_id, to_language.to_string());
                    if !seen.insert(key) {
                        continue;
                    }
                    gaps.push(LabelGap {
                        alignment_id: aligned.alignment.id,
                        entity_id,
                        entity_type: row.get(1),
                        canonical_label: row.get(2),
                        from_language: from_language.to_string(),
                        missing_language: to_language.to_string(),
                    });
                }
            }
        }
        Ok(gaps)
    }
}

fn parse_alignment_row(row: &Row) -> BlockAlignment {
    BlockAlignment {
        id: row.get("id"),
        source_block_id: row.get("source_block_id"),
        target_block_id: row.get("target_block_id"),
        alignment_type: row.get("alignment_type"),
        confidence: row.get("confidence"),
        created_at: row.get("created_at"),
    }
}
