//! Section repository.
//!
//! # Invariants
//! - A section's optional parent section must belong to the same document.
//! - Sibling listing (same document, same parent) is ordered by
//!   `(order_index, created_at, id)`.

use crate::model::hierarchy::{DocumentId, Section, SectionId};
use crate::model::meta;
use crate::repo::{meta_from_json, RepoError, RepoResult};
use postgres::{Client, Row};

const SECTION_SELECT_SQL: &str = "SELECT
    id,
    document_id,
    parent_section_id,
    created_at,
    title,
    order_index,
    metadata
FROM sections";

/// Partial update for a Section.
#[derive(Debug, Clone, Default)]
pub struct SectionPatch {
    pub title: Option<String>,
    pub metadata: Option<meta::MetaMap>,
}

/// Repository interface for Section CRUD and ordering.
pub trait SectionRepository {
    fn create_section(&mut self, section: &Section) -> RepoResult<SectionId>;
    fn get_section(&mut self, id: SectionId) -> RepoResult<Option<Section>>;
    /// Lists all sections of a document, nested or not.
    fn list_sections(&mut self, document_id: DocumentId) -> RepoResult<Vec<Section>>;
    fn update_section(&mut self, id: SectionId, patch: &SectionPatch) -> RepoResult<()>;
    /// Moves a section to a 1-based position among its siblings.
    fn move_section(&mut self, id: SectionId, position: usize) -> RepoResult<()>;
    /// Number of blocks directly under the section.
    fn block_count(&mut self, id: SectionId) -> RepoResult<u64>;
    fn delete_section(&mut self, id: SectionId) -> RepoResult<()>;
}

/// Postgres-backed section repository.
pub struct PgSectionRepository<'c> {
    client: &'c mut Client,
}

impl<'c> PgSectionRepository<'c> {
    pub fn new(client: &'c mut Client) -> Self {
        Self { client }
    }
}

impl SectionRepository for PgSectionRepository<'_> {
    fn create_section(&mut self, section: &Section) -> RepoResult<SectionId> {
        let parent = self.client.query_opt(
            "SELECT id FROM documents WHERE id = $1;",
            &[&section.document_id],
        )?;
        if parent.is_none() {
            return Err(RepoError::ParentNotFound {
                kind: "document",
                id: section.document_id,
            });
        }

        if let Some(parent_section_id) = section.parent_section_id {
            let parent_section = self.client.query_opt(
                "SELECT document_id FROM sections WHERE id = $1;",
                &[&parent_section_id],
            )?;
            match parent_section {
                None => {
                    return Err(RepoError::ParentNotFound {
                        kind: "section",
                        id: parent_section_id,
                    })
                }
                Some(row) => {
                    let parent_document: DocumentId = row.get(0);
                    if parent_document != section.document_id {
                        return Err(RepoError::InvariantViolation(format!(
                            "parent section {parent_section_id} belongs to another document"
                        )));
                    }
                }
            }
        }

        let duplicate = self
            .client
            .query_opt("SELECT id FROM sections WHERE id = $1;", &[&section.id])?;
        if duplicate.is_some() {
            return Err(RepoError::Conflict {
                kind: "section",
                id: section.id,
            });
        }

        self.client.execute(
            "INSERT INTO sections
                 (id, document_id, parent_section_id, created_at, title, order_index, metadata)
             VALUES ($1, $2, $3, $4, $5,
                 CASE WHEN $6 > 0 THEN $6
                      ELSE COALESCE(
                          (SELECT MAX(order_index) + 1 FROM sections
                           WHERE document_id = $2
                             AND parent_section_id IS NOT DISTINCT FROM $3),
                          1)
                 END,
                 $7);",
            &[
                &section.id,
                &section.document_id,
                &section.parent_section_id,
                &section.created_at,
                &section.title,
                &section.order_index,
                &meta::to_json(&section.metadata),
            ],
        )?;
        Ok(section.id)
    }

    fn get_section(&mut self, id: SectionId) -> RepoResult<Option<Section>> {
        let row = self
            .client
            .query_opt(&format!("{SECTION_SELECT_SQL} WHERE id = $1;"), &[&id])?;
        row.map(|row| parse_section_row(&row)).transpose()
    }

    fn list_sections(&mut self, document_id: DocumentId) -> RepoResult<Vec<Section>> {
        let rows = self.client.query(
            &format!(
                "{SECTION_SELECT_SQL}
                 WHERE document_id = $1
                 ORDER BY order_index ASC, created_at ASC, id ASC;"
            ),
            &[&document_id],
        )?;
        rows.iter().map(parse_section_row).collect()
    }

    fn update_section(&mut self, id: SectionId, patch: &SectionPatch) -> RepoResult<()> {
        let changed = self.client.execute(
            "UPDATE sections
             SET title = COALESCE($2, title),
                 metadata = COALESCE($3, metadata)
             WHERE id = $1;",
            &[&id, &patch.title, &patch.metadata.as_ref().map(meta::to_json)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: "section", id });
        }
        Ok(())
    }

    fn move_section(&mut self, id: SectionId, position: usize) -> RepoResult<()> {
        let row = match self.client.query_opt(
            "SELECT document_id, parent_section_id FROM sections WHERE id = $1;",
            &[&id],
        )? {
            Some(row) => row,
            None => return Err(RepoError::NotFound { kind: "section", id }),
        };
        let document_id: DocumentId = row.get(0);
        let parent_section_id: Option<SectionId> = row.get(1);

        let mut tx = self.client.transaction()?;
        let rows = tx.query(
            "SELECT id FROM sections
             WHERE document_id = $1
               AND parent_section_id IS NOT DISTINCT FROM $2
             ORDER BY order_index ASC, created_at ASC, id ASC;",
            &[&document_id, &parent_section_id],
        )?;
        let mut ids: Vec<SectionId> = rows.iter().map(|row| row.get(0)).collect();

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
                "UPDATE sections SET order_index = $2 WHERE id = $1;",
                &[sibling, &((index + 1) as i64)],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn block_count(&mut self, id: SectionId) -> RepoResult<u64> {
        let row = self
            .client
            .query_one("SELECT COUNT(*) FROM blocks WHERE section_id = $1;", &[&id])?;
        Ok(row.get::<_, i64>(0) as u64)
    }

    fn delete_section(&mut self, id: SectionId) -> RepoResult<()> {
        let changed = self
            .client
            .execute("DELETE FROM sections WHERE id = $1;", &[&id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: "section", id });
        }
        Ok(())
    }
}

fn parse_section_row(row: &Row) -> RepoResult<Section> {
    Ok(Section {
        id: row.get("id"),
        document_id: row.get("document_id"),
        parent_section_id: row.get("parent_section_id"),
        created_at: row.get("created_at"),
        title: row.get("title"),
        order_index: row.get("order_index"),
        metadata: meta_from_json(row.get("metadata"), "sections.metadata")?,
    })
}
