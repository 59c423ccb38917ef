//! Work repository: the single root record of one cluster.
//!
//! # Invariants
//! - A cluster holds at most one Work row.
//! - Deleting the Work cascades through every owned record.

use crate::model::hierarchy::{Work, WorkId};
use crate::model::meta;
use crate::repo::{meta_from_json, RepoError, RepoResult};
use postgres::{Client, Row};

const WORK_SELECT_SQL: &str = "SELECT
    id,
    created_at,
    title,
    description,
    default_language,
    metadata
FROM works";

/// Partial update for a Work. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct WorkPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub default_language: Option<String>,
    pub metadata: Option<meta::MetaMap>,
}

/// Rows removed by a cascading Work deletion, for previews and reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CascadeCounts {
    pub documents: u64,
    pub sections: u64,
    pub blocks: u64,
    pub mentions: u64,
    pub overlays: u64,
    pub reviews: u64,
}

/// Repository interface for the Work aggregate root.
pub trait WorkRepository {
    fn create_work(&mut self, work: &Work) -> RepoResult<WorkId>;
    fn get_work(&mut self) -> RepoResult<Option<Work>>;
    fn update_work(&mut self, id: WorkId, patch: &WorkPatch) -> RepoResult<()>;
    /// Counts owned records without deleting anything (dry-run support).
    fn descendant_counts(&mut self, id: WorkId) -> RepoResult<CascadeCounts>;
    fn delete_work(&mut self, id: WorkId) -> RepoResult<CascadeCounts>;
}

/// Postgres-backed work repository.
pub struct PgWorkRepository<'c> {
    client: &'c mut Client,
}

impl<'c> PgWorkRepository<'c> {
    pub fn new(client: &'c mut Client) -> Self {
        Self { client }
    }
}

impl WorkRepository for PgWorkRepository<'_> {
    fn create_work(&mut self, work: &Work) -> RepoResult<WorkId> {
        work.validate()?;

        let exists = self
            .client
            .query_opt("SELECT id FROM works WHERE id = $1;", &[&work.id])?;
        if exists.is_some() {
            return Err(RepoError::Conflict {
                kind: "work",
                id: work.id,
            });
        }

        self.client.execute(
            "INSERT INTO works (id, created_at, title, description, default_language, metadata)
             VALUES ($1, $2, $3, $4, $5, $6);",
            &[
                &work.id,
                &work.created_at,
                &work.title,
                &work.description,
                &work.default_language,
                &meta::to_json(&work.metadata),
            ],
        )?;
        Ok(work.id)
    }

    fn get_work(&mut self) -> RepoResult<Option<Work>> {
        let row = self
            .client
            .query_opt(&format!("{WORK_SELECT_SQL} ORDER BY created_at LIMIT 1;"), &[])?;
        row.map(|row| parse_work_row(&row)).transpose()
    }

    fn update_work(&mut self, id: WorkId, patch: &WorkPatch) -> RepoResult<()> {
        if let Some(language) = &patch.default_language {
            crate::model::validate_language_tag(language)?;
        }

        let changed = self.client.execute(
            "UPDATE works
             SET title = COALESCE($2, title),
                 description = COALESCE($3, description),
                 default_language = COALESCE($4, default_language),
                 metadata = COALESCE($5, metadata)
             WHERE id = $1;",
            &[
                &id,
                &patch.title,
                &patch.description,
                &patch.default_language,
                &patch.metadata.as_ref().map(meta::to_json),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: "work", id });
        }
        Ok(())
    }

    fn descendant_counts(&mut self, id: WorkId) -> RepoResult<CascadeCounts> {
        let row = self.client.query_one(
            "SELECT
                (SELECT COUNT(*) FROM documents WHERE work_id = $1),
                (SELECT COUNT(*) FROM sections s
                    JOIN documents d ON d.id = s.document_id
                    WHERE d.work_id = $1),
                (SELECT COUNT(*) FROM blocks b
                    JOIN sections s ON s.id = b.section_id
                    JOIN documents d ON d.id = s.document_id
                    WHERE d.work_id = $1),
                (SELECT COUNT(*) FROM mentions m
                    JOIN blocks b ON b.id = m.block_id
                    JOIN sections s ON s.id = b.section_id
                    JOIN documents d ON d.id = s.document_id
                    WHERE d.work_id = $1),
                (SELECT COUNT(*) FROM entity_work_metadata WHERE work_id = $1),
                (SELECT COUNT(*) FROM reviews WHERE work_id = $1);",
            &[&id],
        )?;
        Ok(CascadeCounts {
            documents: row.get::<_, i64>(0) as u64,
            sections: row.get::<_, i64>(1) as u64,
            blocks: row.get::<_, i64>(2) as u64,
            mentions: row.get::<_, i64>(3) as u64,
            overlays: row.get::<_, i64>(4) as u64,
            reviews: row.get::<_, i64>(5) as u64,
        })
    }

    fn delete_work(&mut self, id: WorkId) -> RepoResult<CascadeCounts> {
        let counts = self.descendant_counts(id)?;
        let changed = self
            .client
            .execute("DELETE FROM works WHERE id = $1;", &[&id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: "work", id });
        }
        Ok(counts)
    }
}

fn parse_work_row(row: &Row) -> RepoResult<Work> {
    Ok(Work {
        id: row.get("id"),
        created_at: row.get("created_at"),
        title: row.get("title"),
        description: row.get("description"),
        default_language: row.get("default_language"),
        metadata: meta_from_json(row.get("metadata"), "works.metadata")?,
    })
}
