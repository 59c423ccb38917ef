//! Document repository.
//!
//! # Invariants
//! - Listing is ordered by `(order_index, created_at, id)`.
//! - `order_index` defaults to `max + 1` among siblings when the caller does
//!   not supply one.
//! - `move_document` renumbers the whole sibling list in one transaction.

use crate::model::hierarchy::{Document, DocumentId, WorkId};
use crate::model::meta;
use crate::repo::{meta_from_json, RepoError, RepoResult};
use postgres::{Client, Row};

const DOCUMENT_SELECT_SQL: &str = "SELECT
    id,
    work_id,
    created_at,
    title,
    order_index,
    metadata
FROM documents";

/// Partial update for a Document.
#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub metadata: Option<meta::MetaMap>,
}

/// Repository interface for Document CRUD and ordering.
pub trait DocumentRepository {
    /// Creates a document with a caller-minted id; `order_index <= 0` means
    /// "assign the next free slot".
    fn create_document(&mut self, document: &Document) -> RepoResult<DocumentId>;
    fn get_document(&mut self, id: DocumentId) -> RepoResult<Option<Document>>;
    fn list_documents(&mut self, work_id: WorkId) -> RepoResult<Vec<Document>>;
    fn update_document(&mut self, id: DocumentId, patch: &DocumentPatch) -> RepoResult<()>;
    /// Moves a document to a 1-based position among its siblings.
    fn move_document(&mut self, id: DocumentId, position: usize) -> RepoResult<()>;
    /// Number of sections directly under the document.
    fn section_count(&mut self, id: DocumentId) -> RepoResult<u64>;
    fn delete_document(&mut self, id: DocumentId) -> RepoResult<()>;
}

/// Postgres-backed document repository.
pub struct PgDocumentRepository<'c> {
    client: &'c mut Client,
}

impl<'c> PgDocumentRepository<'c> {
    pub fn new(client: &'c mut Client) -> Self {
        Self { client }
    }
}

impl DocumentRepository for PgDocumentRepository<'_> {
    fn create_document(&mut self, document: &Document) -> RepoResult<DocumentId> {
        let parent = self
            .client
            .query_opt("SELECT id FROM works WHERE id = $1;", &[&document.work_id])?;
        if parent.is_none() {
            return Err(RepoError::ParentNotFound {
                kind: "work",
                id: document.work_id,
            });
        }

        let duplicate = self
            .client
            .query_opt("SELECT id FROM documents WHERE id = $1;", &[&document.id])?;
        if duplicate.is_some() {
            return Err(RepoError::Conflict {
                kind: "document",
                id: document.id,
            });
        }

        self.client.execute(
            "INSERT INTO documents (id, work_id, created_at, title, order_index, metadata)
             VALUES ($1, $2, $3, $4,
                 CASE WHEN $5 > 0 THEN $5
                      ELSE COALESCE(
                          (SELECT MAX(order_index) + 1 FROM documents WHERE work_id = $2),
                          1)
                 END,
                 $6);",
            &[
                &document.id,
                &document.work_id,
                &document.created_at,
                &document.title,
                &document.order_index,
                &meta::to_json(&document.metadata),
            ],
        )?;
        Ok(document.id)
    }

    fn get_document(&mut self, id: DocumentId) -> RepoResult<Option<Document>> {
        let row = self
            .client
            .query_opt(&format!("{DOCUMENT_SELECT_SQL} WHERE id = $1;"), &[&id])?;
        row.map(|row| parse_document_row(&row)).transpose()
    }

    fn list_documents(&mut self, work_id: WorkId) -> RepoResult<Vec<Document>> {
        let rows = self.client.query(
            &format!(
                "{DOCUMENT_SELECT_SQL}
                 WHERE work_id = $1
                 ORDER BY order_index ASC, created_at ASC, id ASC;"
            ),
            &[&work_id],
        )?;
        rows.iter().map(parse_document_row).collect()
    }

    fn update_document(&mut self, id: DocumentId, patch: &DocumentPatch) -> RepoResult<()> {
        let changed = self.client.execute(
            "UPDATE documents
             SET title = COALESCE($2, title),
                 metadata = COALESCE($3, metadata)
             WHERE id = $1;",
            &[&id, &patch.title, &patch.metadata.as_ref().map(meta::to_json)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: "document", id });
        }
        Ok(())
    }

    fn move_document(&mut self, id: DocumentId, position: usize) -> RepoResult<()> {
        let work_id: WorkId = match self
            .client
            .query_opt("SELECT work_id FROM documents WHERE id = $1;", &[&id])?
        {
            Some(row) => row.get(0),
            None => return Err(RepoError::NotFound { kind: "document", id }),
        };

        let mut tx = self.client.transaction()?;
        let rows = tx.query(
            "SELECT id FROM documents
             WHERE work_id = $1
             ORDER BY order_index ASC, created_at ASC, id ASC;",
            &[&work_id],
        )?;
        let mut ids: Vec<DocumentId> = rows.iter().map(|row| row.get(0)).collect();

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
                "UPDATE documents SET order_index = $2 WHERE id = $1;",
                &[sibling, &((index + 1) as i64)],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn section_count(&mut self, id: DocumentId) -> RepoResult<u64> {
        let row = self.client.query_one(
            "SELECT COUNT(*) FROM sections WHERE document_id = $1;",
            &[&id],
        )?;
        Ok(row.get::<_, i64>(0) as u64)
    }

    fn delete_document(&mut self, id: DocumentId) -> RepoResult<()> {
        let changed = self
            .client
            .execute("DELETE FROM documents WHERE id = $1;", &[&id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: "document", id });
        }
        Ok(())
    }
}

fn parse_document_row(row: &Row) -> RepoResult<Document> {
    Ok(Document {
        id: row.get("id"),
        work_id: row.get("work_id"),
        created_at: row.get("created_at"),
        title: row.get("title"),
        order_index: row.get("order_index"),
        metadata: meta_from_json(row.get("metadata"), "documents.metadata")?,
    })
}
