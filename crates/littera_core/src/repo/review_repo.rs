//! Review repository: diagnostic findings over a scope.

use crate::model::derived::{Review, ReviewId, ReviewScope, ReviewSeverity};
use crate::model::meta;
use crate::repo::{meta_from_json, RepoError, RepoResult};
use postgres::{Client, Row};
use uuid::Uuid;

const REVIEW_SELECT_SQL: &str = "SELECT
    id,
    work_id,
    scope,
    scope_id,
    issue_type,
    severity,
    description,
    metadata,
    created_at
FROM reviews";

/// Repository interface for Review CRUD.
pub trait ReviewRepository {
    fn create_review(&mut self, review: &Review) -> RepoResult<ReviewId>;
    fn get_review(&mut self, id: ReviewId) -> RepoResult<Option<Review>>;
    fn list_reviews(&mut self, work_id: Uuid) -> RepoResult<Vec<Review>>;
    fn delete_review(&mut self, id: ReviewId) -> RepoResult<()>;
}

/// Postgres-backed review repository.
pub struct PgReviewRepository<'c> {
    client: &'c mut Client,
}

impl<'c> PgReviewRepository<'c> {
    pub fn new(client: &'c mut Client) -> Self {
        Self { client }
    }
}

impl ReviewRepository for PgReviewRepository<'_> {
    fn create_review(&mut self, review: &Review) -> RepoResult<ReviewId> {
        review.validate()?;

        let work = self
            .client
            .query_opt("SELECT id FROM works WHERE id = $1;", &[&review.work_id])?;
        if work.is_none() {
            return Err(RepoError::ParentNotFound {
                kind: "work",
                id: review.work_id,
            });
        }

        let duplicate = self
            .client
            .query_opt("SELECT id FROM reviews WHERE id = $1;", &[&review.id])?;
        if duplicate.is_some() {
            return Err(RepoError::Conflict {
                kind: "review",
                id: review.id,
            });
        }

        self.client.execute(
            "INSERT INTO reviews
                 (id, work_id, scope, scope_id, issue_type, severity, description,
                  metadata, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9);",
            &[
                &review.id,
                &review.work_id,
                &review.scope.map(ReviewScope::as_db),
                &review.scope_id,
                &review.issue_type,
                &review.severity.as_db(),
                &review.description,
                &meta::to_json(&review.metadata),
                &review.created_at,
            ],
        )?;
        Ok(review.id)
    }

    fn get_review(&mut self, id: ReviewId) -> RepoResult<Option<Review>> {
        let row = self
            .client
            .query_opt(&format!("{REVIEW_SELECT_SQL} WHERE id = $1;"), &[&id])?;
        row.map(|row| parse_review_row(&row)).transpose()
    }

    fn list_reviews(&mut self, work_id: Uuid) -> RepoResult<Vec<Review>> {
        let rows = self.client.query(
            &format!(
                "{REVIEW_SELECT_SQL}
                 WHERE work_id = $1
                 ORDER BY created_at ASC, id ASC;"
            ),
            &[&work_id],
        )?;
        rows.iter().map(parse_review_row).collect()
    }

    fn delete_review(&mut self, id: ReviewId) -> RepoResult<()> {
        let changed = self
            .client
            .execute("DELETE FROM reviews WHERE id = $1;", &[&id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: "review", id });
        }
        Ok(())
    }
}

fn parse_review_row(row: &Row) -> RepoResult<Review> {
    let scope = row
        .get::<_, Option<String>>("scope")
        .map(|value| {
            ReviewScope::parse(&value)
                .map_err(|_| RepoError::InvalidData(format!("invalid review scope `{value}`")))
        })
        .transpose()?;

    let severity_text: String = row.get("severity");
    let severity = ReviewSeverity::parse(&severity_text)
        .map_err(|_| RepoError::InvalidData(format!("invalid review severity `{severity_text}`")))?;

    Ok(Review {
        id: row.get("id"),
        work_id: row.get("work_id"),
        scope,
        scope_id: row.get("scope_id"),
        issue_type: row.get("issue_type"),
        severity,
        description: row.get("description"),
        metadata: meta_from_json(row.get("metadata"), "reviews.metadata")?,
        created_at: row.get("created_at"),
    })
}
