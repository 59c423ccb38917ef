//! Data access layer: typed read queries and write actions per entity kind.
//!
//! # Responsibility
//! - Define use-case oriented persistence contracts (trait per aggregate)
//!   with Postgres implementations.
//! - Enforce model-level guards that pure schema constraints cannot express
//!   (parent existence, caller-minted id conflicts, order assignment).
//!
//! # Invariants
//! - Write paths validate models before SQL mutations.
//! - Listing is deterministic: `(order_index, created_at, id)`.
//! - Every multi-row write runs in a single transaction.
//! - Side effects beyond the database are forbidden here.

use crate::db::DbError;
use crate::error::ErrorKind;
use crate::model::meta::{self, MetaMap};
use crate::model::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod alignment_repo;
pub mod block_repo;
pub mod document_repo;
pub mod entity_repo;
pub mod mention_repo;
pub mod review_repo;
pub mod section_repo;
pub mod work_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Data-access error shared by all repositories.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    /// Referenced record does not exist.
    NotFound { kind: &'static str, id: Uuid },
    /// A create's parent reference does not exist.
    ParentNotFound { kind: &'static str, id: Uuid },
    /// Caller-minted identifier already exists.
    Conflict { kind: &'static str, id: Uuid },
    /// A uniqueness invariant (entity label, mention) is violated.
    UniqueViolation { constraint: &'static str, detail: String },
    /// Model invariant that the schema cannot express (e.g. same-language
    /// alignment).
    InvariantViolation(String),
    /// Persisted state cannot be decoded into a valid read model.
    InvalidData(String),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::InvalidInput,
            Self::Db(err) => err.kind(),
            Self::NotFound { .. } | Self::ParentNotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } | Self::UniqueViolation { .. } => ErrorKind::Conflict,
            Self::InvariantViolation(_) => ErrorKind::InvariantViolation,
            Self::InvalidData(_) => ErrorKind::Internal,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::ParentNotFound { kind, id } => write!(f, "parent {kind} not found: {id}"),
            Self::Conflict { kind, id } => write!(f, "{kind} already exists: {id}"),
            Self::UniqueViolation { constraint, detail } => {
                write!(f, "duplicate {constraint}: {detail}")
            }
            Self::InvariantViolation(message) => write!(f, "{message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<postgres::Error> for RepoError {
    fn from(value: postgres::Error) -> Self {
        // Constraint backstop: explicit pre-checks report richer errors, but
        // a raced insert still surfaces as a conflict, not an internal error.
        if let Some(db_err) = value.as_db_error() {
            if db_err.code() == &postgres::error::SqlState::UNIQUE_VIOLATION {
                return Self::UniqueViolation {
                    constraint: "key",
                    detail: db_err.message().to_string(),
                };
            }
        }
        Self::Db(DbError::Postgres(value))
    }
}

/// Decodes a JSONB column into an attribute bag.
pub(crate) fn meta_from_json(value: serde_json::Value, column: &str) -> RepoResult<MetaMap> {
    meta::from_json(value).map_err(|message| RepoError::InvalidData(format!("{column}: {message}")))
}

/// Decodes a JSONB string array (label aliases).
pub(crate) fn string_list_from_json(
    value: serde_json::Value,
    column: &str,
) -> RepoResult<Vec<String>> {
    serde_json::from_value(value)
        .map_err(|err| RepoError::InvalidData(format!("{column}: {err}")))
}
