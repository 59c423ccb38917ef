//! Output discipline and error mapping for the command surface.
//!
//! # Invariants
//! - Human output is stable line-oriented text; field order never changes.
//! - JSON output is one canonical document per command (object keys sort
//!   deterministically).
//! - Every error carries exactly one `ErrorKind`, which decides the exit
//!   code.

use littera_core::db::DbError;
use littera_core::editor::EditorError;
use littera_core::model::ValidationError;
use littera_core::repo::RepoError;
use littera_core::ErrorKind;
use serde::Serialize;

/// Global output flags shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct OutputCtx {
    pub json: bool,
    pub dry_run: bool,
    pub force: bool,
}

impl OutputCtx {
    /// Prints the command's JSON payload (structured mode only).
    pub fn emit_json<T: Serialize>(&self, value: &T) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).expect("command payload serializes")
        );
    }
}

pub type CliResult<T> = Result<T, CliError>;

/// Command-surface error: one taxonomy kind plus a user-facing message.
#[derive(Debug)]
pub struct CliError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CliError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvariantViolation, message)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::new(value.kind(), value.to_string())
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::new(value.kind(), value.to_string())
    }
}

impl From<EditorError> for CliError {
    fn from(value: EditorError) -> Self {
        Self::new(value.kind(), value.to_string())
    }
}

impl From<ValidationError> for CliError {
    fn from(value: ValidationError) -> Self {
        Self::new(ErrorKind::InvalidInput, value.to_string())
    }
}

impl From<postgres::Error> for CliError {
    fn from(value: postgres::Error) -> Self {
        Self::new(ErrorKind::Internal, value.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::new(ErrorKind::Internal, value.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::new(ErrorKind::InvalidInput, format!("invalid JSON: {value}"))
    }
}

/// Truncated single-line preview of block text.
pub fn preview(text: &str, max_len: usize) -> String {
    text.replace('\n', " ").chars().take(max_len).collect()
}

#[cfg(test)]
mod tests {
    use super::{preview, CliError};
    use littera_core::ErrorKind;

    #[test]
    fn preview_collapses_newlines_and_truncates() {
        assert_eq!(preview("a\nb\nc", 10), "a b c");
        assert_eq!(preview("abcdefgh", 3), "abc");
    }

    #[test]
    fn repo_errors_keep_their_kind() {
        let err = CliError::from(littera_core::repo::RepoError::NotFound {
            kind: "block",
            id: uuid::Uuid::nil(),
        });
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.kind.exit_code(), 3);
    }
}
