//! Domain model for the Littera content engine.
//!
//! # Responsibility
//! - Define the canonical records for the structural hierarchy
//!   (Work/Document/Section/Block), the semantic graph (Entity, labels,
//!   mentions, per-work overlays) and derived data (alignments, reviews).
//! - Validate write-path inputs before they reach persistence.
//!
//! # Invariants
//! - Every record is identified by a stable, caller-mintable `Uuid`.
//! - A Block carries exactly one language tag; `source_text` is the
//!   canonical representation of its prose.
//! - Open-ended attribute bags are `MetaMap` values with deterministic
//!   key order.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod derived;
pub mod hierarchy;
pub mod meta;
pub mod semantic;

static LANGUAGE_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("valid language tag regex"));

/// Validation failure raised by model constructors and write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required language tag is empty.
    EmptyLanguage,
    /// A language tag is not a short BCP 47-style tag.
    InvalidLanguage(String),
    /// A required label or title is empty.
    EmptyLabel(&'static str),
    /// A closed vocabulary received an unknown value.
    UnknownValue {
        field: &'static str,
        value: String,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyLanguage => write!(f, "language tag cannot be empty"),
            Self::InvalidLanguage(tag) => write!(f, "invalid language tag `{tag}`"),
            Self::EmptyLabel(field) => write!(f, "{field} cannot be empty"),
            Self::UnknownValue { field, value } => {
                write!(f, "invalid {field} value `{value}`")
            }
        }
    }
}

impl Error for ValidationError {}

/// Validates a short language tag (`en`, `pl`, `pt-BR`, ...).
pub fn validate_language_tag(tag: &str) -> Result<(), ValidationError> {
    if tag.is_empty() {
        return Err(ValidationError::EmptyLanguage);
    }
    if !LANGUAGE_TAG_RE.is_match(tag) {
        return Err(ValidationError::InvalidLanguage(tag.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_language_tag, ValidationError};

    #[test]
    fn accepts_short_language_tags() {
        for tag in ["en", "pl", "grc", "pt-BR", "zh-Hant"] {
            assert!(validate_language_tag(tag).is_ok(), "tag {tag} rejected");
        }
    }

    #[test]
    fn rejects_malformed_language_tags() {
        assert_eq!(
            validate_language_tag(""),
            Err(ValidationError::EmptyLanguage)
        );
        for tag in ["EN", "english", "e", "en_US", "en--x"] {
            assert!(
                matches!(
                    validate_language_tag(tag),
                    Err(ValidationError::InvalidLanguage(_))
                ),
                "tag {tag} accepted"
            );
        }
    }
}
