//! Structural hierarchy records: Work → Document → Section → Block.
//!
//! # Responsibility
//! - Define the four-level ownership tree with stable identifiers.
//! - Provide caller-minted and generated-id constructors so optimistic
//!   writes round-trip to the same identifier.
//!
//! # Invariants
//! - `order_index` is a sparse ordering hint; ties break on
//!   `(created_at, id)` deterministically.
//! - A Block's `source_text` is canonical Markdown-with-mentions; nothing
//!   else in the system stores prose.

use crate::model::meta::MetaMap;
use crate::model::{validate_language_tag, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type WorkId = Uuid;
pub type DocumentId = Uuid;
pub type SectionId = Uuid;
pub type BlockId = Uuid;

/// Bounded intellectual artifact; the root of one embedded cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    pub id: WorkId,
    pub created_at: DateTime<Utc>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub default_language: String,
    pub metadata: MetaMap,
}

impl Work {
    pub fn with_id(id: WorkId, title: Option<String>, default_language: impl Into<String>) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            title,
            description: None,
            default_language: default_language.into(),
            metadata: MetaMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_language_tag(&self.default_language)
    }
}

/// Ordered child of a Work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub work_id: WorkId,
    pub created_at: DateTime<Utc>,
    pub title: Option<String>,
    pub order_index: i64,
    pub metadata: MetaMap,
}

impl Document {
    pub fn new(work_id: WorkId, title: Option<String>) -> Self {
        Self::with_id(Uuid::new_v4(), work_id, title)
    }

    pub fn with_id(id: DocumentId, work_id: WorkId, title: Option<String>) -> Self {
        Self {
            id,
            work_id,
            created_at: Utc::now(),
            title,
            order_index: 0,
            metadata: MetaMap::new(),
        }
    }
}

/// Hierarchical child of a Document; may nest under a sibling Section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub document_id: DocumentId,
    pub parent_section_id: Option<SectionId>,
    pub created_at: DateTime<Utc>,
    pub title: Option<String>,
    pub order_index: i64,
    pub metadata: MetaMap,
}

impl Section {
    pub fn new(document_id: DocumentId, title: Option<String>) -> Self {
        Self::with_id(Uuid::new_v4(), document_id, title)
    }

    pub fn with_id(id: SectionId, document_id: DocumentId, title: Option<String>) -> Self {
        Self {
            id,
            document_id,
            parent_section_id: None,
            created_at: Utc::now(),
            title,
            order_index: 0,
            metadata: MetaMap::new(),
        }
    }
}

/// Block kind vocabulary.
///
/// The enumerated set is a model-level convention, not a schema constraint;
/// richer vocabularies live in block metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Heading,
    Code,
    Quote,
}

impl BlockKind {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::Code => "code",
            Self::Quote => "quote",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "paragraph" => Ok(Self::Paragraph),
            "heading" => Ok(Self::Heading),
            "code" => Ok(Self::Code),
            "quote" => Ok(Self::Quote),
            other => Err(ValidationError::UnknownValue {
                field: "block kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Atomic editable text unit inside a Section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub section_id: SectionId,
    pub created_at: DateTime<Utc>,
    pub kind: BlockKind,
    pub language: String,
    pub source_text: String,
    pub order_index: i64,
    pub metadata: MetaMap,
}

impl Block {
    pub fn new(section_id: SectionId, language: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), section_id, language, source_text)
    }

    /// Creates a block with a caller-minted identifier.
    ///
    /// Used by the editor save path so a container created in memory keeps
    /// its identifier after persistence.
    pub fn with_id(
        id: BlockId,
        section_id: SectionId,
        language: impl Into<String>,
        source_text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            section_id,
            created_at: Utc::now(),
            kind: BlockKind::Paragraph,
            language: language.into(),
            source_text: source_text.into(),
            order_index: 0,
            metadata: MetaMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_language_tag(&self.language)
    }
}

#[cfg(test)]
mod tests {
    use super::{Block, BlockKind, Work};
    use uuid::Uuid;

    #[test]
    fn caller_minted_block_id_is_kept() {
        let id = Uuid::new_v4();
        let block = Block::with_id(id, Uuid::new_v4(), "en", "text");
        assert_eq!(block.id, id);
        assert_eq!(block.kind, BlockKind::Paragraph);
    }

    #[test]
    fn block_validation_requires_language() {
        let mut block = Block::new(Uuid::new_v4(), "en", "text");
        assert!(block.validate().is_ok());
        block.language = "English".to_string();
        assert!(block.validate().is_err());
    }

    #[test]
    fn block_kind_round_trips_through_db_text() {
        for kind in [
            BlockKind::Paragraph,
            BlockKind::Heading,
            BlockKind::Code,
            BlockKind::Quote,
        ] {
            assert_eq!(BlockKind::parse(kind.as_db()).unwrap(), kind);
        }
        assert!(BlockKind::parse("table").is_err());
    }

    #[test]
    fn work_validates_default_language() {
        let mut work = Work::with_id(Uuid::new_v4(), Some("Title".into()), "en");
        assert!(work.validate().is_ok());
        work.default_language = String::new();
        assert!(work.validate().is_err());
    }
}
