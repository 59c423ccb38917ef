//! Semantic graph records: entities, labels, per-work overlays, mentions.
//!
//! # Invariants
//! - At most one `EntityLabel` per (entity, language).
//! - At most one `Mention` per (block, entity, language).
//! - A Mention's language need not equal its Block's language; the mismatch
//!   is reported as a warning, never an error.
//! - Deleting an Entity cascades to labels, overlays and mentions; Blocks
//!   are never deleted by Entity deletion.

use crate::model::meta::MetaMap;
use crate::model::{validate_language_tag, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type EntityId = Uuid;
pub type EntityLabelId = Uuid;
pub type MentionId = Uuid;

/// Semantic referent independent of any Work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub created_at: DateTime<Utc>,
    pub entity_type: String,
    pub canonical_label: String,
    pub properties: MetaMap,
    pub status: String,
    pub notes: Option<String>,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, canonical_label: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), entity_type, canonical_label)
    }

    pub fn with_id(
        id: EntityId,
        entity_type: impl Into<String>,
        canonical_label: impl Into<String>,
    ) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            entity_type: entity_type.into(),
            canonical_label: canonical_label.into(),
            properties: MetaMap::new(),
            status: "active".to_string(),
            notes: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.entity_type.trim().is_empty() {
            return Err(ValidationError::EmptyLabel("entity type"));
        }
        if self.canonical_label.trim().is_empty() {
            return Err(ValidationError::EmptyLabel("canonical label"));
        }
        Ok(())
    }
}

/// Language-specific surface label for an Entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityLabel {
    pub id: EntityLabelId,
    pub entity_id: EntityId,
    pub language: String,
    pub base_form: String,
    pub aliases: Vec<String>,
}

impl EntityLabel {
    pub fn new(entity_id: EntityId, language: impl Into<String>, base_form: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_id,
            language: language.into(),
            base_form: base_form.into(),
            aliases: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_language_tag(&self.language)?;
        if self.base_form.trim().is_empty() {
            return Err(ValidationError::EmptyLabel("base form"));
        }
        Ok(())
    }
}

/// Per-work overlay on a global Entity. Primary key is (entity, work).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityWorkMetadata {
    pub entity_id: EntityId,
    pub work_id: Uuid,
    pub metadata: MetaMap,
}

/// Typed reference from a Block to an Entity in a specific language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub id: MentionId,
    pub block_id: Uuid,
    pub entity_id: EntityId,
    pub language: String,
    /// Grammatical intent of the mention (case, number, role, ...).
    pub features: MetaMap,
    /// Observed surface form in the text, when recorded.
    pub surface_form: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Mention {
    pub fn new(block_id: Uuid, entity_id: EntityId, language: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), block_id, entity_id, language)
    }

    pub fn with_id(
        id: MentionId,
        block_id: Uuid,
        entity_id: EntityId,
        language: impl Into<String>,
    ) -> Self {
        Self {
            id,
            block_id,
            entity_id,
            language: language.into(),
            features: MetaMap::new(),
            surface_form: None,
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_language_tag(&self.language)
    }
}

#[cfg(test)]
mod tests {
    use super::{Entity, EntityLabel, Mention};
    use uuid::Uuid;

    #[test]
    fn entity_rejects_blank_label() {
        let entity = Entity::new("concept", "  ");
        assert!(entity.validate().is_err());
        assert!(Entity::new("concept", "Time").validate().is_ok());
    }

    #[test]
    fn label_requires_valid_language_and_base_form() {
        let mut label = EntityLabel::new(Uuid::new_v4(), "pl", "czas");
        assert!(label.validate().is_ok());
        label.base_form = " ".to_string();
        assert!(label.validate().is_err());
        label.base_form = "czas".to_string();
        label.language = "polish".to_string();
        assert!(label.validate().is_err());
    }

    #[test]
    fn mention_validates_language() {
        let mention = Mention::new(Uuid::new_v4(), Uuid::new_v4(), "en");
        assert!(mention.validate().is_ok());
    }
}
