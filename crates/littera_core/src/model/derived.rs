//! Derived, rebuildable records: block alignments and reviews.

use crate::model::meta::MetaMap;
use crate::model::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AlignmentId = Uuid;
pub type ReviewId = Uuid;

/// Cross-language relation between two Blocks. Disposable and rebuildable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockAlignment {
    pub id: AlignmentId,
    pub source_block_id: Uuid,
    pub target_block_id: Uuid,
    pub alignment_type: String,
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl BlockAlignment {
    pub fn new(source_block_id: Uuid, target_block_id: Uuid, alignment_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_block_id,
            target_block_id,
            alignment_type: alignment_type.into(),
            confidence: None,
            created_at: Utc::now(),
        }
    }
}

/// What a review finding is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewScope {
    Work,
    Document,
    Section,
    Block,
    Entity,
    Alignment,
}

impl ReviewScope {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Document => "document",
            Self::Section => "section",
            Self::Block => "block",
            Self::Entity => "entity",
            Self::Alignment => "alignment",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "work" => Ok(Self::Work),
            "document" => Ok(Self::Document),
            "section" => Ok(Self::Section),
            "block" => Ok(Self::Block),
            "entity" => Ok(Self::Entity),
            "alignment" => Ok(Self::Alignment),
            other => Err(ValidationError::UnknownValue {
                field: "review scope",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSeverity {
    Low,
    Medium,
    High,
}

impl ReviewSeverity {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ValidationError::UnknownValue {
                field: "review severity",
                value: other.to_string(),
            }),
        }
    }
}

/// Diagnostic finding over a scope within a Work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub work_id: Uuid,
    pub scope: Option<ReviewScope>,
    pub scope_id: Option<Uuid>,
    pub issue_type: Option<String>,
    pub severity: ReviewSeverity,
    pub description: String,
    pub metadata: MetaMap,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(work_id: Uuid, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            work_id,
            scope: None,
            scope_id: None,
            issue_type: None,
            severity: ReviewSeverity::Medium,
            description: description.into(),
            metadata: MetaMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyLabel("review description"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Review, ReviewScope, ReviewSeverity};
    use uuid::Uuid;

    #[test]
    fn scope_and_severity_round_trip() {
        for scope in [
            ReviewScope::Work,
            ReviewScope::Document,
            ReviewScope::Section,
            ReviewScope::Block,
            ReviewScope::Entity,
            ReviewScope::Alignment,
        ] {
            assert_eq!(ReviewScope::parse(scope.as_db()).unwrap(), scope);
        }
        for severity in [ReviewSeverity::Low, ReviewSeverity::Medium, ReviewSeverity::High] {
            assert_eq!(ReviewSeverity::parse(severity.as_db()).unwrap(), severity);
        }
        assert!(ReviewScope::parse("chapter").is_err());
        assert!(ReviewSeverity::parse("urgent").is_err());
    }

    #[test]
    fn review_requires_description() {
        let mut review = Review::new(Uuid::new_v4(), "unclear antecedent");
        assert!(review.validate().is_ok());
        review.description = String::new();
        assert!(review.validate().is_err());
    }
}
