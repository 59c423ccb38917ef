//! Front-end resource contract.
//!
//! # Responsibility
//! - Expose the stable resource/operation matrix front-ends bind to:
//!   list-by-parent, read, create, update, delete per entity kind, the
//!   block batch update, the alignment-gaps report and a status probe.
//! - Define the representation shapes: `id`-keyed, RFC 3339 timestamps,
//!   short language tags, no front-end-private fields.
//!
//! The transport is not normative. A local HTTP front-end mounts the
//! documented paths; an embedded front-end calls the methods directly.
//! Either way the operations, shapes and error kinds are exactly these.

use crate::db::WorkDb;
use crate::model::derived::BlockAlignment;
use crate::model::hierarchy::{Block, BlockKind, Document, Section};
use crate::model::meta::MetaMap;
use crate::model::semantic::{Entity, EntityLabel, Mention};
use crate::repo::alignment_repo::{AlignmentRepository, LabelGap, PgAlignmentRepository};
use crate::repo::block_repo::{BatchOutcome, BlockBatch, BlockRepository, PgBlockRepository};
use crate::repo::document_repo::{DocumentPatch, DocumentRepository, PgDocumentRepository};
use crate::repo::entity_repo::{EntityRepository, PgEntityRepository};
use crate::repo::mention_repo::{MentionRepository, PgMentionRepository};
use crate::repo::section_repo::{PgSectionRepository, SectionPatch, SectionRepository};
use crate::repo::work_repo::{PgWorkRepository, WorkRepository};
use crate::repo::{RepoError, RepoResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Canonical resource paths for HTTP front-ends.
pub mod paths {
    pub const DOCUMENTS: &str = "/api/documents";
    pub const DOCUMENT: &str = "/api/documents/{id}";
    pub const DOCUMENT_SECTIONS: &str = "/api/documents/{id}/sections";
    pub const SECTIONS: &str = "/api/sections";
    pub const SECTION: &str = "/api/sections/{id}";
    pub const SECTION_BLOCKS: &str = "/api/sections/{id}/blocks";
    pub const BLOCKS: &str = "/api/blocks";
    pub const BLOCK: &str = "/api/blocks/{id}";
    pub const BLOCKS_BATCH: &str = "/api/blocks/batch";
    pub const ENTITIES: &str = "/api/entities";
    pub const ENTITY: &str = "/api/entities/{id}";
    pub const ENTITY_NOTE: &str = "/api/entities/{id}/note";
    pub const ENTITY_LABELS: &str = "/api/entities/{id}/labels";
    pub const LABEL: &str = "/api/labels/{id}";
    pub const MENTION: &str = "/api/mentions/{id}";
    pub const ALIGNMENT_GAPS: &str = "/api/alignments/gaps";
    pub const STATUS: &str = "/api/status";
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRepr {
    pub id: Uuid,
    pub title: Option<String>,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Document> for DocumentRepr {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id,
            title: document.title.clone(),
            order_index: document.order_index,
            created_at: document.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionRepr {
    pub id: Uuid,
    pub parent_section_id: Option<Uuid>,
    pub title: Option<String>,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Section> for SectionRepr {
    fn from(section: &Section) -> Self {
        Self {
            id: section.id,
            parent_section_id: section.parent_section_id,
            title: section.title.clone(),
            order_index: section.order_index,
            created_at: section.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockRepr {
    pub id: Uuid,
    pub block_type: BlockKind,
    pub language: String,
    pub source_text: String,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Block> for BlockRepr {
    fn from(block: &Block) -> Self {
        Self {
            id: block.id,
            block_type: block.kind,
            language: block.language.clone(),
            source_text: block.source_text.clone(),
            order_index: block.order_index,
            created_at: block.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRepr {
    pub id: Uuid,
    pub entity_type: String,
    pub label: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Entity> for EntityRepr {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id,
            entity_type: entity.entity_type.clone(),
            label: entity.canonical_label.clone(),
            status: entity.status.clone(),
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelRepr {
    pub id: Uuid,
    pub language: String,
    pub base_form: String,
    pub aliases: Vec<String>,
}

impl From<&EntityLabel> for LabelRepr {
    fn from(label: &EntityLabel) -> Self {
        Self {
            id: label.id,
            language: label.language.clone(),
            base_form: label.base_form.clone(),
            aliases: label.aliases.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MentionRepr {
    pub id: Uuid,
    pub block_id: Uuid,
    pub entity_id: Uuid,
    pub language: String,
    pub surface_form: Option<String>,
    pub features: MetaMap,
}

impl From<&Mention> for MentionRepr {
    fn from(mention: &Mention) -> Self {
        Self {
            id: mention.id,
            block_id: mention.block_id,
            entity_id: mention.entity_id,
            language: mention.language.clone(),
            surface_form: mention.surface_form.clone(),
            features: mention.features.clone(),
        }
    }
}

/// Entity detail: the entity with labels, work note and mention backlinks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDetailRepr {
    #[serde(flatten)]
    pub entity: EntityRepr,
    pub properties: MetaMap,
    pub labels: Vec<LabelRepr>,
    pub note: Option<String>,
    pub mentions: Vec<MentionRepr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentRepr {
    pub id: Uuid,
    pub source_block_id: Uuid,
    pub target_block_id: Uuid,
    pub alignment_type: String,
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<&BlockAlignment> for AlignmentRepr {
    fn from(alignment: &BlockAlignment) -> Self {
        Self {
            id: alignment.id,
            source_block_id: alignment.source_block_id,
            target_block_id: alignment.target_block_id,
            alignment_type: alignment.alignment_type.clone(),
            confidence: alignment.confidence,
            created_at: alignment.created_at,
        }
    }
}

/// Status probe payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusRepr {
    pub work_id: Uuid,
    pub port: u16,
    pub documents: u64,
    pub sections: u64,
    pub blocks: u64,
    pub entities: u64,
}

/// The operation matrix over one open work database.
pub struct ResourceSurface<'db> {
    db: &'db mut WorkDb,
}

impl<'db> ResourceSurface<'db> {
    pub fn new(db: &'db mut WorkDb) -> Self {
        Self { db }
    }

    // ---- documents ----

    pub fn list_documents(&mut self) -> RepoResult<Vec<DocumentRepr>> {
        let work_id = self.db.config.work.id;
        let documents = PgDocumentRepository::new(self.db.client()).list_documents(work_id)?;
        Ok(documents.iter().map(DocumentRepr::from).collect())
    }

    pub fn create_document(&mut self, document: &Document) -> RepoResult<DocumentRepr> {
        let mut repo = PgDocumentRepository::new(self.db.client());
        let id = repo.create_document(document)?;
        let created = repo.get_document(id)?.ok_or(RepoError::NotFound {
            kind: "document",
            id,
        })?;
        Ok(DocumentRepr::from(&created))
    }

    pub fn update_document(&mut self, id: Uuid, patch: &DocumentPatch) -> RepoResult<()> {
        PgDocumentRepository::new(self.db.client()).update_document(id, patch)
    }

    pub fn delete_document(&mut self, id: Uuid) -> RepoResult<()> {
        PgDocumentRepository::new(self.db.client()).delete_document(id)
    }

    // ---- sections ----

    pub fn list_sections(&mut self, document_id: Uuid) -> RepoResult<Vec<SectionRepr>> {
        let sections = PgSectionRepository::new(self.db.client()).list_sections(document_id)?;
        Ok(sections.iter().map(SectionRepr::from).collect())
    }

    pub fn create_section(&mut self, section: &Section) -> RepoResult<SectionRepr> {
        let mut repo = PgSectionRepository::new(self.db.client());
        let id = repo.create_section(section)?;
        let created = repo.get_section(id)?.ok_or(RepoError::NotFound {
            kind: "section",
            id,
        })?;
        Ok(SectionRepr::from(&created))
    }

    pub fn update_section(&mut self, id: Uuid, patch: &SectionPatch) -> RepoResult<()> {
        PgSectionRepository::new(self.db.client()).update_section(id, patch)
    }

    pub fn delete_section(&mut self, id: Uuid) -> RepoResult<()> {
        PgSectionRepository::new(self.db.client()).delete_section(id)
    }

    // ---- blocks ----

    pub fn list_blocks(&mut self, section_id: Uuid) -> RepoResult<Vec<BlockRepr>> {
        let blocks = PgBlockRepository::new(self.db.client()).list_blocks(section_id)?;
        Ok(blocks.iter().map(BlockRepr::from).collect())
    }

    pub fn read_block(&mut self, id: Uuid) -> RepoResult<Option<BlockRepr>> {
        let block = PgBlockRepository::new(self.db.client()).get_block(id)?;
        Ok(block.as_ref().map(BlockRepr::from))
    }

    pub fn create_block(&mut self, block: &Block) -> RepoResult<BlockRepr> {
        let mut repo = PgBlockRepository::new(self.db.client());
        let id = repo.create_block(block)?;
        let created = repo
            .get_block(id)?
            .ok_or(RepoError::NotFound { kind: "block", id })?;
        Ok(BlockRepr::from(&created))
    }

    pub fn update_block_text(&mut self, id: Uuid, source_text: &str) -> RepoResult<()> {
        PgBlockRepository::new(self.db.client()).update_source_text(id, source_text)
    }

    pub fn delete_block(&mut self, id: Uuid) -> RepoResult<()> {
        PgBlockRepository::new(self.db.client()).delete_block(id)
    }

    /// The editor's atomic save endpoint.
    pub fn batch_update_blocks(&mut self, batch: &BlockBatch) -> RepoResult<BatchOutcome> {
        PgBlockRepository::new(self.db.client()).save_batch(batch)
    }

    // ---- entities ----

    pub fn list_entities(&mut self) -> RepoResult<Vec<EntityRepr>> {
        let entities = PgEntityRepository::new(self.db.client()).list_entities()?;
        Ok(entities.iter().map(EntityRepr::from).collect())
    }

    pub fn create_entity(&mut self, entity: &Entity) -> RepoResult<EntityRepr> {
        let mut repo = PgEntityRepository::new(self.db.client());
        let id = repo.create_entity(entity)?;
        let created = repo
            .get_entity(id)?
            .ok_or(RepoError::NotFound { kind: "entity", id })?;
        Ok(EntityRepr::from(&created))
    }

    pub fn read_entity(&mut self, id: Uuid) -> RepoResult<Option<EntityDetailRepr>> {
        let work_id = self.db.config.work.id;
        let mut repo = PgEntityRepository::new(self.db.client());
        let Some(entity) = repo.get_entity(id)? else {
            return Ok(None);
        };
        let labels = repo.list_labels(id)?;
        let note = repo.get_work_note(id, work_id)?;
        let mentions = PgMentionRepository::new(self.db.client()).list_by_entity(id)?;

        Ok(Some(EntityDetailRepr {
            entity: EntityRepr::from(&entity),
            properties: entity.properties.clone(),
            labels: labels.iter().map(LabelRepr::from).collect(),
            note,
            mentions: mentions.iter().map(MentionRepr::from).collect(),
        }))
    }

    pub fn delete_entity(&mut self, id: Uuid) -> RepoResult<()> {
        PgEntityRepository::new(self.db.client()).delete_entity(id)
    }

    pub fn put_entity_note(&mut self, id: Uuid, note: &str) -> RepoResult<()> {
        let work_id = self.db.config.work.id;
        PgEntityRepository::new(self.db.client()).set_work_note(id, work_id, note)
    }

    pub fn create_entity_label(&mut self, label: &EntityLabel) -> RepoResult<LabelRepr> {
        let mut repo = PgEntityRepository::new(self.db.client());
        repo.add_label(label)?;
        let created = repo
            .get_label(label.entity_id, &label.language)?
            .ok_or(RepoError::NotFound {
                kind: "entity label",
                id: label.entity_id,
            })?;
        Ok(LabelRepr::from(&created))
    }

    pub fn delete_entity_label(&mut self, entity_id: Uuid, language: &str) -> RepoResult<()> {
        PgEntityRepository::new(self.db.client()).delete_label(entity_id, language)
    }

    // ---- mentions / alignments ----

    pub fn delete_mention(&mut self, id: Uuid) -> RepoResult<()> {
        PgMentionRepository::new(self.db.client()).delete_mention(id)
    }

    pub fn alignment_gaps(&mut self, block_id: Option<Uuid>) -> RepoResult<Vec<LabelGap>> {
        PgAlignmentRepository::new(self.db.client()).label_gaps(block_id)
    }

    // ---- status ----

    pub fn status(&mut self) -> RepoResult<StatusRepr> {
        let work_id = self.db.config.work.id;
        let port = self.db.config.postgres.port;
        let counts = PgWorkRepository::new(self.db.client()).descendant_counts(work_id)?;
        let entities = PgEntityRepository::new(self.db.client()).list_entities()?;

        Ok(StatusRepr {
            work_id,
            port,
            documents: counts.documents,
            sections: counts.sections,
            blocks: counts.blocks,
            entities: entities.len() as u64,
        })
    }
}
