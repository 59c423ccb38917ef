//! Import/export: canonical JSON round-trip and Markdown rendering.
//!
//! # Responsibility
//! - Export one Work as a single JSON document: the nested
//!   Document/Section/Block tree plus flat entity/mention/alignment/review
//!   lists, identifiers preserved.
//! - Import such a document in one transaction, deduplicating entities by
//!   canonical label and remapping references on id collisions.
//!
//! # Invariants
//! - `import(export(X))` is observationally equal to `X`.
//! - Double export is byte-equal: every listing below uses the
//!   deterministic `(order_index, created_at, id)` ordering.
//! - Creation timestamps are storage detail, not export payload.

use crate::model::hierarchy::BlockKind;
use crate::model::meta::{self, MetaMap};
use crate::repo::{RepoError, RepoResult};
use postgres::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Format version stamped into every export.
pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkExport {
    pub littera_version: String,
    pub work: Option<WorkBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkBody {
    pub id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub default_language: String,
    pub metadata: MetaMap,
    pub documents: Vec<DocumentExport>,
    pub entities: Vec<EntityExport>,
    pub mentions: Vec<MentionExport>,
    pub alignments: Vec<AlignmentExport>,
    pub reviews: Vec<ReviewExport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentExport {
    pub id: Uuid,
    pub title: Option<String>,
    pub order_index: i64,
    pub metadata: MetaMap,
    pub sections: Vec<SectionExport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionExport {
    pub id: Uuid,
    pub parent_section_id: Option<Uuid>,
    pub title: Option<String>,
    pub order_index: i64,
    pub metadata: MetaMap,
    pub blocks: Vec<BlockExport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockExport {
    pub id: Uuid,
    pub block_type: BlockKind,
    pub language: String,
    pub source_text: String,
    pub order_index: i64,
    pub metadata: MetaMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityExport {
    pub id: Uuid,
    pub entity_type: String,
    pub canonical_label: String,
    pub properties: MetaMap,
    pub status: String,
    pub notes: Option<String>,
    pub labels: Vec<LabelExport>,
    /// Overlay for the exporting work, when present.
    pub work_metadata: Option<MetaMap>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelExport {
    pub id: Uuid,
    pub language: String,
    pub base_form: String,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionExport {
    pub id: Uuid,
    pub block_id: Uuid,
    pub entity_id: Uuid,
    pub language: String,
    pub surface_form: Option<String>,
    pub features: MetaMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentExport {
    pub id: Uuid,
    pub source_block_id: Uuid,
    pub target_block_id: Uuid,
    pub alignment_type: String,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewExport {
    pub id: Uuid,
    pub scope: Option<String>,
    pub scope_id: Option<Uuid>,
    pub issue_type: Option<String>,
    pub severity: String,
    pub description: String,
    pub metadata: MetaMap,
}

/// Rows inserted by one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportCounts {
    pub documents: u64,
    pub sections: u64,
    pub blocks: u64,
    pub entities: u64,
    pub labels: u64,
    pub mentions: u64,
    pub alignments: u64,
    pub reviews: u64,
}

/// Builds the full export document.
pub fn export_work(client: &mut Client) -> RepoResult<WorkExport> {
    let work_row = client.query_opt(
        "SELECT id, title, description, default_language, metadata
         FROM works ORDER BY created_at LIMIT 1;",
        &[],
    )?;
    let Some(work_row) = work_row else {
        return Ok(WorkExport {
            littera_version: EXPORT_VERSION.to_string(),
            work: None,
        });
    };
    let work_id: Uuid = work_row.get(0);

    let mut documents = Vec::new();
    for doc_row in client.query(
        "SELECT id, title, order_index, metadata FROM documents
         WHERE work_id = $1
         ORDER BY order_index ASC, created_at ASC, id ASC;",
        &[&work_id],
    )? {
        let document_id: Uuid = doc_row.get(0);
        let mut sections = Vec::new();
        for sec_row in client.query(
            "SELECT id, parent_section_id, title, order_index, metadata FROM sections
             WHERE document_id = $1
             ORDER BY order_index ASC, created_at ASC, id ASC;",
            &[&document_id],
        )? {
            let section_id: Uuid = sec_row.get(0);
            let mut blocks = Vec::new();
            for block_row in client.query(
                "SELECT id, block_type, language, source_text, order_index, metadata
                 FROM blocks
                 WHERE section_id = $1
                 ORDER BY order_index ASC, created_at ASC, id ASC;",
                &[&section_id],
            )? {
                let kind_text: String = block_row.get(1);
                blocks.push(BlockExport {
                    id: block_row.get(0),
                    block_type: BlockKind::parse(&kind_text).map_err(|_| {
                        RepoError::InvalidData(format!("invalid block kind `{kind_text}`"))
                    })?,
                    language: block_row.get(2),
                    source_text: block_row.get(3),
                    order_index: block_row.get(4),
                    metadata: bag(block_row.get(5), "blocks.metadata")?,
                });
            }
            sections.push(SectionExport {
                id: section_id,
                parent_section_id: sec_row.get(1),
                title: sec_row.get(2),
                order_index: sec_row.get(3),
                metadata: bag(sec_row.get(4), "sections.metadata")?,
                blocks,
            });
        }
        documents.push(DocumentExport {
            id: document_id,
            title: doc_row.get(1),
            order_index: doc_row.get(2),
            metadata: bag(doc_row.get(3), "documents.metadata")?,
            sections,
        });
    }

    let mut entities = Vec::new();
    for entity_row in client.query(
        "SELECT id, entity_type, canonical_label, properties, status, notes
         FROM entities ORDER BY created_at ASC, id ASC;",
        &[],
    )? {
        let entity_id: Uuid = entity_row.get(0);
        let mut labels = Vec::new();
        for label_row in client.query(
            "SELECT id, language, base_form, aliases FROM entity_labels
             WHERE entity_id = $1 ORDER BY language ASC;",
            &[&entity_id],
        )? {
            labels.push(LabelExport {
                id: label_row.get(0),
                language: label_row.get(1),
                base_form: label_row.get(2),
                aliases: serde_json::from_value(label_row.get(3))
                    .map_err(|err| RepoError::InvalidData(err.to_string()))?,
            });
        }

        let overlay = client
            .query_opt(
                "SELECT metadata FROM entity_work_metadata
                 WHERE entity_id = $1 AND work_id = $2;",
                &[&entity_id, &work_id],
            )?
            .map(|row| bag(row.get(0), "entity_work_metadata.metadata"))
            .transpose()?;

        entities.push(EntityExport {
            id: entity_id,
            entity_type: entity_row.get(1),
            canonical_label: entity_row.get(2),
            properties: bag(entity_row.get(3), "entities.properties")?,
            status: entity_row.get(4),
            notes: entity_row.get(5),
            labels,
            work_metadata: overlay,
        });
    }

    let mentions = client
        .query(
            "SELECT m.id, m.block_id, m.entity_id, m.language, m.surface_form, m.features
             FROM mentions m
             JOIN blocks b ON b.id = m.block_id
             ORDER BY b.created_at ASC, m.created_at ASC, m.id ASC;",
            &[],
        )?
        .iter()
        .map(|row| {
            Ok(MentionExport {
                id: row.get(0),
                block_id: row.get(1),
                entity_id: row.get(2),
                language: row.get(3),
                surface_form: row.get(4),
                features: bag(row.get(5), "mentions.features")?,
            })
        })
        .collect::<RepoResult<Vec<_>>>()?;

    let alignments = client
        .query(
            "SELECT id, source_block_id, target_block_id, alignment_type, confidence
             FROM block_alignments
             ORDER BY created_at ASC, id ASC;",
            &[],
        )?
        .iter()
        .map(|row| AlignmentExport {
            id: row.get(0),
            source_block_id: row.get(1),
            target_block_id: row.get(2),
            alignment_type: row.get(3),
            confidence: row.get(4),
        })
        .collect();

    let reviews = client
        .query(
            "SELECT id, scope, scope_id, issue_type, severity, description, metadata
             FROM reviews
             WHERE work_id = $1
             ORDER BY created_at ASC, id ASC;",
            &[&work_id],
        )?
        .iter()
        .map(|row| {
            Ok(ReviewExport {
                id: row.get(0),
                scope: row.get(1),
                scope_id: row.get(2),
                issue_type: row.get(3),
                severity: row.get(4),
                description: row.get(5),
                metadata: bag(row.get(6), "reviews.metadata")?,
            })
        })
        .collect::<RepoResult<Vec<_>>>()?;

    Ok(WorkExport {
        littera_version: EXPORT_VERSION.to_string(),
        work: Some(WorkBody {
            id: work_id,
            title: work_row.get(1),
            description: work_row.get(2),
            default_language: work_row.get(3),
            metadata: bag(work_row.get(4), "works.metadata")?,
            documents,
            entities,
            mentions,
            alignments,
            reviews,
        }),
    })
}

/// Imports an export document into the current work, in one transaction.
///
/// Entities deduplicate by canonical label; identifiers are preserved where
/// free and re-minted on collision, with references remapped.
pub fn import_work(client: &mut Client, data: &WorkExport) -> RepoResult<ImportCounts> {
    let Some(body) = &data.work else {
        return Err(RepoError::InvalidData(
            "export document has no `work` payload".to_string(),
        ));
    };

    let work_row = client.query_opt("SELECT id FROM works ORDER BY created_at LIMIT 1;", &[])?;
    let Some(work_row) = work_row else {
        return Err(RepoError::InvariantViolation(
            "no work found; run `littera init` first".to_string(),
        ));
    };
    let work_id: Uuid = work_row.get(0);

    let mut counts = ImportCounts::default();
    let mut entity_ids: HashMap<Uuid, Uuid> = HashMap::new();
    let mut block_ids: HashMap<Uuid, Uuid> = HashMap::new();

    let mut tx = client.transaction()?;

    for entity in &body.entities {
        let existing = tx.query_opt(
            "SELECT id FROM entities WHERE canonical_label = $1;",
            &[&entity.canonical_label],
        )?;
        let resolved = match existing {
            Some(row) => row.get(0),
            None => {
                let mut new_id = entity.id;
                let collision =
                    tx.query_opt("SELECT id FROM entities WHERE id = $1;", &[&new_id])?;
                if collision.is_some() {
                    new_id = Uuid::new_v4();
                }
                tx.execute(
                    "INSERT INTO entities
                         (id, entity_type, canonical_label, properties, status, notes)
                     VALUES ($1, $2, $3, $4, $5, $6);",
                    &[
                        &new_id,
                        &entity.entity_type,
                        &entity.canonical_label,
                        &meta::to_json(&entity.properties),
                        &entity.status,
                        &entity.notes,
                    ],
                )?;
                counts.entities += 1;
                new_id
            }
        };
        entity_ids.insert(entity.id, resolved);

        for label in &entity.labels {
            let duplicate = tx.query_opt(
                "SELECT id FROM entity_labels WHERE entity_id = $1 AND language = $2;",
                &[&resolved, &label.language],
            )?;
            if duplicate.is_some() {
                continue;
            }
            tx.execute(
                "INSERT INTO entity_labels (id, entity_id, language, base_form, aliases)
                 VALUES ($1, $2, $3, $4, $5);",
                &[
                    &Uuid::new_v4(),
                    &resolved,
                    &label.language,
                    &label.base_form,
                    &serde_json::to_value(&label.aliases)
                        .map_err(|err| RepoError::InvalidData(err.to_string()))?,
                ],
            )?;
            counts.labels += 1;
        }

        if let Some(overlay) = &entity.work_metadata {
            tx.execute(
                "INSERT INTO entity_work_metadata (entity_id, work_id, metadata)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (entity_id, work_id) DO UPDATE SET metadata = $3;",
                &[&resolved, &work_id, &meta::to_json(overlay)],
            )?;
        }
    }

    for document in &body.documents {
        let mut document_id = document.id;
        if tx
            .query_opt("SELECT id FROM documents WHERE id = $1;", &[&document_id])?
            .is_some()
        {
            document_id = Uuid::new_v4();
        }
        tx.execute(
            "INSERT INTO documents (id, work_id, title, order_index, metadata)
             VALUES ($1, $2, $3, $4, $5);",
            &[
                &document_id,
                &work_id,
                &document.title,
                &document.order_index,
                &meta::to_json(&document.metadata),
            ],
        )?;
        counts.documents += 1;

        let mut section_ids: HashMap<Uuid, Uuid> = HashMap::new();
        for section in &document.sections {
            let mut section_id = section.id;
            if tx
                .query_opt("SELECT id FROM sections WHERE id = $1;", &[&section_id])?
                .is_some()
            {
                section_id = Uuid::new_v4();
            }
            section_ids.insert(section.id, section_id);
            let parent_section_id = section
                .parent_section_id
                .map(|parent| section_ids.get(&parent).copied().unwrap_or(parent));

            tx.execute(
                "INSERT INTO sections
                     (id, document_id, parent_section_id, title, order_index, metadata)
                 VALUES ($1, $2, $3, $4, $5, $6);",
                &[
                    &section_id,
                    &document_id,
                    &parent_section_id,
                    &section.title,
                    &section.order_index,
                    &meta::to_json(&section.metadata),
                ],
            )?;
            counts.sections += 1;

            for block in &section.blocks {
                let mut block_id = block.id;
                if tx
                    .query_opt("SELECT id FROM blocks WHERE id = $1;", &[&block_id])?
                    .is_some()
                {
                    block_id = Uuid::new_v4();
                }
                block_ids.insert(block.id, block_id);

                tx.execute(
                    "INSERT INTO blocks
                         (id, section_id, block_type, language, source_text,
                          order_index, metadata)
                     VALUES ($1, $2, $3, $4, $5, $6, $7);",
                    &[
                        &block_id,
                        &section_id,
                        &block.block_type.as_db(),
                        &block.language,
                        &block.source_text,
                        &block.order_index,
                        &meta::to_json(&block.metadata),
                    ],
                )?;
                counts.blocks += 1;
            }
        }
    }

    for mention in &body.mentions {
        let block_id = block_ids
            .get(&mention.block_id)
            .copied()
            .unwrap_or(mention.block_id);
        let entity_id = entity_ids
            .get(&mention.entity_id)
            .copied()
            .unwrap_or(mention.entity_id);

        let duplicate = tx.query_opt(
            "SELECT id FROM mentions
             WHERE block_id = $1 AND entity_id = $2 AND language = $3;",
            &[&block_id, &entity_id, &mention.language],
        )?;
        if duplicate.is_some() {
            continue;
        }

        tx.execute(
            "INSERT INTO mentions (id, block_id, entity_id, language, surface_form, features)
             VALUES ($1, $2, $3, $4, $5, $6);",
            &[
                &Uuid::new_v4(),
                &block_id,
                &entity_id,
                &mention.language,
                &mention.surface_form,
                &meta::to_json(&mention.features),
            ],
        )?;
        counts.mentions += 1;
    }

    for alignment in &body.alignments {
        let source = block_ids
            .get(&alignment.source_block_id)
            .copied()
            .unwrap_or(alignment.source_block_id);
        let target = block_ids
            .get(&alignment.target_block_id)
            .copied()
            .unwrap_or(alignment.target_block_id);

        tx.execute(
            "INSERT INTO block_alignments
                 (id, source_block_id, target_block_id, alignment_type, confidence)
             VALUES ($1, $2, $3, $4, $5);",
            &[
                &Uuid::new_v4(),
                &source,
                &target,
                &alignment.alignment_type,
                &alignment.confidence,
            ],
        )?;
        counts.alignments += 1;
    }

    for review in &body.reviews {
        tx.execute(
            "INSERT INTO reviews
                 (id, work_id, scope, scope_id, issue_type, severity, description, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8);",
            &[
                &Uuid::new_v4(),
                &work_id,
                &review.scope,
                &review.scope_id,
                &review.issue_type,
                &review.severity,
                &review.description,
                &meta::to_json(&review.metadata),
            ],
        )?;
        counts.reviews += 1;
    }

    tx.commit()?;
    Ok(counts)
}

/// Renders the work as human-readable Markdown: document and section
/// headings by depth, then block source text tagged with its language.
pub fn export_markdown(client: &mut Client) -> RepoResult<String> {
    let export = export_work(client)?;
    let Some(body) = export.work else {
        return Ok("# (empty work)\n".to_string());
    };

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("# {}", body.title.as_deref().unwrap_or("Untitled")));
    lines.push(String::new());

    for document in &body.documents {
        lines.push(format!(
            "## {}",
            document.title.as_deref().unwrap_or("Untitled")
        ));
        lines.push(String::new());

        let depths = section_depths(&document.sections);
        for section in &document.sections {
            let depth = depths.get(&section.id).copied().unwrap_or(0);
            let hashes = "#".repeat((3 + depth).min(6));
            lines.push(format!(
                "{hashes} {}",
                section.title.as_deref().unwrap_or("Untitled")
            ));
            lines.push(String::new());

            for block in &section.blocks {
                lines.push(format!("[{}] {}", block.language, block.source_text));
                lines.push(String::new());
            }
        }
    }
    Ok(lines.join("\n"))
}

fn section_depths(sections: &[SectionExport]) -> HashMap<Uuid, usize> {
    let parents: HashMap<Uuid, Option<Uuid>> = sections
        .iter()
        .map(|section| (section.id, section.parent_section_id))
        .collect();

    let mut depths = HashMap::new();
    for section in sections {
        let mut depth = 0;
        let mut cursor = section.parent_section_id;
        while let Some(parent) = cursor {
            depth += 1;
            if depth > sections.len() {
                break;
            }
            cursor = parents.get(&parent).copied().flatten();
        }
        depths.insert(section.id, depth);
    }
    depths
}

fn bag(value: serde_json::Value, column: &str) -> RepoResult<MetaMap> {
    meta::from_json(value).map_err(|message| RepoError::InvalidData(format!("{column}: {message}")))
}

#[cfg(test)]
mod tests {
    use super::{section_depths, SectionExport, WorkExport, EXPORT_VERSION};
    use crate::model::meta::MetaMap;
    use uuid::Uuid;

    fn section(id: Uuid, parent: Option<Uuid>) -> SectionExport {
        SectionExport {
            id,
            parent_section_id: parent,
            title: None,
            order_index: 1,
            metadata: MetaMap::new(),
            blocks: Vec::new(),
        }
    }

    #[test]
    fn empty_export_serializes_with_version() {
        let export = WorkExport {
            littera_version: EXPORT_VERSION.to_string(),
            work: None,
        };
        let text = serde_json::to_string(&export).unwrap();
        let parsed: WorkExport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.littera_version, EXPORT_VERSION);
        assert!(parsed.work.is_none());
    }

    #[test]
    fn section_depths_follow_parent_chains() {
        let root = Uuid::new_v4();
        let child = Uuid::new_v4();
        let grandchild = Uuid::new_v4();
        let sections = vec![
            section(root, None),
            section(child, Some(root)),
            section(grandchild, Some(child)),
        ];

        let depths = section_depths(&sections);
        assert_eq!(depths[&root], 0);
        assert_eq!(depths[&child], 1);
        assert_eq!(depths[&grandchild], 2);
    }
}
