//! Selector resolution shared by commands.
//!
//! A reference on the command line is a full UUID, a 1-based index into
//! the deterministic listing, or a unique title/label. Ambiguous titles are
//! rejected with the offending selector named.

use crate::output::{CliError, CliResult};
use littera_core::model::hierarchy::{Block, Document, Section, Work};
use littera_core::model::meta::{MetaMap, MetaValue};
use littera_core::repo::block_repo::{BlockRepository, PgBlockRepository};
use littera_core::repo::document_repo::{DocumentRepository, PgDocumentRepository};
use littera_core::repo::entity_repo::{EntityRepository, PgEntityRepository};
use littera_core::repo::section_repo::{PgSectionRepository, SectionRepository};
use littera_core::repo::work_repo::{PgWorkRepository, WorkRepository};
use littera_core::model::semantic::Entity;
use postgres::Client;
use uuid::Uuid;

/// Loads the single Work of this cluster.
pub fn require_work(client: &mut Client) -> CliResult<Work> {
    PgWorkRepository::new(client)
        .get_work()?
        .ok_or_else(|| CliError::not_found("no work found; run `littera init` first"))
}

fn parse_index(selector: &str) -> Option<usize> {
    selector.parse::<usize>().ok().filter(|index| *index >= 1)
}

fn pick_by_selector<T, F, G>(
    rows: Vec<T>,
    selector: &str,
    what: &str,
    id_of: F,
    title_of: G,
) -> CliResult<T>
where
    T: Clone,
    F: Fn(&T) -> Uuid,
    G: Fn(&T) -> Option<String>,
{
    if let Some(index) = parse_index(selector) {
        if index <= rows.len() {
            return Ok(rows[index - 1].clone());
        }
        return Err(CliError::invalid(format!(
            "invalid {what} index: {selector} (have {})",
            rows.len()
        )));
    }

    if let Ok(id) = Uuid::parse_str(selector) {
        if let Some(row) = rows.iter().find(|row| id_of(row) == id) {
            return Ok(row.clone());
        }
    }

    let matches: Vec<&T> = rows
        .iter()
        .filter(|row| title_of(row).as_deref() == Some(selector))
        .collect();
    match matches.len() {
        1 => Ok(matches[0].clone()),
        0 => Err(CliError::not_found(format!("{what} not found: {selector}"))),
        _ => Err(CliError::invalid(format!(
            "ambiguous {what} title: {selector}"
        ))),
    }
}

/// Resolves a document selector.
pub fn resolve_document(client: &mut Client, selector: &str) -> CliResult<Document> {
    let work = require_work(client)?;
    let documents = PgDocumentRepository::new(client).list_documents(work.id)?;
    pick_by_selector(
        documents,
        selector,
        "document",
        |document| document.id,
        |document| document.title.clone(),
    )
}

/// Resolves a section selector within one document.
pub fn resolve_section(
    client: &mut Client,
    document_id: Uuid,
    selector: &str,
) -> CliResult<Section> {
    let sections = PgSectionRepository::new(client).list_sections(document_id)?;
    pick_by_selector(
        sections,
        selector,
        "section",
        |section| section.id,
        |section| section.title.clone(),
    )
}

/// Resolves a section selector across all documents, in outline order.
pub fn resolve_section_global(client: &mut Client, selector: &str) -> CliResult<Section> {
    let work = require_work(client)?;
    let mut sections = Vec::new();
    for document in PgDocumentRepository::new(client).list_documents(work.id)? {
        sections.extend(PgSectionRepository::new(client).list_sections(document.id)?);
    }
    pick_by_selector(
        sections,
        selector,
        "section",
        |section| section.id,
        |section| section.title.clone(),
    )
}

/// Resolves a block selector across all blocks, in outline order.
pub fn resolve_block_global(client: &mut Client, selector: &str) -> CliResult<Block> {
    let work = require_work(client)?;
    let mut blocks = Vec::new();
    for document in PgDocumentRepository::new(client).list_documents(work.id)? {
        for section in PgSectionRepository::new(client).list_sections(document.id)? {
            blocks.extend(PgBlockRepository::new(client).list_blocks(section.id)?);
        }
    }
    pick_by_selector(blocks, selector, "block", |block| block.id, |_| None)
}

/// Resolves an entity selector (index, UUID or canonical label).
pub fn resolve_entity(client: &mut Client, selector: &str) -> CliResult<Entity> {
    let entities = PgEntityRepository::new(client).list_entities()?;
    pick_by_selector(
        entities,
        selector,
        "entity",
        |entity| entity.id,
        |entity| Some(entity.canonical_label.clone()),
    )
}

/// Resolves an entity by type + canonical label, the mention-add shape.
pub fn resolve_entity_by_type_name(
    client: &mut Client,
    entity_type: &str,
    name: &str,
) -> CliResult<Entity> {
    let entities = PgEntityRepository::new(client).list_entities()?;
    let matches: Vec<&Entity> = entities
        .iter()
        .filter(|entity| entity.entity_type == entity_type && entity.canonical_label == name)
        .collect();
    match matches.len() {
        1 => Ok(matches[0].clone()),
        0 => Err(CliError::not_found(format!(
            "entity not found: {entity_type} {name}"
        ))),
        _ => Err(CliError::invalid(format!(
            "ambiguous entity: {entity_type} {name}"
        ))),
    }
}

/// Parses `key=value` pairs into an attribute bag of strings.
pub fn parse_pairs(pairs: &[String]) -> CliResult<MetaMap> {
    let mut map = MetaMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(CliError::invalid(format!(
                "invalid property format: {pair} (expected key=value)"
            )));
        };
        if key.is_empty() {
            return Err(CliError::invalid(format!(
                "invalid property format: {pair} (empty key)"
            )));
        }
        map.insert(key.to_string(), MetaValue::from(value));
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::{parse_pairs, pick_by_selector};
    use crate::output::CliError;
    use littera_core::ErrorKind;
    use uuid::Uuid;

    #[derive(Clone, Debug)]
    struct RowStub {
        id: Uuid,
        title: Option<String>,
    }

    fn rows() -> Vec<RowStub> {
        vec![
            RowStub {
                id: Uuid::new_v4(),
                title: Some("Opening".into()),
            },
            RowStub {
                id: Uuid::new_v4(),
                title: Some("Middle".into()),
            },
            RowStub {
                id: Uuid::new_v4(),
                title: Some("Middle".into()),
            },
        ]
    }

    fn pick(rows: Vec<RowStub>, selector: &str) -> Result<RowStub, CliError> {
        pick_by_selector(rows, selector, "section", |row| row.id, |row| row.title.clone())
    }

    #[test]
    fn index_uuid_and_title_all_resolve() {
        let rows = rows();
        let by_index = pick(rows.clone(), "1").unwrap();
        assert_eq!(by_index.id, rows[0].id);

        let by_id = pick(rows.clone(), &rows[1].id.to_string()).unwrap();
        assert_eq!(by_id.id, rows[1].id);

        let by_title = pick(rows.clone(), "Opening").unwrap();
        assert_eq!(by_title.id, rows[0].id);
    }

    #[test]
    fn ambiguous_title_is_invalid_input() {
        let err = pick(rows(), "Middle").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn unknown_selector_is_not_found() {
        let err = pick(rows(), "Closing").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        let err = pick(rows(), "9").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn pairs_parse_and_reject_malformed_input() {
        let map = parse_pairs(&["gender=f".into(), "countable=no".into()]).unwrap();
        assert_eq!(map.len(), 2);

        assert!(parse_pairs(&["oops".into()]).is_err());
        assert!(parse_pairs(&["=x".into()]).is_err());
    }
}
