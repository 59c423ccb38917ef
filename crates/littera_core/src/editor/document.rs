//! Section-scoped document model.
//!
//! # Responsibility
//! - Hold one Section's blocks as an ordered list of isolating containers.
//! - Rebuild only the touched container on every edit so unchanged
//!   containers stay reference-identical to the saved snapshot.
//!
//! # Invariants
//! - Containers never change identifier in place; replacing a block is
//!   modeled as delete + create.
//! - The document always holds at least one container; deleting the last
//!   one inserts an empty replacement.
//! - New containers come only from the explicit split command.
//! - Code containers hold exactly one code node, no inline marks, no
//!   mentions.

use crate::editor::markdown;
use crate::editor::{EditorError, EditorResult};
use crate::model::hierarchy::{Block, BlockId, BlockKind};
use std::sync::Arc;
use uuid::Uuid;

/// Opaque entity token inside a mention literal.
///
/// Kept textual rather than parsed: an unresolved identifier is still the
/// writer's data and must round-trip bit-exact.
pub type EntityRef = String;

/// Inline content inside paragraphs and headings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineNode {
    Text(String),
    Emphasis(Vec<InlineNode>),
    Strong(Vec<InlineNode>),
    Code(String),
    /// Atomic mention: selectable and deletable as one unit, never edited
    /// in place. `label` is a cached display hint, not authoritative.
    Mention { entity: EntityRef, label: String },
}

impl InlineNode {
    fn contains_mark_or_mention(&self) -> bool {
        !matches!(self, Self::Text(_))
    }
}

/// Block-level content inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentNode {
    Paragraph(Vec<InlineNode>),
    Heading { level: u8, inlines: Vec<InlineNode> },
    CodeBlock { info: String, text: String },
    Blockquote(Vec<ContentNode>),
    HorizontalRule,
}

impl ContentNode {
    /// Empty paragraph, the slash-command activation site.
    pub fn empty_paragraph() -> Self {
        Self::Paragraph(Vec::new())
    }

    pub fn is_empty_paragraph(&self) -> bool {
        matches!(self, Self::Paragraph(inlines) if inlines.is_empty())
    }

    fn uses_marks_or_mentions(&self) -> bool {
        match self {
            Self::Paragraph(inlines) | Self::Heading { inlines, .. } => {
                inlines.iter().any(InlineNode::contains_mark_or_mention)
            }
            Self::Blockquote(children) => children.iter().any(Self::uses_marks_or_mentions),
            Self::CodeBlock { .. } | Self::HorizontalRule => false,
        }
    }
}

/// One block's content inside the section document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContainer {
    pub id: BlockId,
    pub kind: BlockKind,
    pub language: String,
    pub nodes: Vec<ContentNode>,
}

impl BlockContainer {
    /// Parses a persisted block into a container.
    pub fn from_block(block: &Block) -> Self {
        let mut nodes = markdown::parse(&block.source_text);
        if block.kind == BlockKind::Code
            && !matches!(nodes.as_slice(), [ContentNode::CodeBlock { .. }])
        {
            // Permissive intake: a code block whose stored text is not a
            // fenced block is treated as raw code. Serialization fences it,
            // which is one of the permitted canonicalizations.
            nodes = vec![ContentNode::CodeBlock {
                info: String::new(),
                text: block.source_text.clone(),
            }];
        }
        if nodes.is_empty() {
            nodes.push(ContentNode::empty_paragraph());
        }
        Self {
            id: block.id,
            kind: block.kind,
            language: block.language.clone(),
            nodes,
        }
    }

    /// Fresh empty container with a minted identifier.
    pub fn empty(kind: BlockKind, language: impl Into<String>) -> Self {
        let nodes = match kind {
            BlockKind::Code => vec![ContentNode::CodeBlock {
                info: String::new(),
                text: String::new(),
            }],
            _ => vec![ContentNode::empty_paragraph()],
        };
        Self {
            id: Uuid::new_v4(),
            kind,
            language: language.into(),
            nodes,
        }
    }

    /// Canonical source text for this container.
    pub fn source_text(&self) -> String {
        markdown::serialize(&self.nodes)
    }

    fn check_nodes(&self, nodes: &[ContentNode]) -> EditorResult<()> {
        if self.kind == BlockKind::Code {
            let all_code = nodes
                .iter()
                .all(|node| matches!(node, ContentNode::CodeBlock { .. }));
            if !all_code || nodes.iter().any(ContentNode::uses_marks_or_mentions) {
                return Err(EditorError::CodeContainerRestriction);
            }
        }
        Ok(())
    }
}

/// All containers of one Section, edited as a single continuous document.
#[derive(Debug, Clone)]
pub struct SectionDocument {
    section_id: Uuid,
    default_language: String,
    containers: Vec<Arc<BlockContainer>>,
}

impl SectionDocument {
    /// Builds the document from a Section's persisted blocks.
    ///
    /// An empty Section yields one empty container so the document is never
    /// empty.
    pub fn from_blocks(section_id: Uuid, default_language: &str, blocks: &[Block]) -> Self {
        let mut containers: Vec<Arc<BlockContainer>> = blocks
            .iter()
            .map(|block| Arc::new(BlockContainer::from_block(block)))
            .collect();
        if containers.is_empty() {
            containers.push(Arc::new(BlockContainer::empty(
                BlockKind::Paragraph,
                default_language,
            )));
        }
        Self {
            section_id,
            default_language: default_language.to_string(),
            containers,
        }
    }

    pub fn section_id(&self) -> Uuid {
        self.section_id
    }

    pub fn containers(&self) -> &[Arc<BlockContainer>] {
        &self.containers
    }

    pub fn find(&self, id: BlockId) -> Option<(usize, &Arc<BlockContainer>)> {
        self.containers
            .iter()
            .enumerate()
            .find(|(_, container)| container.id == id)
    }

    fn position(&self, id: BlockId) -> EditorResult<usize> {
        self.find(id)
            .map(|(index, _)| index)
            .ok_or(EditorError::ContainerNotFound(id))
    }

    /// Replaces the content of one container, leaving every other container
    /// untouched (and reference-identical).
    pub fn replace_nodes(&mut self, id: BlockId, nodes: Vec<ContentNode>) -> EditorResult<()> {
        let index = self.position(id)?;
        let current = self.containers[index].clone();
        current.check_nodes(&nodes)?;

        let nodes = if nodes.is_empty() {
            vec![ContentNode::empty_paragraph()]
        } else {
            nodes
        };
        self.containers[index] = Arc::new(BlockContainer {
            id: current.id,
            kind: current.kind,
            language: current.language.clone(),
            nodes,
        });
        Ok(())
    }

    /// The explicit split command: content nodes from `at_node` onward move
    /// into a new container inserted right after, with a minted identifier
    /// and the same kind and language.
    ///
    /// Returns the new container's identifier.
    pub fn split_container(&mut self, id: BlockId, at_node: usize) -> EditorResult<BlockId> {
        let index = self.position(id)?;
        let current = self.containers[index].clone();
        if at_node == 0 || at_node > current.nodes.len() {
            return Err(EditorError::InvalidSplit {
                index: at_node,
                len: current.nodes.len(),
            });
        }

        let mut head_nodes = current.nodes.clone();
        let tail_nodes: Vec<ContentNode> = head_nodes.split_off(at_node);
        let tail_nodes = if tail_nodes.is_empty() {
            vec![ContentNode::empty_paragraph()]
        } else {
            tail_nodes
        };

        let new_container = BlockContainer {
            id: Uuid::new_v4(),
            kind: current.kind,
            language: current.language.clone(),
            nodes: tail_nodes,
        };
        let new_id = new_container.id;

        self.containers[index] = Arc::new(BlockContainer {
            id: current.id,
            kind: current.kind,
            language: current.language.clone(),
            nodes: head_nodes,
        });
        self.containers.insert(index + 1, Arc::new(new_container));
        Ok(new_id)
    }

    /// Removes a container. Deleting the last container inserts an empty
    /// replacement so the document is never empty.
    pub fn remove_container(&mut self, id: BlockId) -> EditorResult<()> {
        let index = self.position(id)?;
        self.containers.remove(index);
        if self.containers.is_empty() {
            self.containers.push(Arc::new(BlockContainer::empty(
                BlockKind::Paragraph,
                &self.default_language,
            )));
        }
        Ok(())
    }

    /// Inserts a pre-built container (editor paste/undo paths).
    pub fn insert_container(&mut self, index: usize, container: BlockContainer) -> EditorResult<()> {
        container.check_nodes(&container.nodes)?;
        let index = index.min(self.containers.len());
        self.containers.insert(index, Arc::new(container));
        Ok(())
    }

    /// Applies a node-level transform at `node_index` in container `id`.
    pub fn set_node(
        &mut self,
        id: BlockId,
        node_index: usize,
        node: ContentNode,
    ) -> EditorResult<()> {
        let index = self.position(id)?;
        let current = &self.containers[index];
        if node_index >= current.nodes.len() {
            return Err(EditorError::NodeOutOfRange {
                index: node_index,
                len: current.nodes.len(),
            });
        }
        let mut nodes = current.nodes.clone();
        nodes[node_index] = node;
        self.replace_nodes(id, nodes)
    }

    /// Appends an atomic mention to the inline content of one node.
    pub fn append_mention(
        &mut self,
        id: BlockId,
        node_index: usize,
        entity: EntityRef,
        label: String,
    ) -> EditorResult<()> {
        let index = self.position(id)?;
        let current = &self.containers[index];
        if current.kind == BlockKind::Code {
            return Err(EditorError::CodeContainerRestriction);
        }
        if node_index >= current.nodes.len() {
            return Err(EditorError::NodeOutOfRange {
                index: node_index,
                len: current.nodes.len(),
            });
        }

        let mut nodes = current.nodes.clone();
        match &mut nodes[node_index] {
            ContentNode::Paragraph(inlines) | ContentNode::Heading { inlines, .. } => {
                inlines.push(InlineNode::Mention { entity, label });
            }
            _ => return Err(EditorError::CodeContainerRestriction),
        }
        self.replace_nodes(id, nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockContainer, ContentNode, InlineNode, SectionDocument};
    use crate::editor::EditorError;
    use crate::model::hierarchy::{Block, BlockKind};
    use std::sync::Arc;
    use uuid::Uuid;

    fn doc_with_texts(texts: &[&str]) -> (SectionDocument, Vec<Block>) {
        let section_id = Uuid::new_v4();
        let blocks: Vec<Block> = texts
            .iter()
            .map(|text| Block::new(section_id, "en", *text))
            .collect();
        (
            SectionDocument::from_blocks(section_id, "en", &blocks),
            blocks,
        )
    }

    #[test]
    fn empty_section_gets_one_empty_container() {
        let doc = SectionDocument::from_blocks(Uuid::new_v4(), "en", &[]);
        assert_eq!(doc.containers().len(), 1);
        assert!(doc.containers()[0].nodes[0].is_empty_paragraph());
    }

    #[test]
    fn replace_nodes_keeps_other_containers_reference_identical() {
        let (mut doc, blocks) = doc_with_texts(&["one", "two", "three"]);
        let before: Vec<Arc<BlockContainer>> = doc.containers().to_vec();

        doc.replace_nodes(
            blocks[1].id,
            vec![ContentNode::Paragraph(vec![InlineNode::Text(
                "changed".into(),
            )])],
        )
        .unwrap();

        assert!(Arc::ptr_eq(&before[0], &doc.containers()[0]));
        assert!(!Arc::ptr_eq(&before[1], &doc.containers()[1]));
        assert!(Arc::ptr_eq(&before[2], &doc.containers()[2]));
        assert_eq!(doc.containers()[1].id, blocks[1].id);
    }

    #[test]
    fn split_mints_a_new_identifier_and_preserves_kind_language() {
        let (mut doc, blocks) = doc_with_texts(&["alpha\n\nbeta"]);
        assert_eq!(doc.containers()[0].nodes.len(), 2);

        let new_id = doc.split_container(blocks[0].id, 1).unwrap();
        assert_eq!(doc.containers().len(), 2);
        assert_ne!(new_id, blocks[0].id);
        assert_eq!(doc.containers()[0].id, blocks[0].id);
        assert_eq!(doc.containers()[1].id, new_id);
        assert_eq!(doc.containers()[1].language, "en");
        assert_eq!(doc.containers()[0].source_text(), "alpha");
        assert_eq!(doc.containers()[1].source_text(), "beta");
    }

    #[test]
    fn split_at_zero_is_rejected() {
        let (mut doc, blocks) = doc_with_texts(&["alpha\n\nbeta"]);
        let err = doc.split_container(blocks[0].id, 0).unwrap_err();
        assert!(matches!(err, EditorError::InvalidSplit { .. }));
    }

    #[test]
    fn removing_the_last_container_inserts_an_empty_replacement() {
        let (mut doc, blocks) = doc_with_texts(&["only"]);
        doc.remove_container(blocks[0].id).unwrap();

        assert_eq!(doc.containers().len(), 1);
        let replacement = &doc.containers()[0];
        assert_ne!(replacement.id, blocks[0].id);
        assert!(replacement.nodes[0].is_empty_paragraph());
    }

    #[test]
    fn code_containers_reject_marks_and_mentions() {
        let section_id = Uuid::new_v4();
        let mut block = Block::new(section_id, "en", "```\nlet x = 1;\n```");
        block.kind = BlockKind::Code;
        let mut doc = SectionDocument::from_blocks(section_id, "en", &[block.clone()]);

        let err = doc
            .replace_nodes(
                block.id,
                vec![ContentNode::Paragraph(vec![InlineNode::Text("x".into())])],
            )
            .unwrap_err();
        assert!(matches!(err, EditorError::CodeContainerRestriction));

        let err = doc
            .append_mention(block.id, 0, "id".into(), "label".into())
            .unwrap_err();
        assert!(matches!(err, EditorError::CodeContainerRestriction));
    }

    #[test]
    fn raw_text_in_code_block_is_wrapped_not_parsed() {
        let section_id = Uuid::new_v4();
        let mut block = Block::new(section_id, "en", "plain code, no fence");
        block.kind = BlockKind::Code;
        let container = BlockContainer::from_block(&block);

        assert!(matches!(
            container.nodes.as_slice(),
            [ContentNode::CodeBlock { .. }]
        ));
    }
}
