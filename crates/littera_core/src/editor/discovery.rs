//! Mention discovery and the slash command palette.
//!
//! # Responsibility
//! - Run a discovery session from the trigger character to accept/cancel:
//!   candidates are fetched once per session and filtered locally.
//! - Parse slash commands, which activate only at the start of an
//!   otherwise-empty content node.
//!
//! # Invariants
//! - Accepting inserts exactly one atomic mention node; cancelling leaves
//!   the document untouched.
//! - Candidate filtering is prefix-first, then substring, case-insensitive,
//!   over base labels and aliases; order within each group is stable.

use crate::editor::document::{ContentNode, SectionDocument};
use crate::editor::EditorResult;
use crate::model::hierarchy::BlockId;
use uuid::Uuid;

/// One entity offered by the discovery list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionCandidate {
    pub entity_id: Uuid,
    pub entity_type: String,
    pub label: String,
    pub aliases: Vec<String>,
}

/// A discovery session bound to one cursor position.
///
/// The caller owns candidate fetching (it is a suspension point); the
/// session caches the first delivery and filters locally afterwards.
#[derive(Debug)]
pub struct DiscoverySession {
    container: BlockId,
    node_index: usize,
    query: String,
    candidates: Option<Vec<MentionCandidate>>,
}

impl DiscoverySession {
    /// Starts a session at the trigger position.
    pub fn begin(container: BlockId, node_index: usize) -> Self {
        Self {
            container,
            node_index,
            query: String::new(),
            candidates: None,
        }
    }

    /// Whether candidates still need to be fetched.
    pub fn needs_candidates(&self) -> bool {
        self.candidates.is_none()
    }

    /// Delivers the fetched candidate list; later deliveries are ignored
    /// (the first fetch is cached for the session's lifetime).
    pub fn supply_candidates(&mut self, candidates: Vec<MentionCandidate>) {
        if self.candidates.is_none() {
            self.candidates = Some(candidates);
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn push_char(&mut self, ch: char) {
        self.query.push(ch);
    }

    pub fn pop_char(&mut self) {
        self.query.pop();
    }

    /// Current filtered selection list.
    pub fn matches(&self) -> Vec<&MentionCandidate> {
        let Some(candidates) = &self.candidates else {
            return Vec::new();
        };
        let needle = self.query.to_lowercase();
        if needle.is_empty() {
            return candidates.iter().collect();
        }

        let mut prefix_hits = Vec::new();
        let mut substring_hits = Vec::new();
        for candidate in candidates {
            let names = std::iter::once(&candidate.label).chain(candidate.aliases.iter());
            let mut best: Option<bool> = None;
            for name in names {
                let name = name.to_lowercase();
                if name.starts_with(&needle) {
                    best = Some(true);
                    break;
                }
                if name.contains(&needle) {
                    best = Some(false);
                }
            }
            match best {
                Some(true) => prefix_hits.push(candidate),
                Some(false) => substring_hits.push(candidate),
                None => {}
            }
        }
        prefix_hits.extend(substring_hits);
        prefix_hits
    }

    /// Accepts a candidate: inserts one atomic mention node at the session
    /// position. Consumes the session.
    pub fn accept(
        self,
        document: &mut SectionDocument,
        candidate: &MentionCandidate,
    ) -> EditorResult<()> {
        document.append_mention(
            self.container,
            self.node_index,
            candidate.entity_id.to_string(),
            candidate.label.clone(),
        )
    }

    /// Dismisses the session without altering the document.
    pub fn cancel(self) {}
}

/// Structural commands exposed through the slash palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand {
    Heading(u8),
    Code,
    Quote,
    HorizontalRule,
}

/// Parses a slash command.
///
/// Commands activate only at the start of an otherwise-empty content node;
/// anywhere else the input is ordinary text.
pub fn parse_slash_command(node: &ContentNode, input: &str) -> Option<SlashCommand> {
    if !node.is_empty_paragraph() {
        return None;
    }
    match input {
        "/h1" => Some(SlashCommand::Heading(1)),
        "/h2" => Some(SlashCommand::Heading(2)),
        "/h3" => Some(SlashCommand::Heading(3)),
        "/code" => Some(SlashCommand::Code),
        "/quote" => Some(SlashCommand::Quote),
        "/hr" => Some(SlashCommand::HorizontalRule),
        _ => None,
    }
}

/// Applies a slash command at `node_index` in container `id`.
///
/// Type-changing commands mutate the node in place; the horizontal rule
/// replaces it and appends a fresh empty node to keep typing.
pub fn apply_slash_command(
    document: &mut SectionDocument,
    id: BlockId,
    node_index: usize,
    command: SlashCommand,
) -> EditorResult<()> {
    match command {
        SlashCommand::Heading(level) => document.set_node(
            id,
            node_index,
            ContentNode::Heading {
                level,
                inlines: Vec::new(),
            },
        ),
        SlashCommand::Code => document.set_node(
            id,
            node_index,
            ContentNode::CodeBlock {
                info: String::new(),
                text: String::new(),
            },
        ),
        SlashCommand::Quote => document.set_node(
            id,
            node_index,
            ContentNode::Blockquote(vec![ContentNode::empty_paragraph()]),
        ),
        SlashCommand::HorizontalRule => {
            let (_, container) = document
                .find(id)
                .ok_or(crate::editor::EditorError::ContainerNotFound(id))?;
            let mut nodes = container.nodes.clone();
            if node_index >= nodes.len() {
                return Err(crate::editor::EditorError::NodeOutOfRange {
                    index: node_index,
                    len: nodes.len(),
                });
            }
            nodes[node_index] = ContentNode::HorizontalRule;
            nodes.insert(node_index + 1, ContentNode::empty_paragraph());
            document.replace_nodes(id, nodes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        apply_slash_command, parse_slash_command, DiscoverySession, MentionCandidate, SlashCommand,
    };
    use crate::editor::document::{ContentNode, InlineNode, SectionDocument};
    use crate::model::hierarchy::Block;
    use uuid::Uuid;

    fn candidates() -> Vec<MentionCandidate> {
        vec![
            MentionCandidate {
                entity_id: Uuid::new_v4(),
                entity_type: "person".into(),
                label: "Ada Lovelace".into(),
                aliases: vec!["the Countess".into()],
            },
            MentionCandidate {
                entity_id: Uuid::new_v4(),
                entity_type: "concept".into(),
                label: "Analytical Engine".into(),
                aliases: vec![],
            },
            MentionCandidate {
                entity_id: Uuid::new_v4(),
                entity_type: "place".into(),
                label: "London".into(),
                aliases: vec![],
            },
        ]
    }

    #[test]
    fn filtering_is_prefix_first_then_substring() {
        let mut session = DiscoverySession::begin(Uuid::new_v4(), 0);
        assert!(session.needs_candidates());
        session.supply_candidates(candidates());

        session.set_query("a");
        let labels: Vec<&str> = session
            .matches()
            .iter()
            .map(|candidate| candidate.label.as_str())
            .collect();
        // Prefix hits (Ada, Analytical) before the substring hit (London).
        assert_eq!(labels, vec!["Ada Lovelace", "Analytical Engine", "London"]);
    }

    #[test]
    fn aliases_participate_in_matching() {
        let mut session = DiscoverySession::begin(Uuid::new_v4(), 0);
        session.supply_candidates(candidates());
        session.set_query("countess");

        let labels: Vec<&str> = session
            .matches()
            .iter()
            .map(|candidate| candidate.label.as_str())
            .collect();
        assert_eq!(labels, vec!["Ada Lovelace"]);
    }

    #[test]
    fn accept_inserts_one_atomic_mention() {
        let section_id = Uuid::new_v4();
        let block = Block::new(section_id, "en", "Hello");
        let mut doc = SectionDocument::from_blocks(section_id, "en", &[block.clone()]);

        let mut session = DiscoverySession::begin(block.id, 0);
        session.supply_candidates(candidates());
        session.set_query("ada");
        let chosen = session.matches()[0].clone();
        session.accept(&mut doc, &chosen).unwrap();

        let ContentNode::Paragraph(inlines) = &doc.containers()[0].nodes[0] else {
            panic!("expected paragraph");
        };
        assert!(matches!(
            inlines.last(),
            Some(InlineNode::Mention { label, .. }) if label == "Ada Lovelace"
        ));
    }

    #[test]
    fn cancel_leaves_the_document_untouched() {
        let section_id = Uuid::new_v4();
        let block = Block::new(section_id, "en", "Hello");
        let doc = SectionDocument::from_blocks(section_id, "en", &[block.clone()]);
        let before = doc.containers()[0].clone();

        let mut session = DiscoverySession::begin(block.id, 0);
        session.supply_candidates(candidates());
        session.push_char('a');
        session.cancel();

        assert!(std::sync::Arc::ptr_eq(&before, &doc.containers()[0]));
    }

    #[test]
    fn slash_commands_activate_only_on_empty_nodes() {
        let empty = ContentNode::empty_paragraph();
        let full = ContentNode::Paragraph(vec![InlineNode::Text("text".into())]);

        assert_eq!(
            parse_slash_command(&empty, "/h2"),
            Some(SlashCommand::Heading(2))
        );
        assert_eq!(parse_slash_command(&full, "/h2"), None);
        assert_eq!(parse_slash_command(&empty, "/table"), None);
    }

    #[test]
    fn horizontal_rule_replaces_node_and_adds_a_fresh_one() {
        let section_id = Uuid::new_v4();
        let block = Block::new(section_id, "en", "");
        let mut doc = SectionDocument::from_blocks(section_id, "en", &[block.clone()]);

        apply_slash_command(&mut doc, block.id, 0, SlashCommand::HorizontalRule).unwrap();

        let nodes = &doc.containers()[0].nodes;
        assert!(matches!(nodes[0], ContentNode::HorizontalRule));
        assert!(nodes[1].is_empty_paragraph());
    }

    #[test]
    fn heading_command_mutates_the_node_type() {
        let section_id = Uuid::new_v4();
        let block = Block::new(section_id, "en", "");
        let mut doc = SectionDocument::from_blocks(section_id, "en", &[block.clone()]);

        apply_slash_command(&mut doc, block.id, 0, SlashCommand::Heading(3)).unwrap();
        assert!(matches!(
            doc.containers()[0].nodes[0],
            ContentNode::Heading { level: 3, .. }
        ));
    }
}
