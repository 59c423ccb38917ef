//! Editing session: saved snapshot, dirty detection, save protocol.
//!
//! # Responsibility
//! - Track the saved snapshot next to the live document and classify each
//!   container as clean / created / updated / deleted.
//! - Persist one save as a single `save_batch` transaction, promoting the
//!   snapshot only on success.
//!
//! # Invariants
//! - Dirty detection checks reference identity first (structural sharing),
//!   falling back to field equality only when a container was rebuilt.
//! - On save failure the document, snapshot and dirty flag are unchanged.
//! - Navigation away from a dirty session requires explicit confirmation.

use crate::editor::document::{BlockContainer, SectionDocument};
use crate::editor::{EditorError, EditorResult};
use crate::model::hierarchy::{Block, BlockId};
use crate::repo::block_repo::{BatchOutcome, BlockBatch, BlockRepository, BlockTextUpdate};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Classified effect of one save, before it is applied.
#[derive(Debug, Clone, Default)]
pub struct SavePlan {
    pub creates: Vec<Arc<BlockContainer>>,
    pub updates: Vec<Arc<BlockContainer>>,
    pub deletes: Vec<BlockId>,
}

impl SavePlan {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// One Section's editing session.
pub struct EditorSession {
    document: SectionDocument,
    snapshot: HashMap<BlockId, Arc<BlockContainer>>,
    snapshot_order: Vec<BlockId>,
}

impl EditorSession {
    /// Opens a session over a Section's persisted blocks.
    ///
    /// An empty Section yields a fresh container that is *not* part of the
    /// snapshot, so the first save creates it.
    pub fn open(section_id: Uuid, default_language: &str, blocks: &[Block]) -> Self {
        let document = SectionDocument::from_blocks(section_id, default_language, blocks);
        let persisted: std::collections::HashSet<BlockId> =
            blocks.iter().map(|block| block.id).collect();

        let mut snapshot = HashMap::new();
        let mut snapshot_order = Vec::new();
        for container in document.containers() {
            if persisted.contains(&container.id) {
                snapshot.insert(container.id, container.clone());
                snapshot_order.push(container.id);
            }
        }

        Self {
            document,
            snapshot,
            snapshot_order,
        }
    }

    pub fn document(&self) -> &SectionDocument {
        &self.document
    }

    /// Mutable access for edit commands. Every mutation goes through
    /// [`SectionDocument`] operations, which preserve structural sharing.
    pub fn document_mut(&mut self) -> &mut SectionDocument {
        &mut self.document
    }

    /// Classifies the current document against the saved snapshot.
    ///
    /// - id absent from the snapshot → create;
    /// - present and reference-equal → clean;
    /// - present and rebuilt → update (field equality filters no-op rebuilds);
    /// - snapshot id absent from the document → delete.
    pub fn save_plan(&self) -> SavePlan {
        let mut plan = SavePlan::default();
        let mut seen: std::collections::HashSet<BlockId> = std::collections::HashSet::new();

        for container in self.document.containers() {
            seen.insert(container.id);
            match self.snapshot.get(&container.id) {
                None => plan.creates.push(container.clone()),
                Some(saved) => {
                    if Arc::ptr_eq(saved, container) {
                        continue;
                    }
                    if **saved == **container {
                        continue;
                    }
                    plan.updates.push(container.clone());
                }
            }
        }

        for id in &self.snapshot_order {
            if !seen.contains(id) {
                plan.deletes.push(*id);
            }
        }
        plan
    }

    /// Whether the session holds unsaved changes.
    pub fn is_dirty(&self) -> bool {
        !self.save_plan().is_empty()
    }

    /// The navigation-away guard: leaving a dirty session requires the
    /// caller to have confirmed discarding the changes.
    pub fn confirm_navigation(&self, confirmed: bool) -> EditorResult<()> {
        if self.is_dirty() && !confirmed {
            return Err(EditorError::UnsavedChanges);
        }
        Ok(())
    }

    /// Serializes the plan and applies it through Data Access as one
    /// transaction. On success the current document becomes the new saved
    /// snapshot; on failure everything is left untouched.
    pub fn save<R: BlockRepository>(&mut self, repo: &mut R) -> EditorResult<BatchOutcome> {
        let plan = self.save_plan();
        if plan.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let mut batch = BlockBatch::default();
        for container in &plan.updates {
            batch.updates.push(BlockTextUpdate {
                id: container.id,
                source_text: container.source_text(),
            });
        }
        for container in &plan.creates {
            // Creates keep the container's minted id, kind and language.
            let mut block = Block::with_id(
                container.id,
                self.document.section_id(),
                container.language.clone(),
                container.source_text(),
            );
            block.kind = container.kind;
            batch.creates.push(block);
        }
        batch.deletes = plan.deletes.clone();

        let outcome = repo.save_batch(&batch)?;
        self.promote_snapshot();
        Ok(outcome)
    }

    fn promote_snapshot(&mut self) {
        self.snapshot.clear();
        self.snapshot_order.clear();
        for container in self.document.containers() {
            self.snapshot.insert(container.id, container.clone());
            self.snapshot_order.push(container.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EditorSession;
    use crate::editor::document::{ContentNode, InlineNode};
    use crate::editor::EditorError;
    use crate::model::hierarchy::{Block, BlockId, SectionId};
    use crate::repo::block_repo::{
        BatchOutcome, BlockBatch, BlockPatch, BlockRepository, BlockTextUpdate,
    };
    use crate::repo::{RepoError, RepoResult};
    use uuid::Uuid;

    /// In-memory repository capturing batches, for save-protocol tests.
    #[derive(Default)]
    struct RecordingRepo {
        batches: Vec<BlockBatch>,
        fail_next: bool,
    }

    impl BlockRepository for RecordingRepo {
        fn create_block(&mut self, _block: &Block) -> RepoResult<BlockId> {
            unimplemented!("not used by the editor")
        }
        fn get_block(&mut self, _id: BlockId) -> RepoResult<Option<Block>> {
            unimplemented!("not used by the editor")
        }
        fn list_blocks(&mut self, _section_id: SectionId) -> RepoResult<Vec<Block>> {
            unimplemented!("not used by the editor")
        }
        fn update_source_text(&mut self, _id: BlockId, _text: &str) -> RepoResult<()> {
            unimplemented!("not used by the editor")
        }
        fn update_block(&mut self, _id: BlockId, _patch: &BlockPatch) -> RepoResult<()> {
            unimplemented!("not used by the editor")
        }
        fn move_block(&mut self, _id: BlockId, _position: usize) -> RepoResult<()> {
            unimplemented!("not used by the editor")
        }
        fn delete_block(&mut self, _id: BlockId) -> RepoResult<()> {
            unimplemented!("not used by the editor")
        }
        fn save_batch(&mut self, batch: &BlockBatch) -> RepoResult<BatchOutcome> {
            if self.fail_next {
                self.fail_next = false;
                return Err(RepoError::NotFound {
                    kind: "block",
                    id: Uuid::new_v4(),
                });
            }
            self.batches.push(batch.clone());
            Ok(BatchOutcome {
                created: batch.creates.len(),
                updated: batch.updates.len(),
                deleted: batch.deletes.len(),
            })
        }
    }

    fn three_block_session() -> (EditorSession, Vec<Block>) {
        let section_id = Uuid::new_v4();
        let blocks = vec![
            Block::new(section_id, "en", "first"),
            Block::new(section_id, "en", "second"),
            Block::new(section_id, "en", "third"),
        ];
        (EditorSession::open(section_id, "en", &blocks), blocks)
    }

    fn paragraph(text: &str) -> ContentNode {
        ContentNode::Paragraph(vec![InlineNode::Text(text.into())])
    }

    #[test]
    fn clean_session_has_empty_plan() {
        let (session, _) = three_block_session();
        assert!(!session.is_dirty());
        assert!(session.save_plan().is_empty());
    }

    #[test]
    fn editing_one_block_yields_exactly_one_update() {
        let (mut session, blocks) = three_block_session();
        session
            .document_mut()
            .replace_nodes(blocks[1].id, vec![paragraph("second, revised")])
            .unwrap();

        let plan = session.save_plan();
        assert!(plan.creates.is_empty());
        assert!(plan.deletes.is_empty());
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].id, blocks[1].id);

        let mut repo = RecordingRepo::default();
        let outcome = session.save(&mut repo).unwrap();
        assert_eq!(outcome.updated, 1);
        assert_eq!(repo.batches.len(), 1);
        assert_eq!(
            repo.batches[0].updates,
            vec![BlockTextUpdate {
                id: blocks[1].id,
                source_text: "second, revised".into()
            }]
        );
    }

    #[test]
    fn rebuilding_identical_content_is_clean() {
        let (mut session, blocks) = three_block_session();
        // Same field content, new allocation: ptr_eq fails, field equality
        // classifies it clean.
        session
            .document_mut()
            .replace_nodes(blocks[0].id, vec![paragraph("first")])
            .unwrap();
        assert!(!session.is_dirty());
    }

    #[test]
    fn split_produces_one_update_and_one_create() {
        let section_id = Uuid::new_v4();
        let blocks = vec![Block::new(section_id, "en", "alpha\n\nbeta")];
        let mut session = EditorSession::open(section_id, "en", &blocks);

        let new_id = session
            .document_mut()
            .split_container(blocks[0].id, 1)
            .unwrap();

        let plan = session.save_plan();
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].id, blocks[0].id);
        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.creates[0].id, new_id);

        let mut repo = RecordingRepo::default();
        session.save(&mut repo).unwrap();
        let batch = &repo.batches[0];
        assert_eq!(batch.creates[0].id, new_id);
        assert_eq!(batch.creates[0].language, "en");
        assert_eq!(batch.creates[0].source_text, "beta");
    }

    #[test]
    fn deleting_a_container_issues_a_delete() {
        let (mut session, blocks) = three_block_session();
        session.document_mut().remove_container(blocks[2].id).unwrap();

        let plan = session.save_plan();
        assert_eq!(plan.deletes, vec![blocks[2].id]);

        let mut repo = RecordingRepo::default();
        let outcome = session.save(&mut repo).unwrap();
        assert_eq!(outcome.deleted, 1);
        assert!(!session.is_dirty());
    }

    #[test]
    fn empty_section_first_save_creates_the_seed_container() {
        let section_id = Uuid::new_v4();
        let mut session = EditorSession::open(section_id, "en", &[]);
        let seed_id = session.document().containers()[0].id;
        session
            .document_mut()
            .replace_nodes(seed_id, vec![paragraph("opening line")])
            .unwrap();

        let plan = session.save_plan();
        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.creates[0].id, seed_id);

        let mut repo = RecordingRepo::default();
        let outcome = session.save(&mut repo).unwrap();
        assert_eq!(outcome.created, 1);
        assert!(!session.is_dirty());
    }

    #[test]
    fn failed_save_keeps_the_session_dirty() {
        let (mut session, blocks) = three_block_session();
        session
            .document_mut()
            .replace_nodes(blocks[0].id, vec![paragraph("changed")])
            .unwrap();

        let mut repo = RecordingRepo {
            fail_next: true,
            ..RecordingRepo::default()
        };
        let err = session.save(&mut repo).unwrap_err();
        assert!(matches!(err, EditorError::Repo(_)));
        assert!(session.is_dirty());
        assert!(repo.batches.is_empty());

        // Retrying after the failure succeeds and clears the dirty flag.
        session.save(&mut repo).unwrap();
        assert!(!session.is_dirty());
    }

    #[test]
    fn successful_save_promotes_the_snapshot() {
        let (mut session, blocks) = three_block_session();
        session
            .document_mut()
            .replace_nodes(blocks[0].id, vec![paragraph("changed")])
            .unwrap();

        let mut repo = RecordingRepo::default();
        session.save(&mut repo).unwrap();
        assert!(!session.is_dirty());

        // Saving again is a no-op at the repository level.
        session.save(&mut repo).unwrap();
        assert_eq!(repo.batches.len(), 1);
    }

    #[test]
    fn navigation_guard_blocks_dirty_sessions() {
        let (mut session, blocks) = three_block_session();
        assert!(session.confirm_navigation(false).is_ok());

        session
            .document_mut()
            .replace_nodes(blocks[0].id, vec![paragraph("changed")])
            .unwrap();
        assert!(matches!(
            session.confirm_navigation(false),
            Err(EditorError::UnsavedChanges)
        ));
        assert!(session.confirm_navigation(true).is_ok());
    }
}
