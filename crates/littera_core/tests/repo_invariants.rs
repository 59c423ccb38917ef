//! Data-access invariants against a live embedded cluster.
//!
//! All tests here are `#[ignore]`d: they need the engine binaries in the
//! user cache (first `littera init` downloads them). Run with
//! `cargo test -- --ignored` on a machine that has initialized a work.

mod common;

use common::ScratchWork;
use littera_core::io::{export_work, import_work};
use littera_core::model::derived::BlockAlignment;
use littera_core::model::hierarchy::{Block, Document, Section};
use littera_core::model::semantic::{Entity, EntityLabel, Mention};
use littera_core::repo::alignment_repo::{AlignmentRepository, PgAlignmentRepository};
use littera_core::repo::block_repo::{
    BlockBatch, BlockRepository, BlockTextUpdate, PgBlockRepository,
};
use littera_core::repo::document_repo::{DocumentRepository, PgDocumentRepository};
use littera_core::repo::entity_repo::{EntityRepository, PgEntityRepository};
use littera_core::repo::mention_repo::{MentionRepository, PgMentionRepository};
use littera_core::repo::section_repo::{PgSectionRepository, SectionRepository};
use littera_core::repo::work_repo::{PgWorkRepository, WorkRepository};
use littera_core::repo::RepoError;
use uuid::Uuid;

fn seed_section(work: &mut ScratchWork) -> (Uuid, Uuid) {
    let document = Document::new(work.work_id, Some("Doc".into()));
    PgDocumentRepository::new(&mut work.client)
        .create_document(&document)
        .unwrap();
    let section = Section::new(document.id, Some("Section".into()));
    PgSectionRepository::new(&mut work.client)
        .create_section(&section)
        .unwrap();
    (document.id, section.id)
}

#[test]
#[ignore = "requires embedded cluster binaries"]
fn create_with_existing_id_is_a_conflict_and_state_is_unchanged() {
    let mut work = ScratchWork::provision();
    let (_, section_id) = seed_section(&mut work);

    let block = Block::new(section_id, "en", "It was a dark night.");
    let mut repo = PgBlockRepository::new(&mut work.client);
    repo.create_block(&block).unwrap();

    let err = repo.create_block(&block).unwrap_err();
    assert!(matches!(err, RepoError::Conflict { .. }));

    let listed = repo.list_blocks(section_id).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].source_text, "It was a dark night.");
    assert_eq!(listed[0].language, "en");
}

#[test]
#[ignore = "requires embedded cluster binaries"]
fn mention_uniqueness_per_block_entity_language() {
    let mut work = ScratchWork::provision();
    let (_, section_id) = seed_section(&mut work);

    let block = Block::new(section_id, "en", "text");
    PgBlockRepository::new(&mut work.client)
        .create_block(&block)
        .unwrap();
    let entity = Entity::new("person", "Ada");
    PgEntityRepository::new(&mut work.client)
        .create_entity(&entity)
        .unwrap();

    let mut repo = PgMentionRepository::new(&mut work.client);
    repo.create_mention(&Mention::new(block.id, entity.id, "en"))
        .unwrap();
    let err = repo
        .create_mention(&Mention::new(block.id, entity.id, "en"))
        .unwrap_err();
    assert!(matches!(err, RepoError::UniqueViolation { .. }));

    assert_eq!(repo.list_by_block(block.id).unwrap().len(), 1);

    // A different mention language is fine, reported with the block's own.
    let created = repo
        .create_mention(&Mention::new(block.id, entity.id, "pl"))
        .unwrap();
    assert_eq!(created.block_language, "en");
}

#[test]
#[ignore = "requires embedded cluster binaries"]
fn listing_follows_order_index_then_created_at_then_id() {
    let mut work = ScratchWork::provision();
    let (_, section_id) = seed_section(&mut work);

    let mut repo = PgBlockRepository::new(&mut work.client);
    for text in ["one", "two", "three"] {
        repo.create_block(&Block::new(section_id, "en", text)).unwrap();
    }

    let listed = repo.list_blocks(section_id).unwrap();
    let texts: Vec<&str> = listed.iter().map(|block| block.source_text.as_str()).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);

    let mut indices: Vec<i64> = listed.iter().map(|block| block.order_index).collect();
    let sorted = indices.clone();
    indices.sort();
    assert_eq!(indices, sorted);

    repo.move_block(listed[2].id, 1).unwrap();
    let moved = repo.list_blocks(section_id).unwrap();
    assert_eq!(moved[0].source_text, "three");
}

#[test]
#[ignore = "requires embedded cluster binaries"]
fn work_deletion_cascades_but_keeps_entities() {
    let mut work = ScratchWork::provision();
    let (_, section_id) = seed_section(&mut work);

    let block = Block::new(section_id, "en", "text");
    PgBlockRepository::new(&mut work.client)
        .create_block(&block)
        .unwrap();
    let entity = Entity::new("person", "Ada");
    PgEntityRepository::new(&mut work.client)
        .create_entity(&entity)
        .unwrap();
    PgMentionRepository::new(&mut work.client)
        .create_mention(&Mention::new(block.id, entity.id, "en"))
        .unwrap();

    let counts = PgWorkRepository::new(&mut work.client)
        .delete_work(work.work_id)
        .unwrap();
    assert_eq!(counts.documents, 1);
    assert_eq!(counts.blocks, 1);
    assert_eq!(counts.mentions, 1);

    let work_id = work.work_id;
    assert!(PgWorkRepository::new(&mut work.client)
        .get_work()
        .unwrap()
        .is_none());
    assert!(PgDocumentRepository::new(&mut work.client)
        .list_documents(work_id)
        .unwrap()
        .is_empty());

    // The entity survives with zero mentions.
    let mut entity_repo = PgEntityRepository::new(&mut work.client);
    assert!(entity_repo.get_entity(entity.id).unwrap().is_some());
    assert_eq!(entity_repo.mention_count(entity.id).unwrap(), 0);
}

#[test]
#[ignore = "requires embedded cluster binaries"]
fn batch_save_is_atomic() {
    let mut work = ScratchWork::provision();
    let (_, section_id) = seed_section(&mut work);

    let keep = Block::new(section_id, "en", "keep");
    let gone = Block::new(section_id, "en", "gone");
    let mut repo = PgBlockRepository::new(&mut work.client);
    repo.create_block(&keep).unwrap();
    repo.create_block(&gone).unwrap();

    // One update targets a missing block: the whole batch must roll back.
    let bad_batch = BlockBatch {
        creates: vec![],
        updates: vec![
            BlockTextUpdate {
                id: keep.id,
                source_text: "kept, edited".into(),
            },
            BlockTextUpdate {
                id: Uuid::new_v4(),
                source_text: "ghost".into(),
            },
        ],
        deletes: vec![],
    };
    assert!(repo.save_batch(&bad_batch).is_err());
    assert_eq!(repo.get_block(keep.id).unwrap().unwrap().source_text, "keep");

    let good_batch = BlockBatch {
        creates: vec![Block::new(section_id, "en", "brand new")],
        updates: vec![BlockTextUpdate {
            id: keep.id,
            source_text: "kept, edited".into(),
        }],
        deletes: vec![gone.id],
    };
    let outcome = repo.save_batch(&good_batch).unwrap();
    assert_eq!(outcome.created, 1);
    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.deleted, 1);
    assert!(repo.get_block(gone.id).unwrap().is_none());
}

#[test]
#[ignore = "requires embedded cluster binaries"]
fn alignment_gaps_report_missing_target_labels() {
    let mut work = ScratchWork::provision();
    let (_, section_id) = seed_section(&mut work);

    let english = Block::new(section_id, "en", "The algorithm halts.");
    let polish = Block::new(section_id, "pl", "Algorytm się zatrzymuje.");
    let mut block_repo = PgBlockRepository::new(&mut work.client);
    block_repo.create_block(&english).unwrap();
    block_repo.create_block(&polish).unwrap();

    let entity = Entity::new("concept", "Algorithm");
    PgEntityRepository::new(&mut work.client)
        .create_entity(&entity)
        .unwrap();
    PgEntityRepository::new(&mut work.client)
        .add_label(&EntityLabel::new(entity.id, "en", "algorithm"))
        .unwrap();
    PgMentionRepository::new(&mut work.client)
        .create_mention(&Mention::new(english.id, entity.id, "en"))
        .unwrap();

    let mut alignment_repo = PgAlignmentRepository::new(&mut work.client);
    alignment_repo
        .create_alignment(&BlockAlignment::new(english.id, polish.id, "translation"))
        .unwrap();

    // Same-language alignment is an invariant violation.
    let err = alignment_repo
        .create_alignment(&BlockAlignment::new(english.id, english.id, "translation"))
        .unwrap_err();
    assert!(matches!(err, RepoError::InvariantViolation(_)));

    let gaps = alignment_repo.label_gaps(None).unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].canonical_label, "Algorithm");
    assert_eq!(gaps[0].missing_language, "pl");
    assert_eq!(gaps[0].from_language, "en");

    // Alignments are many-to-many: a second relation over the same pair
    // (here with a different type) is allowed.
    alignment_repo
        .create_alignment(&BlockAlignment::new(english.id, polish.id, "paraphrase"))
        .unwrap();
    assert_eq!(alignment_repo.list_alignments(None).unwrap().len(), 2);

    // Adding the Polish label closes the gap.
    PgEntityRepository::new(&mut work.client)
        .add_label(&EntityLabel::new(entity.id, "pl", "algorytm"))
        .unwrap();
    let gaps = PgAlignmentRepository::new(&mut work.client)
        .label_gaps(None)
        .unwrap();
    assert!(gaps.is_empty());
}

#[test]
#[ignore = "requires embedded cluster binaries"]
fn export_import_round_trip_is_stable() {
    let mut work = ScratchWork::provision();
    let (_, section_id) = seed_section(&mut work);

    let block = Block::new(
        section_id,
        "en",
        "Hello {@Ada|entity:11111111-1111-1111-1111-111111111111} there.",
    );
    PgBlockRepository::new(&mut work.client)
        .create_block(&block)
        .unwrap();
    let entity = Entity::new("person", "Ada");
    PgEntityRepository::new(&mut work.client)
        .create_entity(&entity)
        .unwrap();
    PgMentionRepository::new(&mut work.client)
        .create_mention(&Mention::new(block.id, entity.id, "en"))
        .unwrap();

    let first = export_work(&mut work.client).unwrap();

    // Import into a fresh scratch work, then export again.
    let mut other = ScratchWork::provision();
    import_work(&mut other.client, &first).unwrap();
    let second = export_work(&mut other.client).unwrap();

    let first_body = first.work.unwrap();
    let second_body = second.work.unwrap();
    assert_eq!(first_body.documents.len(), second_body.documents.len());
    assert_eq!(
        first_body.documents[0].sections[0].blocks[0].source_text,
        second_body.documents[0].sections[0].blocks[0].source_text
    );
    // Identifiers are preserved across the round trip.
    assert_eq!(
        first_body.documents[0].id,
        second_body.documents[0].id
    );
    assert_eq!(first_body.entities[0].id, second_body.entities[0].id);
    assert_eq!(first_body.mentions.len(), second_body.mentions.len());
}

#[test]
#[ignore = "requires embedded cluster binaries"]
fn starting_a_live_cluster_again_is_a_noop() {
    let work = ScratchWork::provision();

    // The live lock is detected and start reports "not started here".
    let started = littera_core::db::cluster::start(&work.cluster).unwrap();
    assert!(!started);
}
