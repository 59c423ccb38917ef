//! End-to-end editor round-trip properties over canonical source text.

use littera_core::editor::document::{ContentNode, InlineNode};
use littera_core::editor::{markdown, EditorSession};
use littera_core::model::hierarchy::Block;
use uuid::Uuid;

const SAMPLES: &[&str] = &[
    "It was a dark night.",
    "Hello {@Ada|entity:11111111-1111-1111-1111-111111111111} there.",
    "# Chapter\n\nFirst paragraph with *emphasis*.\n\n> A quoted aside.",
    "```python\nprint(\"hello\")\n```",
    "Mixed `code` and **strong** and {@X|entity:deadbeef} tokens.",
    "---",
    "Wieczorem {@Jan|entity:22222222-2222-2222-2222-222222222222} wrócił do domu.",
];

#[test]
fn parse_then_serialize_is_a_fixed_point() {
    for source in SAMPLES {
        let once = markdown::serialize(&markdown::parse(source));
        let twice = markdown::serialize(&markdown::parse(&once));
        assert_eq!(once, twice, "not a fixed point: {source:?}");
    }
}

#[test]
fn canonical_text_survives_load_and_save_untouched() {
    // Canonical inputs come back byte-equal from the container round trip.
    for source in SAMPLES {
        let canonical = markdown::serialize(&markdown::parse(source));
        let block = Block::new(Uuid::new_v4(), "en", canonical.clone());
        let session = EditorSession::open(block.section_id, "en", &[block]);

        assert!(!session.is_dirty(), "loading alone dirtied: {source:?}");
        assert_eq!(session.document().containers()[0].source_text(), canonical);
    }
}

#[test]
fn mention_literal_round_trips_bit_exact_through_a_session() {
    let source = "Hello {@Ada|entity:11111111-1111-1111-1111-111111111111} there.";
    let block = Block::new(Uuid::new_v4(), "en", source);
    let session = EditorSession::open(block.section_id, "en", &[block]);

    let container = &session.document().containers()[0];
    assert_eq!(container.source_text(), source);

    let ContentNode::Paragraph(inlines) = &container.nodes[0] else {
        panic!("expected a paragraph");
    };
    assert!(inlines.iter().any(|inline| matches!(
        inline,
        InlineNode::Mention { entity, label }
            if entity == "11111111-1111-1111-1111-111111111111" && label == "Ada"
    )));
}

#[test]
fn editing_only_the_middle_block_updates_only_it() {
    let section_id = Uuid::new_v4();
    let blocks = vec![
        Block::new(section_id, "en", "First."),
        Block::new(section_id, "en", "Second."),
        Block::new(section_id, "en", "Third."),
    ];
    let mut session = EditorSession::open(section_id, "en", &blocks);

    session
        .document_mut()
        .replace_nodes(
            blocks[1].id,
            vec![ContentNode::Paragraph(vec![InlineNode::Text(
                "Second, edited.".into(),
            )])],
        )
        .unwrap();

    let plan = session.save_plan();
    assert!(plan.creates.is_empty());
    assert!(plan.deletes.is_empty());
    assert_eq!(plan.updates.len(), 1);
    assert_eq!(plan.updates[0].id, blocks[1].id);
    assert_eq!(plan.updates[0].source_text(), "Second, edited.");
}
