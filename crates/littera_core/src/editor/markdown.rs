//! Canonical Markdown-with-mentions serialization.
//!
//! # Responsibility
//! - Parse permissively: standard Markdown in the supported subset is
//!   normalized (setext headings to ATX, `_`/`__` emphasis to `*`/`**`,
//!   soft-wrapped lines to one paragraph, blank-line collapse).
//! - Serialize deterministically: `serialize(parse(s))` is a fixed point.
//!
//! # Invariants
//! - The mention literal `{@LABEL|entity:ID}` is preserved bit-exact in
//!   both directions, resolved or not.
//! - Blockquotes are part of the canonical form and are preserved.

use crate::editor::document::{ContentNode, InlineNode};
use once_cell::sync::Lazy;
use regex::Regex;

static ATX_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").expect("valid heading regex"));
static CLOSING_HASHES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+#+\s*$").expect("valid closing hashes regex"));
static SETEXT_H1_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s{0,3}=+\s*$").expect("valid setext h1 regex"));
static SETEXT_H2_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s{0,3}-+\s*$").expect("valid setext h2 regex"));
static HR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s{0,3}(\*\s*){3,}$|^\s{0,3}(-\s*){3,}$|^\s{0,3}(_\s*){3,}$")
        .expect("valid hr regex")
});
static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{@([^|{}\n]+)\|entity:([^}\n]+)\}").expect("valid mention regex"));

/// Parses canonical (or permissively, standard) Markdown into content nodes.
pub fn parse(source: &str) -> Vec<ContentNode> {
    let lines: Vec<&str> = source.lines().collect();
    let mut nodes: Vec<ContentNode> = Vec::new();
    let mut paragraph: Vec<String> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let stripped = line.trim_start();

        if line.trim().is_empty() {
            flush_paragraph(&mut nodes, &mut paragraph);
            i += 1;
            continue;
        }

        if stripped.starts_with("```") {
            flush_paragraph(&mut nodes, &mut paragraph);
            let info = stripped.trim_start_matches('`').trim().to_string();
            let mut body: Vec<&str> = Vec::new();
            i += 1;
            while i < lines.len() {
                let candidate = lines[i].trim_start();
                if candidate.starts_with("```") && candidate.trim_end_matches('`').trim().is_empty()
                {
                    i += 1;
                    break;
                }
                body.push(lines[i]);
                i += 1;
            }
            nodes.push(ContentNode::CodeBlock {
                info,
                text: body.join("\n"),
            });
            continue;
        }

        if let Some(caps) = ATX_HEADING_RE.captures(stripped) {
            flush_paragraph(&mut nodes, &mut paragraph);
            let level = caps[1].len() as u8;
            let raw = caps[2].trim_end();
            let text = CLOSING_HASHES_RE.replace(raw, "");
            nodes.push(ContentNode::Heading {
                level,
                inlines: parse_inlines(text.trim_end()),
            });
            i += 1;
            continue;
        }

        if !paragraph.is_empty() && SETEXT_H1_RE.is_match(line) {
            let text = paragraph.join(" ");
            paragraph.clear();
            nodes.push(ContentNode::Heading {
                level: 1,
                inlines: parse_inlines(&text),
            });
            i += 1;
            continue;
        }

        if !paragraph.is_empty() && SETEXT_H2_RE.is_match(line) {
            let text = paragraph.join(" ");
            paragraph.clear();
            nodes.push(ContentNode::Heading {
                level: 2,
                inlines: parse_inlines(&text),
            });
            i += 1;
            continue;
        }

        if HR_RE.is_match(line) {
            flush_paragraph(&mut nodes, &mut paragraph);
            nodes.push(ContentNode::HorizontalRule);
            i += 1;
            continue;
        }

        if stripped.starts_with('>') {
            flush_paragraph(&mut nodes, &mut paragraph);
            let mut quoted: Vec<String> = Vec::new();
            while i < lines.len() {
                let candidate = lines[i].trim_start();
                if !candidate.starts_with('>') {
                    break;
                }
                let inner = candidate.strip_prefix('>').unwrap_or(candidate);
                quoted.push(inner.strip_prefix(' ').unwrap_or(inner).to_string());
                i += 1;
            }
            nodes.push(ContentNode::Blockquote(parse(&quoted.join("\n"))));
            continue;
        }

        paragraph.push(line.trim_end().to_string());
        i += 1;
    }

    flush_paragraph(&mut nodes, &mut paragraph);
    nodes
}

fn flush_paragraph(nodes: &mut Vec<ContentNode>, paragraph: &mut Vec<String>) {
    if paragraph.is_empty() {
        return;
    }
    // Soft-wrapped lines collapse into one paragraph.
    let text = paragraph.join(" ");
    paragraph.clear();
    nodes.push(ContentNode::Paragraph(parse_inlines(&text)));
}

/// Serializes content nodes to canonical source text.
pub fn serialize(nodes: &[ContentNode]) -> String {
    let rendered: Vec<String> = nodes
        .iter()
        .filter_map(|node| {
            let text = serialize_node(node);
            // Empty paragraphs are an editor artifact, not persisted text.
            if text.is_empty() && matches!(node, ContentNode::Paragraph(_)) {
                None
            } else {
                Some(text)
            }
        })
        .collect();
    rendered.join("\n\n")
}

fn serialize_node(node: &ContentNode) -> String {
    match node {
        ContentNode::Paragraph(inlines) => serialize_inlines(inlines),
        ContentNode::Heading { level, inlines } => {
            let hashes = "#".repeat((*level).clamp(1, 6) as usize);
            format!("{hashes} {}", serialize_inlines(inlines))
        }
        ContentNode::CodeBlock { info, text } => {
            if text.is_empty() {
                format!("```{info}\n```")
            } else {
                format!("```{info}\n{text}\n```")
            }
        }
        ContentNode::Blockquote(children) => serialize(children)
            .lines()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        ContentNode::HorizontalRule => "---".to_string(),
    }
}

/// Parses inline content: text, `*`/`_` emphasis, `**`/`__` strong, code
/// spans and mention literals.
pub fn parse_inlines(text: &str) -> Vec<InlineNode> {
    let mut out: Vec<InlineNode> = Vec::new();
    let mut plain = String::new();
    let mut rest = text;
    let mut prev_char: Option<char> = None;

    while !rest.is_empty() {
        if let Some(caps) = MENTION_RE.captures(rest) {
            push_plain(&mut out, &mut plain);
            out.push(InlineNode::Mention {
                label: caps[1].to_string(),
                entity: caps[2].to_string(),
            });
            rest = &rest[caps[0].len()..];
            prev_char = Some('}');
            continue;
        }

        if let Some(stripped) = rest.strip_prefix('`') {
            if let Some(end) = stripped.find('`') {
                if end > 0 {
                    push_plain(&mut out, &mut plain);
                    out.push(InlineNode::Code(stripped[..end].to_string()));
                    rest = &stripped[end + 1..];
                    prev_char = Some('`');
                    continue;
                }
            }
        }

        // Underscores inside words (snake_case) are literal text.
        let underscore_ok = !prev_char.is_some_and(|ch| ch.is_alphanumeric());

        let strong = take_delimited(rest, "**")
            .or_else(|| underscore_ok.then(|| take_delimited(rest, "__")).flatten());
        if let Some((inner, after)) = strong {
            push_plain(&mut out, &mut plain);
            out.push(InlineNode::Strong(parse_inlines(inner)));
            rest = after;
            prev_char = Some('*');
            continue;
        }

        let emphasis = take_delimited(rest, "*")
            .or_else(|| underscore_ok.then(|| take_delimited(rest, "_")).flatten());
        if let Some((inner, after)) = emphasis {
            push_plain(&mut out, &mut plain);
            out.push(InlineNode::Emphasis(parse_inlines(inner)));
            rest = after;
            prev_char = Some('*');
            continue;
        }

        let ch = rest.chars().next().expect("rest is non-empty");
        plain.push(ch);
        prev_char = Some(ch);
        rest = &rest[ch.len_utf8()..];
    }

    push_plain(&mut out, &mut plain);
    out
}

/// Matches `<delim>inner<delim>` at the start of `rest` with non-empty
/// inner text that neither starts nor ends with whitespace.
fn take_delimited<'t>(rest: &'t str, delim: &str) -> Option<(&'t str, &'t str)> {
    let stripped = rest.strip_prefix(delim)?;
    let end = stripped.find(delim)?;
    let inner = &stripped[..end];
    if inner.is_empty()
        || inner.starts_with(char::is_whitespace)
        || inner.ends_with(char::is_whitespace)
    {
        return None;
    }
    Some((inner, &stripped[end + delim.len()..]))
}

fn push_plain(out: &mut Vec<InlineNode>, plain: &mut String) {
    if !plain.is_empty() {
        out.push(InlineNode::Text(std::mem::take(plain)));
    }
}

/// Serializes inline nodes to canonical text.
pub fn serialize_inlines(inlines: &[InlineNode]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            InlineNode::Text(text) => out.push_str(text),
            InlineNode::Emphasis(inner) => {
                out.push('*');
                out.push_str(&serialize_inlines(inner));
                out.push('*');
            }
            InlineNode::Strong(inner) => {
                out.push_str("**");
                out.push_str(&serialize_inlines(inner));
                out.push_str("**");
            }
            InlineNode::Code(text) => {
                out.push('`');
                out.push_str(text);
                out.push('`');
            }
            InlineNode::Mention { entity, label } => {
                out.push_str(&format!("{{@{label}|entity:{entity}}}"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{parse, parse_inlines, serialize};
    use crate::editor::document::{ContentNode, InlineNode};

    fn round_trip(source: &str) -> String {
        serialize(&parse(source))
    }

    fn assert_fixed_point(source: &str) {
        let once = round_trip(source);
        let twice = round_trip(&once);
        assert_eq!(once, twice, "round-trip is not a fixed point for {source:?}");
    }

    #[test]
    fn canonical_text_is_stable() {
        for source in [
            "Plain paragraph.",
            "# Title\n\nBody text.",
            "A *soft* and **hard** emphasis with `code`.",
            "First.\n\nSecond.",
            "> quoted text",
            "> first paragraph\n>\n> second paragraph",
            "---",
            "```rust\nlet x = 1;\n```",
        ] {
            assert_eq!(round_trip(source), source);
        }
    }

    #[test]
    fn mention_literal_is_bit_exact() {
        let source = "Hello {@Ada|entity:11111111-1111-1111-1111-111111111111} there.";
        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn unresolved_mention_identifier_round_trips() {
        let source = "See {@Ghost|entity:not-a-real-id}.";
        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn setext_headings_normalize_to_atx() {
        assert_eq!(round_trip("Title\n====="), "# Title");
        assert_eq!(round_trip("Subtitle\n-----"), "## Subtitle");
        assert_fixed_point("Title\n=====");
    }

    #[test]
    fn underscore_emphasis_normalizes_to_asterisk() {
        assert_eq!(round_trip("_em_ and __strong__"), "*em* and **strong**");
        assert_fixed_point("_em_ and __strong__");
    }

    #[test]
    fn soft_wrapped_lines_collapse_into_one_paragraph() {
        assert_eq!(round_trip("one\ntwo\nthree"), "one two three");
        assert_eq!(round_trip("> one\n> two"), "> one two");
    }

    #[test]
    fn blank_lines_collapse() {
        assert_eq!(round_trip("a\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn blockquotes_are_preserved_and_nested() {
        assert_eq!(round_trip("> outer\n>\n> > inner"), "> outer\n>\n> > inner");
        assert_fixed_point("> outer\n>\n> > inner");
    }

    #[test]
    fn horizontal_rule_variants_normalize() {
        assert_eq!(round_trip("***"), "---");
        assert_eq!(round_trip("- - -"), "---");
    }

    #[test]
    fn closing_atx_hashes_are_stripped() {
        assert_eq!(round_trip("## Title ##"), "## Title");
    }

    #[test]
    fn unclosed_fence_runs_to_end_of_input() {
        let nodes = parse("```\ncode line");
        assert!(matches!(
            nodes.as_slice(),
            [ContentNode::CodeBlock { text, .. }] if text == "code line"
        ));
    }

    #[test]
    fn unpaired_markers_stay_literal_text() {
        for source in ["a * b", "2 * 3 = 6", "`` stray"] {
            assert_fixed_point(source);
        }
    }

    #[test]
    fn intraword_underscores_are_literal() {
        assert_eq!(round_trip("snake_case_name"), "snake_case_name");
    }

    #[test]
    fn mention_between_text_segments() {
        let inlines = parse_inlines("Hello {@Ada|entity:x} there.");
        assert_eq!(
            inlines,
            vec![
                InlineNode::Text("Hello ".into()),
                InlineNode::Mention {
                    label: "Ada".into(),
                    entity: "x".into()
                },
                InlineNode::Text(" there.".into()),
            ]
        );
    }

    #[test]
    fn emphasis_nests_inside_strong() {
        let inlines = parse_inlines("**bold *and* inner**");
        assert_eq!(
            inlines,
            vec![InlineNode::Strong(vec![
                InlineNode::Text("bold ".into()),
                InlineNode::Emphasis(vec![InlineNode::Text("and".into())]),
                InlineNode::Text(" inner".into()),
            ])]
        );
    }

    #[test]
    fn heading_keeps_inline_mentions() {
        let nodes = parse("# About {@Ada|entity:a1}");
        assert_eq!(serialize(&nodes), "# About {@Ada|entity:a1}");
    }
}
