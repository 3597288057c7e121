//! First-eligible-occurrence link insertion.
//!
//! Candidates are found by walking the paragraph's text nodes, so keyword
//! occurrences inside attribute values or existing anchors are never
//! considered. The mutated document is produced by re-serializing the parse
//! tree with only the target text node rewritten; untouched subtrees go
//! through the parser's own serializer.

use std::collections::HashSet;
use std::fmt::Write as _;

use regex::Regex;
use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node};
use tracing::debug;

use crate::scope::ScopedBlock;

/// The accepted match: a byte range within one text node.
struct Splice {
    target: NodeId,
    start: usize,
    end: usize,
}

/// Wrap the first eligible occurrence of `keyword` within the scoped block
/// in an anchor pointing at `link_target`.
///
/// Eligibility: a case-insensitive, ASCII whole-word occurrence in a text
/// node with no `<a>` ancestor. At most one link is created per call, even
/// when the keyword occurs in several paragraphs.
///
/// Returns the mutated document HTML, or `None` when no paragraph yields an
/// acceptable candidate (the document is then left untouched by the caller).
pub fn insert(
    doc: &Html,
    block: &ScopedBlock<'_>,
    keyword: &str,
    link_target: &str,
) -> Option<String> {
    if keyword.trim().is_empty() {
        return None;
    }

    let matcher = Regex::new(&format!("(?i){}", regex::escape(keyword)))
        .expect("escaped keyword is a valid regex");
    let needle = keyword.to_lowercase();

    for (index, paragraph) in block.paragraphs.iter().enumerate() {
        // Cheap pre-filter on the paragraph's plain text.
        let plain: String = paragraph.text().collect();
        if !plain.to_lowercase().contains(&needle) {
            continue;
        }

        if let Some(splice) = find_candidate(paragraph, &matcher) {
            debug!(paragraph = index, keyword, "inserting link");
            return Some(rebuild_document(doc, &splice, link_target));
        }
    }

    None
}

/// Scan a paragraph's text nodes for the first acceptable match.
fn find_candidate(paragraph: &ElementRef<'_>, matcher: &Regex) -> Option<Splice> {
    for node in paragraph.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        if inside_anchor(node, paragraph.id()) {
            continue;
        }

        for m in matcher.find_iter(text) {
            if is_whole_word(text, m.start(), m.end()) {
                return Some(Splice {
                    target: node.id(),
                    start: m.start(),
                    end: m.end(),
                });
            }
        }
    }

    None
}

/// True if any ancestor of `node`, up to (excluding) the paragraph, is an anchor.
fn inside_anchor(node: NodeRef<'_, Node>, paragraph: NodeId) -> bool {
    for ancestor in node.ancestors() {
        if ancestor.id() == paragraph {
            break;
        }
        if ancestor
            .value()
            .as_element()
            .is_some_and(|el| el.name() == "a")
        {
            return true;
        }
    }
    false
}

/// ASCII whole-word check: the match must not be adjacent to an alphanumeric
/// character on either side.
fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(|c| c.is_ascii_alphanumeric())
        && !after.is_some_and(|c| c.is_ascii_alphanumeric())
}

/// Re-serialize the whole fragment, rewriting only the spliced text node.
fn rebuild_document(doc: &Html, splice: &Splice, href: &str) -> String {
    let target = doc
        .tree
        .get(splice.target)
        .expect("splice target is in the tree");
    let on_path: HashSet<NodeId> = target.ancestors().map(|n| n.id()).collect();

    let mut out = String::new();
    for child in doc.root_element().children() {
        serialize_node(child, splice, href, &on_path, &mut out);
    }
    out
}

fn serialize_node(
    node: NodeRef<'_, Node>,
    splice: &Splice,
    href: &str,
    on_path: &HashSet<NodeId>,
    out: &mut String,
) {
    match node.value() {
        Node::Text(text) => {
            if node.id() == splice.target {
                let t: &str = text;
                out.push_str(&escape_text(&t[..splice.start]));
                out.push_str("<a href=\"");
                out.push_str(&escape_attr(href));
                out.push_str("\">");
                out.push_str(&escape_text(&t[splice.start..splice.end]));
                out.push_str("</a>");
                out.push_str(&escape_text(&t[splice.end..]));
            } else {
                out.push_str(&escape_text(text));
            }
        }
        Node::Element(el) => {
            if on_path.contains(&node.id()) {
                // An ancestor of the splice: rebuild the open tag and recurse.
                out.push('<');
                out.push_str(el.name());
                for (name, value) in el.attrs() {
                    let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
                }
                out.push('>');
                for child in node.children() {
                    serialize_node(child, splice, href, on_path, out);
                }
                let _ = write!(out, "</{}>", el.name());
            } else if let Some(el_ref) = ElementRef::wrap(node) {
                out.push_str(&el_ref.html());
            }
        }
        Node::Comment(comment) => {
            let _ = write!(out, "<!--{}-->", &**comment);
        }
        _ => {}
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}
