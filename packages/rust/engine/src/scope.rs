//! Heading-delimited scope location.
//!
//! The target region of a document is the run of paragraphs between the
//! first heading containing the marker text and the next heading of equal
//! or higher significance (or the end of the document).

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

/// All block-level nodes the locator walks, in document order.
static BLOCK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6, p").unwrap());

/// The ordered paragraphs lying between the marker heading and the next
/// heading of equal or higher level.
///
/// Ordering is preserved from the source document; paragraphs are never
/// reordered or merged. May be empty when the marker heading is immediately
/// followed by another heading.
#[derive(Debug, Clone)]
pub struct ScopedBlock<'a> {
    /// Heading level of the marker (1–6).
    pub marker_level: u8,
    /// Paragraph elements in document order.
    pub paragraphs: Vec<ElementRef<'a>>,
}

/// Find the scope region delimited by the first heading whose text contains
/// `marker_text` (case-sensitive, matching on the heading's collected text).
///
/// Returns `None` when no heading matches — callers must treat this as
/// "no eligible region", not as a failure. Pure read; never mutates.
pub fn locate<'a>(doc: &'a Html, marker_text: &str) -> Option<ScopedBlock<'a>> {
    let mut marker_level: Option<u8> = None;
    let mut paragraphs = Vec::new();

    for el in doc.select(&BLOCK_SEL) {
        let name = el.value().name();

        match marker_level {
            None => {
                if let Some(level) = heading_level(name) {
                    let text: String = el.text().collect();
                    if text.contains(marker_text) {
                        marker_level = Some(level);
                    }
                }
            }
            Some(marker) => {
                if let Some(level) = heading_level(name) {
                    // Deeper headings stay inside the scope; an equal or
                    // higher heading ends it.
                    if level <= marker {
                        break;
                    }
                } else {
                    paragraphs.push(el);
                }
            }
        }
    }

    marker_level.map(|level| ScopedBlock {
        marker_level: level,
        paragraphs,
    })
}

/// Heading level for `h1`–`h6` tag names, `None` for anything else.
fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}
