//! Per-document keyword batch processing.
//!
//! Applies an ordered keyword list to one document and produces exactly one
//! terminal outcome: `linked`, `already_linked`, `no_match`, or `error`.
//! The guard pass runs for the whole keyword list before any insertion is
//! attempted, and the insertion pass stops at the first keyword that
//! produces a change.

use scraper::Html;
use tracing::debug;

use linkforge_shared::LinkOutcome;

/// Result of one (document, keyword-list) processing pass.
#[derive(Debug, Clone)]
pub struct PassReport {
    /// Terminal outcome of the pass.
    pub outcome: LinkOutcome,
    /// Mutated document HTML, present only when the outcome is `Linked`.
    pub html: Option<String>,
}

impl PassReport {
    fn outcome_only(outcome: LinkOutcome) -> Self {
        Self {
            outcome,
            html: None,
        }
    }

    fn error(reason: impl Into<String>) -> Self {
        Self::outcome_only(LinkOutcome::Error {
            reason: reason.into(),
        })
    }
}

/// Process one document against the keyword list, in order.
///
/// The document itself is never mutated in place; a `Linked` outcome carries
/// the new HTML for the caller to persist.
pub fn process(
    html: &str,
    marker_text: &str,
    keywords: &[String],
    link_target: &str,
) -> PassReport {
    if html.trim().is_empty() {
        return PassReport::error("empty document");
    }

    let doc = Html::parse_fragment(html);
    if !linkforge_engine::has_elements(&doc) {
        return PassReport::error("malformed markup");
    }

    let Some(block) = linkforge_engine::locate(&doc, marker_text) else {
        return PassReport::error("no scope region");
    };

    // Guard pass: every keyword is checked before any insertion, so a pass
    // over an already-linked document never mutates anything.
    for keyword in keywords {
        if linkforge_engine::already_linked(&block, keyword, link_target) {
            debug!(keyword = %keyword, "keyword already linked, skipping document");
            return PassReport::outcome_only(LinkOutcome::AlreadyLinked {
                keyword: keyword.clone(),
            });
        }
    }

    // Insertion pass: first keyword that lands a link wins.
    for keyword in keywords {
        if let Some(mutated) = linkforge_engine::insert(&doc, &block, keyword, link_target) {
            return PassReport {
                outcome: LinkOutcome::Linked {
                    keyword: keyword.clone(),
                },
                html: Some(mutated),
            };
        }
    }

    PassReport::outcome_only(LinkOutcome::NoMatch)
}
