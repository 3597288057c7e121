//! Scoped, idempotent keyword-linking engine.
//!
//! Given an HTML description fragment, this crate locates the content region
//! following a designated heading ([`locate`]), checks whether a keyword is
//! already linked to a target URL ([`already_linked`]), and wraps the first
//! eligible occurrence of a keyword in a hyperlink ([`insert`]) without ever
//! double-linking, linking inside existing anchors, or touching markup
//! outside the target region.

mod guard;
mod insert;
mod scope;

use scraper::Html;

pub use guard::already_linked;
pub use insert::insert;
pub use scope::{ScopedBlock, locate};

/// True when the parsed fragment contains at least one element node.
///
/// Non-blank input that parses to zero elements (pure text payloads) cannot
/// carry a scope region and is treated as malformed by callers.
pub fn has_elements(doc: &Html) -> bool {
    let root = doc.root_element();
    root.descendants()
        .any(|n| n.id() != root.id() && n.value().is_element())
}
