//! Idempotency check: is the keyword already linked to the target?
//!
//! Running the same keyword/URL pair twice must be a no-op. This check runs
//! before any insertion attempt; a hit suppresses all mutation.

use std::sync::LazyLock;

use scraper::Selector;

use crate::scope::ScopedBlock;

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// True if any anchor within the scoped paragraphs points at exactly
/// `link_target` and its visible text contains `keyword` (case-insensitive).
pub fn already_linked(block: &ScopedBlock<'_>, keyword: &str, link_target: &str) -> bool {
    let needle = keyword.to_lowercase();

    for paragraph in &block.paragraphs {
        for anchor in paragraph.select(&ANCHOR_SEL) {
            if anchor.value().attr("href") != Some(link_target) {
                continue;
            }
            let text: String = anchor.text().collect();
            if text.to_lowercase().contains(&needle) {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;
    use crate::scope::locate;

    const TARGET: &str = "https://shop.example.com/collections/sapphire";

    fn check(html: &str, keyword: &str, target: &str) -> bool {
        let doc = Html::parse_fragment(html);
        let block = locate(&doc, "Product Description").expect("scope found");
        already_linked(&block, keyword, target)
    }

    #[test]
    fn detects_existing_link() {
        let html = format!(
            "<h2>Product Description</h2>\
             <p>A fine <a href=\"{TARGET}\">Sapphire</a> ring.</p>"
        );
        assert!(check(&html, "Sapphire", TARGET));
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let html = format!(
            "<h2>Product Description</h2>\
             <p>A fine <a href=\"{TARGET}\">SAPPHIRE</a> ring.</p>"
        );
        assert!(check(&html, "sapphire", TARGET));
    }

    #[test]
    fn different_href_is_not_a_hit() {
        let html = "<h2>Product Description</h2>\
                    <p>A fine <a href=\"https://other.example.com/\">Sapphire</a> ring.</p>";
        assert!(!check(html, "Sapphire", TARGET));
    }

    #[test]
    fn href_comparison_is_exact() {
        // A link to a sub-path of the target does not satisfy the guard.
        let html = format!(
            "<h2>Product Description</h2>\
             <p><a href=\"{TARGET}/blue\">Sapphire</a> ring.</p>"
        );
        assert!(!check(&html, "Sapphire", TARGET));
    }

    #[test]
    fn anchor_without_keyword_text_is_not_a_hit() {
        let html = format!(
            "<h2>Product Description</h2>\
             <p>See <a href=\"{TARGET}\">our collection</a> of sapphires.</p>"
        );
        assert!(!check(&html, "Sapphire", TARGET));
    }

    #[test]
    fn anchors_outside_scope_are_ignored() {
        let html = format!(
            "<p>Intro with <a href=\"{TARGET}\">Sapphire</a>.</p>\
             <h2>Product Description</h2><p>Plain text.</p>"
        );
        assert!(!check(&html, "Sapphire", TARGET));
    }

    #[test]
    fn keyword_in_nested_anchor_markup_counts() {
        let html = format!(
            "<h2>Product Description</h2>\
             <p><a href=\"{TARGET}\"><strong>Sapphire</strong> rings</a> here.</p>"
        );
        assert!(check(&html, "Sapphire", TARGET));
    }
}
