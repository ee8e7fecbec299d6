//! Link extraction
//!
//! A [`LinkExtractor`] turns raw article content into the ordered list of
//! article titles it links to. Order matters: the crawler truncates this list
//! to the configured breadth limit without re-ranking. It also renders the
//! readable text of an article for the plain-text article output.

mod html;

pub use html::{HtmlLinkExtractor, DEFAULT_IGNORED_SECTIONS};

use crate::title::Title;

/// Extracts outbound article links from raw content
pub trait LinkExtractor: Send + Sync {
    /// Returns the linked titles in source order (may contain repeats)
    fn extract_links(&self, content: &str) -> Vec<Title>;

    /// Returns the article's readable text, one block per line
    fn extract_text(&self, content: &str) -> String;
}
