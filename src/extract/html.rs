//! HTML link extractor for rendered MediaWiki articles
//!
//! # Link Extraction Rules
//!
//! **Include:**
//! - `<a href="...">` resolving under the article base URL, in document order
//!
//! **Exclude:**
//! - Links under an ignored section heading (`See also`, `References`, ...)
//!   until the next heading of the same or a higher level
//! - Links inside tables, figures, reference superscripts, hatnotes, navboxes
//!   and reference lists
//! - Red links, external links and file links
//! - Links to non-article namespaces and fragment-only links
//!
//! Plain text keeps headings, paragraphs and list items from the same
//! content, minus the skipped containers.

use crate::config::SourceConfig;
use crate::extract::LinkExtractor;
use crate::title::{title_from_href, Title};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Section headings whose links never describe the article itself
pub const DEFAULT_IGNORED_SECTIONS: &[&str] = &[
    "See also",
    "References",
    "Further reading",
    "External links",
    "Footnotes",
    "Notes",
    "Other",
    "Other uses",
];

/// Containers whose links are skipped
const SKIPPED_TAGS: &[&str] = &["table", "figure", "sup", "style", "script"];

/// Container classes whose links are skipped
const SKIPPED_CLASSES: &[&str] = &[
    "hatnote",
    "navbox",
    "reflist",
    "mw-references-wrap",
    "thumb",
    "infobox",
    "metadata",
    "mw-editsection",
];

/// Link classes that never point at an existing article
const SKIPPED_LINK_CLASSES: &[&str] = &["new", "external", "image", "mw-file-description"];

/// Extracts article links from rendered article HTML
#[derive(Debug, Clone)]
pub struct HtmlLinkExtractor {
    base_url: Url,
    ignored_sections: Vec<String>,
}

impl HtmlLinkExtractor {
    /// Creates an extractor for links under `base_url` (e.g. `https://en.wikipedia.org/wiki/`)
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self {
            base_url,
            ignored_sections: DEFAULT_IGNORED_SECTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Creates an extractor from the source configuration
    pub fn from_config(config: &SourceConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.article_base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid article-base-url: {}", e)))?;
        Ok(Self::new(base_url).with_ignored_sections(config.ignored_sections.iter().cloned()))
    }

    /// Replaces the list of ignored section headings
    pub fn with_ignored_sections<I, S>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_sections = sections.into_iter().map(Into::into).collect();
        self
    }

    fn is_ignored_section(&self, heading: &str) -> bool {
        self.ignored_sections
            .iter()
            .any(|section| section.eq_ignore_ascii_case(heading))
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, content: &str) -> Vec<Title> {
        let document = Html::parse_document(content);
        let selector = match Selector::parse("h2, h3, h4, a[href]") {
            Ok(selector) => selector,
            Err(_) => return Vec::new(),
        };

        let mut links = Vec::new();
        // Heading level of the ignored section we are inside, if any
        let mut ignoring: Option<u8> = None;

        for element in document.select(&selector) {
            if let Some(level) = heading_level(element.value().name()) {
                if matches!(ignoring, Some(active) if level <= active) {
                    ignoring = None;
                }
                if ignoring.is_none() && self.is_ignored_section(&heading_text(&element)) {
                    ignoring = Some(level);
                }
                continue;
            }

            if ignoring.is_some() || is_skipped_link(&element) || inside_skipped_block(&element) {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                match title_from_href(href, &self.base_url) {
                    Ok(title) => links.push(title),
                    Err(e) => tracing::trace!("Skipping link {}: {}", href, e),
                }
            }
        }

        links
    }

    fn extract_text(&self, content: &str) -> String {
        let document = Html::parse_document(content);
        let selector = match Selector::parse(TEXT_BLOCKS) {
            Ok(selector) => selector,
            Err(_) => return String::new(),
        };

        let mut lines = Vec::new();
        for element in document.select(&selector) {
            // Nested blocks are part of their outer block's text
            if inside_skipped_block(&element) || inside_text_block(&element) {
                continue;
            }

            let text = if heading_level(element.value().name()).is_some() {
                heading_text(&element)
            } else {
                block_text(&element)
            };
            if !text.is_empty() {
                lines.push(text);
            }
        }

        lines.join("\n")
    }
}

/// Elements that make up an article's readable text
const TEXT_BLOCKS: &str = "h2, h3, h4, p, li, dd";

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        _ => None,
    }
}

fn heading_text(element: &ElementRef) -> String {
    let text = element.text().collect::<String>();
    let text = text.trim();
    text.strip_suffix("[edit]").unwrap_or(text).trim().to_string()
}

/// Text of one block with whitespace collapsed and skipped containers left out
fn block_text(element: &ElementRef) -> String {
    let mut words = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let skipped = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != element.id())
            .filter_map(ElementRef::wrap)
            .any(|ancestor| is_skipped_container(&ancestor));
        if !skipped {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

fn inside_text_block(element: &ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| matches!(ancestor.value().name(), "p" | "li" | "dd"))
}

fn is_skipped_link(element: &ElementRef) -> bool {
    element
        .value()
        .classes()
        .any(|class| SKIPPED_LINK_CLASSES.contains(&class))
}

fn inside_skipped_block(element: &ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_skipped_container(&ancestor))
}

fn is_skipped_container(element: &ElementRef) -> bool {
    let value = element.value();
    SKIPPED_TAGS.contains(&value.name())
        || value.classes().any(|class| SKIPPED_CLASSES.contains(&class))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> HtmlLinkExtractor {
        HtmlLinkExtractor::new(Url::parse("https://en.wikipedia.org/wiki/").unwrap())
    }

    fn titles(html: &str) -> Vec<String> {
        extractor()
            .extract_links(html)
            .into_iter()
            .map(Title::into_string)
            .collect()
    }

    #[test]
    fn test_links_in_document_order() {
        let html = r#"<div class="mw-parser-output">
            <p><b>Shot</b> may refer to:</p>
            <ul>
                <li><a href="/wiki/Shot_(filmmaking)">Shot (filmmaking)</a></li>
                <li><a href="/wiki/Shot_glass">Shot glass</a></li>
                <li><a href="/wiki/Gunshot">Gunshot</a></li>
            </ul></div>"#;
        assert_eq!(
            titles(html),
            vec!["Shot (filmmaking)", "Shot glass", "Gunshot"]
        );
    }

    #[test]
    fn test_repeats_are_kept() {
        let html = r#"<p><a href="/wiki/A">A</a> <a href="/wiki/B">B</a> <a href="/wiki/A">again</a></p>"#;
        assert_eq!(titles(html), vec!["A", "B", "A"]);
    }

    #[test]
    fn test_ignored_section_until_next_heading() {
        let html = r#"
            <p><a href="/wiki/Kept">Kept</a></p>
            <h2 id="See_also">See also</h2>
            <ul><li><a href="/wiki/Dropped">Dropped</a></li></ul>
            <h3>Nested</h3>
            <ul><li><a href="/wiki/Also_dropped">Also dropped</a></li></ul>
            <h2>History</h2>
            <p><a href="/wiki/Kept_again">Kept again</a></p>"#;
        assert_eq!(titles(html), vec!["Kept", "Kept again"]);
    }

    #[test]
    fn test_legacy_heading_markup() {
        let html = r#"
            <h2><span class="mw-headline" id="References">References</span></h2>
            <p><a href="/wiki/Dropped">Dropped</a></p>"#;
        assert!(titles(html).is_empty());
    }

    #[test]
    fn test_skip_tables_hatnotes_and_references() {
        let html = r#"
            <div role="note" class="hatnote">For other uses, see <a href="/wiki/Shot_(disambiguation)">Shot (disambiguation)</a>.</div>
            <table class="infobox"><tr><td><a href="/wiki/Infobox_link">x</a></td></tr></table>
            <p>Text<sup class="reference"><a href="/wiki/Citation">[1]</a></sup>
            and <a href="/wiki/Body_link">body</a>.</p>"#;
        assert_eq!(titles(html), vec!["Body link"]);
    }

    #[test]
    fn test_skip_red_external_and_file_links() {
        let html = r##"<p>
            <a class="new" href="/w/index.php?title=Missing&amp;action=edit&amp;redlink=1">Missing</a>
            <a class="external text" href="https://example.com/">External</a>
            <a href="/wiki/File:Shot.jpg" class="mw-file-description">File</a>
            <a href="/wiki/Category:Sport">Category</a>
            <a href="#History">Anchor</a>
            <a href="/wiki/Valid">Valid</a>
        </p>"##;
        assert_eq!(titles(html), vec!["Valid"]);
    }

    #[test]
    fn test_custom_ignored_sections() {
        let html = r#"<h2>Trivia</h2><p><a href="/wiki/A">A</a></p>"#;
        let extractor = extractor().with_ignored_sections(["trivia"]);
        assert!(extractor.extract_links(html).is_empty());
    }

    #[test]
    fn test_base_url_without_trailing_slash() {
        let extractor =
            HtmlLinkExtractor::new(Url::parse("https://en.wikipedia.org/wiki").unwrap());
        let links = extractor.extract_links(r#"<a href="/wiki/Shot_put">x</a>"#);
        assert_eq!(links, vec![Title::new("Shot put").unwrap()]);
    }

    #[test]
    fn test_empty_content() {
        assert!(titles("").is_empty());
        assert!(extractor().extract_text("").is_empty());
    }

    #[test]
    fn test_plain_text_blocks() {
        let html = r#"<div class="mw-parser-output">
            <div class="hatnote">For other uses, see Shot.</div>
            <p>A <b>shot glass</b> is a   small glass.<sup class="reference">[1]</sup></p>
            <table class="infobox"><tr><td>Capacity</td></tr></table>
            <h2>Uses<span class="mw-editsection">[edit]</span></h2>
            <ul>
                <li>Spirits<ul><li>Vodka</li></ul></li>
                <li>Measuring</li>
            </ul></div>"#;
        assert_eq!(
            extractor().extract_text(html),
            "A shot glass is a small glass.\nUses\nSpirits Vodka\nMeasuring"
        );
    }
}
