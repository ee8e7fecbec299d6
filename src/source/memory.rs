//! In-memory article source
//!
//! Serves pages from a map instead of the network. Redirects are resolved
//! one hop, and transient failures can be scripted per title, which makes the
//! source suitable for offline runs and for exercising the crawler's retry and
//! pruning paths.

use crate::source::{Article, ArticleSource, FetchScope, SourceError, SourceResponse};
use crate::title::Title;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Renders a list of article links as MediaWiki-style HTML
///
/// # Example
///
/// ```
/// use disamgraph::source::render_links;
///
/// let html = render_links(&["Shot glass"]);
/// assert!(html.contains("href=\"/wiki/Shot_glass\""));
/// ```
pub fn render_links(links: &[&str]) -> String {
    let mut html = String::from("<div class=\"mw-parser-output\"><ul>");
    for link in links {
        let target = urlencoding::encode(&link.replace(' ', "_")).into_owned();
        html.push_str(&format!(
            "<li><a href=\"/wiki/{}\" title=\"{}\">{}</a></li>",
            target, link, link
        ));
    }
    html.push_str("</ul></div>");
    html
}

/// Article source that serves scripted pages from memory
#[derive(Debug, Default)]
pub struct MemorySource {
    pages: HashMap<Title, String>,
    redirects: HashMap<Title, Title>,
    failures: Mutex<HashMap<Title, u32>>,
    calls: Mutex<HashMap<Title, usize>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a page with raw content
    pub fn with_page(mut self, title: Title, content: impl Into<String>) -> Self {
        self.pages.insert(title, content.into());
        self
    }

    /// Adds a page whose content is an ordered list of links
    pub fn with_links(self, title: Title, links: &[&str]) -> Self {
        let content = render_links(links);
        self.with_page(title, content)
    }

    /// Makes `from` a redirect to `to`
    pub fn with_redirect(mut self, from: Title, to: Title) -> Self {
        self.redirects.insert(from, to);
        self
    }

    /// Makes the next `times` requests for `title` fail with a transient error
    pub fn failing(self, title: Title, times: u32) -> Self {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(title, times);
        self
    }

    /// Number of requests received for `title`
    pub fn calls(&self, title: &Title) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(title)
            .copied()
            .unwrap_or(0)
    }

    /// Number of requests received for any title
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }
}

#[async_trait]
impl ArticleSource for MemorySource {
    async fn fetch(&self, title: &Title, _scope: FetchScope) -> Result<SourceResponse, SourceError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(title.clone())
            .or_insert(0) += 1;

        {
            let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(remaining) = failures.get_mut(title) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SourceError::Unavailable(format!(
                        "scripted failure for {}",
                        title
                    )));
                }
            }
        }

        let resolved = self.redirects.get(title).unwrap_or(title);
        Ok(match self.pages.get(resolved) {
            Some(content) => SourceResponse::Found(Article {
                title: resolved.clone(),
                content: content.clone(),
            }),
            None => SourceResponse::NotFound,
        })
    }
}
