//! Article sources
//!
//! An [`ArticleSource`] turns a title into raw article content. The crawler
//! only relies on the tri-state contract of [`ArticleSource::fetch`]:
//! found, not found, or a (possibly transient) [`SourceError`].
//!
//! - `WikipediaSource` talks to a MediaWiki `api.php` endpoint
//! - `MemorySource` serves scripted pages from memory

mod memory;
mod pacer;
mod wikipedia;

pub use memory::{render_links, MemorySource};
pub use pacer::RequestPacer;
pub use wikipedia::{build_http_client, parse_retry_after, user_agent_string, WikipediaSource};

use crate::title::Title;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// How much of an article to retrieve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchScope {
    /// The whole page (used for the disambiguation page)
    Full,
    /// Only the lead section, before the first heading
    LeadSection,
}

impl FetchScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::LeadSection => "lead",
        }
    }
}

/// Article content as returned by a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Canonical title, after the source resolved any redirect
    pub title: Title,

    /// Raw article markup
    pub content: String,
}

/// Non-error outcomes of a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceResponse {
    Found(Article),
    NotFound,
}

/// Errors reported by an article source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("Rate limited (HTTP 429)")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error {code}: {info}")]
    Api { code: String, info: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status } => *status == 429 || (500..600).contains(status),
            Self::RateLimited { .. } => true,
            Self::Api { code, .. } => matches!(
                code.as_str(),
                "maxlag" | "ratelimited" | "readonly" | "internal_api_error_DBQueryError"
            ),
            Self::Decode(_) => false,
            Self::Unavailable(_) => true,
        }
    }

    /// How long the server asked us to wait before trying again
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// A provider of raw article content
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Fetches `title`
    ///
    /// Returns `Ok(SourceResponse::NotFound)` when the title has no article.
    async fn fetch(&self, title: &Title, scope: FetchScope) -> Result<SourceResponse, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SourceError::Status { status: 503 }.is_retryable());
        assert!(SourceError::Status { status: 429 }.is_retryable());
        assert!(!SourceError::Status { status: 403 }.is_retryable());
        assert!(SourceError::Api {
            code: "maxlag".to_string(),
            info: "Waiting for replica".to_string()
        }
        .is_retryable());
        assert!(!SourceError::Api {
            code: "badvalue".to_string(),
            info: "Unrecognized value".to_string()
        }
        .is_retryable());
        assert!(!SourceError::Decode("eof".to_string()).is_retryable());
        assert!(SourceError::Unavailable("down".to_string()).is_retryable());
    }

    #[test]
    fn test_rate_limited_carries_retry_after() {
        let limited = SourceError::RateLimited {
            retry_after: Some(Duration::from_secs(3)),
        };
        assert!(limited.is_retryable());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(3)));
        assert_eq!(SourceError::Status { status: 503 }.retry_after(), None);
    }
}
