//! MediaWiki API article source
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with a policy-compliant user agent string
//! - Calling `action=parse` for full pages or the lead section
//! - Following the API's own redirect resolution
//! - Pacing requests and backing off on HTTP 429
//! - Classifying API and HTTP failures

use crate::config::{SourceConfig, UserAgentConfig};
use crate::source::{Article, ArticleSource, FetchScope, RequestPacer, SourceError, SourceResponse};
use crate::title::Title;
use crate::{ConfigError, DisamError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{redirect::Policy, Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// API error codes that mean "there is no such article"
const NOT_FOUND_CODES: &[&str] = &["missingtitle", "invalidtitle", "nosuchsection"];

#[derive(Debug, Deserialize)]
struct ParseResponse {
    parse: Option<ParsePayload>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ParsePayload {
    title: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

/// Formats the user agent string
///
/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`; the parenthesized
/// part only carries the contact details that are configured.
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    let mut contact = Vec::new();
    if let Some(url) = &config.contact_url {
        contact.push(format!("+{}", url));
    }
    if let Some(email) = &config.contact_email {
        contact.push(email.clone());
    }

    if contact.is_empty() {
        format!("{}/{}", config.crawler_name, config.crawler_version)
    } else {
        format!(
            "{}/{} ({})",
            config.crawler_name,
            config.crawler_version,
            contact.join("; ")
        )
    }
}

/// Reads a `Retry-After` header given in seconds
///
/// HTTP-date values are not used by MediaWiki and are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `source` - The source configuration (timeouts)
/// * `user_agent` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    source: &SourceConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(user_agent))
        .timeout(Duration::from_secs(source.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(5))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Article source backed by a MediaWiki `api.php` endpoint
pub struct WikipediaSource {
    client: Client,
    api_url: Url,
    pacer: RequestPacer,
    rate_limit_cooldown: Duration,
}

impl WikipediaSource {
    /// Creates a source from configuration
    pub fn new(source: &SourceConfig, user_agent: &UserAgentConfig) -> Result<Self, DisamError> {
        let api_url = Url::parse(&source.api_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api-url: {}", e)))?;
        let client = build_http_client(source, user_agent)?;
        Ok(Self {
            client,
            api_url,
            pacer: RequestPacer::new(Duration::from_millis(source.min_request_delay_ms)),
            rate_limit_cooldown: Duration::from_millis(source.rate_limit_cooldown_ms),
        })
    }

    fn request_url(&self, title: &Title, scope: FetchScope) -> Url {
        let mut url = self.api_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("action", "parse")
                .append_pair("page", title.as_str())
                .append_pair("prop", "text")
                .append_pair("redirects", "1")
                .append_pair("format", "json")
                .append_pair("formatversion", "2")
                .append_pair("disableeditsection", "1")
                .append_pair("disablelimitreport", "1");
            if scope == FetchScope::LeadSection {
                query.append_pair("section", "0");
            }
        }
        url
    }
}

#[async_trait]
impl ArticleSource for WikipediaSource {
    async fn fetch(&self, title: &Title, scope: FetchScope) -> Result<SourceResponse, SourceError> {
        let url = self.request_url(title, scope);
        self.pacer.wait_turn().await;
        tracing::debug!("Requesting {} ({})", title, scope.as_str());

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(response.headers());
            self.pacer
                .mark_rate_limited(retry_after.unwrap_or(self.rate_limit_cooldown))
                .await;
            return Err(SourceError::RateLimited { retry_after });
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
            });
        }

        let body: ParseResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        if let Some(error) = body.error {
            if NOT_FOUND_CODES.contains(&error.code.as_str()) {
                tracing::debug!("No article for {}: {}", title, error.code);
                return Ok(SourceResponse::NotFound);
            }
            return Err(SourceError::Api {
                code: error.code,
                info: error.info,
            });
        }

        let payload = body
            .parse
            .ok_or_else(|| SourceError::Decode("response has neither parse nor error".into()))?;

        let canonical = Title::new(&payload.title)
            .map_err(|e| SourceError::Decode(format!("bad title '{}': {}", payload.title, e)))?;

        if &canonical != title {
            tracing::debug!("{} redirects to {}", title, canonical);
        }

        Ok(SourceResponse::Found(Article {
            title: canonical,
            content: payload.text,
        }))
    }
}
