use crate::extract::DEFAULT_IGNORED_SECTIONS;
use serde::{Deserialize, Serialize};

/// Main configuration structure for DisamGraph
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub source: SourceConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawl shape and limits
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Number of link hops to expand below each sense
    pub num_levels: u32,

    /// Number of senses taken from the disambiguation page (all when unset)
    pub num_disambig_links: Option<usize>,

    /// Number of links followed from every other page
    pub num_page_links: usize,

    /// Bypass cached articles and fetch everything again
    pub force_refresh: bool,

    /// Maximum number of fetches in flight at once
    pub max_concurrent_fetches: u32,

    /// Stop issuing fetches after this many remote requests
    pub max_fetches: Option<u64>,

    /// Stop issuing fetches after this many seconds
    pub deadline_secs: Option<u64>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            num_levels: 2,
            num_disambig_links: None,
            num_page_links: 5,
            force_refresh: false,
            max_concurrent_fetches: 15,
            max_fetches: None,
            deadline_secs: None,
        }
    }
}

/// Where and how articles are retrieved
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SourceConfig {
    /// MediaWiki `api.php` endpoint
    pub api_url: String,

    /// Prefix that article links resolve under
    pub article_base_url: String,

    /// Appended to the root term to name the disambiguation page
    pub disambiguation_suffix: String,

    /// Fetch only the lead section of non-disambiguation pages
    pub lead_section_only: bool,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// Minimum time between the start of two requests (milliseconds)
    pub min_request_delay_ms: u64,

    /// Pause after an HTTP 429 that carries no `Retry-After` (milliseconds)
    pub rate_limit_cooldown_ms: u64,

    /// Section headings whose links are ignored
    pub ignored_sections: Vec<String>,

    pub retry: RetryConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://en.wikipedia.org/w/api.php".to_string(),
            article_base_url: "https://en.wikipedia.org/wiki/".to_string(),
            disambiguation_suffix: " (disambiguation)".to_string(),
            lead_section_only: true,
            request_timeout_secs: 30,
            min_request_delay_ms: 100,
            rate_limit_cooldown_ms: 5_000,
            ignored_sections: DEFAULT_IGNORED_SECTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            retry: RetryConfig::default(),
        }
    }
}

/// Backoff for transient fetch failures
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Attempts per title, including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt (milliseconds); doubles afterwards
    pub initial_backoff_ms: u64,

    /// Upper bound for a single delay (milliseconds)
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    pub contact_email: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "DisamGraph".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
            contact_email: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the JSON graph description
    pub graph_path: String,

    /// Path of the full graph in DOT format
    pub dot_path: Option<String>,

    /// Path of the duplicates-only graph in DOT format
    pub duplicates_dot_path: Option<String>,

    /// Path of the markdown summary
    pub summary_path: Option<String>,

    /// Path of the SQLite article cache
    pub cache_path: Option<String>,

    /// Directory for the plain text of every fetched article, one folder per sense
    pub articles_dir: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            graph_path: "graph.json".to_string(),
            dot_path: None,
            duplicates_dot_path: None,
            summary_path: None,
            cache_path: None,
            articles_dir: None,
        }
    }
}
