//! DisamGraph: sense graphs for ambiguous terms
//!
//! This crate crawls an encyclopedia disambiguation page, expands each listed
//! sense into a bounded subtree of linked articles, and builds a directed graph
//! in which articles reached from more than one sense are flagged as
//! duplicates. The duplicates are the raw signal for word-sense disambiguation.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod graph;
pub mod output;
pub mod source;
pub mod storage;
pub mod title;

use thiserror::Error;

/// Main error type for DisamGraph operations
#[derive(Debug, Error)]
pub enum DisamError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Title error: {0}")]
    Title(#[from] TitleError),

    #[error("Graph builder stopped before the crawl finished")]
    GraphClosed,

    #[error("Fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Title-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TitleError {
    #[error("Title is empty")]
    Empty,

    #[error("Link only points at a section of the current page: {0}")]
    FragmentOnly(String),

    #[error("Title contains illegal characters: {0}")]
    IllegalCharacters(String),

    #[error("Title is outside the article namespace: {0}")]
    NonArticle(String),

    #[error("Malformed link: {0}")]
    Malformed(String),
}

/// Result type alias for DisamGraph operations
pub type Result<T> = std::result::Result<T, DisamError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for title operations
pub type TitleResult<T> = std::result::Result<T, TitleError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, CrawlParams, CrawlReport, CrawlScheduler, CrawlStatus};
pub use graph::{Edge, FetchState, Graph, Node};
pub use title::Title;
