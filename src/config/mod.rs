//! Configuration module for DisamGraph
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so an empty file (or no file at all) is a valid
//! configuration that crawls English Wikipedia.
//!
//! # Example
//!
//! ```no_run
//! use disamgraph::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawler will expand {} levels", config.crawl.num_levels);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, OutputConfig, RetryConfig, SourceConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, config_fingerprint, load_config, load_config_with_hash, parse_config,
};
pub use validation::{validate, validate_limits};
