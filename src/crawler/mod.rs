//! Crawler module
//!
//! This module contains the crawl-and-build engine, including:
//! - The per-run fetch cache with retry logic
//! - The global fetch budget (cap and deadline)
//! - Level-by-level scheduling and expansion
//! - Crawl reports and run bookkeeping

mod budget;
mod cache;
mod report;
mod scheduler;

pub use budget::{Deadline, FetchBudget, HaltReason};
pub use cache::{CacheStats, FetchCache, FetchError, RetryPolicy};
pub use report::{CrawlReport, CrawlStatus, FailureKind, FetchFailure};
pub use scheduler::{CrawlScheduler, SchedulerSettings};

use crate::config::{config_fingerprint, validate_limits, Config, CrawlConfig};
use crate::extract::HtmlLinkExtractor;
use crate::source::WikipediaSource;
use crate::storage::{open_storage, RunCounts, RunStatus, SqliteStorage, Storage};
use crate::title::Title;
use crate::{ConfigError, DisamError};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Per-run crawl parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlParams {
    /// The ambiguous term, e.g. `Shot`
    pub root_term: String,

    /// Number of link hops expanded below each sense
    pub num_levels: u32,

    /// Senses taken from the disambiguation page (all when `None`)
    pub num_disambig_links: Option<usize>,

    /// Links followed from each expanded page
    pub num_page_links: usize,

    /// Bypass cached articles
    pub force_refresh: bool,
}

impl CrawlParams {
    /// Builds parameters from the `[crawl]` configuration section
    pub fn from_config(config: &CrawlConfig, root_term: &str) -> Self {
        Self {
            root_term: root_term.trim().to_string(),
            num_levels: config.num_levels,
            num_disambig_links: config.num_disambig_links,
            num_page_links: config.num_page_links,
            force_refresh: config.force_refresh,
        }
    }

    /// Rejects parameters a crawl cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_term.trim().is_empty() {
            return Err(ConfigError::Validation(
                "root term cannot be empty".to_string(),
            ));
        }

        validate_limits(self.num_levels, self.num_disambig_links, self.num_page_links)
    }

    /// Title of the disambiguation page the crawl starts from
    pub fn disambiguation_page(&self, suffix: &str) -> Result<Title, ConfigError> {
        Title::disambiguation(&self.root_term, suffix).map_err(|e| {
            ConfigError::Validation(format!("Invalid root term '{}': {}", self.root_term, e))
        })
    }
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Validate the parameters
/// 2. Build the MediaWiki source and the HTML link extractor
/// 3. Open the persistent article cache, if configured, and record the run
/// 4. Crawl and build the graph
/// 5. Record the outcome of the run
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `root_term` - The ambiguous term to crawl
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished, possibly partially (see its status)
/// * `Err(DisamError)` - Crawl could not run
pub async fn crawl(config: &Config, root_term: &str) -> Result<CrawlReport, DisamError> {
    let params = CrawlParams::from_config(&config.crawl, root_term);
    params.validate()?;

    let source = Arc::new(WikipediaSource::new(&config.source, &config.user_agent)?);
    let extractor = Arc::new(HtmlLinkExtractor::from_config(&config.source)?);

    let store = match &config.output.cache_path {
        Some(path) => {
            tracing::info!("Using article cache at {}", path);
            Some(Arc::new(Mutex::new(open_storage(Path::new(path))?)))
        }
        None => None,
    };

    let run_id = match &store {
        Some(store) => Some(start_run(store, &params.root_term, &config_fingerprint(config)?)?),
        None => None,
    };

    let scheduler = CrawlScheduler::new(source, extractor, SchedulerSettings::from_config(config))
        .with_store(store.clone());
    let result = scheduler.run(&params).await;

    if let (Some(store), Some(run_id)) = (&store, run_id) {
        finish_run(store, run_id, &result)?;
    }

    result
}

fn start_run(
    store: &Mutex<SqliteStorage>,
    root_term: &str,
    config_hash: &str,
) -> Result<i64, DisamError> {
    let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
    let run_id = store.create_run(root_term, config_hash)?;
    tracing::info!("Starting run {}", run_id);
    Ok(run_id)
}

fn finish_run(
    store: &Mutex<SqliteStorage>,
    run_id: i64,
    result: &Result<CrawlReport, DisamError>,
) -> Result<(), DisamError> {
    let (status, counts) = match result {
        Ok(report) => {
            let status = if report.status.cap_exceeded() {
                RunStatus::Halted
            } else {
                RunStatus::Completed
            };
            let counts = RunCounts {
                nodes: report.graph.node_count(),
                edges: report.graph.edge_count(),
                duplicates: report.graph.duplicates().len(),
            };
            (status, counts)
        }
        Err(_) => (RunStatus::Failed, RunCounts::default()),
    };

    let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
    store.finish_run(run_id, status, counts)?;
    tracing::info!("Run {} finished as {}", run_id, status.to_db_string());
    Ok(())
}
