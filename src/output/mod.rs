//! Output module for describing and rendering crawl results
//!
//! This module handles:
//! - Converting the graph into sorted, serializable records
//! - Writing the JSON crawl description
//! - Rendering Graphviz DOT views of the full and duplicates-only graph
//! - Generating markdown summaries and terminal statistics
//! - Writing the plain text of fetched articles, grouped by sense

mod articles;
mod dot;
mod export;
mod markdown;
pub mod stats;

pub use articles::{file_stem, write_articles};
pub use dot::{render_duplicates, render_graph};
pub use export::{
    describe, export, AliasRecord, CrawlDescription, EdgeRecord, GraphDescription, LinkRecord,
    NodeRecord, StatusDescription,
};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{compute_statistics, print_statistics, CrawlStatistics, SenseStatistics};

use crate::config::OutputConfig;
use crate::crawler::CrawlReport;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Writes the JSON crawl description
///
/// # Arguments
///
/// * `report` - The finished crawl
/// * `output_path` - Where to write the JSON document
pub fn write_json(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let json = serde_json::to_string_pretty(&describe(report))?;
    fs::write(output_path, json)?;
    Ok(())
}

/// Writes every output the configuration asks for
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - The files written, JSON first; the articles
///   directory counts as one entry
/// * `Err(OutputError)` - A file could not be written
pub fn write_outputs(report: &CrawlReport, config: &OutputConfig) -> OutputResult<Vec<PathBuf>> {
    let mut written = Vec::new();

    let graph_path = PathBuf::from(&config.graph_path);
    write_json(report, &graph_path)?;
    written.push(graph_path);

    if let Some(path) = &config.dot_path {
        let path = PathBuf::from(path);
        fs::write(&path, render_graph(&report.graph, &report.root_term))?;
        written.push(path);
    }

    if let Some(path) = &config.duplicates_dot_path {
        let path = PathBuf::from(path);
        fs::write(&path, render_duplicates(&report.graph, &report.root_term))?;
        written.push(path);
    }

    if let Some(path) = &config.summary_path {
        let path = PathBuf::from(path);
        generate_markdown_summary(report, &path)?;
        written.push(path);
    }

    if let Some(dir) = &config.articles_dir {
        let dir = PathBuf::from(dir);
        let files = write_articles(report, &dir)?;
        tracing::info!("Wrote {} article files", files.len());
        written.push(dir);
    }

    for path in &written {
        tracing::info!("Wrote {}", path.display());
    }

    Ok(written)
}
