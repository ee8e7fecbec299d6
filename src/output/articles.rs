//! Plain-text article output
//!
//! Writes the text of the disambiguation page at the top of the directory and
//! one folder per sense holding every page that sense reached. A page shared by
//! several senses is written into each of their folders.

use crate::crawler::CrawlReport;
use crate::graph::FetchState;
use crate::output::OutputResult;
use crate::title::Title;
use std::fs;
use std::path::{Path, PathBuf};

/// Written in place of the text of a page that does not exist
const MISSING_TEXT: &str = "DOES NOT EXIST";

/// File-system name for a title
///
/// Spaces become underscores and slashes become dashes; a leading dot is
/// escaped so no name resolves to a hidden file or a parent directory.
pub fn file_stem(title: &Title) -> String {
    let stem = title.as_str().replace(' ', "_").replace(['/', '\\'], "-");
    if stem.starts_with('.') {
        format!("_{}", stem)
    } else {
        stem
    }
}

/// Writes the articles of a finished crawl under `dir`
///
/// # Arguments
///
/// * `report` - The finished crawl; its `articles` must have been kept
/// * `dir` - Output directory, created if missing
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - The text files written
/// * `Err(OutputError)` - A directory or file could not be written
pub fn write_articles(report: &CrawlReport, dir: &Path) -> OutputResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    if let Some(text) = report.articles.get(&report.disambiguation_page) {
        let path = dir.join(format!("{}.txt", file_stem(&report.disambiguation_page)));
        fs::write(&path, text)?;
        written.push(path);
    }

    for sense in &report.senses {
        let folder = dir.join(file_stem(sense));
        fs::create_dir_all(&folder)?;

        for node in report.graph.nodes().filter(|node| node.senses.contains(sense)) {
            let text = match node.state {
                FetchState::Fetched => match report.articles.get(&node.title) {
                    Some(text) => text.as_str(),
                    None => continue,
                },
                FetchState::NotFound => MISSING_TEXT,
                _ => continue,
            };

            let path = folder.join(format!("{}.txt", file_stem(&node.title)));
            fs::write(&path, text)?;
            written.push(path);
        }
    }

    tracing::debug!("Wrote {} article files under {}", written.len(), dir.display());
    Ok(written)
}
