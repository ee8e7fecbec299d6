//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of crawl results,
//! including statistics, per-sense reach, duplicates, and pruned branches.

use crate::crawler::{CrawlReport, FailureKind};
use crate::graph::FetchState;
use crate::output::stats::compute_statistics;
use crate::output::OutputResult;
use std::fs;
use std::path::Path;

/// Writes a markdown summary of a crawl report
///
/// # Arguments
///
/// * `report` - The finished crawl
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    fs::write(output_path, format_markdown_summary(report))?;
    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_summary(report: &CrawlReport) -> String {
    let stats = compute_statistics(report);
    let status = &report.status;
    let mut md = String::new();

    md.push_str(&format!("# Sense Graph: {}\n\n", report.root_term));

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!(
        "- **Disambiguation Page**: {}\n",
        report.disambiguation_page
    ));
    md.push_str(&format!("- **Senses**: {}\n", report.senses.len()));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n",
        status.elapsed.as_secs_f64()
    ));
    let outcome = match status.halted {
        Some(reason) => format!("halted ({})", reason),
        None if status.degraded() => "degraded".to_string(),
        None => "complete".to_string(),
    };
    md.push_str(&format!("- **Status**: {}\n\n", outcome));

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Nodes**: {}\n", stats.total_nodes));
    md.push_str(&format!("- **Edges**: {}\n", stats.total_edges));
    md.push_str(&format!("- **Distinct Links**: {}\n", stats.total_links));
    md.push_str(&format!("- **Duplicates**: {}\n", stats.duplicates));
    md.push_str(&format!(
        "- **Remote Fetches**: {} ({} attempts)\n",
        stats.fetches.remote_fetches, stats.fetches.attempts
    ));
    md.push_str(&format!(
        "- **Cache Hits**: {} memory, {} store\n\n",
        stats.fetches.memory_hits, stats.fetches.store_hits
    ));

    if !stats.nodes_by_level.is_empty() {
        md.push_str("## Level Breakdown\n\n");
        md.push_str("| Level | Nodes |\n");
        md.push_str("|-------|-------|\n");
        for (level, count) in &stats.nodes_by_level {
            md.push_str(&format!("| {} | {} |\n", level, count));
        }
        md.push('\n');
    }

    if stats.total_nodes > 0 {
        md.push_str("## Node State Breakdown\n\n");
        md.push_str("| State | Count |\n");
        md.push_str("|-------|-------|\n");
        for state in FetchState::all_states() {
            let count = stats.nodes_by_state.get(&state).copied().unwrap_or(0);
            md.push_str(&format!("| {} | {} |\n", state, count));
        }
        md.push('\n');
    }

    if !stats.senses.is_empty() {
        md.push_str("## Senses\n\n");
        md.push_str("| Sense | Nodes Reached | Shared Nodes |\n");
        md.push_str("|-------|---------------|--------------|\n");
        for sense in &stats.senses {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                sense.sense, sense.nodes_reached, sense.shared_nodes
            ));
        }
        md.push('\n');
    }

    let duplicates = report.graph.duplicates();
    if !duplicates.is_empty() {
        md.push_str("## Duplicates\n\n");
        md.push_str("| Title | Level | Senses |\n");
        md.push_str("|-------|-------|--------|\n");
        for title in &duplicates {
            if let Some(node) = report.graph.node(title) {
                let senses: Vec<&str> = node.senses.iter().map(|s| s.as_str()).collect();
                md.push_str(&format!(
                    "| {} | {} | {} |\n",
                    node.title,
                    node.level,
                    senses.join(", ")
                ));
            }
        }
        md.push('\n');
    }

    if !status.failures.is_empty() {
        md.push_str("## Pruned Branches\n\n");
        md.push_str("| Title | Depth | Sense | Cause |\n");
        md.push_str("|-------|-------|-------|-------|\n");
        for failure in &status.failures {
            let sense = failure.sense.as_ref().map_or("-", |s| s.as_str());
            let cause = match &failure.kind {
                FailureKind::NotFound => "not found".to_string(),
                FailureKind::Transient { attempts, message } => {
                    format!("{} after {} attempts", message, attempts)
                }
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                failure.title, failure.depth, sense, cause
            ));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{CrawlStatus, FetchError, FetchFailure, HaltReason};
    use crate::graph::Graph;
    use crate::title::Title;
    use tempfile::TempDir;

    fn t(raw: &str) -> Title {
        Title::new(raw).unwrap()
    }

    fn create_test_report() -> CrawlReport {
        let mut graph = Graph::new();
        graph.add_sense_root(t("A"));
        graph.add_sense_root(t("B"));
        graph.set_state(&t("A"), FetchState::Fetched);
        graph.set_state(&t("B"), FetchState::Fetched);
        graph.record_edge(&t("A"), &t("X"), &t("A"), 1);
        graph.record_edge(&t("B"), &t("X"), &t("B"), 1);

        CrawlReport {
            root_term: "Shot".to_string(),
            disambiguation_page: t("Shot (disambiguation)"),
            senses: vec![t("A"), t("B")],
            graph,
            status: CrawlStatus::default(),
            articles: Default::default(),
        }
    }

    #[test]
    fn test_format_markdown_summary() {
        let markdown = format_markdown_summary(&create_test_report());

        assert!(markdown.contains("# Sense Graph: Shot"));
        assert!(markdown.contains("- **Status**: complete"));
        assert!(markdown.contains("| 0 | 2 |"));
        assert!(markdown.contains("| X | 1 | A, B |"));
        assert!(markdown.contains("| A | 2 | 1 |"));
        assert!(!markdown.contains("Pruned Branches"));
    }

    #[test]
    fn test_markdown_with_failures() {
        let mut report = create_test_report();
        report.status.halted = Some(HaltReason::FetchCap);
        report.status.failures.push(FetchFailure::from_error(
            FetchError::Transient {
                title: t("Y"),
                attempts: 3,
                message: "HTTP status 503".to_string(),
            },
            1,
            Some(t("A")),
        )
        .unwrap());

        let markdown = format_markdown_summary(&report);

        assert!(markdown.contains("- **Status**: halted (fetch cap reached)"));
        assert!(markdown.contains("| Y | 1 | A | HTTP status 503 after 3 attempts |"));
    }

    #[test]
    fn test_generate_markdown_summary_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.md");

        generate_markdown_summary(&create_test_report(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Sense Graph: Shot"));
    }
}
