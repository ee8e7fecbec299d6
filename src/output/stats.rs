//! Statistics over a finished crawl
//!
//! This module provides functionality for summarizing a crawl report and
//! displaying the summary on the terminal.

use crate::crawler::{CacheStats, CrawlReport};
use crate::graph::FetchState;
use crate::title::Title;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Per-sense reach
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenseStatistics {
    pub sense: Title,

    /// Nodes this sense reached, its own root included
    pub nodes_reached: usize,

    /// Of those, nodes also reached by another sense
    pub shared_nodes: usize,
}

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    pub total_nodes: usize,

    pub total_edges: usize,

    /// Distinct (source, target) pairs
    pub total_links: usize,

    pub duplicates: usize,

    /// Count of nodes per level
    pub nodes_by_level: BTreeMap<u32, usize>,

    /// Count of nodes by fetch state
    pub nodes_by_state: HashMap<FetchState, usize>,

    /// In disambiguation-page order
    pub senses: Vec<SenseStatistics>,

    pub failures: usize,

    pub skipped: usize,

    pub fetches: CacheStats,
}

/// Computes statistics for a crawl report
pub fn compute_statistics(report: &CrawlReport) -> CrawlStatistics {
    let graph = &report.graph;

    let mut nodes_by_level = BTreeMap::new();
    let mut nodes_by_state = HashMap::new();
    let mut reached: HashMap<&Title, usize> = HashMap::new();
    let mut shared: HashMap<&Title, usize> = HashMap::new();

    for node in graph.nodes() {
        *nodes_by_level.entry(node.level).or_insert(0) += 1;
        *nodes_by_state.entry(node.state).or_insert(0) += 1;
        for sense in &node.senses {
            *reached.entry(sense).or_insert(0) += 1;
            if node.is_duplicate() {
                *shared.entry(sense).or_insert(0) += 1;
            }
        }
    }

    let senses = report
        .senses
        .iter()
        .map(|sense| SenseStatistics {
            sense: sense.clone(),
            nodes_reached: reached.get(sense).copied().unwrap_or(0),
            shared_nodes: shared.get(sense).copied().unwrap_or(0),
        })
        .collect();

    let total_links = graph
        .edges()
        .map(|edge| (&edge.source, &edge.target))
        .collect::<HashSet<_>>()
        .len();

    CrawlStatistics {
        total_nodes: graph.node_count(),
        total_edges: graph.edge_count(),
        total_links,
        duplicates: graph.duplicates().len(),
        nodes_by_level,
        nodes_by_state,
        senses,
        failures: report.status.failures.len(),
        skipped: report.status.skipped,
        fetches: report.status.fetches,
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Nodes: {}", stats.total_nodes);
    println!(
        "  Edges: {} ({} distinct links)",
        stats.total_edges, stats.total_links
    );
    println!("  Duplicates: {}", stats.duplicates);
    println!(
        "  Fetches: {} remote ({} attempts), {} from memory, {} from store",
        stats.fetches.remote_fetches,
        stats.fetches.attempts,
        stats.fetches.memory_hits,
        stats.fetches.store_hits
    );
    println!();

    println!("Nodes by Level:");
    for (level, count) in &stats.nodes_by_level {
        println!("  {}: {}", level, count);
    }
    println!();

    println!("Nodes by State:");
    for state in FetchState::all_states() {
        let count = stats.nodes_by_state.get(&state).copied().unwrap_or(0);
        if count == 0 {
            continue;
        }
        let percentage = if stats.total_nodes > 0 {
            (count as f64 / stats.total_nodes as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    if !stats.senses.is_empty() {
        println!("Senses ({}):", stats.senses.len());
        for sense in &stats.senses {
            println!(
                "  {}: {} nodes, {} shared",
                sense.sense, sense.nodes_reached, sense.shared_nodes
            );
        }
        println!();
    }

    if stats.failures > 0 || stats.skipped > 0 {
        println!(
            "Pruned: {} failed, {} skipped",
            stats.failures, stats.skipped
        );
    }
}
