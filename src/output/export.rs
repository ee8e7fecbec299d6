//! Serializable graph and run descriptions
//!
//! JSON is the stable record format: node, edge and pair records are sorted
//! so the same graph always serializes to the same text.

use crate::crawler::{CacheStats, CrawlReport, FetchFailure, HaltReason};
use crate::graph::{FetchState, Graph};
use crate::title::Title;
use serde::Serialize;
use std::collections::BTreeMap;

/// One node of the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRecord {
    pub title: Title,
    pub level: u32,
    pub senses: Vec<Title>,
    pub duplicate: bool,
    pub fetched: bool,
    pub state: FetchState,
}

/// One edge, as discovered under one sense
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeRecord {
    pub source: Title,
    pub target: Title,
    pub sense: Title,
}

/// All edges between one ordered pair of nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub source: Title,
    pub target: Title,
    pub senses: Vec<Title>,
    pub multiplicity: usize,
}

/// A redirect that was collapsed into its target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasRecord {
    pub from: Title,
    pub to: Title,
}

/// The whole graph in record form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphDescription {
    /// Sorted by (level, title)
    pub nodes: Vec<NodeRecord>,

    /// Sorted by (source, sense, target)
    pub edges: Vec<EdgeRecord>,

    /// Sorted by (source, target)
    pub links: Vec<LinkRecord>,

    pub aliases: Vec<AliasRecord>,

    pub duplicates: Vec<Title>,
}

/// Run outcome flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDescription {
    pub complete: bool,
    pub cap_exceeded: bool,
    pub degraded: bool,
    pub halted: Option<HaltReason>,
    pub skipped: usize,
    pub elapsed_ms: u128,
}

/// A graph description plus everything known about the run that built it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlDescription {
    pub root_term: String,
    pub disambiguation_page: Title,
    pub senses: Vec<Title>,
    pub status: StatusDescription,
    pub failures: Vec<FetchFailure>,
    pub fetches: CacheStats,
    pub graph: GraphDescription,
}

/// Converts a graph into sorted records
pub fn export(graph: &Graph) -> GraphDescription {
    let mut nodes: Vec<NodeRecord> = graph
        .nodes()
        .map(|node| NodeRecord {
            title: node.title.clone(),
            level: node.level,
            senses: node.senses.iter().cloned().collect(),
            duplicate: node.is_duplicate(),
            fetched: node.fetched(),
            state: node.state,
        })
        .collect();
    nodes.sort_by(|a, b| (a.level, &a.title).cmp(&(b.level, &b.title)));

    let mut sorted_edges: Vec<_> = graph.edges().collect();
    sorted_edges.sort();

    let edges = sorted_edges
        .iter()
        .map(|edge| EdgeRecord {
            source: edge.source.clone(),
            target: edge.target.clone(),
            sense: edge.sense.clone(),
        })
        .collect();

    let mut pairs: BTreeMap<(&Title, &Title), Vec<Title>> = BTreeMap::new();
    for edge in &sorted_edges {
        pairs
            .entry((&edge.source, &edge.target))
            .or_default()
            .push(edge.sense.clone());
    }
    let links = pairs
        .into_iter()
        .map(|((source, target), senses)| LinkRecord {
            source: source.clone(),
            target: target.clone(),
            multiplicity: senses.len(),
            senses,
        })
        .collect();

    let aliases = graph
        .aliases()
        .iter()
        .map(|(from, to)| AliasRecord {
            from: from.clone(),
            to: to.clone(),
        })
        .collect();

    GraphDescription {
        nodes,
        edges,
        links,
        aliases,
        duplicates: graph.duplicates(),
    }
}

/// Wraps the graph description with the run's metadata
pub fn describe(report: &CrawlReport) -> CrawlDescription {
    let status = &report.status;
    CrawlDescription {
        root_term: report.root_term.clone(),
        disambiguation_page: report.disambiguation_page.clone(),
        senses: report.senses.clone(),
        status: StatusDescription {
            complete: status.is_complete(),
            cap_exceeded: status.cap_exceeded(),
            degraded: status.degraded(),
            halted: status.halted,
            skipped: status.skipped,
            elapsed_ms: status.elapsed.as_millis(),
        },
        failures: status.failures.clone(),
        fetches: status.fetches,
        graph: export(&report.graph),
    }
}
