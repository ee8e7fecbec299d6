//! Graphviz DOT rendering
//!
//! Two views are produced: the full graph, and a reduced graph that keeps
//! only the duplicates, the edges into them, and the shallowest chain from
//! each of their parents back up to a sense root.

use crate::graph::{Edge, Graph};
use crate::title::Title;
use std::collections::{BTreeSet, HashSet};
use std::fmt::Write;

const DUPLICATE_STYLE: &str = "style=filled, fillcolor=darkorange1";
const DUPLICATE_EDGE_COLOR: &str = "blue";
const ANCESTRY_EDGE_COLOR: &str = "green";

/// Renders every node and edge
///
/// Duplicates are filled orange and edges into them are blue. Every edge is
/// labeled with the sense it was followed under.
pub fn render_graph(graph: &Graph, name: &str) -> String {
    let mut nodes: Vec<_> = graph.nodes().collect();
    nodes.sort_by(|a, b| (a.level, &a.title).cmp(&(b.level, &b.title)));

    let mut edges: Vec<&Edge> = graph.edges().collect();
    edges.sort();

    let mut dot = header(name);
    for node in nodes {
        if node.is_duplicate() {
            let _ = writeln!(dot, "  {} [{}];", quote(&node.title), DUPLICATE_STYLE);
        } else {
            let _ = writeln!(dot, "  {};", quote(&node.title));
        }
    }

    for edge in edges {
        let into_duplicate = graph
            .node(&edge.target)
            .map_or(false, |node| node.is_duplicate());
        let color = into_duplicate.then_some(DUPLICATE_EDGE_COLOR);
        push_edge(&mut dot, edge, color);
    }

    dot.push_str("}\n");
    dot
}

/// Renders the duplicates and how each sense reaches them
///
/// # Arguments
///
/// * `graph` - The finished graph
/// * `name` - Graph name, usually the root term
///
/// # Returns
///
/// DOT text with duplicate nodes filled orange, their incoming edges blue,
/// and the ancestry edges green
pub fn render_duplicates(graph: &Graph, name: &str) -> String {
    let duplicates = graph.duplicates();

    let mut incoming: BTreeSet<&Edge> = BTreeSet::new();
    for duplicate in &duplicates {
        incoming.extend(graph.incoming(duplicate));
    }

    let mut ancestry: BTreeSet<&Edge> = BTreeSet::new();
    let mut visited: HashSet<&Title> = HashSet::new();
    for edge in &incoming {
        let mut current = &edge.source;
        while visited.insert(current) {
            let Some(parent) = shallowest_parent(graph, current) else {
                break;
            };
            if !incoming.contains(parent) {
                ancestry.insert(parent);
            }
            current = &parent.source;
        }
    }

    let mut dot = header(name);
    for duplicate in &duplicates {
        let _ = writeln!(dot, "  {} [{}];", quote(duplicate), DUPLICATE_STYLE);
    }
    for edge in &incoming {
        push_edge(&mut dot, edge, Some(DUPLICATE_EDGE_COLOR));
    }
    for edge in &ancestry {
        push_edge(&mut dot, edge, Some(ANCESTRY_EDGE_COLOR));
    }

    dot.push_str("}\n");
    dot
}

/// The incoming edge whose source sits at the lowest level
///
/// Ties go to the smallest edge. Sense roots have no parent.
fn shallowest_parent<'a>(graph: &'a Graph, title: &Title) -> Option<&'a Edge> {
    let node = graph.node(title)?;
    if node.level == 0 {
        return None;
    }

    graph
        .edges()
        .filter(|edge| edge.target == node.title)
        .filter_map(|edge| graph.node(&edge.source).map(|source| (source.level, edge)))
        .min()
        .map(|(_, edge)| edge)
}

fn header(name: &str) -> String {
    let mut dot = String::new();
    let _ = writeln!(dot, "digraph {} {{", quote(name));
    dot.push_str("  node [shape=box];\n");
    dot
}

fn push_edge(dot: &mut String, edge: &Edge, color: Option<&str>) {
    let _ = write!(
        dot,
        "  {} -> {} [label={}",
        quote(&edge.source),
        quote(&edge.target),
        quote(&edge.sense)
    );
    if let Some(color) = color {
        let _ = write!(dot, ", color={}", color);
    }
    dot.push_str("];\n");
}

fn quote(text: impl AsRef<str>) -> String {
    let escaped = text.as_ref().replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}
