//! Sense graph
//!
//! The graph maps canonical titles to nodes and keeps one edge per
//! (source, sense, target) triple. Every mutation goes through a handful of
//! methods that keep three properties intact:
//!
//! - every edge's source and target exist as nodes
//! - a node's level is the smallest depth at which any sense reached it
//! - no edge points from a node to itself
//!
//! During a crawl the graph is owned by the [`GraphBuilder`] actor; the plain
//! methods here are what that actor runs for each command.

mod builder;
mod state;

pub use builder::{GraphBuilder, GraphHandle, GraphTask};
pub use state::FetchState;

use crate::title::Title;
use std::collections::{BTreeMap, BTreeSet};

/// An article in the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub title: Title,

    /// Smallest depth at which the node was discovered (sense roots are 0)
    pub level: u32,

    /// Sense roots whose expansion reached this node
    pub senses: BTreeSet<Title>,

    pub state: FetchState,
}

impl Node {
    fn new(title: Title, level: u32, sense: Title) -> Self {
        let mut senses = BTreeSet::new();
        senses.insert(sense);
        Self {
            title,
            level,
            senses,
            state: FetchState::Referenced,
        }
    }

    /// Returns true if more than one sense reached this node
    pub fn is_duplicate(&self) -> bool {
        self.senses.len() >= 2
    }

    /// Returns true if the node's content was retrieved and expanded
    pub fn fetched(&self) -> bool {
        self.state.is_fetched()
    }
}

/// A link followed under one sense
///
/// Field order gives the derived ordering: source, then sense, then target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    pub source: Title,
    pub sense: Title,
    pub target: Title,
}

/// Result of [`Graph::record_edge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeOutcome {
    /// The edge was not already present
    pub recorded: bool,

    /// The target is new, or was reached strictly shallower than before
    pub expand: bool,
}

/// Result of [`Graph::resolve_redirect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RedirectOutcome {
    /// A node existed under the redirect title and was merged away
    pub merged: bool,

    /// The canonical node had already been fetched before the merge
    pub target_fetched: bool,
}

/// Directed graph of articles reached from the sense roots
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeMap<Title, Node>,
    edges: BTreeSet<Edge>,
    aliases: BTreeMap<Title, Title>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a title through the recorded redirects
    pub fn canonical(&self, title: &Title) -> Title {
        self.aliases.get(title).unwrap_or(title).clone()
    }

    /// Looks up a node, following redirects
    pub fn node(&self, title: &Title) -> Option<&Node> {
        self.nodes.get(&self.canonical(title))
    }

    /// Nodes in title order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Edges in (source, sense, target) order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Redirect titles and the canonical titles they collapse into
    pub fn aliases(&self) -> &BTreeMap<Title, Title> {
        &self.aliases
    }

    /// Edges pointing at `title`
    pub fn incoming<'a>(&'a self, title: &'a Title) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| &edge.target == title)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a sense root at level 0, tagged with itself
    ///
    /// # Returns
    ///
    /// * `true` - The node did not exist before
    /// * `false` - An existing node was promoted to a root
    pub fn add_sense_root(&mut self, sense: Title) -> bool {
        let title = self.canonical(&sense);
        match self.nodes.get_mut(&title) {
            Some(node) => {
                node.level = 0;
                node.senses.insert(sense);
                false
            }
            None => {
                self.nodes
                    .insert(title.clone(), Node::new(title, 0, sense));
                true
            }
        }
    }

    /// Records a link from `source` to `target` followed under `sense`
    ///
    /// Creates the target at `depth` or lowers its level to `depth`, and adds
    /// `sense` to its sense set either way. The source is created at
    /// `depth - 1` if it is missing.
    ///
    /// # Arguments
    ///
    /// * `source` - The page the link was found on
    /// * `target` - The linked title
    /// * `sense` - The sense root being expanded
    /// * `depth` - Depth of the target (source depth + 1)
    ///
    /// # Returns
    ///
    /// An [`EdgeOutcome`] telling the caller whether to expand the target
    pub fn record_edge(
        &mut self,
        source: &Title,
        target: &Title,
        sense: &Title,
        depth: u32,
    ) -> EdgeOutcome {
        let source = self.canonical(source);
        let target = self.canonical(target);

        if source == target {
            return EdgeOutcome::default();
        }

        self.nodes
            .entry(source.clone())
            .and_modify(|node| {
                node.senses.insert(sense.clone());
            })
            .or_insert_with(|| Node::new(source.clone(), depth.saturating_sub(1), sense.clone()));

        let expand = match self.nodes.get_mut(&target) {
            Some(node) => {
                let shallower = depth < node.level;
                node.level = node.level.min(depth);
                node.senses.insert(sense.clone());
                shallower
            }
            None => {
                self.nodes
                    .insert(target.clone(), Node::new(target.clone(), depth, sense.clone()));
                true
            }
        };

        let recorded = self.edges.insert(Edge {
            source,
            sense: sense.clone(),
            target,
        });

        EdgeOutcome { recorded, expand }
    }

    /// Collapses the node for `from` into the node for `to`
    ///
    /// The merged node keeps the smaller level, the union of both sense sets,
    /// and the most advanced state. Edges touching `from` are re-pointed and
    /// any that become self-loops are dropped. `from` is recorded as an alias
    /// so later references collapse too.
    pub fn resolve_redirect(&mut self, from: &Title, to: &Title) -> RedirectOutcome {
        let to = self.canonical(to);
        if from == &to {
            return RedirectOutcome {
                merged: false,
                target_fetched: self.nodes.get(&to).map_or(false, Node::fetched),
            };
        }

        let target_fetched = self.nodes.get(&to).map_or(false, Node::fetched);

        // A stale alias in the opposite direction would form a cycle
        self.aliases.remove(&to);
        for canonical in self.aliases.values_mut() {
            if canonical == from {
                *canonical = to.clone();
            }
        }
        self.aliases.insert(from.clone(), to.clone());

        let Some(old) = self.nodes.remove(from) else {
            return RedirectOutcome {
                merged: false,
                target_fetched,
            };
        };

        match self.nodes.get_mut(&to) {
            Some(node) => {
                node.level = node.level.min(old.level);
                node.senses.extend(old.senses);
                if old.state.is_fetched() || node.state == FetchState::Referenced {
                    node.state = old.state;
                }
            }
            None => {
                self.nodes.insert(
                    to.clone(),
                    Node {
                        title: to.clone(),
                        ..old
                    },
                );
            }
        }

        let touched: Vec<Edge> = self
            .edges
            .iter()
            .filter(|edge| &edge.source == from || &edge.target == from)
            .cloned()
            .collect();
        for edge in touched {
            self.edges.remove(&edge);
            let repoint = |title: Title| if &title == from { to.clone() } else { title };
            let edge = Edge {
                source: repoint(edge.source),
                sense: edge.sense,
                target: repoint(edge.target),
            };
            if edge.source != edge.target {
                self.edges.insert(edge);
            }
        }

        tracing::debug!("Merged redirect {} into {}", from, to);

        RedirectOutcome {
            merged: true,
            target_fetched,
        }
    }

    /// Sets the fetch state of a node
    ///
    /// A fetched node never moves back to another state.
    ///
    /// # Returns
    ///
    /// The previous state, or `None` if there is no such node
    pub fn set_state(&mut self, title: &Title, state: FetchState) -> Option<FetchState> {
        let title = self.canonical(title);
        let node = self.nodes.get_mut(&title)?;
        let previous = node.state;
        if !previous.is_fetched() {
            node.state = state;
        }
        Some(previous)
    }

    /// Titles of all nodes reached by two or more senses, in title order
    pub fn duplicates(&self) -> Vec<Title> {
        self.nodes
            .values()
            .filter(|node| node.is_duplicate())
            .map(|node| node.title.clone())
            .collect()
    }
}
