//! Graph builder actor
//!
//! A single tokio task owns the [`Graph`]. Everything else talks to it through
//! a cloneable [`GraphHandle`] that sends commands over an mpsc channel and
//! waits for the reply on a oneshot channel. Commands are applied one at a
//! time, so the level-minimum and sense-union updates for a title can never
//! interleave.

use crate::graph::{EdgeOutcome, FetchState, Graph, RedirectOutcome};
use crate::title::Title;
use crate::{DisamError, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Capacity of the command channel
const COMMAND_BUFFER: usize = 256;

enum GraphCommand {
    AddSenseRoot {
        sense: Title,
        reply: oneshot::Sender<bool>,
    },
    RecordEdge {
        source: Title,
        target: Title,
        sense: Title,
        depth: u32,
        reply: oneshot::Sender<EdgeOutcome>,
    },
    ResolveRedirect {
        from: Title,
        to: Title,
        reply: oneshot::Sender<RedirectOutcome>,
    },
    SetState {
        title: Title,
        state: FetchState,
        reply: oneshot::Sender<Option<FetchState>>,
    },
}

/// Spawns the actor that owns a crawl's graph
pub struct GraphBuilder;

impl GraphBuilder {
    /// Starts an actor around an empty graph
    ///
    /// # Returns
    ///
    /// A handle for sending commands and the task that yields the final graph
    pub fn spawn() -> (GraphHandle, GraphTask) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = tokio::spawn(run(Graph::new(), rx));
        (GraphHandle { tx }, GraphTask { handle })
    }
}

async fn run(mut graph: Graph, mut rx: mpsc::Receiver<GraphCommand>) -> Graph {
    while let Some(command) = rx.recv().await {
        // A dropped reply receiver only means the caller stopped waiting
        match command {
            GraphCommand::AddSenseRoot { sense, reply } => {
                let _ = reply.send(graph.add_sense_root(sense));
            }
            GraphCommand::RecordEdge {
                source,
                target,
                sense,
                depth,
                reply,
            } => {
                let _ = reply.send(graph.record_edge(&source, &target, &sense, depth));
            }
            GraphCommand::ResolveRedirect { from, to, reply } => {
                let _ = reply.send(graph.resolve_redirect(&from, &to));
            }
            GraphCommand::SetState {
                title,
                state,
                reply,
            } => {
                let _ = reply.send(graph.set_state(&title, state));
            }
        }
    }

    tracing::debug!(
        "Graph builder finished with {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    graph
}

/// The running actor; yields the graph once every handle is dropped
pub struct GraphTask {
    handle: JoinHandle<Graph>,
}

impl GraphTask {
    /// Waits for the actor to drain its queue and returns the graph
    ///
    /// Every [`GraphHandle`] must be dropped first, otherwise this waits forever.
    pub async fn finish(self) -> Result<Graph> {
        Ok(self.handle.await?)
    }
}

/// Cloneable sender for graph commands
#[derive(Clone)]
pub struct GraphHandle {
    tx: mpsc::Sender<GraphCommand>,
}

impl GraphHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> GraphCommand,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| DisamError::GraphClosed)?;
        rx.await.map_err(|_| DisamError::GraphClosed)
    }

    /// See [`Graph::add_sense_root`]
    pub async fn add_sense_root(&self, sense: Title) -> Result<bool> {
        self.request(|reply| GraphCommand::AddSenseRoot { sense, reply })
            .await
    }

    /// See [`Graph::record_edge`]
    pub async fn record_edge(
        &self,
        source: Title,
        target: Title,
        sense: Title,
        depth: u32,
    ) -> Result<EdgeOutcome> {
        self.request(|reply| GraphCommand::RecordEdge {
            source,
            target,
            sense,
            depth,
            reply,
        })
        .await
    }

    /// See [`Graph::resolve_redirect`]
    pub async fn resolve_redirect(&self, from: Title, to: Title) -> Result<RedirectOutcome> {
        self.request(|reply| GraphCommand::ResolveRedirect { from, to, reply })
            .await
    }

    /// See [`Graph::set_state`]
    pub async fn set_state(&self, title: Title, state: FetchState) -> Result<Option<FetchState>> {
        self.request(|reply| GraphCommand::SetState {
            title,
            state,
            reply,
        })
        .await
    }
}
