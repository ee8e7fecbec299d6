//! Crawl results
//!
//! A run always yields a [`CrawlReport`]: per-title failures and early halts
//! are recorded in its [`CrawlStatus`] rather than returned as errors.

use crate::crawler::budget::HaltReason;
use crate::crawler::cache::{CacheStats, FetchError};
use crate::graph::Graph;
use crate::title::Title;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// How a title failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Transient { attempts: u32, message: String },
}

/// A pruned branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub title: Title,

    /// Depth the title was scheduled at
    pub depth: u32,

    /// Sense being expanded (none for the disambiguation page)
    pub sense: Option<Title>,

    #[serde(flatten)]
    pub kind: FailureKind,
}

impl FetchFailure {
    /// Describes a pruned branch; a deadline halt prunes nothing and yields `None`
    pub fn from_error(error: FetchError, depth: u32, sense: Option<Title>) -> Option<Self> {
        let failure = match error {
            FetchError::NotFound { title } => Self {
                title,
                depth,
                sense,
                kind: FailureKind::NotFound,
            },
            FetchError::Transient {
                title,
                attempts,
                message,
            } => Self {
                title,
                depth,
                sense,
                kind: FailureKind::Transient { attempts, message },
            },
            FetchError::Halted { .. } => return None,
        };
        Some(failure)
    }
}

/// Outcome flags and counters for a run
#[derive(Debug, Clone, Default)]
pub struct CrawlStatus {
    /// Set when the fetch cap or deadline stopped the crawl early
    pub halted: Option<HaltReason>,

    /// Titles whose branch was pruned, in the order they were processed
    pub failures: Vec<FetchFailure>,

    pub fetches: CacheStats,

    /// Distinct titles left unfetched because of the halt
    pub skipped: usize,

    pub elapsed: Duration,
}

impl CrawlStatus {
    /// Returns true if the fetch cap or the deadline cut the crawl short
    pub fn cap_exceeded(&self) -> bool {
        self.halted.is_some()
    }

    /// Returns true if any branch was lost to a transient failure
    pub fn degraded(&self) -> bool {
        self.failures
            .iter()
            .any(|failure| matches!(failure.kind, FailureKind::Transient { .. }))
    }

    /// Returns true if the crawl ran to its configured limits without losses
    pub fn is_complete(&self) -> bool {
        !self.cap_exceeded() && !self.degraded()
    }

    pub(crate) fn record_failure(&mut self, failure: FetchFailure) {
        tracing::warn!("Pruned {} at depth {}: {:?}", failure.title, failure.depth, failure.kind);
        self.failures.push(failure);
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// The ambiguous term as given
    pub root_term: String,

    /// Title of the disambiguation page that was fetched
    pub disambiguation_page: Title,

    /// Sense roots in disambiguation-page order
    pub senses: Vec<Title>,

    pub graph: Graph,

    pub status: CrawlStatus,

    /// Plain text of every expanded page by canonical title; empty unless
    /// the run was asked to keep it
    pub articles: BTreeMap<Title, String>,
}
