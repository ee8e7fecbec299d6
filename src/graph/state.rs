/// Fetch state definitions for graph nodes
///
/// A node starts out `Referenced` when some page links to it and moves to a
/// terminal state once the crawler has tried (or declined) to fetch it.
use serde::Serialize;
use std::fmt;

/// Represents how far the crawler got with a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchState {
    /// Node is only known as a link target
    Referenced,

    /// Content was retrieved and its links expanded
    Fetched,

    /// The source reported that the article does not exist
    NotFound,

    /// Transient failures persisted through every retry
    Failed,

    /// The fetch cap or deadline prevented the fetch
    Skipped,
}

impl FetchState {
    /// Returns true if this represents a successful fetch
    pub fn is_fetched(&self) -> bool {
        matches!(self, Self::Fetched)
    }

    /// Converts the state to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Referenced => "referenced",
            Self::Fetched => "fetched",
            Self::NotFound => "not_found",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Returns all possible fetch states
    pub fn all_states() -> [Self; 5] {
        [
            Self::Referenced,
            Self::Fetched,
            Self::NotFound,
            Self::Failed,
            Self::Skipped,
        ]
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
