//! Storage module for the persistent article cache
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Fetched articles keyed by requested title and fetch scope
//! - Run tracking with final graph counts

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::DisamError;
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(DisamError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, DisamError> {
    SqliteStorage::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub root_term: String,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunStatus,
    pub node_count: Option<i64>,
    pub edge_count: Option<i64>,
    pub duplicate_count: Option<i64>,
}

/// Graph size recorded when a run finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub nodes: usize,
    pub edges: usize,
    pub duplicates: usize,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// Stopped early by the fetch cap or the deadline
    Halted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Halted => "halted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "halted" => Some(Self::Halted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
