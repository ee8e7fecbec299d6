//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::source::{FetchScope, SourceResponse};
use crate::storage::{RunCounts, RunRecord, RunStatus};
use crate::title::Title;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt cache row: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The store serves two purposes: an article cache that survives between
/// runs, and a log of the runs themselves.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `root_term` - The ambiguous term being crawled
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, root_term: &str, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as finished with a final status and graph counts
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counts: RunCounts,
    ) -> StorageResult<()>;

    // ===== Article Cache =====

    /// Looks up a stored fetch result
    ///
    /// # Returns
    ///
    /// * `Ok(Some(_))` - The title was fetched before (found or missing)
    /// * `Ok(None)` - Nothing is stored for this title and scope
    fn get_article(&self, title: &Title, scope: FetchScope)
        -> StorageResult<Option<SourceResponse>>;

    /// Stores a fetch result, replacing any earlier one
    fn put_article(
        &mut self,
        title: &Title,
        scope: FetchScope,
        response: &SourceResponse,
    ) -> StorageResult<()>;

    /// Counts stored fetch results
    fn count_articles(&self) -> StorageResult<u64>;
}
