//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::source::{Article, FetchScope, SourceResponse};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunCounts, RunRecord, RunStatus};
use crate::title::Title;
use crate::DisamError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, root_term, config_hash, started_at, finished_at, status,
     node_count, edge_count, duplicate_count";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(DisamError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, DisamError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, DisamError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        root_term: row.get(1)?,
        config_hash: row.get(2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Failed),
        node_count: row.get(6)?,
        edge_count: row.get(7)?,
        duplicate_count: row.get(8)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, root_term: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (root_term, config_hash, started_at, status) VALUES (?1, ?2, ?3, ?4)",
            params![root_term, config_hash, now, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counts: RunCounts,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, node_count = ?3,
             edge_count = ?4, duplicate_count = ?5 WHERE id = ?6",
            params![
                status.to_db_string(),
                now,
                counts.nodes as i64,
                counts.edges as i64,
                counts.duplicates as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Article Cache =====

    fn get_article(
        &self,
        title: &Title,
        scope: FetchScope,
    ) -> StorageResult<Option<SourceResponse>> {
        let row: Option<(String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT canonical_title, content FROM articles
                 WHERE requested_title = ?1 AND scope = ?2",
                params![title.as_str(), scope.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((canonical, content)) = row else {
            return Ok(None);
        };

        let response = match content {
            Some(content) => {
                let canonical = Title::new(&canonical).map_err(|e| {
                    StorageError::Corrupt(format!("canonical title '{}': {}", canonical, e))
                })?;
                SourceResponse::Found(Article {
                    title: canonical,
                    content,
                })
            }
            None => SourceResponse::NotFound,
        };

        Ok(Some(response))
    }

    fn put_article(
        &mut self,
        title: &Title,
        scope: FetchScope,
        response: &SourceResponse,
    ) -> StorageResult<()> {
        let (canonical, content) = match response {
            SourceResponse::Found(article) => (&article.title, Some(article.content.as_str())),
            SourceResponse::NotFound => (title, None),
        };

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO articles (requested_title, scope, canonical_title, content, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(requested_title, scope) DO UPDATE SET
                canonical_title = excluded.canonical_title,
                content = excluded.content,
                fetched_at = excluded.fetched_at",
            params![title.as_str(), scope.as_str(), canonical.as_str(), content, now],
        )?;
        Ok(())
    }

    fn count_articles(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
