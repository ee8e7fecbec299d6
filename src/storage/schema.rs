//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the DisamGraph cache database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    root_term TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    status TEXT NOT NULL,
    node_count INTEGER,
    edge_count INTEGER,
    duplicate_count INTEGER
);

-- Fetched articles; NULL content marks a title the source does not have
CREATE TABLE IF NOT EXISTS articles (
    requested_title TEXT NOT NULL,
    scope TEXT NOT NULL,
    canonical_title TEXT NOT NULL,
    content TEXT,
    fetched_at TEXT NOT NULL,
    PRIMARY KEY (requested_title, scope)
);

CREATE INDEX IF NOT EXISTS idx_articles_canonical ON articles(canonical_title);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
