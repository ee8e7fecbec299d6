//! Per-run fetch cache
//!
//! Sits between the scheduler and the [`ArticleSource`]. Each (title, scope)
//! key owns an async slot: concurrent requests for the same key queue on that
//! slot while requests for different keys proceed independently. Lookups go
//! memory first, then the persistent store (if any), then the source.
//!
//! Transient source errors are retried here with exponential backoff, or
//! after the server's `Retry-After` when that is longer; nothing above the
//! cache retries. No attempt starts once the run's deadline has passed.

use crate::config::RetryConfig;
use crate::crawler::Deadline;
use crate::source::{Article, ArticleSource, FetchScope, SourceResponse};
use crate::storage::{SqliteStorage, Storage};
use crate::title::Title;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

type CacheKey = (Title, FetchScope);
type Slot = Arc<tokio::sync::Mutex<Option<SourceResponse>>>;

/// Why a title produced no article
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("No article named {title}")]
    NotFound { title: Title },

    #[error("Fetching {title} failed after {attempts} attempts: {message}")]
    Transient {
        title: Title,
        attempts: u32,
        message: String,
    },

    #[error("Deadline passed before {title} was fetched")]
    Halted { title: Title },
}

/// Exponential backoff settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per key, including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Delay after the given failed attempt (1-based)
    ///
    /// `initial_backoff * 2^(attempt - 1)`, capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Fetch counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Keys that went to the source (each counts once however often it was retried)
    pub remote_fetches: u64,

    /// Source calls, including retries
    pub attempts: u64,

    /// Requests answered from memory
    pub memory_hits: u64,

    /// Requests answered from the persistent store
    pub store_hits: u64,
}

/// Memoizing, retrying front for an [`ArticleSource`]
pub struct FetchCache {
    source: Arc<dyn ArticleSource>,
    store: Option<Arc<Mutex<SqliteStorage>>>,
    retry: RetryPolicy,
    force_refresh: bool,
    deadline: Deadline,
    slots: Mutex<HashMap<CacheKey, Slot>>,
    stats: Mutex<CacheStats>,
}

impl FetchCache {
    /// Creates an empty cache in front of `source`
    ///
    /// # Arguments
    ///
    /// * `source` - Where misses are fetched from
    /// * `retry` - Backoff for transient source errors
    /// * `force_refresh` - Bypass memory and store on every request
    pub fn new(source: Arc<dyn ArticleSource>, retry: RetryPolicy, force_refresh: bool) -> Self {
        Self {
            source,
            store: None,
            retry,
            force_refresh,
            deadline: Deadline::none(),
            slots: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Backs the cache with a persistent store
    pub fn with_store(mut self, store: Option<Arc<Mutex<SqliteStorage>>>) -> Self {
        self.store = store;
        self
    }

    /// Stops remote attempts once `deadline` has passed
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// Returns the article for `title`
    ///
    /// # Returns
    ///
    /// * `Ok(Article)` - The article; its title is canonical (after redirects)
    /// * `Err(FetchError::NotFound)` - The source has no such article
    /// * `Err(FetchError::Transient)` - Every attempt failed; the key is
    ///   remembered as missing for the rest of the run
    /// * `Err(FetchError::Halted)` - The deadline passed before a successful
    ///   attempt; nothing is remembered
    pub async fn get(&self, title: &Title, scope: FetchScope) -> Result<Article, FetchError> {
        let slot = self.slot(title, scope);
        let mut entry = slot.lock().await;

        if !self.force_refresh {
            if let Some(response) = entry.as_ref() {
                tracing::trace!("Memory hit for {}", title);
                self.bump(|stats| stats.memory_hits += 1);
                return into_result(title, response.clone());
            }

            if let Some(response) = self.load_stored(title, scope) {
                tracing::trace!("Store hit for {}", title);
                self.bump(|stats| stats.store_hits += 1);
                self.fill_canonical(title, scope, &response);
                *entry = Some(response.clone());
                return into_result(title, response);
            }
        }

        match self.fetch_with_retry(title, scope).await {
            Ok(response) => {
                self.persist(title, scope, &response);
                self.fill_canonical(title, scope, &response);
                *entry = Some(response.clone());
                into_result(title, response)
            }
            Err(e @ FetchError::Transient { .. }) => {
                *entry = Some(SourceResponse::NotFound);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Reports whether [`FetchCache::get`] would be answered without a
    /// remote call
    pub fn is_fresh(&self, title: &Title, scope: FetchScope) -> bool {
        if self.force_refresh {
            return false;
        }

        let cached = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(title.clone(), scope))
            .cloned();
        if let Some(slot) = cached {
            if matches!(slot.try_lock(), Ok(entry) if entry.is_some()) {
                return true;
            }
        }

        self.load_stored(title, scope).is_some()
    }

    /// Counters so far
    pub fn stats(&self) -> CacheStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, title: &Title, scope: FetchScope) -> Slot {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((title.clone(), scope))
            .or_default()
            .clone()
    }

    fn bump(&self, update: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut *stats);
    }

    async fn fetch_with_retry(
        &self,
        title: &Title,
        scope: FetchScope,
    ) -> Result<SourceResponse, FetchError> {
        let mut attempt = 0;
        loop {
            if self.deadline.passed() {
                tracing::debug!("Deadline passed, not fetching {}", title);
                return Err(FetchError::Halted {
                    title: title.clone(),
                });
            }

            attempt += 1;
            if attempt == 1 {
                self.bump(|stats| stats.remote_fetches += 1);
            }
            self.bump(|stats| stats.attempts += 1);

            match self.source.fetch(title, scope).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let backoff = self.retry.backoff(attempt);
                    let delay = e.retry_after().map_or(backoff, |wait| wait.max(backoff));
                    tracing::warn!(
                        "Attempt {} for {} failed ({}), retrying in {:?}",
                        attempt,
                        title,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::warn!("Giving up on {} after {} attempts: {}", title, attempt, e);
                    return Err(FetchError::Transient {
                        title: title.clone(),
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    /// Stores a redirect result under its canonical title as well
    ///
    /// Skips the canonical slot if another request holds it.
    fn fill_canonical(&self, requested: &Title, scope: FetchScope, response: &SourceResponse) {
        let SourceResponse::Found(article) = response else {
            return;
        };
        if &article.title == requested {
            return;
        }

        let slot = self.slot(&article.title, scope);
        if let Ok(mut entry) = slot.try_lock() {
            if entry.is_none() || self.force_refresh {
                *entry = Some(response.clone());
            }
        }
        self.persist(&article.title, scope, response);
    }

    fn load_stored(&self, title: &Title, scope: FetchScope) -> Option<SourceResponse> {
        let store = self.store.as_ref()?;
        let store = store.lock().unwrap_or_else(PoisonError::into_inner);
        match store.get_article(title, scope) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Article cache read failed for {}: {}", title, e);
                None
            }
        }
    }

    fn persist(&self, title: &Title, scope: FetchScope, response: &SourceResponse) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = store.put_article(title, scope, response) {
            tracing::warn!("Article cache write failed for {}: {}", title, e);
        }
    }
}

fn into_result(title: &Title, response: SourceResponse) -> Result<Article, FetchError> {
    match response {
        SourceResponse::Found(article) => Ok(article),
        SourceResponse::NotFound => Err(FetchError::NotFound {
            title: title.clone(),
        }),
    }
}
