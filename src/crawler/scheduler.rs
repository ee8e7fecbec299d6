//! Level-by-level crawl scheduler
//!
//! This module handles:
//! - Fetching the disambiguation page and picking the sense roots
//! - Breadth-first expansion, one level at a time, with a barrier between
//!   levels
//! - Global concurrency limiting via a semaphore
//! - Reserving the fetch budget in frontier order, and stopping at the
//!   deadline even inside a level
//! - Feeding links to the graph builder and deciding what to expand next
//!
//! Fetches within a level run concurrently, but their results are applied to
//! the graph in frontier order (sense order, then link order), so two runs
//! over the same content produce the same graph.

use crate::config::Config;
use crate::crawler::budget::FetchBudget;
use crate::crawler::cache::{FetchCache, FetchError, RetryPolicy};
use crate::crawler::report::{CrawlReport, CrawlStatus, FetchFailure};
use crate::crawler::CrawlParams;
use crate::extract::LinkExtractor;
use crate::graph::{FetchState, GraphBuilder, GraphHandle};
use crate::source::{Article, ArticleSource, FetchScope};
use crate::storage::SqliteStorage;
use crate::title::Title;
use crate::Result;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Engine settings that do not vary between runs
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Appended to the root term to name the disambiguation page
    pub disambiguation_suffix: String,

    /// Fetch only the lead section of sense and descendant pages
    pub lead_section_only: bool,

    /// Maximum number of fetches in flight
    pub max_concurrent_fetches: usize,

    pub max_fetches: Option<u64>,

    pub deadline: Option<Duration>,

    pub retry: RetryPolicy,

    /// Keep the plain text of every expanded page in the report
    pub keep_text: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            disambiguation_suffix: config.source.disambiguation_suffix.clone(),
            lead_section_only: config.source.lead_section_only,
            max_concurrent_fetches: config.crawl.max_concurrent_fetches.max(1) as usize,
            max_fetches: config.crawl.max_fetches,
            deadline: config.crawl.deadline_secs.map(Duration::from_secs),
            retry: RetryPolicy::from_config(&config.source.retry),
            keep_text: config.output.articles_dir.is_some(),
        }
    }

    fn page_scope(&self) -> FetchScope {
        if self.lead_section_only {
            FetchScope::LeadSection
        } else {
            FetchScope::Full
        }
    }
}

/// A title waiting to be fetched and expanded
#[derive(Debug, Clone)]
struct FrontierItem {
    title: Title,
    sense: Title,
    depth: u32,
}

/// Mutable bookkeeping for one run
struct RunState {
    budget: FetchBudget,
    status: CrawlStatus,
    skipped: HashSet<Title>,
    articles: BTreeMap<Title, String>,
}

impl RunState {
    fn new(budget: FetchBudget) -> Self {
        Self {
            budget,
            status: CrawlStatus::default(),
            skipped: HashSet::new(),
            articles: BTreeMap::new(),
        }
    }

    /// Marks a title the halt kept us from fetching; each title counts once
    async fn skip(&mut self, graph: &GraphHandle, title: &Title) -> Result<()> {
        if self.skipped.insert(title.clone()) {
            tracing::debug!("Skipping {}", title);
            graph.set_state(title.clone(), FetchState::Skipped).await?;
        }
        Ok(())
    }
}

/// Drives one crawl from the disambiguation page down to the level limit
pub struct CrawlScheduler {
    source: Arc<dyn ArticleSource>,
    extractor: Arc<dyn LinkExtractor>,
    settings: SchedulerSettings,
    store: Option<Arc<Mutex<SqliteStorage>>>,
}

impl CrawlScheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `source` - Where article content comes from
    /// * `extractor` - Turns article content into ordered links
    /// * `settings` - Concurrency, limits and retry behavior
    pub fn new(
        source: Arc<dyn ArticleSource>,
        extractor: Arc<dyn LinkExtractor>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            source,
            extractor,
            settings,
            store: None,
        }
    }

    /// Backs every run's fetch cache with a persistent store
    pub fn with_store(mut self, store: Option<Arc<Mutex<SqliteStorage>>>) -> Self {
        self.store = store;
        self
    }

    /// Runs a crawl
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The graph, possibly partial; see its status
    /// * `Err(DisamError::Config)` - Invalid parameters; nothing was fetched
    /// * `Err(_)` - The graph builder or a fetch task died
    pub async fn run(&self, params: &CrawlParams) -> Result<CrawlReport> {
        params.validate()?;
        let disambiguation_page =
            params.disambiguation_page(&self.settings.disambiguation_suffix)?;

        let started = Instant::now();
        tracing::info!(
            "Crawling '{}' from {} ({} levels, {} links per page)",
            params.root_term,
            disambiguation_page,
            params.num_levels,
            params.num_page_links
        );

        let mut run = RunState::new(FetchBudget::new(
            self.settings.max_fetches,
            self.settings.deadline,
        ));

        // The cache lives for exactly one run
        let cache = Arc::new(
            FetchCache::new(
                self.source.clone(),
                self.settings.retry.clone(),
                params.force_refresh,
            )
            .with_store(self.store.clone())
            .with_deadline(run.budget.deadline()),
        );
        let (graph, task) = GraphBuilder::spawn();

        let senses = self
            .sense_roots(&cache, &graph, &disambiguation_page, params, &mut run)
            .await?;

        if !senses.is_empty() {
            self.expand(&cache, &graph, &senses, params, &mut run).await?;
        }

        drop(graph);
        let graph = task.finish().await?;

        let RunState {
            budget,
            mut status,
            skipped,
            articles,
        } = run;
        status.halted = budget.halted();
        status.skipped = skipped.len();
        status.fetches = cache.stats();
        status.elapsed = started.elapsed();

        tracing::info!(
            "Crawl of '{}' finished in {:?}: {} nodes, {} edges, {} duplicates, {} remote fetches",
            params.root_term,
            status.elapsed,
            graph.node_count(),
            graph.edge_count(),
            graph.duplicates().len(),
            status.fetches.remote_fetches
        );

        Ok(CrawlReport {
            root_term: params.root_term.clone(),
            disambiguation_page,
            senses,
            graph,
            status,
            articles,
        })
    }

    /// Fetches the disambiguation page and registers its senses
    async fn sense_roots(
        &self,
        cache: &FetchCache,
        graph: &GraphHandle,
        page: &Title,
        params: &CrawlParams,
        run: &mut RunState,
    ) -> Result<Vec<Title>> {
        if !cache.is_fresh(page, FetchScope::Full) && run.budget.try_acquire().is_err() {
            return Ok(Vec::new());
        }

        let article = match cache.get(page, FetchScope::Full).await {
            Ok(article) => article,
            Err(e) => {
                tracing::warn!("Disambiguation page unavailable: {}", e);
                if matches!(e, FetchError::Halted { .. }) {
                    run.budget.check_deadline();
                }
                if let Some(failure) = FetchFailure::from_error(e, 0, None) {
                    run.status.record_failure(failure);
                }
                return Ok(Vec::new());
            }
        };

        let links = self.extractor.extract_links(&article.content);
        let mut senses = distinct_links(links, &[page, &article.title]);
        if let Some(limit) = params.num_disambig_links {
            senses.truncate(limit);
        }

        for sense in &senses {
            graph.add_sense_root(sense.clone()).await?;
        }

        tracing::info!("Found {} senses on {}", senses.len(), article.title);
        self.keep_text(run, &article);
        Ok(senses)
    }

    /// Expands the sense roots level by level
    async fn expand(
        &self,
        cache: &Arc<FetchCache>,
        graph: &GraphHandle,
        senses: &[Title],
        params: &CrawlParams,
        run: &mut RunState,
    ) -> Result<()> {
        let scope = self.settings.page_scope();
        let mut frontier: Vec<FrontierItem> = senses
            .iter()
            .map(|sense| FrontierItem {
                title: sense.clone(),
                sense: sense.clone(),
                depth: 0,
            })
            .collect();

        for depth in 0..params.num_levels {
            if frontier.is_empty() {
                tracing::info!("Frontier empty after level {}", depth);
                break;
            }

            // Reserve in frontier order so the cap always cuts at the same title
            let mut to_fetch = Vec::new();
            let mut reserved = HashSet::new();
            for item in &frontier {
                if reserved.contains(&item.title) {
                    continue;
                }
                if !cache.is_fresh(&item.title, scope) && run.budget.try_acquire().is_err() {
                    continue;
                }
                reserved.insert(item.title.clone());
                to_fetch.push(item.title.clone());
            }

            tracing::info!(
                "Level {}: {} titles queued, {} to fetch",
                depth,
                frontier.len(),
                to_fetch.len()
            );

            let mut results = self.fetch_level(cache, to_fetch, scope).await?;

            let mut next = Vec::new();
            for item in frontier {
                let result = match results.remove(&item.title) {
                    Some(result) => result,
                    // Already handled under an earlier sense
                    None if reserved.contains(&item.title) => continue,
                    None => {
                        run.skip(graph, &item.title).await?;
                        continue;
                    }
                };

                match result {
                    Ok(article) => {
                        if self
                            .expand_item(graph, &item, &article, params, &mut next)
                            .await?
                        {
                            self.keep_text(run, &article);
                        }
                    }
                    Err(FetchError::Halted { .. }) => {
                        run.budget.check_deadline();
                        run.skip(graph, &item.title).await?;
                    }
                    Err(e) => {
                        let state = if matches!(e, FetchError::NotFound { .. }) {
                            FetchState::NotFound
                        } else {
                            FetchState::Failed
                        };
                        graph.set_state(item.title.clone(), state).await?;
                        if let Some(failure) =
                            FetchFailure::from_error(e, item.depth, Some(item.sense.clone()))
                        {
                            run.status.record_failure(failure);
                        }
                    }
                }
            }

            frontier = next;
        }

        Ok(())
    }

    fn keep_text(&self, run: &mut RunState, article: &Article) {
        if self.settings.keep_text {
            let text = self.extractor.extract_text(&article.content);
            run.articles.insert(article.title.clone(), text);
        }
    }

    /// Fetches every title of one level concurrently
    async fn fetch_level(
        &self,
        cache: &Arc<FetchCache>,
        titles: Vec<Title>,
        scope: FetchScope,
    ) -> Result<HashMap<Title, std::result::Result<Article, FetchError>>> {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_fetches));
        let mut tasks = JoinSet::new();

        for title in titles {
            let cache = cache.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = cache.get(&title, scope).await;
                (title, result)
            });
        }

        let mut results = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (title, result) = joined?;
            results.insert(title, result);
        }

        Ok(results)
    }

    /// Applies one fetched page to the graph and queues its new targets
    ///
    /// Returns false if the page had already been expanded under another title.
    async fn expand_item(
        &self,
        graph: &GraphHandle,
        item: &FrontierItem,
        article: &Article,
        params: &CrawlParams,
        next: &mut Vec<FrontierItem>,
    ) -> Result<bool> {
        let canonical = article.title.clone();
        if canonical != item.title {
            let outcome = graph
                .resolve_redirect(item.title.clone(), canonical.clone())
                .await?;
            tracing::debug!("{} redirects to {} ({:?})", item.title, canonical, outcome);
        }

        let previous = graph.set_state(canonical.clone(), FetchState::Fetched).await?;
        if previous == Some(FetchState::Fetched) {
            tracing::debug!("{} was already expanded", canonical);
            return Ok(false);
        }

        let mut links = distinct_links(
            self.extractor.extract_links(&article.content),
            &[&canonical, &item.title],
        );
        links.truncate(params.num_page_links);

        let depth = item.depth + 1;
        let mut queued = 0;
        for link in links {
            let outcome = graph
                .record_edge(canonical.clone(), link.clone(), item.sense.clone(), depth)
                .await?;
            if outcome.expand && depth < params.num_levels {
                queued += 1;
                next.push(FrontierItem {
                    title: link,
                    sense: item.sense.clone(),
                    depth,
                });
            }
        }

        tracing::debug!(
            "Expanded {} under {}: {} new titles queued",
            canonical,
            item.sense,
            queued
        );
        Ok(true)
    }
}

/// Drops repeats (first occurrence wins) and links to any of `own_titles`
fn distinct_links(links: Vec<Title>, own_titles: &[&Title]) -> Vec<Title> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| !own_titles.contains(&link))
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::HaltReason;
    use crate::extract::HtmlLinkExtractor;
    use crate::graph::Graph;
    use crate::source::MemorySource;
    use crate::{ConfigError, DisamError};
    use url::Url;

    fn t(raw: &str) -> Title {
        Title::new(raw).unwrap()
    }

    fn create_test_params(term: &str, num_levels: u32, num_page_links: usize) -> CrawlParams {
        CrawlParams {
            root_term: term.to_string(),
            num_levels,
            num_disambig_links: None,
            num_page_links,
            force_refresh: false,
        }
    }

    fn create_test_scheduler(source: Arc<MemorySource>) -> CrawlScheduler {
        create_test_scheduler_with(source, SchedulerSettings::default())
    }

    fn create_test_scheduler_with(
        source: Arc<MemorySource>,
        settings: SchedulerSettings,
    ) -> CrawlScheduler {
        let extractor =
            HtmlLinkExtractor::new(Url::parse("https://en.wikipedia.org/wiki/").unwrap());
        CrawlScheduler::new(source, Arc::new(extractor), settings)
    }

    fn shot_source() -> MemorySource {
        MemorySource::new()
            .with_links(t("Shot (disambiguation)"), &["A", "B"])
            .with_links(t("A"), &["X", "Y"])
            .with_links(t("B"), &["X", "Z"])
            .with_links(t("X"), &["Q"])
            .with_links(t("Y"), &["Q"])
            .with_links(t("Z"), &["Q"])
    }

    fn node(graph: &Graph, title: &str) -> (u32, Vec<String>) {
        let node = graph
            .node(&t(title))
            .unwrap_or_else(|| panic!("missing node {}", title));
        (
            node.level,
            node.senses.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn edge_set(graph: &Graph) -> Vec<(String, String, String)> {
        graph
            .edges()
            .map(|e| {
                (
                    e.source.to_string(),
                    e.sense.to_string(),
                    e.target.to_string(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_shot_scenario() {
        let source = Arc::new(shot_source());
        let scheduler = create_test_scheduler(source.clone());

        let report = scheduler
            .run(&create_test_params("Shot", 1, 2))
            .await
            .unwrap();
        let graph = &report.graph;

        assert_eq!(report.senses, vec![t("A"), t("B")]);
        assert_eq!(graph.node_count(), 5);
        assert_eq!(node(graph, "A"), (0, vec!["A".to_string()]));
        assert_eq!(node(graph, "B"), (0, vec!["B".to_string()]));
        assert_eq!(
            node(graph, "X"),
            (1, vec!["A".to_string(), "B".to_string()])
        );
        assert_eq!(node(graph, "Y"), (1, vec!["A".to_string()]));
        assert_eq!(node(graph, "Z"), (1, vec!["B".to_string()]));
        assert_eq!(graph.duplicates(), vec![t("X")]);

        // Level-1 nodes are beyond the expansion limit
        assert!(graph.node(&t("A")).unwrap().fetched());
        assert_eq!(graph.node(&t("X")).unwrap().state, FetchState::Referenced);
        assert_eq!(source.calls(&t("X")), 0);
        assert!(report.status.is_complete());
    }

    #[tokio::test]
    async fn test_text_kept_only_when_asked() {
        let report = create_test_scheduler(Arc::new(shot_source()))
            .run(&create_test_params("Shot", 1, 2))
            .await
            .unwrap();
        assert!(report.articles.is_empty());

        let settings = SchedulerSettings {
            keep_text: true,
            ..SchedulerSettings::default()
        };
        let report = create_test_scheduler_with(Arc::new(shot_source()), settings)
            .run(&create_test_params("Shot", 1, 2))
            .await
            .unwrap();

        let titles: Vec<_> = report.articles.keys().map(|t| t.to_string()).collect();
        assert_eq!(titles, vec!["A", "B", "Shot (disambiguation)"]);
        assert_eq!(report.articles[&t("A")], "X\nY");
    }

    #[tokio::test]
    async fn test_every_edge_has_both_nodes() {
        let scheduler = create_test_scheduler(Arc::new(shot_source()));
        let report = scheduler
            .run(&create_test_params("Shot", 3, 5))
            .await
            .unwrap();

        for edge in report.graph.edges() {
            assert!(report.graph.node(&edge.source).is_some());
            assert!(report.graph.node(&edge.target).is_some());
        }
        assert_eq!(node(&report.graph, "Q").0, 2);
    }

    #[tokio::test]
    async fn test_fetch_cap() {
        let source = Arc::new(shot_source());
        let settings = SchedulerSettings {
            max_fetches: Some(2),
            ..SchedulerSettings::default()
        };
        let scheduler = create_test_scheduler_with(source.clone(), settings);

        let report = scheduler
            .run(&create_test_params("Shot", 2, 2))
            .await
            .unwrap();

        assert_eq!(source.total_calls(), 2);
        assert!(report.status.cap_exceeded());

        // The disambiguation page and the first sense were fetched
        let graph = &report.graph;
        assert!(graph.node(&t("A")).unwrap().fetched());
        assert_eq!(graph.node(&t("B")).unwrap().state, FetchState::Skipped);
        assert_eq!(graph.node(&t("X")).unwrap().state, FetchState::Skipped);
        assert!(graph.nodes().all(|node| node.level <= 2));
        assert_eq!(report.status.skipped, 3);
        assert_eq!(report.status.halted, Some(HaltReason::FetchCap));
    }

    #[tokio::test]
    async fn test_skipped_counts_each_title_once() {
        let source = Arc::new(shot_source());
        let settings = SchedulerSettings {
            max_fetches: Some(3),
            ..SchedulerSettings::default()
        };
        let report = create_test_scheduler_with(source.clone(), settings)
            .run(&create_test_params("Shot", 2, 2))
            .await
            .unwrap();
        let graph = &report.graph;

        // X is reached from both senses but is one unfetched title
        assert_eq!(graph.duplicates(), vec![t("X")]);
        let skipped: Vec<_> = graph
            .nodes()
            .filter(|node| node.state == FetchState::Skipped)
            .map(|node| node.title.to_string())
            .collect();
        assert_eq!(skipped, vec!["X", "Y", "Z"]);
        assert_eq!(report.status.skipped, 3);
        assert_eq!(source.total_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_new_fetches() {
        let source = Arc::new(
            MemorySource::new()
                .with_links(t("Term (disambiguation)"), &["A", "B", "C"])
                .with_links(t("A"), &["X"])
                .with_links(t("B"), &["X"])
                .with_links(t("C"), &["X"])
                .failing(t("A"), 10)
                .failing(t("B"), 10)
                .failing(t("C"), 10),
        );
        let settings = SchedulerSettings {
            max_concurrent_fetches: 1,
            deadline: Some(Duration::from_secs(1)),
            retry: RetryPolicy {
                max_attempts: 10,
                initial_backoff: Duration::from_millis(400),
                max_backoff: Duration::from_millis(400),
            },
            ..SchedulerSettings::default()
        };
        let report = create_test_scheduler_with(source.clone(), settings)
            .run(&create_test_params("Term", 1, 2))
            .await
            .unwrap();

        // The first sense gets attempts at 0ms, 400ms and 800ms; the retry due
        // at 1200ms and the two senses waiting for a permit never go out
        assert_eq!(source.total_calls(), 4);
        assert_eq!(report.status.halted, Some(HaltReason::Deadline));
        assert!(report.status.cap_exceeded());
        assert!(report.status.failures.is_empty());
        assert_eq!(report.status.skipped, 3);
        for sense in ["A", "B", "C"] {
            assert_eq!(report.graph.node(&t(sense)).unwrap().state, FetchState::Skipped);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_before_disambiguation_page() {
        let source = Arc::new(shot_source().failing(t("Shot (disambiguation)"), 10));
        let settings = SchedulerSettings {
            deadline: Some(Duration::from_millis(100)),
            retry: RetryPolicy {
                max_attempts: 10,
                initial_backoff: Duration::from_millis(200),
                max_backoff: Duration::from_millis(200),
            },
            ..SchedulerSettings::default()
        };
        let report = create_test_scheduler_with(source.clone(), settings)
            .run(&create_test_params("Shot", 1, 2))
            .await
            .unwrap();

        assert_eq!(source.total_calls(), 1);
        assert!(report.graph.is_empty());
        assert!(report.status.failures.is_empty());
        assert_eq!(report.status.halted, Some(HaltReason::Deadline));
    }

    #[tokio::test]
    async fn test_truncation_is_deterministic() {
        let pages: Vec<String> = (0..12).map(|i| format!("Page {}", i)).collect();
        let names: Vec<&str> = pages.iter().map(String::as_str).collect();
        let build = || {
            let mut source = MemorySource::new()
                .with_links(t("Term (disambiguation)"), &["S1", "S2", "S3"])
                .with_links(t("S1"), &names[..8])
                .with_links(t("S2"), &names[4..])
                .with_links(t("S3"), &names[2..10]);
            for (i, page) in names.iter().enumerate() {
                let links = [names[(i + 1) % names.len()], names[(i + 5) % names.len()]];
                source = source.with_links(t(page), &links);
            }
            Arc::new(source)
        };

        let settings = SchedulerSettings {
            max_concurrent_fetches: 4,
            ..SchedulerSettings::default()
        };
        let first = create_test_scheduler_with(build(), settings.clone())
            .run(&create_test_params("Term", 3, 3))
            .await
            .unwrap();
        let second = create_test_scheduler_with(build(), settings)
            .run(&create_test_params("Term", 3, 3))
            .await
            .unwrap();

        assert_eq!(edge_set(&first.graph), edge_set(&second.graph));
        assert_eq!(first.graph.duplicates(), second.graph.duplicates());
    }

    #[tokio::test]
    async fn test_level_is_minimum_across_senses() {
        let source = Arc::new(
            MemorySource::new()
                .with_links(t("Term (disambiguation)"), &["A", "B"])
                .with_links(t("A"), &["P"])
                .with_links(t("P"), &["Q"])
                .with_links(t("Q"), &["X"])
                .with_links(t("B"), &["X"])
                .with_links(t("X"), &["End"]),
        );
        let report = create_test_scheduler(source)
            .run(&create_test_params("Term", 3, 5))
            .await
            .unwrap();

        assert_eq!(
            node(&report.graph, "X"),
            (1, vec!["A".to_string(), "B".to_string()])
        );
        assert_eq!(report.graph.duplicates(), vec![t("X")]);
    }

    #[tokio::test]
    async fn test_invalid_params_make_no_calls() {
        let source = Arc::new(shot_source());
        let scheduler = create_test_scheduler(source.clone());

        let mut params = create_test_params("Shot", 2, 2);
        params.num_page_links = 0;
        assert!(matches!(
            scheduler.run(&params).await,
            Err(DisamError::Config(ConfigError::Validation(_)))
        ));

        let params = create_test_params("  ", 2, 2);
        assert!(scheduler.run(&params).await.is_err());

        assert_eq!(source.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_prune_branches() {
        let source = Arc::new(
            shot_source()
                .failing(t("A"), 10)
                .with_links(t("B"), &["Missing", "Z"]),
        );
        let report = create_test_scheduler(source.clone())
            .run(&create_test_params("Shot", 2, 2))
            .await
            .unwrap();
        let graph = &report.graph;

        assert_eq!(graph.node(&t("A")).unwrap().state, FetchState::Failed);
        assert_eq!(graph.node(&t("Missing")).unwrap().state, FetchState::NotFound);
        assert!(graph.node(&t("Z")).unwrap().fetched());
        assert!(graph.node(&t("Y")).is_none());

        assert_eq!(source.calls(&t("A")), 3);
        assert_eq!(report.status.failures.len(), 2);
        assert!(report.status.degraded());
        assert!(!report.status.cap_exceeded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_recovers_within_retries() {
        let source = Arc::new(shot_source().failing(t("B"), 2));
        let report = create_test_scheduler(source)
            .run(&create_test_params("Shot", 1, 2))
            .await
            .unwrap();

        assert!(report.graph.node(&t("B")).unwrap().fetched());
        assert!(report.status.failures.is_empty());
        assert_eq!(report.status.fetches.attempts, 5);
    }

    #[tokio::test]
    async fn test_missing_disambiguation_page() {
        let source = Arc::new(MemorySource::new());
        let report = create_test_scheduler(source)
            .run(&create_test_params("Nothing", 2, 2))
            .await
            .unwrap();

        assert!(report.graph.is_empty());
        assert!(report.senses.is_empty());
        assert_eq!(report.status.failures.len(), 1);
        assert_eq!(
            report.status.failures[0].title,
            t("Nothing (disambiguation)")
        );
    }

    #[tokio::test]
    async fn test_redirects_collapse_to_one_node() {
        let source = Arc::new(
            MemorySource::new()
                .with_links(t("Hue (disambiguation)"), &["A", "B"])
                .with_links(t("A"), &["Colour"])
                .with_links(t("B"), &["Color"])
                .with_links(t("Color"), &["Light"])
                .with_redirect(t("Colour"), t("Color")),
        );
        let report = create_test_scheduler(source.clone())
            .run(&create_test_params("Hue", 2, 5))
            .await
            .unwrap();
        let graph = &report.graph;

        assert!(graph.nodes().all(|node| node.title != t("Colour")));
        assert_eq!(
            node(graph, "Color"),
            (1, vec!["A".to_string(), "B".to_string()])
        );
        assert!(graph.node(&t("Color")).unwrap().fetched());
        assert_eq!(graph.duplicates(), vec![t("Color")]);

        // Expanded once, under the first sense that reached it
        assert_eq!(source.calls(&t("Colour")), 1);
        let light = t("Light");
        let into_light: Vec<_> = graph.incoming(&light).collect();
        assert_eq!(into_light.len(), 1);
        assert_eq!(into_light[0].sense, t("A"));
    }

    #[tokio::test]
    async fn test_disambig_links_limit_and_self_links() {
        let source = Arc::new(
            MemorySource::new()
                .with_links(
                    t("Term (disambiguation)"),
                    &["Term (disambiguation)", "A", "A", "B", "C"],
                )
                .with_links(t("A"), &["A", "X"]),
        );
        let mut params = create_test_params("Term", 1, 5);
        params.num_disambig_links = Some(2);

        let report = create_test_scheduler(source).run(&params).await.unwrap();

        assert_eq!(report.senses, vec![t("A"), t("B")]);
        assert!(report.graph.node(&t("C")).is_none());
        assert_eq!(report.graph.edge_count(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_with_shared_store() {
        let store = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
        let source = Arc::new(shot_source());
        let scheduler = create_test_scheduler(source.clone()).with_store(Some(store));
        let mut params = create_test_params("Shot", 1, 2);

        scheduler.run(&params).await.unwrap();
        let first = source.total_calls();
        assert_eq!(first, 3);

        // Served from the store the second time
        let report = scheduler.run(&params).await.unwrap();
        assert_eq!(source.total_calls(), first);
        assert_eq!(report.status.fetches.store_hits, 3);

        params.force_refresh = true;
        scheduler.run(&params).await.unwrap();
        assert_eq!(source.total_calls(), first * 2);
    }
}
