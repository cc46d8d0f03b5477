use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::{apply_policy, run_every, should_skip};
use crate::config::{AppConfig, FailurePolicy};
use crate::feed::{AdapterFactory, Item, NewArticle, Source, SourceAdapter};
use crate::storage::{ArticleStore, SourceCatalog};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub interval: Duration,
    pub filter_keywords: Vec<String>,
    pub max_concurrent: usize,
    pub source_timeout: Duration,
    pub on_error: FailurePolicy,
}

impl FetcherSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            interval: config.fetch_interval(),
            filter_keywords: config.fetcher.filter_keywords.clone(),
            max_concurrent: config.fetcher.max_concurrent_fetches,
            source_timeout: Duration::from_secs(config.fetcher.source_timeout_secs),
            on_error: config.fetcher.on_error,
        }
    }
}

/// Outcome of one ingestion cycle
#[derive(Debug, Default)]
pub struct FetchReport {
    pub sources: usize,
    /// Items returned by the sources that answered
    pub fetched: usize,
    /// Items dropped by the keyword filter
    pub skipped: usize,
    /// Articles that were new to the store
    pub stored: usize,
    /// Sources that errored, timed out or whose task died
    pub failed_sources: usize,
    /// First storage failure of the cycle; the source it hit stopped early
    pub store_error: Option<Error>,
}

impl FetchReport {
    fn record(&mut self, outcome: SourceOutcome) {
        self.fetched += outcome.fetched;
        self.skipped += outcome.skipped;
        self.stored += outcome.stored;
        if outcome.failed {
            self.failed_sources += 1;
        }
        if self.store_error.is_none() {
            self.store_error = outcome.store_error;
        }
    }
}

#[derive(Default)]
struct SourceOutcome {
    fetched: usize,
    skipped: usize,
    stored: usize,
    failed: bool,
    store_error: Option<Error>,
}

/// Periodically pulls every source and stores the items that pass the filter
pub struct Fetcher {
    articles: Arc<dyn ArticleStore>,
    sources: Arc<dyn SourceCatalog>,
    adapters: Arc<dyn AdapterFactory>,
    keywords: Arc<Vec<String>>,
    settings: FetcherSettings,
}

impl Fetcher {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        sources: Arc<dyn SourceCatalog>,
        adapters: Arc<dyn AdapterFactory>,
        settings: FetcherSettings,
    ) -> Self {
        Self {
            articles,
            sources,
            adapters,
            keywords: Arc::new(settings.filter_keywords.clone()),
            settings,
        }
    }

    /// Run one ingestion cycle
    ///
    /// Only a failure to list the sources is returned as an error. Source
    /// failures are logged and counted; storage failures end that source's
    /// batch and are carried in the report.
    pub async fn fetch_once(&self) -> Result<FetchReport> {
        let sources = self.sources.list_sources().await?;
        let mut report = FetchReport {
            sources: sources.len(),
            ..Default::default()
        };

        if sources.is_empty() {
            debug!("No sources configured");
            return Ok(report);
        }

        let concurrency = self.settings.max_concurrent.max(1);
        let mut join_set: JoinSet<SourceOutcome> = JoinSet::new();
        let mut pending = sources.into_iter();

        for source in pending.by_ref().take(concurrency) {
            self.spawn_source(&mut join_set, source);
        }

        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    error!("Source task failed: {}", e);
                    report.failed_sources += 1;
                }
            }

            if let Some(source) = pending.next() {
                self.spawn_source(&mut join_set, source);
            }
        }

        info!(
            "Fetch cycle: {} sources, {} items, {} new, {} filtered, {} failed",
            report.sources, report.fetched, report.stored, report.skipped, report.failed_sources
        );

        Ok(report)
    }

    /// Run cycles until shutdown
    ///
    /// Returns `Ok` when cancelled. A catalog failure always ends the loop;
    /// storage failures end it only under [`FailurePolicy::Stop`].
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            "Fetcher started: interval={}s, max_concurrent={}, source_timeout={}s",
            self.settings.interval.as_secs(),
            self.settings.max_concurrent,
            self.settings.source_timeout.as_secs()
        );

        run_every("Fetcher", self.settings.interval, shutdown, move || self.run_cycle()).await
    }

    async fn run_cycle(&self) -> Result<()> {
        let mut report = self.fetch_once().await.map_err(|e| {
            error!("Failed to list sources, stopping fetcher: {}", e);
            e
        })?;

        match report.store_error.take() {
            Some(e) => apply_policy("Fetch cycle", self.settings.on_error, e),
            None => Ok(()),
        }
    }

    fn spawn_source(&self, join_set: &mut JoinSet<SourceOutcome>, source: Source) {
        let adapter = self.adapters.adapter(&source);
        let articles = Arc::clone(&self.articles);
        let keywords = Arc::clone(&self.keywords);
        let timeout = self.settings.source_timeout;

        join_set.spawn(async move { ingest_source(adapter, articles, &keywords, timeout).await });
    }
}

/// Fetch a source's items, giving up with [`Error::Timeout`] after `timeout`
async fn fetch_items(adapter: &dyn SourceAdapter, timeout: Duration) -> Result<Vec<Item>> {
    tokio::time::timeout(timeout, adapter.fetch())
        .await
        .map_err(|_| Error::Timeout(format!("source '{}' after {}s", adapter.name(), timeout.as_secs())))?
}

async fn ingest_source(
    adapter: Arc<dyn SourceAdapter>,
    articles: Arc<dyn ArticleStore>,
    keywords: &[String],
    timeout: Duration,
) -> SourceOutcome {
    let mut outcome = SourceOutcome::default();

    let items = match fetch_items(adapter.as_ref(), timeout).await {
        Ok(items) => items,
        Err(e) => {
            warn!("Failed to fetch source '{}': {}", adapter.name(), e);
            outcome.failed = true;
            return outcome;
        }
    };

    outcome.fetched = items.len();

    for item in items {
        if should_skip(&item, keywords) {
            debug!("Filtered '{}' from '{}'", item.title, adapter.name());
            outcome.skipped += 1;
            continue;
        }

        let article = NewArticle::from_item(adapter.id(), item);
        match articles.store(&article).await {
            Ok(true) => outcome.stored += 1,
            Ok(false) => {}
            Err(e) => {
                error!("Failed to store '{}' from '{}': {}", article.link, adapter.name(), e);
                outcome.store_error = Some(e);
                break;
            }
        }
    }

    if outcome.stored > 0 {
        debug!("Source '{}': {} new articles", adapter.name(), outcome.stored);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing::MemoryStore;
    use async_trait::async_trait;
    use chrono::{FixedOffset, TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    #[derive(Default)]
    struct Probe {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    struct FakeSource {
        id: Uuid,
        name: String,
        items: Option<Vec<Item>>,
        delay: Duration,
        probe: Arc<Probe>,
    }

    #[async_trait]
    impl SourceAdapter for FakeSource {
        fn id(&self) -> Uuid {
            self.id
        }

        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch(&self) -> Result<Vec<Item>> {
            let now = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.probe.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.items
                .clone()
                .ok_or_else(|| Error::FeedParse(format!("{} is broken", self.name)))
        }
    }

    struct FakeFactory {
        adapters: HashMap<Uuid, Arc<FakeSource>>,
    }

    impl AdapterFactory for FakeFactory {
        fn adapter(&self, source: &Source) -> Arc<dyn SourceAdapter> {
            self.adapters[&source.id].clone()
        }
    }

    #[derive(Default)]
    struct FakeCatalog {
        sources: Vec<Source>,
        broken: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SourceCatalog for FakeCatalog {
        async fn list_sources(&self) -> Result<Vec<Source>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.broken {
                return Err(Error::Database(sqlx::Error::PoolTimedOut));
            }
            Ok(self.sources.clone())
        }
    }

    fn item(title: &str, link: &str, categories: &[&str]) -> Item {
        Item {
            title: title.to_string(),
            link: link.to_string(),
            summary: String::new(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            published_at: Utc::now().fixed_offset(),
        }
    }

    fn settings() -> FetcherSettings {
        FetcherSettings {
            interval: Duration::from_secs(10),
            filter_keywords: Vec::new(),
            max_concurrent: 8,
            source_timeout: Duration::from_secs(60),
            on_error: FailurePolicy::Continue,
        }
    }

    /// Sources under construction: name, items (None = fetch error), delay
    #[derive(Default)]
    struct Setup {
        sources: Vec<(String, Option<Vec<Item>>, Duration)>,
        broken_catalog: bool,
    }

    impl Setup {
        fn source(mut self, name: &str, items: Option<Vec<Item>>) -> Self {
            self.sources.push((name.to_string(), items, Duration::ZERO));
            self
        }

        fn slow_source(mut self, name: &str, items: Option<Vec<Item>>, delay: Duration) -> Self {
            self.sources.push((name.to_string(), items, delay));
            self
        }

        fn build(self, store: Arc<MemoryStore>, settings: FetcherSettings) -> (Fetcher, Arc<FakeCatalog>, Arc<Probe>) {
            let probe = Arc::new(Probe::default());
            let mut catalog = FakeCatalog {
                broken: self.broken_catalog,
                ..Default::default()
            };
            let mut adapters = HashMap::new();

            for (name, items, delay) in self.sources {
                let source = Source {
                    id: Uuid::new_v4(),
                    name: name.clone(),
                    feed_url: format!("https://{}.example.com/feed.xml", name),
                    created_at: Utc::now(),
                };
                adapters.insert(
                    source.id,
                    Arc::new(FakeSource {
                        id: source.id,
                        name,
                        items,
                        delay,
                        probe: probe.clone(),
                    }),
                );
                catalog.sources.push(source);
            }

            let catalog = Arc::new(catalog);
            let fetcher = Fetcher::new(store, catalog.clone(), Arc::new(FakeFactory { adapters }), settings);
            (fetcher, catalog, probe)
        }
    }

    #[tokio::test]
    async fn test_failing_source_does_not_block_others() {
        let store = Arc::new(MemoryStore::new());
        let (fetcher, _, _) = Setup::default()
            .source("broken", None)
            .source("healthy", Some(vec![item("One", "https://a.com/1", &[]), item("Two", "https://a.com/2", &[])]))
            .build(store.clone(), settings());

        let report = fetcher.fetch_once().await.unwrap();

        assert_eq!(report.sources, 2);
        assert_eq!(report.failed_sources, 1);
        assert_eq!(report.stored, 2);
        assert!(report.store_error.is_none());

        let mut links = store.links();
        links.sort();
        assert_eq!(links, vec!["https://a.com/1", "https://a.com/2"]);
    }

    #[tokio::test]
    async fn test_filtered_items_are_not_stored() {
        let store = Arc::new(MemoryStore::new());
        let mut settings = settings();
        settings.filter_keywords = vec!["crypto".to_string()];

        let (fetcher, _, _) = Setup::default()
            .source(
                "news",
                Some(vec![
                    item("BREAKING crypto news", "https://n.com/crypto", &["finance"]),
                    item("Weather update", "https://n.com/weather", &["local"]),
                    item("Markets", "https://n.com/markets", &["crypto"]),
                ]),
            )
            .build(store.clone(), settings);

        let report = fetcher.fetch_once().await.unwrap();

        assert_eq!(report.fetched, 3);
        assert_eq!(report.skipped, 2);
        assert_eq!(store.links(), vec!["https://n.com/weather"]);
    }

    #[tokio::test]
    async fn test_refetch_is_deduplicated() {
        let store = Arc::new(MemoryStore::new());
        let (fetcher, _, _) = Setup::default()
            .source("news", Some(vec![item("One", "https://n.com/1", &[])]))
            .build(store.clone(), settings());

        assert_eq!(fetcher.fetch_once().await.unwrap().stored, 1);
        assert_eq!(fetcher.fetch_once().await.unwrap().stored, 0);
        assert_eq!(store.articles().len(), 1);
    }

    #[tokio::test]
    async fn test_publication_time_is_stored_in_utc() {
        let store = Arc::new(MemoryStore::new());
        let mut tokyo = item("Tokyo", "https://t.com/1", &[]);
        tokyo.published_at = FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
            .unwrap();

        let (fetcher, _, _) = Setup::default()
            .source("tokyo", Some(vec![tokyo]))
            .build(store.clone(), settings());
        fetcher.fetch_once().await.unwrap();

        let stored = &store.articles()[0];
        assert_eq!(stored.published_at, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_store_error_stops_only_that_source() {
        let store = Arc::new(MemoryStore::new());
        store.fail_store_for("https://a.com/2");

        let (fetcher, _, _) = Setup::default()
            .source(
                "a",
                Some(vec![
                    item("One", "https://a.com/1", &[]),
                    item("Two", "https://a.com/2", &[]),
                    item("Three", "https://a.com/3", &[]),
                ]),
            )
            .source("b", Some(vec![item("Other", "https://b.com/1", &[])]))
            .build(store.clone(), settings());

        let report = fetcher.fetch_once().await.unwrap();

        assert!(matches!(report.store_error, Some(Error::Database(_))));
        let links = store.links();
        assert!(links.contains(&"https://a.com/1".to_string()));
        assert!(!links.contains(&"https://a.com/3".to_string()));
        assert!(links.contains(&"https://b.com/1".to_string()));
    }

    #[tokio::test]
    async fn test_catalog_failure_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let setup = Setup {
            broken_catalog: true,
            ..Default::default()
        };
        let (fetcher, _, _) = setup.build(store, settings());

        assert!(matches!(fetcher.fetch_once().await, Err(Error::Database(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_source_times_out() {
        let store = Arc::new(MemoryStore::new());
        let mut settings = settings();
        settings.source_timeout = Duration::from_secs(5);

        let (fetcher, _, _) = Setup::default()
            .slow_source("slow", Some(vec![item("Late", "https://s.com/1", &[])]), Duration::from_secs(120))
            .source("fast", Some(vec![item("Quick", "https://f.com/1", &[])]))
            .build(store.clone(), settings);

        let report = fetcher.fetch_once().await.unwrap();

        assert_eq!(report.failed_sources, 1);
        assert_eq!(store.links(), vec!["https://f.com/1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_deadline_yields_timeout_error() {
        let slow = FakeSource {
            id: Uuid::new_v4(),
            name: "slow".to_string(),
            items: Some(Vec::new()),
            delay: Duration::from_secs(120),
            probe: Arc::new(Probe::default()),
        };

        let result = fetch_items(&slow, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_capped() {
        let store = Arc::new(MemoryStore::new());
        let mut settings = settings();
        settings.max_concurrent = 2;

        let mut setup = Setup::default();
        for i in 0..5 {
            let link = format!("https://s{}.com/1", i);
            setup = setup.slow_source(&format!("s{}", i), Some(vec![item("Item", &link, &[])]), Duration::from_secs(1));
        }
        let (fetcher, _, probe) = setup.build(store.clone(), settings);

        let report = fetcher.fetch_once().await.unwrap();

        assert_eq!(report.stored, 5);
        assert_eq!(probe.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_continues_after_store_error() {
        let store = Arc::new(MemoryStore::new());
        store.fail_store_for("https://a.com/1");

        let (fetcher, catalog, _) = Setup::default()
            .source("a", Some(vec![item("One", "https://a.com/1", &[])]))
            .build(store, settings());

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { fetcher.run(rx).await });

        tokio::time::sleep(Duration::from_secs(25)).await;
        tx.send(true).unwrap();

        assert!(handle.await.unwrap().is_ok());
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_store_error_when_configured() {
        let store = Arc::new(MemoryStore::new());
        store.fail_store_for("https://a.com/1");
        let mut settings = settings();
        settings.on_error = FailurePolicy::Stop;

        let (fetcher, catalog, _) = Setup::default()
            .source("a", Some(vec![item("One", "https://a.com/1", &[])]))
            .build(store, settings);

        let (_tx, rx) = watch::channel(false);
        let result = fetcher.run(rx).await;

        assert!(matches!(result, Err(Error::Database(_))));
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_catalog_failure_regardless_of_policy() {
        let store = Arc::new(MemoryStore::new());
        let setup = Setup {
            broken_catalog: true,
            ..Default::default()
        };
        let (fetcher, catalog, _) = setup.build(store, settings());

        let (_tx, rx) = watch::channel(false);
        assert!(fetcher.run(rx).await.is_err());
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
    }
}
