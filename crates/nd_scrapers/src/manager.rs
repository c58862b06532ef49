use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use nd_core::cleaning::normalize_text;
use nd_core::validation::is_valid;
use nd_core::{ArticleRecord, Error, RawArticle, Result, SourceConfig, SourceName};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::scrapers::{BoxedScraper, ScraperRegistry};

/// What one source contributed to a run.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: SourceName,
    pub links_found: usize,
    pub records: Vec<ArticleRecord>,
    /// Set when the source's task died; its records are then empty.
    pub error: Option<String>,
}

impl SourceReport {
    fn failed(source: SourceName, error: String) -> Self {
        Self {
            source,
            links_found: 0,
            records: Vec::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    pub fn total_records(&self) -> usize {
        self.sources.iter().map(|s| s.records.len()).sum()
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| s.error.is_some())
    }

    /// All records in source order.
    pub fn into_records(self) -> Vec<ArticleRecord> {
        self.sources.into_iter().flat_map(|s| s.records).collect()
    }
}

/// Normalise an extracted article and turn it into a storable record.
/// Returns `None` when the normalised record is incomplete.
///
/// Extractor fields are already visible text with entities decoded, so they
/// are never parsed as markup again.
pub fn build_record(raw: RawArticle, source: SourceName) -> Option<ArticleRecord> {
    let record = ArticleRecord {
        title: normalize_text(&raw.title),
        url: raw.url.trim().to_string(),
        content: normalize_text(&raw.body),
        published_at: Some(raw.published_at),
        source,
        image_url: raw.image_url,
    };

    if is_valid(&record) {
        Some(record)
    } else {
        debug!(url = %record.url, "Dropping incomplete record");
        None
    }
}

/// Runs every configured source and gathers the validated records.
pub struct ScraperManager {
    registry: Arc<ScraperRegistry>,
    sources: Vec<SourceConfig>,
}

impl ScraperManager {
    pub fn new(registry: ScraperRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            sources: Self::default_sources(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<SourceConfig>) -> Self {
        self.sources = sources;
        self
    }

    pub fn default_sources() -> Vec<SourceConfig> {
        SourceName::ALL.iter().map(|name| name.default_config()).collect()
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    pub fn registry(&self) -> &ScraperRegistry {
        &self.registry
    }

    /// Configured sources, optionally narrowed to the one named `filter`.
    pub fn sources_matching(&self, filter: Option<&str>) -> Result<Vec<SourceConfig>> {
        let Some(filter) = filter else {
            return Ok(self.sources.clone());
        };
        let name: SourceName = filter.parse()?;
        let matching: Vec<SourceConfig> = self.sources.iter().filter(|s| s.name == name).cloned().collect();
        if matching.is_empty() {
            return Err(Error::Config(format!("Source {} is not configured", name)));
        }
        Ok(matching)
    }

    /// One full pass over every source. Never fails; a source that breaks
    /// contributes nothing.
    pub async fn run_once(&self) -> Vec<ArticleRecord> {
        self.run_with_report().await.into_records()
    }

    pub async fn run_with_report(&self) -> RunReport {
        self.run_sources(&self.sources).await
    }

    pub async fn run_sources(&self, sources: &[SourceConfig]) -> RunReport {
        let started_at = Utc::now();
        info!(sources = sources.len(), "🔍 Starting scrape run");

        let concurrency = self.registry.client().max_concurrency();
        let handles: Vec<_> = sources
            .iter()
            .map(|config| {
                let scraper = self.registry.scraper_for(config);
                let config = config.clone();
                let name = config.name;
                (name, SourceTask(tokio::spawn(scrape_source(scraper, config, concurrency))))
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for (name, mut task) in handles {
            match (&mut task.0).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(source = %name, error = %e, "Source task failed");
                    reports.push(SourceReport::failed(name, e.to_string()));
                }
            }
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            sources: reports,
        };
        info!(
            records = report.total_records(),
            failed_sources = report.failed_sources().count(),
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "✨ Scrape run finished"
        );
        report
    }

    /// Scrape a single article with whichever configured source handles it.
    pub async fn scrape_url(&self, url: &str) -> Result<ArticleRecord> {
        let scraper = self
            .sources
            .iter()
            .map(|config| self.registry.scraper_for(config))
            .find(|scraper| scraper.can_handle(url))
            .ok_or_else(|| Error::Scraping(format!("No scraper found for URL: {}", url)))?;

        let raw = scraper
            .fetch_article(url)
            .await
            .ok_or_else(|| Error::Scraping(format!("Could not extract article from {}", url)))?;

        build_record(raw, scraper.source())
            .ok_or_else(|| Error::Scraping(format!("Article at {} is missing required fields", url)))
    }
}

/// Aborts its source task when dropped, so an abandoned run stops fetching.
struct SourceTask(JoinHandle<SourceReport>);

impl Drop for SourceTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn scrape_source(scraper: BoxedScraper, config: SourceConfig, concurrency: usize) -> SourceReport {
    let source = config.name;
    let links = scraper.list_article_links(&config).await;
    if links.is_empty() {
        warn!(%source, "No article links found");
    }
    let links_found = links.len();

    let records: Vec<ArticleRecord> = stream::iter(links)
        .map(|url| {
            let scraper = scraper.clone();
            async move { scraper.fetch_article(&url).await }
        })
        .buffer_unordered(concurrency)
        .filter_map(|raw| async move { raw.and_then(|raw| build_record(raw, source)) })
        .collect()
        .await;

    info!(%source, links = links_found, records = records.len(), "Source scraped");
    SourceReport {
        source,
        links_found,
        records,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{PoliteClient, ScrapeConfig};
    use crate::scrapers::Scraper;
    use async_trait::async_trait;
    use nd_core::RawArticle;

    struct FixedScraper {
        source: SourceName,
        articles: Vec<RawArticle>,
    }

    #[async_trait]
    impl Scraper for FixedScraper {
        fn source(&self) -> SourceName {
            self.source
        }

        fn can_handle(&self, url: &str) -> bool {
            self.articles.iter().any(|a| a.url == url)
        }

        async fn list_article_links(&self, _source: &SourceConfig) -> Vec<String> {
            self.articles.iter().map(|a| a.url.clone()).collect()
        }

        async fn fetch_article(&self, url: &str) -> Option<RawArticle> {
            self.articles.iter().find(|a| a.url == url).cloned()
        }
    }

    struct PanickingScraper;

    #[async_trait]
    impl Scraper for PanickingScraper {
        fn source(&self) -> SourceName {
            SourceName::Npr
        }

        fn can_handle(&self, _url: &str) -> bool {
            false
        }

        async fn list_article_links(&self, _source: &SourceConfig) -> Vec<String> {
            panic!("listing markup changed");
        }

        async fn fetch_article(&self, _url: &str) -> Option<RawArticle> {
            None
        }
    }

    fn raw(url: &str, title: &str) -> RawArticle {
        RawArticle {
            url: url.to_string(),
            title: title.to_string(),
            body: "Body   text with\u{a0}odd spacing.".to_string(),
            image_url: None,
            published_at: Utc::now(),
        }
    }

    fn client() -> Arc<PoliteClient> {
        Arc::new(PoliteClient::new(&ScrapeConfig::without_delay()).unwrap())
    }

    #[test]
    fn test_build_record_cleans_fields() {
        let record = build_record(raw(" https://example.com/a ", "  Storm\nWarning "), SourceName::Bbc).unwrap();
        assert_eq!(record.title, "Storm Warning");
        assert_eq!(record.url, "https://example.com/a");
        assert_eq!(record.content, "Body text with odd spacing.");
        assert_eq!(record.source, SourceName::Bbc);
        assert!(record.published_at.is_some());
    }

    #[test]
    fn test_build_record_keeps_escaped_markup_text() {
        use crate::scrapers::{utils, ArticleRules, FieldRule};

        const RULES: ArticleRules = ArticleRules {
            title: &[FieldRule::text("h1")],
            body: &["article p"],
            image: &[],
            published: &[],
        };
        let html = "<article><h1>Fast pages &amp;amp; slow scripts</h1>\
            <p>Developers should avoid inline &lt;script&gt; tags in page headers.</p>\
            <p>Deferring them keeps the first render quick, and &lt;style&gt; blocks belong in stylesheets.</p>\
            </article>";

        let raw = utils::extract_article(html, "https://example.com/perf", &RULES).unwrap();
        let record = build_record(raw, SourceName::Bbc).unwrap();

        assert_eq!(record.title, "Fast pages &amp; slow scripts");
        assert!(record.content.contains("inline <script> tags"));
        assert!(record.content.contains("Deferring them"));
        assert!(record.content.ends_with("belong in stylesheets."));
    }

    #[test]
    fn test_build_record_rejects_empty_title() {
        assert!(build_record(raw("https://example.com/a", " \n\t "), SourceName::Bbc).is_none());
    }

    #[test]
    fn test_sources_matching() {
        let manager = ScraperManager::new(ScraperRegistry::new(client()));
        assert_eq!(manager.sources_matching(None).unwrap().len(), SourceName::ALL.len());

        let bbc = manager.sources_matching(Some("bbc")).unwrap();
        assert_eq!(bbc.len(), 1);
        assert_eq!(bbc[0].name, SourceName::Bbc);

        assert!(manager.sources_matching(Some("daily-planet")).is_err());

        let only_npr = manager.with_sources(vec![SourceName::Npr.default_config()]);
        assert!(only_npr.sources_matching(Some("reuters")).is_err());
    }

    #[tokio::test]
    async fn test_panicking_source_is_isolated() {
        let mut registry = ScraperRegistry::new(client());
        registry.register(
            SourceName::Reuters,
            Box::new(|_| {
                Arc::new(FixedScraper {
                    source: SourceName::Reuters,
                    articles: vec![raw("https://r.example/1", "One"), raw("https://r.example/2", "Two")],
                })
            }),
        );
        registry.register(SourceName::Npr, Box::new(|_| Arc::new(PanickingScraper)));

        let manager = ScraperManager::new(registry).with_sources(vec![
            SourceName::Reuters.default_config(),
            SourceName::Npr.default_config(),
        ]);
        let report = manager.run_with_report().await;

        assert_eq!(report.sources.len(), 2);
        assert_eq!(report.sources[0].records.len(), 2);
        assert!(report.sources[0].error.is_none());
        assert_eq!(report.sources[1].source, SourceName::Npr);
        assert!(report.sources[1].error.is_some());
        assert_eq!(report.total_records(), 2);
    }

    struct SlowScraper {
        fetches: Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait]
    impl Scraper for SlowScraper {
        fn source(&self) -> SourceName {
            SourceName::Reuters
        }

        fn can_handle(&self, _url: &str) -> bool {
            true
        }

        async fn list_article_links(&self, _source: &SourceConfig) -> Vec<String> {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            (0..5).map(|i| format!("https://r.example/{}", i)).collect()
        }

        async fn fetch_article(&self, url: &str) -> Option<RawArticle> {
            self.fetches.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Some(raw(url, "Slow"))
        }
    }

    #[tokio::test]
    async fn test_dropped_run_stops_source_tasks() {
        let fetches = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut registry = ScraperRegistry::new(client());
        let counter = fetches.clone();
        registry.register(
            SourceName::Reuters,
            Box::new(move |_| Arc::new(SlowScraper { fetches: counter.clone() })),
        );
        let manager = ScraperManager::new(registry).with_sources(vec![SourceName::Reuters.default_config()]);

        let abandoned = tokio::time::timeout(std::time::Duration::from_millis(10), manager.run_once()).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert_eq!(fetches.load(std::sync::atomic::Ordering::SeqCst), 0);

        let records = manager.run_once().await;
        assert_eq!(records.len(), 5);
        assert_eq!(fetches.load(std::sync::atomic::Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_invalid_records_are_dropped() {
        let mut registry = ScraperRegistry::new(client());
        registry.register(
            SourceName::Bbc,
            Box::new(|_| {
                Arc::new(FixedScraper {
                    source: SourceName::Bbc,
                    articles: vec![raw("https://b.example/1", "Kept"), raw("https://b.example/2", "   ")],
                })
            }),
        );
        let manager = ScraperManager::new(registry).with_sources(vec![SourceName::Bbc.default_config()]);

        let records = manager.run_once().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Kept");
    }

    #[tokio::test]
    async fn test_scrape_url_routes_to_handling_scraper() {
        let mut registry = ScraperRegistry::new(client());
        registry.register(
            SourceName::Guardian,
            Box::new(|_| {
                Arc::new(FixedScraper {
                    source: SourceName::Guardian,
                    articles: vec![raw("https://g.example/world/x", "Guardian story")],
                })
            }),
        );
        let manager = ScraperManager::new(registry).with_sources(vec![SourceName::Guardian.default_config()]);

        let record = manager.scrape_url("https://g.example/world/x").await.unwrap();
        assert_eq!(record.source, SourceName::Guardian);
        assert!(manager.scrape_url("https://unknown.example/").await.is_err());
    }
}
