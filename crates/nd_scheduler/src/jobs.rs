use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use nd_core::{ArticleRecord, DocumentStore, Error, Result};
use nd_inference::Enricher;
use nd_scrapers::ScraperManager;
use nd_storage::ArticleUpserter;
use tracing::info;

use crate::Job;

/// Scrape every source, store the records, then enrich what was new.
pub struct ScrapeJob {
    manager: Arc<ScraperManager>,
    upserter: ArticleUpserter,
    enricher: Option<Arc<Enricher>>,
}

impl ScrapeJob {
    pub fn new(manager: Arc<ScraperManager>, upserter: ArticleUpserter) -> Self {
        Self {
            manager,
            upserter,
            enricher: None,
        }
    }

    pub fn with_enricher(mut self, enricher: Arc<Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }
}

#[async_trait]
impl Job for ScrapeJob {
    fn name(&self) -> &str {
        "scrape"
    }

    async fn run(&self) -> Result<u64> {
        let records = self.manager.run_once().await;
        if records.is_empty() {
            info!("No articles scraped this run");
        }

        let summary = self.upserter.upsert(&records).await?;

        if let Some(enricher) = &self.enricher {
            let inserted: HashSet<&str> = summary.inserted_urls.iter().map(String::as_str).collect();
            let mut seen = HashSet::new();
            // last occurrence of each URL is what got stored
            let fresh: Vec<ArticleRecord> = records
                .iter()
                .rev()
                .filter(|r| inserted.contains(r.url.as_str()) && seen.insert(r.url.as_str()))
                .cloned()
                .collect();
            if !fresh.is_empty() {
                enricher.enrich(&fresh).await;
            }
        }

        info!(
            scraped = records.len(),
            stored = summary.stored_count(),
            "Scraped and stored articles"
        );
        Ok(summary.stored_count() as u64)
    }
}

/// Drop unsaved documents older than the retention window.
pub struct CleanupJob {
    store: Arc<dyn DocumentStore>,
    retention_days: u32,
}

impl CleanupJob {
    pub fn new(store: Arc<dyn DocumentStore>, retention_days: u32) -> Self {
        Self { store, retention_days }
    }
}

#[async_trait]
impl Job for CleanupJob {
    fn name(&self) -> &str {
        "cleanup"
    }

    async fn run(&self) -> Result<u64> {
        let cutoff = Utc::now()
            .checked_sub_signed(chrono::Duration::days(i64::from(self.retention_days)))
            .ok_or_else(|| Error::Config(format!("Retention of {} days is out of range", self.retention_days)))?;
        let deleted = self.store.delete_older_than(cutoff).await?;
        info!(deleted, retention_days = self.retention_days, %cutoff, "Removed old articles");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nd_core::{RawArticle, SourceConfig, SourceName, StoredArticle};
    use nd_inference::DummySummarizer;
    use nd_scrapers::scrapers::Scraper;
    use nd_scrapers::{PoliteClient, ScrapeConfig, ScraperRegistry};
    use nd_storage::MemoryStore;

    struct StaticScraper;

    #[async_trait]
    impl Scraper for StaticScraper {
        fn source(&self) -> SourceName {
            SourceName::Npr
        }

        fn can_handle(&self, _url: &str) -> bool {
            true
        }

        async fn list_article_links(&self, _source: &SourceConfig) -> Vec<String> {
            vec!["https://npr.example/1".to_string(), "https://npr.example/2".to_string()]
        }

        async fn fetch_article(&self, url: &str) -> Option<RawArticle> {
            Some(RawArticle {
                url: url.to_string(),
                title: "Storm Warning Issued".to_string(),
                body: "Forecasters issued a storm warning for the coast. Residents were told to stay indoors.".to_string(),
                image_url: None,
                published_at: Utc::now(),
            })
        }
    }

    fn manager() -> Arc<ScraperManager> {
        let client = Arc::new(PoliteClient::new(&ScrapeConfig::without_delay()).unwrap());
        let mut registry = ScraperRegistry::new(client);
        registry.register(SourceName::Npr, Box::new(|_| Arc::new(StaticScraper)));
        Arc::new(ScraperManager::new(registry).with_sources(vec![SourceName::Npr.default_config()]))
    }

    #[tokio::test]
    async fn test_scrape_job_stores_and_enriches() {
        let store = Arc::new(MemoryStore::new());
        let enricher = Arc::new(Enricher::new(store.clone(), Arc::new(DummySummarizer::new())));
        let job = ScrapeJob::new(manager(), ArticleUpserter::new(store.clone())).with_enricher(enricher);

        assert_eq!(job.run().await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 2);
        let stored = store.find_one("https://npr.example/1").await.unwrap().unwrap();
        assert_eq!(stored.enrichment.category.as_deref(), Some("general"));
        assert!(stored.enrichment.summary.is_some());

        // nothing new the second time round
        assert_eq!(job.run().await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cleanup_job_respects_retention() {
        let store = Arc::new(MemoryStore::new());
        let record = |url: &str| nd_core::ArticleRecord {
            title: "Old news".to_string(),
            url: url.to_string(),
            content: "Body".to_string(),
            published_at: Some(Utc::now()),
            source: SourceName::Bbc,
            image_url: None,
        };
        let old = Utc::now() - chrono::Duration::days(31);
        store.insert_document(StoredArticle::new(record("https://bbc.example/old"), old)).await;
        let mut saved = StoredArticle::new(record("https://bbc.example/saved"), old);
        saved.saved_flag = true;
        store.insert_document(saved).await;
        store
            .insert_document(StoredArticle::new(record("https://bbc.example/recent"), Utc::now() - chrono::Duration::days(29)))
            .await;

        let job = CleanupJob::new(store.clone(), 30);
        assert_eq!(job.run().await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cleanup_job_rejects_unrepresentable_retention() {
        let store = Arc::new(MemoryStore::new());
        let job = CleanupJob::new(store, u32::MAX);
        assert!(matches!(job.run().await, Err(Error::Config(_))));
    }
}
