use std::collections::HashMap;
use std::sync::Arc;

use nd_core::validation::is_valid;
use nd_core::{ArticleRecord, DocumentStore, Result};
use serde::Serialize;
use tracing::{debug, error, info};

/// Counts reported by one [`ArticleUpserter::upsert`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub inserted_count: usize,
    pub updated_count: usize,
    /// Records that already matched what was stored.
    pub unchanged_count: usize,
    pub failed_count: usize,
    pub inserted_urls: Vec<String>,
}

impl UpsertSummary {
    pub fn stored_count(&self) -> usize {
        self.inserted_count + self.updated_count
    }
}

/// Writes scraped records into a [`DocumentStore`], keyed by URL.
#[derive(Clone)]
pub struct ArticleUpserter {
    store: Arc<dyn DocumentStore>,
}

impl ArticleUpserter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Insert new records and update existing ones in one bulk write.
    ///
    /// Duplicate URLs within `records` collapse to the last occurrence and
    /// invalid records are dropped. Item-level write failures are logged and
    /// counted; only a failure of the whole write is returned as an error.
    pub async fn upsert(&self, records: &[ArticleRecord]) -> Result<UpsertSummary> {
        if records.is_empty() {
            info!("No articles to upsert");
            return Ok(UpsertSummary::default());
        }

        let batch = dedupe_by_url(records);
        if batch.is_empty() {
            info!(received = records.len(), "No valid articles to upsert");
            return Ok(UpsertSummary::default());
        }

        let result = self.store.bulk_upsert(&batch).await?;

        for write_error in &result.errors {
            let detail = serde_json::to_string(write_error).unwrap_or_else(|_| write_error.message.clone());
            error!(store = self.store.name(), %detail, "Failed to upsert article");
        }

        let summary = UpsertSummary {
            inserted_count: result.inserted as usize,
            updated_count: result.modified as usize,
            unchanged_count: result.matched as usize,
            failed_count: result.errors.len(),
            inserted_urls: result.upserted_urls,
        };
        info!(
            store = self.store.name(),
            inserted = summary.inserted_count,
            updated = summary.updated_count,
            unchanged = summary.unchanged_count,
            failed = summary.failed_count,
            "Upserted articles"
        );
        Ok(summary)
    }
}

/// Valid records with one entry per URL. Position follows the first
/// occurrence, content follows the last.
fn dedupe_by_url(records: &[ArticleRecord]) -> Vec<ArticleRecord> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut batch: Vec<ArticleRecord> = Vec::with_capacity(records.len());

    for record in records {
        if !is_valid(record) {
            debug!(url = %record.url, title = %record.title, "Skipping invalid article");
            continue;
        }
        match positions.get(record.url.as_str()) {
            Some(&i) => batch[i] = record.clone(),
            None => {
                positions.insert(record.url.as_str(), batch.len());
                batch.push(record.clone());
            }
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use nd_core::{BulkWriteResult, Enrichment, Error, SourceName, StoredArticle, WriteError};

    fn record(url: &str, title: &str) -> ArticleRecord {
        ArticleRecord {
            title: title.to_string(),
            url: url.to_string(),
            content: "Storm expected along the coast tonight.".to_string(),
            published_at: Some(Utc::now()),
            source: SourceName::Npr,
            image_url: None,
        }
    }

    /// Fails items whose URL contains "bad", or the whole batch when `down`.
    struct FailingStore {
        inner: MemoryStore,
        down: bool,
    }

    #[async_trait]
    impl DocumentStore for FailingStore {
        fn name(&self) -> &str {
            "failing"
        }

        async fn find_one(&self, url: &str) -> Result<Option<StoredArticle>> {
            self.inner.find_one(url).await
        }

        async fn bulk_upsert(&self, records: &[ArticleRecord]) -> Result<BulkWriteResult> {
            if self.down {
                return Err(Error::Database("connection refused".to_string()));
            }
            let (bad, good): (Vec<_>, Vec<_>) = records.iter().cloned().enumerate().partition(|(_, r)| r.url.contains("bad"));
            let good: Vec<ArticleRecord> = good.into_iter().map(|(_, r)| r).collect();
            let mut result = self.inner.bulk_upsert(&good).await?;
            result.errors = bad
                .into_iter()
                .map(|(index, r)| WriteError {
                    index,
                    url: r.url,
                    message: "write conflict".to_string(),
                })
                .collect();
            Ok(result)
        }

        async fn update_enrichment(&self, url: &str, enrichment: &Enrichment) -> Result<()> {
            self.inner.update_enrichment(url, enrichment).await
        }

        async fn set_saved(&self, url: &str, saved: bool) -> Result<()> {
            self.inner.set_saved(url, saved).await
        }

        async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
            self.inner.delete_older_than(cutoff).await
        }

        async fn get_by_source(&self, source: SourceName) -> Result<Vec<StoredArticle>> {
            self.inner.get_by_source(source).await
        }

        async fn count(&self) -> Result<u64> {
            self.inner.count().await
        }
    }

    #[tokio::test]
    async fn test_repeated_upsert_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let upserter = ArticleUpserter::new(store.clone());
        let batch = vec![record("https://npr.example/1", "Storm Warning Issued")];

        let first = upserter.upsert(&batch).await.unwrap();
        assert_eq!((first.inserted_count, first.updated_count), (1, 0));
        assert_eq!(first.inserted_urls, vec!["https://npr.example/1".to_string()]);
        let before = store.find_one("https://npr.example/1").await.unwrap().unwrap();

        let second = upserter.upsert(&batch).await.unwrap();
        assert_eq!((second.inserted_count, second.updated_count), (0, 0));
        assert_eq!(second.unchanged_count, 1);
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.find_one("https://npr.example/1").await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_duplicates_collapse_to_last() {
        let store = Arc::new(MemoryStore::new());
        let upserter = ArticleUpserter::new(store.clone());
        let batch = vec![
            record("https://npr.example/1", "First draft"),
            record("https://npr.example/2", "Other"),
            record("https://npr.example/1", "Final"),
        ];

        let summary = upserter.upsert(&batch).await.unwrap();
        assert_eq!(summary.inserted_count, 2);
        let stored = store.find_one("https://npr.example/1").await.unwrap().unwrap();
        assert_eq!(stored.record.title, "Final");
    }

    #[tokio::test]
    async fn test_invalid_records_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        let upserter = ArticleUpserter::new(store.clone());
        let mut undated = record("https://npr.example/2", "Undated");
        undated.published_at = None;

        let summary = upserter.upsert(&[record("https://npr.example/1", "Ok"), undated]).await.unwrap();
        assert_eq!(summary.inserted_count, 1);
        assert_eq!(store.count().await.unwrap(), 1);

        let none_valid = upserter.upsert(&[record("https://npr.example/3", "  ")]).await.unwrap();
        assert_eq!(none_valid, UpsertSummary::default());
    }

    #[tokio::test]
    async fn test_empty_input_is_noop() {
        let upserter = ArticleUpserter::new(Arc::new(MemoryStore::new()));
        assert_eq!(upserter.upsert(&[]).await.unwrap(), UpsertSummary::default());
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_the_rest() {
        let store = Arc::new(FailingStore {
            inner: MemoryStore::new(),
            down: false,
        });
        let upserter = ArticleUpserter::new(store.clone());
        let batch = vec![
            record("https://npr.example/1", "One"),
            record("https://npr.example/bad", "Broken"),
            record("https://npr.example/3", "Three"),
        ];

        let summary = upserter.upsert(&batch).await.unwrap();
        assert_eq!(summary.inserted_count, 2);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.stored_count(), 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_store_outage_is_an_error() {
        let upserter = ArticleUpserter::new(Arc::new(FailingStore {
            inner: MemoryStore::new(),
            down: true,
        }));
        let result = upserter.upsert(&[record("https://npr.example/1", "One")]).await;
        assert!(matches!(result, Err(Error::Database(_))));
    }
}
