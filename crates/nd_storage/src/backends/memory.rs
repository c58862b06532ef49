use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nd_core::{
    ArticleRecord, BulkWriteResult, DocumentStore, Enrichment, Error, Result, SourceName, StoredArticle,
    WriteError,
};
use tokio::sync::RwLock;
use tracing::debug;

/// Document store held in process memory, keyed by URL.
///
/// The write lock is held for a whole bulk write, so concurrent upserts of the
/// same URL never interleave.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, StoredArticle>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed document, replacing any existing one.
    pub async fn insert_document(&self, document: StoredArticle) {
        self.documents
            .write()
            .await
            .insert(document.record.url.clone(), document);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn find_one(&self, url: &str) -> Result<Option<StoredArticle>> {
        Ok(self.documents.read().await.get(url).cloned())
    }

    async fn bulk_upsert(&self, records: &[ArticleRecord]) -> Result<BulkWriteResult> {
        let now = Utc::now();
        let mut result = BulkWriteResult::default();
        let mut documents = self.documents.write().await;

        for (index, record) in records.iter().enumerate() {
            if record.url.trim().is_empty() {
                result.errors.push(WriteError {
                    index,
                    url: record.url.clone(),
                    message: "document key must not be empty".to_string(),
                });
                continue;
            }

            match documents.get_mut(&record.url) {
                Some(existing) => {
                    if existing.apply_record(record, now) {
                        result.modified += 1;
                    } else {
                        result.matched += 1;
                    }
                }
                None => {
                    documents.insert(record.url.clone(), StoredArticle::new(record.clone(), now));
                    result.inserted += 1;
                    result.upserted_urls.push(record.url.clone());
                }
            }
        }

        debug!(
            inserted = result.inserted,
            modified = result.modified,
            matched = result.matched,
            "Memory bulk upsert"
        );
        Ok(result)
    }

    async fn update_enrichment(&self, url: &str, enrichment: &Enrichment) -> Result<()> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(url)
            .ok_or_else(|| Error::Storage(format!("No document with url {}", url)))?;
        document.enrichment = enrichment.clone();
        document.updated_at = Utc::now();
        Ok(())
    }

    async fn set_saved(&self, url: &str, saved: bool) -> Result<()> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(url)
            .ok_or_else(|| Error::Storage(format!("No document with url {}", url)))?;
        document.saved_flag = saved;
        Ok(())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|_, doc| doc.saved_flag || doc.created_at >= cutoff);
        Ok((before - documents.len()) as u64)
    }

    async fn get_by_source(&self, source: SourceName) -> Result<Vec<StoredArticle>> {
        let mut articles: Vec<StoredArticle> = self
            .documents
            .read()
            .await
            .values()
            .filter(|doc| doc.record.source == source)
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.record.published_at.cmp(&a.record.published_at));
        Ok(articles)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.documents.read().await.len() as u64)
    }
}
