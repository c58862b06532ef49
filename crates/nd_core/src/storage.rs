use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{ArticleRecord, BulkWriteResult, Enrichment, SourceName, StoredArticle};
use crate::Result;

/// A collection of article documents keyed by their unique `url`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Find a single document by URL
    async fn find_one(&self, url: &str) -> Result<Option<StoredArticle>>;

    /// Insert-or-update every record by URL.
    ///
    /// Item failures are reported in [`BulkWriteResult::errors`]; an `Err` means
    /// the batch as a whole could not be attempted.
    async fn bulk_upsert(&self, records: &[ArticleRecord]) -> Result<BulkWriteResult>;

    /// Replace the enrichment fields of an existing document
    async fn update_enrichment(&self, url: &str, enrichment: &Enrichment) -> Result<()>;

    /// Flag or unflag a document as saved, exempting it from retention
    async fn set_saved(&self, url: &str, saved: bool) -> Result<()>;

    /// Delete unsaved documents created before `cutoff`, returning how many went
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Get all documents from a specific source, newest first
    async fn get_by_source(&self, source: SourceName) -> Result<Vec<StoredArticle>>;

    async fn count(&self) -> Result<u64>;
}
