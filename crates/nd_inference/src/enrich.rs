use std::sync::Arc;
use std::time::Duration;

use nd_core::{ArticleRecord, DocumentStore, Enrichment, Summarizer};
use tracing::{debug, info, warn};

use crate::analysis::{analyze_sentiment, detect_category, extract_keywords};
use crate::models::DummySummarizer;

const DEFAULT_KEYWORDS: usize = 10;
const DEFAULT_SUMMARY_ATTEMPTS: usize = 2;

/// Adds category, keywords, sentiment and a summary to stored articles.
pub struct Enricher {
    store: Arc<dyn DocumentStore>,
    summarizer: Arc<dyn Summarizer>,
    summary_attempts: usize,
    retry_delay: Duration,
    keyword_count: usize,
}

impl Enricher {
    pub fn new(store: Arc<dyn DocumentStore>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            store,
            summarizer,
            summary_attempts: DEFAULT_SUMMARY_ATTEMPTS,
            retry_delay: Duration::from_secs(1),
            keyword_count: DEFAULT_KEYWORDS,
        }
    }

    pub fn with_retry(mut self, attempts: usize, delay: Duration) -> Self {
        self.summary_attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    pub fn with_keyword_count(mut self, count: usize) -> Self {
        self.keyword_count = count;
        self
    }

    /// Heuristic fields only; no summary.
    pub fn analyze(&self, record: &ArticleRecord) -> Enrichment {
        Enrichment {
            category: Some(detect_category(&record.title, &record.content).to_string()),
            keywords: extract_keywords(&format!("{} {}", record.title, record.content), self.keyword_count),
            sentiment: Some(analyze_sentiment(&record.content)),
            summary: None,
        }
    }

    /// Summary from the configured summarizer, retried, then the lead
    /// sentences as a last resort.
    async fn summarize(&self, record: &ArticleRecord, category: &str) -> Option<String> {
        let source = record.source.as_str();
        for attempt in 1..=self.summary_attempts {
            if let Some(summary) = self.summarizer.summarize(&record.content, source, category).await {
                return Some(summary);
            }
            debug!(url = %record.url, attempt, summarizer = self.summarizer.name(), "Summary attempt failed");
            if attempt < self.summary_attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        DummySummarizer::lead(&record.content, source)
    }

    /// Enrich each record and write the result back. Failures are logged and
    /// skipped; returns how many documents were updated.
    pub async fn enrich(&self, records: &[ArticleRecord]) -> usize {
        let mut enriched = 0;

        for record in records {
            let mut enrichment = self.analyze(record);
            let category = enrichment.category.clone().unwrap_or_default();
            enrichment.summary = self.summarize(record, &category).await;

            match self.store.update_enrichment(&record.url, &enrichment).await {
                Ok(()) => enriched += 1,
                Err(e) => warn!(url = %record.url, error = %e, "Failed to store enrichment"),
            }
        }

        info!(enriched, total = records.len(), "Enrichment finished");
        enriched
    }
}
