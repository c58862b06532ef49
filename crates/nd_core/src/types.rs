use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The fixed set of news sites the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceName {
    #[serde(rename = "Reuters")]
    Reuters,
    #[serde(rename = "AP News")]
    ApNews,
    #[serde(rename = "NPR")]
    Npr,
    #[serde(rename = "The Guardian")]
    Guardian,
    #[serde(rename = "BBC")]
    Bbc,
    #[serde(rename = "Al Jazeera")]
    AlJazeera,
}

impl SourceName {
    pub const ALL: [SourceName; 6] = [
        SourceName::Reuters,
        SourceName::ApNews,
        SourceName::Npr,
        SourceName::Guardian,
        SourceName::Bbc,
        SourceName::AlJazeera,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceName::Reuters => "Reuters",
            SourceName::ApNews => "AP News",
            SourceName::Npr => "NPR",
            SourceName::Guardian => "The Guardian",
            SourceName::Bbc => "BBC",
            SourceName::AlJazeera => "Al Jazeera",
        }
    }

    /// Short lowercase name used on the command line.
    pub fn cli_name(&self) -> &'static str {
        match self {
            SourceName::Reuters => "reuters",
            SourceName::ApNews => "apnews",
            SourceName::Npr => "npr",
            SourceName::Guardian => "guardian",
            SourceName::Bbc => "bbc",
            SourceName::AlJazeera => "aljazeera",
        }
    }

    /// Listing page and link pattern the site is scraped with by default.
    pub fn default_config(&self) -> SourceConfig {
        let (base_url, listing_url, url_pattern) = match self {
            SourceName::Reuters => (
                "https://www.reuters.com",
                "https://www.reuters.com/world/",
                "reuters.com/",
            ),
            SourceName::ApNews => (
                "https://apnews.com",
                "https://apnews.com/hub/world-news",
                "apnews.com/article/",
            ),
            SourceName::Npr => (
                "https://www.npr.org",
                "https://www.npr.org/sections/world/",
                "npr.org/",
            ),
            SourceName::Guardian => (
                "https://www.theguardian.com",
                "https://www.theguardian.com/world",
                "theguardian.com/",
            ),
            SourceName::Bbc => (
                "https://www.bbc.com",
                "https://www.bbc.com/news/world",
                "bbc.com/news/",
            ),
            SourceName::AlJazeera => (
                "https://www.aljazeera.com",
                "https://www.aljazeera.com/news/",
                "aljazeera.com/news/",
            ),
        };
        SourceConfig {
            name: *self,
            base_url: base_url.to_string(),
            listing_url: listing_url.to_string(),
            url_pattern: url_pattern.to_string(),
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        SourceName::ALL
            .into_iter()
            .find(|name| name.as_str().to_lowercase() == needle || name.cli_name() == needle)
            .ok_or_else(|| Error::Config(format!("Unknown source: {}", s)))
    }
}

/// Where a source lives and how its article links are recognised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: SourceName,
    pub base_url: String,
    pub listing_url: String,
    /// Substring every article URL of this source contains.
    pub url_pattern: String,
}

/// Extractor output, before normalisation and validation.
///
/// `title` and `body` hold visible text with entities already decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawArticle {
    pub url: String,
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub source: SourceName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl FromStr for Sentiment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            other => Err(Error::Storage(format!("Unknown sentiment: {}", other))),
        }
    }
}

/// Fields added after storage by the enrichment stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Document shape kept by a [`crate::DocumentStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredArticle {
    #[serde(flatten)]
    pub record: ArticleRecord,
    #[serde(flatten)]
    pub enrichment: Enrichment,
    #[serde(default)]
    pub saved_flag: bool,
    #[serde(default)]
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredArticle {
    pub fn new(record: ArticleRecord, now: DateTime<Utc>) -> Self {
        Self {
            record,
            enrichment: Enrichment::default(),
            saved_flag: false,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the scraped fields with `record`.
    ///
    /// Returns `false` and leaves the document untouched when nothing differs,
    /// so repeated upserts of the same record are no-ops.
    pub fn apply_record(&mut self, record: &ArticleRecord, now: DateTime<Utc>) -> bool {
        if self.record == *record {
            return false;
        }
        self.record = record.clone();
        self.updated_at = now;
        true
    }
}

/// A single failed item inside a bulk write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteError {
    pub index: usize,
    pub url: String,
    pub message: String,
}

/// Outcome of [`crate::DocumentStore::bulk_upsert`], in the spirit of a
/// document database bulk write report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkWriteResult {
    pub inserted: u64,
    pub modified: u64,
    /// Existing documents whose scraped fields were already identical.
    pub matched: u64,
    pub upserted_urls: Vec<String>,
    pub errors: Vec<WriteError>,
}
