pub mod client;
pub mod manager;
pub mod scrapers;

pub use client::{PoliteClient, ScrapeConfig};
pub use manager::{build_record, RunReport, ScraperManager, SourceReport};
pub use scrapers::{Scraper, ScraperRegistry, MAX_ARTICLE_LINKS, MIN_BODY_CHARS};

pub mod prelude {
    pub use super::scrapers::Scraper;
    pub use super::{PoliteClient, ScrapeConfig, ScraperManager, ScraperRegistry};
    pub use nd_core::{ArticleRecord, Error, Result};
}
