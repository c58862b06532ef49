pub mod analysis;
pub mod enrich;
pub mod models;

pub use analysis::{analyze_sentiment, detect_category, extract_keywords, DEFAULT_CATEGORY};
pub use enrich::Enricher;
pub use models::{create_summarizer, DummySummarizer, GeminiSummarizer};

pub mod prelude {
    pub use super::models::create_summarizer;
    pub use super::Enricher;
    pub use nd_core::{Error, Result, Summarizer};
}
