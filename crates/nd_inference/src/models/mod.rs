use std::sync::Arc;

use nd_core::{Result, Summarizer};
use tracing::info;

pub mod dummy;
pub mod gemini;

pub use dummy::DummySummarizer;
pub use gemini::GeminiSummarizer;

/// Gemini when an API key is configured, the extractive summarizer otherwise.
pub fn create_summarizer(api_key: Option<String>) -> Result<Arc<dyn Summarizer>> {
    match api_key.filter(|key| !key.trim().is_empty()) {
        Some(key) => {
            info!("Using Gemini summarizer");
            Ok(Arc::new(GeminiSummarizer::new(key)?))
        }
        None => {
            info!("No Gemini API key, using extractive summaries");
            Ok(Arc::new(DummySummarizer::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_summarizer_picks_backend() {
        assert_eq!(create_summarizer(None).unwrap().name(), "extractive");
        assert_eq!(create_summarizer(Some("  ".to_string())).unwrap().name(), "extractive");
        assert_eq!(create_summarizer(Some("key".to_string())).unwrap().name(), "gemini");
    }
}
