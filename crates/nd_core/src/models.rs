use async_trait::async_trait;

/// Remote summarization service, treated as a black box.
#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;

    /// Summarize `text`. Any failure yields `None`; callers keep going without
    /// a summary.
    async fn summarize(&self, text: &str, source: &str, category: &str) -> Option<String>;
}
