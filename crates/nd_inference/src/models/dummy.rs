use async_trait::async_trait;
use nd_core::Summarizer;

const LEAD_SENTENCES: usize = 3;
const FALLBACK_CHARS: usize = 300;

/// Extractive summarizer: the lead sentences of the article, attributed to
/// the source. Used without an API key and when the remote service fails.
#[derive(Debug, Clone, Default)]
pub struct DummySummarizer;

impl DummySummarizer {
    pub fn new() -> Self {
        Self
    }

    pub fn lead(text: &str, source: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let sentences = split_sentences(text);
        let mut summary = if sentences.is_empty() {
            let truncated: String = text.chars().take(FALLBACK_CHARS).collect();
            format!("{}...", truncated)
        } else {
            sentences.into_iter().take(LEAD_SENTENCES).collect::<Vec<_>>().join(" ")
        };

        if !source.is_empty() {
            summary.push_str(&format!(" (Source: {})", source));
        }
        Some(summary)
    }
}

/// Sentences ending in `.`, `!` or `?` followed by whitespace or the end of
/// the text. A trailing fragment without terminator is dropped.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
        if at_boundary {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    sentences
}

#[async_trait]
impl Summarizer for DummySummarizer {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn summarize(&self, text: &str, source: &str, _category: &str) -> Option<String> {
        Self::lead(text, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        let text = "Prices rose 2.5% in March. Analysts were surprised! Will it last? Unclear";
        assert_eq!(
            split_sentences(text),
            vec!["Prices rose 2.5% in March.", "Analysts were surprised!", "Will it last?"]
        );
    }

    #[tokio::test]
    async fn test_summarize_takes_lead_sentences() {
        let text = "One happened. Two followed. Three ended it. Four is extra.";
        let summary = DummySummarizer::new().summarize(text, "BBC", "general").await.unwrap();
        assert_eq!(summary, "One happened. Two followed. Three ended it. (Source: BBC)");
    }

    #[test]
    fn test_lead_without_sentences_truncates() {
        let text = "word ".repeat(100);
        let summary = DummySummarizer::lead(&text, "").unwrap();
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), FALLBACK_CHARS + 3);
        assert!(DummySummarizer::lead("   ", "NPR").is_none());
    }
}
