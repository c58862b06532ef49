use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use nd_core::logging::truncate_for_log;
use nd_core::{Error, Result, Summarizer};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const MAX_INPUT_CHARS: usize = 8000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

pub struct GeminiSummarizer {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiSummarizer {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Summarization(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn prompt(text: &str, source: &str, category: &str) -> String {
        let article: String = text.chars().take(MAX_INPUT_CHARS).collect();
        format!(
            "Summarize the following {} news article in 3-4 concise sentences that capture the key points.\n\n\
             Source: {}\n\nArticle:\n{}\n\nSummary:",
            category, source, article
        )
    }

    async fn generate(&self, prompt: String) -> Result<Option<String>> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 250,
            },
        };

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateResponse>()
            .await?;

        Ok(response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }
}

impl fmt::Debug for GeminiSummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiSummarizer")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn summarize(&self, text: &str, source: &str, category: &str) -> Option<String> {
        if self.api_key.is_empty() {
            warn!("Gemini API key not configured");
            return None;
        }

        match self.generate(Self::prompt(text, source, category)).await {
            Ok(Some(summary)) => {
                debug!(%source, summary = %truncate_for_log(&summary, 80), "Gemini summary generated");
                Some(summary)
            }
            Ok(None) => {
                warn!(%source, "No summary content in Gemini response");
                None
            }
            Err(e) => {
                warn!(%source, error = %e, "Gemini request failed");
                None
            }
        }
    }
}
