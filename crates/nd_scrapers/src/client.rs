use std::sync::Arc;
use std::time::Duration;

use nd_core::{Error, Result};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Network politeness settings for one scrape run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
    /// Upper bound on fetches in flight across all sources.
    pub max_concurrent_fetches: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: 1.5,
            max_delay_secs: 3.0,
            max_concurrent_fetches: 5,
            request_timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ScrapeConfig {
    /// No delay between requests; for tests against local servers.
    pub fn without_delay() -> Self {
        Self {
            min_delay_secs: 0.0,
            max_delay_secs: 0.0,
            ..Self::default()
        }
    }
}

/// HTTP client shared by every scraper.
///
/// Each fetch takes one of a fixed number of permits and sleeps for a random
/// delay before the request goes out.
#[derive(Debug)]
pub struct PoliteClient {
    http: reqwest::Client,
    permits: Arc<Semaphore>,
    max_concurrency: usize,
    min_delay: f64,
    max_delay: f64,
}

impl PoliteClient {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| Error::Config(format!("Invalid user agent: {}", e)))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let max_concurrency = config.max_concurrent_fetches.max(1);
        Ok(Self {
            http,
            permits: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            min_delay: config.min_delay_secs.max(0.0),
            max_delay: config.max_delay_secs.max(0.0),
        })
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Fetch a page body, or `None` if anything goes wrong on the way.
    pub async fn fetch_page(&self, url: &str) -> Option<String> {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!(%url, error = %e, "Fetch permits closed");
                return None;
            }
        };

        tokio::time::sleep(self.politeness_delay()).await;

        match self.get_text(url).await {
            Ok(body) => {
                debug!(%url, bytes = body.len(), "Fetched page");
                Some(body)
            }
            Err(e) => {
                warn!(%url, error = %e, "Request failed");
                None
            }
        }
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    fn politeness_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return Duration::from_secs_f64(self.min_delay);
        }
        let secs = rand::thread_rng().gen_range(self.min_delay..=self.max_delay);
        Duration::from_secs_f64(secs)
    }
}
