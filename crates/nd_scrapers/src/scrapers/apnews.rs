use std::sync::Arc;

use async_trait::async_trait;
use nd_core::{RawArticle, SourceConfig, SourceName};
use url::Url;

use super::utils::{index_links, same_host, scrape_article};
use super::{ArticleRules, FieldRule, Scraper};
use crate::client::PoliteClient;

const LINK_RULES: &[&str] = &[
    "div.PagePromo-title a[href]",
    "h3.PagePromo-title a[href]",
    "a[href*='/article/']",
];

const RULES: ArticleRules = ArticleRules {
    title: &[
        FieldRule::text("h1.Page-headline"),
        FieldRule::text("h1"),
        FieldRule::attr("meta[property='og:title']", "content"),
    ],
    body: &["div.RichTextStoryBody p", "div.RichTextBody p", "article p"],
    image: &[FieldRule::attr("meta[property='og:image']", "content")],
    published: &[
        FieldRule::attr("bsp-timestamp[data-timestamp]", "data-timestamp"),
        FieldRule::attr("meta[property='article:published_time']", "content"),
        FieldRule::attr("time[datetime]", "datetime"),
    ],
};

#[derive(Debug, Clone)]
pub struct ApNewsScraper {
    client: Arc<PoliteClient>,
}

impl ApNewsScraper {
    pub fn new(client: Arc<PoliteClient>) -> Self {
        Self { client }
    }

    fn accept(url: Url, base: &Url) -> Option<Url> {
        let is_article = url.path().starts_with("/article/") && url.path().len() > "/article/".len();
        (same_host(&url, base) && is_article).then_some(url)
    }
}

#[async_trait]
impl Scraper for ApNewsScraper {
    fn source(&self) -> SourceName {
        SourceName::ApNews
    }

    fn can_handle(&self, url: &str) -> bool {
        url.contains("apnews.com")
    }

    async fn list_article_links(&self, source: &SourceConfig) -> Vec<String> {
        index_links(&self.client, source, LINK_RULES, Self::accept).await
    }

    async fn fetch_article(&self, url: &str) -> Option<RawArticle> {
        scrape_article(&self.client, url, &RULES).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_only_article_paths() {
        let base = Url::parse("https://apnews.com").unwrap();
        let article = Url::parse("https://apnews.com/article/election-results-abc123").unwrap();
        assert!(ApNewsScraper::accept(article, &base).is_some());

        for other in [
            "https://apnews.com/hub/world-news",
            "https://apnews.com/article/",
            "https://twitter.com/article/abc",
        ] {
            assert!(ApNewsScraper::accept(Url::parse(other).unwrap(), &base).is_none(), "{}", other);
        }
    }

    #[test]
    fn test_epoch_millis_timestamp_is_not_used() {
        // data-timestamp holds epoch millis, which the date parser rejects;
        // the meta tag provides the time instead.
        let html = format!(
            r#"<meta property="article:published_time" content="2024-03-02T12:00:00Z">
            <bsp-timestamp data-timestamp="1709380800000"></bsp-timestamp>
            <h1 class="Page-headline">Talks resume</h1>
            <div class="RichTextStoryBody"><p>{}</p><p>{}</p></div>"#,
            "Negotiators returned to the table on Saturday after a week-long pause.",
            "Both sides said they expected the talks to last at least three days."
        );
        let raw = super::super::utils::extract_article(&html, "https://apnews.com/article/talks", &RULES).unwrap();
        assert_eq!(raw.title, "Talks resume");
        assert_eq!(raw.published_at.to_rfc3339(), "2024-03-02T12:00:00+00:00");
    }
}
