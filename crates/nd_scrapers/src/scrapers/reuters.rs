use std::sync::Arc;

use async_trait::async_trait;
use nd_core::{RawArticle, SourceConfig, SourceName};
use url::Url;

use super::utils::{index_links, same_host, scrape_article};
use super::{ArticleRules, FieldRule, Scraper};
use crate::client::PoliteClient;

const LINK_RULES: &[&str] = &[
    "a[data-testid='Heading']",
    "a[data-testid='Link'][href*='/world/']",
    "article a[href]",
];

const RULES: ArticleRules = ArticleRules {
    title: &[
        FieldRule::text("h1[data-testid='Heading']"),
        FieldRule::text("article h1"),
        FieldRule::attr("meta[property='og:title']", "content"),
    ],
    body: &["div[data-testid^='paragraph-']", "article p"],
    image: &[FieldRule::attr("meta[property='og:image']", "content")],
    published: &[
        FieldRule::attr("meta[property='article:published_time']", "content"),
        FieldRule::attr("time[datetime]", "datetime"),
    ],
};

#[derive(Debug, Clone)]
pub struct ReutersScraper {
    client: Arc<PoliteClient>,
}

impl ReutersScraper {
    pub fn new(client: Arc<PoliteClient>) -> Self {
        Self { client }
    }

    /// Story pages sit at least two segments deep and end in a dated slug.
    /// Query strings only carry tracking, so they are dropped.
    fn accept(mut url: Url, base: &Url) -> Option<Url> {
        if !same_host(&url, base) {
            return None;
        }
        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
        let slug = segments.last()?;
        if segments.len() < 2 || !slug.contains('-') {
            return None;
        }
        url.set_query(None);
        Some(url)
    }
}

#[async_trait]
impl Scraper for ReutersScraper {
    fn source(&self) -> SourceName {
        SourceName::Reuters
    }

    fn can_handle(&self, url: &str) -> bool {
        url.contains("reuters.com")
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
    use crate::client::ScrapeConfig;
    use mockito::Server;

    #[test]
    fn test_accept_strips_query_and_filters_sections() {
        let base = Url::parse("https://www.reuters.com").unwrap();
        let story = Url::parse("https://www.reuters.com/world/europe/floods-hit-town-2024-01-15/?utm_source=x").unwrap();
        assert_eq!(
            ReutersScraper::accept(story, &base).unwrap().as_str(),
            "https://www.reuters.com/world/europe/floods-hit-town-2024-01-15/"
        );

        let section = Url::parse("https://www.reuters.com/world/").unwrap();
        assert!(ReutersScraper::accept(section, &base).is_none());

        let offsite = Url::parse("https://www.example.com/world/europe/story-2024/").unwrap();
        assert!(ReutersScraper::accept(offsite, &base).is_none());
    }

    #[tokio::test]
    async fn test_list_and_fetch() {
        let mut server = Server::new_async().await;
        let listing = r#"
            <a data-testid="Heading" href="/world/asia/quake-strikes-coast-2024-01-15/?ref=home">Quake</a>
            <a data-testid="Heading" href="/world/">World</a>
        "#;
        let article = format!(
            r#"<html><head><meta property="article:published_time" content="2024-01-15T08:00:00Z"></head>
            <body><h1 data-testid="Heading">Quake strikes coast</h1>
            <div data-testid="paragraph-0">{}</div><div data-testid="paragraph-1">{}</div></body></html>"#,
            "A strong earthquake struck the coast early on Monday, officials said.",
            "Emergency crews were sent to the worst affected towns within the hour."
        );
        let _listing = server.mock("GET", "/world/").with_body(listing).create_async().await;
        let _article = server
            .mock("GET", "/world/asia/quake-strikes-coast-2024-01-15/")
            .with_body(article)
            .create_async()
            .await;

        let source = SourceConfig {
            name: SourceName::Reuters,
            base_url: server.url(),
            listing_url: format!("{}/world/", server.url()),
            url_pattern: "/world/".to_string(),
        };
        let client = Arc::new(PoliteClient::new(&ScrapeConfig::without_delay()).unwrap());
        let scraper = ReutersScraper::new(client);

        let links = scraper.list_article_links(&source).await;
        assert_eq!(links, vec![format!("{}/world/asia/quake-strikes-coast-2024-01-15/", server.url())]);

        let raw = scraper.fetch_article(&links[0]).await.unwrap();
        assert_eq!(raw.title, "Quake strikes coast");
        assert!(raw.body.starts_with("A strong earthquake"));
        assert_eq!(raw.published_at.to_rfc3339(), "2024-01-15T08:00:00+00:00");
    }
}
