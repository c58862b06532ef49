use std::sync::Arc;

use async_trait::async_trait;
use nd_core::{RawArticle, SourceConfig, SourceName};
use url::Url;

use super::utils::{index_links, same_host, scrape_article};
use super::{ArticleRules, FieldRule, Scraper};
use crate::client::PoliteClient;

const LINK_RULES: &[&str] = &["a[data-testid='internal-link']", "a.gs-c-promo-heading", "a[href]"];

const RULES: ArticleRules = ArticleRules {
    title: &[
        FieldRule::text("h1#main-heading"),
        FieldRule::text("article h1"),
        FieldRule::attr("meta[property='og:title']", "content"),
    ],
    body: &["div[data-component='text-block'] p", "article p"],
    image: &[FieldRule::attr("meta[property='og:image']", "content")],
    published: &[FieldRule::attr("time[datetime]", "datetime")],
};

/// `/news/articles/<id>` or legacy `/news/world-12345678`.
fn is_story_path(url: &Url) -> bool {
    let Some(rest) = url.path().strip_prefix("/news/") else {
        return false;
    };
    if let Some(id) = rest.strip_prefix("articles/") {
        return !id.trim_end_matches('/').is_empty();
    }
    rest.rsplit('-')
        .next()
        .map_or(false, |tail| tail.len() >= 6 && tail.chars().all(|c| c.is_ascii_digit()))
}

#[derive(Debug, Clone)]
pub struct BbcScraper {
    client: Arc<PoliteClient>,
}

impl BbcScraper {
    pub fn new(client: Arc<PoliteClient>) -> Self {
        Self { client }
    }

    fn accept(url: Url, base: &Url) -> Option<Url> {
        (same_host(&url, base) && is_story_path(&url)).then_some(url)
    }
}

#[async_trait]
impl Scraper for BbcScraper {
    fn source(&self) -> SourceName {
        SourceName::Bbc
    }

    fn can_handle(&self, url: &str) -> bool {
        url.contains("bbc.com/news") || url.contains("bbc.co.uk/news")
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
    fn test_story_paths() {
        for ok in [
            "https://www.bbc.com/news/articles/c4ng2dz8l0wo",
            "https://www.bbc.com/news/world-europe-68012345",
        ] {
            assert!(is_story_path(&Url::parse(ok).unwrap()), "{}", ok);
        }
        for other in [
            "https://www.bbc.com/news/world",
            "https://www.bbc.com/news/articles/",
            "https://www.bbc.com/sport/football-68012345",
        ] {
            assert!(!is_story_path(&Url::parse(other).unwrap()), "{}", other);
        }
    }

    #[test]
    fn test_can_handle() {
        let client = Arc::new(PoliteClient::new(&crate::client::ScrapeConfig::without_delay()).unwrap());
        let scraper = BbcScraper::new(client);
        assert!(scraper.can_handle("https://www.bbc.com/news/articles/abc"));
        assert!(!scraper.can_handle("https://www.bbc.com/sport/football"));
    }
}
