use std::sync::Arc;

use async_trait::async_trait;
use nd_core::{RawArticle, SourceConfig, SourceName};
use url::Url;

use super::utils::{index_links, same_host, scrape_article};
use super::{ArticleRules, FieldRule, Scraper};
use crate::client::PoliteClient;

const LINK_RULES: &[&str] = &["h2.title a[href]", "article.item a[href]", "a[href]"];

const RULES: ArticleRules = ArticleRules {
    title: &[
        FieldRule::text("div.storytitle h1"),
        FieldRule::text("h1"),
        FieldRule::attr("meta[property='og:title']", "content"),
    ],
    body: &["div#storytext > p", "div.storytext p", "article p"],
    image: &[FieldRule::attr("meta[property='og:image']", "content")],
    published: &[
        FieldRule::attr("time[datetime]", "datetime"),
        FieldRule::attr("meta[name='date']", "content"),
    ],
};

/// Story URLs are dated: `/2024/01/15/1224.../slug`.
fn is_dated_story(url: &Url) -> bool {
    let Some(segments) = url.path_segments() else {
        return false;
    };
    let segments: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
    segments.windows(3).any(|w| {
        w[0].len() == 4
            && w.iter().all(|s| s.chars().all(|c| c.is_ascii_digit()))
    })
}

#[derive(Debug, Clone)]
pub struct NprScraper {
    client: Arc<PoliteClient>,
}

impl NprScraper {
    pub fn new(client: Arc<PoliteClient>) -> Self {
        Self { client }
    }

    fn accept(url: Url, base: &Url) -> Option<Url> {
        (same_host(&url, base) && is_dated_story(&url)).then_some(url)
    }
}

#[async_trait]
impl Scraper for NprScraper {
    fn source(&self) -> SourceName {
        SourceName::Npr
    }

    fn can_handle(&self, url: &str) -> bool {
        url.contains("npr.org")
    }

    async fn list_article_links(&self, source: &SourceConfig) -> Vec<String> {
        index_links(&self.client, source, LINK_RULES, Self::accept).await
    }

    async fn fetch_article(&self, url: &str) -> Option<RawArticle> {
        scrape_article(&self.client, url, &RULES).await
    }
}
