use std::sync::Arc;

use async_trait::async_trait;
use nd_core::{RawArticle, SourceConfig, SourceName};
use url::Url;

use super::utils::{index_links, same_host, scrape_article};
use super::{ArticleRules, FieldRule, Scraper};
use crate::client::PoliteClient;

const LINK_RULES: &[&str] = &["a[data-link-name='article']", "div.fc-item__container a[href]", "a[href]"];

const RULES: ArticleRules = ArticleRules {
    title: &[
        FieldRule::text("div[data-gu-name='headline'] h1"),
        FieldRule::text("h1"),
        FieldRule::attr("meta[property='og:title']", "content"),
    ],
    body: &["div#maincontent p", "div.article-body-commercial-selector p", "article p"],
    image: &[FieldRule::attr("meta[property='og:image']", "content")],
    published: &[
        FieldRule::attr("meta[property='article:published_time']", "content"),
        FieldRule::attr("time[datetime]", "datetime"),
    ],
};

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// `/world/2024/jan/15/slug`: year, month abbreviation, day, then the slug.
fn has_dated_path(url: &Url) -> bool {
    let Some(segments) = url.path_segments() else {
        return false;
    };
    let segments: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
    segments.windows(4).any(|w| {
        w[0].len() == 4
            && w[0].chars().all(|c| c.is_ascii_digit())
            && MONTHS.contains(&w[1])
            && w[2].chars().all(|c| c.is_ascii_digit())
    })
}

#[derive(Debug, Clone)]
pub struct GuardianScraper {
    client: Arc<PoliteClient>,
}

impl GuardianScraper {
    pub fn new(client: Arc<PoliteClient>) -> Self {
        Self { client }
    }

    fn accept(url: Url, base: &Url) -> Option<Url> {
        (same_host(&url, base) && has_dated_path(&url)).then_some(url)
    }
}

#[async_trait]
impl Scraper for GuardianScraper {
    fn source(&self) -> SourceName {
        SourceName::Guardian
    }

    fn can_handle(&self, url: &str) -> bool {
        url.contains("theguardian.com")
    }

    async fn list_article_links(&self, source: &SourceConfig) -> Vec<String> {
        index_links(&self.client, source, LINK_RULES, Self::accept).await
    }

    async fn fetch_article(&self, url: &str) -> Option<RawArticle> {
        scrape_article(&self.client, url, &RULES).await
    }
}
