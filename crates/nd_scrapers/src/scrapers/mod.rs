use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use nd_core::{RawArticle, SourceConfig, SourceName};

use crate::client::PoliteClient;

pub mod apnews;
pub mod bbc;
pub mod generic;
pub mod guardian;
pub mod jsonld;
pub mod npr;
pub mod reuters;

pub use apnews::ApNewsScraper;
pub use bbc::BbcScraper;
pub use generic::GenericScraper;
pub use guardian::GuardianScraper;
pub use npr::NprScraper;
pub use reuters::ReutersScraper;

/// Most links a single listing page contributes to a run.
pub const MAX_ARTICLE_LINKS: usize = 20;

/// Bodies shorter than this are treated as boilerplate or error pages.
pub const MIN_BODY_CHARS: usize = 100;

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Returns the news source this scraper extracts
    fn source(&self) -> SourceName;

    /// Returns true if this scraper can handle the given URL
    fn can_handle(&self, url: &str) -> bool;

    /// Returns up to [`MAX_ARTICLE_LINKS`] article URLs from the listing page.
    /// Never fails: an unreachable page or unmatched markup yields an empty list.
    async fn list_article_links(&self, source: &SourceConfig) -> Vec<String>;

    /// Fetches and extracts one article, or `None` if it can't be used
    async fn fetch_article(&self, url: &str) -> Option<RawArticle>;
}

pub type BoxedScraper = Arc<dyn Scraper>;
pub type ScraperFactory = Box<dyn Fn(Arc<PoliteClient>) -> BoxedScraper + Send + Sync>;

/// One way of pulling a value out of a page: the text of the first match of
/// `selector`, or one of its attributes.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub selector: &'static str,
    pub attr: Option<&'static str>,
}

impl FieldRule {
    pub const fn text(selector: &'static str) -> Self {
        Self { selector, attr: None }
    }

    pub const fn attr(selector: &'static str, attr: &'static str) -> Self {
        Self {
            selector,
            attr: Some(attr),
        }
    }
}

/// Ordered extraction rules for an article page. Earlier rules win.
#[derive(Debug, Clone, Copy)]
pub struct ArticleRules {
    pub title: &'static [FieldRule],
    /// Paragraph selectors; the first one yielding text provides the body.
    pub body: &'static [&'static str],
    pub image: &'static [FieldRule],
    pub published: &'static [FieldRule],
}

/// Maps each source to the scraper that understands its markup.
pub struct ScraperRegistry {
    client: Arc<PoliteClient>,
    factories: HashMap<SourceName, ScraperFactory>,
}

impl ScraperRegistry {
    /// An empty registry; every source falls back to [`GenericScraper`].
    pub fn new(client: Arc<PoliteClient>) -> Self {
        Self {
            client,
            factories: HashMap::new(),
        }
    }

    pub fn with_defaults(client: Arc<PoliteClient>) -> Self {
        let mut registry = Self::new(client);
        registry.register(SourceName::Reuters, Box::new(|c| Arc::new(ReutersScraper::new(c))));
        registry.register(SourceName::ApNews, Box::new(|c| Arc::new(ApNewsScraper::new(c))));
        registry.register(SourceName::Npr, Box::new(|c| Arc::new(NprScraper::new(c))));
        registry.register(SourceName::Guardian, Box::new(|c| Arc::new(GuardianScraper::new(c))));
        registry.register(SourceName::Bbc, Box::new(|c| Arc::new(BbcScraper::new(c))));
        registry
    }

    pub fn register(&mut self, source: SourceName, factory: ScraperFactory) {
        self.factories.insert(source, factory);
    }

    pub fn is_registered(&self, source: SourceName) -> bool {
        self.factories.contains_key(&source)
    }

    pub fn client(&self) -> &Arc<PoliteClient> {
        &self.client
    }

    /// The registered scraper for `source`, or the generic fallback driven by
    /// its URL pattern.
    pub fn scraper_for(&self, source: &SourceConfig) -> BoxedScraper {
        match self.factories.get(&source.name) {
            Some(factory) => factory(self.client.clone()),
            None => Arc::new(GenericScraper::new(self.client.clone(), source.clone())),
        }
    }
}

/// Common utilities for scrapers
pub(crate) mod utils {
    use std::collections::HashSet;

    use chrono::Utc;
    use nd_core::cleaning::{parse_timestamp, visible_text};
    use nd_core::{Error, RawArticle, Result, SourceConfig};
    use scraper::{Html, Selector};
    use tracing::{debug, info, warn};
    use url::Url;

    use super::{jsonld, ArticleRules, FieldRule, MAX_ARTICLE_LINKS, MIN_BODY_CHARS};
    use crate::client::PoliteClient;

    pub fn parse_url(url: &str) -> Result<Url> {
        Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))
    }

    pub fn same_host(url: &Url, base: &Url) -> bool {
        url.host_str().is_some() && url.host_str() == base.host_str() && url.port() == base.port()
    }

    fn parse_selector(selector: &str) -> Option<Selector> {
        match Selector::parse(selector) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!(%selector, error = ?e, "Invalid selector");
                None
            }
        }
    }

    /// First non-empty value across `rules`, in order.
    pub fn select_first(document: &Html, rules: &[FieldRule]) -> Option<String> {
        rules.iter().find_map(|rule| {
            let selector = parse_selector(rule.selector)?;
            document.select(&selector).find_map(|el| {
                let value = match rule.attr {
                    Some(attr) => el
                        .value()
                        .attr(attr)
                        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
                        .unwrap_or_default(),
                    None => visible_text(el),
                };
                (!value.is_empty()).then_some(value)
            })
        })
    }

    /// Paragraph text of the first selector that matches anything, joined
    /// with single spaces.
    pub fn collect_body(document: &Html, selectors: &[&str]) -> Option<String> {
        selectors.iter().find_map(|selector| {
            let selector = parse_selector(selector)?;
            let paragraphs: Vec<String> = document
                .select(&selector)
                .map(visible_text)
                .filter(|text| !text.is_empty())
                .collect();
            (!paragraphs.is_empty()).then(|| paragraphs.join(" "))
        })
    }

    /// Article links from a listing page.
    ///
    /// Link rule sets are tried in order until one yields results. `accept`
    /// filters each resolved URL and may rewrite it into its canonical form.
    pub fn collect_links<F>(html: &str, base: &Url, rule_sets: &[&str], accept: F) -> Vec<String>
    where
        F: Fn(Url) -> Option<Url>,
    {
        let document = Html::parse_document(html);

        for rule in rule_sets {
            let Some(selector) = parse_selector(rule) else {
                continue;
            };

            let mut seen = HashSet::new();
            let mut links = Vec::new();
            for el in document.select(&selector) {
                let Some(href) = el.value().attr("href") else {
                    continue;
                };
                let Ok(mut resolved) = base.join(href.trim()) else {
                    continue;
                };
                if !matches!(resolved.scheme(), "http" | "https") {
                    continue;
                }
                resolved.set_fragment(None);
                let Some(canonical) = accept(resolved) else {
                    continue;
                };
                let canonical = canonical.to_string();
                if seen.insert(canonical.clone()) {
                    links.push(canonical);
                }
            }

            if !links.is_empty() {
                debug!(rule = %rule, found = links.len(), "Link rule matched");
                links.truncate(MAX_ARTICLE_LINKS);
                return links;
            }
        }

        Vec::new()
    }

    /// Pull title, body, image and publish time out of an article page.
    pub fn extract_article(html: &str, url: &str, rules: &ArticleRules) -> Option<RawArticle> {
        let document = Html::parse_document(html);

        let Some(title) = select_first(&document, rules.title).or_else(|| jsonld::extract_headline(&document)) else {
            debug!(%url, "No title found");
            return None;
        };
        let Some(body) = collect_body(&document, rules.body) else {
            debug!(%url, "No body found");
            return None;
        };
        let body_chars = body.chars().count();
        if body_chars < MIN_BODY_CHARS {
            debug!(%url, body_chars, "Body below minimum length");
            return None;
        }

        let page_url = Url::parse(url).ok();
        let image_url = select_first(&document, rules.image)
            .or_else(|| jsonld::extract_image(&document))
            .and_then(|src| match &page_url {
                Some(page) => page.join(&src).ok().map(String::from),
                None => Url::parse(&src).ok().map(String::from),
            });

        let published_at = rules
            .published
            .iter()
            .filter_map(|rule| select_first(&document, std::slice::from_ref(rule)))
            .chain(jsonld::extract_date_published(&document))
            .find_map(|raw| parse_timestamp(&raw))
            .unwrap_or_else(|| {
                debug!(%url, "No parseable publish time, using scrape time");
                Utc::now()
            });

        Some(RawArticle {
            url: url.to_string(),
            title,
            body,
            image_url,
            published_at,
        })
    }

    /// Fetch a listing page and collect its article links.
    pub async fn index_links<F>(
        client: &PoliteClient,
        source: &SourceConfig,
        rule_sets: &[&str],
        accept: F,
    ) -> Vec<String>
    where
        F: Fn(Url, &Url) -> Option<Url>,
    {
        let base = match parse_url(&source.base_url) {
            Ok(base) => base,
            Err(e) => {
                warn!(source = %source.name, error = %e, "Bad base URL");
                return Vec::new();
            }
        };

        let Some(html) = client.fetch_page(&source.listing_url).await else {
            warn!(source = %source.name, url = %source.listing_url, "Listing page unavailable");
            return Vec::new();
        };

        let links = collect_links(&html, &base, rule_sets, |url| accept(url, &base));
        info!(source = %source.name, count = links.len(), "Indexed article links");
        links
    }

    /// Fetch an article page and extract it with `rules`.
    pub async fn scrape_article(client: &PoliteClient, url: &str, rules: &ArticleRules) -> Option<RawArticle> {
        let html = client.fetch_page(url).await?;
        let article = extract_article(&html, url, rules);
        if article.is_none() {
            warn!(%url, "Extraction produced no usable article");
        }
        article
    }
}
