use scraper::Html;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::ResultCache;
use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::parser::MatchParser;
use crate::pool::ConnectionPool;
use crate::types::{EventRecord, FetchOptions};

/// Source of raw page markup.
pub trait HtmlFetcher: Send + Sync {
    fn fetch_html(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Fetches through the rotating connection pool.
#[derive(Clone)]
pub struct PooledFetcher {
    pool: Arc<ConnectionPool>,
}

impl PooledFetcher {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

impl HtmlFetcher for PooledFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let client = self.pool.acquire().await?;
        debug!("Fetching {} via {}", url, client.label());
        client.get_text(url).await
    }
}

pub struct MarkupLoader<F: HtmlFetcher> {
    fetcher: F,
    parser: MatchParser,
    cache: Option<ResultCache>,
    metrics: MetricsCollector,
}

impl<F: HtmlFetcher> MarkupLoader<F> {
    pub fn new(fetcher: F, parser: MatchParser, metrics: MetricsCollector) -> Self {
        Self {
            fetcher,
            parser,
            cache: None,
            metrics,
        }
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Fetches and parses a page. Fetch errors are returned as they are.
    pub async fn load(&self, url: &str) -> Result<Html> {
        let body = self.fetcher.fetch_html(url).await?;
        Ok(Html::parse_document(&body))
    }

    /// Every record on the page, extracted with permissive options so the
    /// result can be cached and filtered for any request. Summaries reflect `now`
    /// and are rebuilt by the caller when served later.
    pub async fn load_records(&self, url: &str, now: i64) -> Result<Vec<EventRecord>> {
        if let Some(cache) = &self.cache {
            let cached = cache.get(url, now);
            self.metrics.record_cache_lookup(cached.is_some());
            if let Some(records) = cached {
                debug!("Cache hit for {} ({} records)", url, records.len());
                return Ok(records);
            }
        }

        let document = self.load(url).await?;
        let records = self
            .parser
            .parse_document(&document, &FetchOptions::permissive(), now);
        info!("Extracted {} match(es) from {}", records.len(), url);

        if let Some(cache) = &self.cache {
            cache.put(url, records.clone(), now);
        }
        Ok(records)
    }
}
