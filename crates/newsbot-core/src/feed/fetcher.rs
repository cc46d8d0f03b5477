use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Proxy, StatusCode};
use url::Url;
use uuid::Uuid;

use super::models::{Item, Source};
use super::parser::parse_items;
use super::{AdapterFactory, SourceAdapter};
use crate::config::FetcherConfig;
use crate::{Error, Result};

const MAX_FEED_BYTES: usize = 5 * 1024 * 1024;
const MAX_RETRIES: u32 = 3;
const INITIAL_RETRY_DELAY_MS: u64 = 500;
const BOT_USER_AGENT: &str = concat!("newsbot/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by all RSS sources
pub fn build_client(timeout_secs: u64, proxy_url: &Option<String>) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .redirect(reqwest::redirect::Policy::limited(10));

    if let Some(ref proxy) = proxy_url {
        let proxy = Proxy::all(proxy)
            .map_err(|e| Error::Config(format!("Invalid proxy URL: {}", e)))?;
        builder = builder.proxy(proxy);
        tracing::info!("Using HTTP proxy for feed fetching");
    }

    builder.build().map_err(Error::Http)
}

fn feed_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "application/rss+xml,application/atom+xml,application/xml;q=0.9,text/xml;q=0.8,*/*;q=0.5",
        ),
    );
    headers.insert(USER_AGENT, HeaderValue::from_static(BOT_USER_AGENT));
    headers
}

/// RSS/Atom source adapter
pub struct RssSource {
    id: Uuid,
    name: String,
    url: String,
    client: Client,
}

impl RssSource {
    pub fn new(source: &Source, client: Client) -> Self {
        Self {
            id: source.id,
            name: source.name.clone(),
            url: source.feed_url.clone(),
            client,
        }
    }

    /// GET the feed, retrying on 429/503 and transport errors with exponential backoff
    async fn fetch_with_retry(&self) -> Result<Vec<u8>> {
        let mut last_error = None;
        let mut delay_ms = INITIAL_RETRY_DELAY_MS;

        for attempt in 0..MAX_RETRIES {
            tracing::debug!("Fetch attempt {} for {}", attempt + 1, self.url);

            match self.client.get(&self.url).headers(feed_headers()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS
                        || status == StatusCode::SERVICE_UNAVAILABLE
                    {
                        tracing::warn!(
                            "Received {} for {}, retrying after {}ms...",
                            status,
                            self.url,
                            delay_ms
                        );
                        last_error = Some(Error::FeedParse(format!("HTTP {} for URL: {}", status, self.url)));
                    } else if !status.is_success() {
                        return Err(Error::FeedParse(format!("HTTP {} for URL: {}", status, self.url)));
                    } else {
                        match response.bytes().await {
                            Ok(bytes) => return Ok(bytes.to_vec()),
                            Err(e) => {
                                tracing::warn!("Failed to read response body: {}", e);
                                last_error = Some(Error::Http(e));
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Request failed for {} (attempt {}): {}",
                        self.url,
                        attempt + 1,
                        e
                    );
                    last_error = Some(Error::Http(e));
                }
            }

            if attempt < MAX_RETRIES - 1 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms *= 2;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::FeedParse(format!("Failed to fetch URL after {} retries: {}", MAX_RETRIES, self.url))
        }))
    }
}

#[async_trait]
impl SourceAdapter for RssSource {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<Item>> {
        Url::parse(&self.url)?;

        let content = self.fetch_with_retry().await?;
        if content.len() > MAX_FEED_BYTES {
            return Err(Error::FeedParse(format!(
                "Feed too large ({} bytes) for URL: {}",
                content.len(),
                self.url
            )));
        }

        parse_items(&content, Utc::now())
    }
}

/// Builds an `RssSource` for every listed source, sharing one client
pub struct RssAdapterFactory {
    client: Client,
}

impl RssAdapterFactory {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout_secs, &config.proxy_url)?,
        })
    }
}

impl AdapterFactory for RssAdapterFactory {
    fn adapter(&self, source: &Source) -> Arc<dyn SourceAdapter> {
        Arc::new(RssSource::new(source, self.client.clone()))
    }
}
