use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;

use super::PageFetcher;
use crate::feed::build_client;
use crate::{Error, Result};

const MAX_PAGE_BYTES: usize = 5 * 1024 * 1024;

// Some publishers serve an empty shell to obvious bots
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Downloads article pages over HTTP
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(timeout_secs: u64, proxy_url: &Option<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs, proxy_url)?,
        })
    }

    fn page_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        tracing::debug!("Fetching article page: {}", url);

        let response = self
            .client
            .get(url)
            .headers(Self::page_headers())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Extraction(format!("HTTP {} for URL: {}", status, url)));
        }

        let bytes = response.bytes().await?;
        if bytes.len() > MAX_PAGE_BYTES {
            return Err(Error::Extraction(format!(
                "Page too large ({} bytes) for URL: {}",
                bytes.len(),
                url
            )));
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
