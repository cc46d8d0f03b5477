mod http;
mod readability;

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::feed::Article;
use crate::Result;

pub use http::HttpPageFetcher;
pub use readability::ReadableExtractor;

/// Reduces an HTML document (or plain text) to readable plain text
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, html: &str) -> Result<String>;
}

/// Retrieves the raw body of an article page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String>;
}

static REDUNDANT_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid newline pattern"));

/// Collapse runs of three or more newlines into one
pub fn cleanup_text(text: &str) -> String {
    REDUNDANT_NEWLINES.replace_all(text, "\n").into_owned()
}

/// Produces the text an article is summarized from
///
/// Uses the feed's inline summary when there is one, otherwise downloads
/// the article page.
pub struct ContentEnricher {
    pages: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ContentExtractor>,
}

impl ContentEnricher {
    pub fn new(pages: Arc<dyn PageFetcher>, extractor: Arc<dyn ContentExtractor>) -> Self {
        Self { pages, extractor }
    }

    pub async fn article_text(&self, article: &Article) -> Result<String> {
        let source = if article.has_inline_summary() {
            article.summary.clone()
        } else {
            self.pages.fetch_page(&article.link).await?
        };

        let text = self.extractor.extract(&source)?;
        Ok(cleanup_text(&text))
    }
}
