mod fetcher;
mod models;
mod parser;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::Result;

pub use fetcher::{build_client, RssAdapterFactory, RssSource};
pub use models::{Article, Item, NewArticle, NewSource, Source};
pub use parser::parse_items;

/// Fetches the current items of one source
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn id(&self) -> Uuid;

    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<Item>>;
}

/// Turns a catalog entry into something that can be fetched
pub trait AdapterFactory: Send + Sync {
    fn adapter(&self, source: &Source) -> Arc<dyn SourceAdapter>;
}
