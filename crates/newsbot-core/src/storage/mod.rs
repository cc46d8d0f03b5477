mod article_repo;
mod database;
pub mod retry;
mod source_repo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::feed::{Article, NewArticle, Source};
use crate::Result;

pub use article_repo::ArticleRepository;
pub use database::Database;
pub use source_repo::SourceRepository;

/// Article persistence as seen by the pipelines
///
/// Implementations are the dedup authority: storing the same
/// `(source_id, link)` twice must leave a single row.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert an article, returning false when it already existed
    async fn store(&self, article: &NewArticle) -> Result<bool>;

    /// Unposted articles published at or after `since`, oldest first
    async fn list_unposted(&self, since: DateTime<Utc>, limit: u32) -> Result<Vec<Article>>;

    async fn mark_posted(&self, article: &Article) -> Result<()>;
}

/// Lists the sources the fetcher polls
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    async fn list_sources(&self) -> Result<Vec<Source>>;
}
