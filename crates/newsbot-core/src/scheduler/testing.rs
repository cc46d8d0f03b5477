//! In-memory doubles shared by the scheduler tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::feed::{Article, NewArticle};
use crate::storage::ArticleStore;
use crate::{Error, Result};

/// `ArticleStore` backed by a vector, with switchable failures
#[derive(Default)]
pub(crate) struct MemoryStore {
    articles: Mutex<Vec<Article>>,
    failing_links: Mutex<HashSet<String>>,
    fail_list: AtomicBool,
    fail_mark: AtomicBool,
    mark_calls: AtomicUsize,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn articles(&self) -> Vec<Article> {
        self.articles.lock().unwrap().clone()
    }

    pub(crate) fn links(&self) -> Vec<String> {
        self.articles().into_iter().map(|a| a.link).collect()
    }

    /// Make `store` fail for this link
    pub(crate) fn fail_store_for(&self, link: &str) {
        self.failing_links.lock().unwrap().insert(link.to_string());
    }

    pub(crate) fn fail_list_unposted(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_mark_posted(&self, fail: bool) {
        self.fail_mark.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn mark_calls(&self) -> usize {
        self.mark_calls.load(Ordering::SeqCst)
    }

    /// Seed an article directly, bypassing dedup
    pub(crate) fn seed(&self, title: &str, link: &str, summary: &str, published_at: DateTime<Utc>) -> Article {
        let article = Article {
            id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            title: title.to_string(),
            link: link.to_string(),
            summary: summary.to_string(),
            published_at,
            posted_at: None,
            created_at: Utc::now(),
        };
        self.articles.lock().unwrap().push(article.clone());
        article
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn store(&self, article: &NewArticle) -> Result<bool> {
        if self.failing_links.lock().unwrap().contains(&article.link) {
            return Err(Error::Database(sqlx::Error::PoolTimedOut));
        }

        let mut articles = self.articles.lock().unwrap();
        if articles
            .iter()
            .any(|a| a.source_id == article.source_id && a.link == article.link)
        {
            return Ok(false);
        }

        articles.push(Article {
            id: Uuid::new_v4(),
            source_id: article.source_id,
            title: article.title.clone(),
            link: article.link.clone(),
            summary: article.summary.clone(),
            published_at: article.published_at,
            posted_at: None,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn list_unposted(&self, since: DateTime<Utc>, limit: u32) -> Result<Vec<Article>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::Database(sqlx::Error::PoolTimedOut));
        }

        let mut eligible: Vec<Article> = self
            .articles()
            .into_iter()
            .filter(|a| a.posted_at.is_none() && a.published_at >= since)
            .collect();
        eligible.sort_by_key(|a| a.published_at);
        eligible.truncate(limit as usize);
        Ok(eligible)
    }

    async fn mark_posted(&self, article: &Article) -> Result<()> {
        self.mark_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_mark.load(Ordering::SeqCst) {
            return Err(Error::Database(sqlx::Error::PoolTimedOut));
        }

        let mut articles = self.articles.lock().unwrap();
        if let Some(stored) = articles.iter_mut().find(|a| a.id == article.id) {
            stored.posted_at.get_or_insert_with(Utc::now);
        }
        Ok(())
    }
}
