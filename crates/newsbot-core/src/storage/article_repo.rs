use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::retry::with_retry;
use super::{ArticleStore, Database};
use crate::feed::{Article, NewArticle};
use crate::Result;

/// Repository for article persistence and posted tracking
#[derive(Clone)]
pub struct ArticleRepository {
    db: Database,
}

#[derive(FromRow)]
struct ArticleRow {
    id: String,
    source_id: String,
    title: String,
    link: String,
    summary: String,
    published_at: DateTime<Utc>,
    posted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            source_id: Uuid::parse_str(&row.source_id).unwrap_or_default(),
            title: row.title,
            link: row.link,
            summary: row.summary,
            published_at: row.published_at,
            posted_at: row.posted_at,
            created_at: row.created_at,
        }
    }
}

impl ArticleRepository {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Article>> {
        let row: Option<ArticleRow> = sqlx::query_as(
            r#"
            SELECT id, source_id, title, link, summary, published_at, posted_at, created_at
            FROM articles
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(Article::from))
    }

    /// Total number of stored articles
    pub async fn count(&self) -> Result<u32> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.0 as u32)
    }

    /// Number of articles still waiting to be posted
    pub async fn count_unposted(&self) -> Result<u32> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles WHERE posted_at IS NULL")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.0 as u32)
    }
}

#[async_trait]
impl ArticleStore for ArticleRepository {
    async fn store(&self, article: &NewArticle) -> Result<bool> {
        let pool = self.db.pool();
        let id = Uuid::new_v4().to_string();
        let id = id.as_str();
        let source_id = article.source_id.to_string();
        let source_id = source_id.as_str();
        let now = Utc::now();

        let result = with_retry(move || {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO articles
                (id, source_id, title, link, summary, published_at, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(id)
            .bind(source_id)
            .bind(article.title.as_str())
            .bind(article.link.as_str())
            .bind(article.summary.as_str())
            .bind(article.published_at)
            .bind(now)
            .execute(pool)
        })
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_unposted(&self, since: DateTime<Utc>, limit: u32) -> Result<Vec<Article>> {
        let rows: Vec<ArticleRow> = sqlx::query_as(
            r#"
            SELECT id, source_id, title, link, summary, published_at, posted_at, created_at
            FROM articles
            WHERE posted_at IS NULL AND published_at >= ?
            ORDER BY published_at ASC
            LIMIT ?
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn mark_posted(&self, article: &Article) -> Result<()> {
        let pool = self.db.pool();
        let id = article.id.to_string();
        let id = id.as_str();
        let now = Utc::now();

        with_retry(move || {
            sqlx::query("UPDATE articles SET posted_at = ? WHERE id = ? AND posted_at IS NULL")
                .bind(now)
                .bind(id)
                .execute(pool)
        })
        .await?;

        Ok(())
    }
}
