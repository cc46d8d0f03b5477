use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use url::Url;
use uuid::Uuid;

use super::{Database, SourceCatalog};
use crate::feed::{NewSource, Source};
use crate::{Error, Result};

/// Repository for the source catalog
#[derive(Clone)]
pub struct SourceRepository {
    db: Database,
}

#[derive(FromRow)]
struct SourceRow {
    id: String,
    name: String,
    feed_url: String,
    created_at: DateTime<Utc>,
}

impl From<SourceRow> for Source {
    fn from(row: SourceRow) -> Self {
        Source {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            name: row.name,
            feed_url: row.feed_url,
            created_at: row.created_at,
        }
    }
}

impl SourceRepository {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    /// Register a new source
    pub async fn create(&self, new_source: &NewSource) -> Result<Source> {
        Url::parse(&new_source.feed_url)?;

        if self.find_by_name(&new_source.name).await?.is_some() {
            return Err(Error::SourceExists(new_source.name.clone()));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO sources (id, name, feed_url, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&new_source.name)
        .bind(&new_source.feed_url)
        .bind(now)
        .execute(self.db.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Error::SourceExists(new_source.feed_url.clone())
            }
            other => Error::Database(other),
        })?;

        Ok(Source {
            id,
            name: new_source.name.clone(),
            feed_url: new_source.feed_url.clone(),
            created_at: now,
        })
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Source>> {
        let row: Option<SourceRow> = sqlx::query_as(
            "SELECT id, name, feed_url, created_at FROM sources WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(Source::from))
    }

    /// Delete a source and its articles
    pub async fn delete(&self, name: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM sources WHERE name = ?")
            .bind(name)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::SourceNotFound(name.to_string()));
        }
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<Source>> {
        let rows: Vec<SourceRow> = sqlx::query_as(
            "SELECT id, name, feed_url, created_at FROM sources ORDER BY name ASC",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(Source::from).collect())
    }
}

#[async_trait]
impl SourceCatalog for SourceRepository {
    async fn list_sources(&self) -> Result<Vec<Source>> {
        self.list_all().await
    }
}
