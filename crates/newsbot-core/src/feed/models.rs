use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A feed the bot polls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub name: String,
    pub feed_url: String,
    pub created_at: DateTime<Utc>,
}

/// Data required to register a new source
#[derive(Debug, Clone)]
pub struct NewSource {
    pub name: String,
    pub feed_url: String,
}

/// One entry of a single fetch, never persisted as-is
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub title: String,
    pub link: String,
    /// Inline summary from the feed, may be empty
    pub summary: String,
    pub categories: Vec<String>,
    /// Publication time; the RSS parser yields UTC, other adapters may carry an offset
    pub published_at: DateTime<FixedOffset>,
}

/// A stored article, unposted until `posted_at` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub source_id: Uuid,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published_at: DateTime<Utc>,
    pub posted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Data required to store an accepted item
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub source_id: Uuid,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published_at: DateTime<Utc>,
}

impl NewArticle {
    /// Build the insert payload for an item, normalizing its timestamp to UTC
    pub fn from_item(source_id: Uuid, item: Item) -> Self {
        Self {
            source_id,
            title: item.title,
            link: item.link,
            summary: item.summary,
            published_at: item.published_at.with_timezone(&Utc),
        }
    }
}

impl Article {
    pub fn is_posted(&self) -> bool {
        self.posted_at.is_some()
    }

    /// True when the feed supplied text we can summarize without fetching the page
    pub fn has_inline_summary(&self) -> bool {
        !self.summary.trim().is_empty()
    }
}
