use chrono::{DateTime, FixedOffset, Utc};
use feed_rs::parser;

use super::models::Item;
use crate::{Error, Result};

/// Parse RSS/Atom content into items
///
/// Entries without a link are dropped since the link is half of the
/// article identity. Entries without a date get `fallback_time`.
pub fn parse_items(content: &[u8], fallback_time: DateTime<Utc>) -> Result<Vec<Item>> {
    let feed = parser::parse(content)
        .map_err(|e| Error::FeedParse(e.to_string()))?;

    let items = feed.entries.into_iter().filter_map(|entry| {
        let link = entry.links.first().map(|l| l.href.trim().to_string())?;
        if link.is_empty() {
            return None;
        }

        let title = entry.title
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default();

        let summary = entry.summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();

        let categories = entry.categories
            .into_iter()
            .map(|c| c.term)
            .collect();

        let published_at: DateTime<FixedOffset> = entry.published
            .or(entry.updated)
            .unwrap_or(fallback_time)
            .fixed_offset();

        Some(Item {
            title,
            link,
            summary,
            categories,
            published_at,
        })
    }).collect();

    Ok(items)
}
