mod telegram;

use async_trait::async_trait;

use crate::feed::Article;
use crate::summary::truncate_chars;
use crate::Result;

pub use telegram::TelegramPublisher;

/// Telegram rejects messages over 4096 characters; escaping can double the
/// summary, so it is cut well below that.
const MAX_SUMMARY_CHARS: usize = 1500;

/// Delivers a formatted message to a channel
#[async_trait]
pub trait Publisher: Send + Sync {
    /// `text` is already MarkdownV2
    async fn publish(&self, channel_id: i64, text: &str) -> Result<()>;
}

/// Escape every character MarkdownV2 reserves
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(
            ch,
            '\\' | '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '='
                | '|' | '{' | '}' | '.' | '!'
        ) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Bold title, optional summary paragraph, then the link
pub fn format_message(article: &Article, summary: &str) -> String {
    let summary = truncate_chars(summary.trim(), MAX_SUMMARY_CHARS);
    let mut message = format!("*{}*", escape_markdown(article.title.trim()));

    if !summary.is_empty() {
        message.push_str("\n\n");
        message.push_str(&escape_markdown(summary));
    }

    message.push_str("\n\n");
    message.push_str(&escape_markdown(&article.link));
    message
}
