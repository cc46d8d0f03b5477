use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info};

use super::{apply_policy, run_every};
use crate::config::{AppConfig, FailurePolicy};
use crate::content::ContentEnricher;
use crate::feed::Article;
use crate::publish::{format_message, Publisher};
use crate::storage::ArticleStore;
use crate::summary::Summarizer;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct NotifierSettings {
    pub channel_id: i64,
    pub interval: Duration,
    /// Articles published earlier than `now - lookback` are never sent
    pub lookback: Duration,
    pub on_error: FailurePolicy,
}

impl NotifierSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            channel_id: config.telegram.channel_id,
            interval: config.notification_interval(),
            lookback: config.lookback()?,
            on_error: config.notifier.on_error,
        })
    }
}

/// Periodically delivers the oldest unposted article
///
/// At most one article is sent per attempt. An article is marked posted only
/// after the publisher accepted it, so a failed attempt leaves it eligible
/// for the next one.
pub struct Notifier {
    articles: Arc<dyn ArticleStore>,
    enricher: ContentEnricher,
    summarizer: Arc<dyn Summarizer>,
    publisher: Arc<dyn Publisher>,
    settings: NotifierSettings,
}

impl Notifier {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        enricher: ContentEnricher,
        summarizer: Arc<dyn Summarizer>,
        publisher: Arc<dyn Publisher>,
        settings: NotifierSettings,
    ) -> Self {
        Self {
            articles,
            enricher,
            summarizer,
            publisher,
            settings,
        }
    }

    /// Send the oldest eligible article, returning it, or `None` when there
    /// was nothing to send
    pub async fn select_and_send_article(&self) -> Result<Option<Article>> {
        self.attempt_at(Utc::now()).await
    }

    async fn attempt_at(&self, now: DateTime<Utc>) -> Result<Option<Article>> {
        let lookback = chrono::Duration::from_std(self.settings.lookback)
            .map_err(|e| Error::Config(format!("Invalid lookback window: {}", e)))?;
        let since = now - lookback;

        let Some(article) = self.articles.list_unposted(since, 1).await?.into_iter().next() else {
            debug!("No unposted articles since {}", since);
            return Ok(None);
        };

        debug!("Preparing '{}' ({})", article.title, article.link);

        let text = self.enricher.article_text(&article).await?;
        let summary = self.summarizer.summarize(&text).await?;
        let message = format_message(&article, &summary);

        self.publisher.publish(self.settings.channel_id, &message).await?;
        self.articles.mark_posted(&article).await?;

        info!("Posted '{}'", article.title);
        Ok(Some(article))
    }

    /// Run delivery attempts until shutdown
    ///
    /// Returns `Ok` when cancelled; a failed attempt ends the loop only under
    /// [`FailurePolicy::Stop`].
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            "Notifier started: interval={}s, lookback={}s, channel={}",
            self.settings.interval.as_secs(),
            self.settings.lookback.as_secs(),
            self.settings.channel_id
        );

        run_every("Notifier", self.settings.interval, shutdown, move || async move {
            match self.select_and_send_article().await {
                Ok(_) => Ok(()),
                Err(e) => apply_policy("Delivery attempt", self.settings.on_error, e),
            }
        })
        .await
    }
}
