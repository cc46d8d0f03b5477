pub mod fetch;
pub mod run;
pub mod send;
pub mod source;
pub mod status;

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use newsbot_core::{
    content::{ContentEnricher, HttpPageFetcher, ReadableExtractor},
    feed::RssAdapterFactory,
    publish::TelegramPublisher,
    scheduler::{Fetcher, FetcherSettings, Notifier, NotifierSettings},
    storage::{ArticleRepository, Database, SourceRepository},
    summary::build_summarizer,
    AppConfig,
};

/// Wire the ingestion scheduler to the SQLite store and RSS sources
pub fn build_fetcher(db: &Database, config: &AppConfig) -> Result<Fetcher> {
    Ok(Fetcher::new(
        Arc::new(ArticleRepository::new(db)),
        Arc::new(SourceRepository::new(db)),
        Arc::new(RssAdapterFactory::new(&config.fetcher)?),
        FetcherSettings::from_config(config),
    ))
}

/// Wire the delivery scheduler; requires Telegram credentials
pub fn build_notifier(db: &Database, config: &AppConfig) -> Result<Notifier> {
    let token = config
        .telegram
        .bot_token
        .as_deref()
        .context("Telegram bot token is not set (telegram.bot_token or NEWSBOT_TELEGRAM_BOT_TOKEN)")?;

    if config.telegram.channel_id == 0 {
        bail!("Telegram channel is not set (telegram.channel_id or NEWSBOT_TELEGRAM_CHANNEL_ID)");
    }

    let timeout = config.fetcher.request_timeout_secs;
    let pages = HttpPageFetcher::new(timeout, &config.fetcher.proxy_url)?;
    let enricher = ContentEnricher::new(Arc::new(pages), Arc::new(ReadableExtractor::new()));

    Ok(Notifier::new(
        Arc::new(ArticleRepository::new(db)),
        enricher,
        build_summarizer(&config.summary)?,
        Arc::new(TelegramPublisher::new(token, timeout)?),
        NotifierSettings::from_config(config)?,
    ))
}
