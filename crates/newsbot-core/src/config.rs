use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What a scheduler does after an error that aborted a cycle or attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the error and wait for the next tick
    #[default]
    Continue,
    /// Return the error and terminate the scheduler
    Stop,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Data directory path
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Explicit database file, overrides `data_dir/newsbot.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Log level used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_path: None,
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Seconds between ingestion cycles
    #[serde(default = "default_fetch_interval")]
    pub fetch_interval_secs: u64,
    /// Block-list matched against titles (substring) and categories (exact)
    #[serde(default)]
    pub filter_keywords: Vec<String>,
    /// Upper bound on sources fetched at the same time
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    /// Deadline for fetching a single source
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// HTTP proxy URL (e.g., "http://127.0.0.1:7890" or "socks5://127.0.0.1:1080")
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default)]
    pub on_error: FailurePolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            fetch_interval_secs: default_fetch_interval(),
            filter_keywords: Vec::new(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            source_timeout_secs: default_source_timeout(),
            request_timeout_secs: default_timeout(),
            proxy_url: None,
            on_error: FailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Seconds between delivery attempts
    #[serde(default = "default_notification_interval")]
    pub notification_interval_secs: u64,
    /// Lookback window expressed in fetch intervals
    #[serde(default = "default_lookback_multiplier")]
    pub lookback_multiplier: u32,
    #[serde(default)]
    pub on_error: FailurePolicy,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            notification_interval_secs: default_notification_interval(),
            lookback_multiplier: default_lookback_multiplier(),
            on_error: FailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Destination channel
    #[serde(default)]
    pub channel_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Enable AI summaries; when off messages carry only title and link
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// "gemini_api" or "openai"
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Instruction appended after the article text
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Article text is cut to this many characters before summarizing
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            provider: default_provider(),
            gemini_api_key: None,
            gemini_model: default_gemini_model(),
            openai_api_key: None,
            openai_model: default_openai_model(),
            prompt: default_prompt(),
            max_input_chars: default_max_input_chars(),
            request_timeout_secs: default_timeout(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("newsbot")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_fetch_interval() -> u64 {
    600 // 10 minutes
}

fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_source_timeout() -> u64 {
    60
}

fn default_timeout() -> u64 {
    30
}

fn default_notification_interval() -> u64 {
    60
}

fn default_lookback_multiplier() -> u32 {
    2
}

fn default_provider() -> String {
    "gemini_api".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_prompt() -> String {
    "Summarize the article above in 2-3 sentences. Keep the original language, \
no introductions, no markdown."
        .to_string()
}

fn default_max_input_chars() -> usize {
    8000
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

/// Treat empty strings from TOML or the environment as unset
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a file (missing file means defaults), then
    /// apply environment overrides and validate
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Apply `NEWSBOT_*` overrides; credentials usually come from here
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("NEWSBOT_TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(channel) = lookup("NEWSBOT_TELEGRAM_CHANNEL_ID") {
            match channel.trim().parse() {
                Ok(id) => self.telegram.channel_id = id,
                Err(_) => tracing::warn!("Ignoring invalid NEWSBOT_TELEGRAM_CHANNEL_ID: {}", channel),
            }
        }
        if let Some(key) = lookup("NEWSBOT_GEMINI_API_KEY") {
            self.summary.gemini_api_key = Some(key);
        }
        if let Some(key) = lookup("NEWSBOT_OPENAI_API_KEY") {
            self.summary.openai_api_key = Some(key);
        }
        if let Some(path) = lookup("NEWSBOT_DATABASE_PATH") {
            self.general.database_path = Some(PathBuf::from(path));
        }
    }

    fn normalize(&mut self) {
        self.telegram.bot_token = non_empty(self.telegram.bot_token.take());
        self.summary.gemini_api_key = non_empty(self.summary.gemini_api_key.take());
        self.summary.openai_api_key = non_empty(self.summary.openai_api_key.take());
        self.fetcher.proxy_url = non_empty(self.fetcher.proxy_url.take());
    }

    /// Reject settings the schedulers cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.fetcher.fetch_interval_secs == 0 {
            return Err(crate::Error::Config("fetch_interval_secs must be greater than 0".into()));
        }
        if self.notifier.notification_interval_secs == 0 {
            return Err(crate::Error::Config(
                "notification_interval_secs must be greater than 0".into(),
            ));
        }
        if self.fetcher.max_concurrent_fetches == 0 {
            return Err(crate::Error::Config("max_concurrent_fetches must be greater than 0".into()));
        }
        if self.notifier.lookback_multiplier == 0 {
            return Err(crate::Error::Config("lookback_multiplier must be greater than 0".into()));
        }
        let lookback = self.lookback()?;
        if chrono::Duration::from_std(lookback).is_err() {
            return Err(crate::Error::Config(format!(
                "lookback window of {}s is out of range",
                lookback.as_secs()
            )));
        }
        match self.summary.provider.as_str() {
            "gemini_api" | "openai" => Ok(()),
            other => Err(crate::Error::Config(format!("Unknown summary provider: {}", other))),
        }
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("newsbot")
            .join("config.toml")
    }

    /// Get the data directory (with tilde expansion)
    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.general.data_dir)
    }

    /// Get the database file path
    pub fn database_path(&self) -> PathBuf {
        match self.general.database_path {
            Some(ref path) => expand_tilde(path),
            None => self.data_dir().join("newsbot.db"),
        }
    }

    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetcher.fetch_interval_secs)
    }

    pub fn notification_interval(&self) -> Duration {
        Duration::from_secs(self.notifier.notification_interval_secs)
    }

    /// Maximum age of an article still eligible for delivery
    pub fn lookback(&self) -> crate::Result<Duration> {
        self.fetch_interval()
            .checked_mul(self.notifier.lookback_multiplier)
            .ok_or_else(|| {
                crate::Error::Config(format!(
                    "lookback overflows: {}s x {}",
                    self.fetcher.fetch_interval_secs, self.notifier.lookback_multiplier
                ))
            })
    }
}
