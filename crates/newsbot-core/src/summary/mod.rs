//! Article summarization
//!
//! `Summarizer` implementations must be safe to call concurrently from any
//! task (`Send + Sync`, `&self` methods). The bundled providers only hold
//! immutable settings and an HTTP client that pools connections internally,
//! so they need no locking. The notifier calls its summarizer one article at
//! a time, but other callers may share the same instance.

mod gemini;
mod openai;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SummaryConfig;
use crate::{Error, Result};

pub use gemini::GeminiSummarizer;
pub use openai::OpenAiSummarizer;

/// Reduces article text to a short synopsis
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String>;
}

/// Used when summaries are turned off or no API key is configured
#[derive(Debug, Default, Clone)]
pub struct DisabledSummarizer;

#[async_trait]
impl Summarizer for DisabledSummarizer {
    async fn summarize(&self, _text: &str) -> Result<String> {
        Ok(String::new())
    }
}

pub(crate) fn truncate_chars(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

/// Article text first, instruction last
pub(crate) fn build_prompt(text: &str, prompt: &str, max_chars: usize) -> String {
    format!("{}\n{}", truncate_chars(text.trim(), max_chars), prompt)
}

/// Build the summarizer selected by configuration
///
/// A missing API key disables summaries instead of failing startup.
pub fn build_summarizer(config: &SummaryConfig) -> Result<Arc<dyn Summarizer>> {
    if !config.enabled {
        tracing::info!("Summarizer disabled by configuration");
        return Ok(Arc::new(DisabledSummarizer));
    }

    let summarizer: Arc<dyn Summarizer> = match config.provider.as_str() {
        "gemini_api" => match config.gemini_api_key {
            Some(ref key) => Arc::new(GeminiSummarizer::new(key, config)?),
            None => {
                tracing::info!("Summarizer disabled: no Gemini API key provided");
                return Ok(Arc::new(DisabledSummarizer));
            }
        },
        "openai" => match config.openai_api_key {
            Some(ref key) => Arc::new(OpenAiSummarizer::new(key, config)?),
            None => {
                tracing::info!("Summarizer disabled: no OpenAI API key provided");
                return Ok(Arc::new(DisabledSummarizer));
            }
        },
        other => {
            return Err(Error::Config(format!("Unknown summary provider: {}", other)));
        }
    };

    tracing::info!("Summarizer enabled (provider: {})", config.provider);
    Ok(summarizer)
}
