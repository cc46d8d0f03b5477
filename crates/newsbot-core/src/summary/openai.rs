use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use std::time::Duration;

use async_trait::async_trait;

use super::{build_prompt, Summarizer};
use crate::config::SummaryConfig;
use crate::{Error, Result};

/// OpenAI chat-completions summarizer
pub struct OpenAiSummarizer {
    client: Client<OpenAIConfig>,
    model: String,
    prompt: String,
    max_input_chars: usize,
    /// Applies per request and also bounds the client's rate-limit retries
    timeout: Duration,
}

impl OpenAiSummarizer {
    pub fn new(api_key: &str, config: &SummaryConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        let openai_config = OpenAIConfig::new().with_api_key(api_key);

        Ok(Self {
            client: Client::with_config(openai_config).with_http_client(http_client),
            model: config.openai_model.clone(),
            prompt: config.prompt.clone(),
            max_input_chars: config.max_input_chars,
            timeout,
        })
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(build_prompt(text, &self.prompt, self.max_input_chars))
                    .build()
                    .map_err(|e| Error::Summarizer(e.to_string()))?,
            )])
            .max_tokens(300u32)
            .build()
            .map_err(|e| Error::Summarizer(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| Error::Timeout(format!("OpenAI request exceeded {}s", self.timeout.as_secs())))?
            .map_err(|e| Error::Summarizer(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }
}
