// DeepSeek chat-completions client.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::models::Recommendation;
use std::time::Duration;

use super::response::parse_recommendation;
use crate::config::AdvisorySettings;
use crate::connectors::Advisor;
use crate::error::{EngineError, Result};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}

pub struct DeepSeekAdvisor {
    http_client: reqwest::Client,
    api_key: String,
    settings: AdvisorySettings,
}

impl DeepSeekAdvisor {
    pub fn new(api_key: String, settings: AdvisorySettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(DeepSeekAdvisor { http_client, api_key, settings })
    }

    /// First choice's message text.
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let response = self
            .http_client
            .post(&self.settings.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(EngineError::AdvisoryError(format!("status {}: {}", status.as_u16(), body)));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| EngineError::AdvisoryError("response carried no choices".to_string()))
    }
}

#[async_trait]
impl Advisor for DeepSeekAdvisor {
    async fn advise(&self, context: &str) -> Result<Recommendation> {
        tracing::debug!(model = %self.settings.model, prompt_chars = context.len(), "Requesting grid levels");
        let content = self.complete(context).await?;
        let rec = parse_recommendation(&content)?;
        tracing::info!(
            buys = rec.buy_levels.len(),
            sells = rec.sell_levels.len(),
            confidence = %rec.confidence_label,
            risk = %rec.risk_label,
            "Advisor replied"
        );
        Ok(rec)
    }
}
