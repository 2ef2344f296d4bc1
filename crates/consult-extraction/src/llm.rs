use async_trait::async_trait;
use tracing::{debug, warn};

use consult_core::error::ConsultError;

/// A single chat message sent to the LLM collaborator.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user", content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system", content: content.into() }
    }
}

/// Collaborator boundary for the chat LLM used by extraction (§6). Retries
/// on 429/5xx, timeouts, and connection errors are the implementation's
/// responsibility; other HTTP errors fail permanently.
#[async_trait]
pub trait ChatLlm: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, ConsultError>;
}

/// Default HTTP-backed implementation speaking the OpenAI chat-completions
/// wire format, used for both the configured chat LLM and any
/// OpenAI-compatible self-hosted endpoint.
pub struct HttpChatLlm {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_retries: u32,
}

impl HttpChatLlm {
    pub fn new(api_key: String, base_url: String, model: String, max_retries: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
            max_retries,
        }
    }

    async fn send_once(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, ConsultError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages.iter().map(|m| serde_json::json!({
                "role": m.role,
                "content": m.content,
            })).collect::<Vec<_>>(),
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ConsultError::CollaboratorUnavailable(e.to_string()))?;

        let status = resp.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(ConsultError::CollaboratorUnavailable(format!(
                "chat LLM returned retryable status {status}"
            )));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ConsultError::CollaboratorUnavailable(format!(
                "chat LLM error {status}: {text}"
            )));
        }

        let parsed: ApiResponse = resp
            .json()
            .await
            .map_err(|e| ConsultError::CollaboratorUnavailable(e.to_string()))?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl ChatLlm for HttpChatLlm {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, ConsultError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(messages, temperature, max_tokens).await {
                Ok(text) => return Ok(text),
                Err(ConsultError::CollaboratorUnavailable(msg)) if attempt <= self.max_retries => {
                    warn!(attempt, %msg, "retrying chat LLM call");
                    continue;
                }
                Err(e) => {
                    debug!(attempt, "chat LLM call failed permanently");
                    return Err(e);
                }
            }
        }
    }
}

#[derive(serde::Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(serde::Deserialize)]
struct Choice {
    message: ApiMessage,
}

#[derive(serde::Deserialize)]
struct ApiMessage {
    content: Option<String>,
}
