//! External AI completion provider.
//!
//! Opaque from the service's point of view: a call either succeeds with
//! text (or audio bytes) or fails. Provider failures are their own error
//! channel and never feed back into quota decisions.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config;

#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Text completion for chat, prompt and decode actions.
    async fn complete(&self, turns: &[ChatTurn]) -> anyhow::Result<String>;

    /// Synthesized speech audio for voice responses.
    async fn synthesize(&self, text: &str) -> anyhow::Result<Vec<u8>>;
}

/// key: completion-http -> chat-completions + speech wire calls
pub struct HttpCompletionProvider {
    base: String,
    api_key: Option<String>,
    model: String,
    speech_model: String,
    voice: String,
    client: Client,
}

impl HttpCompletionProvider {
    pub fn from_env() -> Self {
        Self::new(
            config::COMPLETION_API_BASE.as_str(),
            config::COMPLETION_API_KEY.clone(),
            config::COMPLETION_MODEL.as_str(),
            config::COMPLETION_SPEECH_MODEL.as_str(),
            config::COMPLETION_VOICE.as_str(),
            *config::COMPLETION_TIMEOUT_SECS,
        )
    }

    pub fn new(
        base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        speech_model: impl Into<String>,
        voice: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            speech_model: speech_model.into(),
            voice: voice.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .expect("client build"),
        }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base, path);
        let mut req = self.client.post(&url);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
}

#[async_trait]
impl CompletionProvider for HttpCompletionProvider {
    async fn complete(&self, turns: &[ChatTurn]) -> anyhow::Result<String> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: turns,
        };
        let response = self
            .request("/v1/chat/completions")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatCompletionResponse>()
            .await?;
        let text = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("completion response had no choices"))?;
        Ok(text)
    }

    async fn synthesize(&self, text: &str) -> anyhow::Result<Vec<u8>> {
        let body = SpeechRequest {
            model: &self.speech_model,
            voice: &self.voice,
            input: text,
        };
        let bytes = self
            .request("/v1/audio/speech")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}
