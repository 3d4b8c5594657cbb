use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::{
    config::ProviderConfig,
    errors::{AppError, AppResult},
    models::domain::usage::TokenUsage,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: String,
    pub content: String,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<LlmMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: f32,
    pub json_mode: bool,
    /// Overrides the provider's configured chat model.
    pub model: Option<String>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<LlmMessage>) -> Self {
        Self {
            messages,
            max_tokens: None,
            temperature: 0.7,
            json_mode: false,
            model: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StreamChunk {
    Content(String),
    Usage(TokenUsage),
    Done,
}

pub type ChunkReceiver = mpsc::Receiver<AppResult<StreamChunk>>;

/// OpenAI-compatible provider seam; mocked in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider_name(&self) -> String;
    fn default_model(&self) -> String;
    async fn complete(&self, request: CompletionRequest) -> AppResult<Completion>;
    async fn stream_chat(&self, request: CompletionRequest) -> AppResult<ChunkReceiver>;
    /// Returns the generated image as base64.
    async fn generate_image(&self, prompt: &str) -> AppResult<String>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionBody {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChoiceBody>,
    #[serde(default)]
    usage: Option<UsageBody>,
}

#[derive(Debug, Deserialize)]
struct ChoiceBody {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageBody {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl From<UsageBody> for TokenUsage {
    fn from(body: UsageBody) -> Self {
        TokenUsage {
            prompt_tokens: body.prompt_tokens,
            completion_tokens: body.completion_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImageBody {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    #[serde(default)]
    b64_json: Option<String>,
}

pub struct OpenAiCompatibleClient {
    client: Client,
    name: String,
    base_url: String,
    api_key: SecretString,
    chat_model: String,
    image_model: String,
}

impl OpenAiCompatibleClient {
    pub fn new(provider: &ProviderConfig, timeout_secs: u64) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            name: provider.name.clone(),
            base_url: provider.base_url.trim_end_matches('/').to_string(),
            api_key: provider.api_key.clone(),
            chat_model: provider.chat_model.clone(),
            image_model: provider.image_model.clone(),
        })
    }

    fn chat_body(&self, request: &CompletionRequest, stream: bool) -> Value {
        let model = request.model.as_deref().unwrap_or(&self.chat_model);
        let mut body = json!({
            "model": model,
            "messages": request.messages,
            "temperature": request.temperature,
            "stream": stream,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if request.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }
        if stream {
            body["stream_options"] = json!({ "include_usage": true });
        }
        body
    }

    async fn post(&self, path: &str, body: &Value) -> AppResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("POST {} via provider '{}'", url, self.name);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(provider_status_error(&self.name, status, &text))
    }
}

fn provider_status_error(provider: &str, status: StatusCode, body: &str) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::ProviderError(format!(
            "Authentication with provider '{}' failed ({}). Check the API key.",
            provider, status
        )),
        _ => AppError::ProviderError(format!(
            "Provider '{}' returned {}: {}",
            provider,
            status,
            body.chars().take(500).collect::<String>()
        )),
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn provider_name(&self) -> String {
        self.name.clone()
    }

    fn default_model(&self) -> String {
        self.chat_model.clone()
    }

    async fn complete(&self, request: CompletionRequest) -> AppResult<Completion> {
        let body = self.chat_body(&request, false);
        let response = self.post("/chat/completions", &body).await?;

        let parsed: ChatCompletionBody = response
            .json()
            .await
            .map_err(|e| AppError::ProviderError(format!("Malformed provider response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                AppError::ProviderError(format!("Provider '{}' returned empty content", self.name))
            })?;

        Ok(Completion {
            content,
            model: parsed
                .model
                .unwrap_or_else(|| request.model.unwrap_or_else(|| self.chat_model.clone())),
            usage: parsed.usage.map(TokenUsage::from).unwrap_or_default(),
        })
    }

    async fn stream_chat(&self, request: CompletionRequest) -> AppResult<ChunkReceiver> {
        let body = self.chat_body(&request, true);
        let response = self.post("/chat/completions", &body).await?;

        let (tx, rx) = mpsc::channel(32);
        let provider = self.name.clone();

        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = SseBuffer::default();

            while let Some(chunk_result) = stream.next().await {
                match chunk_result {
                    Ok(bytes) => {
                        for event in buffer.push(&bytes) {
                            for chunk in parse_sse_event(&event) {
                                let done = chunk == StreamChunk::Done;
                                if tx.send(Ok(chunk)).await.is_err() || done {
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx
                            .send(Err(AppError::ProviderError(format!("Stream error: {}", e))))
                            .await;
                        return;
                    }
                }
            }

            let _ = tx
                .send(Err(AppError::ProviderError(format!(
                    "Stream from provider '{}' ended before completion",
                    provider
                ))))
                .await;
        });

        Ok(rx)
    }

    async fn generate_image(&self, prompt: &str) -> AppResult<String> {
        let body = json!({
            "model": self.image_model,
            "prompt": prompt,
            "n": 1,
            "size": "1024x1024",
            "response_format": "b64_json",
        });
        let response = self.post("/images/generations", &body).await?;

        let parsed: ImageBody = response
            .json()
            .await
            .map_err(|e| AppError::ProviderError(format!("Malformed image response: {}", e)))?;

        parsed
            .data
            .into_iter()
            .find_map(|d| d.b64_json)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| AppError::ProviderError("Image response contained no data".to_string()))
    }
}

/// Accumulates raw stream bytes and hands out complete `\n\n`-terminated
/// events. Text is decoded per event, so a character split across network
/// chunks stays intact.
#[derive(Debug, Default)]
pub struct SseBuffer {
    pending: Vec<u8>,
}

impl SseBuffer {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.pending.windows(2).position(|w| w == b"\n\n") {
            let event: Vec<u8> = self.pending.drain(..pos + 2).collect();
            events.push(String::from_utf8_lossy(&event[..pos]).into_owned());
        }
        events
    }
}

/// Parse one Server-Sent Events block into zero or more chunks.
pub fn parse_sse_event(event: &str) -> Vec<StreamChunk> {
    let mut chunks = Vec::new();

    for line in event.lines() {
        let Some(data) = line.trim().strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();

        if data == "[DONE]" {
            chunks.push(StreamChunk::Done);
            continue;
        }

        let Ok(json) = serde_json::from_str::<Value>(data) else {
            continue;
        };
        let choice = json.get("choices").and_then(|c| c.get(0));

        if let Some(content) = choice
            .and_then(|c| c.get("delta"))
            .and_then(|d| d.get("content"))
            .and_then(|c| c.as_str())
        {
            if !content.is_empty() {
                chunks.push(StreamChunk::Content(content.to_string()));
            }
        }

        if let Some(usage) = json.get("usage").filter(|u| !u.is_null()) {
            if let Ok(u) = serde_json::from_value::<UsageBody>(usage.clone()) {
                chunks.push(StreamChunk::Usage(u.into()));
            }
        }
    }

    chunks
}
