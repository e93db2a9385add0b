use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AiConfig;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("No API credential configured")]
    MissingCredential,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Completion service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Completion service returned no content")]
    EmptyResponse,
    #[error("Completion timed out after {0:?}")]
    Timeout(Duration),
    #[error("No JSON object found in reply")]
    NoJson,
    #[error("Malformed JSON in reply: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("Reply rejected: {0}")]
    UnexpectedShape(String),
    #[error("Completion unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// Message history for a completion call.
///
/// Owned by whoever drives the conversation; nothing in this crate keeps
/// one alive between calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system(content: impl Into<String>) -> Self {
        let mut c = Self::new();
        c.push(Role::System, content);
        c
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(ChatTurn { role, content: content.into() });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Abstraction over a chat-completion service.
pub trait CompletionBackend: Send + Sync {
    fn complete(
        &self,
        conversation: &Conversation,
    ) -> impl Future<Output = Result<String, AiError>> + Send;
}

// ── Groq (OpenAI-compatible) backend ──────────────────────────────────────────

pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
    config: AiConfig,
}

impl GroqClient {
    pub fn new(config: AiConfig) -> Result<Self, AiError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AiError::MissingCredential)?;
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { http, api_key, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageOut,
}

#[derive(Deserialize)]
struct MessageOut {
    content: Option<String>,
}

impl CompletionBackend for GroqClient {
    async fn complete(&self, conversation: &Conversation) -> Result<String, AiError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: conversation.turns(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: 1.0,
            stream: false,
        };

        let resp = self
            .http
            .post(self.endpoint())
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Status { status: status.as_u16(), body });
        }

        let out: ChatResponse = resp.json().await?;
        out.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(AiError::EmptyResponse)
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a preset reply or a preset failure, and counts calls.
pub struct MockCompletion {
    reply: Result<String, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockCompletion {
    pub fn reply(text: impl Into<String>) -> Self {
        Self { reply: Ok(text.into()), delay: None, calls: AtomicUsize::new(0) }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self { reply: Err(message.into()), delay: None, calls: AtomicUsize::new(0) }
    }

    /// Sleep before answering, to exercise caller-side timeouts.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompletionBackend for MockCompletion {
    async fn complete(&self, _conversation: &Conversation) -> Result<String, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone().map_err(AiError::Unavailable)
    }
}
