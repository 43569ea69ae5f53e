//! Chat-completions client implementing the alignment oracle.

use std::time::Duration;

use async_trait::async_trait;
use certcheck_core::{
    AlignmentOracle, Certificate, CertificateType, OracleError, OracleResponse, Specification,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::prompt::{SYSTEM_PROMPT, build_user_prompt};
use crate::retry::{RetryPolicy, Transient};

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("completion has no message content")]
    EmptyContent,
}

impl Transient for ChatError {
    /// Timeouts, connection failures, rate limiting and server-side errors.
    fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Server { status, .. } => *status == 429 || *status >= 500,
            Self::Json(_) | Self::EmptyContent => false,
        }
    }
}

impl From<ChatError> for OracleError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::Http(e) => OracleError::Transport(e.to_string()),
            ChatError::Server { status, body } => OracleError::Server { status, body },
            ChatError::Json(e) => OracleError::Malformed(e.to_string()),
            ChatError::EmptyContent => OracleError::Malformed("empty completion".to_string()),
        }
    }
}

/// Connection and sampling settings for [`ChatOracle`].
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// API root, e.g. `https://api.openai.com/v1`; `/chat/completions` is appended.
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-request timeout; the engine applies its own overall bound on top.
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o".to_string(),
            temperature: 0.0,
            max_tokens: 4096,
            request_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: [Message<'a>; 2],
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the first choice's message text from a chat-completions body.
fn parse_completion(body: &str) -> Result<String, ChatError> {
    let resp: ChatResponse = serde_json::from_str(body)?;
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ChatError::EmptyContent)
}

/// Alignment oracle that asks an OpenAI-compatible chat model.
pub struct ChatOracle {
    client: reqwest::Client,
    base_url: String,
    config: OracleConfig,
}

impl ChatOracle {
    pub fn new(config: OracleConfig) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request<'a>(&'a self, user_prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            messages: [
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: user_prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }

    /// One chat-completions round trip, no retries.
    async fn complete(&self, user_prompt: &str, attempt: u32) -> Result<String, ChatError> {
        let url = self.endpoint();
        debug!(url = %url, model = %self.config.model, attempt, "sending alignment request");

        let mut req = self.client.post(&url).json(&self.request(user_prompt));
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChatError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        parse_completion(&body)
    }
}

#[async_trait]
impl AlignmentOracle for ChatOracle {
    async fn align(
        &self,
        specification: &Specification,
        certificate: &Certificate,
        certificate_type: CertificateType,
    ) -> Result<OracleResponse, OracleError> {
        let user_prompt = build_user_prompt(specification, certificate, certificate_type)
            .map_err(ChatError::from)?;
        let prompt = user_prompt.as_str();

        let text = self
            .config
            .retry
            .run(move |attempt| self.complete(prompt, attempt))
            .await?;
        info!(
            model = %self.config.model,
            chars = text.len(),
            "alignment response received"
        );
        OracleResponse::from_json(&text)
    }
}
