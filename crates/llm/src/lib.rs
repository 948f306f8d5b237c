//! Provider abstraction the engine talks to for completions, streaming, and
//! subagent spawning.
//!
//! The engine never depends on a concrete vendor. Everything upstream of
//! this crate programs against the [`Provider`] trait; this crate supplies
//! the trait, the request/response types that cross it, and one HTTP-backed
//! implementation for a chat-completions-shaped API. Swapping vendors means
//! adding another `Provider` impl here, not touching callers.
//!
//! Every error that crosses this boundary is redacted with [`utils::redact_str`]
//! before it reaches logs, activity events, or checkpoints — provider error
//! bodies routinely echo back the request, headers included.

pub mod config;
pub mod error;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

pub use config::ProviderConfig;
pub use error::{LlmError, Result};

/// System prompt size limit, enforced by [`Request::validate`].
pub const MAX_SYSTEM_BYTES: usize = 100 * 1024;
/// Per-message content size limit, enforced by [`Request::validate`].
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A completion request. `system` and per-message `content` carry size caps
/// that `validate` enforces before the request leaves the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub system: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Request {
    pub fn new(system: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            system: system.into(),
            messages,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Check size caps. Called by providers before dispatch, and by callers
    /// that build requests outside the provided constructors.
    pub fn validate(&self) -> Result<()> {
        if self.system.len() > MAX_SYSTEM_BYTES {
            return Err(LlmError::Validation(format!(
                "system prompt exceeds {MAX_SYSTEM_BYTES} bytes"
            )));
        }
        for message in &self.messages {
            if message.content.len() > MAX_MESSAGE_BYTES {
                return Err(LlmError::Validation(format!(
                    "message content exceeds {MAX_MESSAGE_BYTES} bytes"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub input_tokens: u32,
    pub output_tokens: u32,
    #[serde(default)]
    pub cache_creation_input_tokens: u32,
    #[serde(default)]
    pub cache_read_input_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub content: String,
    pub usage: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub delta: String,
    pub done: bool,
}

/// Extra knobs for a spawned subagent call, layered on top of the provider's
/// own defaults.
#[derive(Debug, Clone, Default)]
pub struct SubagentOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// The single seam between the engine and any language model backend.
///
/// `stream` has a default implementation that reports the provider doesn't
/// support it; a provider that does override it. `spawn_subagent` defaults
/// to framing the role and task as a one-shot `complete` call; a provider
/// with a dedicated subagent API (separate context window, cheaper model
/// tier) overrides this instead.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn complete(&self, request: Request) -> Result<Response>;

    async fn stream(&self, request: Request) -> Result<BoxStream<'static, Result<StreamChunk>>> {
        let _ = request;
        Err(LlmError::Validation(
            "provider does not support streaming".to_string(),
        ))
    }

    async fn spawn_subagent(
        &self,
        role: &str,
        task: &str,
        options: SubagentOptions,
    ) -> Result<Response> {
        let mut request = Request::new(
            format!("You are acting as the {role} subagent."),
            vec![Message::user(task)],
        );
        request.validate()?;
        let _ = options;
        self.complete(request).await
    }

    /// Identifier used in logs and activity events, e.g. `"flagship-1"`.
    fn name(&self) -> &str;
}

#[derive(Serialize)]
struct ChatCompletionsBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

#[derive(Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<ChatCompletionsChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ChatCompletionsChoice {
    message: WireResponseMessage,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    content: String,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Provider implementation for any chat-completions-shaped HTTP API (the
/// request/response envelope shared by most hosted chat APIs): a system
/// message, a flat message list, and a `choices[0].message.content` reply.
pub struct HttpProvider {
    config: ProviderConfig,
    client: utils::HttpClient,
}

impl HttpProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client_config = utils::ClientConfig::new()
            .with_timeout(config.timeout)
            .with_max_retries(config.max_retries)
            .with_user_agent("orchestration-engine/llm");

        let client = utils::HttpClient::new(client_config)
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn complete(&self, request: Request) -> Result<Response> {
        request.validate()?;

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let mut wire_messages = vec![WireMessage {
            role: "system",
            content: &request.system,
        }];
        wire_messages.extend(
            request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: role_str(m.role),
                    content: &m.content,
                }),
        );

        let body = ChatCompletionsBody {
            model: &self.config.model,
            messages: wire_messages,
            max_tokens: None,
            temperature: None,
        };

        let req = self
            .client
            .client()
            .post(&url)
            .bearer_auth(self.config.api_key.as_deref().unwrap_or_default())
            .json(&body)
            .timeout(self.config.timeout);

        // Routes through the client's exponential-backoff retry loop rather
        // than `send()` directly, so a transient 5xx/timeout is retried
        // (base 1s, multiplier 2, capped by the client's own retry_delay
        // growth) instead of surfacing on the first attempt.
        let response = self.client.send_with_retry(req).await.map_err(|e| match e {
            utils::UtilsError::HttpError(err) => LlmError::Transport(err),
            other => LlmError::UpstreamError {
                status: None,
                message: other.to_string(),
            },
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::AuthenticationFailed(utils::redact_str(&text)));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::RateLimited {
                message: utils::redact_str(&text),
                retry_after_ms,
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::UpstreamError {
                status: Some(status.as_u16()),
                message: utils::redact_str(&text),
            });
        }

        let parsed: ChatCompletionsResponse = response.json().await?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Validation("provider returned no choices".to_string()))?;
        let usage = parsed.usage.map(|u| UsageMetadata {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            cache_creation_input_tokens: 0,
            cache_read_input_tokens: 0,
        });

        Ok(Response {
            content: choice.message.content,
            usage,
        })
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_roundtrips() {
        let request = Request::new("be terse", vec![Message::user("hello")]);
        assert_eq!(request.system, "be terse");
        assert_eq!(request.messages.len(), 1);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn validate_rejects_oversized_system() {
        let request = Request::new("x".repeat(MAX_SYSTEM_BYTES + 1), vec![]);
        let err = request.validate().unwrap_err();
        assert!(matches!(err, LlmError::Validation(_)));
    }

    #[test]
    fn validate_rejects_oversized_message() {
        let request = Request::new(
            "sys",
            vec![Message::user("x".repeat(MAX_MESSAGE_BYTES + 1))],
        );
        let err = request.validate().unwrap_err();
        assert!(matches!(err, LlmError::Validation(_)));
    }

    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        async fn complete(&self, request: Request) -> Result<Response> {
            request.validate()?;
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(Response {
                content: last,
                usage: None,
            })
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn spawn_subagent_default_frames_role_and_task() {
        let provider = EchoProvider;
        let response = provider
            .spawn_subagent("reviewer", "check this diff", SubagentOptions::default())
            .await
            .unwrap();
        assert_eq!(response.content, "check this diff");
    }

    #[tokio::test]
    async fn stream_default_is_unsupported() {
        let provider = EchoProvider;
        let err = provider
            .stream(Request::new("sys", vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Validation(_)));
    }

    #[tokio::test]
    async fn complete_retries_past_a_transient_503() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "recovered"}}],
                "usage": {"prompt_tokens": 3, "completion_tokens": 2},
            })))
            .mount(&mock_server)
            .await;

        let config = ProviderConfig::new(mock_server.uri(), "flagship-1")
            .with_api_key("test-key")
            .with_max_retries(2);
        let provider = HttpProvider::new(config).unwrap();

        let response = provider
            .complete(Request::new("be terse", vec![Message::user("hi")]))
            .await
            .unwrap();
        assert_eq!(response.content, "recovered");
    }

    #[tokio::test]
    async fn complete_gives_up_after_max_retries() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let config = ProviderConfig::new(mock_server.uri(), "flagship-1")
            .with_api_key("test-key")
            .with_max_retries(1);
        let provider = HttpProvider::new(config).unwrap();

        let err = provider
            .complete(Request::new("be terse", vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::UpstreamError { status: Some(503), .. }));
    }
}
