/// LLM Client: the single point of entry for all text-generation calls.
///
/// ARCHITECTURAL RULE: No other module may call a chat-completions endpoint directly.
/// Everything goes through a `TokenSource`, so tests can swap in scripted backends.
///
/// Two backends are wired: a fast drafting model (Cerebras) and a stronger
/// reasoning model (OpenRouter). Both speak the OpenAI-compatible API.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

pub mod sse;

use sse::decode_fragments;

const TEMPERATURE: f32 = 0.7;
const COMPLETE_TIMEOUT: Duration = Duration::from_secs(60);
const STREAM_TIMEOUT: Duration = Duration::from_secs(120);
const OPENROUTER_TITLE: &str = "LinkedIn Profile Analyzer";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Stream error: {0}")]
    Stream(String),
}

/// A lazy sequence of generated text fragments. Nothing is sent upstream
/// until the stream is first polled.
pub type FragmentStream = BoxStream<'static, Result<String, LlmError>>;

/// Which configured backend a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Low-latency drafting model.
    Fast,
    /// Slower model used for refinement, job matching and strategy.
    Reasoning,
}

/// One generation call: system prompt, user prompt and a token budget.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub backend: BackendKind,
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(
        backend: BackendKind,
        system: impl Into<String>,
        prompt: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            backend,
            system: system.into(),
            prompt: prompt.into(),
            max_tokens,
        }
    }
}

/// An opaque async text source. Implement this to swap backends without
/// touching the analysis code.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Awaits the whole generated text.
    async fn complete(&self, request: &GenerationRequest) -> Result<String, LlmError>;

    /// Opens an incremental fragment stream.
    async fn stream(&self, request: &GenerationRequest) -> Result<FragmentStream, LlmError>;
}

/// The pair of backends every analysis runs against.
#[derive(Clone)]
pub struct Backends {
    fast: Arc<dyn TokenSource>,
    reasoning: Arc<dyn TokenSource>,
}

impl Backends {
    pub fn new(fast: Arc<dyn TokenSource>, reasoning: Arc<dyn TokenSource>) -> Self {
        Self { fast, reasoning }
    }

    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        Ok(Self::new(
            Arc::new(ChatCompletionsClient::cerebras(config)?),
            Arc::new(ChatCompletionsClient::openrouter(config)?),
        ))
    }

    pub fn source(&self, kind: BackendKind) -> Arc<dyn TokenSource> {
        match kind {
            BackendKind::Fast => Arc::clone(&self.fast),
            BackendKind::Reasoning => Arc::clone(&self.reasoning),
        }
    }

    pub async fn complete(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        self.source(request.backend).complete(request).await
    }

    /// Returns a stream that opens the upstream request on first poll, so
    /// pipelines can be built eagerly and scheduled later.
    pub fn stream_lazy(&self, request: GenerationRequest) -> FragmentStream {
        let source = self.source(request.backend);
        futures::stream::once(async move { source.stream(&request).await })
            .try_flatten()
            .boxed()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible chat-completions client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// A chat-completions backend. Model identity and headers are the only
/// difference between the Cerebras and OpenRouter flavors.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    client: Client,
    name: &'static str,
    api_url: String,
    api_key: String,
    model: String,
    extra_headers: Vec<(&'static str, String)>,
}

impl ChatCompletionsClient {
    pub fn cerebras(config: &Config) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().build()?,
            name: "cerebras",
            api_url: config.cerebras_api_url.clone(),
            api_key: config.cerebras_api_key.clone(),
            model: config.cerebras_model.clone(),
            extra_headers: Vec::new(),
        })
    }

    pub fn openrouter(config: &Config) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().build()?,
            name: "openrouter",
            api_url: config.openrouter_api_url.clone(),
            api_key: config.openrouter_api_key.clone(),
            model: config.openrouter_model.clone(),
            extra_headers: vec![
                ("HTTP-Referer", config.openrouter_referer.clone()),
                ("X-Title", OPENROUTER_TITLE.to_string()),
            ],
        })
    }

    fn build(&self, request: &GenerationRequest, stream: bool) -> RequestBuilder {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: request.max_tokens,
            stream: stream.then_some(true),
        };

        let mut builder = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .timeout(if stream { STREAM_TIMEOUT } else { COMPLETE_TIMEOUT })
            .json(&body);
        for (name, value) in &self.extra_headers {
            builder = builder.header(*name, value);
        }
        builder
    }

    async fn check_status(&self, response: Response) -> Result<Response, LlmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("{} API returned {}: {}", self.name, status, body);
        let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        Err(LlmError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl TokenSource for ChatCompletionsClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let response = self.build(request, false).send().await?;
        let response = self.check_status(response).await?;
        let body: ChatResponse = serde_json::from_slice(&response.bytes().await?)?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyContent)?;

        debug!(
            "{} completion succeeded: max_tokens={}, chars={}",
            self.name,
            request.max_tokens,
            text.len()
        );
        Ok(text)
    }

    async fn stream(&self, request: &GenerationRequest) -> Result<FragmentStream, LlmError> {
        let response = self.build(request, true).send().await?;
        let response = self.check_status(response).await?;
        debug!("{} stream opened (model: {})", self.name, self.model);

        let bytes = response.bytes_stream().map_err(LlmError::from).boxed();
        Ok(decode_fragments(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedSource;

    fn request(kind: BackendKind) -> GenerationRequest {
        GenerationRequest::new(kind, "system", "prompt", 10)
    }

    #[test]
    fn test_chat_request_omits_stream_flag_for_whole_text_calls() {
        let body = ChatRequest {
            model: "m",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "s",
                },
                ChatMessage {
                    role: "user",
                    content: "u",
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: 300,
            stream: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("stream").is_none());
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 300);
    }

    #[tokio::test]
    async fn test_backends_route_by_kind() {
        let fast = Arc::new(ScriptedSource::new().respond("system", "from fast"));
        let reasoning = Arc::new(ScriptedSource::new().respond("system", "from reasoning"));
        let backends = Backends::new(fast, reasoning);

        let a = backends.complete(&request(BackendKind::Fast)).await.unwrap();
        let b = backends
            .complete(&request(BackendKind::Reasoning))
            .await
            .unwrap();
        assert_eq!(a, "from fast");
        assert_eq!(b, "from reasoning");
    }

    #[tokio::test]
    async fn test_stream_lazy_does_not_call_until_polled() {
        let source = Arc::new(ScriptedSource::new().respond("system", "a b"));
        let backends = Backends::new(source.clone(), source.clone());

        let stream = backends.stream_lazy(request(BackendKind::Fast));
        assert!(source.calls().is_empty());

        let fragments: Vec<String> = stream.try_collect().await.unwrap();
        assert_eq!(fragments.concat(), "a b");
        assert_eq!(source.calls().len(), 1);
    }
}
