/*!
 * Ollama chat API client.
 *
 * Requests are sent non-streaming with `format: "json"`. Some Ollama builds
 * still answer with a JSONL stream; those responses are folded back into a
 * single chat response.
 */

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::providers::{http_client, request_error, status_error, Provider, RateLimiter, RetryPolicy};

const DEFAULT_PORT: u16 = 11434;

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    retry: RetryPolicy,
    limiter: RateLimiter,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// Model parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Chat request for the Ollama API
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
    /// Format to return a response in
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    stream: bool,
}

/// Chat response from the Ollama API
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: String,
    pub message: ChatMessage,
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(default)]
    pub eval_count: Option<u64>,
}

impl ChatRequest {
    /// Create a new non-streaming chat request
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            options: None,
            format: None,
            stream: false,
        }
    }

    /// Add a message to the conversation
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(ChatOptions::default).temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.get_or_insert_with(ChatOptions::default).num_predict = Some(max_tokens);
        self
    }

    /// Constrain the output to valid JSON
    pub fn json_format(mut self) -> Self {
        self.format = Some("json".to_string());
        self
    }
}

/// Turn `host`, `host:port` or a full URL into a base URL with scheme and port
pub fn normalize_base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.is_empty() {
        return format!("http://localhost:{}", DEFAULT_PORT);
    }
    let (scheme, rest) = match endpoint.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("http", endpoint),
    };
    let authority = rest.split('/').next().unwrap_or(rest);
    if authority.contains(':') {
        format!("{}://{}", scheme, rest)
    } else {
        format!("{}://{}:{}", scheme, rest, DEFAULT_PORT)
    }
}

/// Fold a JSONL stream of chat chunks into one response
fn fold_stream(body: &str) -> Option<ChatResponse> {
    let chunks: Vec<serde_json::Value> = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();
    let last = chunks.last()?;

    let content: String = chunks
        .iter()
        .filter_map(|chunk| chunk.pointer("/message/content").and_then(|v| v.as_str()))
        .collect();

    Some(ChatResponse {
        model: last.get("model").and_then(|v| v.as_str()).unwrap_or("unknown").to_string(),
        message: ChatMessage {
            role: "assistant".to_string(),
            content,
        },
        done: last.get("done").and_then(|v| v.as_bool()).unwrap_or(false),
        prompt_eval_count: last.get("prompt_eval_count").and_then(|v| v.as_u64()),
        eval_count: last.get("eval_count").and_then(|v| v.as_u64()),
    })
}

impl Ollama {
    /// Create a new client with default retry settings
    pub fn new(endpoint: &str) -> Self {
        Self::new_with_config(endpoint, RetryPolicy::default(), None, 120)
    }

    /// Create a new client with explicit retry, rate limit and timeout
    pub fn new_with_config(
        endpoint: &str,
        retry: RetryPolicy,
        rate_limit: Option<u32>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            base_url: normalize_base_url(endpoint),
            client: http_client(timeout_secs),
            retry,
            limiter: RateLimiter::new(rate_limit),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.limiter.acquire().await;
        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| request_error("Ollama", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| request_error("Ollama", e))?;
        if !status.is_success() {
            error!("Ollama API error ({}): {}", status, body);
            return Err(status_error(status, body));
        }

        match serde_json::from_str::<ChatResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(e) => fold_stream(&body).ok_or_else(|| {
                error!(
                    "Failed to parse Ollama API response: {}. Raw response (first 500 chars): {}",
                    e,
                    body.chars().take(500).collect::<String>()
                );
                ProviderError::ParseError(format!("Ollama response: {}", e))
            }),
        }
    }

    /// Get the Ollama server version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| request_error("Ollama", e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response.text().await.unwrap_or_default()));
        }
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Ollama version: {}", e)))?;
        value["version"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}

#[async_trait]
impl Provider for Ollama {
    type Request = ChatRequest;
    type Response = ChatResponse;

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        debug!("Sending Ollama chat request for model {}", request.model);
        let request = &request;
        self.retry.run("Ollama", move || self.send_once(request)).await
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let version = self.version().await?;
        debug!("Connected to Ollama {}", version);
        Ok(())
    }

    fn extract_text(response: &ChatResponse) -> String {
        response.message.content.clone()
    }
}
