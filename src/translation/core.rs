/*!
 * Core translation service implementation.
 *
 * `TranslationService` owns one provider client and turns a chunk of
 * translation items into a single model call: build the prompt, send it,
 * validate the JSON answer. Chunk scheduling lives in `batch`.
 */

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, error, info};
use parking_lot::Mutex;

use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::TranslationError;
use crate::language_utils;
use crate::model::TranslationResult;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::mock::{MockProvider, MockRequest};
use crate::providers::ollama::{ChatRequest, Ollama};
use crate::providers::openai::{OpenAI, OpenAIRequest};
use crate::providers::{Provider, RetryPolicy};
use crate::translation::batch::ScopeOptions;
use crate::translation::items::TranslationItem;
use crate::translation::prompts::{parse_response, TranslationPromptBuilder};

/// Translates one chunk of items in a single request.
///
/// The orchestrator only depends on this trait, so tests can count or script
/// calls without a provider.
#[async_trait]
pub trait ChunkTranslator: Send + Sync {
    async fn translate_chunk(
        &self,
        items: &[TranslationItem],
        options: &ScopeOptions,
    ) -> Result<Vec<TranslationResult>, TranslationError>;

    /// Fail fast when the provider cannot possibly authenticate
    fn check_credentials(&self) -> Result<(), TranslationError> {
        Ok(())
    }
}

/// Request and token statistics for one service
#[derive(Debug, Clone, Default)]
pub struct UsageStats {
    pub requests: u64,
    pub failed_requests: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// Total time spent waiting for the provider
    pub api_duration: Duration,
}

impl UsageStats {
    pub fn add_token_usage(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>) {
        self.prompt_tokens += prompt_tokens.unwrap_or(0);
        self.completion_tokens += completion_tokens.unwrap_or(0);
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn summary(&self) -> String {
        format!(
            "{} requests ({} failed), {} prompt + {} completion tokens, {:.1}s in API calls",
            self.requests,
            self.failed_requests,
            self.prompt_tokens,
            self.completion_tokens,
            self.api_duration.as_secs_f64()
        )
    }
}

/// Translation provider implementation variants
#[derive(Debug)]
enum TranslationProviderImpl {
    Ollama { client: Ollama },
    OpenAI { client: OpenAI },
    /// LM Studio local server (OpenAI-compatible)
    LMStudio { client: OpenAI },
    Anthropic { client: Anthropic },
    Mock { client: MockProvider },
}

/// Raw model output with token counts
struct Completion {
    text: String,
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

/// Main translation service for slide text
#[derive(Debug)]
pub struct TranslationService {
    provider: TranslationProviderImpl,
    /// Configuration for the translation service
    pub config: TranslationConfig,
    usage: Mutex<UsageStats>,
}

impl TranslationService {
    /// Create a new translation service with the given configuration
    pub fn new(config: TranslationConfig) -> Result<Self> {
        let retry = RetryPolicy::new(config.common.retry_count, config.common.retry_backoff_ms);
        let rate_limit = config.get_rate_limit();
        let timeout = config.get_timeout_secs();
        let endpoint = config.get_endpoint();
        url::Url::parse(&endpoint)
            .or_else(|_| url::Url::parse(&format!("http://{}", endpoint)))
            .map_err(|e| anyhow!("Invalid endpoint '{}': {}", endpoint, e))?;

        let provider = match config.provider {
            ConfigTranslationProvider::Ollama => TranslationProviderImpl::Ollama {
                client: Ollama::new_with_config(&endpoint, retry, rate_limit, timeout),
            },
            ConfigTranslationProvider::OpenAI => TranslationProviderImpl::OpenAI {
                client: OpenAI::new_with_config(config.get_api_key(), endpoint, retry, rate_limit, timeout),
            },
            ConfigTranslationProvider::LMStudio => {
                // LM Studio accepts any key
                let api_key = Some(config.get_api_key())
                    .filter(|k| !k.is_empty())
                    .unwrap_or_else(|| "lm-studio".to_string());
                TranslationProviderImpl::LMStudio {
                    client: OpenAI::new_with_config(api_key, endpoint, retry, rate_limit, timeout),
                }
            }
            ConfigTranslationProvider::Anthropic => TranslationProviderImpl::Anthropic {
                client: Anthropic::new_with_config(config.get_api_key(), endpoint, retry, rate_limit, timeout),
            },
        };

        Ok(Self {
            provider,
            config,
            usage: Mutex::new(UsageStats::default()),
        })
    }

    /// Service backed by a mock provider
    pub fn with_mock(client: MockProvider) -> Self {
        Self {
            provider: TranslationProviderImpl::Mock { client },
            config: TranslationConfig::default(),
            usage: Mutex::new(UsageStats::default()),
        }
    }

    fn provider_name(&self) -> &'static str {
        match &self.provider {
            TranslationProviderImpl::Ollama { .. } => "Ollama",
            TranslationProviderImpl::OpenAI { .. } => "OpenAI",
            TranslationProviderImpl::LMStudio { .. } => "LM Studio",
            TranslationProviderImpl::Anthropic { .. } => "Anthropic",
            TranslationProviderImpl::Mock { .. } => "Mock",
        }
    }

    /// Snapshot of the usage statistics so far
    pub fn usage(&self) -> UsageStats {
        self.usage.lock().clone()
    }

    /// Test the connection to the translation provider
    pub async fn test_connection(&self) -> Result<()> {
        info!(
            "Testing connection to {} with model {}",
            self.provider_name(),
            self.config.get_model()
        );
        let result = match &self.provider {
            TranslationProviderImpl::Ollama { client } => client.test_connection().await,
            TranslationProviderImpl::OpenAI { client } | TranslationProviderImpl::LMStudio { client } => {
                client.test_connection().await
            }
            TranslationProviderImpl::Anthropic { client } => client.test_connection().await,
            TranslationProviderImpl::Mock { client } => client.test_connection().await,
        };
        result.map_err(|e| anyhow!("Failed to connect to {}: {}", self.provider_name(), e))
    }

    async fn complete(
        &self,
        system_prompt: String,
        user_prompt: String,
        options: &ScopeOptions,
    ) -> Result<Completion, TranslationError> {
        let model = self.config.get_model();
        let temperature = self.config.common.temperature;
        let max_tokens = self.config.common.max_tokens;

        match &self.provider {
            TranslationProviderImpl::Ollama { client } => {
                let request = ChatRequest::new(model)
                    .add_message("system", system_prompt)
                    .add_message("user", user_prompt)
                    .temperature(temperature)
                    .json_format();
                let response = client.complete(request).await?;
                Ok(Completion {
                    text: Ollama::extract_text(&response),
                    prompt_tokens: response.prompt_eval_count,
                    completion_tokens: response.eval_count,
                })
            }
            TranslationProviderImpl::OpenAI { client } | TranslationProviderImpl::LMStudio { client } => {
                let mut request = OpenAIRequest::new(model)
                    .add_message("system", system_prompt)
                    .add_message("user", user_prompt)
                    .temperature(temperature)
                    .max_tokens(max_tokens);
                if matches!(self.provider, TranslationProviderImpl::OpenAI { .. }) {
                    request = request.json_response();
                }
                let response = client.complete(request).await?;
                let usage = response.usage.as_ref();
                Ok(Completion {
                    text: OpenAI::extract_text(&response),
                    prompt_tokens: usage.map(|u| u64::from(u.prompt_tokens)),
                    completion_tokens: usage.map(|u| u64::from(u.completion_tokens)),
                })
            }
            TranslationProviderImpl::Anthropic { client } => {
                let request = AnthropicRequest::new(model, max_tokens)
                    .system(system_prompt)
                    .add_message("user", user_prompt)
                    .temperature(temperature);
                let response = client.complete(request).await?;
                Ok(Completion {
                    text: Anthropic::extract_text(&response),
                    prompt_tokens: Some(u64::from(response.usage.input_tokens)),
                    completion_tokens: Some(u64::from(response.usage.output_tokens)),
                })
            }
            TranslationProviderImpl::Mock { client } => {
                let request = MockRequest {
                    system_prompt,
                    user_prompt,
                    source_language: options.source_language.clone(),
                    target_language: options.target_language.clone(),
                };
                let response = client.complete(request).await?;
                Ok(Completion {
                    text: MockProvider::extract_text(&response),
                    prompt_tokens: response.prompt_tokens,
                    completion_tokens: response.completion_tokens,
                })
            }
        }
    }
}

/// Display name for the prompt, falling back to the raw code
fn prompt_language(code: &str) -> String {
    language_utils::get_language_name(code).unwrap_or_else(|_| code.to_string())
}

#[async_trait]
impl ChunkTranslator for TranslationService {
    async fn translate_chunk(
        &self,
        items: &[TranslationItem],
        options: &ScopeOptions,
    ) -> Result<Vec<TranslationResult>, TranslationError> {
        let (system_prompt, user_prompt) = TranslationPromptBuilder::new(
            &prompt_language(&options.source_language),
            &prompt_language(&options.target_language),
        )
        .with_items(items)
        .with_glossary(&options.glossary)
        .with_fit_to_length(options.fit_to_length)
        .build();

        debug!(
            "{} request: {} items, {} prompt chars",
            self.provider_name(),
            items.len(),
            user_prompt.chars().count()
        );

        let start = Instant::now();
        let outcome = self.complete(system_prompt, user_prompt, options).await;
        let elapsed = start.elapsed();

        let completion = {
            let mut usage = self.usage.lock();
            usage.requests += 1;
            usage.api_duration += elapsed;
            match outcome {
                Ok(completion) => {
                    usage.add_token_usage(completion.prompt_tokens, completion.completion_tokens);
                    completion
                }
                Err(e) => {
                    usage.failed_requests += 1;
                    drop(usage);
                    error!("{} translation error: {}", self.provider_name(), e);
                    return Err(e);
                }
            }
        };

        parse_response(&completion.text, items)
    }

    fn check_credentials(&self) -> Result<(), TranslationError> {
        let provider = self.config.provider;
        let needs_key = matches!(
            self.provider,
            TranslationProviderImpl::OpenAI { .. } | TranslationProviderImpl::Anthropic { .. }
        );
        if needs_key && self.config.get_api_key().trim().is_empty() {
            return Err(TranslationError::MissingCredential(format!(
                "{} requires an API key",
                provider.display_name()
            )));
        }
        Ok(())
    }
}
