/*!
 * Mock provider implementations for testing.
 *
 * The mock speaks the same JSON schema as the real models: it parses the
 * request out of the user prompt and answers with one translated run per
 * requested run. Behaviours simulate the failure modes the orchestrator has
 * to survive:
 * - `MockProvider::working()` - Always succeeds
 * - `MockProvider::partial()` - Drops the last run of every item
 * - `MockProvider::malformed()` - Answers with prose instead of JSON
 * - `MockProvider::failing()` - Always fails with an error
 */

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::ProviderError;
use crate::model::{RunText, TranslationResult};
use crate::providers::Provider;
use crate::translation::prompts::{TranslationRequest, TranslationResponse};

/// Mock request for testing
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub system_prompt: String,
    /// JSON request produced by the prompt builder
    pub user_prompt: String,
    pub source_language: String,
    pub target_language: String,
}

/// Mock response for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// The raw model output
    pub text: String,
    /// Simulated prompt tokens
    pub prompt_tokens: Option<u64>,
    /// Simulated completion tokens
    pub completion_tokens: Option<u64>,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns text that is not JSON
    Malformed,
    /// Returns empty response
    Empty,
    /// Simulates slow response
    Slow { delay_ms: u64 },
    /// Valid JSON, but the last run of every item is missing
    Partial,
}

type RunTransform = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;
type RequestHook = Arc<dyn Fn(usize) + Send + Sync>;

/// Mock provider for testing translation behavior
#[derive(Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    /// Shared between clones
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<MockRequest>>>,
    /// Maps (target language, run text) to the translated run
    transform: RunTransform,
    custom_response: Option<fn(&MockRequest) -> String>,
    on_request: Option<RequestHook>,
}

impl fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockProvider")
            .field("behavior", &self.behavior)
            .field("request_count", &self.request_count())
            .finish()
    }
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            transform: Arc::new(|target, text| format!("[{}] {}", target, text)),
            custom_response: None,
            on_request: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn malformed() -> Self {
        Self::new(MockBehavior::Malformed)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    pub fn partial() -> Self {
        Self::new(MockBehavior::Partial)
    }

    /// Replace the per-run translation, called with (target language, run text)
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        self.transform = Arc::new(transform);
        self
    }

    /// Return this text verbatim instead of building a JSON answer
    pub fn with_custom_response(mut self, generator: fn(&MockRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Call `hook` with the zero-based request number before answering
    pub fn with_request_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.on_request = Some(Arc::new(hook));
        self
    }

    /// Number of requests received so far, across clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }

    /// Build the JSON answer for a request, optionally dropping the last run
    /// of each item
    fn answer(&self, request: &MockRequest, drop_last_run: bool) -> Result<String, ProviderError> {
        let parsed: TranslationRequest = serde_json::from_str(&request.user_prompt)
            .map_err(|e| ProviderError::ParseError(format!("mock could not read request: {}", e)))?;

        let items = parsed
            .items
            .into_iter()
            .map(|item| {
                let mut runs = item.runs;
                if drop_last_run {
                    runs.pop();
                }
                TranslationResult {
                    paragraph_id: item.paragraph_id,
                    translated_runs: runs
                        .into_iter()
                        .map(|run| RunText {
                            index: run.index,
                            text: (self.transform)(&request.target_language, &run.text),
                        })
                        .collect(),
                }
            })
            .collect();

        serde_json::to_string(&TranslationResponse { items })
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    fn respond(&self, text: String, request: &MockRequest) -> MockResponse {
        MockResponse {
            prompt_tokens: Some((request.system_prompt.len() + request.user_prompt.len()) as u64 / 4),
            completion_tokens: Some(text.len() as u64 / 4),
            text,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        if let Some(hook) = &self.on_request {
            hook(count);
        }

        if let Some(generator) = self.custom_response {
            return Ok(self.respond(generator(&request), &request));
        }

        match self.behavior {
            MockBehavior::Working => {
                let text = self.answer(&request, false)?;
                Ok(self.respond(text, &request))
            }

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    let text = self.answer(&request, false)?;
                    Ok(self.respond(text, &request))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Malformed => Ok(self.respond(
                "Sure! Here are your translated slides.".to_string(),
                &request,
            )),

            MockBehavior::Empty => Ok(self.respond(String::new(), &request)),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                let text = self.answer(&request, false)?;
                Ok(self.respond(text, &request))
            }

            MockBehavior::Partial => {
                let text = self.answer(&request, true)?;
                Ok(self.respond(text, &request))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("mock is offline".to_string())),
            _ => Ok(()),
        }
    }

    fn extract_text(response: &Self::Response) -> String {
        response.text.clone()
    }
}
