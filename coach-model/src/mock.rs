//! Scripted model for tests and offline runs.

use std::sync::Arc;

use async_trait::async_trait;
use coach_core::{CoachError, Llm, LlmRequest, LlmResponse, Result};
use tokio::sync::Mutex;

type Responder = dyn Fn(&LlmRequest) -> Result<String> + Send + Sync;

/// An [`Llm`] whose answers come from a closure.
///
/// Every request is recorded so tests can assert on the prompts that were sent.
///
/// ```rust,ignore
/// let llm = MockLlm::new("mock", |req| Ok(format!("echo: {}", req.text())));
/// ```
pub struct MockLlm {
    name: String,
    responder: Arc<Responder>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    pub fn new(
        name: impl Into<String>,
        responder: impl Fn(&LlmRequest) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self { name: name.into(), responder: Arc::new(responder), requests: Mutex::new(Vec::new()) }
    }

    /// Always answer with the same text.
    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new("mock-fixed", move |_| Ok(text.clone()))
    }

    /// Fail every call with a model error.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new("mock-failing", move |_| Err(CoachError::model("mock-failing", message.clone())))
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let text = (self.responder)(&request);
        self.requests.lock().await.push(request);
        Ok(LlmResponse { text: text? })
    }
}
