//! OpenAI chat completions client.
//!
//! This module is only available when the `openai` feature is enabled.

use async_openai::{
    Client,
    config::OpenAIConfig as AsyncOpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use coach_core::{CoachError, Llm, LlmRequest, LlmResponse, Message, Result, Role};
use tracing::{debug, error};

/// Connection settings for [`OpenAIClient`].
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model: String,
    /// Override for OpenAI-compatible endpoints.
    pub base_url: Option<String>,
    /// Temperature applied when a request does not set one.
    pub default_temperature: Option<f32>,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            default_temperature: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = Some(temperature);
        self
    }
}

/// OpenAI client for the standard API and OpenAI-compatible servers.
pub struct OpenAIClient {
    client: Client<AsyncOpenAIConfig>,
    model: String,
    default_temperature: Option<f32>,
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(CoachError::Config("OpenAI API key must not be empty".into()));
        }
        let mut openai_config = AsyncOpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Ok(Self {
            client: Client::with_config(openai_config),
            model: config.model,
            default_temperature: config.default_temperature,
        })
    }

    /// Create a client from `OPENAI_API_KEY`.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            CoachError::Config("OPENAI_API_KEY environment variable not set".into())
        })?;
        Self::new(OpenAIConfig::new(api_key, model))
    }

    fn convert(&self, message: &Message) -> Result<ChatCompletionRequestMessage> {
        let converted = match message.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(message.content.as_str())
                .build()
                .map(Into::into),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(message.content.as_str())
                .build()
                .map(Into::into),
            Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(message.content.as_str())
                .build()
                .map(Into::into),
        };
        converted.map_err(|e| CoachError::model(&self.model, format!("invalid message: {e}")))
    }
}

#[async_trait]
impl Llm for OpenAIClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let messages =
            request.messages.iter().map(|m| self.convert(m)).collect::<Result<Vec<_>>>()?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages(messages);
        if let Some(temperature) = request.temperature.or(self.default_temperature) {
            builder.temperature(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            builder.max_tokens(max_tokens);
        }
        let openai_request = builder
            .build()
            .map_err(|e| CoachError::model(&self.model, format!("failed to build request: {e}")))?;

        debug!(model = %self.model, messages = request.messages.len(), "chat completion");

        let response = self.client.chat().create(openai_request).await.map_err(|e| {
            error!(model = %self.model, error = %e, "chat completion failed");
            CoachError::model(&self.model, format!("OpenAI API error: {e}"))
        })?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CoachError::model(&self.model, "API returned no content"))?;

        Ok(LlmResponse { text })
    }
}
