//! Conversational retrieval chain.
//!
//! One call of [`RetrievalChain::invoke`]:
//!
//! 1. with prior turns, asks the model to rewrite the question as a
//!    standalone question; without history the question is used as-is
//! 2. retrieves the `top_k` chunks most similar to the standalone question
//! 3. renders the prompt template with the joined chunk texts, the question
//!    and the user profile
//! 4. sends the rendered prompt to the model and returns its text
//!
//! Retrieved sources are not returned. Every failure propagates.

use std::sync::Arc;

use coach_core::{ChatTurn, Llm, LlmRequest, UserProfile};
use tracing::{debug, error};

use crate::error::Result;
use crate::pipeline::RagPipeline;
use crate::prompt::PromptTemplate;

const CONDENSE_QUESTION_PROMPT: &str = "Given the following conversation and a follow up \
question, rephrase the follow up question to be a standalone question, in its original language.";

fn format_history(history: &[ChatTurn]) -> String {
    history
        .iter()
        .map(|turn| format!("Human: {}\nAssistant: {}", turn.user, turn.assistant))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Answers questions from a persisted index, personalised by a user profile.
pub struct RetrievalChain {
    pipeline: Arc<RagPipeline>,
    collection: String,
    llm: Arc<dyn Llm>,
    prompt: PromptTemplate,
    temperature: f32,
}

impl RetrievalChain {
    pub fn new(
        pipeline: Arc<RagPipeline>,
        collection: impl Into<String>,
        llm: Arc<dyn Llm>,
        prompt: PromptTemplate,
    ) -> Self {
        Self { pipeline, collection: collection.into(), llm, prompt, temperature: 0.0 }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn prompt_version(&self) -> &str {
        self.prompt.version()
    }

    /// Produce an answer for `question` given earlier `history` and `profile`.
    pub async fn invoke(
        &self,
        question: &str,
        history: &[ChatTurn],
        profile: &UserProfile,
    ) -> Result<String> {
        let standalone = if history.is_empty() {
            question.to_string()
        } else {
            self.condense_question(question, history).await?
        };

        let results = self.pipeline.query(&self.collection, &standalone).await?;
        let context =
            results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n");
        debug!(retrieved = results.len(), prompt_version = self.prompt.version(), "retrieved context");

        let prompt = self.prompt.render(&context, &standalone, profile)?;
        let request = LlmRequest::prompt(prompt).with_temperature(self.temperature);
        let response = self.llm.generate(request).await.inspect_err(|e| {
            error!(model = self.llm.name(), error = %e, "answer generation failed");
        })?;
        Ok(response.text)
    }

    async fn condense_question(&self, question: &str, history: &[ChatTurn]) -> Result<String> {
        let prompt = format!(
            "{CONDENSE_QUESTION_PROMPT}\n\nChat History:\n{}\nFollow Up Input: {question}\nStandalone question:",
            format_history(history)
        );
        let request = LlmRequest::prompt(prompt).with_temperature(self.temperature);
        let response = self.llm.generate(request).await.inspect_err(|e| {
            error!(model = self.llm.name(), error = %e, "question condensing failed");
        })?;
        let standalone = response.text.trim().to_string();
        debug!(%standalone, "condensed question");
        Ok(standalone)
    }
}
