//! # coach-model
//!
//! [`Llm`](coach_core::Llm) implementations:
//!
//! - [`OpenAIClient`] - OpenAI chat completions (`gpt-4o`, `gpt-3.5-turbo`, ...)
//! - [`MockLlm`] - closure-driven model for tests and offline runs
//!
//! ```rust,ignore
//! use coach_model::openai::{OpenAIClient, OpenAIConfig};
//!
//! let model = OpenAIClient::new(
//!     OpenAIConfig::new(std::env::var("OPENAI_API_KEY")?, "gpt-4o").with_temperature(0.0),
//! )?;
//! ```

pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;

pub use mock::MockLlm;
#[cfg(feature = "openai")]
pub use openai::{OpenAIClient, OpenAIConfig};
