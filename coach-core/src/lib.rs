//! # coach-core
//!
//! Domain types shared by the training-assistant crates: the user profile,
//! persisted chat messages, and the [`Llm`] trait every model provider
//! implements.

pub mod chat;
pub mod error;
pub mod llm;
pub mod profile;

pub use chat::{ChatMessage, ChatTurn, Role, pair_turns};
pub use error::{CoachError, Result};
pub use llm::{Llm, LlmRequest, LlmResponse, Message};
pub use profile::{Gender, ProfileIssue, UserProfile};
