//! Store traits.
//!
//! A deployment keeps two tables: `chat_messages` (append-only, one row per
//! message) and `profiles` (one row per user id, replaced on save).

use async_trait::async_trait;
use coach_core::{ChatMessage, Role, UserProfile};

use crate::error::{Result, StoreError};

/// Outcome of a profile fetch.
///
/// Keeps "no such row" apart from "could not ask", which matters to callers
/// deciding whether to overwrite a profile they could not read.
#[derive(Debug)]
pub enum ProfileLookup {
    Found(UserProfile),
    NotFound,
    TransportError(StoreError),
}

impl ProfileLookup {
    /// Collapse to `Some(profile)` or `None`, treating a failed fetch as absent.
    pub fn into_option(self) -> Option<UserProfile> {
        match self {
            ProfileLookup::Found(profile) => Some(profile),
            ProfileLookup::NotFound | ProfileLookup::TransportError(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ProfileLookup::Found(_))
    }
}

/// Append-only chat history keyed by user id.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Persist one message and return the stored row.
    async fn save_message(&self, user_id: &str, role: Role, content: &str) -> Result<ChatMessage>;

    /// Every message of `user_id`, oldest first.
    async fn fetch_history(&self, user_id: &str) -> Result<Vec<ChatMessage>>;
}

/// Profiles keyed by user id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert the profile, or replace the existing one for `user_id`.
    async fn upsert_profile(&self, user_id: &str, profile: &UserProfile) -> Result<()>;

    async fn fetch_profile(&self, user_id: &str) -> ProfileLookup;
}
