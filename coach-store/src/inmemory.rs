//! In-memory store for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use coach_core::{ChatMessage, Role, UserProfile};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::store::{ChatStore, ProfileLookup, ProfileStore};

const BACKEND: &str = "InMemory";

/// Chat history and profiles held in process memory.
///
/// [`set_unreachable`](Self::set_unreachable) makes every call fail with a
/// transport error, which lets callers exercise their degraded paths.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    messages: RwLock<Vec<ChatMessage>>,
    profiles: RwLock<HashMap<String, UserProfile>>,
    unreachable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Transport {
                backend: BACKEND.to_string(),
                message: "store marked unreachable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatStore for InMemoryStore {
    async fn save_message(&self, user_id: &str, role: Role, content: &str) -> Result<ChatMessage> {
        self.check_reachable()?;
        let message = ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.messages.write().await.push(message.clone());
        debug!(user_id, %role, "saved message");
        Ok(message)
    }

    async fn fetch_history(&self, user_id: &str) -> Result<Vec<ChatMessage>> {
        self.check_reachable()?;
        let mut history: Vec<ChatMessage> =
            self.messages.read().await.iter().filter(|m| m.user_id == user_id).cloned().collect();
        // Stable: equal timestamps keep insertion order.
        history.sort_by_key(|m| m.created_at);
        Ok(history)
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn upsert_profile(&self, user_id: &str, profile: &UserProfile) -> Result<()> {
        self.check_reachable()?;
        self.profiles.write().await.insert(user_id.to_string(), profile.clone());
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> ProfileLookup {
        if let Err(e) = self.check_reachable() {
            return ProfileLookup::TransportError(e);
        }
        match self.profiles.read().await.get(user_id) {
            Some(profile) => ProfileLookup::Found(profile.clone()),
            None => ProfileLookup::NotFound,
        }
    }
}
