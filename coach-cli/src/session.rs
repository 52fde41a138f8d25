//! Per-user conversation state.
//!
//! A [`SessionContext`] is loaded once when a user shows up, handed to every
//! handler that needs it, and written back through the store as it changes.
//! [`SessionManager`] keeps the live contexts of the HTTP server.

use std::collections::HashMap;
use std::sync::Arc;

use coach_core::{ChatMessage, Role, UserProfile, pair_turns};
use coach_rag::RetrievalChain;
use coach_store::{ChatStore, ProfileLookup, ProfileStore};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, SessionError};

/// Profile and chat persistence behind one handle.
pub trait CoachStore: ChatStore + ProfileStore {}

impl<T: ChatStore + ProfileStore + ?Sized> CoachStore for T {}

/// Which view the user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    EditProfile,
    Chat,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionContext {
    pub user_id: String,
    pub profile: UserProfile,
    pub history: Vec<ChatMessage>,
    pub active_tab: Tab,
}

impl SessionContext {
    /// Start a session for `user_id`, or for a fresh id when none is given.
    ///
    /// The stored profile is used when there is one. A profile fetch that
    /// fails in transport is logged and the session starts with an empty
    /// profile. Every session opens on the profile editor.
    pub async fn load(store: &dyn CoachStore, user_id: Option<String>) -> Result<Self> {
        let user_id = user_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let profile = match store.fetch_profile(&user_id).await {
            ProfileLookup::Found(profile) => profile,
            ProfileLookup::NotFound => UserProfile::default(),
            ProfileLookup::TransportError(e) => {
                warn!(%user_id, error = %e, "profile unavailable, starting with an empty one");
                UserProfile::default()
            }
        };
        let history = store.fetch_history(&user_id).await?;
        debug!(%user_id, messages = history.len(), "session loaded");

        Ok(Self { user_id, profile, history, active_tab: Tab::EditProfile })
    }

    /// Validate and persist an edited profile, then move to the chat.
    ///
    /// On validation failure nothing changes and every issue is returned.
    pub async fn save_profile(&mut self, store: &dyn CoachStore, profile: UserProfile) -> Result<()> {
        let issues = profile.validate();
        if !issues.is_empty() {
            return Err(SessionError::InvalidProfile(issues));
        }
        store.upsert_profile(&self.user_id, &profile).await?;
        self.profile = profile;
        self.active_tab = Tab::Chat;
        info!(user_id = %self.user_id, "profile saved");
        Ok(())
    }

    /// Answer one user message.
    ///
    /// The user message is persisted before the chain runs and stays in the
    /// history if it fails; the answer is persisted only on success.
    pub async fn ask(
        &mut self,
        store: &dyn CoachStore,
        chain: &RetrievalChain,
        question: &str,
    ) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let turns = pair_turns(&self.history);
        let asked = store.save_message(&self.user_id, Role::User, question).await?;
        self.history.push(asked);

        let answer = chain.invoke(question, &turns, &self.profile).await?;

        let answered = store.save_message(&self.user_id, Role::Assistant, &answer).await?;
        self.history.push(answered);
        Ok(answer)
    }
}

/// Live sessions keyed by user id.
#[derive(Debug, Default, Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<SessionContext>>>>>,
}

impl SessionManager {
    /// Load a session and register it. An already-live session for the same
    /// user is returned as is.
    pub async fn open(
        &self,
        store: &dyn CoachStore,
        user_id: Option<String>,
    ) -> Result<Arc<Mutex<SessionContext>>> {
        if let Some(id) = &user_id {
            if let Some(existing) = self.get(id).await {
                return Ok(existing);
            }
        }

        let context = SessionContext::load(store, user_id).await?;
        let user_id = context.user_id.clone();
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(context)))
            .clone();
        Ok(session)
    }

    pub async fn get(&self, user_id: &str) -> Option<Arc<Mutex<SessionContext>>> {
        self.sessions.read().await.get(user_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
