//! Supabase backend over the PostgREST HTTP API.
//!
//! Tables: `chat_messages (id, user_id, role, content, created_at default now())`
//! and `profiles (id, genero, edad, estatura, peso, lesion, lesion_descripcion)`.
//! The profile columns keep the names and gender labels the tables were
//! created with; [`ProfileRow`] maps them onto [`UserProfile`].
//!
//! This module is only available when the `supabase` feature is enabled.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coach_core::{ChatMessage, Gender, Role, UserProfile};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{Result, StoreError};
use crate::store::{ChatStore, ProfileLookup, ProfileStore};

const BACKEND: &str = "Supabase";
const MESSAGES_TABLE: &str = "chat_messages";
const PROFILES_TABLE: &str = "profiles";

/// A [`ChatStore`] and [`ProfileStore`] backed by a Supabase project.
///
/// ```rust,ignore
/// let store = SupabaseStore::new(std::env::var("SUPABASE_URL")?, std::env::var("SUPABASE_KEY")?)?;
/// store.save_message("user-1", Role::User, "hola").await?;
/// ```
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
}

impl SupabaseStore {
    /// Create a store for the project at `url` using API key `key`.
    pub fn new(url: impl Into<String>, key: impl AsRef<str>) -> Result<Self> {
        let url = url.into();
        let key = key.as_ref();
        if url.is_empty() || key.is_empty() {
            return Err(StoreError::Config("Supabase URL and key must not be empty".into()));
        }

        let mut headers = HeaderMap::new();
        let apikey = HeaderValue::from_str(key)
            .map_err(|e| StoreError::Config(format!("invalid Supabase key: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|e| StoreError::Config(format!("invalid Supabase key: {e}")))?;
        headers.insert("apikey", apikey);
        headers.insert(reqwest::header::AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url: url.trim_end_matches('/').to_string() })
    }

    /// Create a store from `SUPABASE_URL` and `SUPABASE_KEY`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| StoreError::Config("SUPABASE_URL environment variable not set".into()))?;
        let key = std::env::var("SUPABASE_KEY")
            .map_err(|_| StoreError::Config("SUPABASE_KEY environment variable not set".into()))?;
        Self::new(url, key)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|e| {
            error!(backend = BACKEND, operation = what, error = %e, "request failed");
            StoreError::Transport { backend: BACKEND.into(), message: format!("{what}: {e}") }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(backend = BACKEND, operation = what, %status, "request rejected");
            return Err(StoreError::Backend {
                backend: BACKEND.into(),
                status: status.as_u16(),
                message: format!("{what}: {body}"),
            });
        }
        Ok(response)
    }
}

fn decode_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Decode { backend: BACKEND.into(), message: e.to_string() }
}

// ── wire types ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct NewMessage<'a> {
    id: String,
    user_id: &'a str,
    role: Role,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessageRow {
    id: String,
    user_id: String,
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        ChatMessage {
            id: row.id,
            user_id: row.user_id,
            role: row.role,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

/// A row of the `profiles` table.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ProfileRow {
    pub id: String,
    #[serde(default)]
    pub genero: Option<String>,
    #[serde(default)]
    pub edad: Option<u32>,
    #[serde(default)]
    pub estatura: Option<u32>,
    #[serde(default)]
    pub peso: Option<u32>,
    #[serde(default)]
    pub lesion: bool,
    #[serde(default)]
    pub lesion_descripcion: Option<String>,
}

fn gender_label(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "Masculino",
        Gender::Female => "Femenino",
        Gender::Other => "Otro",
    }
}

fn parse_gender(label: &str) -> Option<Gender> {
    match label.trim() {
        "Masculino" => Some(Gender::Male),
        "Femenino" => Some(Gender::Female),
        "Otro" => Some(Gender::Other),
        other => other.parse().ok(),
    }
}

impl ProfileRow {
    pub fn new(user_id: &str, profile: &UserProfile) -> Self {
        Self {
            id: user_id.to_string(),
            genero: profile.gender.map(|g| gender_label(g).to_string()),
            edad: profile.age,
            estatura: profile.height,
            peso: profile.weight,
            lesion: profile.injury,
            lesion_descripcion: Some(profile.injury_description.clone()),
        }
    }

    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            gender: self.genero.as_deref().and_then(parse_gender),
            age: self.edad,
            height: self.estatura,
            weight: self.peso,
            injury: self.lesion,
            injury_description: self.lesion_descripcion.unwrap_or_default(),
        }
    }
}

/// Read a profile from a PostgREST body that may be an array of rows, a
/// single row object, or `null`.
fn profile_from_body(body: Value) -> Result<Option<UserProfile>> {
    let row = match body {
        Value::Null => return Ok(None),
        Value::Array(mut rows) => {
            if rows.len() > 1 {
                warn!(backend = BACKEND, rows = rows.len(), "several profiles share one id");
            }
            if rows.is_empty() {
                return Ok(None);
            }
            rows.swap_remove(0)
        }
        object @ Value::Object(_) => object,
        other => return Err(decode_err(format!("unexpected profile body: {other}"))),
    };
    let row: ProfileRow = serde_json::from_value(row).map_err(decode_err)?;
    Ok(Some(row.into_profile()))
}

// ── trait implementations ──────────────────────────────────────────

#[async_trait]
impl ChatStore for SupabaseStore {
    async fn save_message(&self, user_id: &str, role: Role, content: &str) -> Result<ChatMessage> {
        let row = NewMessage { id: uuid::Uuid::new_v4().to_string(), user_id, role, content };
        let request = self
            .client
            .post(self.table_url(MESSAGES_TABLE))
            .header("Prefer", "return=representation")
            .json(&row);
        let response = self.send(request, "save_message").await?;

        let mut rows: Vec<MessageRow> = response.json().await.map_err(decode_err)?;
        if rows.is_empty() {
            return Err(decode_err("insert returned no row"));
        }
        debug!(user_id, %role, "saved message");
        Ok(rows.swap_remove(0).into())
    }

    async fn fetch_history(&self, user_id: &str) -> Result<Vec<ChatMessage>> {
        let request = self.client.get(self.table_url(MESSAGES_TABLE)).query(&[
            ("select", "id,user_id,role,content,created_at".to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("order", "created_at.asc".to_string()),
        ]);
        let response = self.send(request, "fetch_history").await?;
        let rows: Vec<MessageRow> = response.json().await.map_err(decode_err)?;
        debug!(user_id, messages = rows.len(), "fetched history");
        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }
}

#[async_trait]
impl ProfileStore for SupabaseStore {
    async fn upsert_profile(&self, user_id: &str, profile: &UserProfile) -> Result<()> {
        let request = self
            .client
            .post(self.table_url(PROFILES_TABLE))
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&ProfileRow::new(user_id, profile));
        self.send(request, "upsert_profile").await?;
        debug!(user_id, "upserted profile");
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> ProfileLookup {
        let request = self
            .client
            .get(self.table_url(PROFILES_TABLE))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{user_id}"))]);

        let body = match self.send(request, "fetch_profile").await {
            Ok(response) => response.json::<Value>().await.map_err(decode_err),
            Err(e) => Err(e),
        };
        match body.and_then(profile_from_body) {
            Ok(Some(profile)) => ProfileLookup::Found(profile),
            Ok(None) => ProfileLookup::NotFound,
            Err(e) => {
                warn!(user_id, error = %e, "profile fetch failed");
                ProfileLookup::TransportError(e)
            }
        }
    }
}
