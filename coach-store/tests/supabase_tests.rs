//! SupabaseStore against a stub PostgREST server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use coach_core::{Gender, Role, UserProfile};
use coach_store::{ChatStore, ProfileLookup, ProfileStore, StoreError, SupabaseStore};
use serde_json::{Value, json};

const KEY: &str = "test-anon-key";

#[derive(Clone, Default)]
struct Stub {
    messages: Arc<Mutex<Vec<Value>>>,
    profiles: Arc<Mutex<HashMap<String, Value>>>,
    prefer_headers: Arc<Mutex<Vec<String>>>,
}

fn authorised(headers: &HeaderMap) -> bool {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    let bearer = headers.get("authorization").and_then(|v| v.to_str().ok());
    apikey == Some(KEY) && bearer == Some(&format!("Bearer {KEY}"))
}

fn eq_filter(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params.get(key).and_then(|v| v.strip_prefix("eq.")).map(str::to_string)
}

async fn insert_message(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(mut row): Json<Value>,
) -> impl IntoResponse {
    if !authorised(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "no api key"})));
    }
    let mut messages = stub.messages.lock().unwrap();
    // Deterministic, strictly increasing timestamps.
    let created_at = Utc::now() + Duration::milliseconds(messages.len() as i64);
    row["created_at"] = json!(created_at.to_rfc3339());
    messages.push(row.clone());
    (StatusCode::CREATED, Json(json!([row])))
}

async fn list_messages(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if !authorised(&headers) || params.get("order").map(String::as_str) != Some("created_at.asc") {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "bad request"})));
    }
    let user_id = eq_filter(&params, "user_id");
    let rows: Vec<Value> = stub
        .messages
        .lock()
        .unwrap()
        .iter()
        .filter(|row| row["user_id"].as_str() == user_id.as_deref())
        .cloned()
        .collect();
    (StatusCode::OK, Json(Value::Array(rows)))
}

async fn upsert_profile(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    Json(row): Json<Value>,
) -> impl IntoResponse {
    if !authorised(&headers) || params.get("on_conflict").map(String::as_str) != Some("id") {
        return StatusCode::BAD_REQUEST;
    }
    if let Some(prefer) = headers.get("prefer").and_then(|v| v.to_str().ok()) {
        stub.prefer_headers.lock().unwrap().push(prefer.to_string());
    }
    let id = row["id"].as_str().unwrap_or_default().to_string();
    stub.profiles.lock().unwrap().insert(id, row);
    StatusCode::CREATED
}

async fn get_profile(
    State(stub): State<Stub>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let id = eq_filter(&params, "id").unwrap_or_default();
    match id.as_str() {
        // Shapes other PostgREST clients and versions return.
        "object-shape" => Json(json!({"id": "object-shape", "genero": "Otro", "edad": 50, "lesion": false}))
            .into_response(),
        "null-shape" => Json(Value::Null).into_response(),
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => {
            let rows: Vec<Value> =
                stub.profiles.lock().unwrap().get(&id).cloned().into_iter().collect();
            Json(Value::Array(rows)).into_response()
        }
    }
}

async fn spawn_stub() -> (String, Stub, tokio::task::JoinHandle<()>) {
    let stub = Stub::default();
    let app = Router::new()
        .route("/rest/v1/chat_messages", get(list_messages).post(insert_message))
        .route("/rest/v1/profiles", get(get_profile).post(upsert_profile))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });
    (format!("http://{addr}"), stub, handle)
}

#[tokio::test]
async fn messages_round_trip_in_order() {
    let (base, _stub, handle) = spawn_stub().await;
    let store = SupabaseStore::new(base, KEY).unwrap();

    store.save_message("u1", Role::User, "What is a deload week?").await.unwrap();
    store.save_message("u2", Role::User, "unrelated").await.unwrap();
    let saved = store.save_message("u1", Role::Assistant, "A lighter week.").await.unwrap();
    assert_eq!(saved.user_id, "u1");
    assert_eq!(saved.role, Role::Assistant);

    let history = store.fetch_history("u1").await.unwrap();
    let roles: Vec<_> = history.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
    assert_eq!(history[1].content, "A lighter week.");
    assert!(history[0].created_at < history[1].created_at);

    handle.abort();
}

#[tokio::test]
async fn profile_upsert_then_fetch() {
    let (base, stub, handle) = spawn_stub().await;
    let store = SupabaseStore::new(format!("{base}/"), KEY).unwrap();

    assert!(matches!(store.fetch_profile("u1").await, ProfileLookup::NotFound));

    let profile = UserProfile {
        gender: Some(Gender::Female),
        age: Some(34),
        height: Some(168),
        weight: Some(59),
        injury: true,
        injury_description: "right shoulder".into(),
    };
    store.upsert_profile("u1", &profile).await.unwrap();
    store.upsert_profile("u1", &UserProfile { age: Some(35), ..profile.clone() }).await.unwrap();

    match store.fetch_profile("u1").await {
        ProfileLookup::Found(found) => {
            assert_eq!(found.age, Some(35));
            assert_eq!(found.gender, Some(Gender::Female));
            assert_eq!(found.injury_description, "right shoulder");
        }
        other => panic!("expected profile, got {other:?}"),
    }

    let stored = stub.profiles.lock().unwrap().get("u1").cloned().unwrap();
    assert_eq!(stored["genero"], "Femenino");
    assert!(stub.prefer_headers.lock().unwrap()[0].contains("resolution=merge-duplicates"));

    handle.abort();
}

#[tokio::test]
async fn alternative_profile_shapes_are_accepted() {
    let (base, _stub, handle) = spawn_stub().await;
    let store = SupabaseStore::new(base, KEY).unwrap();

    let found = store.fetch_profile("object-shape").await.into_option().unwrap();
    assert_eq!(found.gender, Some(Gender::Other));
    assert_eq!(found.age, Some(50));
    assert!(matches!(store.fetch_profile("null-shape").await, ProfileLookup::NotFound));
    assert!(matches!(
        store.fetch_profile("broken").await,
        ProfileLookup::TransportError(StoreError::Backend { status: 500, .. })
    ));

    handle.abort();
}

#[tokio::test]
async fn wrong_key_is_a_backend_error() {
    let (base, _stub, handle) = spawn_stub().await;
    let store = SupabaseStore::new(base, "wrong").unwrap();
    let err = store.save_message("u1", Role::User, "hi").await.unwrap_err();
    assert!(matches!(err, StoreError::Backend { status: 401, .. }), "{err}");
    handle.abort();
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = SupabaseStore::new(format!("http://{addr}"), KEY).unwrap();
    let lookup = store.fetch_profile("u1").await;
    assert!(matches!(lookup, ProfileLookup::TransportError(StoreError::Transport { .. })));
    assert_eq!(lookup.into_option(), None);
    assert!(matches!(
        store.fetch_history("u1").await,
        Err(StoreError::Transport { .. })
    ));
}
