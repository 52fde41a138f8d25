//! HTTP front end: session and chat JSON API plus the experiment dashboard.
//!
//! Sessions live in a [`SessionManager`]; profile validation failures map to
//! `422` with the list of issues, store and model failures to `502`.

use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post, put},
};
use coach_core::{ProfileIssue, UserProfile};
use coach_rag::RetrievalChain;
use coach_tracking::{DashboardRow, Experiment, Run, TrackingStore, dashboard_rows, eval_experiments};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::SessionError;
use crate::session::{CoachStore, SessionContext, SessionManager};

const DASHBOARD_TEMPLATE: &str = include_str!("../templates/dashboard.hbs");

static DASHBOARD: LazyLock<Handlebars<'static>> = LazyLock::new(|| {
    let mut registry = Handlebars::new();
    registry
        .register_template_string("dashboard", DASHBOARD_TEMPLATE)
        .expect("dashboard template is valid");
    registry
});

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub store: Arc<dyn CoachStore>,
    pub tracking: Arc<dyn TrackingStore>,
    pub chain: Arc<RetrievalChain>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CoachStore>,
        tracking: Arc<dyn TrackingStore>,
        chain: Arc<RetrievalChain>,
    ) -> Self {
        Self { sessions: SessionManager::default(), store, tracking, chain }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8501 }
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{user_id}", get(get_session))
        .route("/api/sessions/{user_id}/profile", put(update_profile))
        .route("/api/sessions/{user_id}/chat", post(chat))
        .route("/api/experiments", get(list_experiments))
        .route("/api/experiments/{name}/runs", get(list_runs))
        .route("/dashboard", get(dashboard))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for coach server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("coach listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (status, Json(json!({ "error": message.to_string() })))
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match &e {
            SessionError::InvalidProfile(issues) => invalid_profile(issues),
            SessionError::EmptyMessage => api_error(StatusCode::BAD_REQUEST, &e),
            SessionError::Store(_) | SessionError::Chain(_) => {
                error!(error = %e, "request failed");
                api_error(StatusCode::BAD_GATEWAY, &e)
            }
        }
    }
}

fn invalid_profile(issues: &[ProfileIssue]) -> ApiError {
    let messages: Vec<String> = issues.iter().map(ToString::to_string).collect();
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": "invalid profile", "issues": issues, "messages": messages })),
    )
}

fn tracking_error(e: coach_tracking::TrackingError) -> ApiError {
    error!(error = %e, "tracking store request failed");
    api_error(StatusCode::BAD_GATEWAY, e)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"ok","service":"coach"}))
}

#[derive(Debug, Default, Deserialize)]
struct CreateSessionQuery {
    user_id: Option<String>,
}

async fn create_session(
    State(state): State<AppState>,
    Query(query): Query<CreateSessionQuery>,
) -> ApiResult<SessionContext> {
    let user_id = query.user_id.filter(|id| !id.trim().is_empty());
    let session = state.sessions.open(state.store.as_ref(), user_id).await?;
    let context = session.lock().await.clone();
    Ok(Json(context))
}

async fn session_or_404(
    state: &AppState,
    user_id: &str,
) -> Result<Arc<tokio::sync::Mutex<SessionContext>>, ApiError> {
    state
        .sessions
        .get(user_id)
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("no session for '{user_id}'")))
}

async fn get_session(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<SessionContext> {
    let session = session_or_404(&state, &user_id).await?;
    let context = session.lock().await.clone();
    Ok(Json(context))
}

async fn update_profile(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(profile): Json<UserProfile>,
) -> ApiResult<SessionContext> {
    let session = session_or_404(&state, &user_id).await?;
    let mut context = session.lock().await;
    context.save_profile(state.store.as_ref(), profile).await?;
    Ok(Json(context.clone()))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
}

async fn chat(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    let session = session_or_404(&state, &user_id).await?;
    let mut context = session.lock().await;
    let answer = context.ask(state.store.as_ref(), &state.chain, &request.message).await?;
    Ok(Json(ChatResponse { answer }))
}

async fn list_experiments(State(state): State<AppState>) -> ApiResult<Vec<Experiment>> {
    let experiments = state.tracking.list_experiments().await.map_err(tracking_error)?;
    Ok(Json(experiments))
}

async fn list_runs(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Vec<Run>> {
    let experiment = state
        .tracking
        .find_experiment(&name)
        .await
        .map_err(tracking_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("no experiment named '{name}'")))?;
    let runs =
        state.tracking.search_runs(&experiment.experiment_id).await.map_err(tracking_error)?;
    Ok(Json(runs))
}

#[derive(Debug, Default, Deserialize)]
struct DashboardQuery {
    experiment: Option<String>,
}

#[derive(Serialize)]
struct ExperimentOption {
    name: String,
    selected: bool,
}

#[derive(Serialize)]
struct DashboardPage {
    experiments: Vec<ExperimentOption>,
    selected: Option<String>,
    rows: Vec<DashboardRow>,
}

/// Evaluation runs of one experiment as an HTML table, with a selector over
/// every evaluation experiment.
async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>, ApiError> {
    let experiments = eval_experiments(state.tracking.as_ref()).await.map_err(tracking_error)?;
    let selected = match &query.experiment {
        Some(name) => experiments.iter().find(|e| &e.name == name),
        None => experiments.first(),
    };

    let rows = match selected {
        Some(experiment) => {
            let runs =
                state.tracking.search_runs(&experiment.experiment_id).await.map_err(tracking_error)?;
            dashboard_rows(&runs)
        }
        None => Vec::new(),
    };

    let page = DashboardPage {
        experiments: experiments
            .iter()
            .map(|e| ExperimentOption {
                name: e.name.clone(),
                selected: selected.is_some_and(|s| s.name == e.name),
            })
            .collect(),
        selected: selected.map(|e| e.name.clone()),
        rows,
    };
    let html = DASHBOARD.render("dashboard", &page).map_err(|e| {
        error!(error = %e, "dashboard rendering failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e)
    })?;
    Ok(Html(html))
}
