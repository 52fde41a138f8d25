//! MLflow tracking server backend (REST API 2.0).
//!
//! This module is only available when the `mlflow` feature is enabled.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, warn};

use crate::error::{Result, TrackingError};
use crate::run::{Experiment, Run, RunRecord, RunStatus};
use crate::store::TrackingStore;

const BACKEND: &str = "MLflow";
const PAGE_SIZE: usize = 1000;
/// Tag MLflow uses to display a run's name.
const RUN_NAME_TAG: &str = "mlflow.runName";

/// A [`TrackingStore`] talking to an MLflow tracking server.
///
/// ```rust,ignore
/// let tracking = MlflowTracking::new("http://127.0.0.1:5000");
/// let experiment = tracking.ensure_experiment("eval_v1_asistente_entrenamiento").await?;
/// ```
pub struct MlflowTracking {
    client: reqwest::Client,
    base_url: String,
}

impl MlflowTracking {
    pub fn new(tracking_uri: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: tracking_uri.into().trim_end_matches('/').to_string(),
        }
    }

    /// Use `MLFLOW_TRACKING_URI`, defaulting to a local server.
    pub fn from_env() -> Self {
        let uri = std::env::var("MLFLOW_TRACKING_URI")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| "http://127.0.0.1:5000".to_string());
        Self::new(uri)
    }

    pub fn tracking_uri(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/2.0/mlflow/{path}", self.base_url)
    }

    async fn call<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder, what: &str) -> Result<T> {
        let response = request.send().await.map_err(|e| {
            error!(backend = BACKEND, operation = what, error = %e, "request failed");
            TrackingError::Transport { backend: BACKEND.into(), message: format!("{what}: {e}") }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| format!("{}: {}", e.error_code, e.message))
                .unwrap_or(body);
            if status != reqwest::StatusCode::NOT_FOUND {
                error!(backend = BACKEND, operation = what, %status, %message, "request rejected");
            }
            return Err(TrackingError::Backend {
                backend: BACKEND.into(),
                status: status.as_u16(),
                message,
            });
        }

        response.json().await.map_err(|e| TrackingError::Decode {
            backend: BACKEND.into(),
            message: format!("{what}: {e}"),
        })
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        self.call(self.client.post(self.endpoint(path)).json(body), path).await
    }

    async fn set_status(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let body = json!({
            "run_id": run_id,
            "status": status.as_str(),
            "end_time": Utc::now().timestamp_millis(),
        });
        self.post::<Value>("runs/update", &body).await.map(|_| ())
    }
}

// ── wire types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct WireExperiment {
    experiment_id: String,
    name: String,
}

impl From<WireExperiment> for Experiment {
    fn from(e: WireExperiment) -> Self {
        Experiment { experiment_id: e.experiment_id, name: e.name }
    }
}

#[derive(Deserialize)]
struct GetExperimentResponse {
    experiment: WireExperiment,
}

#[derive(Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Deserialize)]
struct SearchExperimentsResponse {
    #[serde(default)]
    experiments: Vec<WireExperiment>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct KeyValue {
    key: String,
    value: String,
}

#[derive(Serialize, Deserialize)]
struct WireMetric {
    key: String,
    value: f64,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    step: i64,
}

#[derive(Deserialize)]
struct WireRunInfo {
    run_id: String,
    #[serde(default)]
    run_name: Option<String>,
    experiment_id: String,
    status: RunStatus,
    #[serde(default)]
    start_time: i64,
}

#[derive(Deserialize, Default)]
struct WireRunData {
    #[serde(default)]
    metrics: Vec<WireMetric>,
    #[serde(default)]
    params: Vec<KeyValue>,
    #[serde(default)]
    tags: Vec<KeyValue>,
}

#[derive(Deserialize)]
struct WireRun {
    info: WireRunInfo,
    #[serde(default)]
    data: WireRunData,
}

#[derive(Deserialize)]
struct CreateRunResponse {
    run: WireRun,
}

#[derive(Deserialize)]
struct SearchRunsResponse {
    #[serde(default)]
    runs: Vec<WireRun>,
    #[serde(default)]
    next_page_token: Option<String>,
}

fn pairs(map: &BTreeMap<String, String>) -> Vec<KeyValue> {
    map.iter().map(|(k, v)| KeyValue { key: k.clone(), value: v.clone() }).collect()
}

impl From<WireRun> for Run {
    fn from(wire: WireRun) -> Self {
        let tags: BTreeMap<String, String> =
            wire.data.tags.into_iter().map(|kv| (kv.key, kv.value)).collect();
        let run_name = wire
            .info
            .run_name
            .filter(|n| !n.is_empty())
            .or_else(|| tags.get(RUN_NAME_TAG).cloned())
            .unwrap_or_default();
        Run {
            run_id: wire.info.run_id,
            run_name,
            experiment_id: wire.info.experiment_id,
            start_time: DateTime::<Utc>::from_timestamp_millis(wire.info.start_time)
                .unwrap_or_default(),
            status: wire.info.status,
            params: wire.data.params.into_iter().map(|kv| (kv.key, kv.value)).collect(),
            // MLflow returns the latest value per metric key.
            metrics: wire.data.metrics.into_iter().map(|m| (m.key, m.value)).collect(),
            tags,
        }
    }
}

// ── TrackingStore implementation ───────────────────────────────────

#[async_trait]
impl TrackingStore for MlflowTracking {
    async fn ensure_experiment(&self, name: &str) -> Result<String> {
        if let Some(existing) = self.find_experiment(name).await? {
            return Ok(existing.experiment_id);
        }
        let created: CreateExperimentResponse =
            self.post("experiments/create", &json!({ "name": name })).await?;
        debug!(experiment = name, experiment_id = %created.experiment_id, "created experiment");
        Ok(created.experiment_id)
    }

    async fn find_experiment(&self, name: &str) -> Result<Option<Experiment>> {
        let request = self
            .client
            .get(self.endpoint("experiments/get-by-name"))
            .query(&[("experiment_name", name)]);
        match self.call::<GetExperimentResponse>(request, "experiments/get-by-name").await {
            Ok(found) => Ok(Some(found.experiment.into())),
            Err(TrackingError::Backend { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_experiments(&self) -> Result<Vec<Experiment>> {
        let mut experiments = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut body = json!({ "max_results": PAGE_SIZE });
            if let Some(token) = &page_token {
                body["page_token"] = json!(token);
            }
            let page: SearchExperimentsResponse = self.post("experiments/search", &body).await?;
            experiments.extend(page.experiments.into_iter().map(Experiment::from));
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(experiments)
    }

    async fn record_run(&self, experiment_id: &str, record: RunRecord) -> Result<String> {
        let now = Utc::now().timestamp_millis();
        let created: CreateRunResponse = self
            .post(
                "runs/create",
                &json!({
                    "experiment_id": experiment_id,
                    "run_name": record.run_name,
                    "start_time": now,
                    "tags": [{ "key": RUN_NAME_TAG, "value": record.run_name }],
                }),
            )
            .await?;
        let run_id = created.run.info.run_id;

        let metrics: Vec<WireMetric> = record
            .metrics
            .iter()
            .map(|(key, value)| WireMetric { key: key.clone(), value: *value, timestamp: now, step: 0 })
            .collect();
        let batch = json!({
            "run_id": run_id,
            "params": pairs(&record.params),
            "metrics": metrics,
            "tags": pairs(&record.tags),
        });
        if let Err(e) = self.post::<Value>("runs/log-batch", &batch).await {
            if let Err(status_err) = self.set_status(&run_id, RunStatus::Failed).await {
                warn!(%run_id, error = %status_err, "could not mark run as failed");
            }
            return Err(e);
        }

        self.set_status(&run_id, RunStatus::Finished).await?;
        debug!(%run_id, run_name = %record.run_name, "recorded run");
        Ok(run_id)
    }

    async fn search_runs(&self, experiment_id: &str) -> Result<Vec<Run>> {
        let mut runs = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut body = json!({
                "experiment_ids": [experiment_id],
                "order_by": ["attributes.start_time DESC"],
                "max_results": PAGE_SIZE,
            });
            if let Some(token) = &page_token {
                body["page_token"] = json!(token);
            }
            let page: SearchRunsResponse = self.post("runs/search", &body).await?;
            runs.extend(page.runs.into_iter().map(Run::from));
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(runs)
    }
}
