//! MlflowTracking against a stub MLflow tracking server.

use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use coach_tracking::{
    MlflowTracking, RunRecord, RunStatus, TrackingError, TrackingStore, dashboard_rows,
    eval_experiments,
};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Default)]
struct StubState {
    experiments: Vec<(String, String)>,
    runs: Vec<Value>,
    order_by_seen: Vec<Value>,
}

type Stub = Arc<Mutex<StubState>>;

#[derive(Deserialize)]
struct ByName {
    experiment_name: String,
}

async fn get_by_name(State(stub): State<Stub>, Query(q): Query<ByName>) -> Response {
    let state = stub.lock().unwrap();
    match state.experiments.iter().find(|(_, name)| *name == q.experiment_name) {
        Some((id, name)) => {
            Json(json!({"experiment": {"experiment_id": id, "name": name}})).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error_code": "RESOURCE_DOES_NOT_EXIST", "message": "no experiment"})),
        )
            .into_response(),
    }
}

async fn create_experiment(State(stub): State<Stub>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = stub.lock().unwrap();
    let id = (state.experiments.len() + 1).to_string();
    let name = body["name"].as_str().unwrap_or_default().to_string();
    state.experiments.push((id.clone(), name));
    Json(json!({"experiment_id": id}))
}

// One experiment per page to exercise pagination.
async fn search_experiments(State(stub): State<Stub>, Json(body): Json<Value>) -> Json<Value> {
    let state = stub.lock().unwrap();
    let index: usize = body["page_token"].as_str().and_then(|t| t.parse().ok()).unwrap_or(0);
    let page: Vec<Value> = state
        .experiments
        .get(index)
        .map(|(id, name)| json!({"experiment_id": id, "name": name}))
        .into_iter()
        .collect();
    let next = if index + 1 < state.experiments.len() { json!((index + 1).to_string()) } else { Value::Null };
    Json(json!({"experiments": page, "next_page_token": next}))
}

async fn create_run(State(stub): State<Stub>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = stub.lock().unwrap();
    // Start times strictly increase with creation order.
    let start_time = 1_700_000_000_000i64 + state.runs.len() as i64;
    let run = json!({
        "info": {
            "run_id": format!("run{}", state.runs.len()),
            "run_name": body["run_name"],
            "experiment_id": body["experiment_id"],
            "status": "RUNNING",
            "start_time": start_time,
        },
        "data": {"params": [], "metrics": [], "tags": body["tags"]},
    });
    state.runs.push(run.clone());
    Json(json!({"run": run}))
}

fn find_run<'a>(state: &'a mut StubState, run_id: &Value) -> Option<&'a mut Value> {
    state.runs.iter_mut().find(|r| &r["info"]["run_id"] == run_id)
}

async fn log_batch(State(stub): State<Stub>, Json(body): Json<Value>) -> Response {
    let rejected = body["params"]
        .as_array()
        .is_some_and(|params| params.iter().any(|p| p["key"] == "reject_me"));
    if rejected {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error_code": "INVALID_PARAMETER_VALUE", "message": "rejected"})),
        )
            .into_response();
    }
    let mut state = stub.lock().unwrap();
    let Some(run) = find_run(&mut state, &body["run_id"]) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    run["data"]["params"] = body["params"].clone();
    run["data"]["metrics"] = body["metrics"].clone();
    if let (Some(tags), Some(extra)) = (run["data"]["tags"].as_array_mut(), body["tags"].as_array()) {
        tags.extend(extra.iter().cloned());
    }
    Json(json!({})).into_response()
}

async fn update_run(State(stub): State<Stub>, Json(body): Json<Value>) -> Response {
    let mut state = stub.lock().unwrap();
    let Some(run) = find_run(&mut state, &body["run_id"]) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    run["info"]["status"] = body["status"].clone();
    Json(json!({})).into_response()
}

async fn search_runs(State(stub): State<Stub>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = stub.lock().unwrap();
    state.order_by_seen.push(body["order_by"].clone());
    let wanted = body["experiment_ids"].clone();
    let mut runs: Vec<Value> = state
        .runs
        .iter()
        .filter(|r| wanted.as_array().is_some_and(|ids| ids.contains(&r["info"]["experiment_id"])))
        .cloned()
        .collect();
    runs.sort_by_key(|r| std::cmp::Reverse(r["info"]["start_time"].as_i64().unwrap_or(0)));
    Json(json!({"runs": runs}))
}

async fn spawn_stub() -> (String, Stub, tokio::task::JoinHandle<()>) {
    let stub: Stub = Arc::default();
    let app = Router::new()
        .route("/api/2.0/mlflow/experiments/get-by-name", get(get_by_name))
        .route("/api/2.0/mlflow/experiments/create", post(create_experiment))
        .route("/api/2.0/mlflow/experiments/search", post(search_experiments))
        .route("/api/2.0/mlflow/runs/create", post(create_run))
        .route("/api/2.0/mlflow/runs/log-batch", post(log_batch))
        .route("/api/2.0/mlflow/runs/update", post(update_run))
        .route("/api/2.0/mlflow/runs/search", post(search_runs))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });
    (format!("http://{addr}"), stub, handle)
}

#[tokio::test]
async fn experiments_are_created_once_and_listed_across_pages() {
    let (base, _stub, handle) = spawn_stub().await;
    let tracking = MlflowTracking::new(base);

    let eval = tracking.ensure_experiment("eval_v1_asistente_entrenamiento").await.unwrap();
    let again = tracking.ensure_experiment("eval_v1_asistente_entrenamiento").await.unwrap();
    tracking.ensure_experiment("vectorstore_tracking").await.unwrap();
    tracking.ensure_experiment("eval_v2").await.unwrap();
    assert_eq!(eval, again);

    let all = tracking.list_experiments().await.unwrap();
    assert_eq!(all.len(), 3);
    let eval_names: Vec<_> =
        eval_experiments(&tracking).await.unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(eval_names, vec!["eval_v1_asistente_entrenamiento", "eval_v2"]);
    assert!(tracking.find_experiment("missing").await.unwrap().is_none());

    handle.abort();
}

#[tokio::test]
async fn recorded_runs_read_back_newest_first() {
    let (base, stub, handle) = spawn_stub().await;
    let tracking = MlflowTracking::new(base);
    let exp = tracking.ensure_experiment("eval_v1").await.unwrap();

    for (n, correct) in [(1, 1.0), (2, 0.0)] {
        let record = RunRecord::new(format!("eval_q{n}"))
            .param("question", format!("question {n}"))
            .param("prompt_version", "v1")
            .param("chunk_size", 512)
            .metric("lc_is_correct", correct);
        tracking.record_run(&exp, record).await.unwrap();
    }

    let runs = tracking.search_runs(&exp).await.unwrap();
    let names: Vec<_> = runs.iter().map(|r| r.run_name.as_str()).collect();
    assert_eq!(names, vec!["eval_q2", "eval_q1"]);
    assert!(runs.iter().all(|r| r.status == RunStatus::Finished));
    assert_eq!(stub.lock().unwrap().order_by_seen[0], json!(["attributes.start_time DESC"]));

    let rows = dashboard_rows(&runs);
    assert_eq!(rows[1].question, "question 1");
    assert_eq!(rows[1].chunk_size, 512);
    assert_eq!(rows[1].lc_is_correct, 1.0);

    handle.abort();
}

#[tokio::test]
async fn rejected_batch_marks_run_failed() {
    let (base, stub, handle) = spawn_stub().await;
    let tracking = MlflowTracking::new(base);
    let exp = tracking.ensure_experiment("eval_v1").await.unwrap();

    let err = tracking
        .record_run(&exp, RunRecord::new("eval_q1").param("reject_me", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, TrackingError::Backend { status: 400, .. }), "{err}");
    assert_eq!(stub.lock().unwrap().runs[0]["info"]["status"], "FAILED");

    handle.abort();
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let tracking = MlflowTracking::new(format!("http://{addr}"));
    let err = tracking.ensure_experiment("eval_v1").await.unwrap_err();
    assert!(matches!(err, TrackingError::Transport { .. }));
}
