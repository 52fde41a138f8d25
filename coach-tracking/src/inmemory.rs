//! In-memory tracking store.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, TrackingError};
use crate::run::{Experiment, Run, RunRecord, RunStatus};
use crate::store::TrackingStore;

#[derive(Debug, Default)]
struct State {
    experiments: Vec<Experiment>,
    // (insertion sequence, run); the sequence orders runs started in the same instant.
    runs: Vec<(u64, Run)>,
    next_seq: u64,
}

/// Experiments and runs held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryTracking {
    state: RwLock<State>,
}

impl InMemoryTracking {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackingStore for InMemoryTracking {
    async fn ensure_experiment(&self, name: &str) -> Result<String> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.experiments.iter().find(|e| e.name == name) {
            return Ok(existing.experiment_id.clone());
        }
        let experiment_id = state.experiments.len().to_string();
        state.experiments.push(Experiment { experiment_id: experiment_id.clone(), name: name.into() });
        debug!(experiment = name, %experiment_id, "created experiment");
        Ok(experiment_id)
    }

    async fn find_experiment(&self, name: &str) -> Result<Option<Experiment>> {
        let state = self.state.read().await;
        Ok(state.experiments.iter().find(|e| e.name == name).cloned())
    }

    async fn list_experiments(&self) -> Result<Vec<Experiment>> {
        Ok(self.state.read().await.experiments.clone())
    }

    async fn record_run(&self, experiment_id: &str, record: RunRecord) -> Result<String> {
        let mut state = self.state.write().await;
        if !state.experiments.iter().any(|e| e.experiment_id == experiment_id) {
            return Err(TrackingError::NotFound(format!("experiment '{experiment_id}'")));
        }
        let run = Run {
            run_id: uuid::Uuid::new_v4().simple().to_string(),
            run_name: record.run_name,
            experiment_id: experiment_id.to_string(),
            start_time: Utc::now(),
            status: RunStatus::Finished,
            params: record.params,
            metrics: record.metrics,
            tags: record.tags,
        };
        let run_id = run.run_id.clone();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.runs.push((seq, run));
        Ok(run_id)
    }

    async fn search_runs(&self, experiment_id: &str) -> Result<Vec<Run>> {
        let state = self.state.read().await;
        let mut runs: Vec<&(u64, Run)> =
            state.runs.iter().filter(|(_, run)| run.experiment_id == experiment_id).collect();
        runs.sort_by(|(seq_a, a), (seq_b, b)| {
            b.start_time.cmp(&a.start_time).then_with(|| seq_b.cmp(seq_a))
        });
        Ok(runs.into_iter().map(|(_, run)| run.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_experiment_is_idempotent() {
        let store = InMemoryTracking::new();
        let a = store.ensure_experiment("eval_v1").await.unwrap();
        let b = store.ensure_experiment("eval_v1").await.unwrap();
        let c = store.ensure_experiment("vectorstore_tracking").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.list_experiments().await.unwrap().len(), 2);
        assert_eq!(store.find_experiment("eval_v1").await.unwrap().unwrap().experiment_id, a);
        assert!(store.find_experiment("eval_v2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn runs_come_back_newest_first() {
        let store = InMemoryTracking::new();
        let exp = store.ensure_experiment("eval_v1").await.unwrap();
        for n in 1..=3 {
            store.record_run(&exp, RunRecord::new(format!("eval_q{n}"))).await.unwrap();
        }
        let names: Vec<_> =
            store.search_runs(&exp).await.unwrap().into_iter().map(|r| r.run_name).collect();
        assert_eq!(names, vec!["eval_q3", "eval_q2", "eval_q1"]);
    }

    #[tokio::test]
    async fn recording_into_unknown_experiment_fails() {
        let store = InMemoryTracking::new();
        let err = store.record_run("42", RunRecord::new("x")).await.unwrap_err();
        assert!(matches!(err, TrackingError::NotFound(_)));
    }
}
