//! The tracking store trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::run::{Experiment, Run, RunRecord};

/// Where experiments and their runs are recorded.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Return the id of the experiment called `name`, creating it if needed.
    async fn ensure_experiment(&self, name: &str) -> Result<String>;

    async fn find_experiment(&self, name: &str) -> Result<Option<Experiment>>;

    async fn list_experiments(&self) -> Result<Vec<Experiment>>;

    /// Record a finished run with all of its params, metrics and tags.
    ///
    /// Returns the new run id.
    async fn record_run(&self, experiment_id: &str, record: RunRecord) -> Result<String>;

    /// Runs of an experiment, most recently started first.
    async fn search_runs(&self, experiment_id: &str) -> Result<Vec<Run>>;
}
