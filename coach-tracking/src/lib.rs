//! # coach-tracking
//!
//! Experiment tracking for index builds and evaluation runs.
//!
//! - [`TrackingStore`] - ensure experiments, record runs, read them back
//! - [`InMemoryTracking`] - process-local backend
//! - [`MlflowTracking`] - MLflow tracking server over its REST API, `mlflow` feature
//! - [`dashboard`] - evaluation experiments projected onto table rows

pub mod dashboard;
pub mod error;
pub mod inmemory;
#[cfg(feature = "mlflow")]
pub mod mlflow;
pub mod run;
pub mod store;

pub use dashboard::{DashboardRow, EVAL_PREFIX, dashboard_rows, eval_experiments, render_table};
pub use error::{Result, TrackingError};
pub use inmemory::InMemoryTracking;
#[cfg(feature = "mlflow")]
pub use mlflow::MlflowTracking;
pub use run::{Experiment, Run, RunRecord, RunStatus};
pub use store::TrackingStore;
