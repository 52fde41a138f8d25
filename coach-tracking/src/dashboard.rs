//! Read-only view over evaluation runs.

use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::warn;

use crate::error::Result;
use crate::run::{Experiment, Run};
use crate::store::TrackingStore;

/// Prefix shared by every evaluation experiment.
pub const EVAL_PREFIX: &str = "eval_";

/// One evaluated question.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct DashboardRow {
    #[tabled(rename = "Question")]
    pub question: String,
    #[tabled(rename = "Prompt")]
    pub prompt_version: String,
    #[tabled(rename = "Chunk Size")]
    pub chunk_size: u64,
    #[tabled(rename = "Correct (LC)")]
    pub lc_is_correct: f64,
}

/// Experiments whose name starts with [`EVAL_PREFIX`], in store order.
pub async fn eval_experiments(store: &dyn TrackingStore) -> Result<Vec<Experiment>> {
    let experiments = store.list_experiments().await?;
    Ok(experiments.into_iter().filter(|e| e.name.starts_with(EVAL_PREFIX)).collect())
}

/// Project runs onto dashboard rows, keeping their order.
///
/// A missing `chunk_size` reads as 0 and a missing `lc_is_correct` as 0.0.
pub fn dashboard_rows(runs: &[Run]) -> Vec<DashboardRow> {
    runs.iter()
        .map(|run| {
            let chunk_size = match run.params.get("chunk_size") {
                None => 0,
                Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                    warn!(run_id = %run.run_id, value = %raw, "chunk_size is not an integer");
                    0
                }),
            };
            DashboardRow {
                question: run.params.get("question").cloned().unwrap_or_default(),
                prompt_version: run.params.get("prompt_version").cloned().unwrap_or_default(),
                chunk_size,
                lc_is_correct: run.metrics.get("lc_is_correct").copied().unwrap_or(0.0),
            }
        })
        .collect()
}

/// Render rows as a terminal table.
pub fn render_table(rows: &[DashboardRow]) -> String {
    Table::new(rows).with(Style::modern()).to_string()
}
