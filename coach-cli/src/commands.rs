//! Subcommand implementations.

use std::sync::Arc;

use anyhow::Context;
use coach_eval::{EvalHarness, EvalReport, LlmCriteriaJudge, LlmQaJudge, load_dataset};
use coach_rag::{IndexBuildSummary, IndexBuilder};
use coach_tracking::{RunRecord, TrackingStore, dashboard_rows, eval_experiments, render_table};
use tracing::info;

use crate::config::AppConfig;

/// Experiment index builds are recorded under.
pub const INDEX_EXPERIMENT: &str = "vectorstore_tracking";
pub const INDEX_RUN_NAME: &str = "vectorstore_build";

/// Record a finished index build as one tracked run.
pub async fn record_index_build(
    tracking: &dyn TrackingStore,
    summary: &IndexBuildSummary,
) -> coach_tracking::Result<String> {
    let experiment_id = tracking.ensure_experiment(INDEX_EXPERIMENT).await?;
    let record = RunRecord::new(INDEX_RUN_NAME)
        .param("chunk_size", summary.chunk_size)
        .param("chunk_overlap", summary.chunk_overlap)
        .param("n_chunks", summary.n_chunks)
        .param("n_docs", summary.n_docs)
        .tag("vectorstore", summary.index_dir.display());
    tracking.record_run(&experiment_id, record).await
}

pub async fn build_index(config: &AppConfig) -> anyhow::Result<()> {
    let builder = IndexBuilder::new(config.rag_config()?, config.embedder()?);
    let summary = builder.build(&config.data_dir, &config.vector_dir).await?;
    let run_id = record_index_build(config.tracking().as_ref(), &summary)
        .await
        .context("index was written but the build could not be tracked")?;

    println!(
        "Indexed {} pages into {} chunks at {} (run {run_id})",
        summary.n_docs,
        summary.n_chunks,
        summary.index_dir.display()
    );
    Ok(())
}

pub async fn eval(config: &AppConfig) -> anyhow::Result<()> {
    let settings = config.eval_settings();
    let dataset = load_dataset(&settings.dataset_path)?;
    let chain = config.retrieval_chain(config.chat_llm()?).await?;
    let judge = config.judge_llm()?;

    let harness = EvalHarness::new(
        settings,
        Arc::new(chain),
        Arc::new(LlmQaJudge::new(judge.clone())),
        Arc::new(LlmCriteriaJudge::new(judge)),
        config.tracking(),
    );
    let report = harness.run(&dataset).await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &EvalReport) {
    for row in &report.rows {
        println!(
            "[{}] {} -> {} (criteria {})",
            row.run_name, row.question, row.qa.verdict, row.criteria.score
        );
    }
    println!(
        "{} questions recorded in '{}', accuracy {:.2}",
        report.rows.len(),
        report.experiment_name,
        report.accuracy()
    );
}

/// Build the dashboard table for `experiment`, or for the first evaluation
/// experiment when none is named.
pub async fn dashboard_table(
    tracking: &dyn TrackingStore,
    experiment: Option<&str>,
) -> anyhow::Result<Option<(String, String)>> {
    let experiments = eval_experiments(tracking).await?;
    let selected = match experiment {
        Some(name) => experiments.into_iter().find(|e| e.name == name),
        None => experiments.into_iter().next(),
    };
    let Some(selected) = selected else {
        return Ok(None);
    };

    let runs = tracking.search_runs(&selected.experiment_id).await?;
    info!(experiment = %selected.name, runs = runs.len(), "dashboard loaded");
    Ok(Some((selected.name, render_table(&dashboard_rows(&runs)))))
}

pub async fn dashboard(config: &AppConfig, experiment: Option<&str>) -> anyhow::Result<()> {
    match dashboard_table(config.tracking().as_ref(), experiment).await? {
        Some((name, table)) => println!("{name}\n{table}"),
        None => match experiment {
            Some(name) => println!("No evaluation experiment named '{name}'."),
            None => println!("No evaluation experiments yet. Run `coach eval` first."),
        },
    }
    Ok(())
}
