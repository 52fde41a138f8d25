//! The evaluation loop.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use coach_core::{ChatTurn, UserProfile};
use coach_rag::RetrievalChain;
use coach_tracking::{RunRecord, TrackingStore};
use serde::Serialize;
use tracing::{error, info};

use crate::dataset::{DatasetRow, default_profile};
use crate::error::{EvalError, Result};
use crate::heuristic::{CriterionScorer, IndicatorHeuristic};
use crate::judge::{CRITERIA, CriteriaGrade, CriteriaJudge, QaGrade, QaJudge};
use crate::settings::EvalSettings;

/// Something that answers dataset questions.
#[async_trait]
pub trait AnswerSource: Send + Sync {
    async fn answer(
        &self,
        question: &str,
        history: &[ChatTurn],
        profile: &UserProfile,
    ) -> coach_rag::Result<String>;
}

#[async_trait]
impl AnswerSource for RetrievalChain {
    async fn answer(
        &self,
        question: &str,
        history: &[ChatTurn],
        profile: &UserProfile,
    ) -> coach_rag::Result<String> {
        self.invoke(question, history, profile).await
    }
}

/// What one dataset row produced.
#[derive(Debug, Clone, Serialize)]
pub struct RowOutcome {
    /// 1-based position in the dataset.
    pub index: usize,
    pub run_name: String,
    pub run_id: String,
    pub question: String,
    pub answer: String,
    pub qa: QaGrade,
    pub criteria: CriteriaGrade,
    pub criterion_scores: BTreeMap<String, f64>,
}

/// Result of a completed evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    pub experiment_name: String,
    pub experiment_id: String,
    pub rows: Vec<RowOutcome>,
}

impl EvalReport {
    /// Mean `lc_is_correct` over all rows.
    pub fn accuracy(&self) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        self.rows.iter().map(|r| r.qa.score).sum::<f64>() / self.rows.len() as f64
    }
}

/// Replays a dataset through an [`AnswerSource`], judges every answer and
/// records one tracked run per row.
///
/// Rows are processed one after another. The first failing step aborts the
/// evaluation: earlier rows stay recorded and nothing is recorded for the
/// failing row.
pub struct EvalHarness {
    settings: EvalSettings,
    source: Arc<dyn AnswerSource>,
    qa_judge: Arc<dyn QaJudge>,
    criteria_judge: Arc<dyn CriteriaJudge>,
    scorer: Arc<dyn CriterionScorer>,
    tracking: Arc<dyn TrackingStore>,
}

impl EvalHarness {
    pub fn new(
        settings: EvalSettings,
        source: Arc<dyn AnswerSource>,
        qa_judge: Arc<dyn QaJudge>,
        criteria_judge: Arc<dyn CriteriaJudge>,
        tracking: Arc<dyn TrackingStore>,
    ) -> Self {
        Self {
            settings,
            source,
            qa_judge,
            criteria_judge,
            scorer: Arc::new(IndicatorHeuristic::default()),
            tracking,
        }
    }

    /// Replace the default [`IndicatorHeuristic`].
    pub fn with_scorer(mut self, scorer: Arc<dyn CriterionScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn settings(&self) -> &EvalSettings {
        &self.settings
    }

    pub async fn run(&self, dataset: &[DatasetRow]) -> Result<EvalReport> {
        let experiment_name = self.settings.experiment_name();
        let experiment_id = self.tracking.ensure_experiment(&experiment_name).await?;
        info!(experiment = %experiment_name, rows = dataset.len(), "starting evaluation");

        let profile = default_profile();
        let mut rows = Vec::with_capacity(dataset.len());
        for (i, row) in dataset.iter().enumerate() {
            let outcome = self
                .evaluate_row(i + 1, dataset.len(), row, &profile, &experiment_id)
                .await
                .inspect_err(|e| error!(row = i + 1, error = %e, "evaluation aborted"))?;
            rows.push(outcome);
        }

        let report = EvalReport { experiment_name, experiment_id, rows };
        info!(experiment = %report.experiment_name, accuracy = report.accuracy(), "evaluation finished");
        Ok(report)
    }

    async fn evaluate_row(
        &self,
        index: usize,
        total: usize,
        row: &DatasetRow,
        profile: &UserProfile,
        experiment_id: &str,
    ) -> Result<RowOutcome> {
        let answer = self
            .source
            .answer(&row.question, &[], profile)
            .await
            .map_err(|source| EvalError::Answer { row: index, source })?;

        let qa = self
            .qa_judge
            .grade(&row.question, &answer, &row.answer)
            .await
            .map_err(|source| EvalError::Judge { row: index, judge: "qa", source })?;
        let criteria = self
            .criteria_judge
            .evaluate(&row.question, &answer, &row.answer)
            .await
            .map_err(|source| EvalError::Judge { row: index, judge: "criteria", source })?;

        let criterion_scores: BTreeMap<String, f64> = CRITERIA
            .iter()
            .filter_map(|(name, _)| {
                self.scorer.score(name, &criteria.reasoning).map(|s| (name.to_string(), s))
            })
            .collect();

        let run_name = format!("eval_q{index}");
        let mut record = RunRecord::new(&run_name)
            .param("question", &row.question)
            .param("prompt_version", &self.settings.prompt_version)
            .param("chunk_size", self.settings.chunk_size)
            .param("chunk_overlap", self.settings.chunk_overlap)
            .metric("lc_is_correct", qa.score)
            .metric("criteria_score", criteria.score);
        for (name, score) in &criterion_scores {
            record = record.metric(format!("criteria_{name}"), *score);
        }
        let run_id = self.tracking.record_run(experiment_id, record).await?;

        info!(
            row = index,
            total,
            verdict = %qa.verdict,
            criteria_value = %criteria.value,
            criteria_score = criteria.score,
            "row evaluated"
        );
        Ok(RowOutcome {
            index,
            run_name,
            run_id,
            question: row.question.clone(),
            answer,
            qa,
            criteria,
            criterion_scores,
        })
    }
}
