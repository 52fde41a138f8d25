//! # coach-eval
//!
//! Offline evaluation of the training assistant.
//!
//! [`EvalHarness`] asks every [`DatasetRow`] question with the
//! [`default_profile`], grades the answer with a [`QaJudge`] and a
//! [`CriteriaJudge`], estimates per-criterion scores with a
//! [`CriterionScorer`], and records a run per row in a
//! [`TrackingStore`](coach_tracking::TrackingStore) experiment named
//! `eval_<prompt_version>`.
//!
//! ```rust,ignore
//! let settings = EvalSettings::from_env()?;
//! let dataset = load_dataset(&settings.dataset_path)?;
//! let harness = EvalHarness::new(settings, Arc::new(chain), qa_judge, criteria_judge, tracking);
//! let report = harness.run(&dataset).await?;
//! ```

pub mod dataset;
pub mod error;
pub mod harness;
pub mod heuristic;
pub mod judge;
pub mod settings;

pub use dataset::{DatasetRow, default_profile, load_dataset};
pub use error::{EvalError, Result};
pub use harness::{AnswerSource, EvalHarness, EvalReport, RowOutcome};
pub use heuristic::{CriterionScorer, IndicatorHeuristic};
pub use judge::{
    CRITERIA, CriteriaGrade, CriteriaJudge, LlmCriteriaJudge, LlmQaJudge, QaGrade, QaJudge,
    parse_criteria_grade, parse_qa_grade,
};
pub use settings::EvalSettings;
