//! End-to-end evaluation runs against scripted models.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use coach_core::{ChatTurn, UserProfile};
use coach_eval::{
    AnswerSource, DatasetRow, EvalError, EvalHarness, EvalSettings, LlmCriteriaJudge, LlmQaJudge,
};
use coach_model::MockLlm;
use coach_rag::{
    DEFAULT_COLLECTION, Document, HashEmbeddingProvider, InMemoryVectorStore, PromptTemplate,
    RagConfig, RagError, RagPipeline, RecursiveChunker, RetrievalChain,
};
use coach_tracking::{InMemoryTracking, TrackingStore};

const CRITERIA_REPLY: &str = "1. Correctness: The submission meets the reference.\n\
2. Relevance: The answer is relevant to the question.\n\
3. Coherence: Short.\n\nY\nY";

async fn chain(answer_llm: Arc<MockLlm>) -> RetrievalChain {
    let config = RagConfig::default();
    let pipeline = RagPipeline::builder()
        .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .chunker(Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap)))
        .config(config)
        .build()
        .unwrap();
    pipeline.create_collection(DEFAULT_COLLECTION).await.unwrap();
    pipeline
        .ingest(
            DEFAULT_COLLECTION,
            &Document::from_page(
                Path::new("periodization.pdf"),
                1,
                "A deload week is a week of reduced training volume and intensity.",
            ),
        )
        .await
        .unwrap();
    let prompt = PromptTemplate::from_source(
        "v1_asistente_entrenamiento",
        "Profile: {{profile.summary}}\nContext: {{context}}\nQuestion: {{question}}",
    )
    .unwrap();
    RetrievalChain::new(Arc::new(pipeline), DEFAULT_COLLECTION, answer_llm, prompt)
}

fn judge_llm() -> Arc<MockLlm> {
    Arc::new(MockLlm::new("judge", |req| {
        if req.text().contains("[BEGIN DATA]") {
            Ok(CRITERIA_REPLY.to_string())
        } else {
            Ok("GRADE: CORRECT".to_string())
        }
    }))
}

fn harness(
    source: Arc<dyn AnswerSource>,
    tracking: Arc<InMemoryTracking>,
) -> EvalHarness {
    let judge = judge_llm();
    EvalHarness::new(
        EvalSettings::default(),
        source,
        Arc::new(LlmQaJudge::new(judge.clone())),
        Arc::new(LlmCriteriaJudge::new(judge)),
        tracking,
    )
}

#[tokio::test]
async fn deload_week_scenario_records_one_run() {
    let answer_llm = Arc::new(MockLlm::fixed("A week of reduced training volume."));
    let tracking = Arc::new(InMemoryTracking::new());
    let harness = harness(Arc::new(chain(answer_llm.clone()).await), tracking.clone());
    let dataset = vec![DatasetRow {
        question: "What is a deload week?".into(),
        answer: "A week of reduced training volume.".into(),
    }];

    let report = harness.run(&dataset).await.unwrap();
    assert_eq!(report.experiment_name, "eval_v1_asistente_entrenamiento");
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.accuracy(), 1.0);

    let experiment = tracking
        .find_experiment("eval_v1_asistente_entrenamiento")
        .await
        .unwrap()
        .expect("experiment exists");
    let runs = tracking.search_runs(&experiment.experiment_id).await.unwrap();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.run_name, "eval_q1");
    assert_eq!(run.params["prompt_version"], "v1_asistente_entrenamiento");
    assert_eq!(run.params["question"], "What is a deload week?");
    assert_eq!(run.params["chunk_size"], "512");
    assert_eq!(run.params["chunk_overlap"], "50");
    assert_eq!(run.metrics["lc_is_correct"], 1.0);
    assert_eq!(run.metrics["criteria_score"], 1.0);
    assert_eq!(run.metrics["criteria_correctness"], 1.0);
    assert_eq!(run.metrics["criteria_relevance"], 1.0);
    // No indicator words: tie resolves to zero.
    assert_eq!(run.metrics["criteria_coherence"], 0.0);

    let sent = answer_llm.requests().await;
    assert_eq!(sent.len(), 1, "no condensing without history");
    assert!(sent[0].text().contains("gender: male, age: 25 years, height: 180 cm, weight: 80 kg"));
    assert!(sent[0].text().contains("reduced training volume"));
}

#[tokio::test]
async fn every_row_gets_a_run_with_the_same_prompt_version() {
    let tracking = Arc::new(InMemoryTracking::new());
    let harness = harness(Arc::new(chain(Arc::new(MockLlm::fixed("answer"))).await), tracking.clone());
    let dataset: Vec<DatasetRow> = (1..=4)
        .map(|n| DatasetRow { question: format!("question {n}"), answer: format!("answer {n}") })
        .collect();

    let report = harness.run(&dataset).await.unwrap();
    let runs = tracking.search_runs(&report.experiment_id).await.unwrap();
    assert_eq!(runs.len(), 4);
    assert!(runs.iter().all(|r| r.params["prompt_version"] == "v1_asistente_entrenamiento"));
    let mut names: Vec<_> = runs.iter().map(|r| r.run_name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["eval_q1", "eval_q2", "eval_q3", "eval_q4"]);
}

#[tokio::test]
async fn criterion_missing_from_reasoning_is_not_recorded() {
    let tracking = Arc::new(InMemoryTracking::new());
    let judge = Arc::new(MockLlm::new("judge", |req| {
        if req.text().contains("[BEGIN DATA]") {
            Ok("1. Correctness: fails to match the reference.\nN".to_string())
        } else {
            Ok("GRADE: INCORRECT".to_string())
        }
    }));
    let harness = EvalHarness::new(
        EvalSettings::default(),
        Arc::new(chain(Arc::new(MockLlm::fixed("wrong"))).await),
        Arc::new(LlmQaJudge::new(judge.clone())),
        Arc::new(LlmCriteriaJudge::new(judge)),
        tracking.clone(),
    );
    let report = harness
        .run(&[DatasetRow { question: "q".into(), answer: "a".into() }])
        .await
        .unwrap();

    let run = &tracking.search_runs(&report.experiment_id).await.unwrap()[0];
    assert_eq!(run.metrics["lc_is_correct"], 0.0);
    assert_eq!(run.metrics["criteria_score"], 0.0);
    assert_eq!(run.metrics["criteria_correctness"], 0.0);
    assert!(!run.metrics.contains_key("criteria_relevance"));
    assert!(!run.metrics.contains_key("criteria_coherence"));
}

/// Answers the first `ok_rows` questions, then fails.
struct FlakySource {
    ok_rows: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl AnswerSource for FlakySource {
    async fn answer(&self, _: &str, history: &[ChatTurn], _: &UserProfile) -> coach_rag::Result<String> {
        assert!(history.is_empty());
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.ok_rows {
            Ok("fine".into())
        } else {
            Err(RagError::PipelineError("retrieval backend down".into()))
        }
    }
}

#[tokio::test]
async fn failure_aborts_the_run_and_keeps_earlier_rows() {
    let tracking = Arc::new(InMemoryTracking::new());
    let source = Arc::new(FlakySource { ok_rows: 1, calls: AtomicUsize::new(0) });
    let harness = harness(source.clone(), tracking.clone());
    let dataset: Vec<DatasetRow> = (1..=3)
        .map(|n| DatasetRow { question: format!("q{n}"), answer: format!("a{n}") })
        .collect();

    let err = harness.run(&dataset).await.unwrap_err();
    assert!(matches!(err, EvalError::Answer { row: 2, .. }), "{err}");
    assert_eq!(source.calls.load(Ordering::SeqCst), 2, "row 3 never starts");

    let experiment = tracking.find_experiment("eval_v1_asistente_entrenamiento").await.unwrap().unwrap();
    let runs = tracking.search_runs(&experiment.experiment_id).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_name, "eval_q1");
}

#[tokio::test]
async fn judge_failure_records_nothing_for_the_row() {
    let tracking = Arc::new(InMemoryTracking::new());
    let harness = EvalHarness::new(
        EvalSettings::default(),
        Arc::new(FlakySource { ok_rows: 10, calls: AtomicUsize::new(0) }),
        Arc::new(LlmQaJudge::new(Arc::new(MockLlm::fixed("GRADE: CORRECT")))),
        Arc::new(LlmCriteriaJudge::new(Arc::new(MockLlm::failing("quota exceeded")))),
        tracking.clone(),
    );
    let err = harness.run(&[DatasetRow { question: "q".into(), answer: "a".into() }]).await.unwrap_err();
    assert!(matches!(err, EvalError::Judge { row: 1, judge: "criteria", .. }));

    let experiment = tracking.find_experiment("eval_v1_asistente_entrenamiento").await.unwrap().unwrap();
    assert!(tracking.search_runs(&experiment.experiment_id).await.unwrap().is_empty());
}
