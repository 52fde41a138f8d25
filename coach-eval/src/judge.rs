//! LLM judges.
//!
//! [`LlmQaJudge`] grades an answer against a reference as `CORRECT` or
//! `INCORRECT`. [`LlmCriteriaJudge`] asks for step-by-step reasoning over the
//! fixed [`CRITERIA`] followed by a single `Y`/`N` verdict. Both send their
//! prompt at temperature 0 and parse the free text the model returns.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use coach_core::{Llm, LlmRequest, Result};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

/// Criteria every answer is judged on, with the question the judge answers.
pub const CRITERIA: [(&str, &str); 3] = [
    ("correctness", "Is the response factually correct based on the reference?"),
    ("relevance", "Is the response relevant to the question asked?"),
    ("coherence", "Is the response coherent, well-structured, and easy to follow?"),
];

/// Outcome of the binary correctness judge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QaGrade {
    /// `CORRECT`, `INCORRECT`, or `UNKNOWN` when the reply had no grade.
    pub verdict: String,
    pub score: f64,
    pub reasoning: String,
}

/// Outcome of the multi-criterion judge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriteriaGrade {
    /// The judge's reasoning with the trailing verdict removed.
    pub reasoning: String,
    /// `Y`, `N`, or empty when the reply had no verdict.
    pub value: String,
    pub score: f64,
}

#[async_trait]
pub trait QaJudge: Send + Sync {
    async fn grade(&self, question: &str, prediction: &str, reference: &str) -> Result<QaGrade>;
}

#[async_trait]
pub trait CriteriaJudge: Send + Sync {
    async fn evaluate(&self, input: &str, prediction: &str, reference: &str) -> Result<CriteriaGrade>;
}

const QA_PROMPT: &str = "You are an instructor grading a quiz.
You are given a question, the student's answer, and the true answer, and are asked to score the student answer as either CORRECT or INCORRECT.

Example Format:
QUESTION: question here
STUDENT ANSWER: student's answer here
TRUE ANSWER: true answer here
GRADE: CORRECT or INCORRECT here

Grade the student answers based ONLY on their factual accuracy. Ignore differences in punctuation and phrasing between the student answer and true answer. It is OK if the student answer contains more information than the true answer, as long as it does not contain any conflicting statements. Begin! 

";

static GRADE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)grade:\s*(correct|incorrect)").expect("grade pattern is valid")
});
static TRAILING_VERDICT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*(Y|N)\s*$").expect("verdict pattern is valid"));
static LEADING_VERDICT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(Y|N)\s*").expect("verdict pattern is valid"));

fn grade_word(word: &str) -> Option<(&'static str, f64)> {
    let word: String = word.chars().filter(|c| !c.is_ascii_punctuation()).collect();
    match word.to_ascii_uppercase().as_str() {
        "CORRECT" => Some(("CORRECT", 1.0)),
        "INCORRECT" => Some(("INCORRECT", 0.0)),
        _ => None,
    }
}

/// Read a grade from the QA judge's reply.
///
/// Looks for `GRADE: CORRECT|INCORRECT` anywhere, then at the first and the
/// last word.
pub fn parse_qa_grade(text: &str) -> QaGrade {
    let reasoning = text.trim().to_string();
    let found = GRADE_RE
        .captures(&reasoning)
        .and_then(|caps| grade_word(&caps[1]))
        .or_else(|| reasoning.split_whitespace().next().and_then(grade_word))
        .or_else(|| reasoning.split_whitespace().last().and_then(grade_word));

    let (verdict, score) = found.unwrap_or(("UNKNOWN", 0.0));
    QaGrade { verdict: verdict.to_string(), score, reasoning }
}

/// Split the criteria judge's reply into reasoning and a `Y`/`N` verdict.
///
/// The verdict is taken from the end of the text, else from its start.
pub fn parse_criteria_grade(text: &str) -> CriteriaGrade {
    let (value, reasoning) = if let Some(caps) = TRAILING_VERDICT_RE.captures(text) {
        let whole = caps.get(0).map_or(text.len(), |m| m.start());
        (caps[1].to_ascii_uppercase(), &text[..whole])
    } else if let Some(caps) = LEADING_VERDICT_RE.captures(text) {
        let end = caps.get(0).map_or(0, |m| m.end());
        (caps[1].to_ascii_uppercase(), &text[end..])
    } else {
        (String::new(), text)
    };
    let score = if value == "Y" { 1.0 } else { 0.0 };
    CriteriaGrade { reasoning: reasoning.trim().to_string(), value, score }
}

/// [`QaJudge`] backed by a language model.
pub struct LlmQaJudge {
    llm: Arc<dyn Llm>,
}

impl LlmQaJudge {
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl QaJudge for LlmQaJudge {
    async fn grade(&self, question: &str, prediction: &str, reference: &str) -> Result<QaGrade> {
        let prompt = format!(
            "{QA_PROMPT}QUESTION: {question}\nSTUDENT ANSWER: {prediction}\nTRUE ANSWER: {reference}\nGRADE:"
        );
        let response = self.llm.generate(LlmRequest::prompt(prompt).with_temperature(0.0)).await?;
        let grade = parse_qa_grade(&response.text);
        debug!(model = self.llm.name(), verdict = %grade.verdict, "qa judge");
        Ok(grade)
    }
}

/// [`CriteriaJudge`] backed by a language model, judging against a reference.
pub struct LlmCriteriaJudge {
    llm: Arc<dyn Llm>,
    criteria: Vec<(String, String)>,
}

impl LlmCriteriaJudge {
    /// A judge over the fixed [`CRITERIA`].
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        let criteria = CRITERIA.iter().map(|(n, d)| (n.to_string(), d.to_string())).collect();
        Self { llm, criteria }
    }

    pub fn criteria(&self) -> impl Iterator<Item = &str> {
        self.criteria.iter().map(|(name, _)| name.as_str())
    }

    fn prompt(&self, input: &str, prediction: &str, reference: &str) -> String {
        let criteria = self
            .criteria
            .iter()
            .map(|(name, description)| format!("{name}: {description}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "You are assessing a submitted answer on a given task or input based on a set of criteria. Here is the data:
[BEGIN DATA]
***
[Input]: {input}
***
[Submission]: {prediction}
***
[Criteria]: {criteria}
***
[Reference]: {reference}
***
[END DATA]
Does the submission meet the Criteria? First, write out in a step by step manner your reasoning about each criterion to be sure that your conclusion is correct. Avoid simply stating the correct answers at the outset. Then print only the single character \"Y\" or \"N\" (without quotes or punctuation) on its own line corresponding to the correct answer of whether the submission meets all criteria. At the end, repeat just the letter again by itself on a new line."
        )
    }
}

#[async_trait]
impl CriteriaJudge for LlmCriteriaJudge {
    async fn evaluate(&self, input: &str, prediction: &str, reference: &str) -> Result<CriteriaGrade> {
        let prompt = self.prompt(input, prediction, reference);
        let response = self.llm.generate(LlmRequest::prompt(prompt).with_temperature(0.0)).await?;
        let grade = parse_criteria_grade(&response.text);
        debug!(model = self.llm.name(), value = %grade.value, "criteria judge");
        Ok(grade)
    }
}
