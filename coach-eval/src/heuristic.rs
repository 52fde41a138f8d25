//! Per-criterion scores recovered from the criteria judge's reasoning.
//!
//! The criteria judge returns one verdict for all criteria together. A
//! [`CriterionScorer`] estimates a score for a single criterion from the free
//! text; the harness records whatever it returns and skips criteria it
//! returns `None` for.

use std::sync::LazyLock;

use regex::Regex;

/// Estimates one criterion's score from judge reasoning.
pub trait CriterionScorer: Send + Sync {
    /// `None` means the reasoning says nothing usable about `criterion`.
    fn score(&self, criterion: &str, reasoning: &str) -> Option<f64>;
}

pub const POSITIVE_INDICATORS: [&str; 7] =
    ["meets", "satisfies", "correct", "relevant", "coherent", "good", "excellent"];
pub const NEGATIVE_INDICATORS: [&str; 6] =
    ["incorrect", "irrelevant", "incoherent", "poor", "fails", "does not meet"];

static NEXT_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\s*\w+:").expect("heading pattern is valid"));

/// Scores a criterion by counting indicator words in its numbered section.
///
/// The section starts after the first `<n>. <criterion>` (case-insensitive)
/// and ends before the next `<n>. <word>:` heading or at the end of the text.
/// Each indicator that occurs in the section counts once, matched as a
/// case-insensitive substring, so `incorrect` also counts as `correct`.
/// More positive than negative indicators gives 1.0; anything else,
/// including no indicators at all, gives 0.0.
#[derive(Debug, Clone)]
pub struct IndicatorHeuristic {
    positive: Vec<String>,
    negative: Vec<String>,
}

impl Default for IndicatorHeuristic {
    fn default() -> Self {
        Self::new(POSITIVE_INDICATORS, NEGATIVE_INDICATORS)
    }
}

impl IndicatorHeuristic {
    pub fn new<P, N>(positive: P, negative: N) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        let lower = |s: &str| s.to_lowercase();
        Self {
            positive: positive.into_iter().map(|s| lower(s.as_ref())).collect(),
            negative: negative.into_iter().map(|s| lower(s.as_ref())).collect(),
        }
    }

    /// The section of `reasoning` about `criterion`, if it has a numbered heading.
    pub fn section<'a>(&self, criterion: &str, reasoning: &'a str) -> Option<&'a str> {
        if !reasoning.to_lowercase().contains(&criterion.to_lowercase()) {
            return None;
        }
        let heading = Regex::new(&format!(r"(?i)\d+\.\s*{}", regex::escape(criterion))).ok()?;
        let start = heading.find(reasoning)?.end();
        let rest = &reasoning[start..];
        let end = NEXT_HEADING_RE.find(rest).map_or(rest.len(), |m| m.start());
        Some(rest[..end].trim())
    }

    fn count(indicators: &[String], text: &str) -> usize {
        indicators.iter().filter(|ind| text.contains(ind.as_str())).count()
    }
}

impl CriterionScorer for IndicatorHeuristic {
    fn score(&self, criterion: &str, reasoning: &str) -> Option<f64> {
        let section = self.section(criterion, reasoning)?.to_lowercase();
        let positive = Self::count(&self.positive, &section);
        let negative = Self::count(&self.negative, &section);
        Some(if positive > negative { 1.0 } else { 0.0 })
    }
}
