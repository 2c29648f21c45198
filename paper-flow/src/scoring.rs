//! Parser for the fixed textual scoring protocol:
//!
//! ```text
//! RELEVANCE: <int>
//! COHERENCE: <int>
//! FACTUALITY: <int>
//! READABILITY: <int>
//! TOTAL: <int>
//! FEEDBACK: <rest of text>
//! ```
//!
//! Labels are case-insensitive and matched anywhere in the text; only the
//! first occurrence of each counts. The parser never fails: anything it
//! cannot read degrades to zeros with a reason code.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::SectionEvaluation;

static RELEVANCE_RE: LazyLock<Regex> = LazyLock::new(|| score_pattern("RELEVANCE"));
static COHERENCE_RE: LazyLock<Regex> = LazyLock::new(|| score_pattern("COHERENCE"));
static FACTUALITY_RE: LazyLock<Regex> = LazyLock::new(|| score_pattern("FACTUALITY"));
static READABILITY_RE: LazyLock<Regex> = LazyLock::new(|| score_pattern("READABILITY"));
static TOTAL_RE: LazyLock<Regex> = LazyLock::new(|| score_pattern("TOTAL"));
static FEEDBACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)FEEDBACK:\s*(.+)").unwrap());

fn score_pattern(label: &str) -> Regex {
    Regex::new(&format!(r"(?i){label}:\s*(\d+)")).unwrap()
}

/// Why a parse produced a degraded evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradeReason {
    /// None of the protocol labels were found; the raw text became the
    /// feedback and every score defaulted to zero.
    NoLabels,
    /// At least one sub-score label was missing and defaulted to zero.
    MissingScores,
}

/// Outcome of parsing a scoring response. Always carries a usable
/// [`SectionEvaluation`]; `degraded` tells the caller how much of the
/// protocol was actually present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEvaluation {
    pub evaluation: SectionEvaluation,
    pub degraded: Option<DegradeReason>,
}

fn first_score(re: &Regex, text: &str) -> Option<i32> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse a raw scoring response into a [`ParsedEvaluation`].
pub fn parse_evaluation(raw: &str) -> ParsedEvaluation {
    let relevance = first_score(&RELEVANCE_RE, raw);
    let coherence = first_score(&COHERENCE_RE, raw);
    let factuality = first_score(&FACTUALITY_RE, raw);
    let readability = first_score(&READABILITY_RE, raw);
    let total = first_score(&TOTAL_RE, raw);
    let feedback = FEEDBACK_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string());

    let any_label = relevance.is_some()
        || coherence.is_some()
        || factuality.is_some()
        || readability.is_some()
        || total.is_some()
        || feedback.is_some();

    if !any_label {
        return ParsedEvaluation {
            evaluation: SectionEvaluation::zero(raw),
            degraded: Some(DegradeReason::NoLabels),
        };
    }

    let missing_scores = relevance.is_none()
        || coherence.is_none()
        || factuality.is_none()
        || readability.is_none();

    let relevance = relevance.unwrap_or(0);
    let coherence = coherence.unwrap_or(0);
    let factuality = factuality.unwrap_or(0);
    let readability = readability.unwrap_or(0);
    // An explicit TOTAL is taken verbatim even when it disagrees with the
    // sub-score sum; the sum is only the fallback. Saturating: the response
    // text is untrusted and may carry arbitrarily large scores.
    let total = total.unwrap_or_else(|| {
        relevance
            .saturating_add(coherence)
            .saturating_add(factuality)
            .saturating_add(readability)
    });

    ParsedEvaluation {
        evaluation: SectionEvaluation {
            relevance,
            coherence,
            factuality,
            readability,
            total,
            feedback: feedback.unwrap_or_default(),
        },
        degraded: missing_scores.then_some(DegradeReason::MissingScores),
    }
}
