use std::sync::Arc;

use tracing::{error, info, warn};

use crate::client::CompletionService;
use crate::models::{PaperEvaluation, SectionContent, SectionEvaluation};
use crate::scoring::parse_evaluation;

/// Scores section text, one prompt per section.
///
/// A failed scoring call degrades to an all-zero evaluation whose feedback
/// names the failure; a malformed scoring response degrades inside the
/// parser. Neither aborts the run.
pub struct PaperEvaluator {
    service: Arc<dyn CompletionService>,
}

impl PaperEvaluator {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    pub async fn evaluate_section(
        &self,
        title: &str,
        section: &str,
        content: &str,
    ) -> SectionEvaluation {
        let prompt = build_review_prompt(title, section, content);
        match self.service.complete(&prompt).await {
            Ok(response) => {
                let parsed = parse_evaluation(&response);
                if let Some(reason) = parsed.degraded {
                    warn!(section, ?reason, "scoring response did not match protocol");
                }
                parsed.evaluation
            }
            Err(e) => {
                error!(section, error = %e, "section evaluation failed");
                SectionEvaluation::zero(format!("Evaluation error: {e}"))
            }
        }
    }

    /// Evaluate every section in map order. Returns the per-section
    /// evaluations and the paper-level total, which is always the sum of the
    /// section totals.
    pub async fn evaluate_paper(
        &self,
        title: &str,
        content: &SectionContent,
    ) -> (PaperEvaluation, i32) {
        let mut evaluations = PaperEvaluation::new();
        for (section, text) in content.iter() {
            info!(section, "evaluating section");
            let evaluation = self.evaluate_section(title, section, text).await;
            evaluations.insert(section, evaluation);
        }
        let total = evaluations.total_score();
        (evaluations, total)
    }
}

fn build_review_prompt(title: &str, section: &str, content: &str) -> String {
    format!(
        r#"You are an expert academic reviewer. Evaluate the following research paper section.

Paper Title: {title}
Section: {section}

Content:
{content}

Evaluate the content based on these criteria (score 0-10 for each):

1. RELEVANCE: How relevant is the content to the section topic?
2. COHERENCE: How well-structured and logically flowing is the content?
3. FACTUALITY: How accurate and well-supported are the claims?
4. READABILITY: How clear and accessible is the writing?

Provide your evaluation in this EXACT format:
RELEVANCE: [score]
COHERENCE: [score]
FACTUALITY: [score]
READABILITY: [score]
TOTAL: [sum of all scores]
FEEDBACK: [Detailed feedback on what needs improvement. Be specific about weaknesses and how to address them.]"#
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    struct ScriptedService {
        responses: Mutex<Vec<anyhow::Result<String>>>,
    }

    impl ScriptedService {
        fn new(responses: Vec<anyhow::Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedService {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                anyhow::bail!("no scripted response left");
            }
            responses.remove(0)
        }
    }

    fn score_text(total: i32, feedback: &str) -> String {
        format!(
            "RELEVANCE: 8\nCOHERENCE: 8\nFACTUALITY: 8\nREADABILITY: 8\nTOTAL: {total}\nFEEDBACK: {feedback}"
        )
    }

    #[tokio::test]
    async fn paper_total_sums_section_totals() {
        let service = Arc::new(ScriptedService::new(vec![
            Ok(score_text(30, "good")),
            Ok(score_text(25, "fair")),
        ]));
        let evaluator = PaperEvaluator::new(service);

        let content: SectionContent = [
            ("Abstract".to_string(), "text".to_string()),
            ("Methods".to_string(), "text".to_string()),
        ]
        .into_iter()
        .collect();

        let (evaluations, total) = evaluator.evaluate_paper("T", &content).await;
        assert_eq!(total, 55);
        assert_eq!(evaluations.get("Abstract").unwrap().feedback, "good");
        assert_eq!(evaluations.get("Methods").unwrap().feedback, "fair");
    }

    #[tokio::test]
    async fn service_failure_degrades_to_zero_evaluation() {
        let service = Arc::new(ScriptedService::new(vec![Err(anyhow::anyhow!(
            "timeout"
        ))]));
        let evaluator = PaperEvaluator::new(service);

        let evaluation = evaluator.evaluate_section("T", "Methods", "text").await;
        assert_eq!(evaluation.total, 0);
        assert!(evaluation.feedback.contains("timeout"));
    }

    #[tokio::test]
    async fn malformed_response_keeps_raw_text_as_feedback() {
        let service = Arc::new(ScriptedService::new(vec![Ok(
            "Sorry, I cannot score this.".to_string()
        )]));
        let evaluator = PaperEvaluator::new(service);

        let evaluation = evaluator.evaluate_section("T", "Methods", "text").await;
        assert_eq!(evaluation.total, 0);
        assert_eq!(evaluation.feedback, "Sorry, I cannot score this.");
    }
}
