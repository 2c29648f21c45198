pub mod client;
pub mod error;
pub mod evaluator;
pub mod generator;
pub mod latex;
pub mod models;
pub mod scoring;
pub mod storage;
pub mod workflow;

// Re-export commonly used types
pub use client::CompletionService;
#[cfg(feature = "rig")]
pub use client::OpenRouterCompletion;
pub use error::{Result, WorkflowError};
pub use evaluator::PaperEvaluator;
pub use generator::SectionGenerator;
pub use latex::LatexConverter;
pub use models::{
    PaperEvaluation, PaperRequest, SectionContent, SectionEvaluation, WorkflowResult,
};
pub use scoring::{DegradeReason, ParsedEvaluation, parse_evaluation};
pub use storage::{InMemoryJobStore, Job, JobStatus, JobStore};
pub use workflow::{PaperWorkflow, ProgressReporter};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;

    struct FixedService {
        response: String,
    }

    #[async_trait]
    impl CompletionService for FixedService {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn end_to_end_abstract_then_introduction() {
        let generation = Arc::new(FixedService {
            response: "Generated section text.".to_string(),
        });
        let scoring = Arc::new(FixedService {
            response: "RELEVANCE: 8\nCOHERENCE: 8\nFACTUALITY: 8\nREADABILITY: 8\nTOTAL: 32\nFEEDBACK: fine".to_string(),
        });
        let workflow = PaperWorkflow::new(generation, scoring);

        let request = PaperRequest {
            title: "T".to_string(),
            sections: vec!["Abstract".to_string(), "Introduction".to_string()],
            feedback: None,
            threshold: 0,
            max_iterations: 3,
        };

        let result = workflow.run(&request).await.unwrap();

        assert_eq!(result.iterations, 1);
        assert!(result.threshold_met);
        assert_eq!(result.total_score, 64);

        // Abstract block, then page break, then Introduction heading.
        let abstract_pos = result.latex.find("\\begin{abstract}").unwrap();
        let newpage_pos = result.latex.find("\\newpage").unwrap();
        let intro_pos = result.latex.find("\\section{Introduction}").unwrap();
        assert!(abstract_pos < newpage_pos);
        assert!(newpage_pos < intro_pos);
    }

    #[tokio::test]
    async fn degraded_scoring_still_produces_a_result() {
        let generation = Arc::new(FixedService {
            response: "Generated section text.".to_string(),
        });
        let scoring = Arc::new(FixedService {
            response: "not a protocol response".to_string(),
        });
        let workflow = PaperWorkflow::new(generation, scoring);

        let request = PaperRequest {
            title: "T".to_string(),
            sections: vec!["Methods".to_string()],
            feedback: None,
            threshold: 10,
            max_iterations: 2,
        };

        let result = workflow.run(&request).await.unwrap();

        assert_eq!(result.iterations, 2);
        assert!(!result.threshold_met);
        assert_eq!(result.total_score, 0);
        assert_eq!(
            result.evaluations.get("Methods").unwrap().feedback,
            "not a protocol response"
        );
    }
}
