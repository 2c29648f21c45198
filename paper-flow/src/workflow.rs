use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::client::CompletionService;
use crate::error::{Result, WorkflowError};
use crate::evaluator::PaperEvaluator;
use crate::generator::SectionGenerator;
use crate::latex::LatexConverter;
use crate::models::{PaperRequest, WorkflowResult};

/// Receives coarse phase updates while a run is in flight. Implementations
/// must not block; slow sinks should hand the message off.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, message: &str);
}

/// Default sink for callers that do not track progress.
struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _message: &str) {}
}

/// Drives the generate -> evaluate -> decide loop for one paper.
///
/// The loop is strictly bounded by `max_iterations` and exits early once the
/// paper-level total reaches the threshold. Per-section service failures are
/// degraded inside the generator and evaluator, so only a structurally
/// invalid request aborts a run.
pub struct PaperWorkflow {
    generator: SectionGenerator,
    evaluator: PaperEvaluator,
    converter: LatexConverter,
}

impl PaperWorkflow {
    pub fn new(
        generation: Arc<dyn CompletionService>,
        scoring: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            generator: SectionGenerator::new(generation),
            evaluator: PaperEvaluator::new(scoring),
            converter: LatexConverter::new(),
        }
    }

    pub async fn run(&self, request: &PaperRequest) -> Result<WorkflowResult> {
        self.run_with_progress(request, &NoProgress).await
    }

    pub async fn run_with_progress(
        &self,
        request: &PaperRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<WorkflowResult> {
        if request.sections.is_empty() {
            return Err(WorkflowError::InvalidRequest(
                "no sections provided".to_string(),
            ));
        }
        if request.max_iterations == 0 {
            return Err(WorkflowError::InvalidRequest(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        info!(
            title = %request.title,
            sections = request.sections.len(),
            threshold = request.threshold,
            max_iterations = request.max_iterations,
            "starting paper workflow"
        );

        // Initial feedback, if supplied, applies to every section equally.
        let mut feedback: HashMap<String, String> = match &request.feedback {
            Some(text) if !text.trim().is_empty() => request
                .sections
                .iter()
                .map(|section| (section.clone(), text.clone()))
                .collect(),
            _ => HashMap::new(),
        };

        let mut iteration = 0u32;
        let mut content = Default::default();
        let mut evaluations = Default::default();
        let mut total_score = 0;

        while iteration < request.max_iterations {
            iteration += 1;
            info!(iteration, "generating sections");
            progress.report(&format!(
                "Generating paper content (iteration {iteration}/{})...",
                request.max_iterations
            ));
            content = self
                .generator
                .generate_all_sections(&request.title, &request.sections, &feedback)
                .await;

            info!(iteration, "evaluating sections");
            let (paper_evaluation, score) =
                self.evaluator.evaluate_paper(&request.title, &content).await;
            evaluations = paper_evaluation;
            total_score = score;

            info!(iteration, total_score, threshold = request.threshold, "iteration scored");

            if total_score >= request.threshold {
                info!(iteration, "score meets threshold");
                break;
            }
            if iteration >= request.max_iterations {
                info!(iteration, "iteration budget exhausted");
                break;
            }

            // Carry each section's critique into the next generation pass.
            feedback = evaluations
                .iter()
                .map(|(name, evaluation)| (name.to_string(), evaluation.feedback.clone()))
                .collect();
        }

        progress.report("Converting to LaTeX...");
        let latex = self.converter.convert(&request.title, &content, None, None);
        let threshold_met = total_score >= request.threshold;

        info!(iterations = iteration, total_score, threshold_met, "workflow complete");

        Ok(WorkflowResult {
            title: request.title.clone(),
            sections: content,
            evaluations,
            total_score,
            iterations: iteration,
            threshold_met,
            latex,
        })
    }
}
