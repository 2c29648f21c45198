use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info};

use crate::client::CompletionService;
use crate::models::SectionContent;

/// Generates section text, one prompt per section.
///
/// Stateless request/response: a failed generation call never aborts the
/// surrounding iteration, it yields a sentinel string naming the failure.
pub struct SectionGenerator {
    service: Arc<dyn CompletionService>,
}

impl SectionGenerator {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    /// Generate one section. Non-empty `feedback` is prepended as a revision
    /// directive.
    pub async fn generate_section(&self, title: &str, section: &str, feedback: &str) -> String {
        let prompt = build_section_prompt(title, section, feedback);
        match self.service.complete(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                error!(section, error = %e, "section generation failed");
                format!("[Error generating content: {e}]")
            }
        }
    }

    /// Generate every section, in the given order. Sections absent from the
    /// feedback map are generated without a feedback directive.
    pub async fn generate_all_sections(
        &self,
        title: &str,
        sections: &[String],
        feedback: &HashMap<String, String>,
    ) -> SectionContent {
        let mut content = SectionContent::new();
        for section in sections {
            info!(section, "generating section");
            let section_feedback = feedback.get(section).map(String::as_str).unwrap_or("");
            let text = self
                .generate_section(title, section, section_feedback)
                .await;
            content.insert(section.clone(), text);
        }
        content
    }
}

fn build_section_prompt(title: &str, section: &str, feedback: &str) -> String {
    let feedback_block = if feedback.is_empty() {
        String::new()
    } else {
        format!(
            "Previous Feedback (use this to improve):\n{feedback}\n\nIMPORTANT: Continue to write in plain text without markdown formatting.\n"
        )
    };

    format!(
        r#"You are an expert academic writer. Write high-quality research paper content in plain text.

Paper Title: {title}
Section: {section}

{feedback_block}
CRITICAL FORMATTING REQUIREMENTS:
- Write in plain text WITHOUT any markdown formatting
- Do NOT use **bold**, *italic*, __underline__, or any markdown syntax
- Do NOT use bullet points with *, -, or + symbols
- Do NOT use # headers or other markdown elements
- Write in complete, flowing paragraphs
- Use proper academic prose with clear topic sentences
- Separate paragraphs with a single blank line
- Use transitions like "Furthermore," "However," "Moreover," etc.

SPECIAL REQUIREMENTS FOR REFERENCES SECTION:
If the section is "References" or "Bibliography":
- Format each reference as a numbered citation: [1], [2], [3], etc.
- Each reference must start on a new line with the number in square brackets
- Follow this exact format for each entry:
  [1] Author(s). Title. Publication. Year.
  [2] Author(s). Title. Publication. Year.
- Include 10-15 relevant academic references
- Use proper citation format (author, title, journal/conference, pages, year)
- Do NOT write references as paragraphs or prose

Write a comprehensive, well-researched section that is:
- Academically rigorous and properly structured
- Clear and coherent with smooth transitions
- Factually accurate with logical arguments
- Professional and readable
- Written entirely in plain text format

Section Content:"#
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    struct RecordingService {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingService {
        fn new(fail: bool) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl CompletionService for RecordingService {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                anyhow::bail!("model unavailable");
            }
            Ok("  Generated text.  ".to_string())
        }
    }

    #[tokio::test]
    async fn generates_sections_in_order_with_trimmed_text() {
        let service = Arc::new(RecordingService::new(false));
        let generator = SectionGenerator::new(service.clone());

        let sections = vec!["Abstract".to_string(), "Methods".to_string()];
        let content = generator
            .generate_all_sections("T", &sections, &HashMap::new())
            .await;

        let names: Vec<&str> = content.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Abstract", "Methods"]);
        assert_eq!(content.get("Abstract"), Some("Generated text."));
    }

    #[tokio::test]
    async fn feedback_is_prepended_only_when_present() {
        let service = Arc::new(RecordingService::new(false));
        let generator = SectionGenerator::new(service.clone());

        let mut feedback = HashMap::new();
        feedback.insert("Methods".to_string(), "Add detail on sampling.".to_string());

        let sections = vec!["Abstract".to_string(), "Methods".to_string()];
        generator.generate_all_sections("T", &sections, &feedback).await;

        let prompts = service.prompts.lock().unwrap();
        assert!(!prompts[0].contains("Previous Feedback"));
        assert!(prompts[1].contains("Previous Feedback (use this to improve):"));
        assert!(prompts[1].contains("Add detail on sampling."));
    }

    #[tokio::test]
    async fn service_failure_yields_sentinel_text() {
        let generator = SectionGenerator::new(Arc::new(RecordingService::new(true)));
        let text = generator.generate_section("T", "Methods", "").await;
        assert!(text.starts_with("[Error generating content:"));
        assert!(text.contains("model unavailable"));
    }
}
