use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

fn default_threshold() -> i32 {
    32
}

fn default_max_iterations() -> u32 {
    3
}

/// A request to generate one paper. Immutable once a run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRequest {
    pub title: String,
    /// Section names in the order they should appear in the paper.
    pub sections: Vec<String>,
    /// Optional initial feedback, applied to every section on the first pass.
    #[serde(default)]
    pub feedback: Option<String>,
    /// Minimum acceptable paper-level score to stop iterating.
    #[serde(default = "default_threshold")]
    pub threshold: i32,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

/// Ordered section name -> text mapping.
///
/// Preserves insertion order for document assembly; inserting an existing
/// name replaces the text in place, so duplicate section names collapse the
/// way they would in the JSON objects this serializes to.
#[derive(Debug, Clone, Default)]
pub struct SectionContent {
    entries: Vec<(String, String)>,
}

impl SectionContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let name = name.into();
        let text = text.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = text,
            None => self.entries.push((name, text)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for SectionContent {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut content = Self::new();
        for (name, text) in iter {
            content.insert(name, text);
        }
        content
    }
}

impl Serialize for SectionContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, text) in &self.entries {
            map.serialize_entry(name, text)?;
        }
        map.end()
    }
}

/// Scores and feedback for a single section in one iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionEvaluation {
    pub relevance: i32,
    pub coherence: i32,
    pub factuality: i32,
    pub readability: i32,
    /// Reported by the scoring service; only computed locally when absent
    /// from the response.
    pub total: i32,
    pub feedback: String,
}

impl SectionEvaluation {
    /// All-zero evaluation carrying the given text as feedback.
    pub fn zero(feedback: impl Into<String>) -> Self {
        Self {
            relevance: 0,
            coherence: 0,
            factuality: 0,
            readability: 0,
            total: 0,
            feedback: feedback.into(),
        }
    }
}

/// Per-section evaluations for one iteration, in section order.
#[derive(Debug, Clone, Default)]
pub struct PaperEvaluation {
    entries: Vec<(String, SectionEvaluation)>,
}

impl PaperEvaluation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, evaluation: SectionEvaluation) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = evaluation,
            None => self.entries.push((name, evaluation)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SectionEvaluation> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SectionEvaluation)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e))
    }

    /// Paper-level total: always the sum of the section totals present here,
    /// never taken from upstream. Saturating, since section totals are
    /// reported verbatim and may be arbitrarily large.
    pub fn total_score(&self) -> i32 {
        self.entries
            .iter()
            .map(|(_, e)| e.total)
            .fold(0, i32::saturating_add)
    }
}

impl Serialize for PaperEvaluation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, evaluation) in &self.entries {
            map.serialize_entry(name, evaluation)?;
        }
        map.end()
    }
}

/// Final artifact bundle of one workflow run. Created once, at termination.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub title: String,
    pub sections: SectionContent,
    pub evaluations: PaperEvaluation,
    pub total_score: i32,
    /// Iterations actually performed (1..=max_iterations).
    pub iterations: u32,
    pub threshold_met: bool,
    pub latex: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_content_preserves_order_and_collapses_duplicates() {
        let mut content = SectionContent::new();
        content.insert("Abstract", "a");
        content.insert("Introduction", "b");
        content.insert("Abstract", "c");

        let names: Vec<&str> = content.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Abstract", "Introduction"]);
        assert_eq!(content.get("Abstract"), Some("c"));
        assert_eq!(content.len(), 2);
    }

    #[test]
    fn section_content_serializes_as_ordered_object() {
        let content: SectionContent = [
            ("Introduction".to_string(), "intro".to_string()),
            ("Methods".to_string(), "methods".to_string()),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&content).unwrap();
        assert_eq!(json, r#"{"Introduction":"intro","Methods":"methods"}"#);
    }

    #[test]
    fn paper_total_is_recomputed_from_section_totals() {
        let mut evaluation = PaperEvaluation::new();
        evaluation.insert(
            "Introduction",
            SectionEvaluation {
                relevance: 8,
                coherence: 8,
                factuality: 8,
                readability: 8,
                // Deliberately disagrees with the sub-score sum; trusted as-is
                // per section but summed per paper.
                total: 35,
                feedback: String::new(),
            },
        );
        evaluation.insert("Methods", SectionEvaluation::zero("weak"));

        assert_eq!(evaluation.total_score(), 35);
    }

    #[test]
    fn paper_total_saturates_on_huge_section_totals() {
        let mut evaluation = PaperEvaluation::new();
        for name in ["Introduction", "Methods"] {
            let mut section = SectionEvaluation::zero("");
            section.total = i32::MAX;
            evaluation.insert(name, section);
        }

        assert_eq!(evaluation.total_score(), i32::MAX);
    }

    #[test]
    fn request_defaults_apply_on_deserialize() {
        let request: PaperRequest =
            serde_json::from_str(r#"{"title":"T","sections":["Abstract"]}"#).unwrap();
        assert_eq!(request.threshold, 32);
        assert_eq!(request.max_iterations, 3);
        assert!(request.feedback.is_none());
    }
}
