//! Converts loosely-markdown section text into a LaTeX document.
//!
//! The markdown cleanup runs as an ordered list of rewrite rules so the
//! sequencing (emphasis strip before heading demotion before list
//! detection) is explicit rather than an accident of code layout.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::SectionContent;

struct RewriteRule {
    name: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

/// Inline cleanup rules, applied in order to every section body.
static INLINE_RULES: LazyLock<Vec<RewriteRule>> = LazyLock::new(|| {
    let rule = |name, pattern, replacement| RewriteRule {
        name,
        pattern: Regex::new(pattern).unwrap(),
        replacement,
    };
    vec![
        // Emphasis is stripped to plain runs; bold before italic so the
        // doubled delimiters are consumed first.
        rule("strip-bold-stars", r"\*\*(.+?)\*\*", "$1"),
        rule("strip-bold-underscores", r"__(.+?)__", "$1"),
        rule("strip-italic-stars", r"\*([^*\n]+)\*", "$1"),
        rule("strip-italic-underscores", r"_([^_\n]+)_", "$1"),
        // Heading markers that leaked into body text become nested heading
        // commands, deepest first.
        rule("demote-h3", r"(?m)^###\s+(.+)$", "\\subsubsection{${1}}"),
        rule("demote-h2", r"(?m)^##\s+(.+)$", "\\subsection{${1}}"),
        rule("demote-h1", r"(?m)^#\s+(.+)$", "\\section{${1}}"),
    ]
});

static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[*\-+]\s+").unwrap());
static MULTI_BLANK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static MULTI_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());
static REF_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\d+\]").unwrap());

/// Fixed preamble emitted into every document.
static PREAMBLE: &[&str] = &[
    "\\usepackage[utf8]{inputenc}",
    "\\usepackage[T1]{fontenc}",
    "\\usepackage{amsmath}",
    "\\usepackage{graphicx}",
    "\\usepackage{hyperref}",
    "\\usepackage{cite}",
    "\\usepackage{geometry}",
    "\\geometry{a4paper, margin=1in}",
    "\\usepackage{setspace}",
    "\\setstretch{1.15}",
    "\\usepackage{titlesec}",
    "% Format section titles",
    "\\titleformat{\\section}{\\normalfont\\Large\\bfseries}{\\thesection}{1em}{}",
    "\\titleformat{\\subsection}{\\normalfont\\large\\bfseries}{\\thesubsection}{1em}{}",
    "\\titleformat{\\subsubsection}{\\normalfont\\normalsize\\bfseries}{\\thesubsubsection}{1em}{}",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Abstract,
    Bibliography,
    Introduction,
    Plain,
}

fn classify(name: &str) -> SectionKind {
    if name.eq_ignore_ascii_case("abstract") {
        SectionKind::Abstract
    } else if name.eq_ignore_ascii_case("references") || name.eq_ignore_ascii_case("bibliography") {
        SectionKind::Bibliography
    } else if name.eq_ignore_ascii_case("introduction") {
        SectionKind::Introduction
    } else {
        SectionKind::Plain
    }
}

fn is_heading_command(line: &str) -> bool {
    line.starts_with("\\section")
        || line.starts_with("\\subsection")
        || line.starts_with("\\subsubsection")
}

fn is_list_block(block: &str) -> bool {
    block.contains("\\begin{itemize}")
        || block.contains("\\end{itemize}")
        || block.contains("\\item")
}

/// Converts section text to LaTeX and assembles the full document.
pub struct LatexConverter {
    document_class: &'static str,
}

impl Default for LatexConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl LatexConverter {
    pub fn new() -> Self {
        Self {
            document_class: "article",
        }
    }

    /// Strip markdown artifacts: inline rules, bullet-list conversion,
    /// blank-line and space collapsing.
    fn clean_markup(&self, text: &str) -> String {
        let mut text = text.to_string();
        for rule in INLINE_RULES.iter() {
            tracing::trace!(rule = rule.name, "applying rewrite rule");
            text = rule.pattern.replace_all(&text, rule.replacement).into_owned();
        }
        let text = convert_bullet_lists(&text);
        let text = MULTI_BLANK_RE.replace_all(&text, "\n\n");
        let text = MULTI_SPACE_RE.replace_all(&text, " ");
        text.trim().to_string()
    }

    /// Reflow cleaned text into paragraphs: single line breaks collapse to
    /// spaces outside list blocks, heading command lines pass through
    /// verbatim, and every paragraph after the first gets explicit
    /// no-indent spacing.
    fn format_body(&self, section_name: &str, cleaned: &str) -> String {
        // Drop sub-headings that just repeat the enclosing section's name.
        let escaped = regex::escape(section_name);
        let duplicate_heading =
            Regex::new(&format!(r"(?i)\\(?:subsection|subsubsection)\{{{escaped}\}}\s*\n*"))
                .unwrap();
        let content = duplicate_heading.replace_all(cleaned, "");

        let mut paragraphs: Vec<String> = Vec::new();
        for block in content.split("\n\n") {
            let trimmed = block.trim();
            if trimmed.is_empty() {
                continue;
            }
            // A bare repetition of the section title adds nothing.
            if trimmed.eq_ignore_ascii_case(section_name) {
                continue;
            }
            if is_heading_command(trimmed) {
                paragraphs.push(trimmed.to_string());
                continue;
            }
            let paragraph = if is_list_block(block) {
                block
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n")
            } else {
                block.split_whitespace().collect::<Vec<_>>().join(" ")
            };
            if !paragraph.is_empty() {
                paragraphs.push(paragraph);
            }
        }

        let mut formatted: Vec<String> = Vec::new();
        for (i, paragraph) in paragraphs.iter().enumerate() {
            if i == 0 || paragraph.starts_with('\\') {
                formatted.push(paragraph.clone());
            } else {
                formatted.push(format!("\\vspace{{0.5em}}\n\\noindent {paragraph}"));
            }
        }

        let body = formatted.join("\n\n");
        let body = MULTI_SPACE_RE.replace_all(&body, " ");
        MULTI_BLANK_RE.replace_all(&body, "\n\n").into_owned()
    }

    /// Format one named section, applying the section-level special cases.
    pub fn format_section(&self, name: &str, content: &str) -> String {
        let cleaned = self.clean_markup(content);
        match classify(name) {
            SectionKind::Abstract => format!(
                "\\begin{{abstract}}\n{}\n\\end{{abstract}}\n",
                self.format_body(name, &cleaned)
            ),
            SectionKind::Bibliography => {
                let entries = parse_reference_entries(&cleaned);
                if entries.is_empty() {
                    // No bracket-numbered entries; fall back to prose.
                    format!(
                        "\\section{{{name}}}\n{}\n",
                        self.format_body(name, &cleaned)
                    )
                } else {
                    let items: String = entries
                        .iter()
                        .map(|entry| format!("\\item {entry}\n"))
                        .collect();
                    format!(
                        "\\section{{{name}}}\n\\begin{{enumerate}}\n{items}\\end{{enumerate}}\n"
                    )
                }
            }
            SectionKind::Introduction => format!(
                "\\newpage\n\\section{{{name}}}\n{}\n",
                self.format_body(name, &cleaned)
            ),
            SectionKind::Plain => format!(
                "\\section{{{name}}}\n{}\n",
                self.format_body(name, &cleaned)
            ),
        }
    }

    /// Assemble the complete document. The abstract, if present under any
    /// casing, is emitted first regardless of its input position; remaining
    /// sections keep their input order.
    pub fn convert(
        &self,
        title: &str,
        sections: &SectionContent,
        author: Option<&str>,
        date: Option<&str>,
    ) -> String {
        let author = author.unwrap_or("Author Name");
        let date = date.unwrap_or("\\today");

        let mut lines: Vec<String> = vec![
            format!("\\documentclass{{{}}}", self.document_class),
            String::new(),
            "% Packages".to_string(),
        ];
        lines.extend(PREAMBLE.iter().map(|s| s.to_string()));
        lines.extend([
            String::new(),
            "% Document metadata".to_string(),
            format!("\\title{{{title}}}"),
            format!("\\author{{{author}}}"),
            format!("\\date{{{date}}}"),
            String::new(),
            "\\begin{document}".to_string(),
            String::new(),
            "\\maketitle".to_string(),
            String::new(),
        ]);

        for (name, text) in sections.iter() {
            if classify(name) == SectionKind::Abstract {
                lines.push(self.format_section(name, text));
            }
        }
        for (name, text) in sections.iter() {
            if classify(name) != SectionKind::Abstract {
                lines.push(self.format_section(name, text));
            }
        }

        lines.push("\\end{document}".to_string());
        lines.join("\n")
    }
}

/// Turn contiguous runs of bullet-marked lines into an itemize block. A
/// blank or non-bullet line closes an open block.
fn convert_bullet_lists(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_list = false;

    for line in text.lines() {
        if BULLET_RE.is_match(line) {
            if !in_list {
                lines.push("\\begin{itemize}".to_string());
                in_list = true;
            }
            lines.push(BULLET_RE.replace(line, "\\item ").into_owned());
        } else {
            if in_list {
                lines.push("\\end{itemize}".to_string());
                in_list = false;
            }
            lines.push(line.to_string());
        }
    }
    if in_list {
        lines.push("\\end{itemize}".to_string());
    }

    lines.join("\n")
}

/// Split bibliography text on `[n]` markers into whitespace-normalized
/// entries, bracket numbers stripped. Entries may span multiple lines.
fn parse_reference_entries(text: &str) -> Vec<String> {
    let markers: Vec<_> = REF_MARKER_RE.find_iter(text).collect();
    let mut entries = Vec::new();
    for (i, marker) in markers.iter().enumerate() {
        let end = markers
            .get(i + 1)
            .map(|next| next.start())
            .unwrap_or(text.len());
        let entry = text[marker.end()..end]
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if !entry.is_empty() {
            entries.push(entry);
        }
    }
    entries
}
