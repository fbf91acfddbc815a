//! Prompt construction for AI-augmented conflict analysis

use crate::discovery::{AnalyzedTool, ToolOrigin};
use crate::pattern::PatternTable;
use crate::util::truncate_str;

/// Total prompt size in characters
pub const DEFAULT_PROMPT_BUDGET: usize = 12_000;
/// Per-tool documentation excerpt size in characters
pub const DEFAULT_EXCERPT_BUDGET: usize = 1_000;

const SECTION_KEYWORDS: [&str; 8] = [
    "install",
    "setup",
    "config",
    "usage",
    "quick",
    "start",
    "port",
    "environment",
];
const CONTEXT_LINES: usize = 10;
const FALLBACK_LINES: usize = 20;
const EXCERPT_LABEL: &str = "Key documentation excerpt:\n";
// label, trailing "..." and blank line around each excerpt
const EXCERPT_OVERHEAD: usize = EXCERPT_LABEL.len() + 5;

/// Size limits for the batched analysis prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBudget {
    pub total_chars: usize,
    pub excerpt_chars: usize,
}

impl Default for PromptBudget {
    fn default() -> Self {
        Self {
            total_chars: DEFAULT_PROMPT_BUDGET,
            excerpt_chars: DEFAULT_EXCERPT_BUDGET,
        }
    }
}

/// Pull the setup-relevant parts out of a README.
///
/// Keeps lines that mention install/setup/config/usage/port/environment plus
/// the ten lines after each; falls back to the first twenty lines.
pub fn extract_excerpt(readme: &str, max_chars: usize) -> String {
    let lines: Vec<&str> = readme.lines().collect();
    let mut picked = Vec::new();
    let mut capture = 0usize;

    for line in &lines {
        let lower = line.to_lowercase();
        if SECTION_KEYWORDS.iter().any(|k| lower.contains(k)) {
            capture = CONTEXT_LINES;
            picked.push(*line);
        } else if capture > 0 {
            picked.push(*line);
            capture -= 1;
        }
    }

    if picked.is_empty() {
        picked = lines.into_iter().take(FALLBACK_LINES).collect();
    }

    let excerpt = picked.join("\n");
    if excerpt.len() > max_chars {
        format!("{}...", truncate_str(&excerpt, max_chars))
    } else {
        excerpt
    }
}

/// Prompt templates for conflict synthesis
pub struct AnalysisPrompt;

impl AnalysisPrompt {
    pub fn system() -> &'static str {
        r#"You are an expert AI engineer specializing in tool integration and conflict analysis.
You predict concrete problems that occur when the given tools are installed and run together.
Only report conflicts that would actually cause problems for users.
Answer with JSON only."#
    }

    /// Build the single batched user prompt.
    ///
    /// `docs[i]` is the documentation for `tools[i]`; missing entries are
    /// reported as unavailable. Excerpts shrink evenly when the tool list
    /// would overflow the total budget.
    pub fn build(
        tools: &[AnalyzedTool],
        table: &PatternTable,
        docs: &[Option<String>],
        budget: PromptBudget,
    ) -> String {
        let header = Self::header();
        let footer = Self::footer();
        let fixed = header.len() + footer.len();

        let summaries: Vec<String> = tools
            .iter()
            .enumerate()
            .map(|(i, tool)| Self::tool_summary(i, tool, table))
            .collect();
        let summary_len: usize = summaries.iter().map(String::len).sum();

        let remaining = budget
            .total_chars
            .saturating_sub(fixed + summary_len + tools.len() * EXCERPT_OVERHEAD);
        let per_excerpt = if tools.is_empty() {
            0
        } else {
            (remaining / tools.len()).min(budget.excerpt_chars)
        };

        let mut prompt = String::with_capacity(budget.total_chars);
        prompt.push_str(&header);
        for (i, summary) in summaries.iter().enumerate() {
            prompt.push_str(summary);
            let excerpt = match docs.get(i).and_then(|d| d.as_deref()) {
                Some(readme) if !readme.trim().is_empty() => extract_excerpt(readme, per_excerpt),
                _ => "No documentation available".to_string(),
            };
            prompt.push_str(EXCERPT_LABEL);
            prompt.push_str(&excerpt);
            prompt.push_str("\n\n");
        }
        prompt.push_str(&footer);

        truncate_str(&prompt, budget.total_chars).to_string()
    }

    fn header() -> String {
        "Analyze the following tools and identify conflicts that occur when they are used together.\n\n"
            .to_string()
    }

    fn tool_summary(index: usize, tool: &AnalyzedTool, table: &PatternTable) -> String {
        let profile = table.profile(&tool.tool_key);
        let origin = match tool.origin {
            ToolOrigin::Detected => "already present",
            ToolOrigin::Planned => "planned",
            ToolOrigin::Both => "present, upgrade planned",
        };

        let mut summary = format!(
            "=== TOOL {} ===\nTool: {} (key: {})\nStatus: {}",
            index + 1,
            tool.display_name,
            tool.tool_key,
            origin
        );
        if let Some(status) = tool.status {
            summary.push_str(&format!(", {}", status));
        }
        summary.push('\n');

        if let Some(category) = profile.and_then(|p| p.category.as_deref()) {
            summary.push_str(&format!("Category: {}\n", category));
        }

        let ports: Vec<String> = match tool.port {
            Some(port) => vec![port.to_string()],
            None => profile
                .map(|p| p.default_ports.iter().map(u16::to_string).collect())
                .unwrap_or_default(),
        };
        if !ports.is_empty() {
            summary.push_str(&format!("Ports: {}\n", ports.join(", ")));
        }

        if let Some(p) = profile
            && !p.env_vars.is_empty()
        {
            let vars: Vec<&str> = p.env_vars.iter().map(|e| e.name.as_str()).collect();
            summary.push_str(&format!("Environment variables: {}\n", vars.join(", ")));
        }
        summary
    }

    fn footer() -> String {
        r#"Respond with a JSON object of this shape:

{
  "conflicts": [
    {
      "type": "port_conflict|dependency_conflict|functionality_overlap|resource_competition|environment_conflict",
      "severity": "high|medium|low",
      "tools_involved": ["tool key or name", "tool key or name"],
      "description": "What goes wrong",
      "mitigation": "Concrete fix or workaround",
      "confidence": "high|medium|low"
    }
  ],
  "compatible_combinations": [
    {
      "tools": ["tool key or name", "tool key or name"],
      "reason": "Why these work well together"
    }
  ],
  "recommendations": ["Advice for using these tools together"],
  "overall_assessment": "One or two sentences on the combination as a whole"
}

Every conflict and combination must involve at least two of the tools listed above.
Use an empty "conflicts" array if the tools are compatible."#
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::ToolProfile;

    fn tool(key: &str) -> AnalyzedTool {
        AnalyzedTool {
            tool_key: key.to_string(),
            display_name: key.to_string(),
            origin: ToolOrigin::Planned,
            status: None,
            confidence: None,
            port: None,
            github_url: None,
        }
    }

    #[test]
    fn test_excerpt_picks_setup_sections() {
        let readme = "# Title\nintro\n## Installation\npip install foo\n\n## License\nMIT";
        let excerpt = extract_excerpt(readme, 1000);
        assert!(excerpt.starts_with("## Installation"));
        assert!(excerpt.contains("pip install foo"));
        assert!(!excerpt.contains("intro"));
    }

    #[test]
    fn test_excerpt_fallback_first_lines() {
        let readme: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        let excerpt = extract_excerpt(&readme, 10_000);
        assert_eq!(excerpt.lines().count(), 20);
        assert!(excerpt.ends_with("line 19"));
    }

    #[test]
    fn test_excerpt_truncated() {
        let readme = format!("## Setup\n{}", "x".repeat(5000));
        let excerpt = extract_excerpt(&readme, 100);
        assert!(excerpt.len() <= 103);
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn test_build_respects_budget() {
        let table = PatternTable::new(
            "t",
            vec![ToolProfile::new("a").with_default_port(8501)],
            vec![],
        )
        .unwrap();
        let tools: Vec<_> = (0..5).map(|i| tool(&format!("tool{}", i))).collect();
        let docs: Vec<_> = (0..5)
            .map(|_| Some(format!("## Usage\n{}", "word ".repeat(2000))))
            .collect();
        let budget = PromptBudget {
            total_chars: 3000,
            excerpt_chars: 1000,
        };
        let prompt = AnalysisPrompt::build(&tools, &table, &docs, budget);
        assert!(prompt.len() <= 3000);
        assert!(prompt.contains("=== TOOL 5 ==="));
    }

    #[test]
    fn test_build_lists_ports_and_missing_docs() {
        let table = PatternTable::new(
            "t",
            vec![ToolProfile::new("streamlit").with_default_port(8501)],
            vec![],
        )
        .unwrap();
        let mut gradio = tool("gradio");
        gradio.port = Some(8501);
        let prompt = AnalysisPrompt::build(
            &[tool("streamlit"), gradio],
            &table,
            &[None],
            PromptBudget::default(),
        );
        assert_eq!(prompt.matches("Ports: 8501").count(), 2);
        assert_eq!(prompt.matches("No documentation available").count(), 2);
        assert!(prompt.contains("\"conflicts\""));
    }
}
