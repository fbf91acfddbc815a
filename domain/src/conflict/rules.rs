//! Static Rule Engine
//!
//! Matches the pattern table against the analyzed tool set, plus two generic
//! rules that need no table entry: equal effective ports and shared
//! environment variables with different meanings.

use super::entities::{Conflict, ConflictSource};
use super::merge::merge_into;
use crate::core::error::DomainError;
use crate::discovery::{AnalyzedTool, DetectedTool, PlannedTool, analyzed_tools};
use crate::pattern::{ConflictKind, ConflictPattern, PatternTable, Severity, TemplateVars, render};
use std::collections::BTreeSet;

/// Pure, synchronous rule evaluation over a loaded pattern table.
pub struct StaticRuleEngine<'a> {
    table: &'a PatternTable,
}

impl<'a> StaticRuleEngine<'a> {
    pub fn new(table: &'a PatternTable) -> Self {
        Self { table }
    }

    pub fn evaluate(
        &self,
        detected: &[DetectedTool],
        planned: &[PlannedTool],
    ) -> Result<Vec<Conflict>, DomainError> {
        self.evaluate_roster(&analyzed_tools(detected, planned))
    }

    /// Evaluate an already-built analyzed tool set.
    ///
    /// Candidates are deduplicated with the conflict identity rule. Generic
    /// rules run first so their concrete descriptions win over pattern text.
    pub fn evaluate_roster(&self, roster: &[AnalyzedTool]) -> Result<Vec<Conflict>, DomainError> {
        let mut candidates = Vec::new();
        candidates.extend(self.port_conflicts(roster)?);
        candidates.extend(self.env_var_conflicts(roster)?);
        candidates.extend(self.pattern_conflicts(roster)?);

        let mut merged = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            merge_into(&mut merged, candidate);
        }
        Ok(merged)
    }

    // ==================== Generic port rule ====================

    /// Explicit port if known, otherwise the profile's default ports
    fn effective_ports(&self, tool: &AnalyzedTool) -> Vec<u16> {
        match tool.port {
            Some(port) => vec![port],
            None => self
                .table
                .profile(&tool.tool_key)
                .map(|p| p.default_ports.clone())
                .unwrap_or_default(),
        }
    }

    fn port_conflicts(&self, roster: &[AnalyzedTool]) -> Result<Vec<Conflict>, DomainError> {
        let ports: Vec<Vec<u16>> = roster.iter().map(|t| self.effective_ports(t)).collect();
        let in_use: BTreeSet<u16> = ports.iter().flatten().copied().collect();

        let mut conflicts = Vec::new();
        for (i, a) in roster.iter().enumerate() {
            for (j, b) in roster.iter().enumerate().skip(i + 1) {
                let Some(port) = ports[i].iter().copied().filter(|p| ports[j].contains(p)).min()
                else {
                    continue;
                };
                let alt_port = next_free_port(port, &in_use);
                conflicts.push(self.port_conflict(a, b, port, alt_port)?);
            }
        }
        Ok(conflicts)
    }

    fn port_conflict(
        &self,
        a: &AnalyzedTool,
        b: &AnalyzedTool,
        port: u16,
        alt_port: Option<u16>,
    ) -> Result<Conflict, DomainError> {
        let name_a = self.name_of(a);
        let name_b = self.name_of(b);
        let description = format!(
            "{} and {} both listen on port {}; only one of them can bind it",
            name_a, name_b, port
        );

        let mitigation = match alt_port {
            Some(alt) => {
                let mut text = format!(
                    "Keep {} on port {} and start {} on port {}",
                    name_a, port, name_b, alt
                );
                if let Some(hint) = self
                    .table
                    .profile(&b.tool_key)
                    .and_then(|p| p.port_hint.as_deref())
                {
                    text.push_str(&format!(" (e.g. `{}`)", hint.replace("{port}", &alt.to_string())));
                }
                text
            }
            None => format!(
                "Run {} and {} on different ports; {} is taken by both",
                name_a, name_b, port
            ),
        };

        Conflict::new(
            ConflictKind::Port,
            vec![a.tool_key.clone(), b.tool_key.clone()],
            Severity::High,
            ConflictKind::Port.baseline_confidence(),
            description,
            mitigation,
            ConflictSource::StaticRule,
        )
    }

    // ==================== Environment variable rule ====================

    /// Variables both tools read with different declared meanings
    fn diverging_env_vars(&self, a: &AnalyzedTool, b: &AnalyzedTool) -> Vec<String> {
        let (Some(pa), Some(pb)) = (self.table.profile(&a.tool_key), self.table.profile(&b.tool_key))
        else {
            return Vec::new();
        };
        pa.env_vars
            .iter()
            .filter(|usage| {
                pb.env_var(&usage.name)
                    .is_some_and(|other| !usage.same_semantics(other))
            })
            .map(|usage| usage.name.clone())
            .collect()
    }

    fn env_var_conflicts(&self, roster: &[AnalyzedTool]) -> Result<Vec<Conflict>, DomainError> {
        let mut conflicts = Vec::new();
        for (i, a) in roster.iter().enumerate() {
            for b in roster.iter().skip(i + 1) {
                let vars = self.diverging_env_vars(a, b);
                if vars.is_empty() {
                    continue;
                }
                let names = vars.join(", ");
                let name_a = self.name_of(a);
                let name_b = self.name_of(b);
                conflicts.push(Conflict::new(
                    ConflictKind::EnvVar,
                    vec![a.tool_key.clone(), b.tool_key.clone()],
                    Severity::Medium,
                    ConflictKind::EnvVar.baseline_confidence(),
                    format!(
                        "{} and {} both read {} but interpret it differently",
                        name_a, name_b, names
                    ),
                    format!(
                        "Set {} per process (separate .env files or launch scripts) instead of exporting it globally, so {} and {} each see the value they expect",
                        names, name_a, name_b
                    ),
                    ConflictSource::StaticRule,
                )?);
            }
        }
        Ok(conflicts)
    }

    // ==================== Table patterns ====================

    fn pattern_conflicts(&self, roster: &[AnalyzedTool]) -> Result<Vec<Conflict>, DomainError> {
        let keys: Vec<&str> = roster.iter().map(|t| t.tool_key.as_str()).collect();
        self.table
            .applicable_patterns(&keys)
            .map(|pattern| self.pattern_conflict(pattern, roster))
            .collect()
    }

    fn pattern_conflict(
        &self,
        pattern: &ConflictPattern,
        roster: &[AnalyzedTool],
    ) -> Result<Conflict, DomainError> {
        // Tools in declaration order, not table order
        let involved: Vec<&AnalyzedTool> = roster
            .iter()
            .filter(|t| pattern.applies_to.contains(&t.tool_key))
            .collect();

        // `{tool_a}`/`{tool_b}` keep the roles the pattern gives them
        let roles = pattern
            .applies_to
            .iter()
            .filter_map(|key| involved.iter().find(|t| &t.tool_key == key))
            .map(|t| self.name_of(t))
            .collect();
        let mut vars = TemplateVars::new(involved.iter().map(|t| self.name_of(t)).collect())
            .with_roles(roles);

        let ports: Vec<Vec<u16>> = involved.iter().map(|t| self.effective_ports(t)).collect();
        let shared_port = ports
            .first()
            .and_then(|first| first.iter().copied().filter(|p| ports.iter().all(|ps| ps.contains(p))).min())
            .or_else(|| ports.iter().flatten().copied().next());
        if let Some(port) = shared_port {
            vars = vars.with_port(port);
            let in_use: BTreeSet<u16> = roster.iter().flat_map(|t| self.effective_ports(t)).collect();
            if let Some(alt) = next_free_port(port, &in_use) {
                vars = vars.with_alt_port(alt);
            }
        }

        if let Some(env_var) = self.table.shared_env_var(pattern.applies_to.as_slice()) {
            vars = vars.with_env_var(env_var);
        }

        let conflict = Conflict::new(
            pattern.kind,
            involved.iter().map(|t| t.tool_key.clone()).collect(),
            pattern.severity,
            pattern.confidence(),
            pattern.rationale.clone(),
            render(&pattern.mitigation_template, &vars),
            ConflictSource::StaticRule,
        )?;
        Ok(conflict.with_pattern(pattern.pattern_id.clone(), pattern.preference.clone()))
    }

    fn name_of(&self, tool: &AnalyzedTool) -> String {
        if tool.display_name.is_empty() || tool.display_name == tool.tool_key {
            self.table.display_name(&tool.tool_key).to_string()
        } else {
            tool.display_name.clone()
        }
    }
}

/// Smallest port above `port` that no analyzed tool uses
fn next_free_port(port: u16, in_use: &BTreeSet<u16>) -> Option<u16> {
    (port.checked_add(1)?..=u16::MAX).find(|candidate| !in_use.contains(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ToolStatus;
    use crate::pattern::ToolProfile;

    fn table() -> PatternTable {
        PatternTable::new(
            "test",
            vec![
                ToolProfile::new("streamlit")
                    .with_display_name("Streamlit")
                    .with_default_port(8501),
                ToolProfile {
                    port_hint: Some("GRADIO_SERVER_PORT={port} python app.py".to_string()),
                    ..ToolProfile::new("gradio")
                        .with_display_name("Gradio")
                        .with_default_port(7860)
                },
                ToolProfile::new("mlflow").with_default_port(5000),
                ToolProfile::new("flask").with_default_port(5000),
                ToolProfile::new("ollama")
                    .with_display_name("Ollama")
                    .with_env_var("OLLAMA_HOST", "address the server binds to"),
                ToolProfile::new("litellm")
                    .with_display_name("LiteLLM")
                    .with_env_var("OLLAMA_HOST", "upstream endpoint to connect to")
                    .with_env_var("OPENAI_API_KEY", "OpenAI provider credential"),
                ToolProfile::new("openai").with_env_var("OPENAI_API_KEY", "openai provider credential"),
                ToolProfile::new("crewai").with_category("agent-framework"),
                ToolProfile::new("autogen").with_category("agent-framework"),
            ],
            vec![
                ConflictPattern::new(
                    "agent-overlap",
                    ConflictKind::FunctionalityOverlap,
                    &["crewai", "autogen"],
                    Severity::Medium,
                )
                .with_rationale("Both orchestrate multi-agent conversations")
                .with_mitigation("Choose {tool_a} or {tool_b} as the primary framework")
                .with_preference(&["autogen", "crewai"]),
            ],
        )
        .unwrap()
    }

    fn planned(key: &str) -> PlannedTool {
        PlannedTool::new(key)
    }

    fn detected(key: &str, port: Option<u16>) -> DetectedTool {
        DetectedTool {
            tool_key: key.to_string(),
            display_name: key.to_string(),
            status: ToolStatus::Installed,
            signals: Vec::new(),
            confidence: 0.9,
            version: None,
            port,
            observed_versions: Vec::new(),
        }
    }

    #[test]
    fn test_overridden_port_collides() {
        let table = table();
        let engine = StaticRuleEngine::new(&table);
        let conflicts = engine
            .evaluate(&[detected("streamlit", None)], &[planned("gradio").with_port(8501)])
            .unwrap();

        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.kind, ConflictKind::Port);
        assert_eq!(c.severity, Severity::High);
        assert_eq!(c.tools, vec!["streamlit", "gradio"]);
        assert_eq!(c.confidence, 0.9);
        assert!(c.mitigation.contains("8501"));
        assert!(c.mitigation.contains("8502"));
        assert!(c.mitigation.contains("GRADIO_SERVER_PORT=8502"));
    }

    #[test]
    fn test_default_ports_differ_no_conflict() {
        let table = table();
        let engine = StaticRuleEngine::new(&table);
        let conflicts = engine
            .evaluate(&[], &[planned("streamlit"), planned("gradio")])
            .unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_one_port_conflict_per_pair() {
        let table = table();
        let engine = StaticRuleEngine::new(&table);
        let conflicts = engine
            .evaluate(
                &[detected("mlflow", None)],
                &[planned("flask"), planned("streamlit").with_port(5000)],
            )
            .unwrap();
        let ports: Vec<_> = conflicts.iter().filter(|c| c.kind == ConflictKind::Port).collect();
        assert_eq!(ports.len(), 3);
        for c in ports {
            assert_eq!(c.tools.len(), 2);
            assert!(c.mitigation.contains("5001"));
        }
    }

    #[test]
    fn test_alt_port_skips_used_ports() {
        let mut in_use = BTreeSet::from([8501, 8502, 8503]);
        assert_eq!(next_free_port(8501, &in_use), Some(8504));
        in_use.insert(u16::MAX);
        assert_eq!(next_free_port(u16::MAX, &in_use), None);
    }

    #[test]
    fn test_env_var_divergent_semantics() {
        let table = table();
        let engine = StaticRuleEngine::new(&table);
        let conflicts = engine
            .evaluate(&[], &[planned("ollama"), planned("litellm")])
            .unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::EnvVar);
        assert_eq!(conflicts[0].severity, Severity::Medium);
        assert!(conflicts[0].description.contains("OLLAMA_HOST"));
    }

    #[test]
    fn test_env_var_same_semantics_is_fine() {
        let table = table();
        let engine = StaticRuleEngine::new(&table);
        let conflicts = engine
            .evaluate(&[], &[planned("openai"), planned("litellm")])
            .unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_pattern_requires_full_coverage() {
        let table = table();
        let engine = StaticRuleEngine::new(&table);
        assert!(engine.evaluate(&[], &[planned("crewai")]).unwrap().is_empty());

        let conflicts = engine
            .evaluate(&[detected("crewai", None)], &[planned("autogen")])
            .unwrap();
        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.kind, ConflictKind::FunctionalityOverlap);
        assert_eq!(c.confidence, 0.6);
        assert_eq!(c.pattern_id.as_deref(), Some("agent-overlap"));
        assert_eq!(c.preference, vec!["autogen", "crewai"]);
        assert_eq!(c.mitigation, "Choose crewai or autogen as the primary framework");
        assert!(c.sources.iter().all(|s| *s == ConflictSource::StaticRule));
    }

    #[test]
    fn test_pattern_roles_ignore_declaration_order() {
        let table = table();
        let engine = StaticRuleEngine::new(&table);
        let conflicts = engine
            .evaluate(&[detected("autogen", None)], &[planned("crewai")])
            .unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].tools, vec!["autogen", "crewai"]);
        assert_eq!(
            conflicts[0].mitigation,
            "Choose crewai or autogen as the primary framework"
        );
    }

    #[test]
    fn test_deterministic() {
        let table = table();
        let engine = StaticRuleEngine::new(&table);
        let detected = [detected("mlflow", None), detected("crewai", None)];
        let planned = [planned("flask"), planned("autogen"), planned("ollama"), planned("litellm")];
        let first = engine.evaluate(&detected, &planned).unwrap();
        let second = engine.evaluate(&detected, &planned).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }
}
