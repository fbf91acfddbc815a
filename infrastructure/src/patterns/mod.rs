//! Conflict pattern table loading
//!
//! The built-in table ships inside the binary. A custom table (from
//! `[patterns] path` or `--patterns`) replaces it entirely.

use pitfall_domain::{PatternTable, PatternTableError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const BUILTIN_TABLE: &str = include_str!("builtin.toml");

/// Errors raised while loading a pattern table
#[derive(Debug, Error)]
pub enum PatternLoadError {
    #[error("failed to read pattern table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}: {source}")]
    Invalid {
        origin: String,
        #[source]
        source: PatternTableError,
    },
}

/// Loads the conflict pattern table
pub struct PatternLoader;

impl PatternLoader {
    /// The table compiled into the binary
    pub fn builtin() -> Result<PatternTable, PatternLoadError> {
        PatternTable::from_toml_str(BUILTIN_TABLE).map_err(|source| PatternLoadError::Invalid {
            origin: "built-in pattern table".to_string(),
            source,
        })
    }

    /// Load `path` if given, otherwise the built-in table
    pub fn load(path: Option<&Path>) -> Result<PatternTable, PatternLoadError> {
        let Some(path) = path else {
            let table = Self::builtin()?;
            debug!(
                version = table.version(),
                patterns = table.patterns().len(),
                "Loaded built-in pattern table"
            );
            return Ok(table);
        };

        let source = std::fs::read_to_string(path).map_err(|source| PatternLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table =
            PatternTable::from_toml_str(&source).map_err(|source| PatternLoadError::Invalid {
                origin: path.display().to_string(),
                source,
            })?;
        info!(
            path = %path.display(),
            version = table.version(),
            patterns = table.patterns().len(),
            "Loaded custom pattern table"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitfall_domain::{
        AnalyzedTool, ConflictKind, DetectedTool, PlannedTool, Severity, StaticRuleEngine,
        ToolStatus, analyzed_tools, installation_order,
    };

    fn roster(keys: &[&str]) -> Vec<AnalyzedTool> {
        let planned: Vec<PlannedTool> = keys.iter().map(|k| PlannedTool::new(*k)).collect();
        analyzed_tools(&[], &planned)
    }

    #[test]
    fn test_builtin_table_is_valid() {
        let table = PatternLoader::builtin().unwrap();
        assert!(!table.is_empty());
        assert!(table.profile("streamlit").is_some());
        assert_eq!(table.profile_by_package("chromadb").unwrap().tool_key, "chroma");
        assert_eq!(table.profile_by_import("llama_index").unwrap().tool_key, "llama-index");
    }

    #[test]
    fn test_builtin_known_conflicts() {
        let table = PatternLoader::builtin().unwrap();
        let engine = StaticRuleEngine::new(&table);

        let conflicts = engine.evaluate_roster(&roster(&["ollama", "litellm"])).unwrap();
        assert!(conflicts.iter().any(|c| c.kind == ConflictKind::EnvVar
            && c.description.contains("OLLAMA_HOST")));

        let conflicts = engine.evaluate_roster(&roster(&["openai", "langchain"])).unwrap();
        assert!(conflicts.is_empty());

        let conflicts = engine.evaluate_roster(&roster(&["tensorflow", "torch"])).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].pattern_id.as_deref(), Some("cuda-runtime-mismatch"));
    }

    #[test]
    fn test_builtin_port_rule_and_pattern_merge() {
        let table = PatternLoader::builtin().unwrap();
        let engine = StaticRuleEngine::new(&table);

        let conflicts = engine.evaluate_roster(&roster(&["mlflow", "flask"])).unwrap();
        let ports: Vec<_> = conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::Port)
            .collect();
        assert_eq!(ports.len(), 1);
        assert!(ports[0].description.contains("5000"));
    }

    #[test]
    fn test_builtin_mitigations_keep_roles_in_both_orders() {
        let table = PatternLoader::builtin().unwrap();
        let engine = StaticRuleEngine::new(&table);

        for pattern in table.patterns() {
            let forward: Vec<&str> = pattern.applies_to.iter().map(String::as_str).collect();
            let backward: Vec<&str> = forward.iter().rev().copied().collect();

            let mut rendered = Vec::new();
            for keys in [&forward, &backward] {
                let roster = roster(keys);
                let conflicts = engine.evaluate_roster(&roster).unwrap();
                let conflict = conflicts
                    .iter()
                    .find(|c| c.pattern_id.as_deref() == Some(pattern.pattern_id.as_str()))
                    .unwrap_or_else(|| panic!("{} did not fire for {:?}", pattern.pattern_id, keys));
                assert!(
                    !conflict.mitigation.contains('{'),
                    "{}: {}",
                    pattern.pattern_id,
                    conflict.mitigation
                );

                if !pattern.preference.is_empty() {
                    let order = installation_order(&roster, &conflicts).unwrap();
                    let placed: Vec<&String> = order
                        .iter()
                        .filter(|key| pattern.preference.contains(key))
                        .collect();
                    let expected: Vec<&String> = pattern.preference.iter().collect();
                    assert_eq!(placed, expected, "{} for {:?}", pattern.pattern_id, keys);
                }
                rendered.push(conflict.mitigation.clone());
            }

            // The generic port rule owns the text of port conflicts
            if !pattern.mitigation_template.contains("{tools}") && pattern.kind != ConflictKind::Port {
                assert_eq!(rendered[0], rendered[1], "{}", pattern.pattern_id);
            }
        }
    }

    #[test]
    fn test_builtin_roles_follow_the_pattern() {
        let table = PatternLoader::builtin().unwrap();
        let engine = StaticRuleEngine::new(&table);

        let crew_roster = roster(&["crewai", "langchain"]);
        let conflicts = engine.evaluate_roster(&crew_roster).unwrap();
        let overlap = conflicts
            .iter()
            .find(|c| c.pattern_id.as_deref() == Some("agent-framework-overlap-langchain"))
            .unwrap();
        assert!(overlap.mitigation.starts_with("Install CrewAI first"), "{}", overlap.mitigation);
        assert_eq!(installation_order(&crew_roster, &conflicts).unwrap(), vec!["crewai", "langchain"]);

        let conflicts = engine.evaluate_roster(&roster(&["tensorflow", "numpy"])).unwrap();
        assert_eq!(
            conflicts[0].mitigation,
            "Let TensorFlow pin the NumPy version it was built against and do not upgrade NumPy separately"
        );
    }

    #[test]
    fn test_builtin_agent_framework_overlap() {
        let table = PatternLoader::builtin().unwrap();
        let detected: Vec<DetectedTool> = ["crewai", "autogen"]
            .iter()
            .map(|key| DetectedTool {
                tool_key: key.to_string(),
                display_name: key.to_string(),
                status: ToolStatus::AgentFrameworkDetected,
                signals: Vec::new(),
                confidence: 0.4,
                version: None,
                port: None,
                observed_versions: Vec::new(),
            })
            .collect();
        let roster = analyzed_tools(&detected, &[]);

        let conflicts = StaticRuleEngine::new(&table).evaluate_roster(&roster).unwrap();
        assert_eq!(conflicts.len(), 1);
        let conflict = &conflicts[0];
        assert_eq!(conflict.kind, ConflictKind::FunctionalityOverlap);
        assert_eq!(conflict.severity, Severity::Medium);
        assert_eq!(conflict.tools, vec!["crewai", "autogen"]);
        assert_eq!(conflict.preference, vec!["autogen", "crewai"]);

        assert_eq!(installation_order(&roster, &conflicts).unwrap(), vec!["autogen", "crewai"]);
    }

    #[test]
    fn test_load_custom_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.toml");
        std::fs::write(
            &path,
            r#"
version = "custom"

[[patterns]]
pattern_id = "a-b"
kind = "resource"
applies_to = ["a", "b"]
severity = "high"
rationale = "Both want the GPU"
mitigation_template = "Run {tool_a} and {tool_b} on different devices"
"#,
        )
        .unwrap();

        let table = PatternLoader::load(Some(&path)).unwrap();
        assert_eq!(table.version(), "custom");
        assert_eq!(table.patterns().len(), 1);
    }

    #[test]
    fn test_load_missing_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            PatternLoader::load(Some(&missing)),
            Err(PatternLoadError::Io { .. })
        ));

        let invalid = dir.path().join("invalid.toml");
        std::fs::write(
            &invalid,
            "[[patterns]]\npattern_id = \"x\"\nkind = \"port\"\napplies_to = [\"a\"]\nrationale = \"r\"\nmitigation_template = \"m\"\n",
        )
        .unwrap();
        let err = PatternLoader::load(Some(&invalid)).unwrap_err();
        assert!(err.to_string().contains("at least 2"));
    }
}
