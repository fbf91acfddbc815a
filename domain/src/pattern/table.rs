//! The conflict pattern table
//!
//! Versioned reference data: tool profiles plus known pairwise conflicts.
//! Loaded once, validated eagerly, read-only afterwards.

use super::entities::{ConflictPattern, ToolProfile};
use super::template::{PLACEHOLDERS, placeholders};
use crate::core::error::PatternTableError;
use crate::util::normalize_key;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternTable {
    version: String,
    tools: Vec<ToolProfile>,
    patterns: Vec<ConflictPattern>,
}

impl PatternTable {
    /// Build and validate a table
    pub fn new(
        version: impl Into<String>,
        tools: Vec<ToolProfile>,
        patterns: Vec<ConflictPattern>,
    ) -> Result<Self, PatternTableError> {
        let table = Self {
            version: version.into(),
            tools,
            patterns,
        };
        table.validate()?;
        Ok(table)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, PatternTableError> {
        let table: PatternTable =
            toml::from_str(source).map_err(|e| PatternTableError::Parse(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    /// Check structural invariants.
    ///
    /// Every pattern needs a unique id, at least two distinct tools,
    /// non-empty rationale and mitigation, known placeholders only, and a
    /// preference drawn from its own tools.
    pub fn validate(&self) -> Result<(), PatternTableError> {
        let mut profile_keys = HashSet::new();
        for (index, profile) in self.tools.iter().enumerate() {
            if profile.tool_key.trim().is_empty() {
                return Err(PatternTableError::EmptyProfileKey { index });
            }
            if !profile_keys.insert(profile.tool_key.as_str()) {
                return Err(PatternTableError::DuplicateProfile(profile.tool_key.clone()));
            }
            if let Some(env) = profile.env_vars.iter().find(|e| e.semantics.trim().is_empty()) {
                return Err(PatternTableError::EmptyEnvSemantics {
                    tool_key: profile.tool_key.clone(),
                    env_var: env.name.clone(),
                });
            }
        }

        let mut pattern_ids = HashSet::new();
        for (index, pattern) in self.patterns.iter().enumerate() {
            let id = pattern.pattern_id.trim();
            if id.is_empty() {
                return Err(PatternTableError::EmptyPatternId { index });
            }
            if !pattern_ids.insert(id) {
                return Err(PatternTableError::DuplicatePatternId(id.to_string()));
            }

            let distinct: HashSet<&str> = pattern.applies_to.iter().map(String::as_str).collect();
            if distinct.len() < 2 {
                return Err(PatternTableError::TooFewTools {
                    pattern_id: id.to_string(),
                    count: distinct.len(),
                });
            }
            if let Some(stray) = pattern
                .preference
                .iter()
                .find(|key| !distinct.contains(key.as_str()))
            {
                return Err(PatternTableError::PreferenceOutsidePattern {
                    pattern_id: id.to_string(),
                    tool_key: stray.clone(),
                });
            }

            if pattern.rationale.trim().is_empty() {
                return Err(PatternTableError::EmptyField {
                    pattern_id: id.to_string(),
                    field: "rationale",
                });
            }
            if pattern.mitigation_template.trim().is_empty() {
                return Err(PatternTableError::EmptyField {
                    pattern_id: id.to_string(),
                    field: "mitigation_template",
                });
            }
            if let Some(unknown) = placeholders(&pattern.mitigation_template)
                .into_iter()
                .find(|name| !PLACEHOLDERS.contains(&name.as_str()))
            {
                return Err(PatternTableError::UnknownPlaceholder {
                    pattern_id: id.to_string(),
                    placeholder: unknown,
                });
            }

            if let Some(missing) = self.unsupplied_placeholder(pattern) {
                return Err(PatternTableError::UnsuppliedPlaceholder {
                    pattern_id: id.to_string(),
                    placeholder: missing.to_string(),
                });
            }

            if let Some(value) = pattern.confidence
                && !(0.0..=1.0).contains(&value)
            {
                return Err(PatternTableError::ConfidenceOutOfRange {
                    pattern_id: id.to_string(),
                    value,
                });
            }
        }

        Ok(())
    }

    /// `{port}`/`{alt_port}` need a tool with a default port; `{env_var}`
    /// needs a variable every tool of the pattern declares
    fn unsupplied_placeholder(&self, pattern: &ConflictPattern) -> Option<&'static str> {
        let used = placeholders(&pattern.mitigation_template);
        let has_port = pattern
            .applies_to
            .iter()
            .any(|key| self.profile(key).is_some_and(|p| !p.default_ports.is_empty()));
        for name in ["port", "alt_port"] {
            if !has_port && used.iter().any(|u| u == name) {
                return Some(name);
            }
        }
        if used.iter().any(|u| u == "env_var") && self.shared_env_var(pattern.applies_to.as_slice()).is_none() {
            return Some("env_var");
        }
        None
    }

    /// First variable, in the first tool's declaration order, that every tool declares
    pub fn shared_env_var<S: AsRef<str>>(&self, tool_keys: &[S]) -> Option<&str> {
        let profiles = tool_keys
            .iter()
            .map(|key| self.profile(key.as_ref()))
            .collect::<Option<Vec<_>>>()?;
        let (first, rest) = profiles.split_first()?;
        first
            .env_vars
            .iter()
            .find(|usage| rest.iter().all(|p| p.env_var(&usage.name).is_some()))
            .map(|usage| usage.name.as_str())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn tools(&self) -> &[ToolProfile] {
        &self.tools
    }

    pub fn patterns(&self) -> &[ConflictPattern] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.patterns.is_empty()
    }

    pub fn profile(&self, tool_key: &str) -> Option<&ToolProfile> {
        self.tools.iter().find(|p| p.tool_key == tool_key)
    }

    /// Find the profile owning a Python distribution name (PEP 503 normalized)
    pub fn profile_by_package(&self, package: &str) -> Option<&ToolProfile> {
        let wanted = normalize_key(&package.replace('.', "-"));
        self.tools.iter().find(|p| {
            p.package_names
                .iter()
                .any(|name| normalize_key(&name.replace('.', "-")) == wanted)
        })
    }

    /// Find the profile owning a top-level import name
    pub fn profile_by_import(&self, module: &str) -> Option<&ToolProfile> {
        let top = module.split('.').next().unwrap_or(module);
        self.tools
            .iter()
            .find(|p| p.import_names.iter().any(|name| name == top))
    }

    /// Find the profile whose process names appear in a process name or command line
    pub fn profile_by_process(&self, process: &str) -> Option<&ToolProfile> {
        let process = process.to_lowercase();
        self.tools.iter().find(|p| {
            p.process_names
                .iter()
                .any(|name| process.contains(&name.to_lowercase()))
        })
    }

    /// Find the profile for a container image reference (`registry/name:tag`)
    pub fn profile_by_image(&self, image: &str) -> Option<&ToolProfile> {
        let without_tag = image.split(['@', ':']).next().unwrap_or(image);
        let name = without_tag.rsplit('/').next().unwrap_or(without_tag);
        self.tools.iter().find(|p| {
            p.image_names
                .iter()
                .any(|candidate| candidate == without_tag || candidate == name)
        })
    }

    /// Resolve a free-form name (key, display name or package) to a profile
    pub fn resolve(&self, name: &str) -> Option<&ToolProfile> {
        let key = normalize_key(name);
        self.tools
            .iter()
            .find(|p| p.tool_key == key || normalize_key(&p.display_name) == key)
            .or_else(|| self.profile_by_package(name))
    }

    /// Display name for a key, falling back to the key itself
    pub fn display_name<'a>(&'a self, tool_key: &'a str) -> &'a str {
        self.profile(tool_key)
            .map(|p| p.display_name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(tool_key)
    }

    /// Patterns whose tools are all present in `keys`
    pub fn applicable_patterns<'a>(
        &'a self,
        keys: &'a [&'a str],
    ) -> impl Iterator<Item = &'a ConflictPattern> + 'a {
        self.patterns
            .iter()
            .filter(move |p| p.is_covered_by(|key| keys.contains(&key)))
    }
}
