//! Import statements in the project's Python sources

use super::named;
use async_trait::async_trait;
use pitfall_application::{Detector, DetectorError, ScanContext};
use pitfall_domain::{PatternTable, Signal, SignalSource, ToolStatus};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

const WEIGHT: f64 = 0.4;

/// Directories that hold third-party or generated code
const SKIP_DIRS: [&str; 10] = [
    "venv",
    ".venv",
    "env",
    ".env",
    "site-packages",
    "node_modules",
    "__pycache__",
    ".git",
    "build",
    "dist",
];

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:from\s+([A-Za-z_][\w.]*)\s+import\b|import\s+([A-Za-z_][\w.]*(?:\s*,\s*[A-Za-z_][\w.]*)*))")
        .expect("import pattern is valid")
});

/// Top-level module names imported by a Python source, in first-seen order
pub fn parse_imports(source: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut modules = Vec::new();
    for line in source.lines() {
        let Some(caps) = IMPORT_RE.captures(line) else {
            continue;
        };
        let names = match (caps.get(1), caps.get(2)) {
            (Some(from), _) => vec![from.as_str()],
            (None, Some(list)) => list.as_str().split(',').map(str::trim).collect(),
            _ => continue,
        };
        for name in names {
            let top = name.split('.').next().unwrap_or(name).to_string();
            if seen.insert(top.clone()) {
                modules.push(top);
            }
        }
    }
    modules
}

fn is_skipped(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| SKIP_DIRS.iter().any(|skip| c.as_os_str() == *skip))
}

/// Python files under `root`, excluding virtualenvs and build output, sorted, at most `max`
fn python_files(root: &Path, max: usize) -> Result<Vec<PathBuf>, DetectorError> {
    let pattern = root.join("**").join("*.py");
    let pattern = pattern.to_string_lossy();
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| DetectorError::Parse(e.to_string()))?
        .filter_map(Result::ok)
        .filter(|path| !is_skipped(path, root))
        .collect();
    files.sort();
    if files.len() > max {
        debug!("Import scan limited to {} of {} files", max, files.len());
        files.truncate(max);
    }
    Ok(files)
}

/// Scans import statements; agent frameworks are reported as such
pub struct ImportScanDetector {
    table: Arc<PatternTable>,
}

impl ImportScanDetector {
    pub fn new(table: Arc<PatternTable>) -> Self {
        Self { table }
    }

    fn scan(&self, root: &Path, max_files: usize) -> Result<Vec<Signal>, DetectorError> {
        if !root.is_dir() {
            return Err(DetectorError::Io(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let mut signals = Vec::new();
        for path in python_files(root, max_files)? {
            let source = match std::fs::read_to_string(&path) {
                Ok(source) => source,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let relative = path.strip_prefix(root).unwrap_or(&path).display().to_string();

            let mut in_file = HashSet::new();
            for module in parse_imports(&source) {
                let Some(profile) = self.table.profile_by_import(&module) else {
                    continue;
                };
                if !in_file.insert(profile.tool_key.clone()) {
                    continue;
                }
                let Ok(mut signal) = Signal::new(
                    profile.tool_key.clone(),
                    SignalSource::ImportScan,
                    format!("{}: import {}", relative, module),
                    WEIGHT,
                ) else {
                    continue;
                };
                if profile.is_agent_framework() {
                    signal = signal.with_status(ToolStatus::AgentFrameworkDetected);
                }
                signals.push(named(signal, profile));
            }
        }
        Ok(signals)
    }
}

#[async_trait]
impl Detector for ImportScanDetector {
    fn source(&self) -> SignalSource {
        SignalSource::ImportScan
    }

    async fn detect(&self, context: &ScanContext) -> Result<Vec<Signal>, DetectorError> {
        let detector = ImportScanDetector::new(self.table.clone());
        let root = context.project_dir.clone();
        let max = context.max_import_files;
        tokio::task::spawn_blocking(move || detector.scan(&root, max))
            .await
            .map_err(|e| DetectorError::Io(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::tests::table;
    use std::fs;

    #[test]
    fn test_parse_imports() {
        let source = "\
import os, sys
from crewai import Agent, Task
import semantic_kernel.functions as skf
    from gradio.components import Button
# import streamlit
x = 'import flask'
import crewai
";
        assert_eq!(
            parse_imports(source),
            vec!["os", "sys", "crewai", "semantic_kernel", "gradio"]
        );
    }

    #[tokio::test]
    async fn test_scan_project() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.py"), "import streamlit as st\nimport crewai\n").unwrap();
        fs::create_dir_all(dir.path().join("agents")).unwrap();
        fs::write(
            dir.path().join("agents").join("crew.py"),
            "from crewai import Crew\nfrom crewai.tools import tool\n",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join(".venv").join("lib")).unwrap();
        fs::write(
            dir.path().join(".venv").join("lib").join("vendored.py"),
            "import gradio\n",
        )
        .unwrap();

        let detector = ImportScanDetector::new(table());
        let signals = detector.detect(&ScanContext::new(dir.path())).await.unwrap();

        let keys: Vec<&str> = signals.iter().map(|s| s.tool_key.as_str()).collect();
        assert_eq!(keys, vec!["crewai", "streamlit", "crewai"]);
        assert_eq!(signals[0].status, ToolStatus::AgentFrameworkDetected);
        assert_eq!(signals[1].status, ToolStatus::Installed);
        assert!(signals[0].evidence.starts_with("agents"));
    }

    #[tokio::test]
    async fn test_scan_respects_file_limit() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "import gradio\n").unwrap();
        fs::write(dir.path().join("b.py"), "import flask\n").unwrap();

        let detector = ImportScanDetector::new(table());
        let context = ScanContext::new(dir.path()).with_max_import_files(1);
        let signals = detector.detect(&context).await.unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].tool_key, "gradio");
    }
}
