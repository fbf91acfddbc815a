//! Dependencies and port overrides declared in project files

use super::named;
use async_trait::async_trait;
use pitfall_application::{Detector, DetectorError, ScanContext};
use pitfall_domain::{PatternTable, Signal, SignalSource, ToolProfile};
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

const WEIGHT: f64 = 0.5;
const CONFIG_WEIGHT: f64 = 0.4;

const REQUIREMENT_FILES: [&str; 3] = ["requirements.txt", "requirements-dev.txt", "requirements.in"];
const CONDA_FILES: [&str; 2] = ["environment.yml", "conda.yml"];

static REQUIREMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._-]*)\s*(?:\[[^\]]*\])?\s*(?:(===?|~=|!=|>=|<=|>|<)\s*([^\s,;#]+))?")
        .expect("requirement pattern is valid")
});

/// A declared dependency: distribution name plus pinned version, if exact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub version: Option<String>,
}

/// Parse one `requirements.txt` line. Options, URLs and comments yield `None`.
pub fn parse_requirement_line(line: &str) -> Option<Requirement> {
    let line = line.split(" #").next().unwrap_or(line).trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('-') || line.contains("://") {
        return None;
    }
    let caps = REQUIREMENT_RE.captures(line)?;
    let name = caps.get(1)?.as_str().to_string();
    let version = match (caps.get(2), caps.get(3)) {
        (Some(op), Some(v)) if op.as_str().starts_with("==") => Some(v.as_str().to_string()),
        _ => None,
    };
    Some(Requirement { name, version })
}

/// Dependencies from `pyproject.toml` (PEP 621 and Poetry layouts)
pub fn parse_pyproject(text: &str) -> Result<Vec<Requirement>, DetectorError> {
    let doc: toml::Value = toml::from_str(text).map_err(|e| DetectorError::Parse(e.to_string()))?;
    let mut requirements = Vec::new();

    if let Some(deps) = doc
        .get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_array())
    {
        requirements.extend(deps.iter().filter_map(|d| d.as_str()).filter_map(parse_requirement_line));
    }

    if let Some(deps) = doc
        .get("tool")
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_table())
    {
        for (name, spec) in deps {
            if name == "python" {
                continue;
            }
            let version = spec
                .as_str()
                .and_then(|v| v.strip_prefix("=="))
                .map(|v| v.trim().to_string());
            requirements.push(Requirement {
                name: name.clone(),
                version,
            });
        }
    }

    Ok(requirements)
}

/// Dependencies from a conda `environment.yml`, including its nested `pip:` list.
///
/// Only the `dependencies:` block is read; conda pins use a single `=`.
pub fn parse_environment_yml(text: &str) -> Vec<Requirement> {
    let mut requirements = Vec::new();
    let mut in_dependencies = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if !line.starts_with([' ', '\t', '-']) {
            in_dependencies = trimmed == "dependencies:";
            continue;
        }
        if !in_dependencies {
            continue;
        }
        let Some(item) = trimmed.strip_prefix('-').map(str::trim) else {
            continue;
        };
        if item.ends_with(':') {
            continue;
        }
        let item = item.rsplit("::").next().unwrap_or(item);
        if item.contains("==") {
            requirements.extend(parse_requirement_line(item));
            continue;
        }
        let mut parts = item.splitn(2, '=');
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() || name == "python" || name == "pip" {
            continue;
        }
        let version = parts
            .next()
            .map(|v| v.split('=').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty() && !v.contains('*'));
        requirements.extend(parse_requirement_line(name).map(|r| Requirement { version, ..r }));
    }

    requirements
}

/// `server.port` from `.streamlit/config.toml`
pub fn parse_streamlit_port(text: &str) -> Option<u16> {
    let doc: toml::Value = toml::from_str(text).ok()?;
    let port = doc.get("server")?.get("port")?.as_integer()?;
    u16::try_from(port).ok()
}

/// `*_PORT=<n>` assignments from a `.env` file
pub fn parse_dotenv_ports(text: &str) -> Vec<(String, u16)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (name, value) = line.split_once('=')?;
            let name = name.trim();
            if !name.ends_with("_PORT") {
                return None;
            }
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            Some((name.to_string(), value.parse().ok()?))
        })
        .collect()
}

/// Reads dependency manifests and tool config files in the project directory
pub struct ProjectFilesDetector {
    table: Arc<PatternTable>,
}

impl ProjectFilesDetector {
    pub fn new(table: Arc<PatternTable>) -> Self {
        Self { table }
    }

    fn requirement_signals(&self, file: &str, requirements: Vec<Requirement>) -> Vec<Signal> {
        requirements
            .into_iter()
            .filter_map(|req| {
                let profile = self.table.profile_by_package(&req.name)?;
                let evidence = match &req.version {
                    Some(v) => format!("{}: {}=={}", file, req.name, v),
                    None => format!("{}: {}", file, req.name),
                };
                let mut signal = signal_for(profile, evidence, WEIGHT)?
                    .with_subject(format!("{}: {}", file, req.name));
                if let Some(v) = req.version {
                    signal = signal.with_version(v);
                }
                Some(signal)
            })
            .collect()
    }

    fn scan(&self, dir: &Path) -> Result<Vec<Signal>, DetectorError> {
        if !dir.is_dir() {
            return Err(DetectorError::Io(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut signals = Vec::new();

        for file in REQUIREMENT_FILES {
            if let Some(text) = read_optional(&dir.join(file))? {
                let reqs = text.lines().filter_map(parse_requirement_line).collect();
                signals.extend(self.requirement_signals(file, reqs));
            }
        }

        if let Some(text) = read_optional(&dir.join("pyproject.toml"))? {
            match parse_pyproject(&text) {
                Ok(reqs) => signals.extend(self.requirement_signals("pyproject.toml", reqs)),
                Err(e) => warn!("Skipping unreadable pyproject.toml: {}", e),
            }
        }

        for file in CONDA_FILES {
            if let Some(text) = read_optional(&dir.join(file))? {
                signals.extend(self.requirement_signals(file, parse_environment_yml(&text)));
            }
        }

        if let Some(text) = read_optional(&dir.join(".streamlit").join("config.toml"))?
            && let Some(port) = parse_streamlit_port(&text)
            && let Some(profile) = self.table.profile("streamlit")
            && let Some(signal) = signal_for(
                profile,
                format!(".streamlit/config.toml: server.port = {}", port),
                CONFIG_WEIGHT,
            )
        {
            signals.push(
                signal
                    .with_port(port)
                    .with_subject(".streamlit/config.toml: server.port"),
            );
        }

        if let Some(text) = read_optional(&dir.join(".env"))? {
            for (name, port) in parse_dotenv_ports(&text) {
                let Some(profile) = self.table.tools().iter().find(|p| p.env_var(&name).is_some())
                else {
                    debug!("No profile declares {}", name);
                    continue;
                };
                if let Some(signal) =
                    signal_for(profile, format!(".env: {}={}", name, port), CONFIG_WEIGHT)
                {
                    signals.push(signal.with_port(port).with_subject(format!(".env: {}", name)));
                }
            }
        }

        Ok(signals)
    }
}

fn signal_for(profile: &ToolProfile, evidence: String, weight: f64) -> Option<Signal> {
    Signal::new(
        profile.tool_key.clone(),
        SignalSource::RequirementsFile,
        evidence,
        weight,
    )
    .ok()
    .map(|s| named(s, profile))
}

fn read_optional(path: &Path) -> Result<Option<String>, DetectorError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DetectorError::Io(format!("{}: {}", path.display(), e))),
    }
}

#[async_trait]
impl Detector for ProjectFilesDetector {
    fn source(&self) -> SignalSource {
        SignalSource::RequirementsFile
    }

    async fn detect(&self, context: &ScanContext) -> Result<Vec<Signal>, DetectorError> {
        let table = self.table.clone();
        let dir = context.project_dir.clone();
        tokio::task::spawn_blocking(move || ProjectFilesDetector { table }.scan(&dir))
            .await
            .map_err(|e| DetectorError::Io(e.to_string()))?
    }
}
