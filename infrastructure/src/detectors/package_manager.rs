//! Installed packages reported by pip and conda

use super::{named, run_command};
use async_trait::async_trait;
use pitfall_application::{Detector, DetectorError, ScanContext};
use pitfall_domain::{PatternTable, Signal, SignalSource};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const WEIGHT: f64 = 0.7;
const COMMAND_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Deserialize)]
struct PackageEntry {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

/// Map a `pip list --format=json` / `conda list --json` listing to signals.
///
/// Packages without a profile are ignored. `origin` names the tool in the
/// evidence string.
pub fn parse_package_list(
    json: &str,
    origin: &str,
    table: &PatternTable,
) -> Result<Vec<Signal>, DetectorError> {
    let entries: Vec<PackageEntry> =
        serde_json::from_str(json).map_err(|e| DetectorError::Parse(e.to_string()))?;

    let mut signals = Vec::new();
    for entry in entries {
        let Some(profile) = table.profile_by_package(&entry.name) else {
            continue;
        };
        let evidence = match &entry.version {
            Some(v) => format!("{}: {} {}", origin, entry.name, v),
            None => format!("{}: {}", origin, entry.name),
        };
        let Ok(mut signal) = Signal::new(
            profile.tool_key.clone(),
            SignalSource::PackageManager,
            evidence,
            WEIGHT,
        ) else {
            continue;
        };
        if let Some(version) = entry.version.filter(|v| !v.is_empty()) {
            signal = signal.with_version(version);
        }
        // pip and conda listing the same tool describe one install
        signal = signal.with_subject(profile.tool_key.clone());
        signals.push(named(signal, profile));
    }
    Ok(signals)
}

/// Lists installed Python packages with pip, plus the active conda env when available
pub struct PackageManagerDetector {
    table: Arc<PatternTable>,
    python: String,
}

impl PackageManagerDetector {
    pub fn new(table: Arc<PatternTable>) -> Self {
        Self {
            table,
            python: "python3".to_string(),
        }
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }
}

#[async_trait]
impl Detector for PackageManagerDetector {
    fn source(&self) -> SignalSource {
        SignalSource::PackageManager
    }

    async fn detect(&self, _context: &ScanContext) -> Result<Vec<Signal>, DetectorError> {
        let pip = run_command(
            &self.python,
            &["-m", "pip", "list", "--format=json", "--disable-pip-version-check"],
            COMMAND_TIMEOUT,
        )
        .await
        .and_then(|out| parse_package_list(&out, "pip", &self.table));

        // conda is optional; only its absence of tooling is silent
        let conda = match run_command("conda", &["list", "--json"], COMMAND_TIMEOUT).await {
            Ok(out) => parse_package_list(&out, "conda", &self.table).unwrap_or_else(|e| {
                warn!("Ignoring unreadable conda listing: {}", e);
                Vec::new()
            }),
            Err(DetectorError::Unavailable(_)) => Vec::new(),
            Err(e) => {
                debug!("conda list failed: {}", e);
                Vec::new()
            }
        };

        match pip {
            Ok(mut signals) => {
                signals.extend(conda);
                Ok(signals)
            }
            Err(e) if !conda.is_empty() => {
                warn!("pip listing failed, using conda only: {}", e);
                Ok(conda)
            }
            Err(e) => Err(e),
        }
    }
}
