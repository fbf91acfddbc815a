//! Environment detectors
//!
//! Each detector inspects one kind of evidence and maps it onto tool keys
//! through the pattern table's [`ToolProfile`](pitfall_domain::ToolProfile)s.
//! Raw output parsing lives in pure functions so it can be tested without
//! the underlying tooling installed.

mod container;
mod imports;
mod package_manager;
mod process;
mod project_files;

pub use container::{ContainerDetector, parse_docker_ps};
pub use imports::{ImportScanDetector, parse_imports};
pub use package_manager::{PackageManagerDetector, parse_package_list};
pub use process::{ProcessDetector, match_process, port_targets};
pub use project_files::{
    ProjectFilesDetector, Requirement, parse_dotenv_ports, parse_environment_yml, parse_pyproject,
    parse_requirement_line, parse_streamlit_port,
};

use crate::config::FileScanConfig;
use pitfall_application::{Detector, DetectorError};
use pitfall_domain::{PatternTable, Signal, ToolProfile};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Build the detectors enabled in `config`, in their canonical order
pub fn default_detectors(table: Arc<PatternTable>, config: &FileScanConfig) -> Vec<Arc<dyn Detector>> {
    let all: Vec<Arc<dyn Detector>> = vec![
        Arc::new(PackageManagerDetector::new(table.clone()).with_python(config.python.clone())),
        Arc::new(ProjectFilesDetector::new(table.clone())),
        Arc::new(ProcessDetector::new(table.clone())),
        Arc::new(ContainerDetector::new(table.clone())),
        Arc::new(ImportScanDetector::new(table)),
    ];
    all.into_iter()
        .filter(|d| config.is_detector_enabled(d.name()))
        .collect()
}

/// Run an external command and return its stdout
pub(crate) async fn run_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, DetectorError> {
    if which::which(program).is_err() {
        return Err(DetectorError::Unavailable(program.to_string()));
    }

    let command_line = format!("{} {}", program, args.join(" "));
    debug!("Running {}", command_line);

    let mut cmd = Command::new(program);
    cmd.args(args).kill_on_drop(true);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| DetectorError::Timeout(timeout.as_secs()))??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DetectorError::CommandFailed {
            command: command_line,
            message: stderr.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Attach the profile's display name to a signal
pub(crate) fn named(signal: Signal, profile: &ToolProfile) -> Signal {
    if profile.display_name.is_empty() {
        signal
    } else {
        signal.with_display_name(profile.display_name.clone())
    }
}
