//! Running containers reported by `docker ps`

use super::{named, run_command};
use async_trait::async_trait;
use pitfall_application::{Detector, DetectorError, ScanContext};
use pitfall_domain::{PatternTable, Signal, SignalSource};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

const WEIGHT: f64 = 0.8;
const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);
const PS_FORMAT: &str = "{{.Names}}\t{{.Image}}\t{{.Ports}}";

/// `0.0.0.0:8501->8501/tcp`, `[::]:8501->8501/tcp` or a bare `8501->8501/tcp`
static PORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\S*:)?(\d+)->\d+/tcp").expect("port mapping pattern is valid")
});

/// Map `docker ps` output (names, image, ports; tab separated) to signals.
///
/// The first published host port becomes the signal's port hint.
pub fn parse_docker_ps(output: &str, table: &PatternTable) -> Vec<Signal> {
    let mut signals = Vec::new();
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let mut fields = line.split('\t');
        let (Some(name), Some(image)) = (fields.next(), fields.next()) else {
            continue;
        };
        let ports = fields.next().unwrap_or_default();

        let Some(profile) = table.profile_by_image(image.trim()) else {
            continue;
        };
        let Ok(mut signal) = Signal::new(
            profile.tool_key.clone(),
            SignalSource::Container,
            format!("container {} ({})", name.trim(), image.trim()),
            WEIGHT,
        ) else {
            continue;
        };
        if let Some(port) = PORT_RE
            .captures(ports)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
        {
            signal = signal.with_port(port);
        }
        signals.push(named(signal, profile));
    }
    signals
}

/// Lists running containers through the docker CLI
pub struct ContainerDetector {
    table: Arc<PatternTable>,
}

impl ContainerDetector {
    pub fn new(table: Arc<PatternTable>) -> Self {
        Self { table }
    }
}

#[async_trait]
impl Detector for ContainerDetector {
    fn source(&self) -> SignalSource {
        SignalSource::Container
    }

    async fn detect(&self, _context: &ScanContext) -> Result<Vec<Signal>, DetectorError> {
        let output = run_command("docker", &["ps", "--format", PS_FORMAT], COMMAND_TIMEOUT).await?;
        Ok(parse_docker_ps(&output, &self.table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::tests::table;

    #[test]
    fn test_parse_docker_ps() {
        let output = "streamlit_app\tstreamlit:latest\t8501->8501/tcp\n\
                      tracking\tghcr.io/mlflow/mlflow:v2.16.0\t0.0.0.0:5001->5000/tcp, [::]:5001->5000/tcp\n\
                      db\tpostgres:16\t5432/tcp\n";
        let signals = parse_docker_ps(output, &table());
        assert_eq!(signals.len(), 2);

        assert_eq!(signals[0].tool_key, "streamlit");
        assert_eq!(signals[0].port, Some(8501));
        assert_eq!(signals[0].evidence, "container streamlit_app (streamlit:latest)");
        assert_eq!(signals[0].status, pitfall_domain::ToolStatus::Running);

        assert_eq!(signals[1].tool_key, "mlflow");
        assert_eq!(signals[1].port, Some(5001));
    }

    #[test]
    fn test_parse_unpublished_and_malformed() {
        let output = "web\tstreamlit\t\nbroken-line\n";
        let signals = parse_docker_ps(output, &table());
        assert_eq!(signals.len(), 1);
        assert!(signals[0].port.is_none());
    }
}
