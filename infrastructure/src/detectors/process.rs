//! Running processes and listening default ports

use super::named;
use async_trait::async_trait;
use futures::future::join_all;
use pitfall_application::{Detector, DetectorError, ScanContext};
use pitfall_domain::{PatternTable, Signal, SignalSource, ToolProfile};
use std::collections::{BTreeMap, HashSet};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;
use tokio::net::TcpStream;
use tracing::debug;

const PROCESS_WEIGHT: f64 = 0.8;
const PORT_WEIGHT: f64 = 0.3;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

const INTERPRETERS: [&str; 4] = ["python", "python3", "uv", "conda"];

/// Match a process by its executable name, then by the command line of
/// interpreter processes (`python -m streamlit run app.py`)
pub fn match_process<'a>(
    table: &'a PatternTable,
    name: &str,
    cmdline: &[String],
) -> Option<&'a ToolProfile> {
    if let Some(profile) = table.profile_by_process(name) {
        return Some(profile);
    }
    let base = name.to_lowercase();
    let base = base.trim_end_matches(".exe");
    let is_interpreter = INTERPRETERS
        .iter()
        .any(|i| base == *i || base.starts_with(&format!("{}3.", i)));
    if !is_interpreter {
        return None;
    }
    // Program arguments only; a stray string literal later on the line is not evidence
    cmdline
        .iter()
        .skip(1)
        .take(3)
        .find_map(|arg| table.profile_by_process(arg))
}

/// Default ports that exactly one profile claims, with that profile's key
pub fn port_targets(table: &PatternTable) -> Vec<(u16, String)> {
    let mut owners: BTreeMap<u16, Vec<&str>> = BTreeMap::new();
    for profile in table.tools() {
        for port in &profile.default_ports {
            owners.entry(*port).or_default().push(&profile.tool_key);
        }
    }
    owners
        .into_iter()
        .filter(|(_, keys)| keys.len() == 1)
        .map(|(port, keys)| (port, keys[0].to_string()))
        .collect()
}

struct ProcessInfo {
    pid: u32,
    name: String,
    cmd: Vec<String>,
}

fn list_processes() -> Vec<ProcessInfo> {
    let mut system = System::new();
    system.refresh_processes();
    system
        .processes()
        .iter()
        .map(|(pid, process)| ProcessInfo {
            pid: pid.as_u32(),
            name: process.name().to_string(),
            cmd: process.cmd().to_vec(),
        })
        .collect()
}

async fn is_listening(port: u16) -> bool {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    matches!(
        tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}

/// Finds tools with a live process, and known ports with a listener
pub struct ProcessDetector {
    table: Arc<PatternTable>,
}

impl ProcessDetector {
    pub fn new(table: Arc<PatternTable>) -> Self {
        Self { table }
    }

    fn process_signals(&self, processes: &[ProcessInfo]) -> Vec<Signal> {
        let own_pid = std::process::id();
        let mut seen = HashSet::new();
        let mut signals = Vec::new();

        for process in processes.iter().filter(|p| p.pid != own_pid) {
            let Some(profile) = match_process(&self.table, &process.name, &process.cmd) else {
                continue;
            };
            if !seen.insert(profile.tool_key.as_str()) {
                continue;
            }
            let evidence = format!("process {} (pid {})", process.name, process.pid);
            if let Ok(signal) = Signal::new(
                profile.tool_key.clone(),
                SignalSource::RunningProcess,
                evidence,
                PROCESS_WEIGHT,
            ) {
                signals.push(named(signal, profile).with_subject(format!("process {}", process.name)));
            }
        }
        signals
    }

    async fn port_signals(&self) -> Vec<Signal> {
        let targets = port_targets(&self.table);
        let open = join_all(targets.iter().map(|(port, _)| is_listening(*port))).await;

        targets
            .into_iter()
            .zip(open)
            .filter(|(_, listening)| *listening)
            .filter_map(|((port, key), _)| {
                let profile = self.table.profile(&key)?;
                let signal = Signal::new(
                    key.clone(),
                    SignalSource::RunningProcess,
                    format!("listener on 127.0.0.1:{}", port),
                    PORT_WEIGHT,
                )
                .ok()?;
                Some(named(signal, profile).with_port(port))
            })
            .collect()
    }
}

#[async_trait]
impl Detector for ProcessDetector {
    fn source(&self) -> SignalSource {
        SignalSource::RunningProcess
    }

    async fn detect(&self, context: &ScanContext) -> Result<Vec<Signal>, DetectorError> {
        let processes = tokio::task::spawn_blocking(list_processes)
            .await
            .map_err(|e| DetectorError::Io(e.to_string()))?;
        debug!("Inspected {} processes", processes.len());

        let mut signals = self.process_signals(&processes);
        if context.check_ports {
            signals.extend(self.port_signals().await);
        }
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::tests::table;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_match_process_by_name() {
        let table = table();
        let profile = match_process(&table, "streamlit", &[]).unwrap();
        assert_eq!(profile.tool_key, "streamlit");
    }

    #[test]
    fn test_match_interpreter_command_line() {
        let table = table();
        let cmd = args(&["python3", "-m", "mlflow", "ui"]);
        assert_eq!(match_process(&table, "python3", &cmd).unwrap().tool_key, "mlflow");

        let cmd = args(&["python3.11", "app.py"]);
        assert!(match_process(&table, "python3.11", &cmd).is_none());

        // Non-interpreters are not inspected by argument
        let cmd = args(&["vim", "gradio_app.py"]);
        assert!(match_process(&table, "vim", &cmd).is_none());
    }

    #[test]
    fn test_port_targets_skip_shared_ports() {
        let targets = port_targets(&table());
        assert_eq!(
            targets,
            vec![(7860, "gradio".to_string()), (8501, "streamlit".to_string())]
        );
    }

    #[test]
    fn test_process_signals_dedup() {
        let detector = ProcessDetector::new(table());
        let processes = vec![
            ProcessInfo {
                pid: 10,
                name: "streamlit".to_string(),
                cmd: args(&["streamlit", "run", "app.py"]),
            },
            ProcessInfo {
                pid: 11,
                name: "python3".to_string(),
                cmd: args(&["python3", "-m", "streamlit", "run", "other.py"]),
            },
            ProcessInfo {
                pid: 12,
                name: "bash".to_string(),
                cmd: args(&["bash"]),
            },
        ];
        let signals = detector.process_signals(&processes);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].evidence, "process streamlit (pid 10)");
        assert_eq!(signals[0].subject(), "process streamlit");
        assert_eq!(signals[0].status, pitfall_domain::ToolStatus::Running);
    }

    #[tokio::test]
    async fn test_is_listening() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(is_listening(port).await);
        drop(listener);
    }
}
