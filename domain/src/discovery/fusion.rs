//! Discovery Fusion: many uncertain signals in, one [`DetectedTool`] per key out.
//!
//! Fusion is a single-threaded reduction over the complete signal set.
//! Detectors may run concurrently, but nothing here observes a partial set.
//!
//! # Field resolution
//!
//! | Field | Rule |
//! |-------|------|
//! | `status` | `running > installed > agent_framework_detected` |
//! | `confidence` | noisy-OR: `1 - Π(1 - weight_i)` |
//! | `version` / `port` / `display_name` | highest-weight supplying signal, ties → most recent |

use super::signal::{Signal, SignalSource};
use super::tool::{DetectedTool, ToolStatus};
use std::collections::{BTreeMap, BTreeSet};

/// Combine independent evidence weights with a noisy-OR.
///
/// Returns 0.0 for an empty slice. Each additional weight can only raise the
/// result, and the result never exceeds 1.0.
pub fn fused_confidence(weights: impl IntoIterator<Item = f64>) -> f64 {
    let miss: f64 = weights
        .into_iter()
        .map(|w| 1.0 - w.clamp(0.0, 1.0))
        .product();
    (1.0 - miss).clamp(0.0, 1.0)
}

/// Merges detector observations into confidence-scored tool records.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryFusion {
    min_confidence: f64,
}

impl Default for DiscoveryFusion {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
        }
    }
}

impl DiscoveryFusion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop tools whose fused confidence falls below `threshold`.
    ///
    /// Defaults to 0.0: suppression is normally left to the report renderer.
    pub fn with_min_confidence(mut self, threshold: f64) -> Self {
        self.min_confidence = threshold.clamp(0.0, 1.0);
        self
    }

    /// Fuse fresh signals, replaying `prior` tools' signals as older evidence.
    ///
    /// A prior signal is replayed only when no fresh signal reports the same
    /// tool from the same source. Repeated `(tool_key, source, subject)`
    /// observations count once, with the latest copy treated as the most
    /// recent. Output is sorted by key. A key with no signals never appears.
    pub fn fuse(&self, signals: &[Signal], prior: &[DetectedTool]) -> Vec<DetectedTool> {
        let mut groups: BTreeMap<String, Vec<Signal>> = BTreeMap::new();

        let refreshed: BTreeSet<(&str, SignalSource)> = signals
            .iter()
            .map(|s| (s.tool_key.as_str(), s.source))
            .collect();
        let replayed = prior
            .iter()
            .flat_map(|t| t.signals.iter())
            .filter(|s| !refreshed.contains(&(s.tool_key.as_str(), s.source)));

        for signal in replayed.chain(signals.iter()) {
            let group = groups.entry(signal.tool_key.clone()).or_default();
            if let Some(pos) = group
                .iter()
                .position(|s| s.dedup_key() == signal.dedup_key())
            {
                group.remove(pos);
            }
            group.push(signal.clone());
        }

        groups
            .into_iter()
            .map(|(key, group)| Self::fuse_group(key, group))
            .filter(|tool| tool.confidence >= self.min_confidence)
            .collect()
    }

    fn fuse_group(tool_key: String, signals: Vec<Signal>) -> DetectedTool {
        let confidence = fused_confidence(signals.iter().map(|s| s.weight));

        let status = signals
            .iter()
            .map(|s| s.status)
            .max_by_key(|s| s.priority())
            .unwrap_or(ToolStatus::Installed);

        let version = Self::strongest(&signals, |s| s.version.clone());
        let port = Self::strongest(&signals, |s| s.port);
        let display_name =
            Self::strongest(&signals, |s| s.display_name.clone()).unwrap_or_else(|| tool_key.clone());

        let mut observed_versions: Vec<String> = Vec::new();
        for v in signals.iter().filter_map(|s| s.version.as_ref()) {
            if !observed_versions.contains(v) {
                observed_versions.push(v.clone());
            }
        }

        DetectedTool {
            tool_key,
            display_name,
            status,
            signals,
            confidence,
            version,
            port,
            observed_versions,
        }
    }

    /// Value from the highest-weight signal that supplies one; later wins ties.
    fn strongest<T>(signals: &[Signal], field: impl Fn(&Signal) -> Option<T>) -> Option<T> {
        let mut best: Option<(f64, T)> = None;
        for signal in signals {
            if let Some(value) = field(signal) {
                match &best {
                    Some((weight, _)) if signal.weight < *weight => {}
                    _ => best = Some((signal.weight, value)),
                }
            }
        }
        best.map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(key: &str, source: SignalSource, evidence: &str, weight: f64) -> Signal {
        Signal::new(key, source, evidence, weight).unwrap()
    }

    #[test]
    fn test_noisy_or() {
        assert_eq!(fused_confidence([]), 0.0);
        assert!((fused_confidence([0.5]) - 0.5).abs() < 1e-9);
        assert!((fused_confidence([0.5, 0.5]) - 0.75).abs() < 1e-9);
        assert_eq!(fused_confidence([1.0, 0.2]), 1.0);
    }

    #[test]
    fn test_confidence_monotonic_as_signals_added() {
        let all = vec![
            sig("gradio", SignalSource::RequirementsFile, "requirements.txt", 0.4),
            sig("gradio", SignalSource::PackageManager, "pip", 0.7),
            sig("gradio", SignalSource::ImportScan, "app.py", 0.3),
            sig("gradio", SignalSource::RunningProcess, "pid 42", 0.9),
        ];
        let fusion = DiscoveryFusion::new();
        let mut last = 0.0;
        for n in 1..=all.len() {
            let tools = fusion.fuse(&all[..n], &[]);
            assert_eq!(tools.len(), 1);
            assert!(tools[0].confidence >= last);
            assert!(tools[0].confidence <= 1.0);
            last = tools[0].confidence;
        }
    }

    #[test]
    fn test_duplicate_signal_does_not_raise_confidence() {
        let one = vec![sig("crewai", SignalSource::PackageManager, "pip", 0.6)];
        let twice = vec![one[0].clone(), one[0].clone()];
        let fusion = DiscoveryFusion::new();
        let a = fusion.fuse(&one, &[]);
        let b = fusion.fuse(&twice, &[]);
        assert_eq!(a[0].confidence, b[0].confidence);
        assert_eq!(b[0].signals.len(), 1);
    }

    #[test]
    fn test_status_priority() {
        let signals = vec![
            sig("autogen", SignalSource::ImportScan, "agents.py", 0.3)
                .with_status(ToolStatus::AgentFrameworkDetected),
            sig("autogen", SignalSource::PackageManager, "pip", 0.7),
        ];
        let tools = DiscoveryFusion::new().fuse(&signals, &[]);
        assert_eq!(tools[0].status, ToolStatus::Installed);

        let mut signals = signals;
        signals.push(sig("autogen", SignalSource::RunningProcess, "pid 7", 0.8));
        let tools = DiscoveryFusion::new().fuse(&signals, &[]);
        assert_eq!(tools[0].status, ToolStatus::Running);
    }

    #[test]
    fn test_version_from_highest_weight_and_all_retained() {
        let signals = vec![
            sig("torch", SignalSource::PackageManager, "pip", 0.9).with_version("2.1.0"),
            sig("torch", SignalSource::RequirementsFile, "requirements.txt", 0.5)
                .with_version("2.3.0"),
        ];
        let tools = DiscoveryFusion::new().fuse(&signals, &[]);
        assert_eq!(tools[0].version.as_deref(), Some("2.1.0"));
        assert_eq!(tools[0].observed_versions, vec!["2.1.0", "2.3.0"]);
        assert!(tools[0].has_version_conflict());
    }

    #[test]
    fn test_port_tie_broken_by_most_recent() {
        let signals = vec![
            sig("gradio", SignalSource::RequirementsFile, "default", 0.5).with_port(7860),
            sig("gradio", SignalSource::RequirementsFile, ".env", 0.5).with_port(8501),
        ];
        let tools = DiscoveryFusion::new().fuse(&signals, &[]);
        assert_eq!(tools[0].port, Some(8501));
    }

    #[test]
    fn test_groups_by_key_sorted() {
        let signals = vec![
            sig("streamlit", SignalSource::PackageManager, "pip", 0.7),
            sig("autogen", SignalSource::PackageManager, "pip", 0.7),
        ];
        let tools = DiscoveryFusion::new().fuse(&signals, &[]);
        let keys: Vec<_> = tools.iter().map(|t| t.tool_key.as_str()).collect();
        assert_eq!(keys, vec!["autogen", "streamlit"]);
    }

    #[test]
    fn test_no_signals_no_tool() {
        assert!(DiscoveryFusion::new().fuse(&[], &[]).is_empty());
    }

    #[test]
    fn test_threshold_filters() {
        let signals = vec![sig("chroma", SignalSource::ImportScan, "rag.py", 0.2)];
        assert_eq!(DiscoveryFusion::new().fuse(&signals, &[]).len(), 1);
        assert!(
            DiscoveryFusion::new()
                .with_min_confidence(0.5)
                .fuse(&signals, &[])
                .is_empty()
        );
    }

    #[test]
    fn test_prior_signals_replayed_as_older_evidence() {
        let fusion = DiscoveryFusion::new();
        let prior = fusion.fuse(
            &[sig("mlflow", SignalSource::PackageManager, "pip", 0.7).with_version("2.9")],
            &[],
        );
        let fresh = vec![
            sig("mlflow", SignalSource::PackageManager, "pip", 0.7).with_version("2.10"),
            sig("mlflow", SignalSource::RunningProcess, "port 5000", 0.6),
        ];
        let tools = fusion.fuse(&fresh, &prior);
        assert_eq!(tools.len(), 1);
        // Same evidence collapses; the fresh copy wins as most recent.
        assert_eq!(tools[0].signals.len(), 2);
        assert_eq!(tools[0].version.as_deref(), Some("2.10"));
        assert!((tools[0].confidence - fused_confidence([0.7, 0.6])).abs() < 1e-9);
    }

    fn pip(key: &str, manager: &str, version: &str) -> Signal {
        sig(
            key,
            SignalSource::PackageManager,
            &format!("{}: {} {}", manager, key, version),
            0.7,
        )
        .with_version(version)
        .with_subject(key)
    }

    #[test]
    fn test_same_install_from_two_package_managers_counts_once() {
        let fusion = DiscoveryFusion::new();
        let alone = fusion.fuse(&[pip("streamlit", "pip", "1.38.0")], &[]);
        let both = fusion.fuse(
            &[pip("streamlit", "pip", "1.38.0"), pip("streamlit", "conda", "1.38.0")],
            &[],
        );
        assert_eq!(both[0].confidence, alone[0].confidence);
        assert_eq!(both[0].signals.len(), 1);
        assert_eq!(both[0].signals[0].evidence, "conda: streamlit 1.38.0");
    }

    #[test]
    fn test_upgrade_replaces_prior_observation() {
        let fusion = DiscoveryFusion::new();
        let prior = fusion.fuse(
            &[
                pip("streamlit", "pip", "1.37.0"),
                sig("streamlit", SignalSource::ImportScan, "app.py: import streamlit", 0.4),
            ],
            &[],
        );
        let tools = fusion.fuse(&[pip("streamlit", "pip", "1.38.0")], &prior);

        let tool = &tools[0];
        assert_eq!(tool.version.as_deref(), Some("1.38.0"));
        assert_eq!(tool.observed_versions, vec!["1.38.0"]);
        assert!(!tool.has_version_conflict());
        // The import scan did not report this time, so its older evidence stays
        assert_eq!(tool.signals.len(), 2);
        assert!((tool.confidence - fused_confidence([0.7, 0.4])).abs() < 1e-9);
    }

    #[test]
    fn test_fresh_source_drops_stale_evidence_of_that_source() {
        let fusion = DiscoveryFusion::new();
        let prior = fusion.fuse(
            &[sig("gradio", SignalSource::RunningProcess, "process gradio (pid 10)", 0.8)],
            &[],
        );
        let tools = fusion.fuse(
            &[sig("gradio", SignalSource::RunningProcess, "process gradio (pid 99)", 0.8)],
            &prior,
        );
        assert_eq!(tools[0].signals.len(), 1);
        assert_eq!(tools[0].signals[0].evidence, "process gradio (pid 99)");
    }
}
