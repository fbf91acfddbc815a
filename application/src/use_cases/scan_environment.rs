//! Scan Environment use case
//!
//! Runs every detector concurrently, then fuses the collected signals.

use crate::config::AnalysisParams;
use crate::ports::detector::{Detector, DetectorError, ScanContext};
use crate::ports::progress::{AnalysisPhase, NoProgress, ProgressNotifier};
use futures::future::join_all;
use pitfall_domain::{Degradation, DetectedTool, DiscoveryFusion, Signal};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Input for the ScanEnvironment use case
#[derive(Debug, Clone)]
pub struct ScanEnvironmentInput {
    pub context: ScanContext,
    /// Tools from the previous scan, replayed as older evidence
    pub prior: Vec<DetectedTool>,
}

impl ScanEnvironmentInput {
    pub fn new(context: ScanContext) -> Self {
        Self {
            context,
            prior: Vec::new(),
        }
    }

    pub fn with_prior(mut self, prior: Vec<DetectedTool>) -> Self {
        self.prior = prior;
        self
    }
}

/// A detector that did not contribute
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorFailure {
    pub detector: String,
    pub error: DetectorError,
}

#[derive(Debug, Clone)]
pub struct ScanEnvironmentOutput {
    pub tools: Vec<DetectedTool>,
    pub signal_count: usize,
    pub failures: Vec<DetectorFailure>,
}

impl ScanEnvironmentOutput {
    /// Failures as report degradations
    pub fn degradations(&self) -> Vec<Degradation> {
        self.failures
            .iter()
            .map(|f| Degradation::DetectorFailed {
                source: f.detector.clone(),
                reason: f.error.to_string(),
            })
            .collect()
    }
}

/// Use case for discovering which tools are present
pub struct ScanEnvironmentUseCase {
    detectors: Vec<Arc<dyn Detector>>,
    params: AnalysisParams,
}

impl ScanEnvironmentUseCase {
    pub fn new(detectors: Vec<Arc<dyn Detector>>) -> Self {
        Self {
            detectors,
            params: AnalysisParams::default(),
        }
    }

    pub fn with_params(mut self, params: AnalysisParams) -> Self {
        self.params = params;
        self
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(&self, input: ScanEnvironmentInput) -> ScanEnvironmentOutput {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the use case with progress callbacks.
    ///
    /// Never fails: a detector error or timeout is logged and recorded, and
    /// fusion proceeds with whatever the other detectors found.
    pub async fn execute_with_progress(
        &self,
        input: ScanEnvironmentInput,
        progress: &dyn ProgressNotifier,
    ) -> ScanEnvironmentOutput {
        info!("Scanning with {} detectors", self.detectors.len());
        progress.on_phase_start(AnalysisPhase::Scan, self.detectors.len());

        let timeout = self.params.detector_timeout;
        let context = &input.context;
        let futures = self.detectors.iter().map(|detector| async move {
            let result = match tokio::time::timeout(timeout, detector.detect(context)).await {
                Ok(result) => result,
                Err(_) => Err(DetectorError::Timeout(timeout.as_secs())),
            };
            (Arc::clone(detector), result)
        });

        // join_all keeps detector order regardless of completion order
        let results = join_all(futures).await;

        let mut signals: Vec<Signal> = Vec::new();
        let mut failures = Vec::new();
        for (detector, result) in results {
            match result {
                Ok(found) => {
                    debug!("Detector {} reported {} signals", detector.name(), found.len());
                    progress.on_task_complete(AnalysisPhase::Scan, detector.name(), true);
                    signals.extend(found);
                }
                Err(e) => {
                    warn!("Detector {} failed: {}", detector.name(), e);
                    progress.on_task_complete(AnalysisPhase::Scan, detector.name(), false);
                    failures.push(DetectorFailure {
                        detector: detector.name().to_string(),
                        error: e,
                    });
                }
            }
        }

        let fusion = DiscoveryFusion::new().with_min_confidence(self.params.min_tool_confidence);
        let tools = fusion.fuse(&signals, &input.prior);
        info!(
            "Fused {} signals into {} tools ({} detector failures)",
            signals.len(),
            tools.len(),
            failures.len()
        );
        progress.on_phase_complete(AnalysisPhase::Scan);

        ScanEnvironmentOutput {
            tools,
            signal_count: signals.len(),
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pitfall_domain::{SignalSource, ToolStatus};
    use std::time::Duration;

    // ==================== Test Mocks ====================

    struct MockDetector {
        source: SignalSource,
        result: Result<Vec<Signal>, DetectorError>,
        delay: Duration,
    }

    impl MockDetector {
        fn ok(source: SignalSource, signals: Vec<Signal>) -> Arc<dyn Detector> {
            Arc::new(Self {
                source,
                result: Ok(signals),
                delay: Duration::ZERO,
            })
        }

        fn failing(source: SignalSource, error: DetectorError) -> Arc<dyn Detector> {
            Arc::new(Self {
                source,
                result: Err(error),
                delay: Duration::ZERO,
            })
        }

        fn slow(source: SignalSource, delay: Duration) -> Arc<dyn Detector> {
            Arc::new(Self {
                source,
                result: Ok(vec![]),
                delay,
            })
        }
    }

    #[async_trait]
    impl Detector for MockDetector {
        fn source(&self) -> SignalSource {
            self.source
        }

        async fn detect(&self, _context: &ScanContext) -> Result<Vec<Signal>, DetectorError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.result.clone()
        }
    }

    fn signal(key: &str, source: SignalSource, weight: f64) -> Signal {
        Signal::new(key, source, format!("{} via {}", key, source), weight).unwrap()
    }

    fn input() -> ScanEnvironmentInput {
        ScanEnvironmentInput::new(ScanContext::new("."))
    }

    #[tokio::test]
    async fn test_fuses_across_detectors() {
        let use_case = ScanEnvironmentUseCase::new(vec![
            MockDetector::ok(
                SignalSource::PackageManager,
                vec![signal("streamlit", SignalSource::PackageManager, 0.6)],
            ),
            MockDetector::ok(
                SignalSource::RunningProcess,
                vec![signal("streamlit", SignalSource::RunningProcess, 0.5)],
            ),
        ]);

        let output = use_case.execute(input()).await;
        assert_eq!(output.tools.len(), 1);
        assert_eq!(output.signal_count, 2);
        let tool = &output.tools[0];
        assert_eq!(tool.status, ToolStatus::Running);
        assert!((tool.confidence - 0.8).abs() < 1e-9);
        assert!(output.failures.is_empty());
    }

    #[tokio::test]
    async fn test_detector_failure_is_absorbed() {
        let use_case = ScanEnvironmentUseCase::new(vec![
            MockDetector::failing(
                SignalSource::Container,
                DetectorError::Unavailable("docker".into()),
            ),
            MockDetector::ok(
                SignalSource::PackageManager,
                vec![signal("gradio", SignalSource::PackageManager, 0.6)],
            ),
        ]);

        let output = use_case.execute(input()).await;
        assert_eq!(output.tools.len(), 1);
        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.failures[0].detector, "container");
        assert_eq!(
            output.degradations(),
            vec![Degradation::DetectorFailed {
                source: "container".into(),
                reason: "docker is not available".into()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_detector_timeout() {
        let use_case = ScanEnvironmentUseCase::new(vec![MockDetector::slow(
            SignalSource::ImportScan,
            Duration::from_secs(120),
        )])
        .with_params(AnalysisParams::default().with_detector_timeout(Duration::from_secs(5)));

        let output = use_case.execute(input()).await;
        assert!(output.tools.is_empty());
        assert_eq!(output.failures[0].error, DetectorError::Timeout(5));
    }

    #[tokio::test]
    async fn test_prior_tools_are_replayed() {
        let first = ScanEnvironmentUseCase::new(vec![MockDetector::ok(
            SignalSource::PackageManager,
            vec![signal("mlflow", SignalSource::PackageManager, 0.6)],
        )])
        .execute(input())
        .await;

        let second = ScanEnvironmentUseCase::new(vec![MockDetector::ok(
            SignalSource::Container,
            vec![signal("mlflow", SignalSource::Container, 0.5)],
        )])
        .execute(input().with_prior(first.tools))
        .await;

        assert_eq!(second.tools.len(), 1);
        assert_eq!(second.tools[0].signals.len(), 2);
    }
}
