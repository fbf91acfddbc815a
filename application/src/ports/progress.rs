//! Progress notification port
//!
//! Defines the interface for reporting progress during a scan or analysis.

/// Stages of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    Scan,
    StaticRules,
    Documentation,
    Synthesis,
    Ranking,
}

impl AnalysisPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisPhase::Scan => "Scanning environment",
            AnalysisPhase::StaticRules => "Matching known conflicts",
            AnalysisPhase::Documentation => "Fetching documentation",
            AnalysisPhase::Synthesis => "AI analysis",
            AnalysisPhase::Ranking => "Ranking",
        }
    }
}

/// Callback for progress updates
///
/// Implementations live in the presentation layer.
pub trait ProgressNotifier: Send + Sync {
    /// Called when a phase starts
    fn on_phase_start(&self, phase: AnalysisPhase, total_tasks: usize);

    /// Called when a task completes within a phase
    fn on_task_complete(&self, phase: AnalysisPhase, label: &str, success: bool);

    /// Called when a phase completes
    fn on_phase_complete(&self, phase: AnalysisPhase);
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_phase_start(&self, _phase: AnalysisPhase, _total_tasks: usize) {}
    fn on_task_complete(&self, _phase: AnalysisPhase, _label: &str, _success: bool) {}
    fn on_phase_complete(&self, _phase: AnalysisPhase) {}
}
