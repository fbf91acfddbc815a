//! Analyze use case
//!
//! Static rules, optional AI synthesis, merge, ranking and installation order.

use crate::config::AnalysisParams;
use crate::ports::documentation::DocumentationFetcher;
use crate::ports::llm_gateway::LlmGateway;
use crate::ports::progress::{AnalysisPhase, NoProgress, ProgressNotifier};
use crate::use_cases::synthesize::SynthesizeConflictsUseCase;
use pitfall_domain::{
    AnalysisMode, Degradation, DetectedTool, DomainError, ModelInsights, PatternTable, PlannedTool,
    Report, StaticRuleEngine, analyzed_tools, installation_order, merge_conflicts, rank_conflicts,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during analysis
#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("No tools to analyze: run a scan or add planned tools first")]
    NoTools,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl AnalyzeError {
    /// Caused by what the user supplied rather than a bug
    pub fn is_input_error(&self) -> bool {
        match self {
            AnalyzeError::NoTools => true,
            AnalyzeError::Domain(e) => e.is_input_error(),
        }
    }
}

/// Input for the Analyze use case
#[derive(Debug, Clone, Default)]
pub struct AnalyzeInput {
    pub detected: Vec<DetectedTool>,
    pub planned: Vec<PlannedTool>,
    /// Degradations that happened before analysis (e.g. detector failures)
    pub degradations: Vec<Degradation>,
    /// Skip AI analysis even when a gateway is configured
    pub static_only: bool,
}

impl AnalyzeInput {
    pub fn new(detected: Vec<DetectedTool>, planned: Vec<PlannedTool>) -> Self {
        Self {
            detected,
            planned,
            ..Default::default()
        }
    }

    pub fn with_degradations(mut self, degradations: Vec<Degradation>) -> Self {
        self.degradations = degradations;
        self
    }

    pub fn static_only(mut self) -> Self {
        self.static_only = true;
        self
    }
}

/// Use case for producing a conflict report
pub struct AnalyzeUseCase {
    table: Arc<PatternTable>,
    synthesizer: SynthesizeConflictsUseCase,
}

impl AnalyzeUseCase {
    pub fn new(table: Arc<PatternTable>) -> Self {
        Self {
            synthesizer: SynthesizeConflictsUseCase::new(Arc::clone(&table)),
            table,
        }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn LlmGateway>) -> Self {
        self.synthesizer = self.synthesizer.with_gateway(gateway);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn DocumentationFetcher>) -> Self {
        self.synthesizer = self.synthesizer.with_fetcher(fetcher);
        self
    }

    pub fn with_params(mut self, params: AnalysisParams) -> Self {
        self.synthesizer = self.synthesizer.with_params(params);
        self
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(&self, input: AnalyzeInput) -> Result<Report, AnalyzeError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the use case with progress callbacks.
    ///
    /// Fails only on an empty tool set or a broken invariant. Synthesis
    /// problems are recorded in the report instead.
    pub async fn execute_with_progress(
        &self,
        input: AnalyzeInput,
        progress: &dyn ProgressNotifier,
    ) -> Result<Report, AnalyzeError> {
        let roster = analyzed_tools(&input.detected, &input.planned);
        if roster.is_empty() {
            return Err(AnalyzeError::NoTools);
        }
        info!("Analyzing {} tools", roster.len());

        progress.on_phase_start(AnalysisPhase::StaticRules, 1);
        let static_conflicts = StaticRuleEngine::new(&self.table).evaluate_roster(&roster)?;
        debug!("Static rules produced {} conflicts", static_conflicts.len());
        progress.on_phase_complete(AnalysisPhase::StaticRules);

        let mut degradations = input.degradations;
        let (ai_conflicts, insights, mode) = if input.static_only {
            info!("Static-only analysis requested");
            (Vec::new(), ModelInsights::default(), AnalysisMode::StaticOnly)
        } else {
            let outcome = self.synthesizer.execute_with_progress(&roster, progress).await;
            degradations.extend(outcome.degradations);
            (outcome.conflicts.unwrap_or_default(), outcome.insights, outcome.mode)
        };

        progress.on_phase_start(AnalysisPhase::Ranking, 1);
        let merged = merge_conflicts(static_conflicts, ai_conflicts);
        let ranked = rank_conflicts(merged, &roster);
        let order = installation_order(&roster, &ranked)?;
        progress.on_phase_complete(AnalysisPhase::Ranking);

        info!(
            "Analysis complete: {} conflicts ({})",
            ranked.len(),
            mode
        );
        Ok(Report::new(roster, ranked, order, mode, degradations).with_insights(insights))
    }
}
