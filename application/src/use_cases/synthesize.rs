//! Synthesize Conflicts use case
//!
//! Best-effort AI analysis: fetch documentation, send one batched prompt,
//! parse the answer. Every failure degrades to "no AI conflicts" and is
//! recorded; nothing here returns an error.

use crate::config::AnalysisParams;
use crate::ports::documentation::{DocFetchError, DocumentationFetcher};
use crate::ports::llm_gateway::{GatewayError, LlmGateway};
use crate::ports::progress::{AnalysisPhase, NoProgress, ProgressNotifier};
use futures::future::join_all;
use pitfall_domain::{
    AnalysisMode, AnalysisPrompt, AnalyzedTool, Conflict, Degradation, ModelInsights,
    PatternTable, parse_model_conflicts, parse_model_insights,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one synthesis attempt
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOutcome {
    /// `None` when synthesis was skipped or failed
    pub conflicts: Option<Vec<Conflict>>,
    /// Empty unless the model answered with usable JSON
    pub insights: ModelInsights,
    pub mode: AnalysisMode,
    pub degradations: Vec<Degradation>,
}

impl SynthesisOutcome {
    fn skipped(degradation: Degradation) -> Self {
        Self {
            conflicts: None,
            insights: ModelInsights::default(),
            mode: AnalysisMode::StaticOnly,
            degradations: vec![degradation],
        }
    }
}

/// Use case for AI-augmented conflict synthesis
pub struct SynthesizeConflictsUseCase {
    gateway: Option<Arc<dyn LlmGateway>>,
    fetcher: Option<Arc<dyn DocumentationFetcher>>,
    table: Arc<PatternTable>,
    params: AnalysisParams,
}

impl SynthesizeConflictsUseCase {
    pub fn new(table: Arc<PatternTable>) -> Self {
        Self {
            gateway: None,
            fetcher: None,
            table,
            params: AnalysisParams::default(),
        }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn LlmGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn DocumentationFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_params(mut self, params: AnalysisParams) -> Self {
        self.params = params;
        self
    }

    pub fn has_gateway(&self) -> bool {
        self.gateway.is_some()
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(&self, tools: &[AnalyzedTool]) -> SynthesisOutcome {
        self.execute_with_progress(tools, &NoProgress).await
    }

    pub async fn execute_with_progress(
        &self,
        tools: &[AnalyzedTool],
        progress: &dyn ProgressNotifier,
    ) -> SynthesisOutcome {
        let Some(gateway) = &self.gateway else {
            info!("No model credentials configured; skipping AI analysis");
            return SynthesisOutcome::skipped(Degradation::NoCredentials);
        };

        let mut degradations = Vec::new();

        let docs = self.fetch_documentation(tools, progress).await;
        let missing: Vec<String> = tools
            .iter()
            .zip(&docs)
            .filter(|(_, doc)| doc.is_none())
            .map(|(tool, _)| tool.tool_key.clone())
            .collect();
        if !missing.is_empty() {
            degradations.push(Degradation::MissingDocumentation { tools: missing });
        }

        let prompt = AnalysisPrompt::build(tools, &self.table, &docs, self.params.prompt_budget);
        debug!("Synthesis prompt: {} chars", prompt.len());

        progress.on_phase_start(AnalysisPhase::Synthesis, 1);
        let response = self.call_model(gateway.as_ref(), &prompt).await;
        progress.on_task_complete(AnalysisPhase::Synthesis, gateway.model(), response.is_ok());
        progress.on_phase_complete(AnalysisPhase::Synthesis);

        let response = match response {
            Ok(text) => text,
            Err(e) => {
                warn!("AI analysis failed, falling back to static rules: {}", e);
                degradations.push(Degradation::SynthesisFailed {
                    reason: e.to_string(),
                });
                return SynthesisOutcome {
                    conflicts: None,
                    insights: ModelInsights::default(),
                    mode: AnalysisMode::StaticFallback,
                    degradations,
                };
            }
        };

        match parse_model_conflicts(&response, tools) {
            Some(conflicts) => {
                info!("AI analysis reported {} conflicts", conflicts.len());
                SynthesisOutcome {
                    conflicts: Some(conflicts),
                    insights: parse_model_insights(&response, tools),
                    mode: AnalysisMode::Hybrid,
                    degradations,
                }
            }
            None => {
                warn!("Model output contained no usable JSON");
                degradations.push(Degradation::UnparseableModelOutput);
                SynthesisOutcome {
                    conflicts: None,
                    insights: ModelInsights::default(),
                    mode: AnalysisMode::StaticFallback,
                    degradations,
                }
            }
        }
    }

    /// Fetch READMEs concurrently; results stay in tool declaration order
    async fn fetch_documentation(
        &self,
        tools: &[AnalyzedTool],
        progress: &dyn ProgressNotifier,
    ) -> Vec<Option<String>> {
        let Some(fetcher) = &self.fetcher else {
            return vec![None; tools.len()];
        };

        progress.on_phase_start(AnalysisPhase::Documentation, tools.len());
        let timeout = self.params.doc_fetch_timeout;

        let futures = tools.iter().map(|tool| {
            let url = tool
                .github_url
                .clone()
                .or_else(|| self.table.profile(&tool.tool_key).and_then(|p| p.github_url.clone()));
            async move {
                let Some(url) = url else {
                    return None;
                };
                let result = match tokio::time::timeout(timeout, fetcher.fetch_readme(&url)).await {
                    Ok(result) => result,
                    Err(_) => Err(DocFetchError::Timeout),
                };
                match result {
                    Ok(readme) => Some(readme),
                    Err(e) => {
                        warn!("Documentation for {} unavailable: {}", tool.tool_key, e);
                        None
                    }
                }
            }
        });

        let docs = join_all(futures).await;
        for (tool, doc) in tools.iter().zip(&docs) {
            progress.on_task_complete(AnalysisPhase::Documentation, &tool.tool_key, doc.is_some());
        }
        progress.on_phase_complete(AnalysisPhase::Documentation);
        docs
    }

    /// One model call with timeout and bounded retry on transient errors
    async fn call_model(&self, gateway: &dyn LlmGateway, prompt: &str) -> Result<String, GatewayError> {
        let mut attempt = 1;
        loop {
            let call = async {
                let session = gateway
                    .create_session_with_system_prompt(AnalysisPrompt::system())
                    .await?;
                session.send(prompt).await
            };
            let result = match tokio::time::timeout(self.params.model_timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::Timeout),
            };

            match result {
                Err(e) if e.is_transient() && attempt < self.params.max_attempts => {
                    let backoff = self.params.backoff_for(attempt);
                    warn!(
                        "Model call attempt {} failed ({}); retrying in {}ms",
                        attempt,
                        e,
                        backoff.as_millis()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
