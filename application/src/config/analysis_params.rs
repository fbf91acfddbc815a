//! Analysis parameters: timeouts, retries and prompt sizing.
//!
//! [`AnalysisParams`] groups the static parameters that control the scan and
//! analysis use cases. These are application-layer concerns, not domain policy.

use pitfall_domain::PromptBudget;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AnalysisParams {
    /// Per-detector time limit during a scan.
    pub detector_timeout: Duration,
    /// Time limit for one model call.
    pub model_timeout: Duration,
    /// Total model call attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each retry.
    pub retry_backoff: Duration,
    /// Time limit for one README fetch.
    pub doc_fetch_timeout: Duration,
    /// Prompt and excerpt size limits.
    pub prompt_budget: PromptBudget,
    /// Fused confidence below which detected tools are dropped.
    pub min_tool_confidence: f64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            detector_timeout: Duration::from_secs(30),
            model_timeout: Duration::from_secs(60),
            max_attempts: 2,
            retry_backoff: Duration::from_millis(500),
            doc_fetch_timeout: Duration::from_secs(30),
            prompt_budget: PromptBudget::default(),
            min_tool_confidence: 0.0,
        }
    }
}

impl AnalysisParams {
    // ==================== Builder Methods ====================

    pub fn with_detector_timeout(mut self, timeout: Duration) -> Self {
        self.detector_timeout = timeout;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_doc_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.doc_fetch_timeout = timeout;
        self
    }

    pub fn with_prompt_budget(mut self, budget: PromptBudget) -> Self {
        self.prompt_budget = budget;
        self
    }

    pub fn with_min_tool_confidence(mut self, threshold: f64) -> Self {
        self.min_tool_confidence = threshold;
        self
    }

    /// Backoff before retry number `retry` (1-based)
    pub fn backoff_for(&self, retry: u32) -> Duration {
        self.retry_backoff
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}
