//! Application layer for pitfall-detector
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::AnalysisParams;
pub use ports::{
    detector::{Detector, DetectorError, ScanContext},
    documentation::{DocFetchError, DocumentationFetcher},
    llm_gateway::{GatewayError, LlmGateway, LlmSession},
    progress::{AnalysisPhase, NoProgress, ProgressNotifier},
    tool_store::{StoreError, StoredTools, ToolStore},
};
pub use use_cases::analyze::{AnalyzeError, AnalyzeInput, AnalyzeUseCase};
pub use use_cases::scan_environment::{
    DetectorFailure, ScanEnvironmentInput, ScanEnvironmentOutput, ScanEnvironmentUseCase,
};
pub use use_cases::synthesize::{SynthesisOutcome, SynthesizeConflictsUseCase};
