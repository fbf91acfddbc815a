//! AI-augmented synthesis: prompt construction and model-output parsing.

pub mod parsing;
pub mod prompt;

pub use parsing::{
    DEFAULT_AI_CONFIDENCE, confidence_from_value, parse_model_conflicts, parse_model_insights,
};
pub use prompt::{
    AnalysisPrompt, DEFAULT_EXCERPT_BUDGET, DEFAULT_PROMPT_BUDGET, PromptBudget, extract_excerpt,
};
