//! Tool store port
//!
//! Persists the user's planned tools and the last scan result between runs.

use pitfall_domain::{DetectedTool, PlannedTool};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt store file {path}: {message}")]
    Corrupt { path: String, message: String },
}

/// Everything the store keeps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredTools {
    pub planned: Vec<PlannedTool>,
    pub detected: Vec<DetectedTool>,
}

impl StoredTools {
    /// Add or replace a planned tool by key; returns true when it was new
    pub fn upsert_planned(&mut self, tool: PlannedTool) -> bool {
        match self.planned.iter_mut().find(|p| p.tool_key == tool.tool_key) {
            Some(existing) => {
                *existing = tool;
                false
            }
            None => {
                self.planned.push(tool);
                true
            }
        }
    }

    /// Remove a planned tool by key; returns true when something was removed
    pub fn remove_planned(&mut self, tool_key: &str) -> bool {
        let before = self.planned.len();
        self.planned.retain(|p| p.tool_key != tool_key);
        self.planned.len() != before
    }
}

pub trait ToolStore: Send + Sync {
    fn load(&self) -> Result<StoredTools, StoreError>;
    fn save(&self, tools: &StoredTools) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_remove() {
        let mut tools = StoredTools::default();
        assert!(tools.upsert_planned(PlannedTool::new("gradio")));
        assert!(!tools.upsert_planned(PlannedTool::new("gradio").with_port(8501)));
        assert_eq!(tools.planned.len(), 1);
        assert_eq!(tools.planned[0].port, Some(8501));

        assert!(tools.remove_planned("gradio"));
        assert!(!tools.remove_planned("gradio"));
        assert!(tools.planned.is_empty());
    }
}
