//! JSON file tool store
//!
//! Keeps planned tools and the last scan in a single file, written through a
//! temporary sibling and renamed into place.

use chrono::{DateTime, Utc};
use pitfall_application::{StoreError, StoredTools, ToolStore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    tools: StoredTools,
}

pub struct JsonToolStore {
    path: PathBuf,
}

impl JsonToolStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_DATA_HOME/pitfall-detector/tools.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("pitfall-detector").join("tools.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, message: impl Into<String>) -> StoreError {
        StoreError::Corrupt {
            path: self.path.display().to_string(),
            message: message.into(),
        }
    }
}

impl ToolStore for JsonToolStore {
    fn load(&self) -> Result<StoredTools, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No tool store at {}, starting empty", self.path.display());
                return Ok(StoredTools::default());
            }
            Err(e) => return Err(e.into()),
        };
        let file: StoreFile =
            serde_json::from_str(&text).map_err(|e| self.corrupt(e.to_string()))?;
        if file.version > STORE_VERSION {
            return Err(self.corrupt(format!(
                "written by a newer version (format {})",
                file.version
            )));
        }
        Ok(file.tools)
    }

    fn save(&self, tools: &StoredTools) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = StoreFile {
            version: STORE_VERSION,
            saved_at: Some(Utc::now()),
            tools: tools.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| self.corrupt(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(
            planned = tools.planned.len(),
            detected = tools.detected.len(),
            "Saved tool store to {}",
            self.path.display()
        );
        Ok(())
    }
}
