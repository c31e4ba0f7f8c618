use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ParcelError, Result};

/// Context configuration, usually read from a TOML file:
///
/// ```toml
/// pretty = true
/// output = "assets"
///
/// [[sources]]
/// path = "assets"
/// priority = 0
///
/// [[sources]]
/// path = "vendor/assets"
/// priority = 10
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParcelConfig {
    /// Read layers, searched by ascending priority.
    pub sources: Vec<SourceConfig>,
    /// Directory documents are saved into. Saving is disabled when unset.
    pub output: Option<PathBuf>,
    /// Write indented JSON.
    pub pretty: bool,
}

impl Default for ParcelConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            output: None,
            pretty: true,
        }
    }
}

/// One directory read layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub priority: i32,
}

impl ParcelConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ParcelError::Config(e.to_string()))
    }

    /// Read and parse the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| ParcelError::Config(format!("{}: {e}", path.display())))
    }

    /// Append a source layer.
    pub fn with_source(mut self, path: impl Into<PathBuf>, priority: i32) -> Self {
        self.sources.push(SourceConfig {
            path: path.into(),
            priority,
        });
        self
    }
}
