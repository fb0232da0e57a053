//! Configuration loading.
//!
//! Projects may carry a `markweave.json` at the workspace root. Every field
//! is optional; a missing or unreadable file means all defaults. An invalid
//! file is reported and then treated as missing, the build never dies over
//! configuration.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs;

use crate::cli::BuildTarget;

/// Project configuration from `markweave.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectConfig {
    /// File extensions to process.
    pub extensions: Vec<String>,

    /// Glob patterns to exclude.
    pub exclude: Vec<String>,

    /// Output directory for rendered HTML, relative to the workspace.
    pub out_dir: Utf8PathBuf,

    /// Output directory for component runtime scripts.
    pub scripts_dir: Utf8PathBuf,

    /// Element names allowed to directly contain components, in addition
    /// to the document root.
    pub allowed_parents: Vec<String>,

    /// Build target.
    pub target: ConfigTarget,
}

/// Serde-friendly mirror of [`BuildTarget`].
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigTarget {
    #[default]
    Web,
    Ebook,
}

impl From<ConfigTarget> for BuildTarget {
    fn from(target: ConfigTarget) -> Self {
        match target {
            ConfigTarget::Web => BuildTarget::Web,
            ConfigTarget::Ebook => BuildTarget::Ebook,
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            extensions: vec![".md".to_string(), ".html".to_string()],
            exclude: Vec::new(),
            out_dir: Utf8PathBuf::from("build"),
            scripts_dir: Utf8PathBuf::from("build/scripts"),
            allowed_parents: vec!["details".to_string(), "tab-panel".to_string()],
            target: ConfigTarget::Web,
        }
    }
}

impl ProjectConfig {
    /// Loads configuration from `markweave.json` in the workspace root.
    pub fn load(workspace: &Utf8Path) -> Self {
        let path = workspace.join("markweave.json");
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: failed to parse {}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: failed to read {}: {}", path, e);
                Self::default()
            }
        }
    }

    /// File extensions to process, with the leading dot.
    pub fn file_extensions(&self) -> Vec<&str> {
        self.extensions.iter().map(|s| s.as_str()).collect()
    }
}
