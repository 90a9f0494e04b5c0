use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::color::Theme;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "CARLOT_CONFIG";
/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "carlot.json";

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Startup settings. Every field has a default, so `{}` is a valid file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Dataset loaded at startup; otherwise use File → Open.
    pub data_path: Option<PathBuf>,
    /// State selected after loading, when present in the data.
    pub default_state: String,
    pub theme: Theme,
    pub summary: SummaryConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Set to false to skip network lookups entirely.
    pub enabled: bool,
    pub sentences: usize,
    pub timeout_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            default_state: "MA".to_string(),
            theme: Theme::default(),
            summary: SummaryConfig::default(),
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sentences: 4,
            timeout_secs: 5,
        }
    }
}

impl DashboardConfig {
    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Resolve the config: `$CARLOT_CONFIG`, then `./carlot.json`, then
    /// defaults. A file that exists but fails to parse is an error.
    pub fn discover() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::from_file(local);
        }
        Ok(Self::default())
    }
}
