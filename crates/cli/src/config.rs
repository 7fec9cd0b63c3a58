//! Optional settings file.
//!
//! ```toml
//! timeout_secs = 30
//! base_url = "https://staging.example.com"
//! disabled_tools = ["delete_user"]
//! ```
//!
//! Command-line flags take precedence over file values.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use apitool_core::executor::DEFAULT_TIMEOUT;

/// Settings file structure
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub timeout_secs: Option<u64>,
    pub base_url: Option<String>,
    pub disabled_tools: Vec<String>,
}

impl Settings {
    /// Load settings from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .map_err(|err| format!("Failed to read config file {}: {err}", path.display()))?;
        let settings: Self = toml::from_str(&contents)
            .map_err(|err| format!("Failed to parse config file {}: {err}", path.display()))?;
        if settings.timeout_secs == Some(0) {
            return Err("timeout_secs must be greater than zero".to_string());
        }
        Ok(settings)
    }

    /// Call timeout: flag, then file, then the executor default.
    pub fn timeout(&self, flag: Option<u64>) -> Duration {
        flag.or(self.timeout_secs)
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs)
    }

    /// Base URL override: flag, then file.
    pub fn base_url(&self, flag: Option<&str>) -> Option<String> {
        flag.map(str::to_string).or_else(|| self.base_url.clone())
    }

    /// Tools to disable: the file list followed by any extra flag entries.
    pub fn disabled_tools(&self, flag: &[String]) -> Vec<String> {
        let mut names = self.disabled_tools.clone();
        for name in flag {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}
