// src/config.rs
//
// Configuration file parsing.
// A TOML file names the remote API, its credentials and the report defaults;
// credentials can also come from the environment.

use crate::error::{ReportError, Result};
use crate::models::{DEFAULT_MAX_ROWS, DEFAULT_PER_PAGE};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_BASE_URL: &str = "https://api.current-rms.com/api/v1";

pub const ENV_API_URL: &str = "RMS_API_URL";
pub const ENV_SUBDOMAIN: &str = "RMS_SUBDOMAIN";
pub const ENV_API_TOKEN: &str = "RMS_API_TOKEN";

// =============================================================================
// Configuration Types
// =============================================================================

/// Root configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Global configuration settings.
#[derive(Debug, Default, Deserialize)]
pub struct GlobalConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: Option<String>,
}

/// Remote API connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Account subdomain, sent as `X-SUBDOMAIN`
    #[serde(default)]
    pub subdomain: String,
    /// API token, sent as `X-AUTH-TOKEN`
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Per-request read timeout; there is no crawl-wide deadline
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("rms-reports/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            subdomain: String::new(),
            token: String::new(),
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    pub fn has_credentials(&self) -> bool {
        !self.subdomain.is_empty() && !self.token.is_empty()
    }
}

/// Report defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_per_page")]
    pub default_per_page: u32,
    /// Row cap for full-collection crawls
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_per_page: default_per_page(),
            max_rows: default_max_rows(),
        }
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            ReportError::Config(format!(
                "failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ReportError::Config(format!("failed to parse config: {}", e)))
    }

    /// Overrides API settings from `RMS_API_URL`, `RMS_SUBDOMAIN` and
    /// `RMS_API_TOKEN` when they are set and non-empty.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
        }
        if let Some(subdomain) = lookup(ENV_SUBDOMAIN) {
            self.api.subdomain = subdomain;
        }
        if let Some(token) = lookup(ENV_API_TOKEN) {
            self.api.token = token;
        }
    }
}

// =============================================================================
// Default Configuration
// =============================================================================

/// Returns a default configuration string for documentation.
pub fn default_config_template() -> &'static str {
    r#"# Report Engine Configuration
#
# Credentials may instead come from RMS_SUBDOMAIN / RMS_API_TOKEN
# (and RMS_API_URL for the base URL).

[global]
# Used when RUST_LOG is not set
log_level = "info"

[api]
base_url = "https://api.current-rms.com/api/v1"
subdomain = "your-subdomain"
token = "your-api-token"
connect_timeout_secs = 10
timeout_secs = 30

[report]
# Page size for paged reports (1-100)
default_per_page = 25
# Row cap for full crawls, exports and aggregations
max_rows = 10000
"#
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_basic_config() {
        let config_str = r#"
            [global]
            log_level = "debug"

            [api]
            subdomain = "acme"
            token = "secret"
            timeout_secs = 5

            [report]
            max_rows = 500
        "#;

        let config = Config::from_str(config_str).unwrap();
        assert_eq!(config.global.log_level.as_deref(), Some("debug"));
        assert_eq!(config.api.subdomain, "acme");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.api.connect_timeout_secs, 10);
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert!(config.api.has_credentials());
        assert_eq!(config.report.max_rows, 500);
        assert_eq!(config.report.default_per_page, DEFAULT_PER_PAGE);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.report.max_rows, DEFAULT_MAX_ROWS);
        assert!(!config.api.has_credentials());
    }

    #[test]
    fn test_template_parses() {
        let config = Config::from_str(default_config_template()).unwrap();
        assert_eq!(config.api.subdomain, "your-subdomain");
        assert_eq!(config.report.default_per_page, 25);
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        assert!(matches!(
            Config::from_str("[api]\ntimeout_secs = \"soon\""),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_SUBDOMAIN, "from-env"),
            (ENV_API_TOKEN, "  "),
            (ENV_API_URL, "http://localhost:9000/api/v1"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::from_str("[api]\ntoken = \"file-token\"").unwrap();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.subdomain, "from-env");
        assert_eq!(config.api.token, "file-token");
        assert_eq!(config.api.base_url, "http://localhost:9000/api/v1");
    }
}
