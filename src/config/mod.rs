//! Configuration module for Repodrop
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion, plus a pure environment-variable mode for
//! the common case of a token, an owner and a repository name.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Environment variable holding the GitHub access token
pub const ENV_TOKEN: &str = "REPODROP_TOKEN";
/// Environment variable holding the account or organization
pub const ENV_OWNER: &str = "REPODROP_OWNER";
/// Environment variable holding the target repository
pub const ENV_REPO: &str = "REPODROP_REPO";
/// Optional API base override (GitHub Enterprise, test servers)
pub const ENV_API_BASE: &str = "REPODROP_API_BASE";
/// Optional target branch
pub const ENV_BRANCH: &str = "REPODROP_BRANCH";

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
///
/// # Examples
///
/// ```ignore
/// std::env::set_var("MY_VAR", "value");
/// let result = expand_env_vars("prefix-${MY_VAR}-suffix");
/// assert_eq!(result, "prefix-value-suffix");
///
/// let result = expand_env_vars("${MISSING:-default}");
/// assert_eq!(result, "default");
/// ```
pub(crate) fn expand_env_vars(s: &str) -> String {
    let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("static regex is valid");
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name.as_str()) {
            Ok(val) => val,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                // No env var and no default. Keep the original placeholder.
                None => full_match.as_str().to_string(),
            },
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);

    result
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub github: GitHubConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Build configuration from `REPODROP_*` environment variables.
    ///
    /// Missing credentials are not an error here: the Contents API reports
    /// them when the upload is attempted.
    pub fn from_env() -> Result<Self, ConfigError> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let github = GitHubConfig {
            token: var(ENV_TOKEN).unwrap_or_default(),
            owner: var(ENV_OWNER).unwrap_or_default(),
            repository: var(ENV_REPO).unwrap_or_default(),
            api_base: var(ENV_API_BASE).unwrap_or_else(default_api_base),
            branch: var(ENV_BRANCH),
            user_agent: default_user_agent(),
        };

        for (name, value) in [
            (ENV_TOKEN, &github.token),
            (ENV_OWNER, &github.owner),
            (ENV_REPO, &github.repository),
        ] {
            if value.is_empty() {
                tracing::warn!(variable = name, "environment variable is not set");
            }
        }

        let config = Config {
            github,
            upload: UploadConfig::default(),
            notifications: NotificationConfig::default(),
            logging: LoggingConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_http_url(&self.github.api_base) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid api_base '{}': must start with http:// or https://",
                self.github.api_base
            )));
        }

        if self.upload.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "upload.chunk_size must be greater than zero".into(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level '{}': must be trace, debug, info, warn or error",
                    other
                )))
            }
        }

        Ok(())
    }
}

/// GitHub repository and credential configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Personal access token sent as a bearer credential
    #[serde(default)]
    pub token: String,
    /// Account or organization owning the repository
    #[serde(default)]
    pub owner: String,
    /// Repository receiving the uploads
    #[serde(default)]
    pub repository: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Target branch; the repository default branch when absent
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    format!("repodrop/{}", env!("CARGO_PKG_VERSION"))
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Size of the body slices handed to the transport; one progress
    /// report per slice.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Size quoted to the user when the service rejects a file as too large
    #[serde(default = "default_size_limit_mb")]
    pub size_limit_mb: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            size_limit_mb: default_size_limit_mb(),
        }
    }
}

fn default_chunk_size() -> usize {
    65536 // 64KB
}

fn default_size_limit_mb() -> u64 {
    25
}

/// Notification display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_position")]
    pub position: String,
    #[serde(default = "default_uploaded_ms")]
    pub uploaded_ms: u64,
    #[serde(default = "default_copied_ms")]
    pub copied_ms: u64,
    #[serde(default = "default_error_ms")]
    pub error_ms: u64,
    /// How long to keep serving a copied link before exiting (Linux)
    #[serde(default = "default_clipboard_hold_ms")]
    pub clipboard_hold_ms: u64,
}

impl NotificationConfig {
    pub fn uploaded_duration(&self) -> Duration {
        Duration::from_millis(self.uploaded_ms)
    }

    pub fn copied_duration(&self) -> Duration {
        Duration::from_millis(self.copied_ms)
    }

    pub fn error_duration(&self) -> Duration {
        Duration::from_millis(self.error_ms)
    }

    pub fn clipboard_hold(&self) -> Duration {
        Duration::from_millis(self.clipboard_hold_ms)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            position: default_position(),
            uploaded_ms: default_uploaded_ms(),
            copied_ms: default_copied_ms(),
            error_ms: default_error_ms(),
            clipboard_hold_ms: default_clipboard_hold_ms(),
        }
    }
}

fn default_position() -> String {
    "top-center".to_string()
}

fn default_uploaded_ms() -> u64 {
    2000
}

fn default_copied_ms() -> u64 {
    800
}

fn default_error_ms() -> u64 {
    3000
}

fn default_clipboard_hold_ms() -> u64 {
    10_000
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
