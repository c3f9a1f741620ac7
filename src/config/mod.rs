//! Configuration module for OSS STS Broker
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and comprehensive validation. The same
//! settings can also be read straight from the process environment with
//! [`Config::from_env`].
//!
//! Configuration is loaded once at process start and handed to
//! [`StsClient::new`](crate::sts::StsClient::new); nothing here is global.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
///
/// Variable names must start with a letter or underscore and contain only
/// uppercase letters, digits, and underscores.
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
    let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").unwrap();
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let full_match = cap.get(0).unwrap();
        let var_name = cap.get(1).unwrap().as_str();

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name) {
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

/// Derive the STS region from an OSS region name.
///
/// OSS regions carry an `oss-` prefix (`oss-cn-hangzhou`) that the identity
/// service does not use (`cn-hangzhou`).
pub fn sts_region(oss_region: &str) -> &str {
    oss_region.strip_prefix("oss-").unwrap_or(oss_region)
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
    pub oss: OssConfig,
    pub sts: StsConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Load configuration from environment variables
    ///
    /// Reads `OSS_BUCKET`, `OSS_REGION`, `OSS_ENDPOINT`, `OSS_ACCESS_KEY_ID`,
    /// `OSS_ACCESS_KEY_SECRET`, `STS_ROLE_ARN`, `STS_ROLE_SESSION_NAME`,
    /// `STS_TOKEN_EXPIRE_SECONDS`, `STS_ENDPOINT` and `STS_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            oss: OssConfig {
                bucket: env_or("OSS_BUCKET", ""),
                region: env_or("OSS_REGION", &default_oss_region()),
                endpoint: env_or("OSS_ENDPOINT", ""),
                access_key_id: non_empty_env("OSS_ACCESS_KEY_ID"),
                access_key_secret: non_empty_env("OSS_ACCESS_KEY_SECRET"),
            },
            sts: StsConfig {
                role_arn: env_or("STS_ROLE_ARN", ""),
                role_session_name: env_or(
                    "STS_ROLE_SESSION_NAME",
                    &default_role_session_name(),
                ),
                token_expire_seconds: parse_env(
                    "STS_TOKEN_EXPIRE_SECONDS",
                    default_token_expire_seconds(),
                )?,
                object_prefix: default_object_prefix(),
                endpoint: non_empty_env("STS_ENDPOINT"),
                request_timeout_secs: parse_env(
                    "STS_REQUEST_TIMEOUT_SECS",
                    default_request_timeout_secs(),
                )?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oss.bucket.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "oss.bucket must be set".into(),
            ));
        }

        if self.oss.region.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "oss.region must be set".into(),
            ));
        }

        for (name, value) in [
            ("oss.access_key_id", &self.oss.access_key_id),
            ("oss.access_key_secret", &self.oss.access_key_secret),
        ] {
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                return Err(ConfigError::ValidationError(format!("{} must be set", name)));
            }
        }

        if self.sts.role_arn.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "sts.role_arn must be set".into(),
            ));
        }

        if self.sts.role_session_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "sts.role_session_name cannot be empty".into(),
            ));
        }

        if self.sts.token_expire_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "sts.token_expire_seconds must be greater than 0".into(),
            ));
        }

        if self.sts.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sts.request_timeout_secs must be greater than 0".into(),
            ));
        }

        if let Some(ref endpoint) = self.sts.endpoint {
            if !is_valid_http_url(endpoint) {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid STS endpoint '{}': must start with http:// or https://",
                    endpoint
                )));
            }
        }

        Ok(())
    }

    /// Region used by the identity service
    pub fn sts_region(&self) -> &str {
        sts_region(&self.oss.region)
    }

    /// Identity service endpoint, either the configured override or the
    /// regional default `https://sts.<region>.aliyuncs.com`.
    pub fn sts_endpoint(&self) -> String {
        self.sts
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://sts.{}.aliyuncs.com", self.sts_region()))
    }
}

/// Unset and empty variables both fall back to `default`
fn env_or(name: &str, default: &str) -> String {
    non_empty_env(name).unwrap_or_else(|| default.to_string())
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(default),
        Ok(raw) => raw.trim().parse().map_err(|_| {
            ConfigError::ValidationError(format!(
                "{} must be a positive integer, got '{}'",
                name, raw
            ))
        }),
        Err(_) => Ok(default),
    }
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OssConfig {
    pub bucket: String,
    #[serde(default = "default_oss_region")]
    pub region: String,
    /// Public OSS endpoint host, e.g. `oss-cn-hangzhou.aliyuncs.com`
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub access_key_secret: Option<String>,
}

fn default_oss_region() -> String {
    "oss-cn-hangzhou".to_string()
}

/// Identity service (AssumeRole) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StsConfig {
    #[serde(default)]
    pub role_arn: String,

    /// Prefix for `RoleSessionName`; the per-upload unique id is appended.
    #[serde(default = "default_role_session_name")]
    pub role_session_name: String,

    /// Lifetime of issued credentials. The service enforces its own upper bound.
    #[serde(default = "default_token_expire_seconds")]
    pub token_expire_seconds: u64,

    /// First path segment of generated object keys.
    #[serde(default = "default_object_prefix")]
    pub object_prefix: String,

    /// Override for the identity service endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_role_session_name() -> String {
    "pdf-upload-session".to_string()
}

fn default_token_expire_seconds() -> u64 {
    3600
}

fn default_object_prefix() -> String {
    "pdfs".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}
