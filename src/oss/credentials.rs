//! OSS Credentials Module
//!
//! The long-term access key pair used to sign AssumeRole requests.
//!
//! # Example
//!
//! ```
//! use oss_sts_broker::oss::Credentials;
//!
//! let creds = Credentials::new("access-key", "secret-key");
//! assert_eq!(creds.access_key_id(), "access-key");
//! assert!(!format!("{:?}", creds).contains("secret-key"));
//! ```

use crate::config::OssConfig;
use std::fmt;
use thiserror::Error;

/// Credential loading errors
#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

/// Long-term access key pair
///
/// The secret is only ever used as HMAC key material and is redacted from
/// `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    access_key_id: String,
    access_key_secret: String,
}

impl Credentials {
    /// Create new credentials
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
        }
    }

    /// Get the access key ID
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get the access key secret
    pub fn access_key_secret(&self) -> &str {
        &self.access_key_secret
    }

    fn ensure_present(self) -> Result<Self, CredentialsError> {
        if self.access_key_id.is_empty() {
            return Err(CredentialsError::MissingCredentials(
                "access_key_id is empty".into(),
            ));
        }
        if self.access_key_secret.is_empty() {
            return Err(CredentialsError::MissingCredentials(
                "access_key_secret is empty".into(),
            ));
        }
        Ok(self)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .finish()
    }
}

/// Loads the access key pair from its configured source
pub struct CredentialsProvider;

impl CredentialsProvider {
    /// Load credentials from OssConfig
    ///
    /// Uses the `access_key_id` and `access_key_secret` fields from the configuration.
    pub fn from_config(config: &OssConfig) -> Result<Credentials, CredentialsError> {
        let access_key = config.access_key_id.as_ref().ok_or_else(|| {
            CredentialsError::MissingCredentials("access_key_id not set in config".into())
        })?;

        let secret_key = config.access_key_secret.as_ref().ok_or_else(|| {
            CredentialsError::MissingCredentials("access_key_secret not set in config".into())
        })?;

        Credentials::new(access_key.clone(), secret_key.clone()).ensure_present()
    }
}
