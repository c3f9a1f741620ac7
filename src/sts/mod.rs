//! STS module
//!
//! Obtains temporary, upload-scoped OSS credentials from the identity
//! service's `AssumeRole` action.
//!
//! # Flow
//!
//! 1. Generate an object key `pdfs/<uniqueId>/<unixMillis>-<fileName>`
//! 2. Attach a session policy allowing `oss:PutObject` on the bucket
//! 3. Canonicalize, percent-encode and HMAC-SHA1 sign the parameters
//! 4. `GET` the identity service and parse the `Credentials` payload
//!
//! # Example
//!
//! ```no_run
//! use oss_sts_broker::config::Config;
//! use oss_sts_broker::sts::StsClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let client = StsClient::new(config)?;
//!
//! let grant = client.request_credentials("report.pdf", None).await?;
//! println!("upload to {} until {}", grant.object_key, grant.credentials.expiration);
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! | Error | Class | Retry |
//! |-------|-------|-------|
//! | `Configuration` | configuration | never, alert the operator |
//! | `InvalidRequest` | rejected | no |
//! | `UpstreamFormat` | rejected | no |
//! | `UpstreamUnavailable` | transient | caller's choice |
//! | `UpstreamAuthorization` | rejected | no, check the signing inputs |

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::oss::CredentialsError;

pub mod client;
pub mod encoding;
pub mod policy;
pub mod request;
pub mod signer;

pub use client::StsClient;
pub use encoding::{percent_encode, percent_encode_protecting_encoded};
pub use policy::PolicyDocument;
pub use request::{build_credential_request, CredentialRequest, CredentialRequestInput, Session};
pub use signer::{SignedRequest, SigningRequest};

/// STS errors
#[derive(Error, Debug)]
pub enum StsError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid credential request: {0}")]
    InvalidRequest(String),

    #[error("Unexpected STS response: {message}; body: {body}")]
    UpstreamFormat { message: String, body: String },

    #[error("STS unavailable: {message}")]
    UpstreamUnavailable {
        status: Option<u16>,
        message: String,
    },

    #[error("STS rejected request ({status}): {code}: {message}")]
    UpstreamAuthorization {
        status: u16,
        code: String,
        message: String,
        body: String,
    },
}

/// Coarse error class for choosing between retry and fail-fast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Deployment defect; surface to the operator
    Configuration,
    /// Network failure or server-side error; the caller may retry
    Transient,
    /// The request or response was rejected; retrying will not help
    Rejected,
}

impl StsError {
    pub fn class(&self) -> ErrorClass {
        match self {
            StsError::Configuration(_) => ErrorClass::Configuration,
            StsError::UpstreamUnavailable { .. } => ErrorClass::Transient,
            StsError::InvalidRequest(_)
            | StsError::UpstreamFormat { .. }
            | StsError::UpstreamAuthorization { .. } => ErrorClass::Rejected,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            StsError::Configuration(_) => "configuration",
            StsError::InvalidRequest(_) => "invalid_request",
            StsError::UpstreamFormat { .. } => "upstream_format",
            StsError::UpstreamUnavailable { .. } => "upstream_unavailable",
            StsError::UpstreamAuthorization { .. } => "upstream_authorization",
        }
    }
}

impl From<ConfigError> for StsError {
    fn from(err: ConfigError) -> Self {
        StsError::Configuration(err.to_string())
    }
}

impl From<CredentialsError> for StsError {
    fn from(err: CredentialsError) -> Self {
        StsError::Configuration(err.to_string())
    }
}

/// Temporary credentials issued by the identity service
///
/// Owned by the caller for the duration of one upload and never persisted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: String,
    /// ISO-8601 expiry as reported by the service
    pub expiration: String,
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("security_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Result of a successful credential request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StsGrant {
    pub credentials: TemporaryCredentials,
    pub bucket: String,
    /// OSS region, e.g. `oss-cn-hangzhou`
    pub region: String,
    pub endpoint: String,
    pub object_key: String,
}

/// Issues upload credentials for a file
///
/// Implemented by [`StsClient`]; upload handlers depend on this trait so they
/// can be tested without the identity service.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    async fn issue(&self, file_name: &str, unique_id: Option<&str>)
        -> Result<StsGrant, StsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            StsError::Configuration("x".into()).class(),
            ErrorClass::Configuration
        );
        assert_eq!(
            StsError::UpstreamUnavailable {
                status: Some(503),
                message: "x".into()
            }
            .class(),
            ErrorClass::Transient
        );
        assert_eq!(
            StsError::UpstreamAuthorization {
                status: 403,
                code: "SignatureDoesNotMatch".into(),
                message: "x".into(),
                body: String::new(),
            }
            .class(),
            ErrorClass::Rejected
        );
        assert_eq!(
            StsError::UpstreamFormat {
                message: "x".into(),
                body: "{}".into()
            }
            .class(),
            ErrorClass::Rejected
        );
    }

    #[test]
    fn test_only_transient_errors_are_retryable() {
        assert!(StsError::UpstreamUnavailable {
            status: None,
            message: "timeout".into()
        }
        .is_retryable());
        assert!(!StsError::Configuration("x".into()).is_retryable());
        assert!(!StsError::InvalidRequest("x".into()).is_retryable());
    }

    #[test]
    fn test_format_error_message_includes_body() {
        let err = StsError::UpstreamFormat {
            message: "missing Credentials".into(),
            body: r#"{"RequestId":"abc"}"#.into(),
        };
        assert!(err.to_string().contains(r#"{"RequestId":"abc"}"#));
    }

    #[test]
    fn test_config_error_converts_to_configuration() {
        let err: StsError = ConfigError::ValidationError("sts.role_arn must be set".into()).into();
        assert!(matches!(err, StsError::Configuration(_)));
    }

    #[test]
    fn test_temporary_credentials_debug_redacts_secrets() {
        let creds = TemporaryCredentials {
            access_key_id: "STS.id".into(),
            access_key_secret: "tmp-secret".into(),
            security_token: "tmp-token".into(),
            expiration: "2024-01-01T01:00:00Z".into(),
        };
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("tmp-secret"));
        assert!(!debug.contains("tmp-token"));
    }

    struct RejectingIssuer;

    #[async_trait]
    impl CredentialIssuer for RejectingIssuer {
        async fn issue(
            &self,
            file_name: &str,
            _unique_id: Option<&str>,
        ) -> Result<StsGrant, StsError> {
            Err(StsError::InvalidRequest(format!("{} not allowed", file_name)))
        }
    }

    #[test]
    fn test_issuer_can_be_substituted() {
        let issuer: &dyn CredentialIssuer = &RejectingIssuer;
        let err = tokio_test::block_on(issuer.issue("a.exe", None)).unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
    }

    #[test]
    fn test_grant_serializes_camel_case() {
        let grant = StsGrant {
            credentials: TemporaryCredentials {
                access_key_id: "STS.id".into(),
                access_key_secret: "s".into(),
                security_token: "t".into(),
                expiration: "e".into(),
            },
            bucket: "b".into(),
            region: "oss-cn-hangzhou".into(),
            endpoint: "oss-cn-hangzhou.aliyuncs.com".into(),
            object_key: "pdfs/x/1-a.pdf".into(),
        };
        let json = serde_json::to_value(&grant).unwrap();
        assert_eq!(json["objectKey"], "pdfs/x/1-a.pdf");
        assert_eq!(json["credentials"]["securityToken"], "t");
    }
}
