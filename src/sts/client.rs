//! AssumeRole HTTP client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use super::request::{build_credential_request, CredentialRequest, CredentialRequestInput, Session};
use super::{CredentialIssuer, StsError, StsGrant, TemporaryCredentials};
use crate::config::Config;
use crate::metrics;
use crate::oss::{Credentials, CredentialsProvider};

/// Client for the identity service's AssumeRole action
///
/// Holds the long-term access key pair and a pooled HTTP client. Cheap to
/// share behind an `Arc`; every call builds its own signed request.
pub struct StsClient {
    config: Config,
    credentials: Credentials,
    endpoint: String,
    http: reqwest::Client,
}

impl StsClient {
    /// Create a client, reading the access key pair from `config.oss`
    pub fn new(config: Config) -> Result<Self, StsError> {
        config.validate()?;
        let credentials = CredentialsProvider::from_config(&config.oss)?;
        Self::with_credentials(config, credentials)
    }

    /// Create a client with an explicit access key pair
    pub fn with_credentials(config: Config, credentials: Credentials) -> Result<Self, StsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.sts.request_timeout_secs))
            .build()
            .map_err(|e| StsError::Configuration(format!("HTTP client: {}", e)))?;

        let endpoint = config.sts_endpoint();

        Ok(Self {
            config,
            credentials,
            endpoint,
            http,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Identity service endpoint requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build and sign a request with a fresh nonce and timestamp
    pub fn prepare(
        &self,
        file_name: &str,
        unique_id: Option<&str>,
    ) -> Result<CredentialRequest, StsError> {
        self.prepare_with_session(file_name, Session::generate(unique_id))
    }

    /// Build and sign a request for a caller-supplied session
    pub fn prepare_with_session(
        &self,
        file_name: &str,
        session: Session,
    ) -> Result<CredentialRequest, StsError> {
        let input = CredentialRequestInput {
            file_name,
            bucket: &self.config.oss.bucket,
            role_arn: &self.config.sts.role_arn,
            role_session_name: &self.config.sts.role_session_name,
            object_prefix: &self.config.sts.object_prefix,
            credentials: &self.credentials,
            duration_seconds: self.config.sts.token_expire_seconds,
        };
        build_credential_request(&input, session)
    }

    /// Request upload credentials for `file_name`.
    ///
    /// `unique_id` groups the object under `<prefix>/<unique_id>/`; a fresh
    /// 8-character id is generated when it is `None`.
    ///
    /// # Errors
    ///
    /// * [`StsError::Configuration`] - role, bucket or access key missing
    /// * [`StsError::InvalidRequest`] - empty file name, or a unique id
    ///   outside `[A-Za-z0-9-]`
    /// * [`StsError::UpstreamUnavailable`] - transport failure, timeout or 5xx
    /// * [`StsError::UpstreamAuthorization`] - 4xx, e.g. signature mismatch
    /// * [`StsError::UpstreamFormat`] - 2xx without usable `Credentials`
    #[tracing::instrument(
        name = "sts.assume_role",
        skip(self),
        fields(
            oss.bucket = %self.config.oss.bucket,
            sts.object_key = tracing::field::Empty,
            http.status_code = tracing::field::Empty
        ),
        err
    )]
    pub async fn request_credentials(
        &self,
        file_name: &str,
        unique_id: Option<&str>,
    ) -> Result<StsGrant, StsError> {
        let start = Instant::now();
        let result = self.execute(file_name, unique_id).await;
        let elapsed = start.elapsed().as_secs_f64();

        match &result {
            Ok(grant) => {
                metrics::record_credential_request("success", elapsed);
                tracing::info!(
                    object_key = %grant.object_key,
                    expiration = %grant.credentials.expiration,
                    duration_ms = (elapsed * 1000.0) as u64,
                    "Issued upload credentials"
                );
            }
            Err(e) => {
                metrics::record_credential_request(e.kind(), elapsed);
                tracing::warn!(
                    kind = e.kind(),
                    retryable = e.is_retryable(),
                    "Credential request failed"
                );
            }
        }

        result
    }

    async fn execute(
        &self,
        file_name: &str,
        unique_id: Option<&str>,
    ) -> Result<StsGrant, StsError> {
        let prepared = self.prepare(file_name, unique_id)?;
        let span = tracing::Span::current();
        span.record("sts.object_key", prepared.object_key.as_str());

        let url = prepared.signed.url(&self.endpoint);
        let response = self.http.get(&url).send().await.map_err(transport_error)?;

        let status = response.status();
        span.record("http.status_code", status.as_u16());

        let body = response.text().await.map_err(transport_error)?;

        if status.is_success() {
            let credentials = parse_credentials(&body)?;
            return Ok(StsGrant {
                credentials,
                bucket: self.config.oss.bucket.clone(),
                region: self.config.oss.region.clone(),
                endpoint: self.oss_endpoint(),
                object_key: prepared.object_key.into_string(),
            });
        }

        if status.is_client_error() {
            let error: ErrorResponse = serde_json::from_str(&body).unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                code = error.code.as_deref().unwrap_or("Unknown"),
                request_id = error.request_id.as_deref().unwrap_or("-"),
                "AssumeRole rejected"
            );
            return Err(StsError::UpstreamAuthorization {
                status: status.as_u16(),
                code: error.code.unwrap_or_else(|| "Unknown".to_string()),
                message: error.message.unwrap_or_else(|| {
                    status.canonical_reason().unwrap_or("Unknown").to_string()
                }),
                body,
            });
        }

        Err(StsError::UpstreamUnavailable {
            status: Some(status.as_u16()),
            message: format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ),
        })
    }

    /// Public OSS endpoint for uploads, defaulting to `<region>.aliyuncs.com`
    fn oss_endpoint(&self) -> String {
        if self.config.oss.endpoint.is_empty() {
            format!("{}.aliyuncs.com", self.config.oss.region)
        } else {
            self.config.oss.endpoint.clone()
        }
    }
}

#[async_trait]
impl CredentialIssuer for StsClient {
    async fn issue(
        &self,
        file_name: &str,
        unique_id: Option<&str>,
    ) -> Result<StsGrant, StsError> {
        self.request_credentials(file_name, unique_id).await
    }
}

fn transport_error(err: reqwest::Error) -> StsError {
    let message = if err.is_timeout() {
        format!("request timed out: {}", err)
    } else {
        err.to_string()
    };
    StsError::UpstreamUnavailable {
        status: err.status().map(|s| s.as_u16()),
        message,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleResponse {
    credentials: Option<RawCredentials>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCredentials {
    access_key_id: String,
    access_key_secret: String,
    security_token: String,
    expiration: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    request_id: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

/// Extract `Credentials` from a successful AssumeRole body
fn parse_credentials(body: &str) -> Result<TemporaryCredentials, StsError> {
    let format_error = |message: String| StsError::UpstreamFormat {
        message,
        body: body.to_string(),
    };

    let response: AssumeRoleResponse = serde_json::from_str(body)
        .map_err(|e| format_error(format!("invalid JSON: {}", e)))?;
    let raw = response
        .credentials
        .ok_or_else(|| format_error("missing Credentials".to_string()))?;

    Ok(TemporaryCredentials {
        access_key_id: raw.access_key_id,
        access_key_secret: raw.access_key_secret,
        security_token: raw.security_token,
        expiration: raw.expiration,
    })
}
