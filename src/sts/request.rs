//! Assembly of a single AssumeRole credential request.
//!
//! [`build_credential_request`] is pure: every source of variation (unique
//! id, nonce, timestamp) comes in through a [`Session`], so a fixed session
//! always yields the same object key and the same signature.

use chrono::{DateTime, SecondsFormat, Utc};

use super::policy::PolicyDocument;
use super::signer::{
    SignedRequest, SigningRequest, ACTION, API_VERSION, FORMAT, SIGNATURE_METHOD,
    SIGNATURE_VERSION,
};
use super::StsError;
use crate::oss::{new_unique_id, Credentials, ObjectKey};

/// Everything a credential request needs besides per-call randomness
#[derive(Debug, Clone)]
pub struct CredentialRequestInput<'a> {
    pub file_name: &'a str,
    pub bucket: &'a str,
    pub role_arn: &'a str,
    /// Prefix for `RoleSessionName`; `-<uniqueId>` is appended
    pub role_session_name: &'a str,
    pub object_prefix: &'a str,
    pub credentials: &'a Credentials,
    pub duration_seconds: u64,
}

/// Per-call values: upload id, replay nonce and request time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub unique_id: String,
    pub nonce: String,
    pub timestamp: DateTime<Utc>,
}

impl Session {
    /// Fresh nonce and timestamp; `unique_id` is generated when absent or empty
    pub fn generate(unique_id: Option<&str>) -> Self {
        let unique_id = match unique_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => new_unique_id(),
        };
        Self {
            unique_id,
            nonce: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
        }
    }

    /// ISO-8601 UTC timestamp with milliseconds, e.g. `2024-01-01T00:00:00.000Z`
    pub fn timestamp_param(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// A signed AssumeRole request and the object key it was issued for
#[derive(Debug, Clone)]
pub struct CredentialRequest {
    pub object_key: ObjectKey,
    pub session: Session,
    pub signed: SignedRequest,
}

/// Build the object key, policy and signed parameter set for one upload.
///
/// Fails with [`StsError::Configuration`] when the role, bucket or access key
/// pair is missing and with [`StsError::InvalidRequest`] for an empty file
/// name or a unique id outside `[A-Za-z0-9-]`.
pub fn build_credential_request(
    input: &CredentialRequestInput<'_>,
    session: Session,
) -> Result<CredentialRequest, StsError> {
    require_config("role_arn", input.role_arn)?;
    require_config("bucket", input.bucket)?;
    require_config("access_key_id", input.credentials.access_key_id())?;
    require_config("access_key_secret", input.credentials.access_key_secret())?;
    if input.duration_seconds == 0 {
        return Err(StsError::Configuration(
            "token duration must be greater than 0".into(),
        ));
    }
    if input.file_name.is_empty() {
        return Err(StsError::InvalidRequest("file name is empty".into()));
    }
    if !is_valid_unique_id(&session.unique_id) {
        return Err(StsError::InvalidRequest(format!(
            "unique id '{}' must be non-empty and contain only A-Z, a-z, 0-9 or '-'",
            session.unique_id
        )));
    }

    let object_key = ObjectKey::new(
        input.object_prefix,
        &session.unique_id,
        session.timestamp.timestamp_millis(),
        input.file_name,
    );

    let policy = PolicyDocument::put_object_for_bucket(input.bucket)
        .to_base64()
        .map_err(|e| StsError::InvalidRequest(format!("policy encoding failed: {}", e)))?;

    let request = SigningRequest::from_params([
        ("Action", ACTION.to_string()),
        ("Version", API_VERSION.to_string()),
        ("Format", FORMAT.to_string()),
        ("RoleArn", input.role_arn.to_string()),
        (
            "RoleSessionName",
            format!("{}-{}", input.role_session_name, session.unique_id),
        ),
        ("DurationSeconds", input.duration_seconds.to_string()),
        ("Policy", policy),
        ("SignatureMethod", SIGNATURE_METHOD.to_string()),
        ("SignatureVersion", SIGNATURE_VERSION.to_string()),
        ("SignatureNonce", session.nonce.clone()),
        ("Timestamp", session.timestamp_param()),
        ("AccessKeyId", input.credentials.access_key_id().to_string()),
    ]);

    let signed = request.sign(input.credentials.access_key_secret());

    Ok(CredentialRequest {
        object_key,
        session,
        signed,
    })
}

/// The id becomes one object key segment and part of `RoleSessionName`
fn is_valid_unique_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

fn require_config(name: &str, value: &str) -> Result<(), StsError> {
    if value.trim().is_empty() {
        return Err(StsError::Configuration(format!("{} must be set", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            unique_id: "a1b2c3d4".into(),
            nonce: "3ee8c1b8-83d3-44af-a94f-4e0ad82fd6cf".into(),
            timestamp: "2024-01-01T00:00:00Z".parse().unwrap(),
        }
    }

    fn input<'a>(credentials: &'a Credentials, file_name: &'a str) -> CredentialRequestInput<'a> {
        CredentialRequestInput {
            file_name,
            bucket: "pdf-share-bucket",
            role_arn: "acs:ram::1234567890123456:role/pdf-uploader",
            role_session_name: "pdf-upload-session",
            object_prefix: "pdfs",
            credentials,
            duration_seconds: 3600,
        }
    }

    #[test]
    fn test_timestamp_has_millisecond_precision() {
        assert_eq!(session().timestamp_param(), "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_generated_session_uses_given_unique_id() {
        let s = Session::generate(Some("fixed123"));
        assert_eq!(s.unique_id, "fixed123");
        assert_eq!(s.nonce.len(), 36);
    }

    #[test]
    fn test_generated_session_fills_missing_unique_id() {
        assert_eq!(Session::generate(None).unique_id.len(), 8);
        assert_eq!(Session::generate(Some("")).unique_id.len(), 8);
    }

    #[test]
    fn test_fixed_protocol_fields() {
        let creds = Credentials::new("id", "secret");
        let req = build_credential_request(&input(&creds, "a.pdf"), session()).unwrap();
        let params = req.signed.request();
        assert_eq!(params.get("Action"), Some("AssumeRole"));
        assert_eq!(params.get("Version"), Some("2015-04-01"));
        assert_eq!(params.get("Format"), Some("JSON"));
        assert_eq!(params.get("SignatureMethod"), Some("HMAC-SHA1"));
        assert_eq!(params.get("SignatureVersion"), Some("1.0"));
        assert_eq!(params.get("DurationSeconds"), Some("3600"));
        assert_eq!(params.get("RoleSessionName"), Some("pdf-upload-session-a1b2c3d4"));
        assert_eq!(params.params().len(), 12);
    }

    #[test]
    fn test_object_key_uses_session_time() {
        let creds = Credentials::new("id", "secret");
        let req = build_credential_request(&input(&creds, "测试.pdf"), session()).unwrap();
        assert_eq!(req.object_key.as_str(), "pdfs/a1b2c3d4/1704067200000-测试.pdf");
    }

    #[test]
    fn test_missing_role_arn_is_configuration_error() {
        let creds = Credentials::new("id", "secret");
        let mut input = input(&creds, "a.pdf");
        input.role_arn = "";
        let err = build_credential_request(&input, session()).unwrap_err();
        assert!(matches!(err, StsError::Configuration(_)));
    }

    #[test]
    fn test_missing_secret_is_configuration_error() {
        let creds = Credentials::new("id", "");
        let err = build_credential_request(&input(&creds, "a.pdf"), session()).unwrap_err();
        assert!(matches!(err, StsError::Configuration(_)));
    }

    #[test]
    fn test_unique_id_with_path_or_escape_is_rejected() {
        let creds = Credentials::new("id", "secret");
        for unique_id in ["a/b", "..", "a%2Fb", "ab cd", "测试"] {
            let mut session = session();
            session.unique_id = unique_id.into();
            let err = build_credential_request(&input(&creds, "a.pdf"), session).unwrap_err();
            assert!(
                matches!(err, StsError::InvalidRequest(_)),
                "unique id {unique_id:?}"
            );
        }
    }

    #[test]
    fn test_unique_id_with_dash_is_accepted() {
        let creds = Credentials::new("id", "secret");
        let mut session = session();
        session.unique_id = "Batch-42".into();
        let req = build_credential_request(&input(&creds, "a.pdf"), session).unwrap();
        assert!(req.object_key.as_str().starts_with("pdfs/Batch-42/"));
    }

    #[test]
    fn test_empty_file_name_is_rejected() {
        let creds = Credentials::new("id", "secret");
        let err = build_credential_request(&input(&creds, ""), session()).unwrap_err();
        assert!(matches!(err, StsError::InvalidRequest(_)));
    }
}
