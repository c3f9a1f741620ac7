//! Scoped session policy attached to AssumeRole requests.
//!
//! The policy narrows the role's permissions for the lifetime of the issued
//! credentials. Its resource is the whole bucket (`acs:oss:*:*:<bucket>/*`),
//! never an individual object key: object keys embed user-supplied file
//! names, and non-ASCII or `%` characters in a policy resource do not match
//! reliably on the service side.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Policy language version understood by the identity service
pub const POLICY_VERSION: &str = "1";

/// Action granted to upload credentials
pub const PUT_OBJECT_ACTION: &str = "oss:PutObject";

/// Statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// One policy statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub effect: Effect,
    pub action: Vec<String>,
    pub resource: Vec<String>,
}

/// Policy document
///
/// Serializes with field order `Version`, `Statement` and, per statement,
/// `Effect`, `Action`, `Resource`. The encoded form is part of the signed
/// string, so this order is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    /// Policy allowing `oss:PutObject` anywhere in `bucket`
    pub fn put_object_for_bucket(bucket: &str) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![Statement {
                effect: Effect::Allow,
                action: vec![PUT_OBJECT_ACTION.to_string()],
                resource: vec![bucket_resource(bucket)],
            }],
        }
    }

    /// Compact JSON form
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Standard base64 of the compact JSON, as carried in the `Policy` parameter
    pub fn to_base64(&self) -> Result<String, serde_json::Error> {
        Ok(BASE64.encode(self.to_json()?))
    }

    /// Decode a `Policy` parameter value
    pub fn from_base64(encoded: &str) -> Result<Self, PolicyDecodeError> {
        let raw = BASE64.decode(encoded)?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

/// Errors decoding a `Policy` parameter
#[derive(thiserror::Error, Debug)]
pub enum PolicyDecodeError {
    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid policy JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resource pattern covering every object in `bucket`
pub fn bucket_resource(bucket: &str) -> String {
    format!("acs:oss:*:*:{}/*", bucket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_json_shape() {
        let policy = PolicyDocument::put_object_for_bucket("pdf-share-bucket");
        assert_eq!(
            policy.to_json().unwrap(),
            r#"{"Version":"1","Statement":[{"Effect":"Allow","Action":["oss:PutObject"],"Resource":["acs:oss:*:*:pdf-share-bucket/*"]}]}"#
        );
    }

    #[test]
    fn test_policy_base64() {
        let policy = PolicyDocument::put_object_for_bucket("pdf-share-bucket");
        assert_eq!(
            policy.to_base64().unwrap(),
            "eyJWZXJzaW9uIjoiMSIsIlN0YXRlbWVudCI6W3siRWZmZWN0IjoiQWxsb3ciLCJBY3Rpb24iOlsib3NzOlB1dE9iamVjdCJdLCJSZXNvdXJjZSI6WyJhY3M6b3NzOio6KjpwZGYtc2hhcmUtYnVja2V0LyoiXX1dfQ=="
        );
    }

    #[test]
    fn test_policy_decodes_back() {
        let policy = PolicyDocument::put_object_for_bucket("b");
        let decoded = PolicyDocument::from_base64(&policy.to_base64().unwrap()).unwrap();
        assert_eq!(decoded, policy);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            PolicyDocument::from_base64("!!!"),
            Err(PolicyDecodeError::Base64(_))
        ));
        assert!(matches!(
            PolicyDocument::from_base64("bm90IGpzb24="),
            Err(PolicyDecodeError::Json(_))
        ));
    }
}
