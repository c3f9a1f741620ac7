//! RPC-style request signing (signature version 1.0, HMAC-SHA1).
//!
//! ```text
//! CanonicalQueryString = join("&", sorted(key "=" encode(value)))
//! StringToSign         = "GET" "&" encode("/") "&" encode(CanonicalQueryString)
//! Signature            = Base64(HMAC-SHA1(AccessKeySecret + "&", StringToSign))
//! ```
//!
//! Keys are ordered by byte value (not locale), which a `BTreeMap<String, _>`
//! gives for free. Values are encoded with
//! [`percent_encode_protecting_encoded`], so values that already carry
//! escapes are not escaped twice.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::encoding::{percent_encode, percent_encode_protecting_encoded};

type HmacSha1 = Hmac<Sha1>;

/// HTTP method of AssumeRole requests
pub const HTTP_METHOD: &str = "GET";
pub const ACTION: &str = "AssumeRole";
pub const API_VERSION: &str = "2015-04-01";
pub const FORMAT: &str = "JSON";
pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const SIGNATURE_VERSION: &str = "1.0";

/// Name of the parameter carrying the signature in the final query
pub const SIGNATURE_PARAM: &str = "Signature";

/// Unsigned request parameters
///
/// Keys are unique. Built fresh for every credential request and never
/// mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    params: BTreeMap<String, String>,
}

impl SigningRequest {
    /// Build from arbitrary key/value pairs; later duplicates win
    pub fn from_params<K, V>(params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Sorted, encoded `key=value` pairs joined with `&`
    pub fn canonical_query_string(&self) -> String {
        build_canonical_query_string(&self.params)
    }

    /// String to sign for `method`
    pub fn string_to_sign(&self, method: &str) -> String {
        build_string_to_sign(method, &self.canonical_query_string())
    }

    /// Sign with the long-term access key secret
    pub fn sign(self, access_key_secret: &str) -> SignedRequest {
        let canonical_query = self.canonical_query_string();
        let string_to_sign = build_string_to_sign(HTTP_METHOD, &canonical_query);
        let signature = compute_signature(access_key_secret, &string_to_sign);

        tracing::debug!(
            canonical_query = %canonical_query,
            string_to_sign = %string_to_sign,
            signature_prefix = %signature.get(..8).unwrap_or(signature.as_str()),
            "Signed AssumeRole request"
        );

        SignedRequest {
            request: self,
            canonical_query,
            string_to_sign,
            signature,
        }
    }
}

/// Signing request plus its signature
#[derive(Debug, Clone)]
pub struct SignedRequest {
    request: SigningRequest,
    canonical_query: String,
    string_to_sign: String,
    signature: String,
}

impl SignedRequest {
    pub fn request(&self) -> &SigningRequest {
        &self.request
    }

    pub fn canonical_query(&self) -> &str {
        &self.canonical_query
    }

    pub fn string_to_sign(&self) -> &str {
        &self.string_to_sign
    }

    /// Base64 signature (unencoded)
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// All request parameters with `Signature` appended
    pub fn query_pairs(&self) -> Vec<(&str, &str)> {
        self.request
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(std::iter::once((SIGNATURE_PARAM, self.signature.as_str())))
            .collect()
    }

    /// Wire query string: the canonical query followed by `&Signature=...`
    pub fn to_query_string(&self) -> String {
        format!(
            "{}&{}={}",
            self.canonical_query,
            SIGNATURE_PARAM,
            percent_encode(&self.signature)
        )
    }

    /// Full request URL against `endpoint`
    pub fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/?{}",
            endpoint.trim_end_matches('/'),
            self.to_query_string()
        )
    }
}

/// Build the canonical query string from parameter pairs.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use oss_sts_broker::sts::signer::build_canonical_query_string;
///
/// let params = BTreeMap::from([
///     ("b".to_string(), "x y".to_string()),
///     ("a".to_string(), "1".to_string()),
/// ]);
/// assert_eq!(build_canonical_query_string(&params), "a=1&b=x%20y");
/// ```
#[must_use]
pub fn build_canonical_query_string(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, percent_encode_protecting_encoded(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build `METHOD&%2F&<encoded canonical query>`.
///
/// The canonical query already contains escapes; those are kept as-is and
/// only `=` and `&` (and any other reserved byte) are escaped.
#[must_use]
pub fn build_string_to_sign(method: &str, canonical_query: &str) -> String {
    format!(
        "{}&{}&{}",
        method,
        percent_encode("/"),
        percent_encode_protecting_encoded(canonical_query)
    )
}

/// Base64(HMAC-SHA1(secret + "&", string_to_sign))
#[must_use]
pub fn compute_signature(access_key_secret: &str, string_to_sign: &str) -> String {
    let key = format!("{}&", access_key_secret);
    hmac_sha1_base64(key.as_bytes(), string_to_sign.as_bytes())
}

fn hmac_sha1_base64(key: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC can accept any key length");
    mac.update(message);
    BASE64.encode(mac.finalize().into_bytes())
}
