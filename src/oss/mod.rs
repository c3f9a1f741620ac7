//! OSS module
//!
//! Object storage helpers shared by the credential broker: the long-term
//! access key pair, per-upload object key generation, and public URL
//! construction. The actual object upload is performed by the caller with
//! the temporary credentials this crate obtains.

use std::fmt;

pub mod credentials;

pub use credentials::{Credentials, CredentialsError, CredentialsProvider};

/// Length of the random identifier embedded in object keys and session names
pub const UNIQUE_ID_LEN: usize = 8;

/// Generate an 8-character random identifier
///
/// Taken from the first hex digits of a v4 UUID.
pub fn new_unique_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(UNIQUE_ID_LEN);
    id
}

/// Object key of a single upload: `<prefix>/<uniqueId>/<unixMillis>-<fileName>`
///
/// The file name is an opaque final segment. It is neither validated nor
/// encoded here; it may contain non-ASCII characters or further slashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Build an object key from its parts
    pub fn new(prefix: &str, unique_id: &str, unix_millis: i64, file_name: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        Self(format!("{}/{}/{}-{}", prefix, unique_id, unix_millis, file_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Build the public URL of an object: `https://<bucket>.<endpoint>/<key>`
pub fn build_object_url(bucket: &str, endpoint: &str, object_key: &str) -> String {
    let endpoint = endpoint
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    format!("https://{}.{}/{}", bucket, endpoint, object_key)
}

/// Extract the object key from a virtual-hosted OSS URL
///
/// `https://bucket.oss-cn-hangzhou.aliyuncs.com/pdfs/a/b.pdf` yields
/// `pdfs/a/b.pdf`. URLs on other hosts are returned without their scheme.
pub fn extract_object_key(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    let re = regex_lite::Regex::new(r"^.*?\.(oss-[^/]+)\.aliyuncs\.com/").unwrap();
    re.replace(without_scheme, "").into_owned()
}
