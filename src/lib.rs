//! OSS STS Broker Library
//!
//! Issues short-lived, upload-scoped OSS credentials by calling the identity
//! service's `AssumeRole` action with an HMAC-SHA1 signed request.
//!
//! # Features
//!
//! - **Scoped**: session policy only allows `oss:PutObject` in one bucket
//! - **Unique Keys**: every upload gets `pdfs/<uniqueId>/<millis>-<fileName>`
//! - **Deterministic Signing**: fixed nonce and timestamp reproduce the signature
//! - **Classified Errors**: configuration, transient and rejected failures
//!
//! # Example
//!
//! ```no_run
//! use oss_sts_broker::{config::Config, sts::StsClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let client = StsClient::new(config)?;
//!     let grant = client.request_credentials("report.pdf", None).await?;
//!     println!("{}", grant.object_key);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod metrics;
pub mod oss;
pub mod sts;

// Re-export commonly used types
pub use config::Config;
pub use sts::{CredentialIssuer, StsClient, StsError, StsGrant};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
