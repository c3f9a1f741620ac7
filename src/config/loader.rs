//! Configuration loader with environment variable expansion

use super::{expand_env_vars, Config, ConfigError};
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text, expanding `${VAR}` and
    /// `${VAR:-default}` before parsing
    pub fn from_yaml(content: &str) -> Result<Config, ConfigError> {
        let expanded = expand_env_vars(content);
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
oss:
  bucket: "pdf-share-bucket"
  access_key_id: "id"
  access_key_secret: "secret"
sts:
  role_arn: "acs:ram::1234567890123456:role/pdf-uploader"
"#;

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let config = ConfigLoader::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.oss.region, "oss-cn-hangzhou");
        assert_eq!(config.sts.role_session_name, "pdf-upload-session");
        assert_eq!(config.sts.token_expire_seconds, 3600);
        assert_eq!(config.sts.object_prefix, "pdfs");
        assert_eq!(config.sts.request_timeout_secs, 10);
        assert!(config.sts.endpoint.is_none());
    }

    #[test]
    fn test_missing_role_arn_fails_validation() {
        let yaml = r#"
oss:
  bucket: "pdf-share-bucket"
sts: {}
"#;
        let result = ConfigLoader::from_yaml(yaml);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_expand_env_vars_in_yaml() {
        std::env::set_var("OSS_STS_BROKER_LOADER_BUCKET", "from-env");
        let yaml = MINIMAL.replace("pdf-share-bucket", "${OSS_STS_BROKER_LOADER_BUCKET}");
        let config = ConfigLoader::from_yaml(&yaml).unwrap();
        assert_eq!(config.oss.bucket, "from-env");
        std::env::remove_var("OSS_STS_BROKER_LOADER_BUCKET");
    }
}
