//! CLI Tests
//!
//! Runs the binary's offline `sign` command with a fixed session.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
oss:
  bucket: "pdf-share-bucket"
  region: "oss-cn-hangzhou"
  endpoint: "oss-cn-hangzhou.aliyuncs.com"
  access_key_id: "LTAI5tTestAccessKeyId"
  access_key_secret: "TestAccessKeySecret"
sts:
  role_arn: "acs:ram::1234567890123456:role/pdf-uploader"
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

fn broker() -> Command {
    Command::cargo_bin("oss-sts-broker").expect("binary built")
}

mod tests {
    use super::*;

    #[test]
    fn test_sign_prints_known_signature() {
        let config = write_config(CONFIG);

        broker()
            .arg("--config")
            .arg(config.path())
            .args([
                "sign",
                "测试.pdf",
                "--unique-id",
                "a1b2c3d4",
                "--nonce",
                "3ee8c1b8-83d3-44af-a94f-4e0ad82fd6cf",
                "--timestamp",
                "2024-01-01T00:00:00Z",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Signature: bmDB70f9YJujLepDahI9z/03mXY="))
            .stdout(predicate::str::contains(
                "ObjectKey: pdfs/a1b2c3d4/1704067200000-测试.pdf",
            ))
            .stdout(predicate::str::contains(
                "URL: https://sts.cn-hangzhou.aliyuncs.com/?AccessKeyId=LTAI5tTestAccessKeyId",
            ))
            .stdout(predicate::str::contains("TestAccessKeySecret").not());
    }

    #[test]
    fn test_sign_without_role_arn_fails() {
        let config = write_config(&CONFIG.replace(
            "role_arn: \"acs:ram::1234567890123456:role/pdf-uploader\"",
            "role_arn: \"\"",
        ));

        broker()
            .arg("--config")
            .arg(config.path())
            .args(["sign", "a.pdf"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("role_arn"));
    }

    #[test]
    fn test_issue_prints_metrics_on_failure() {
        // Nothing listens on the discard port, so the request fails fast.
        let config = write_config(&format!(
            "{}  endpoint: \"http://127.0.0.1:9\"\n",
            CONFIG
        ));

        broker()
            .arg("--config")
            .arg(config.path())
            .args(["issue", "a.pdf", "--print-metrics"])
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "oss_sts_credential_requests_total{outcome=\"upstream_unavailable\"} 1",
            ))
            .stderr(predicate::str::contains(
                "oss_sts_credential_request_duration_seconds_count 1",
            ));
    }

    #[test]
    fn test_sign_rejects_unique_id_with_slash() {
        let config = write_config(CONFIG);

        broker()
            .arg("--config")
            .arg(config.path())
            .args(["sign", "a.pdf", "--unique-id", "a/b"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unique id"));
    }

    #[test]
    fn test_missing_subcommand_shows_usage() {
        broker()
            .assert()
            .failure()
            .stderr(predicate::str::contains("Usage"));
    }
}
