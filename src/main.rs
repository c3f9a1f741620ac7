//! OSS STS Broker - upload credential issuer
//!
//! `issue` requests real temporary credentials; `sign` prints the signed
//! AssumeRole request without sending it.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use oss_sts_broker::config::Config;
use oss_sts_broker::metrics;
use oss_sts_broker::sts::{Session, StsClient};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// OSS STS Broker - temporary upload credentials for OSS
#[derive(Parser, Debug)]
#[command(name = "oss-sts-broker")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (environment variables are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Request upload credentials and print them as JSON
    Issue {
        /// Name of the file to upload
        file_name: String,

        /// Upload group id (random 8 characters when omitted)
        #[arg(long)]
        unique_id: Option<String>,

        /// Write Prometheus metrics to stderr after the request
        #[arg(long)]
        print_metrics: bool,
    },

    /// Print the signed AssumeRole request without sending it
    Sign {
        /// Name of the file to upload
        file_name: String,

        #[arg(long)]
        unique_id: Option<String>,

        /// Fixed SignatureNonce
        #[arg(long)]
        nonce: Option<String>,

        /// Fixed request time, RFC 3339 (e.g. 2024-01-01T00:00:00Z)
        #[arg(long)]
        timestamp: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    info!("Starting OSS STS Broker v{}", oss_sts_broker::VERSION);

    // Load configuration
    let config = match &args.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::from_env()?,
    };

    let client = StsClient::new(config)?;

    match args.command {
        Command::Issue {
            file_name,
            unique_id,
            print_metrics,
        } => {
            let result = client
                .request_credentials(&file_name, unique_id.as_deref())
                .await;
            if print_metrics {
                eprint!("{}", metrics::gather_text());
            }
            println!("{}", serde_json::to_string_pretty(&result?)?);
        }
        Command::Sign {
            file_name,
            unique_id,
            nonce,
            timestamp,
        } => {
            let mut session = Session::generate(unique_id.as_deref());
            if let Some(nonce) = nonce {
                session.nonce = nonce;
            }
            if let Some(timestamp) = timestamp {
                session.timestamp = timestamp;
            }

            let prepared = client.prepare_with_session(&file_name, session)?;
            println!("ObjectKey: {}", prepared.object_key);
            println!("CanonicalQuery: {}", prepared.signed.canonical_query());
            println!("StringToSign: {}", prepared.signed.string_to_sign());
            println!("Signature: {}", prepared.signed.signature());
            println!("URL: {}", prepared.signed.url(client.endpoint()));
        }
    }

    Ok(())
}
