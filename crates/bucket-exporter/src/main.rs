//! bucket-exporter binary entry point

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bucket_exporter::{Config, Exporter, Request};

#[derive(Parser, Debug)]
#[command(name = "bucket-exporter")]
#[command(about = "Archive every object under a bucket prefix into archives/<prefix>.zip")]
struct Args {
    /// Path to a YAML configuration file (environment is used when absent)
    #[arg(long, global = true, env = "EXPORTER_CONFIG")]
    config: Option<PathBuf>,

    /// AWS region
    #[arg(long, global = true)]
    region: Option<String>,

    /// Endpoint URL for S3-compatible storage
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Allow plain HTTP endpoints
    #[arg(long, global = true, default_value_t = false)]
    allow_http: bool,

    /// Directory for the temporary archive
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export one prefix and print the archive name
    Export {
        /// Source and destination bucket
        #[arg(long)]
        bucket: String,

        /// Key prefix to archive
        #[arg(long)]
        prefix: String,
    },
    /// Run JSON invocation payloads, one per line, and print one result per line
    Invoke {
        /// File of payloads (stdin when absent)
        #[arg(long)]
        event: Option<PathBuf>,
    },
}

impl Args {
    fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => Config::from_env()?,
        };

        if let Some(region) = &self.region {
            config.storage.region = Some(region.clone());
        }
        if let Some(endpoint) = &self.endpoint {
            config.storage.endpoint = Some(endpoint.clone());
        }
        if self.allow_http {
            config.storage.allow_http = true;
        }
        if let Some(work_dir) = &self.work_dir {
            config.work_dir = Some(work_dir.clone());
        }

        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.resolve_config().map_err(|e| {
        error!(error = %e, "Failed to load config");
        e
    })?;

    info!(
        region = ?config.storage.region,
        endpoint = ?config.storage.endpoint,
        work_dir = ?config.work_dir(),
        "Starting bucket-exporter"
    );

    let exporter = Exporter::new(&config);

    match args.command {
        Command::Export { bucket, prefix } => {
            let name = exporter.run(&Request::new(bucket, prefix)).await?;
            println!("{}", name);
        }
        Command::Invoke { event } => match event {
            Some(path) => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                invoke_lines(&exporter, file).await?;
            }
            None => invoke_lines(&exporter, tokio::io::stdin()).await?,
        },
    }

    Ok(())
}

/// Each invocation reuses the exporter's shared storage client.
async fn invoke_lines<R>(exporter: &Exporter, input: R) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let payload: serde_json::Value = serde_json::from_str(line)
            .with_context(|| format!("Invalid JSON payload on line {}", line_no))?;

        match exporter.handle(payload).await {
            Ok(name) => println!("{}", name),
            Err(e) => {
                error!(line = line_no, error = %e, "Invocation failed");
                return Err(e).with_context(|| format!("Invocation on line {} failed", line_no));
            }
        }
    }

    Ok(())
}
