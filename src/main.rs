use anyhow::{Context, Result};
use awsconfig_cmdb::aws::{self, s3::BlobStore, s3::S3BlobStore, secrets, sqs::QueuePoller};
use awsconfig_cmdb::cmdb::{CmdbSink, DryRunSink, RecordSink};
use awsconfig_cmdb::config::Config;
use awsconfig_cmdb::intake;
use awsconfig_cmdb::notification::{NotificationRouter, RouteReport};
use awsconfig_cmdb::VERSION;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{Instrument, Level};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Crates whose logs are capped at warn
const NOISY_TARGETS: &[&str] = &[
    "aws_config",
    "aws_sdk_s3",
    "aws_sdk_sqs",
    "aws_sdk_secretsmanager",
    "aws_smithy_runtime",
    "aws_smithy_runtime_api",
    "hyper",
    "hyper_util",
    "reqwest",
    "rustls",
];

/// Forward AWS Config notifications to a ServiceNow CMDB
#[derive(Parser, Debug)]
#[command(name = "awsconfig-cmdb", version, about, long_about = None)]
struct Args {
    /// Configuration file (JSON, or YAML by extension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Build records and log them instead of submitting
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drain an SQS queue subscribed to the AWS Config topic
    Poll {
        /// Queue name
        #[arg(short, long)]
        queue: Option<String>,

        /// AWS region of the queue
        #[arg(short, long)]
        region: Option<String>,
    },
    /// Process notifications or Lambda events stored in files
    Replay {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let mut filter = EnvFilter::new(tracing_level.as_str().to_ascii_lowercase());
    for target in NOISY_TARGETS {
        filter = filter.add_directive(format!("{}=warn", target).parse()?);
    }

    let guard = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {:?}", parent))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .init();
            None
        }
    };

    tracing::info!("awsconfig-cmdb {} started with log level: {:?}", VERSION, level);
    if let Some(path) = log_file {
        tracing::info!("Log file: {:?}", path);
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level, args.log_file.as_deref())?;

    let result = run(&args).await;
    if let Err(err) = &result {
        tracing::error!("Run failed: {:#}", err);
    }
    result
}

async fn run(args: &Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let sdk_config = aws::load_sdk_config(None).await;

    let sink: Box<dyn RecordSink> = if args.dry_run {
        tracing::info!("Dry run, records are logged instead of submitted");
        Box::new(DryRunSink)
    } else {
        Box::new(cmdb_sink(&config).await?)
    };

    let router = NotificationRouter::new(
        S3BlobStore::new(&sdk_config),
        sink,
        config.routing_policy(),
    );

    match &args.command {
        Command::Poll { queue, region } => {
            let queue_name = queue
                .clone()
                .or_else(|| config.queue_name.clone())
                .context("No queue configured. Use --queue or set queue_name")?;
            let region = region.clone().or_else(|| config.queue_region.clone());

            let queue_config = aws::load_sdk_config(region.as_deref()).await;
            let poller = QueuePoller::connect(&queue_config, &queue_name).await?;

            let router = &router;
            let processed = poller
                .drain(move |body| async move {
                    let message = intake::unwrap_envelope(&body)
                        .with_context(|| format!("Queue message is not valid JSON: {}", body))?;
                    process_message(router, message).await.map(|_| ())
                })
                .await?;

            tracing::info!("Queue {} drained, {} messages processed", queue_name, processed);
        }
        Command::Replay { files } => {
            let mut totals = RouteReport::default();
            for file in files {
                let content = std::fs::read_to_string(file)
                    .with_context(|| format!("Failed to read {:?}", file))?;
                let event: Value = serde_json::from_str(&content)
                    .with_context(|| format!("{:?} is not valid JSON", file))?;

                for message in intake::extract_notifications(event) {
                    totals += process_message(&router, message).await?;
                }
            }

            tracing::info!(
                "Replay done: {} submitted, {} constructed, {} skipped",
                totals.submitted,
                totals.constructed,
                totals.skipped
            );
        }
    }

    Ok(())
}

async fn cmdb_sink(config: &Config) -> Result<CmdbSink> {
    let credentials = match &config.secret_id {
        Some(secret_id) => {
            let secret_config = aws::load_sdk_config(config.secret_region.as_deref()).await;
            secrets::fetch_credentials(&secret_config, secret_id).await?
        }
        None => config.static_credentials()?,
    };

    let base_url = config.base_url(&credentials);
    tracing::info!("Submitting to {} as {}", base_url, credentials.user);
    CmdbSink::new(&base_url, credentials)
}

/// Route one notification inside its own span. Failures are logged with the
/// offending message before being returned.
async fn process_message<B: BlobStore, S: RecordSink>(
    router: &NotificationRouter<B, S>,
    message: Value,
) -> Result<RouteReport> {
    let span = tracing::info_span!("message", id = %Uuid::new_v4());

    async {
        let message_type = message
            .get("messageType")
            .and_then(Value::as_str)
            .unwrap_or("<missing>")
            .to_string();

        match router.route(message.clone()).await {
            Ok(report) => {
                tracing::info!(
                    "Processed {}: {} submitted, {} constructed, {} skipped",
                    message_type,
                    report.submitted,
                    report.constructed,
                    report.skipped
                );
                Ok(report)
            }
            Err(err) => {
                tracing::error!(
                    "Failed to process {} ({:?}): {}, message: {}",
                    message_type,
                    err.kind(),
                    err,
                    message
                );
                Err(anyhow::Error::new(err).context(format!("Failed to process {}", message_type)))
            }
        }
    }
    .instrument(span)
    .await
}
