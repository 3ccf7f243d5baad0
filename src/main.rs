// MIT License - Copyright (c) 2026 Peter Wright
// EnvisaLink TPI monitor

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use envisalink_tpi::config::{parse_device_address, validate_destination_url};
use envisalink_tpi::constants::{
    DEFAULT_LOG_DIR, MESSAGE_TYPE_APPLICATION, MESSAGE_TYPE_TPI, REPORTER_QUEUE_CAPACITY,
    REPORTER_REQUEST_TIMEOUT, REPORTER_WORKERS, TPI_KEY_ENV,
};
use envisalink_tpi::logging::{app_writer, init_app_logger, tpi_sink, LogFiles};
use envisalink_tpi::{monitor, AsyncReporter, ClientConfig, ReporterConfig, RetryPolicy, TpiClient};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "envisamon")]
#[command(about = "Monitor an EnvisaLink TPI and log or relay its messages")]
struct Cli {
    /// Echo TPI messages to stdout
    #[arg(short = 'm')]
    echo_messages: bool,

    /// Echo the application log to stdout
    #[arg(short = 'l')]
    echo_log: bool,

    /// Suppress consecutive duplicate messages, letting one through every
    /// LIMIT suppressed (`-u` alone suppresses all of them)
    #[arg(
        short = 'u',
        long = "dedup",
        value_name = "LIMIT",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "0"
    )]
    dedup: Option<u32>,

    /// Directory for tpi-messages.log and application.log
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Optional TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stop instead of retrying when the TPI rejects the password
    #[arg(long)]
    exit_on_auth_failure: bool,

    /// EnvisaLink address, <ip>[:port] (default port 4025)
    address: String,

    /// HTTPS endpoint receiving events
    url: Option<String>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    reporter: ReporterToml,
    #[serde(default)]
    logging: LoggingToml,
}

#[derive(Debug, Deserialize)]
struct ReporterToml {
    #[serde(default = "default_queue_capacity")]
    queue_capacity: usize,
    #[serde(default = "default_workers")]
    workers: usize,
    #[serde(default = "default_request_timeout")]
    request_timeout_secs: u64,
    /// Overrides the `<ip>:<port>` default
    #[serde(default)]
    system_id: Option<String>,
}

impl Default for ReporterToml {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            workers: default_workers(),
            request_timeout_secs: default_request_timeout(),
            system_id: None,
        }
    }
}

fn default_queue_capacity() -> usize {
    REPORTER_QUEUE_CAPACITY
}
fn default_workers() -> usize {
    REPORTER_WORKERS
}
fn default_request_timeout() -> u64 {
    REPORTER_REQUEST_TIMEOUT.as_secs()
}

#[derive(Debug, Deserialize)]
struct LoggingToml {
    #[serde(default = "default_log_dir")]
    log_dir: PathBuf,
}

impl Default for LoggingToml {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
        }
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_DIR)
}

fn load_file_config(path: Option<&Path>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text).context("Failed to parse config file")
}

fn reporter_config(
    file: &ReporterToml,
    url: &str,
    system_id: &str,
    message_type: &str,
    strip_timestamp: bool,
) -> ReporterConfig {
    ReporterConfig::builder()
        .url(url)
        .system_id(file.system_id.as_deref().unwrap_or(system_id))
        .message_type(message_type)
        .strip_timestamp(strip_timestamp)
        .queue_capacity(file.queue_capacity)
        .workers(file.workers)
        .request_timeout(Duration::from_secs(file.request_timeout_secs))
        .build()
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (host, port) = parse_device_address(&cli.address)?;
    if let Some(url) = &cli.url {
        validate_destination_url(url)?;
    }
    let password = std::env::var(TPI_KEY_ENV)
        .ok()
        .filter(|k| !k.is_empty())
        .with_context(|| format!("{TPI_KEY_ENV} environment variable is not set"))?;

    let file_config = load_file_config(cli.config.as_deref())?;
    let log_dir = cli.log_dir.unwrap_or(file_config.logging.log_dir);
    let files = LogFiles::open(&log_dir)
        .with_context(|| format!("Failed to open log directory {}", log_dir.display()))?;

    let address = format!("{host}:{port}");
    let (tpi_reporter, app_reporter) = match &cli.url {
        Some(url) => {
            let rc = &file_config.reporter;
            let tpi = AsyncReporter::from_env(
                reporter_config(rc, url, &address, MESSAGE_TYPE_TPI, false),
                files.app.clone(),
            );
            let app = AsyncReporter::from_env(
                reporter_config(rc, url, &address, MESSAGE_TYPE_APPLICATION, true),
                files.app.clone(),
            );
            (Some(tpi), Some(app))
        }
        None => (None, None),
    };

    init_app_logger(app_writer(&files, cli.echo_log), app_reporter)
        .context("Failed to install application logger")?;
    info!("Logging to {}", files.dir().display());

    let config = ClientConfig::builder()
        .address(&address)
        .password(password)
        .dedup_limit(cli.dedup)
        .build();
    let mut client = TpiClient::new(config, tpi_sink(&files, tpi_reporter, cli.echo_messages));

    let handle = client.close_handle();
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
        handle.close();
    });

    let policy = if cli.exit_on_auth_failure {
        RetryPolicy::StopOnFatal
    } else {
        RetryPolicy::RetryAll
    };

    if let Err(e) = monitor::run(&mut client, policy).await {
        error!("Monitor stopped: {e}");
        return Err(e.into());
    }

    client.close().await;
    info!("TPI monitor stopped");
    Ok(())
}
