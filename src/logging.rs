// MIT License - Copyright (c) 2026 Peter Wright
// Local log files and application log subscriber

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::Subscriber;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::fmt::{self, time::ChronoLocal};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::constants::{APP_LOG_FILE, BIN_TARGET, LOG_TIMESTAMP_FORMAT, TPI_LOG_FILE};
use crate::reporter::AsyncReporter;
use crate::sink::{Fanout, SharedWriter};

/// Append-only files under the log directory.
pub struct LogFiles {
    dir: PathBuf,
    /// Raw TPI lines
    pub tpi: SharedWriter,
    /// Application log and reporter diagnostics
    pub app: SharedWriter,
}

impl LogFiles {
    /// Creates the directory if needed and opens both files for appending.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            tpi: SharedWriter::new(open_append(&dir.join(TPI_LOG_FILE))?),
            app: SharedWriter::new(open_append(&dir.join(APP_LOG_FILE))?),
            dir,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Destination of accepted TPI lines: file, optional reporter, optional stdout.
pub fn tpi_sink(files: &LogFiles, reporter: Option<AsyncReporter>, echo_stdout: bool) -> Fanout {
    let mut sink = Fanout::new().with(files.tpi.clone());
    if let Some(reporter) = reporter {
        sink.push(reporter);
    }
    if echo_stdout {
        sink.push(io::stdout());
    }
    sink
}

/// Destination of application log lines: file and optional stdout.
pub fn app_writer(files: &LogFiles, echo_stdout: bool) -> SharedWriter {
    let mut sink = Fanout::new().with(files.app.clone());
    if echo_stdout {
        sink.push(io::stdout());
    }
    SharedWriter::new(sink)
}

/// Targets whose events are relayed to the collector.
///
/// HTTP client internals (`reqwest`, `hyper_util`, `rustls`) log about every
/// delivery the reporter makes and must never be relayed.
pub fn relayed_targets() -> Targets {
    Targets::new()
        .with_target(env!("CARGO_CRATE_NAME"), LevelFilter::TRACE)
        .with_target(BIN_TARGET, LevelFilter::TRACE)
}

/// Build the application log subscriber.
///
/// `local` receives everything `filter` lets through. `remote`, usually an
/// application [`AsyncReporter`], additionally only sees [`relayed_targets`]
/// and gets lines without the module path.
pub fn app_subscriber(
    filter: EnvFilter,
    local: SharedWriter,
    remote: Option<SharedWriter>,
) -> impl Subscriber + Send + Sync + 'static {
    let local_layer = fmt::layer()
        .with_timer(ChronoLocal::new(LOG_TIMESTAMP_FORMAT.to_string()))
        .with_ansi(false)
        .with_writer(local);

    let remote_layer = remote.map(|writer| {
        fmt::layer()
            .with_timer(ChronoLocal::new(LOG_TIMESTAMP_FORMAT.to_string()))
            .with_ansi(false)
            .with_target(false)
            .with_writer(writer)
            .with_filter(relayed_targets())
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(local_layer)
        .with(remote_layer)
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` controls verbosity (default: info). Lines start with a
/// `YYYY/MM/DD HH:MM:SS` local timestamp, which the application reporter
/// strips.
pub fn init_app_logger(local: SharedWriter, reporter: Option<AsyncReporter>) -> io::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    app_subscriber(env_filter, local, reporter.map(SharedWriter::new))
        .try_init()
        .map_err(io::Error::other)
}
