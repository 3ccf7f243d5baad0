// MIT License - Copyright (c) 2026 Peter Wright
// Fixed protocol, backoff and reporter parameters

use std::time::Duration;

/// Default TPI port of an EnvisaLink module.
pub const DEFAULT_TPI_PORT: u16 = 4025;

/// Timeout for establishing the TCP connection.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline covering the whole login handshake.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

// Reconnect backoff
pub const BACKOFF_INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const BACKOFF_MAX_DELAY: Duration = Duration::from_secs(60);
pub const BACKOFF_MULTIPLIER: f64 = 2.0;

// Remote reporter
pub const REPORTER_QUEUE_CAPACITY: usize = 500;
pub const REPORTER_WORKERS: usize = 4;
pub const REPORTER_REQUEST_TIMEOUT: Duration = Duration::from_secs(200);

/// Header carrying the collector credential.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Width of the `YYYY/MM/DD HH:MM:SS ` prefix written by the application logger.
pub const TIMESTAMP_PREFIX_LEN: usize = 20;

/// chrono format string producing the prefix above (minus the trailing space).
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// `tracing` target of events logged by the `envisamon` binary.
pub const BIN_TARGET: &str = "envisamon";

/// Message type tags sent to the collector.
pub const MESSAGE_TYPE_TPI: &str = "TPI";
pub const MESSAGE_TYPE_APPLICATION: &str = "Application";

// Environment
pub const TPI_KEY_ENV: &str = "ENVISALINK_TPI_KEY";
pub const API_KEY_ENV: &str = "ALARM_MON_API_KEY";

/// Longest TPI line accepted before the connection is dropped.
pub const MAX_LINE_LEN: usize = 64 * 1024;

// Local storage
pub const DEFAULT_LOG_DIR: &str = "./logs";
pub const TPI_LOG_FILE: &str = "tpi-messages.log";
pub const APP_LOG_FILE: &str = "application.log";
