// MIT License - Copyright (c) 2026 Peter Wright
// Client and reporter configuration

use std::time::Duration;

use reqwest::Url;

use crate::constants::{
    DEFAULT_TPI_PORT, MESSAGE_TYPE_TPI, REPORTER_QUEUE_CAPACITY, REPORTER_REQUEST_TIMEOUT,
    REPORTER_WORKERS,
};
use crate::error::ConfigError;

/// Configuration for connecting to an EnvisaLink TPI.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `host:port` of the module
    pub address: String,
    /// TPI password
    pub password: String,
    /// Duplicate suppression limit (`None` = disabled)
    pub dedup_limit: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: format!("127.0.0.1:{DEFAULT_TPI_PORT}"),
            password: String::new(),
            dedup_limit: None,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for ClientConfig.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn dedup_limit(mut self, limit: Option<u32>) -> Self {
        self.config.dedup_limit = limit;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Configuration for a remote event reporter.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Collector endpoint; empty disables reporting
    pub url: String,
    /// Identifies the monitored module in every event
    pub system_id: String,
    /// `message_type` tag of every event
    pub message_type: String,
    /// Remove the logger's date/time prefix before sending
    pub strip_timestamp: bool,
    pub queue_capacity: usize,
    pub workers: usize,
    pub request_timeout: Duration,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            system_id: String::new(),
            message_type: MESSAGE_TYPE_TPI.to_string(),
            strip_timestamp: false,
            queue_capacity: REPORTER_QUEUE_CAPACITY,
            workers: REPORTER_WORKERS,
            request_timeout: REPORTER_REQUEST_TIMEOUT,
        }
    }
}

impl ReporterConfig {
    pub fn builder() -> ReporterConfigBuilder {
        ReporterConfigBuilder::default()
    }
}

/// Builder for ReporterConfig.
#[derive(Debug, Clone, Default)]
pub struct ReporterConfigBuilder {
    config: ReporterConfig,
}

impl ReporterConfigBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    pub fn system_id(mut self, id: impl Into<String>) -> Self {
        self.config.system_id = id.into();
        self
    }

    pub fn message_type(mut self, message_type: impl Into<String>) -> Self {
        self.config.message_type = message_type.into();
        self
    }

    pub fn strip_timestamp(mut self, strip: bool) -> Self {
        self.config.strip_timestamp = strip;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn build(self) -> ReporterConfig {
        self.config
    }
}

/// Parse `<ip>[:port]`, defaulting the port to 4025.
pub fn parse_device_address(input: &str) -> Result<(String, u16), ConfigError> {
    let Some((host, port_str)) = input.rsplit_once(':') else {
        return Ok((input.to_string(), DEFAULT_TPI_PORT));
    };

    if host.is_empty() || host.contains(':') {
        return Err(ConfigError::InvalidAddress {
            input: input.to_string(),
            reason: "expected <ip>:<port>".to_string(),
        });
    }

    let port: i64 = port_str.parse().map_err(|_| ConfigError::InvalidAddress {
        input: input.to_string(),
        reason: format!("invalid port number: {port_str}"),
    })?;
    if !(1..=65535).contains(&port) {
        return Err(ConfigError::InvalidPort(port.to_string()));
    }

    Ok((host.to_string(), port as u16))
}

/// Validate a collector URL: must parse, use https, and name a host.
pub fn validate_destination_url(input: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(input).map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;
    if url.scheme() != "https" {
        return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::MissingHost);
    }
    Ok(url)
}
