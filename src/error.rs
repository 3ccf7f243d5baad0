// MIT License - Copyright (c) 2026 Peter Wright
// Error types

use std::io;

/// How the supervising loop should treat an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retrying cannot help (e.g. a wrong password).
    Fatal,
    /// Network hiccup; retry after backoff.
    Transient,
}

/// All errors raised by the TPI client.
#[derive(Debug, thiserror::Error)]
pub enum TpiError {
    /// Dial failure, read failure or remote disconnect.
    ///
    /// A clean end of stream carries no source.
    #[error("connection error: {message}{}", .source.as_ref().map(|e| format!(": {e}")).unwrap_or_default())]
    Connection {
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    /// I/O failure or expired deadline during the login handshake.
    #[error("timeout during {operation}: {source}")]
    Timeout {
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("authentication failed: {message}")]
    Auth { message: String },
}

impl TpiError {
    pub fn connection(message: impl Into<String>, source: io::Error) -> Self {
        TpiError::Connection {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Connection ended without an underlying I/O error.
    pub fn disconnected(message: impl Into<String>) -> Self {
        TpiError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn timeout(operation: &'static str, source: io::Error) -> Self {
        TpiError::Timeout { operation, source }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        TpiError::Auth {
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            TpiError::Auth { .. } => ErrorClass::Fatal,
            TpiError::Connection { .. } | TpiError::Timeout { .. } => ErrorClass::Transient,
        }
    }

    /// Whether this error is transient and the connection should be retried.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

/// Invalid command-line or file configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid IP:port format '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("port must be between 1 and 65535, got: {0}")]
    InvalidPort(String),

    #[error("invalid URL format: {0}")]
    InvalidUrl(String),

    #[error("URL scheme must be 'https', got: '{0}'")]
    UnsupportedScheme(String),

    #[error("URL must include a host")]
    MissingHost,
}

pub type Result<T> = std::result::Result<T, TpiError>;
