// MIT License - Copyright (c) 2026 Peter Wright
// EnvisaLink TPI monitor
//
//! # envisalink-tpi
//!
//! Monitoring client for the EnvisaLink TPI (line-oriented TCP protocol
//! spoken by EnvisaLink alarm-panel bridges).
//!
//! The [`TpiClient`] dials the module, logs in, and streams every event line
//! to a message sink, reconnecting with exponential backoff when the link
//! drops. Consecutive duplicate lines can be thinned out. An
//! [`AsyncReporter`] can be added to the sink to relay lines to a remote
//! HTTP collector without ever blocking the read loop.
//!
//! ## Quick Start
//!
//! ```no_run
//! use envisalink_tpi::{monitor, ClientConfig, RetryPolicy, TpiClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::builder()
//!         .address("192.168.1.100:4025")
//!         .password("user")
//!         .dedup_limit(Some(0))
//!         .build();
//!
//!     let mut client = TpiClient::new(config, std::io::stdout());
//!
//!     let handle = client.close_handle();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         handle.close();
//!     });
//!
//!     monitor::run(&mut client, RetryPolicy::RetryAll).await?;
//!     Ok(())
//! }
//! ```

pub mod backoff;
pub mod client;
pub mod config;
pub mod constants;
pub mod dedup;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod protocol;
pub mod reporter;
pub mod sink;
pub mod transport;

// Re-exports for convenience
pub use backoff::Backoff;
pub use client::{CloseHandle, TpiClient};
pub use config::{ClientConfig, ClientConfigBuilder, ReporterConfig, ReporterConfigBuilder};
pub use dedup::DuplicateFilter;
pub use error::{ConfigError, ErrorClass, Result, TpiError};
pub use monitor::RetryPolicy;
pub use reporter::{AsyncReporter, Event, ReportedMessage};
pub use sink::{Fanout, SharedWriter};
pub use transport::{Dialer, TcpDialer};
