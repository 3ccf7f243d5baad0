// MIT License - Copyright (c) 2026 Peter Wright
// Best-effort relay of log lines to a remote HTTP collector

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::config::ReporterConfig;
use crate::constants::{API_KEY_ENV, API_KEY_HEADER, TIMESTAMP_PREFIX_LEN};
use crate::sink::SharedWriter;

/// JSON body posted to the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    /// Seconds since the epoch with six fractional digits
    pub event_unixtime: String,
    pub event_message: String,
    pub message_type: String,
    pub system_id: String,
}

impl Event {
    pub fn new(
        received_at: DateTime<Utc>,
        message: impl Into<String>,
        message_type: impl Into<String>,
        system_id: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            event_unixtime: format_unixtime(received_at),
            event_message: message.into(),
            message_type: message_type.into(),
            system_id: system_id.into(),
        }
    }
}

/// `S.FFFFFF`
pub fn format_unixtime(ts: DateTime<Utc>) -> String {
    format!("{}.{:06}", ts.timestamp(), ts.timestamp_subsec_micros())
}

/// Drops the fixed-width `YYYY/MM/DD HH:MM:SS ` prefix when present.
pub fn strip_log_timestamp(raw: &str) -> &str {
    if raw.len() > TIMESTAMP_PREFIX_LEN && raw.is_char_boundary(TIMESTAMP_PREFIX_LEN) {
        &raw[TIMESTAMP_PREFIX_LEN..]
    } else {
        raw
    }
}

/// A captured line waiting for delivery.
#[derive(Debug, Clone)]
pub struct ReportedMessage {
    pub text: String,
    pub received_at: DateTime<Utc>,
}

/// Non-blocking forwarder of log lines to an HTTP collector.
///
/// Writes are queued (bounded) and delivered by a fixed pool of worker
/// tasks. A full queue drops the message. Delivery failures are written to
/// the diagnostic sink and never reach the writer.
///
/// A reporter without a URL or API key is inert: writes succeed and do
/// nothing.
#[derive(Clone)]
pub struct AsyncReporter {
    inner: Option<Arc<Queue>>,
}

struct Queue {
    tx: mpsc::Sender<ReportedMessage>,
    dropped: AtomicU64,
    diagnostics: SharedWriter,
}

struct Delivery {
    client: Client,
    url: Url,
    api_key: Option<String>,
    system_id: String,
    message_type: String,
    strip_timestamp: bool,
    diagnostics: SharedWriter,
}

impl AsyncReporter {
    /// A reporter that discards everything.
    pub fn inert() -> Self {
        Self { inner: None }
    }

    /// Build a reporter with the API key from `ALARM_MON_API_KEY`.
    pub fn from_env(config: ReporterConfig, diagnostics: SharedWriter) -> Self {
        let api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        Self::new(config, api_key, diagnostics)
    }

    /// Start the worker pool. Must be called within a Tokio runtime unless
    /// the result is inert.
    pub fn new(config: ReporterConfig, api_key: Option<String>, diagnostics: SharedWriter) -> Self {
        if config.url.is_empty() {
            return Self::inert();
        }
        let Some(api_key) = api_key.filter(|k| !k.is_empty()) else {
            diagnose(
                &diagnostics,
                format_args!("WARN: {API_KEY_ENV} not set, remote reporting disabled"),
            );
            return Self::inert();
        };
        let url = match Url::parse(&config.url) {
            Ok(url) => url,
            Err(e) => {
                diagnose(
                    &diagnostics,
                    format_args!("AsyncReporter invalid URL {}: {e}", config.url),
                );
                return Self::inert();
            }
        };
        let client = match Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(true)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                diagnose(&diagnostics, format_args!("AsyncReporter client creation error: {e}"));
                return Self::inert();
            }
        };

        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let delivery = Arc::new(Delivery {
            client,
            url,
            api_key: Some(api_key),
            system_id: config.system_id,
            message_type: config.message_type,
            strip_timestamp: config.strip_timestamp,
            diagnostics: diagnostics.clone(),
        });

        for _ in 0..config.workers.max(1) {
            tokio::spawn(worker(rx.clone(), delivery.clone()));
        }

        Self {
            inner: Some(Arc::new(Queue {
                tx,
                dropped: AtomicU64::new(0),
                diagnostics,
            })),
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }

    /// Messages discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.inner
            .as_ref()
            .map_or(0, |q| q.dropped.load(Ordering::Relaxed))
    }

    /// Queue one message for delivery without waiting.
    ///
    /// Always reports the whole buffer as consumed.
    pub fn enqueue(&self, buf: &[u8]) -> usize {
        let Some(queue) = &self.inner else {
            return buf.len();
        };

        let msg = ReportedMessage {
            text: String::from_utf8_lossy(buf).into_owned(),
            received_at: Utc::now(),
        };
        if let Err(e) = queue.tx.try_send(msg) {
            queue.dropped.fetch_add(1, Ordering::Relaxed);
            let msg = e.into_inner();
            diagnose(
                &queue.diagnostics,
                format_args!("AsyncReporter queue full, dropping message: {}", msg.text.trim_end()),
            );
        }
        buf.len()
    }
}

impl Write for AsyncReporter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.enqueue(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

async fn worker(rx: Arc<Mutex<mpsc::Receiver<ReportedMessage>>>, delivery: Arc<Delivery>) {
    loop {
        let next = rx.lock().await.recv().await;
        let Some(msg) = next else {
            break;
        };
        delivery.report(msg).await;
    }
}

impl Delivery {
    fn build_event(&self, msg: &ReportedMessage) -> Event {
        let text = if self.strip_timestamp {
            strip_log_timestamp(&msg.text)
        } else {
            &msg.text
        };
        Event::new(
            msg.received_at,
            text.trim(),
            self.message_type.as_str(),
            self.system_id.as_str(),
        )
    }

    async fn report(&self, msg: ReportedMessage) {
        let diag = &self.diagnostics;
        let event = self.build_event(&msg);

        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                diagnose(diag, format_args!("AsyncReporter marshal error: {e}"));
                return;
            }
        };

        let mut req = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        if let Some(key) = &self.api_key {
            req = req.header(API_KEY_HEADER, key);
        }

        match req.send().await {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                diagnose(
                    diag,
                    format_args!("AsyncReporter API error: {} - {}", status.as_u16(), body),
                );
            }
            Err(e) => {
                diagnose(diag, format_args!("AsyncReporter request error: {e}"));
            }
        }
    }
}

/// Writes one whole line to the diagnostic sink; failures are ignored.
fn diagnose(sink: &SharedWriter, args: fmt::Arguments<'_>) {
    let line = format!("{args}\n");
    let _ = sink.clone().write_all(line.as_bytes());
}
