// MIT License - Copyright (c) 2026 Peter Wright
// TPI client: dial, authenticate, stream

use std::io::{self, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backoff::Backoff;
use crate::config::ClientConfig;
use crate::constants::{AUTH_TIMEOUT, MAX_LINE_LEN};
use crate::dedup::DuplicateFilter;
use crate::error::{Result, TpiError};
use crate::protocol::{decode_line, is_login_prompt, login_command, AuthResponse, LINE_TERMINATOR};
use crate::transport::{buffered, Connection, Dialer, TcpDialer};

/// Stops a running client from another task.
///
/// Cancels any pending backoff wait or read and makes further
/// [`TpiClient::connect`] calls fail.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    token: CancellationToken,
}

impl CloseHandle {
    pub fn close(&self) {
        self.token.cancel();
    }
}

/// One monitoring session with an EnvisaLink module.
///
/// Owns the live connection together with the reconnect delay and the
/// duplicate-suppression state. Accepted lines are written, raw and
/// newline-terminated, to the message sink.
pub struct TpiClient<D = TcpDialer> {
    config: ClientConfig,
    dialer: D,
    conn: Option<Connection>,
    backoff: Backoff,
    output: LineOutput,
    shutdown: CancellationToken,
}

/// Where accepted lines go.
struct LineOutput {
    filter: DuplicateFilter,
    last_line: Option<String>,
    sink: Box<dyn Write + Send>,
}

impl LineOutput {
    fn deliver(&mut self, line: String) {
        if !self.filter.accept(&line) {
            debug!("Suppressed duplicate line");
            return;
        }

        let mut out = Vec::with_capacity(line.len() + 1);
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
        if let Err(e) = self.sink.write_all(&out) {
            warn!("Failed to write TPI message: {}", e);
        }
        self.last_line = Some(line);
    }
}

impl TpiClient<TcpDialer> {
    pub fn new(config: ClientConfig, sink: impl Write + Send + 'static) -> Self {
        Self::with_dialer(config, TcpDialer, sink)
    }
}

impl<D: Dialer> TpiClient<D> {
    pub fn with_dialer(config: ClientConfig, dialer: D, sink: impl Write + Send + 'static) -> Self {
        let output = LineOutput {
            filter: DuplicateFilter::new(config.dedup_limit),
            last_line: None,
            sink: Box::new(sink),
        };
        Self {
            config,
            dialer,
            conn: None,
            backoff: Backoff::default(),
            output,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            token: self.shutdown.clone(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Last line written to the sink.
    pub fn last_line(&self) -> Option<&str> {
        self.output.last_line.as_deref()
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Establish and authenticate a new connection.
    ///
    /// Waits out the reconnect backoff first. On any failure the connection
    /// is dropped and the client holds none.
    pub async fn connect(&mut self) -> Result<()> {
        self.conn = None;
        if self.is_closed() {
            return Err(TpiError::disconnected("client closed"));
        }

        self.backoff.wait_and_advance(&self.shutdown).await;
        if self.is_closed() {
            return Err(TpiError::disconnected("client closed"));
        }

        info!("Connecting to {}", self.config.address);
        let stream = match self.dialer.dial(&self.config.address).await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to connect: {}", e);
                return Err(TpiError::connection("failed to dial", e));
            }
        };
        info!("Connected to {}", self.config.address);

        let mut conn = buffered(stream);
        let auth = tokio::select! {
            _ = self.shutdown.cancelled() => Err(TpiError::disconnected("client closed")),
            res = authenticate(&mut conn, &self.config.password) => res,
        };
        if let Err(e) = auth {
            warn!("Login to {} failed: {}", self.config.address, e);
            let _ = conn.shutdown().await;
            return Err(e);
        }

        info!("Authentication successful");
        self.backoff.reset();
        self.conn = Some(conn);
        Ok(())
    }

    /// Stream lines from the module until the connection ends.
    ///
    /// Always returns an error: a connection error wrapping the I/O failure,
    /// or one without a source when the module closed the stream. The
    /// connection stays in place while streaming and is dropped on return.
    pub async fn read_loop(&mut self) -> Result<()> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(TpiError::disconnected("not connected"));
        };
        let shutdown = self.shutdown.clone();
        let mut buf = Vec::new();

        let err = loop {
            buf.clear();
            let read = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Closing connection");
                    let _ = conn.shutdown().await;
                    break TpiError::disconnected("client closed");
                }
                res = read_line(conn, &mut buf) => res,
            };

            match read {
                Ok(0) => {
                    warn!("Connection closed by remote");
                    break TpiError::disconnected("connection closed");
                }
                Ok(_) if is_overlong(&buf) => {
                    warn!("Line exceeds {} bytes, dropping connection", MAX_LINE_LEN);
                    break TpiError::connection(
                        "read error",
                        io::Error::new(io::ErrorKind::InvalidData, "line too long"),
                    );
                }
                Ok(_) => self.output.deliver(decode_line(&buf)),
                Err(e) => {
                    warn!("Read error: {}", e);
                    break TpiError::connection("read error", e);
                }
            }
        };

        self.conn = None;
        Err(err)
    }

    /// Stop the client and drop the live connection, if any.
    pub async fn close(&mut self) {
        self.shutdown.cancel();
        if let Some(mut conn) = self.conn.take() {
            info!("Closing connection");
            let _ = conn.shutdown().await;
        }
    }

    #[cfg(test)]
    pub(crate) fn attach(&mut self, stream: Box<dyn crate::transport::TpiStream>) {
        self.conn = Some(buffered(stream));
    }
}

/// Run the login handshake on a fresh connection.
///
/// The whole exchange shares one deadline. Read and write failures, including
/// an early end of stream, are reported as timeouts.
pub async fn authenticate<S>(conn: &mut S, password: &str) -> Result<()>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    let deadline = Instant::now() + AUTH_TIMEOUT;

    let prompt = read_auth_line(conn, deadline, "read login prompt").await?;
    if !is_login_prompt(&prompt) {
        return Err(TpiError::auth(format!("unexpected prompt: {}", prompt.trim())));
    }

    let cmd = login_command(password);
    let send = async {
        conn.write_all(&cmd).await?;
        conn.flush().await
    };
    match timeout_at(deadline, send).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(TpiError::timeout("send password", e)),
        Err(_) => return Err(TpiError::timeout("send password", deadline_exceeded())),
    }

    let response = read_auth_line(conn, deadline, "read auth response").await?;
    match AuthResponse::parse(&response) {
        AuthResponse::Accepted => Ok(()),
        AuthResponse::Rejected => Err(TpiError::auth("incorrect password")),
        AuthResponse::Unexpected(other) => {
            Err(TpiError::auth(format!("unexpected response: {other}")))
        }
    }
}

async fn read_auth_line<S>(conn: &mut S, deadline: Instant, operation: &'static str) -> Result<String>
where
    S: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    match timeout_at(deadline, conn.read_until(LINE_TERMINATOR, &mut buf)).await {
        Ok(Ok(0)) => Err(TpiError::timeout(
            operation,
            io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed"),
        )),
        Ok(Ok(_)) => Ok(String::from_utf8_lossy(&buf).into_owned()),
        Ok(Err(e)) => Err(TpiError::timeout(operation, e)),
        Err(_) => Err(TpiError::timeout(operation, deadline_exceeded())),
    }
}

/// Reads one line, stopping one byte past [`MAX_LINE_LEN`].
async fn read_line(conn: &mut Connection, buf: &mut Vec<u8>) -> io::Result<usize> {
    conn.take(MAX_LINE_LEN as u64 + 1)
        .read_until(LINE_TERMINATOR, buf)
        .await
}

fn is_overlong(buf: &[u8]) -> bool {
    buf.len() > MAX_LINE_LEN && buf.last() != Some(&LINE_TERMINATOR)
}

fn deadline_exceeded() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "deadline exceeded")
}
