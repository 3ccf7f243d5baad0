// MIT License - Copyright (c) 2026 Peter Wright
// Reconnect loop

use tracing::{info, warn};

use crate::client::TpiClient;
use crate::error::{ErrorClass, TpiError};
use crate::transport::Dialer;

/// Which errors end the monitoring loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Retry everything, authentication failures included.
    #[default]
    RetryAll,
    /// Give up on the first fatal error.
    StopOnFatal,
}

impl RetryPolicy {
    pub fn should_retry(&self, err: &TpiError) -> bool {
        match self {
            RetryPolicy::RetryAll => true,
            RetryPolicy::StopOnFatal => err.class() == ErrorClass::Transient,
        }
    }
}

/// Connect and stream until the client is closed.
///
/// Returns `Ok(())` once [`CloseHandle::close`](crate::client::CloseHandle::close)
/// has been called, or the error that `policy` refused to retry.
pub async fn run<D: Dialer>(client: &mut TpiClient<D>, policy: RetryPolicy) -> Result<(), TpiError> {
    info!("Starting TPI monitor for {}", client.config().address);

    loop {
        if client.is_closed() {
            return Ok(());
        }

        if let Err(e) = client.connect().await {
            if client.is_closed() {
                return Ok(());
            }
            if !policy.should_retry(&e) {
                return Err(e);
            }
            warn!("Connection attempt failed: {}", e);
            continue;
        }

        if let Err(e) = client.read_loop().await {
            if client.is_closed() {
                return Ok(());
            }
            warn!("Connection lost: {}", e);
            if !policy.should_retry(&e) {
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CloseHandle;
    use crate::config::ClientConfig;
    use crate::sink::tests::Capture;
    use crate::transport::TpiStream;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, OnceLock};
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};
    use tokio::time::Instant;

    /// Each dial yields a module that replays `script` and hangs up. Once
    /// `sessions` dials have been served the client is closed.
    #[derive(Clone)]
    struct ReplayDialer {
        script: &'static str,
        sessions: usize,
        dials: Arc<AtomicUsize>,
        stop: Arc<OnceLock<CloseHandle>>,
    }

    impl Dialer for ReplayDialer {
        async fn dial(&self, _address: &str) -> io::Result<Box<dyn TpiStream>> {
            let n = self.dials.fetch_add(1, Ordering::SeqCst) + 1;
            if n > self.sessions {
                if let Some(handle) = self.stop.get() {
                    handle.close();
                }
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "stopped"));
            }
            let (client, mut server) = duplex(1024);
            server.write_all(self.script.as_bytes()).await?;
            tokio::spawn(async move {
                // Hang up once the password has arrived.
                let mut password = [0u8; 9];
                let _ = server.read_exact(&mut password).await;
            });
            Ok(Box::new(client))
        }
    }

    fn client(
        script: &'static str,
        sessions: usize,
    ) -> (TpiClient<ReplayDialer>, Arc<AtomicUsize>, Capture) {
        let dials = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(OnceLock::new());
        let sink = Capture::default();
        let config = ClientConfig::builder().password("testpass").build();
        let dialer = ReplayDialer {
            script,
            sessions,
            dials: dials.clone(),
            stop: stop.clone(),
        };
        let client = TpiClient::with_dialer(config, dialer, sink.clone());
        let _ = stop.set(client.close_handle());
        (client, dials, sink)
    }

    #[test]
    fn test_policy() {
        let auth = TpiError::auth("incorrect password");
        let conn = TpiError::disconnected("connection closed");
        assert!(RetryPolicy::RetryAll.should_retry(&auth));
        assert!(RetryPolicy::RetryAll.should_retry(&conn));
        assert!(!RetryPolicy::StopOnFatal.should_retry(&auth));
        assert!(RetryPolicy::StopOnFatal.should_retry(&conn));
        assert_eq!(RetryPolicy::default(), RetryPolicy::RetryAll);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_on_fatal_returns_auth_error() {
        let (mut client, dials, _) = client("Login:\r\nFAILED\r\n", 10);
        let err = run(&mut client, RetryPolicy::StopOnFatal).await.unwrap_err();
        assert!(matches!(err, TpiError::Auth { .. }));
        assert_eq!(dials.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_all_backs_off_on_auth_failures() {
        let (mut client, dials, _) = client("Login:\r\nFAILED\r\n", 4);

        let start = Instant::now();
        run(&mut client, RetryPolicy::RetryAll).await.unwrap();

        assert_eq!(dials.load(Ordering::SeqCst), 5);
        // No wait before the first attempt, then 2s, 4s, 8s, 16s.
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_disconnect() {
        let (mut client, dials, sink) = client("Login:\r\nOK\r\n609001\r\n", 3);

        let start = Instant::now();
        run(&mut client, RetryPolicy::StopOnFatal).await.unwrap();

        assert_eq!(dials.load(Ordering::SeqCst), 4);
        // Every session authenticated, so no attempt ever waited.
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(sink.lines(), ["609001", "609001", "609001"]);
    }
}
