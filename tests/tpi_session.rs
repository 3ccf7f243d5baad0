// End-to-end sessions against a scripted TPI server on a real TCP socket

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use envisalink_tpi::{monitor, ClientConfig, RetryPolicy, TpiClient, TpiError};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

#[derive(Clone, Default)]
struct Lines(Arc<Mutex<Vec<u8>>>);

impl Lines {
    fn get(&self) -> Vec<String> {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf).lines().map(str::to_string).collect()
    }
}

impl Write for Lines {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Send the prompt and return the password the client answered with.
async fn login(stream: &mut BufReader<TcpStream>) -> String {
    stream.get_mut().write_all(b"Login:\r\n").await.unwrap();
    let mut password = Vec::new();
    stream.read_until(b'\r', &mut password).await.unwrap();
    String::from_utf8(password).unwrap()
}

fn config(address: String, password: &str, dedup: Option<u32>) -> ClientConfig {
    ClientConfig::builder()
        .address(address)
        .password(password)
        .dedup_limit(dedup)
        .build()
}

#[tokio::test]
async fn test_session_streams_lines_until_remote_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut stream = BufReader::new(stream);
        let password = login(&mut stream).await;
        stream
            .get_mut()
            .write_all(b"OK\r\n609001\r\n609001\r\n610001\r\n510020")
            .await
            .unwrap();
        password
    });

    let lines = Lines::default();
    let mut client = TpiClient::new(config(address, "secret", Some(0)), lines.clone());

    client.connect().await.unwrap();
    assert!(client.is_connected());
    assert_eq!(server.await.unwrap(), "secret\r");

    let err = client.read_loop().await.unwrap_err();
    assert!(matches!(err, TpiError::Connection { .. }));
    assert!(std::error::Error::source(&err).is_none());
    assert!(!client.is_connected());

    // Unterminated final line is still delivered
    assert_eq!(lines.get(), ["609001", "610001", "510020"]);
    assert_eq!(client.last_line(), Some("510020"));
}

#[tokio::test]
async fn test_rejected_password_closes_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut stream = BufReader::new(stream);
        login(&mut stream).await;
        stream.get_mut().write_all(b"FAILED\r\n").await.unwrap();

        // The client hangs up after the rejection.
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).await.unwrap();
        rest
    });

    let mut client = TpiClient::new(config(address, "wrong", None), Lines::default());
    let err = client.connect().await.unwrap_err();

    assert!(matches!(err, TpiError::Auth { .. }));
    assert_eq!(err.to_string(), "authentication failed: incorrect password");
    assert!(!client.is_connected());

    let rest = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_dial_failure_is_connection_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let mut client = TpiClient::new(config(address, "secret", None), Lines::default());
    let err = client.connect().await.unwrap_err();

    assert!(matches!(err, TpiError::Connection { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_monitor_stops_on_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut stream = BufReader::new(stream);
        login(&mut stream).await;
        stream.get_mut().write_all(b"OK\r\n505000\r\n").await.unwrap();

        // Hold the session open until the client leaves.
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest).await;
    });

    let lines = Lines::default();
    let mut client = TpiClient::new(config(address, "secret", None), lines.clone());
    let handle = client.close_handle();

    let watcher = lines.clone();
    tokio::spawn(async move {
        while watcher.get().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.close();
    });

    timeout(Duration::from_secs(10), monitor::run(&mut client, RetryPolicy::RetryAll))
        .await
        .expect("monitor did not stop after close")
        .unwrap();

    assert!(client.is_closed());
    assert_eq!(lines.get(), ["505000"]);
}
