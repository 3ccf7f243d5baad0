// MIT License - Copyright (c) 2026 Peter Wright
// Connection establishment

use std::io;

use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::constants::DIAL_TIMEOUT;

/// Byte stream to the module.
pub trait TpiStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> TpiStream for T {}

/// Buffered, owned connection held by the client while streaming.
pub type Connection = BufReader<Box<dyn TpiStream>>;

/// Opens connections to the module.
///
/// [`TcpDialer`] is the production implementation; tests substitute
/// in-memory streams.
#[allow(async_fn_in_trait)]
pub trait Dialer {
    async fn dial(&self, address: &str) -> io::Result<Box<dyn TpiStream>>;
}

/// Plain TCP with a fixed connect timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    async fn dial(&self, address: &str) -> io::Result<Box<dyn TpiStream>> {
        let stream = timeout(DIAL_TIMEOUT, TcpStream::connect(address))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "dial timed out"))??;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}

pub(crate) fn buffered(stream: Box<dyn TpiStream>) -> Connection {
    BufReader::new(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_dialer_connects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"Login:\r\n").await.unwrap();
        });

        let mut stream = TcpDialer.dial(&addr).await.unwrap();
        let mut buf = [0u8; 8];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"Login:\r\n");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_tcp_dialer_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(TcpDialer.dial(&addr).await.is_err());
    }
}
