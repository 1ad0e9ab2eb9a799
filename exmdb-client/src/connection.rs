//! Connection management and wire transport.

use crate::error::ClientError;
use exmdb_protocol::{IoBuffer, RESPONSE_HEADER_SIZE};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};

/// Budget for each address during connection establishment.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// A TCP connection to an exmdb server.
///
/// Owns exactly one socket and performs one blocking request/response
/// exchange at a time.
#[derive(Debug, Default)]
pub struct Connection {
    stream: Option<TcpStream>,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `host` and connects to the first address that becomes
    /// reachable within [`CONNECT_TIMEOUT`].
    pub async fn connect(&mut self, host: &str, port: u16) -> Result<(), ClientError> {
        self.stream = None;
        let addrs = lookup_host((host, port)).await?;
        let mut last_err = None;
        for addr in addrs {
            tracing::debug!("Connecting to {}...", addr);
            match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    stream.set_nodelay(true).ok();
                    self.stream = Some(stream);
                    return Ok(());
                }
                Ok(Err(err)) => {
                    tracing::debug!("Connect to {} failed: {}", addr, err);
                    last_err = Some(ClientError::Io(err));
                }
                Err(_) => {
                    tracing::debug!("Connect to {} timed out", addr);
                    last_err = Some(ClientError::ConnectTimeout);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            ClientError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "address resolution returned no results",
            ))
        }))
    }

    /// Returns whether a socket is currently open.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Closes the socket. Any in-flight exchange fails.
    pub fn close(&mut self) {
        self.stream = None;
    }

    /// Sends the framed request in `buf` and replaces the buffer contents
    /// with the response payload.
    ///
    /// The response header is `status: u8` followed by `length: u32` little
    /// endian; exactly `length` payload bytes follow. A non-zero status is
    /// surfaced as [`ClientError::Server`]. Transport failures close the
    /// connection.
    pub async fn transmit(&mut self, buf: &mut IoBuffer) -> Result<(), ClientError> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;

        let result = Self::exchange(stream, buf).await;
        if matches!(
            result,
            Err(ClientError::Io(_) | ClientError::ConnectionClosed)
        ) {
            self.stream = None;
        }
        result
    }

    async fn exchange(stream: &mut TcpStream, buf: &mut IoBuffer) -> Result<(), ClientError> {
        stream.write_all(buf.as_slice()).await?;

        let mut header = [0u8; RESPONSE_HEADER_SIZE];
        stream
            .read_exact(&mut header)
            .await
            .map_err(map_recv_err)?;
        let status = header[0];
        if status != 0 {
            return Err(ClientError::Server(status));
        }
        let length = u32::from_le_bytes(header[1..5].try_into().unwrap()) as usize;

        let mut payload = vec![0u8; length];
        stream
            .read_exact(&mut payload)
            .await
            .map_err(map_recv_err)?;

        buf.clear();
        buf.push_raw(&payload);
        Ok(())
    }
}

fn map_recv_err(err: io::Error) -> ClientError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        ClientError::ConnectionClosed
    } else {
        ClientError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_connection_is_closed() {
        let conn = Connection::new();
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_transmit_without_connection() {
        let mut conn = Connection::new();
        let mut buf = IoBuffer::new();
        assert!(matches!(
            conn.transmit(&mut buf).await,
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind and drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut conn = Connection::new();
        assert!(conn.connect("127.0.0.1", port).await.is_err());
        assert!(!conn.is_connected());
    }
}
