//! High-level client API.

use crate::connection::Connection;
use crate::error::ClientError;
use exmdb_protocol::requests::{Connect, Request, ResponsePayload};
use exmdb_protocol::IoBuffer;

/// Client behavior flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientFlags(u8);

impl ClientFlags {
    /// Transparently reconnect once when the server reports a dispatch
    /// error, then re-raise the error.
    pub const AUTO_RECONNECT: u8 = 1 << 0;

    pub fn new() -> Self {
        Self(0)
    }

    pub fn with_auto_reconnect(mut self) -> Self {
        self.0 |= Self::AUTO_RECONNECT;
        self
    }

    pub fn has_auto_reconnect(&self) -> bool {
        self.0 & Self::AUTO_RECONNECT != 0
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}

/// Connection parameters, kept for reconnects.
#[derive(Debug, Clone)]
struct ConnParams {
    host: String,
    port: u16,
    prefix: String,
    private_store: bool,
}

/// Client managing communication with an exmdb server.
///
/// All request methods take `&mut self`: the protocol allows only one
/// outstanding request per connection, and the exclusive borrow makes a
/// second concurrent call on the same client impossible.
#[derive(Debug)]
pub struct ExmdbClient {
    connection: Connection,
    params: ConnParams,
    buffer: IoBuffer,
    flags: ClientFlags,
}

impl ExmdbClient {
    /// Connects to the server and issues the session-establishing `Connect`
    /// call.
    ///
    /// `prefix` is the server-side path scope of the store area;
    /// `private_store` selects per-mailbox stores instead of the public
    /// store.
    pub async fn connect(
        host: &str,
        port: u16,
        prefix: &str,
        private_store: bool,
        flags: ClientFlags,
    ) -> Result<Self, ClientError> {
        let mut client = Self {
            connection: Connection::new(),
            params: ConnParams {
                host: host.to_owned(),
                port,
                prefix: prefix.to_owned(),
                private_store,
            },
            buffer: IoBuffer::with_capacity(4096),
            flags,
        };
        client.connection.connect(host, port).await?;
        let prefix = client.params.prefix.clone();
        client
            .send(&Connect {
                prefix: &prefix,
                private_store,
            })
            .await?;
        Ok(client)
    }

    /// Sends a request and parses its typed response.
    ///
    /// With [`ClientFlags::AUTO_RECONNECT`] set, a dispatch error triggers
    /// one silent reconnect before the error is returned to the caller.
    pub async fn send<R: Request>(&mut self, request: &R) -> Result<R::Response, ClientError> {
        match self.send_once(request).await {
            Err(err) if err.is_dispatch_error() && self.flags.has_auto_reconnect() => {
                tracing::debug!("dispatch error, reconnecting");
                self.reconnect().await;
                Err(err)
            }
            result => result,
        }
    }

    async fn send_once<R: Request>(&mut self, request: &R) -> Result<R::Response, ClientError> {
        self.buffer.clear();
        self.buffer.begin_frame();
        request.encode(&mut self.buffer)?;
        self.buffer.finalize_frame();
        self.connection.transmit(&mut self.buffer).await?;
        Ok(R::Response::read(&mut self.buffer)?)
    }

    /// Attempts a fresh connection with the stored parameters and re-issues
    /// the `Connect` call. On failure the existing connection is left
    /// untouched and `false` is returned.
    pub async fn reconnect(&mut self) -> bool {
        let mut fresh = Connection::new();
        if fresh
            .connect(&self.params.host, self.params.port)
            .await
            .is_err()
        {
            return false;
        }

        let mut buf = IoBuffer::with_capacity(64);
        buf.begin_frame();
        let connect = Connect {
            prefix: &self.params.prefix,
            private_store: self.params.private_store,
        };
        if connect.encode(&mut buf).is_err() {
            return false;
        }
        buf.finalize_frame();
        if fresh.transmit(&mut buf).await.is_err() {
            return false;
        }

        self.connection = fresh;
        true
    }

    /// Returns whether the underlying socket is open.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Closes the connection.
    pub fn close(&mut self) {
        self.connection.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{read_request, write_response, MockServer};
    use exmdb_protocol::requests::{AllocateCn, CallId, UnloadStore};
    use exmdb_protocol::IoBuffer;

    #[test]
    fn test_client_flags() {
        let flags = ClientFlags::new();
        assert!(!flags.has_auto_reconnect());
        let flags = flags.with_auto_reconnect();
        assert!(flags.has_auto_reconnect());
        assert_eq!(flags.bits(), 1);
    }

    #[tokio::test]
    async fn test_connect_issues_connect_rpc() {
        let server = MockServer::start(|mut stream| async move {
            let (op, body) = read_request(&mut stream).await;
            assert_eq!(op, CallId::Connect as u8);
            write_response(&mut stream, 0, &[]).await;
            body
        })
        .await;

        let client = ExmdbClient::connect(
            &server.host(),
            server.port(),
            "/var/lib/gromox/domain/1",
            true,
            ClientFlags::new(),
        )
        .await
        .unwrap();
        assert!(client.is_connected());

        let body = server.finish().await;
        let mut buf = IoBuffer::from_vec(body);
        assert_eq!(buf.pop_str().unwrap(), "/var/lib/gromox/domain/1");
        assert_eq!(buf.pop_str().unwrap().len(), 15);
        assert!(buf.pop_bool().unwrap());
    }

    #[tokio::test]
    async fn test_send_parses_response() {
        let server = MockServer::start(|mut stream| async move {
            let (op, _) = read_request(&mut stream).await;
            assert_eq!(op, CallId::Connect as u8);
            write_response(&mut stream, 0, &[]).await;

            let (op, _) = read_request(&mut stream).await;
            assert_eq!(op, CallId::AllocateCn as u8);
            // change number 1 in big-endian order
            write_response(&mut stream, 0, &[0, 0, 0, 0, 0, 0, 0, 1]).await;
            Vec::new()
        })
        .await;

        let mut client = server.client(ClientFlags::new()).await;
        let resp = client.send(&AllocateCn { homedir: "/d" }).await.unwrap();
        assert_eq!(resp.change_num, 1);
        server.finish().await;
    }

    #[tokio::test]
    async fn test_server_error_status() {
        let server = MockServer::start(|mut stream| async move {
            read_request(&mut stream).await;
            write_response(&mut stream, 0, &[]).await;
            read_request(&mut stream).await;
            write_response(&mut stream, 4, &[]).await;
            Vec::new()
        })
        .await;

        let mut client = server.client(ClientFlags::new()).await;
        let err = client.send(&UnloadStore { homedir: "/d" }).await.unwrap_err();
        assert_eq!(err.response_code(), Some(4));
        // Protocol errors leave the connection usable.
        assert!(client.is_connected());
        server.finish().await;
    }

    #[tokio::test]
    async fn test_truncated_response_closes_connection() {
        let server = MockServer::start(|mut stream| async move {
            read_request(&mut stream).await;
            write_response(&mut stream, 0, &[]).await;
            read_request(&mut stream).await;
            // Announce 8 payload bytes but deliver only 3, then close.
            use tokio::io::AsyncWriteExt;
            stream
                .write_all(&[0, 8, 0, 0, 0, 1, 2, 3])
                .await
                .unwrap();
            Vec::new()
        })
        .await;

        let mut client = server.client(ClientFlags::new()).await;
        let err = client.send(&AllocateCn { homedir: "/d" }).await.unwrap_err();
        assert!(matches!(err, ClientError::ConnectionClosed));
        assert!(!client.is_connected());
        server.finish().await;
    }

    #[tokio::test]
    async fn test_auto_reconnect_on_dispatch_error() {
        let server = MockServer::start_multi(2, |conn, mut stream| async move {
            let (op, _) = read_request(&mut stream).await;
            assert_eq!(op, CallId::Connect as u8);
            write_response(&mut stream, 0, &[]).await;
            if conn == 0 {
                // First session: fail the next call with DISPATCH_ERROR.
                read_request(&mut stream).await;
                write_response(&mut stream, 8, &[]).await;
            } else {
                // Second session: serve the retried call.
                let (op, _) = read_request(&mut stream).await;
                assert_eq!(op, CallId::AllocateCn as u8);
                write_response(&mut stream, 0, &[0, 0, 0, 0, 0, 0, 0, 2]).await;
            }
            Vec::new()
        })
        .await;

        let mut client = server
            .client(ClientFlags::new().with_auto_reconnect())
            .await;

        // The dispatch error is re-raised after the silent reconnect.
        let err = client.send(&AllocateCn { homedir: "/d" }).await.unwrap_err();
        assert!(err.is_dispatch_error());

        // The next call runs on the fresh session.
        let resp = client.send(&AllocateCn { homedir: "/d" }).await.unwrap();
        assert_eq!(resp.change_num, 2);
        server.finish().await;
    }

    #[tokio::test]
    async fn test_no_reconnect_without_flag() {
        let server = MockServer::start(|mut stream| async move {
            read_request(&mut stream).await;
            write_response(&mut stream, 0, &[]).await;
            read_request(&mut stream).await;
            write_response(&mut stream, 8, &[]).await;
            Vec::new()
        })
        .await;

        let mut client = server.client(ClientFlags::new()).await;
        let err = client.send(&AllocateCn { homedir: "/d" }).await.unwrap_err();
        assert!(err.is_dispatch_error());
        server.finish().await;
    }
}
