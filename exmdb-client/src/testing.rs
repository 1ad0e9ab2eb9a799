//! In-process server harness for client tests.

use crate::client::{ClientFlags, ExmdbClient};
use exmdb_protocol::requests::CallId;
use exmdb_protocol::{IoBuffer, TaggedPropval};
use std::future::Future;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A scripted exmdb server on a local port.
///
/// The script drives one (or several sequential) connections and returns
/// captured bytes for the test to inspect.
pub(crate) struct MockServer {
    addr: SocketAddr,
    handle: JoinHandle<Vec<u8>>,
}

impl MockServer {
    /// Starts a server handling a single connection.
    pub(crate) async fn start<F, Fut>(script: F) -> Self
    where
        F: FnOnce(TcpStream) -> Fut + Send + 'static,
        Fut: Future<Output = Vec<u8>> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            script(stream).await
        });
        Self { addr, handle }
    }

    /// Starts a server handling `connections` sequential connections; the
    /// script receives the connection index. Captured bytes are
    /// concatenated.
    pub(crate) async fn start_multi<F, Fut>(connections: usize, script: F) -> Self
    where
        F: Fn(usize, TcpStream) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Vec<u8>> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut captured = Vec::new();
            for conn in 0..connections {
                let (stream, _) = listener.accept().await.unwrap();
                captured.extend(script(conn, stream).await);
            }
            captured
        });
        Self { addr, handle }
    }

    pub(crate) fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub(crate) fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Connects a client; the script must acknowledge the Connect call.
    pub(crate) async fn client(&self, flags: ClientFlags) -> ExmdbClient {
        ExmdbClient::connect(&self.host(), self.port(), "/d", false, flags)
            .await
            .unwrap()
    }

    /// Waits for the script to finish and returns its captured bytes.
    pub(crate) async fn finish(self) -> Vec<u8> {
        self.handle.await.unwrap()
    }
}

/// Reads one length-prefixed request; returns the call id and the body
/// after it.
pub(crate) async fn read_request(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    let mut len = [0u8; 4];
    stream.read_exact(&mut len).await.unwrap();
    let len = u32::from_le_bytes(len) as usize;
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await.unwrap();
    (body[0], body[1..].to_vec())
}

/// Writes a response: status byte, little-endian payload length, payload.
pub(crate) async fn write_response(stream: &mut TcpStream, status: u8, payload: &[u8]) {
    let mut out = Vec::with_capacity(5 + payload.len());
    out.push(status);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    stream.write_all(&out).await.unwrap();
}

/// Acknowledges the session-establishing Connect call.
pub(crate) async fn accept_connect(stream: &mut TcpStream) {
    let (op, _) = read_request(stream).await;
    assert_eq!(op, CallId::Connect as u8);
    write_response(stream, 0, &[]).await;
}

/// Payload of a load-table response.
pub(crate) fn load_table_payload(table_id: u32, row_count: u32) -> Vec<u8> {
    let mut buf = IoBuffer::new();
    buf.push_u32(table_id);
    buf.push_u32(row_count);
    buf.as_slice().to_vec()
}

/// Payload of a folder-id response.
pub(crate) fn folder_payload(folder_id: u64) -> Vec<u8> {
    folder_id.to_le_bytes().to_vec()
}

/// Payload of a table-query response.
pub(crate) fn table_payload(rows: &[Vec<TaggedPropval<'_>>]) -> Vec<u8> {
    let mut buf = IoBuffer::new();
    buf.push_u32(rows.len() as u32);
    for row in rows {
        buf.push_u16(row.len() as u16);
        for propval in row {
            propval.serialize(&mut buf).unwrap();
        }
    }
    buf.as_slice().to_vec()
}

/// Payload of a propval-list response.
pub(crate) fn propvals_payload(propvals: &[TaggedPropval<'_>]) -> Vec<u8> {
    let mut buf = IoBuffer::new();
    buf.push_u16(propvals.len() as u16);
    for propval in propvals {
        propval.serialize(&mut buf).unwrap();
    }
    buf.as_slice().to_vec()
}
