//! Client error types.

use exmdb_protocol::{ProtocolError, ResponseCode};
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire format error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed unexpectedly")]
    ConnectionClosed,

    #[error("connect timed out")]
    ConnectTimeout,

    #[error("server returned non-zero response code: {} ({})", describe_code(.0), .0)]
    Server(u8),
}

fn describe_code(code: &u8) -> &'static str {
    ResponseCode::describe(*code)
}

impl ClientError {
    /// Raw status byte of a server error, if this is one.
    pub fn response_code(&self) -> Option<u8> {
        match self {
            ClientError::Server(code) => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn is_dispatch_error(&self) -> bool {
        self.response_code() == Some(ResponseCode::DispatchError as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = ClientError::Server(8);
        assert!(err.to_string().contains("Dispatch error"));
        assert!(err.is_dispatch_error());
        assert_eq!(err.response_code(), Some(8));
    }

    #[test]
    fn test_non_server_errors_have_no_code() {
        assert_eq!(ClientError::NotConnected.response_code(), None);
        assert!(!ClientError::ConnectionClosed.is_dispatch_error());
    }
}
