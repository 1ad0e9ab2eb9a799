//! Protocol error types and server response codes.

use thiserror::Error;

/// Errors produced while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("read past end of buffer ({requested} bytes requested, {available} available)")]
    Short { requested: usize, available: usize },

    #[error("unterminated string in buffer")]
    UnterminatedString,

    #[error("invalid UTF-8 in wire string")]
    InvalidUtf8,

    #[error("cannot store {value} in {tag} tag")]
    InvalidType {
        /// Name of the tag's declared type.
        tag: &'static str,
        /// Description of the offered value.
        value: &'static str,
    },

    #[error("(de)serialization of type {0:#06x} is not supported")]
    UnsupportedType(u16),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("failed to parse GUID '{0}'")]
    InvalidGuid(String),
}

/// Status codes returned in the response header by the exmdb server.
///
/// These codes are part of the protocol contract and must remain stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseCode {
    Success = 0,
    AccessDeny = 1,
    MaxReached = 2,
    LackMemory = 3,
    MisconfigPrefix = 4,
    MisconfigMode = 5,
    ConnectIncomplete = 6,
    PullError = 7,
    DispatchError = 8,
    PushError = 9,
}

impl ResponseCode {
    /// Maps a raw status byte to a known code, if any.
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(ResponseCode::Success),
            1 => Some(ResponseCode::AccessDeny),
            2 => Some(ResponseCode::MaxReached),
            3 => Some(ResponseCode::LackMemory),
            4 => Some(ResponseCode::MisconfigPrefix),
            5 => Some(ResponseCode::MisconfigMode),
            6 => Some(ResponseCode::ConnectIncomplete),
            7 => Some(ResponseCode::PullError),
            8 => Some(ResponseCode::DispatchError),
            9 => Some(ResponseCode::PushError),
            _ => None,
        }
    }

    /// Human-readable description of a raw status byte.
    pub fn describe(code: u8) -> &'static str {
        match Self::from_u8(code) {
            Some(ResponseCode::Success) => "Success",
            Some(ResponseCode::AccessDeny) => "Access denied",
            Some(ResponseCode::MaxReached) => "Server reached maximum number of connections",
            Some(ResponseCode::LackMemory) => "Out of memory",
            Some(ResponseCode::MisconfigPrefix) => "Prefix not served",
            Some(ResponseCode::MisconfigMode) => "Prefix has type mismatch",
            Some(ResponseCode::ConnectIncomplete) => "No prior CONNECT RPC made",
            Some(ResponseCode::PullError) => "Invalid request/server-side deserializing error",
            Some(ResponseCode::DispatchError) => "Dispatch error",
            Some(ResponseCode::PushError) => "Server-side serialize error",
            None => "Unknown error",
        }
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", Self::describe(*self as u8), *self as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_code_mapping() {
        assert_eq!(ResponseCode::from_u8(0), Some(ResponseCode::Success));
        assert_eq!(ResponseCode::from_u8(8), Some(ResponseCode::DispatchError));
        assert_eq!(ResponseCode::from_u8(9), Some(ResponseCode::PushError));
        assert_eq!(ResponseCode::from_u8(10), None);
    }

    #[test]
    fn test_response_code_description() {
        assert_eq!(ResponseCode::describe(1), "Access denied");
        assert_eq!(ResponseCode::describe(8), "Dispatch error");
        assert_eq!(ResponseCode::describe(0xff), "Unknown error");
    }

    #[test]
    fn test_error_display() {
        let err = ProtocolError::Short {
            requested: 8,
            available: 3,
        };
        assert!(err.to_string().contains("8 bytes requested"));

        let err = ProtocolError::UnsupportedType(0x00fd);
        assert!(err.to_string().contains("0x00fd"));
    }
}
