//! Error types for the torrent client
//!
//! Defines the error taxonomy shared by the bencode codec, the peer wire
//! protocol, and the download pipeline.

use std::fmt;

/// Comprehensive error type for torrent operations
#[derive(Debug, Clone)]
pub enum TorrentError {
    /// Bencode syntax violation (bad length prefix, non-digit integer,
    /// unterminated string)
    MalformedInput {
        message: String,
        offset: Option<usize>,
    },

    /// Input buffer ended in the middle of a bencoded value
    TruncatedInput {
        message: String,
        offset: Option<usize>,
    },

    /// A decoded value is present but has the wrong semantic type or shape
    ProtocolMismatch {
        message: String,
        field: Option<String>,
    },

    /// A peer wire frame is too short or carries an unknown message ID
    InvalidMessage {
        message: String,
        source: Option<String>,
    },

    /// A peer sent a message that is invalid for the current connection state
    UnexpectedMessage {
        message: String,
        peer: Option<String>,
    },

    /// Dial/read/write failure on a peer socket, including timeouts
    ConnectionFailure {
        message: String,
        peer: Option<String>,
        source: Option<String>,
    },

    /// Tracker announce failure (transport error or a rejecting tracker)
    TrackerError {
        message: String,
        url: Option<String>,
        source: Option<String>,
    },

    /// Configuration errors
    ConfigError {
        message: String,
        field: Option<String>,
    },

    /// File I/O errors outside the peer sockets
    StorageError {
        message: String,
        path: Option<String>,
        source: Option<String>,
    },
}

impl TorrentError {
    /// Create a new MalformedInput error
    pub fn malformed_input(message: impl Into<String>) -> Self {
        TorrentError::MalformedInput {
            message: message.into(),
            offset: None,
        }
    }

    /// Create a new MalformedInput error at a buffer offset
    pub fn malformed_input_at(message: impl Into<String>, offset: usize) -> Self {
        TorrentError::MalformedInput {
            message: message.into(),
            offset: Some(offset),
        }
    }

    /// Create a new TruncatedInput error
    pub fn truncated_input(message: impl Into<String>) -> Self {
        TorrentError::TruncatedInput {
            message: message.into(),
            offset: None,
        }
    }

    /// Create a new TruncatedInput error at a buffer offset
    pub fn truncated_input_at(message: impl Into<String>, offset: usize) -> Self {
        TorrentError::TruncatedInput {
            message: message.into(),
            offset: Some(offset),
        }
    }

    /// Create a new ProtocolMismatch error
    pub fn protocol_mismatch(message: impl Into<String>) -> Self {
        TorrentError::ProtocolMismatch {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new ProtocolMismatch error naming the offending field
    pub fn protocol_mismatch_for(message: impl Into<String>, field: impl Into<String>) -> Self {
        TorrentError::ProtocolMismatch {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new InvalidMessage error
    pub fn invalid_message(message: impl Into<String>) -> Self {
        TorrentError::InvalidMessage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new InvalidMessage error with source detail
    pub fn invalid_message_with_source(message: impl Into<String>, source: impl Into<String>) -> Self {
        TorrentError::InvalidMessage {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new UnexpectedMessage error
    pub fn unexpected_message(message: impl Into<String>) -> Self {
        TorrentError::UnexpectedMessage {
            message: message.into(),
            peer: None,
        }
    }

    /// Create a new UnexpectedMessage error with the peer address
    pub fn unexpected_message_from(message: impl Into<String>, peer: impl Into<String>) -> Self {
        TorrentError::UnexpectedMessage {
            message: message.into(),
            peer: Some(peer.into()),
        }
    }

    /// Create a new ConnectionFailure error
    pub fn connection_failure(message: impl Into<String>) -> Self {
        TorrentError::ConnectionFailure {
            message: message.into(),
            peer: None,
            source: None,
        }
    }

    /// Create a new ConnectionFailure error with the peer address
    pub fn connection_failure_with_peer(message: impl Into<String>, peer: impl Into<String>) -> Self {
        TorrentError::ConnectionFailure {
            message: message.into(),
            peer: Some(peer.into()),
            source: None,
        }
    }

    /// Create a new ConnectionFailure error with peer and source
    pub fn connection_failure_full(
        message: impl Into<String>,
        peer: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        TorrentError::ConnectionFailure {
            message: message.into(),
            peer: Some(peer.into()),
            source: Some(source.into()),
        }
    }

    /// Create a new TrackerError
    pub fn tracker_error(message: impl Into<String>) -> Self {
        TorrentError::TrackerError {
            message: message.into(),
            url: None,
            source: None,
        }
    }

    /// Create a new TrackerError with the announce URL
    pub fn tracker_error_with_url(message: impl Into<String>, url: impl Into<String>) -> Self {
        TorrentError::TrackerError {
            message: message.into(),
            url: Some(url.into()),
            source: None,
        }
    }

    /// Create a new ConfigError
    pub fn config_error(message: impl Into<String>) -> Self {
        TorrentError::ConfigError {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new ConfigError naming the offending field
    pub fn config_error_with_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        TorrentError::ConfigError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new StorageError with path and source
    pub fn storage_error_full(
        message: impl Into<String>,
        path: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        TorrentError::StorageError {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source.into()),
        }
    }
}

impl fmt::Display for TorrentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TorrentError::MalformedInput { message, offset } => {
                if let Some(off) = offset {
                    write!(f, "Malformed input: {} (offset: {})", message, off)
                } else {
                    write!(f, "Malformed input: {}", message)
                }
            }
            TorrentError::TruncatedInput { message, offset } => {
                if let Some(off) = offset {
                    write!(f, "Truncated input: {} (offset: {})", message, off)
                } else {
                    write!(f, "Truncated input: {}", message)
                }
            }
            TorrentError::ProtocolMismatch { message, field } => {
                if let Some(field_val) = field {
                    write!(f, "Protocol mismatch: {} (field: {})", message, field_val)
                } else {
                    write!(f, "Protocol mismatch: {}", message)
                }
            }
            TorrentError::InvalidMessage { message, source } => {
                if let Some(src) = source {
                    write!(f, "Invalid message: {} (source: {})", message, src)
                } else {
                    write!(f, "Invalid message: {}", message)
                }
            }
            TorrentError::UnexpectedMessage { message, peer } => {
                if let Some(p) = peer {
                    write!(f, "Unexpected message: {} (peer: {})", message, p)
                } else {
                    write!(f, "Unexpected message: {}", message)
                }
            }
            TorrentError::ConnectionFailure { message, peer, source } => {
                match (peer, source) {
                    (Some(p), Some(s)) => {
                        write!(f, "Connection failure: {} (peer: {}, source: {})", message, p, s)
                    }
                    (Some(p), None) => write!(f, "Connection failure: {} (peer: {})", message, p),
                    (None, Some(s)) => write!(f, "Connection failure: {} (source: {})", message, s),
                    (None, None) => write!(f, "Connection failure: {}", message),
                }
            }
            TorrentError::TrackerError { message, url, source } => {
                match (url, source) {
                    (Some(u), Some(s)) => {
                        write!(f, "Tracker error: {} (url: {}, source: {})", message, u, s)
                    }
                    (Some(u), None) => write!(f, "Tracker error: {} (url: {})", message, u),
                    (None, Some(s)) => write!(f, "Tracker error: {} (source: {})", message, s),
                    (None, None) => write!(f, "Tracker error: {}", message),
                }
            }
            TorrentError::ConfigError { message, field } => {
                if let Some(field_val) = field {
                    write!(f, "Config error: {} (field: {})", message, field_val)
                } else {
                    write!(f, "Config error: {}", message)
                }
            }
            TorrentError::StorageError { message, path, source } => {
                match (path, source) {
                    (Some(p), Some(s)) => {
                        write!(f, "Storage error: {} (path: {}, source: {})", message, p, s)
                    }
                    (Some(p), None) => write!(f, "Storage error: {} (path: {})", message, p),
                    (None, Some(s)) => write!(f, "Storage error: {} (source: {})", message, s),
                    (None, None) => write!(f, "Storage error: {}", message),
                }
            }
        }
    }
}

impl std::error::Error for TorrentError {}

// Implement From traits for common error types

impl From<std::io::Error> for TorrentError {
    fn from(err: std::io::Error) -> Self {
        TorrentError::ConnectionFailure {
            message: err.to_string(),
            peer: None,
            source: Some(err.kind().to_string()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for TorrentError {
    fn from(_err: tokio::time::error::Elapsed) -> Self {
        TorrentError::connection_failure("Operation timed out")
    }
}

impl From<reqwest::Error> for TorrentError {
    fn from(err: reqwest::Error) -> Self {
        TorrentError::TrackerError {
            message: "Tracker request failed".to_string(),
            url: err.url().map(|u| u.to_string()),
            source: Some(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_input() {
        let err = TorrentError::malformed_input("bad length prefix");
        assert_eq!(err.to_string(), "Malformed input: bad length prefix");
    }

    #[test]
    fn test_truncated_input_at() {
        let err = TorrentError::truncated_input_at("buffer ended mid-value", 17);
        assert!(err.to_string().contains("Truncated input"));
        assert!(err.to_string().contains("17"));
    }

    #[test]
    fn test_protocol_mismatch_for() {
        let err = TorrentError::protocol_mismatch_for("expected integer", "length");
        assert!(err.to_string().contains("Protocol mismatch"));
        assert!(err.to_string().contains("length"));
    }

    #[test]
    fn test_unexpected_message_from() {
        let err = TorrentError::unexpected_message_from("expected bitfield", "127.0.0.1:6881");
        assert!(err.to_string().contains("Unexpected message"));
        assert!(err.to_string().contains("127.0.0.1:6881"));
    }

    #[test]
    fn test_connection_failure_full() {
        let err = TorrentError::connection_failure_full("dial failed", "10.0.0.1:6881", "refused");
        assert!(err.to_string().contains("Connection failure"));
        assert!(err.to_string().contains("10.0.0.1:6881"));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err: TorrentError = io_err.into();
        assert!(matches!(err, TorrentError::ConnectionFailure { .. }));
    }

    #[test]
    fn test_config_error_with_field() {
        let err = TorrentError::config_error_with_field("port cannot be 0", "port");
        assert!(err.to_string().contains("Config error"));
        assert!(err.to_string().contains("port"));
    }
}
