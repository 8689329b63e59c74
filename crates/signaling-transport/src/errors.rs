//! Transport error types.

use crate::codec::CodecError;
use thiserror::Error;

/// Errors raised while establishing or using the signaling connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection attempt failed.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The configured endpoint URL could not be turned into a request.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A configured header name or value is not valid HTTP.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A frame could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The connection task has already exited.
    #[error("Connection closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            TransportError::Connect("refused".to_string()).to_string(),
            "Connection failed: refused"
        );
        assert_eq!(TransportError::Closed.to_string(), "Connection closed");
        assert_eq!(
            TransportError::from(CodecError::UnsupportedTag(9)).to_string(),
            "Codec error: Unsupported envelope tag: 9"
        );
    }
}
