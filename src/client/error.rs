// ABOUTME: SSMI client error types for comprehensive error handling across all client operations
// ABOUTME: Provides structured error reporting with automatic conversion from I/O and codec errors

use crate::codec::CodecError;
use std::io;
use thiserror::Error;

/// Comprehensive error type for SSMI client operations
///
/// A rejected login is not an error: `authenticate` reports it through
/// [`crate::client::Authentication`].
#[derive(Debug, Error)]
pub enum SsmiError {
    /// Schema violation building a command, or a malformed inbound line
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A registered command reached dispatch without a handler
    #[error("No handler registered for command: {0}")]
    UnhandledCommand(String),

    /// I/O error during network operations (connection, read, write)
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// Connection closed, or a pending reply was dropped before resolving
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// Peer sent more than the framing layer will buffer for one line
    #[error("Line exceeds {0} bytes without a terminator")]
    LineTooLong(usize),

    /// Client not in correct state for operation
    #[error("Invalid client state: {0}")]
    InvalidState(String),

    /// Payload transcoding failed
    #[error("Payload error: {0}")]
    Payload(String),

    /// Login rejected while building a ready-to-use client
    #[error("Authentication rejected: {0}")]
    AuthenticationRejected(String),
}

impl SsmiError {
    /// Whether this error came from building an outbound command
    pub fn is_schema(&self) -> bool {
        matches!(self, SsmiError::Codec(err) if err.is_schema())
    }

    /// Whether this error came from decoding an inbound line
    pub fn is_protocol(&self) -> bool {
        matches!(self, SsmiError::Codec(err) if err.is_protocol())
    }
}

/// Result type alias for SSMI operations
pub type SsmiResult<T> = Result<T, SsmiError>;
