//! Error types for the MPD client

use std::time::Duration;

/// Result type alias for MPD operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to an MPD instance
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// TCP connection could not be established
    #[error("Could not connect to MPD at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// An operation did not complete within the session timeout
    #[error("MPD {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// IO error on an established connection
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection in the middle of a reply
    #[error("MPD closed the connection")]
    Closed,

    /// The reply could not be parsed
    #[error("Malformed MPD reply: {0}")]
    Protocol(String),

    /// MPD answered with an `ACK` line
    #[error("MPD error {code} on {{{command}}}: {message}")]
    Ack {
        code: u32,
        command: String,
        message: String,
    },
}

impl Error {
    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Whether the failure comes from the transport rather than from the reply
    ///
    /// Connection failures are expected and recoverable: the endpoint may be
    /// restarting or unreachable for a while.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Error::Connect { .. } | Error::Timeout { .. } | Error::Io(_) | Error::Closed
        )
    }
}
