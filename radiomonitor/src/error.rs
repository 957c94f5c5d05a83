//! Error types for the channel monitor
//!
//! Three families, by who sees them:
//!
//! - [`ConfigurationError`]: the channel file is unusable, fatal at startup
//! - [`WindowError`]: one playlist window could not be computed, contained to
//!   its channel and poll
//! - [`LookupError`]: what a playlist request gets back from the cache

use std::path::PathBuf;

/// The channel configuration cannot be loaded
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Cannot read channel file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON, or an entry without host/port
    #[error("Invalid channel file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid channel configuration: {0}")]
    Invalid(String),
}

impl ConfigurationError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Failure of one window computation
#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    /// The player could not be reached, or stopped answering in time
    #[error("Channel {channel} is unavailable: {source}")]
    ChannelUnavailable {
        channel: String,
        #[source]
        source: radiompd::Error,
    },

    /// The queue is empty or its position does not point into it
    #[error("Channel {channel} has no current track")]
    NoCurrentTrack { channel: String },

    /// The player answered something we could not use
    #[error("Protocol error on channel {channel}: {source}")]
    Protocol {
        channel: String,
        #[source]
        source: radiompd::Error,
    },
}

impl WindowError {
    /// Classifies a client error: transport failures make the channel
    /// unavailable, anything else is a protocol error
    pub fn from_player(channel: &str, source: radiompd::Error) -> Self {
        let channel = channel.to_string();
        if source.is_connection() {
            Self::ChannelUnavailable { channel, source }
        } else {
            Self::Protocol { channel, source }
        }
    }

    pub fn no_current_track(channel: &str) -> Self {
        Self::NoCurrentTrack {
            channel: channel.to_string(),
        }
    }

    pub fn channel(&self) -> &str {
        match self {
            Self::ChannelUnavailable { channel, .. }
            | Self::NoCurrentTrack { channel }
            | Self::Protocol { channel, .. } => channel,
        }
    }
}

/// Result of a playlist lookup that produced no window
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("Unknown channel: {0}")]
    NotFound(String),

    #[error("Channel {channel} is unavailable: {reason}")]
    Unavailable { channel: String, reason: String },
}
