//! Data models returned by the MPD client

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of one MPD instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Sent with the `password` command right after the greeting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// `host:port`, suitable for `TcpStream::connect`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Player state as reported by the `state` field of `status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    Play,
    Pause,
    Stop,
}

impl PlayState {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "play" => Some(Self::Play),
            "pause" => Some(Self::Pause),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }
}

/// Snapshot of the `status` command
///
/// Recomputed for every poll; nothing keeps it across sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatus {
    pub state: PlayState,
    /// Queue position of the current song, absent when the queue is empty
    /// or playback never started
    pub song: Option<usize>,
    pub playlist_length: usize,
    /// Seconds into the current song
    pub elapsed: f64,
}

/// One entry of the play queue, as returned by `playlistinfo`
///
/// Tag names are lower-cased; values are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueItem {
    tags: Vec<(String, String)>,
}

impl QueueItem {
    pub fn new(tags: Vec<(String, String)>) -> Self {
        Self { tags }
    }

    /// First value of a tag (tag names are matched case-insensitively)
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(tag))
            .map(|(_, value)| value.as_str())
    }

    /// Path of the song relative to the music directory
    pub fn file(&self) -> Option<&str> {
        self.get("file")
    }

    /// Queue position, when MPD reported it
    pub fn position(&self) -> Option<usize> {
        self.get("pos").and_then(|p| p.parse().ok())
    }

    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }
}
