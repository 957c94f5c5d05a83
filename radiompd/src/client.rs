//! TCP client for MPD
//!
//! # Example
//!
//! ```no_run
//! use radiompd::{Endpoint, MpdConnector, PlayerConnector, PlayerSession};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> radiompd::Result<()> {
//! let connector = MpdConnector::new(Duration::from_secs(3));
//! let mut session = connector.connect(&Endpoint::new("localhost", 6602)).await?;
//! if let Some(song) = session.status().await?.song {
//!     let current = session.playlist_item(song).await?;
//!     println!("{:?}", current.and_then(|item| item.get("title").map(String::from)));
//! }
//! session.close().await;
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use crate::models::{Endpoint, PlayerStatus, QueueItem};
use crate::protocol::{
    parse_greeting, parse_pair, parse_status, parse_terminator, quote, split_items, Terminator,
    ACK_ERROR_ARG,
};
use crate::session::{PlayerConnector, PlayerSession};
use async_trait::async_trait;
use std::ops::Range;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Default timeout for every network operation (3 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 3;

/// Longest reply line accepted, newline included
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Opens MPD sessions with a bounded timeout per operation
#[derive(Debug, Clone)]
pub struct MpdConnector {
    timeout: Duration,
}

impl Default for MpdConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl MpdConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl PlayerConnector for MpdConnector {
    type Session = MpdSession;

    async fn connect(&self, endpoint: &Endpoint) -> Result<MpdSession> {
        let address = endpoint.address();
        let stream = match tokio::time::timeout(self.timeout, TcpStream::connect(&address)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(Error::Connect { address, source }),
            Err(_) => {
                return Err(Error::Timeout {
                    operation: "connect",
                    timeout: self.timeout,
                })
            }
        };

        let mut session = MpdSession {
            reader: BufReader::new(stream),
            timeout: self.timeout,
            version: String::new(),
            closed: false,
        };

        let greeting = tokio::time::timeout(self.timeout, session.read_line())
            .await
            .map_err(|_| Error::Timeout {
                operation: "greeting",
                timeout: self.timeout,
            })??;
        session.version = parse_greeting(&greeting)?;

        if let Some(password) = &endpoint.password {
            session
                .command("password", &format!("password {}", quote(password)))
                .await?;
        }

        debug!(endpoint = %endpoint, version = %session.version, "MPD session opened");
        Ok(session)
    }
}

/// An open MPD connection
///
/// Not meant to outlive one logical operation: close it (or drop it) as soon
/// as the queries are done.
#[derive(Debug)]
pub struct MpdSession {
    reader: BufReader<TcpStream>,
    timeout: Duration,
    version: String,
    closed: bool,
}

impl MpdSession {
    /// Protocol version announced in the greeting
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Reads one reply line, at most [`MAX_LINE_LENGTH`] bytes long
    ///
    /// Non UTF-8 bytes and oversized lines are protocol errors.
    async fn read_line(&mut self) -> Result<String> {
        let mut raw = Vec::new();
        let read = (&mut self.reader)
            .take(MAX_LINE_LENGTH as u64 + 1)
            .read_until(b'\n', &mut raw)
            .await?;
        if read == 0 {
            return Err(Error::Closed);
        }
        if raw.len() > MAX_LINE_LENGTH {
            return Err(Error::protocol(format!(
                "reply line longer than {} bytes",
                MAX_LINE_LENGTH
            )));
        }

        let line = String::from_utf8(raw)
            .map_err(|e| Error::protocol(format!("reply is not UTF-8: {}", e.utf8_error())))?;
        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }

    async fn exchange(&mut self, command: &str) -> Result<Vec<(String, String)>> {
        trace!(command, "MPD request");
        let stream = self.reader.get_mut();
        stream.write_all(command.as_bytes()).await?;
        stream.write_all(b"\n").await?;

        let mut pairs = Vec::new();
        loop {
            let line = self.read_line().await?;
            match parse_terminator(&line) {
                Some(Terminator::Ok) => return Ok(pairs),
                Some(Terminator::Ack {
                    code,
                    command,
                    message,
                }) => {
                    return Err(Error::Ack {
                        code,
                        command,
                        message,
                    })
                }
                None => pairs.push(parse_pair(&line)?),
            }
        }
    }

    /// Sends one command and collects its reply, bounded by the session timeout
    async fn command(
        &mut self,
        operation: &'static str,
        command: &str,
    ) -> Result<Vec<(String, String)>> {
        if self.closed {
            return Err(Error::Closed);
        }
        let timeout = self.timeout;
        let outcome = tokio::time::timeout(timeout, self.exchange(command)).await;
        match outcome {
            Ok(Ok(pairs)) => Ok(pairs),
            Ok(Err(err @ Error::Ack { .. })) => Err(err),
            Ok(Err(err)) => {
                // the stream position is unknown after a broken reply
                self.closed = true;
                Err(err)
            }
            Err(_) => {
                self.closed = true;
                Err(Error::Timeout { operation, timeout })
            }
        }
    }
}

#[async_trait]
impl PlayerSession for MpdSession {
    async fn status(&mut self) -> Result<PlayerStatus> {
        let pairs = self.command("status", "status").await?;
        parse_status(&pairs)
    }

    async fn playlist_info(&mut self, range: Range<usize>) -> Result<Vec<QueueItem>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let pairs = self
            .command(
                "playlistinfo",
                &format!("playlistinfo {}:{}", range.start, range.end),
            )
            .await?;
        split_items(pairs)
    }

    async fn playlist_item(&mut self, position: usize) -> Result<Option<QueueItem>> {
        match self
            .command("playlistinfo", &format!("playlistinfo {}", position))
            .await
        {
            Ok(pairs) => Ok(split_items(pairs)?.into_iter().next()),
            Err(Error::Ack { code, .. }) if code == ACK_ERROR_ARG => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let timeout = self.timeout;
        let stream = self.reader.get_mut();
        let _ = tokio::time::timeout(timeout, async {
            stream.write_all(b"close\n").await?;
            stream.shutdown().await
        })
        .await;
    }
}
