//! Music Player Daemon client for the radio backend
//!
//! Every radio channel is sequenced by its own MPD instance. This crate opens
//! short-lived sessions to those instances and exposes the two primitives the
//! playlist view needs: the player status and ranged queue queries.
//!
//! # Example
//!
//! ```no_run
//! use radiompd::{Endpoint, MpdConnector, PlayerConnector, PlayerSession};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = MpdConnector::new(Duration::from_secs(3));
//!     let endpoint = Endpoint::new("localhost", 6600);
//!
//!     let mut session = connector.connect(&endpoint).await?;
//!     let status = session.status().await?;
//!     println!("{} songs queued, playing #{:?}", status.playlist_length, status.song);
//!
//!     // Negative or oversized bounds are clamped before the query is sent
//!     let upcoming = session.queue_range(-3, 5, status.playlist_length).await?;
//!     println!("{} songs around the start of the queue", upcoming.len());
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Sessions
//!
//! Sessions are never pooled. MPD keeps per-connection state, so a session is
//! opened for one logical operation and closed right after it.

pub mod client;
pub mod error;
pub mod models;
pub mod protocol;
pub mod session;

// Re-exports
pub use client::{MpdConnector, MpdSession, MAX_LINE_LENGTH};
pub use error::{Error, Result};
pub use models::{Endpoint, PlayState, PlayerStatus, QueueItem};
pub use session::{clamp_range, PlayerConnector, PlayerSession};
