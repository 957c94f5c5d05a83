//! Channel monitor for the radio backend
//!
//! Each channel of the radio is sequenced by its own MPD instance. This crate
//! keeps a "now playing" view of all of them:
//!
//! - [`ChannelRegistry`]: the channels, loaded once from the channel file
//! - [`build_window`]: the `{before, current, after, elapsed}` slice of a
//!   channel's queue, clamped to the queue bounds
//! - [`LivenessDetector`]: which channel, if any, a DJ is broadcasting on
//! - [`PlaylistCache`] and [`Monitor`]: the background loop that refreshes
//!   both, and the cache request handlers read from
//!
//! # Example
//!
//! ```no_run
//! use radiomonitor::{ChannelRegistry, Monitor, MonitorSettings};
//! use radiompd::MpdConnector;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(ChannelRegistry::load("channels.json")?);
//! let monitor = Arc::new(Monitor::new(
//!     MpdConnector::default(),
//!     registry,
//!     MonitorSettings::default(),
//! ));
//!
//! let token = CancellationToken::new();
//! let handle = monitor.clone().spawn(token.clone());
//!
//! match monitor.cache().get("swing").await {
//!     Ok(cached) => println!("now playing {:?}", cached.window.current.title),
//!     Err(e) => println!("{}", e),
//! }
//!
//! token.cancel();
//! handle.await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Server integration
//!
//! With the `server` feature (enabled by default), [`MonitorExt`] registers
//! the JSON endpoints on a `radioserver::Server`.

pub mod cache;
pub mod error;
pub mod liveness;
pub mod refresh;
pub mod registry;
pub mod window;

#[cfg(feature = "server")]
pub mod api_rest;
#[cfg(feature = "server")]
pub mod server_ext;
#[cfg(feature = "server")]
mod server_impl;

#[cfg(test)]
mod testing;

// Re-exports
pub use cache::{CachedWindow, ChannelStats, PlaylistCache, DEFAULT_STALE_AFTER};
pub use error::{ConfigurationError, LookupError, WindowError};
pub use liveness::{LiveSignal, LiveSnapshot, LivenessDetector};
pub use refresh::{CycleReport, Monitor, MonitorSettings, DEFAULT_POLL_INTERVAL, DEFAULT_WINDOW_SIZE};
pub use registry::{Channel, ChannelRegistry};
pub use window::{build_window, PlaylistWindow, TrackEntry};

#[cfg(feature = "server")]
pub use server_ext::{MonitorExt, MonitorState};
