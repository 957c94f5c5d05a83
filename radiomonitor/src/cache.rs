//! Per-channel playlist cache
//!
//! Request handlers only ever read from here. The refresh loop is the single
//! writer: it builds the new window without holding any lock, then swaps the
//! `Arc` under a short write lock, so readers see either the previous window
//! or the new one, never a mix.
//!
//! A failed refresh keeps the previous window. It is served until it gets
//! older than `stale_after`, after which the channel reports unavailable.

use crate::error::{LookupError, WindowError};
use crate::liveness::LiveSnapshot;
use crate::registry::ChannelRegistry;
use crate::window::PlaylistWindow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Default age after which a cached window is no longer served (60 seconds)
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60);

/// A successfully computed window and when it was fetched
#[derive(Debug, Clone)]
pub struct CachedWindow {
    pub window: PlaylistWindow,
    pub fetched_at: DateTime<Utc>,
    fetched: Instant,
}

impl CachedWindow {
    pub fn age(&self) -> Duration {
        self.fetched.elapsed()
    }
}

#[derive(Debug, Default)]
struct Slot {
    window: Option<Arc<CachedWindow>>,
    failures: u64,
    consecutive_failures: u64,
    last_error: Option<String>,
    last_attempt: Option<DateTime<Utc>>,
}

/// Observability view of one channel, served by `/channels.json`
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStats {
    pub name: String,
    pub label: String,
    pub live: bool,
    pub fetched_at: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub failures: u64,
    pub consecutive_failures: u64,
    pub last_error: Option<String>,
}

pub struct PlaylistCache {
    registry: Arc<ChannelRegistry>,
    slots: RwLock<HashMap<String, Slot>>,
    stale_after: Duration,
}

impl PlaylistCache {
    pub fn new(registry: Arc<ChannelRegistry>, stale_after: Duration) -> Self {
        let slots = registry
            .iter()
            .map(|channel| (channel.name.clone(), Slot::default()))
            .collect();
        Self {
            registry,
            slots: RwLock::new(slots),
            stale_after,
        }
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Replaces the window of `channel` and resets its failure streak
    pub async fn store(&self, channel: &str, window: PlaylistWindow) {
        let cached = Arc::new(CachedWindow {
            window,
            fetched_at: Utc::now(),
            fetched: Instant::now(),
        });

        let mut slots = self.slots.write().await;
        if let Some(slot) = slots.get_mut(channel) {
            if slot.consecutive_failures > 0 {
                info!(
                    channel,
                    failures = slot.consecutive_failures,
                    "channel recovered"
                );
            }
            slot.last_attempt = Some(cached.fetched_at);
            slot.window = Some(cached);
            slot.consecutive_failures = 0;
            slot.last_error = None;
        }
    }

    /// Counts a failed refresh; the previous window stays in place
    pub async fn record_failure(&self, error: &WindowError) {
        let message = error.to_string();
        let mut slots = self.slots.write().await;
        if let Some(slot) = slots.get_mut(error.channel()) {
            slot.failures += 1;
            slot.consecutive_failures += 1;
            slot.last_attempt = Some(Utc::now());
            // one warning per failure streak, the rest goes to debug
            if slot.consecutive_failures == 1 {
                warn!(channel = error.channel(), error = %message, "playlist refresh failed");
            } else {
                debug!(
                    channel = error.channel(),
                    failures = slot.consecutive_failures,
                    error = %message,
                    "playlist refresh still failing"
                );
            }
            slot.last_error = Some(message);
        }
    }

    /// Latest window of `channel`, without ever touching the network
    pub async fn get(&self, channel: &str) -> Result<Arc<CachedWindow>, LookupError> {
        if !self.registry.contains(channel) {
            return Err(LookupError::NotFound(channel.to_string()));
        }

        let slots = self.slots.read().await;
        let slot = slots
            .get(channel)
            .ok_or_else(|| LookupError::NotFound(channel.to_string()))?;

        let unavailable = |reason: String| LookupError::Unavailable {
            channel: channel.to_string(),
            reason,
        };

        match &slot.window {
            None => Err(unavailable(
                slot.last_error
                    .clone()
                    .unwrap_or_else(|| "no playlist fetched yet".to_string()),
            )),
            Some(cached) if cached.age() > self.stale_after => {
                let mut reason = format!(
                    "playlist not refreshed for {}s",
                    cached.age().as_secs()
                );
                if let Some(error) = &slot.last_error {
                    reason.push_str(&format!(" ({})", error));
                }
                Err(unavailable(reason))
            }
            Some(cached) => Ok(cached.clone()),
        }
    }

    /// Per-channel statistics in registry order
    pub async fn stats(&self, live: &LiveSnapshot) -> Vec<ChannelStats> {
        let slots = self.slots.read().await;
        self.registry
            .iter()
            .map(|channel| {
                let slot = slots.get(&channel.name);
                ChannelStats {
                    name: channel.name.clone(),
                    label: channel.display_name().to_string(),
                    live: live.is_live(&channel.name),
                    fetched_at: slot
                        .and_then(|s| s.window.as_ref())
                        .map(|w| w.fetched_at),
                    last_attempt: slot.and_then(|s| s.last_attempt),
                    failures: slot.map_or(0, |s| s.failures),
                    consecutive_failures: slot.map_or(0, |s| s.consecutive_failures),
                    last_error: slot.and_then(|s| s.last_error.clone()),
                }
            })
            .collect()
    }
}
