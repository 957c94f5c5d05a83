//! Live broadcast detection
//!
//! When a DJ takes over a channel, the channel's MPD queue is paused while
//! the human source is on air. A sweep probes every channel concurrently and
//! publishes one [`LiveSnapshot`] once all probes are done, so readers never
//! see the partial result of a sweep in progress.

use crate::registry::{Channel, ChannelRegistry};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use radiompd::{PlayState, PlayerConnector, PlayerSession};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Which channel carries a live broadcast, as of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LiveSnapshot {
    pub channel: Option<String>,
    /// Incremented by every published sweep, 0 before the first one
    pub version: u64,
    pub checked_at: Option<DateTime<Utc>>,
}

impl LiveSnapshot {
    pub fn is_live(&self, channel: &str) -> bool {
        self.channel.as_deref() == Some(channel)
    }
}

/// Read-only handle on the latest published snapshot
#[derive(Debug, Clone)]
pub struct LiveSignal {
    rx: watch::Receiver<LiveSnapshot>,
}

impl LiveSignal {
    pub fn current(&self) -> LiveSnapshot {
        self.rx.borrow().clone()
    }

    /// Waits for the next published sweep
    ///
    /// Returns `None` once the detector is gone.
    pub async fn changed(&mut self) -> Option<LiveSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

pub struct LivenessDetector<C: PlayerConnector> {
    connector: Arc<C>,
    registry: Arc<ChannelRegistry>,
    tx: watch::Sender<LiveSnapshot>,
}

impl<C: PlayerConnector> LivenessDetector<C> {
    pub fn new(connector: Arc<C>, registry: Arc<ChannelRegistry>) -> Self {
        let (tx, _) = watch::channel(LiveSnapshot::default());
        Self {
            connector,
            registry,
            tx,
        }
    }

    pub fn signal(&self) -> LiveSignal {
        LiveSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Whether `channel` is live right now; a channel that cannot be asked
    /// is not live
    pub async fn probe(&self, channel: &Channel) -> bool {
        let mut session = match self.connector.connect(&channel.endpoint).await {
            Ok(session) => session,
            Err(e) => {
                debug!(channel = %channel.name, error = %e, "liveness probe failed");
                return false;
            }
        };

        let status = session.status().await;
        session.close().await;

        match status {
            Ok(status) => status.state == PlayState::Pause,
            Err(e) => {
                debug!(channel = %channel.name, error = %e, "liveness probe failed");
                false
            }
        }
    }

    /// Probes every channel and publishes the outcome
    ///
    /// The first live channel in registry order wins.
    pub async fn sweep(&self) -> LiveSnapshot {
        let probes: Vec<_> = self
            .registry
            .iter()
            .map(|channel| async move { (channel.name.as_str(), self.probe(channel).await) })
            .collect();
        let probes = join_all(probes).await;

        let live: Vec<&str> = probes
            .into_iter()
            .filter_map(|(name, live)| live.then_some(name))
            .collect();

        if live.len() > 1 {
            warn!(
                channels = ?live,
                "several channels are live at once, keeping {}",
                live[0]
            );
        }

        let previous = self.tx.borrow().clone();
        let snapshot = LiveSnapshot {
            channel: live.first().map(|name| name.to_string()),
            version: previous.version + 1,
            checked_at: Some(Utc::now()),
        };

        if snapshot.channel != previous.channel {
            match &snapshot.channel {
                Some(name) => info!(channel = %name, "live broadcast started"),
                None => info!(
                    channel = previous.channel.as_deref().unwrap_or_default(),
                    "live broadcast ended"
                ),
            }
        }

        self.tx.send_replace(snapshot.clone());
        snapshot
    }
}
