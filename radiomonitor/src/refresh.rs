//! Background refresh loop
//!
//! One task drives everything: every `poll_interval` it runs the liveness
//! sweep and refreshes the window of every channel, all channels in parallel.
//! A slow or dead player only delays its own slot of the cycle.

use crate::cache::{PlaylistCache, DEFAULT_STALE_AFTER};
use crate::error::WindowError;
use crate::liveness::{LiveSignal, LiveSnapshot, LivenessDetector};
use crate::registry::{Channel, ChannelRegistry};
use crate::window::build_window;
use futures::future::join_all;
use radiompd::PlayerConnector;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default delay between two poll cycles (5 seconds)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of songs on each side of the current one
pub const DEFAULT_WINDOW_SIZE: usize = 5;

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub before: usize,
    pub after: usize,
    pub stale_after: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            before: DEFAULT_WINDOW_SIZE,
            after: DEFAULT_WINDOW_SIZE,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }
}

/// Outcome of one poll cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub live: LiveSnapshot,
    pub refreshed: usize,
    pub failed: usize,
}

/// Owns the detector and the cache, and keeps both up to date
pub struct Monitor<C: PlayerConnector> {
    connector: Arc<C>,
    registry: Arc<ChannelRegistry>,
    cache: Arc<PlaylistCache>,
    detector: LivenessDetector<C>,
    settings: MonitorSettings,
}

impl<C: PlayerConnector> Monitor<C> {
    pub fn new(connector: C, registry: Arc<ChannelRegistry>, settings: MonitorSettings) -> Self {
        let connector = Arc::new(connector);
        let cache = Arc::new(PlaylistCache::new(registry.clone(), settings.stale_after));
        let detector = LivenessDetector::new(connector.clone(), registry.clone());
        Self {
            connector,
            registry,
            cache,
            detector,
            settings,
        }
    }

    pub fn cache(&self) -> Arc<PlaylistCache> {
        self.cache.clone()
    }

    pub fn live_signal(&self) -> LiveSignal {
        self.detector.signal()
    }

    pub fn registry(&self) -> Arc<ChannelRegistry> {
        self.registry.clone()
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Recomputes the window of one channel and stores the outcome
    pub async fn refresh_channel(&self, channel: &Channel) -> Result<(), WindowError> {
        match build_window(
            self.connector.as_ref(),
            channel,
            self.settings.before,
            self.settings.after,
        )
        .await
        {
            Ok(window) => {
                self.cache.store(&channel.name, window).await;
                Ok(())
            }
            Err(err) => {
                self.cache.record_failure(&err).await;
                Err(err)
            }
        }
    }

    /// Runs the liveness sweep and every channel refresh once
    pub async fn run_cycle(&self) -> CycleReport {
        let refreshes: Vec<_> = self
            .registry
            .iter()
            .map(|channel| self.refresh_channel(channel))
            .collect();
        let (live, outcomes) = tokio::join!(self.detector.sweep(), join_all(refreshes));

        let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
        let report = CycleReport {
            live,
            refreshed: outcomes.len() - failed,
            failed,
        };
        debug!(
            version = report.live.version,
            live = ?report.live.channel,
            refreshed = report.refreshed,
            failed = report.failed,
            "poll cycle done"
        );
        report
    }

    /// Polls until `token` is cancelled
    ///
    /// Cancellation abandons the cycle in flight without waiting for it.
    pub async fn run(&self, token: CancellationToken) {
        info!(
            channels = self.registry.len(),
            interval = ?self.settings.poll_interval,
            "channel monitor started"
        );

        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = token.cancelled() => break,
                _ = self.run_cycle() => {}
            }
        }

        info!("channel monitor stopped");
    }

    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(token).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::testing::{FakeConnector, FakePlayer};
    use radiompd::{Endpoint, PlayState};

    fn registry() -> Arc<ChannelRegistry> {
        Arc::new(
            ChannelRegistry::new(vec![
                Channel::new("everything", Endpoint::new("fake", 6600)),
                Channel::new("cyberia", Endpoint::new("fake", 6601)),
                Channel::new("swing", Endpoint::new("fake", 6602)),
            ])
            .unwrap(),
        )
    }

    fn monitor(connector: &FakeConnector) -> Monitor<FakeConnector> {
        Monitor::new(connector.clone(), registry(), MonitorSettings::default())
    }

    #[tokio::test]
    async fn test_cycle_fills_the_cache() {
        let connector = FakeConnector::default();
        connector.set(6600, FakePlayer::playing(30, 12));
        connector.set(6601, FakePlayer::paused(8, 1));
        connector.set(6602, FakePlayer::playing(20, 10));

        let monitor = monitor(&connector);
        let report = monitor.run_cycle().await;

        assert_eq!(report.refreshed, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(report.live.channel.as_deref(), Some("cyberia"));
        assert_eq!(monitor.live_signal().current(), report.live);

        let swing = monitor.cache().get("swing").await.unwrap();
        assert_eq!(swing.window.before.len(), 5);
        assert_eq!(swing.window.current.title.as_deref(), Some("Song 10"));
        assert_eq!(swing.window.after.len(), 5);
    }

    #[tokio::test]
    async fn test_failing_channel_keeps_its_window_and_spares_the_others() {
        let connector = FakeConnector::default();
        connector.set(6600, FakePlayer::playing(30, 12));
        connector.set(6601, FakePlayer::playing(8, 1));
        connector.set(6602, FakePlayer::playing(20, 10));

        let monitor = monitor(&connector);
        monitor.run_cycle().await;
        let before = monitor.cache().get("swing").await.unwrap();

        connector.update(6602, |player| player.refuse = true);
        connector.update(6600, |player| player.song = Some(13));
        let report = monitor.run_cycle().await;
        assert_eq!(report.failed, 1);

        let after = monitor.cache().get("swing").await.unwrap();
        assert_eq!(after.window, before.window);

        let everything = monitor.cache().get("everything").await.unwrap();
        assert_eq!(everything.window.current.title.as_deref(), Some("Song 13"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_channel_does_not_hold_back_the_others() {
        let connector = FakeConnector::default();
        connector.set(6600, FakePlayer::playing(30, 12).slow(Duration::from_secs(10)));
        connector.set(6601, FakePlayer::playing(8, 1));
        connector.set(6602, FakePlayer::playing(20, 10));

        let monitor = monitor(&connector);
        let cycle = monitor.run_cycle();
        tokio::pin!(cycle);
        tokio::select! {
            _ = &mut cycle => panic!("cycle finished before the slow channel answered"),
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        }

        let swing = monitor.cache().get("swing").await.unwrap();
        assert_eq!(swing.window.current.title.as_deref(), Some("Song 10"));
        assert!(monitor.cache().get("cyberia").await.is_ok());
        assert!(matches!(
            monitor.cache().get("everything").await,
            Err(LookupError::Unavailable { .. })
        ));

        let report = cycle.await;
        assert_eq!(report.refreshed, 3);
        let everything = monitor.cache().get("everything").await.unwrap();
        assert_eq!(everything.window.current.title.as_deref(), Some("Song 12"));
    }

    #[tokio::test]
    async fn test_empty_queue_is_reported_unavailable() {
        let connector = FakeConnector::default();
        connector.set(6600, FakePlayer::empty());
        connector.set(6601, FakePlayer::refusing());
        connector.set(6602, FakePlayer::playing(20, 10));

        let monitor = monitor(&connector);
        let report = monitor.run_cycle().await;
        assert_eq!(report.failed, 2);

        for name in ["everything", "cyberia"] {
            assert!(matches!(
                monitor.cache().get(name).await,
                Err(LookupError::Unavailable { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_loop_stops_on_cancel() {
        let connector = FakeConnector::default();
        connector.set(6600, FakePlayer::playing(30, 12));
        connector.set(6601, FakePlayer::playing(8, 1));
        connector.set(6602, FakePlayer::playing(20, 10));

        let settings = MonitorSettings {
            poll_interval: Duration::from_millis(10),
            ..MonitorSettings::default()
        };
        let monitor = Arc::new(Monitor::new(connector.clone(), registry(), settings));
        let mut signal = monitor.live_signal();
        let token = CancellationToken::new();
        let handle = monitor.clone().spawn(token.clone());

        // the first tick fires right away
        let first = signal.changed().await.unwrap();
        assert_eq!(first.channel, None);

        connector.update(6602, |player| player.state = PlayState::Pause);
        let mut live = first;
        while live.channel.is_none() {
            live = signal.changed().await.unwrap();
        }
        assert_eq!(live.channel.as_deref(), Some("swing"));

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
