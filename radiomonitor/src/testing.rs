//! In-memory player used by the unit tests

use async_trait::async_trait;
use radiompd::{
    Endpoint, Error, PlayState, PlayerConnector, PlayerSession, PlayerStatus, QueueItem, Result,
};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) struct FakePlayer {
    pub state: PlayState,
    pub song: Option<usize>,
    pub queue_len: usize,
    pub elapsed: f64,
    pub refuse: bool,
    pub garbled: bool,
    /// Time `status` takes to answer
    pub delay: Option<Duration>,
}

impl FakePlayer {
    pub fn playing(queue_len: usize, song: usize) -> Self {
        Self {
            state: PlayState::Play,
            song: Some(song),
            queue_len,
            elapsed: 42.5,
            refuse: false,
            garbled: false,
            delay: None,
        }
    }

    pub fn paused(queue_len: usize, song: usize) -> Self {
        Self {
            state: PlayState::Pause,
            ..Self::playing(queue_len, song)
        }
    }

    pub fn empty() -> Self {
        Self {
            state: PlayState::Stop,
            song: None,
            queue_len: 0,
            elapsed: 0.0,
            refuse: false,
            garbled: false,
            delay: None,
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::empty()
        }
    }

    pub fn slow(self, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..self
        }
    }
}

/// Players keyed by port, plus a log of every ranged query
#[derive(Clone, Default)]
pub(crate) struct FakeConnector {
    players: Arc<Mutex<HashMap<u16, FakePlayer>>>,
    queries: Arc<Mutex<Vec<(u16, Range<usize>)>>>,
}

impl FakeConnector {
    pub fn set(&self, port: u16, player: FakePlayer) {
        self.players.lock().unwrap().insert(port, player);
    }

    pub fn update(&self, port: u16, f: impl FnOnce(&mut FakePlayer)) {
        if let Some(player) = self.players.lock().unwrap().get_mut(&port) {
            f(player);
        }
    }

    pub fn queries(&self) -> Vec<(u16, Range<usize>)> {
        self.queries.lock().unwrap().clone()
    }
}

pub(crate) fn fake_item(position: usize) -> QueueItem {
    QueueItem::new(vec![
        ("file".into(), format!("music/{:02}.flac", position)),
        ("artist".into(), format!("Artist {}", position)),
        ("album".into(), "Fake Album".into()),
        ("title".into(), format!("Song {}", position)),
        ("time".into(), "180".into()),
        ("pos".into(), position.to_string()),
        ("id".into(), (position + 100).to_string()),
    ])
}

pub(crate) struct FakeSession {
    port: u16,
    player: FakePlayer,
    queries: Arc<Mutex<Vec<(u16, Range<usize>)>>>,
}

#[async_trait]
impl PlayerConnector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&self, endpoint: &Endpoint) -> Result<FakeSession> {
        let player = self.players.lock().unwrap().get(&endpoint.port).cloned();
        match player {
            Some(player) if !player.refuse => Ok(FakeSession {
                port: endpoint.port,
                player,
                queries: self.queries.clone(),
            }),
            _ => Err(Error::Connect {
                address: endpoint.address(),
                source: std::io::ErrorKind::ConnectionRefused.into(),
            }),
        }
    }
}

#[async_trait]
impl PlayerSession for FakeSession {
    async fn status(&mut self) -> Result<PlayerStatus> {
        if let Some(delay) = self.player.delay {
            tokio::time::sleep(delay).await;
        }
        if self.player.garbled {
            return Err(Error::protocol("status without playlistlength"));
        }
        Ok(PlayerStatus {
            state: self.player.state,
            song: self.player.song,
            playlist_length: self.player.queue_len,
            elapsed: self.player.elapsed,
        })
    }

    async fn playlist_info(&mut self, range: Range<usize>) -> Result<Vec<QueueItem>> {
        self.queries.lock().unwrap().push((self.port, range.clone()));
        if range.start >= range.end || range.end > self.player.queue_len {
            return Err(Error::Ack {
                code: 2,
                command: "playlistinfo".into(),
                message: "Bad song index".into(),
            });
        }
        Ok(range.map(fake_item).collect())
    }

    async fn playlist_item(&mut self, position: usize) -> Result<Option<QueueItem>> {
        Ok((position < self.player.queue_len).then(|| fake_item(position)))
    }

    async fn close(&mut self) {}
}
