//! Playlist window aggregation
//!
//! A window is the slice of a channel's queue around the current song:
//! up to `before` songs already played, the current song, and up to `after`
//! upcoming songs. Both sides are clamped to the real queue bounds before
//! anything is asked to the player.

use crate::error::WindowError;
use crate::registry::Channel;
use radiompd::{PlayerConnector, PlayerSession, QueueItem};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Public projection of one queue item
///
/// Only these tags leave the backend; absent tags are omitted from the JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub albumartist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    /// Duration in whole seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl TrackEntry {
    pub fn from_item(item: &QueueItem) -> Self {
        let tag = |name: &str| item.get(name).map(String::from);
        let time = tag("time").or_else(|| {
            item.get("duration")
                .and_then(|d| d.parse::<f64>().ok())
                .filter(|d| d.is_finite() && *d >= 0.0)
                .map(|d| format!("{}", d.round() as u64))
        });

        Self {
            artist: tag("artist"),
            albumartist: tag("albumartist"),
            album: tag("album"),
            track: tag("track"),
            time,
            date: tag("date"),
            title: tag("title"),
        }
    }
}

/// What `/playlist/<channel>.json` returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistWindow {
    /// Played songs, oldest first, ending right before `current`
    pub before: Vec<TrackEntry>,
    pub current: TrackEntry,
    /// Upcoming songs in queue order
    pub after: Vec<TrackEntry>,
    /// Seconds into the current song
    pub elapsed: f64,
}

/// Computes the window of `channel` with one short-lived session
///
/// The session is closed whatever the outcome.
pub async fn build_window<C: PlayerConnector>(
    connector: &C,
    channel: &Channel,
    before: usize,
    after: usize,
) -> Result<PlaylistWindow, WindowError> {
    let mut session = connector
        .connect(&channel.endpoint)
        .await
        .map_err(|e| WindowError::from_player(&channel.name, e))?;

    let window = fetch_window(&mut session, channel, before, after).await;
    session.close().await;
    window
}

async fn fetch_window<S: PlayerSession>(
    session: &mut S,
    channel: &Channel,
    before: usize,
    after: usize,
) -> Result<PlaylistWindow, WindowError> {
    let player_err = |e| WindowError::from_player(&channel.name, e);

    let status = session.status().await.map_err(player_err)?;
    let queue_len = status.playlist_length;
    let index = status
        .song
        .filter(|&song| song < queue_len)
        .ok_or_else(|| WindowError::no_current_track(&channel.name))?;

    let position = index as i64;
    let before_count = i64::try_from(before).unwrap_or(i64::MAX);
    let after_count = i64::try_from(after).unwrap_or(i64::MAX);

    // playlistinfo answers in ascending position order: oldest first already
    let played = session
        .queue_range(position.saturating_sub(before_count), position, queue_len)
        .await
        .map_err(player_err)?;

    let current = session
        .playlist_item(index)
        .await
        .map_err(player_err)?
        .ok_or_else(|| WindowError::no_current_track(&channel.name))?;

    let upcoming = session
        .queue_range(
            position + 1,
            (position + 1).saturating_add(after_count),
            queue_len,
        )
        .await
        .map_err(player_err)?;

    debug!(
        channel = %channel.name,
        index,
        queue_len,
        before = played.len(),
        after = upcoming.len(),
        "playlist window fetched"
    );

    Ok(PlaylistWindow {
        before: played.iter().map(TrackEntry::from_item).collect(),
        current: TrackEntry::from_item(&current),
        after: upcoming.iter().map(TrackEntry::from_item).collect(),
        elapsed: status.elapsed.max(0.0),
    })
}
