//! Session traits shared by the MPD client and its consumers
//!
//! `PlayerConnector` opens sessions, `PlayerSession` runs the queries. The
//! playlist aggregator only depends on these two traits.

use crate::error::Result;
use crate::models::{Endpoint, PlayerStatus, QueueItem};
use async_trait::async_trait;
use std::ops::Range;

/// Clamps `[from, to)` into `[0, queue_len]`
///
/// Returns `None` when nothing is left to query once both bounds are clamped.
///
/// ```
/// use radiompd::clamp_range;
///
/// assert_eq!(clamp_range(-3, 2, 20), Some(0..2));
/// assert_eq!(clamp_range(18, 24, 20), Some(18..20));
/// assert_eq!(clamp_range(21, 26, 20), None);
/// ```
pub fn clamp_range(from: i64, to: i64, queue_len: usize) -> Option<Range<usize>> {
    let len = i64::try_from(queue_len).unwrap_or(i64::MAX);
    let start = from.clamp(0, len);
    let end = to.clamp(0, len);
    if start < end {
        Some(start as usize..end as usize)
    } else {
        None
    }
}

/// Opens sessions against player endpoints
#[async_trait]
pub trait PlayerConnector: Send + Sync + 'static {
    type Session: PlayerSession + 'static;

    /// Establishes a session; refused or timed out connections are
    /// connection errors (see `Error::is_connection`)
    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Session>;
}

/// One open session to a player
#[async_trait]
pub trait PlayerSession: Send {
    async fn status(&mut self) -> Result<PlayerStatus>;

    /// Queue items in `range`, in ascending position order
    ///
    /// Callers go through `queue_range`, which guarantees
    /// `range.start < range.end <= queue length`.
    async fn playlist_info(&mut self, range: Range<usize>) -> Result<Vec<QueueItem>>;

    /// Queue item at `position`, `None` if the position does not exist
    async fn playlist_item(&mut self, position: usize) -> Result<Option<QueueItem>>;

    /// Ends the session. Best-effort: failures are ignored.
    async fn close(&mut self);

    /// Queue items in `[from, to)` after clamping both bounds into
    /// `[0, queue_len]`; an empty clamped range issues no query
    async fn queue_range(
        &mut self,
        from: i64,
        to: i64,
        queue_len: usize,
    ) -> Result<Vec<QueueItem>> {
        match clamp_range(from, to, queue_len) {
            Some(range) => self.playlist_info(range).await,
            None => Ok(Vec::new()),
        }
    }
}
