//! Bump submissions
//!
//! A listener sends a bump as a file, a link, or both. Each part lands in
//! the upload folder as `<stamp>-file` or `<stamp>-url`, where the stamp is
//! the submission time in seconds since the epoch with microseconds.

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// What a listener submitted
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Bump {
    /// Content of the uploaded file, set only when a file name was given
    pub file: Option<Vec<u8>>,
    pub url: Option<String>,
}

impl Bump {
    pub fn is_empty(&self) -> bool {
        self.file.is_none() && self.url.as_deref().is_none_or(str::is_empty)
    }
}

/// `1718000000.123456` for a submission at that instant
pub fn bump_stem(at: DateTime<Utc>) -> String {
    format!("{}.{:06}", at.timestamp(), at.timestamp_subsec_micros())
}

/// Writes the parts of `bump` into `dir` and returns the created paths
///
/// An empty link is not written.
pub async fn store_bump(dir: &Path, stem: &str, bump: &Bump) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    if bump.is_empty() {
        return Ok(written);
    }
    fs::create_dir_all(dir).await?;

    if let Some(content) = &bump.file {
        let path = dir.join(format!("{}-file", stem));
        fs::write(&path, content).await?;
        written.push(path);
    }
    if let Some(url) = bump.url.as_deref().filter(|url| !url.is_empty()) {
        let path = dir.join(format!("{}-url", stem));
        fs::write(&path, url).await?;
        written.push(path);
    }

    info!(stem, parts = written.len(), "bump stored");
    Ok(written)
}
