//! Media folders served at random
//!
//! Folders are listed again on every request, so files dropped in or
//! removed are picked up without a restart.

use crate::error::{MediaError, Result};
use rand::seq::IndexedRandom;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Where the radio keeps its media
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    http_dir: PathBuf,
    music_dir: PathBuf,
}

impl MediaLibrary {
    pub fn new(http_dir: impl Into<PathBuf>, music_dir: impl Into<PathBuf>) -> Self {
        Self {
            http_dir: http_dir.into(),
            music_dir: music_dir.into(),
        }
    }

    pub fn http_dir(&self) -> &Path {
        &self.http_dir
    }

    pub fn music_dir(&self) -> &Path {
        &self.music_dir
    }

    pub fn backgrounds(&self) -> PathBuf {
        self.http_dir.join("backgrounds")
    }

    /// Jingles played between two songs
    pub fn transitions(&self) -> PathBuf {
        self.music_dir.join("transitions")
    }

    pub fn webms(&self) -> PathBuf {
        self.http_dir.join("webms")
    }

    pub fn uploads(&self) -> PathBuf {
        self.http_dir.join("upload")
    }

    pub fn not_found_page(&self) -> PathBuf {
        self.http_dir.join("404.html")
    }

    pub fn thank_you_page(&self) -> PathBuf {
        self.http_dir.join("thankyou.html")
    }
}

/// Sorted names of the visible regular files of `dir`
///
/// Dot files, sub-folders and names that are not UTF-8 are left out. A
/// missing folder has no files.
pub async fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        // follows symlinks, a dangling one is skipped
        if matches!(fs::metadata(entry.path()).await, Ok(meta) if meta.is_file()) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Picks one of the files of `dir` accepted by `keep`
pub async fn random_file_matching(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<String> {
    let names: Vec<String> = list_files(dir)
        .await?
        .into_iter()
        .filter(|name| keep(name))
        .collect();

    names
        .choose(&mut rand::rng())
        .cloned()
        .ok_or_else(|| MediaError::Empty(dir.to_path_buf()))
}

pub async fn random_file(dir: &Path) -> Result<String> {
    random_file_matching(dir, |_| true).await
}
