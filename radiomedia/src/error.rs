//! Error types of the media routes

use std::path::PathBuf;

/// Result type alias for media operations
pub type Result<T> = std::result::Result<T, MediaError>;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// Nothing to pick from; a missing folder counts as empty
    #[error("No media in {}", .0.display())]
    Empty(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
