//! Error types for the user directory

/// Result type alias for directory operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("User \"{0}\" already exists")]
    UserExists(String),

    #[error("User \"{0}\" does not exist")]
    UnknownUser(String),

    /// The superadmin can be neither banned nor demoted
    #[error("Cannot change the {flag} flag of \"{user}\"")]
    ProtectedUser { user: String, flag: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid user database: {0}")]
    Json(#[from] serde_json::Error),

    /// The directory task is gone
    #[error("User directory is closed")]
    Closed,
}
