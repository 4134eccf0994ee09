//! Types d'erreurs pour plssession

/// Erreurs du service de playlists sous-jacent
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid link: {0}")]
    InvalidLink(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Resource not loaded yet: {0}")]
    NotLoaded(String),

    #[error("Permission denied on {0}")]
    PermissionDenied(String),

    #[error("Playlist cannot hold more than {limit} tracks")]
    CapacityExceeded { limit: usize },

    #[error("Index {index} out of range for {len} tracks")]
    InvalidIndex { index: usize, len: usize },

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Session is logged out")]
    LoggedOut,

    #[error("Catalog error: {0}")]
    Catalog(String),
}

/// Type Result spécialisé pour plssession
pub type Result<T> = std::result::Result<T, SessionError>;
