//! Types d'erreurs pour plsplaylist

use std::time::Duration;

use plsdiff::ReconcileError;
use plssession::SessionError;

/// Erreurs des opérations sur les playlists
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Playlist not found: {0}")]
    NotFound(String),

    #[error("Invalid link: {0}")]
    InvalidLink(String),

    #[error("No valid tracks")]
    NoValidTracks,

    #[error("Bad parameter: {0}")]
    BadParameter(String),

    #[error("Changes already in flight for playlist: {0}")]
    PatchInFlight(String),

    /// The patch stopped at a rejected mutation. The `applied` mutations
    /// before it stay in place: re-read the playlist.
    #[error("Could not apply diff after {applied} mutation(s): {source}")]
    PatchFailed {
        applied: usize,
        #[source]
        source: SessionError,
    },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Playlist service is shut down")]
    Shutdown,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ReconcileError<SessionError>> for Error {
    fn from(err: ReconcileError<SessionError>) -> Self {
        match err {
            ReconcileError::Rejected {
                applied, source, ..
            } => Error::PatchFailed { applied, source },
            other => Error::Other(anyhow::Error::new(other)),
        }
    }
}

/// Type Result spécialisé pour plsplaylist
pub type Result<T> = std::result::Result<T, Error>;
