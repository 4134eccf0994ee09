//! # plsplaylist - Service de playlists au-dessus d'une session
//!
//! Cette crate expose les playlists d'une [`plssession::Session`] à des
//! clients asynchrones :
//! - Un réacteur mono-thread possède la session et répond aux requêtes
//!   quand la ressource visée atteint l'état attendu
//! - Un [`PlaylistService`] clonable envoie les requêtes et attend leur réponse
//! - `request_patch` aligne une playlist sur une liste de morceaux via `plsdiff`
//! - Une API REST optionnelle (feature `server`)
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use plsplaylist::{PlaylistService, ServiceSettings};
//! use plssession::{Catalog, MemorySession, MemorySettings};
//!
//! # #[tokio::main]
//! # async fn main() -> plsplaylist::Result<()> {
//! let service = PlaylistService::start(ServiceSettings::default(), |wake| {
//!     MemorySession::login("alice", "secret", MemorySettings::default(), Catalog::default(), wake)
//! })
//! .await?;
//! service.wait_until_ready().await?;
//!
//! let tracks = vec!["spotify:track:a1".to_string(), "spotify:track:b2".to_string()];
//! let playlist = service
//!     .request_patch("spotify:user:alice:playlist:mix", &tracks)
//!     .await?;
//! println!("{} morceaux", playlist.tracks.len());
//!
//! service.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod reactor;
mod service;
mod settings;
mod snapshot;

#[cfg(feature = "plsconfig")]
mod config_ext;

#[cfg(feature = "server")]
pub mod api;
#[cfg(feature = "server")]
pub mod openapi;

// Réexports publics
pub use error::{Error, Result};
pub use service::{MAX_TITLE_LENGTH, PlaylistService};
pub use settings::{PatchPolicy, ServiceSettings};
pub use snapshot::{Collaborative, DiffPreview, PendingRequests, PlaylistSnapshot, UserPlaylists};

#[cfg(feature = "plsconfig")]
pub use config_ext::PlaylistConfigExt;
