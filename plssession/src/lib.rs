//! # plssession - Service de playlists sous-jacent
//!
//! Contract of the backing playlist service ([`Session`]) and an in-memory
//! implementation ([`MemorySession`]) whose loads and commits complete on a
//! background worker thread.
//!
//! The reactor drives a session through [`plsreactor::EventProcessor`]:
//! the worker wakes it with a [`plsreactor::WakeSignal`], the reactor calls
//! `process_events` and receives [`SessionEvent`]s describing which
//! resources changed state.

mod error;
mod link;
mod memory;
mod model;
mod session;

pub use error::{Result, SessionError};
pub use link::{PlaylistLink, TrackLink};
pub use memory::{Catalog, MemoryEditor, MemorySession, MemorySettings};
pub use model::{Condition, InboxItem, Playlist, ResourceKey, SessionEvent};
pub use session::Session;
