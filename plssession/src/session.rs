use plsdiff::OrderedCollection;
use plsreactor::EventProcessor;

use crate::{
    error::Result,
    link::{PlaylistLink, TrackLink},
    model::{Condition, Playlist, ResourceKey, SessionEvent},
};

/// Backing playlist service driven by the reactor.
///
/// Loads and commits complete asynchronously: the service reports them as
/// [`SessionEvent`]s from [`EventProcessor::process_events`], after waking
/// the reactor through its wake signal.
pub trait Session: EventProcessor<Notification = SessionEvent> {
    /// Mutable view of a loaded playlist
    type Editor<'a>: OrderedCollection<Token = TrackLink, Error = crate::SessionError>
    where
        Self: 'a;

    /// Logged-in user
    fn user(&self) -> &str;

    fn is_ready(&self, key: &ResourceKey, condition: Condition) -> bool;

    /// Starts loading a playlist; `Loaded` is reported once it is available.
    fn open_playlist(&mut self, link: &PlaylistLink) -> Result<()>;

    /// Loaded playlist, `None` while it is still loading
    fn playlist(&self, link: &PlaylistLink) -> Option<&Playlist>;

    fn playlist_mut(&mut self, link: &PlaylistLink) -> Result<Self::Editor<'_>>;

    /// Creates a playlist owned by the session user, in their container.
    fn create_playlist(&mut self, title: &str) -> Result<PlaylistLink>;

    /// Opens the starred playlist of `user`.
    fn starred(&mut self, user: &str) -> Result<PlaylistLink>;

    /// Starts loading the published container of `user`.
    fn published_container(&mut self, user: &str) -> Result<()>;

    /// Playlists of a loaded container, in container order
    fn container_playlists(&self, user: &str) -> Vec<PlaylistLink>;

    /// Asks for fresh subscribers; `SubscribersUpdated` follows.
    fn request_subscribers(&mut self, link: &PlaylistLink) -> Result<()>;

    /// Posts tracks to the inbox of `user`. `Delivered` is reported on the
    /// returned key once the recipient got them.
    fn post_inbox(&mut self, user: &str, tracks: Vec<TrackLink>, message: &str) -> Result<ResourceKey>;

    fn logout(&mut self);

    fn is_logged_out(&self) -> bool;
}
