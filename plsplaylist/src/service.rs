//! PlaylistService : point d'entrée client du réacteur
//!
//! The handle is cheap to clone and `Send`; every call becomes one
//! [`Command`] for the reactor thread and awaits its single reply.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::Duration,
};

use plsreactor::{EventLoopBridge, WakeSignal};
use plssession::{PlaylistLink, Session, TrackLink};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    reactor::{Command, Reactor, Reply, Request, RequestId},
    settings::ServiceSettings,
    snapshot::{Collaborative, DiffPreview, PendingRequests, PlaylistSnapshot, UserPlaylists},
};

/// Longest accepted playlist title, in characters
pub const MAX_TITLE_LENGTH: usize = 255;

/// Client of the playlist reactor
#[derive(Clone)]
pub struct PlaylistService {
    commands: mpsc::Sender<Command>,
    cancels: mpsc::UnboundedSender<RequestId>,
    next_id: Arc<AtomicU64>,
    timeout: Duration,
}

/// Cancels the request on the reactor if the caller stops waiting.
///
/// The cancel channel is unbounded so that a full command queue never
/// loses a cancellation.
struct PendingCall<'a> {
    id: RequestId,
    cancels: &'a mpsc::UnboundedSender<RequestId>,
    armed: bool,
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if self.armed && self.cancels.send(self.id).is_err() {
            debug!(request = self.id, "reactor stopped, nothing to cancel");
        }
    }
}

impl PlaylistService {
    /// Starts the reactor thread and logs in.
    ///
    /// `login` runs on the reactor thread and receives the wake signal the
    /// session must use to report pending events.
    pub async fn start<S, F>(settings: ServiceSettings, login: F) -> Result<Self>
    where
        S: Session + 'static,
        F: FnOnce(WakeSignal) -> plssession::Result<S> + Send + 'static,
    {
        let (commands, commands_rx) = mpsc::channel(settings.command_capacity.max(1));
        let (cancels, cancels_rx) = mpsc::unbounded_channel();
        let (started_tx, started_rx) = oneshot::channel::<Result<()>>();
        let max_drain_rounds = settings.max_drain_rounds;
        let patch_policy = settings.patch_policy;

        thread::Builder::new()
            .name("pls-reactor".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = started_tx.send(Err(Error::Other(e.into())));
                        return;
                    }
                };

                runtime.block_on(async move {
                    let (bridge, wake) = EventLoopBridge::new(max_drain_rounds);
                    let session = match login(wake) {
                        Ok(session) => session,
                        Err(e) => {
                            let _ = started_tx.send(Err(e.into()));
                            return;
                        }
                    };
                    let _ = started_tx.send(Ok(()));
                    Reactor::new(session, bridge, patch_policy)
                        .run(commands_rx, cancels_rx)
                        .await;
                });
            })
            .map_err(|e| Error::Other(e.into()))?;

        started_rx.await.map_err(|_| Error::Shutdown)??;
        info!("✅ Playlist service started");

        Ok(Self {
            commands,
            cancels,
            next_id: Arc::new(AtomicU64::new(1)),
            timeout: settings.request_timeout,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        self.timeout
    }

    async fn call<T>(
        &self,
        timeout: Option<Duration>,
        request: impl FnOnce(Reply<T>) -> Request,
    ) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Request {
                id,
                request: request(reply),
            })
            .await
            .map_err(|_| Error::Shutdown)?;

        let mut guard = PendingCall {
            id,
            cancels: &self.cancels,
            armed: true,
        };
        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, response).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(request = id, ?limit, "request timed out, cancelling");
                    return Err(Error::Timeout(limit));
                }
            },
            None => response.await,
        };
        guard.armed = false;

        // Réponse abandonnée par le réacteur : il s'est arrêté
        outcome.map_err(|_| Error::Shutdown)?
    }

    async fn request<T>(&self, request: impl FnOnce(Reply<T>) -> Request) -> Result<T> {
        self.call(Some(self.timeout), request).await
    }

    /// Playlist `uri`, once loaded
    pub async fn get_playlist(&self, uri: &str) -> Result<PlaylistSnapshot> {
        let link = parse_playlist(uri)?;
        self.request(|reply| Request::Playlist { link, reply }).await
    }

    pub async fn collaborative(&self, uri: &str) -> Result<Collaborative> {
        let link = parse_playlist(uri)?;
        self.request(|reply| Request::Collaborative { link, reply })
            .await
    }

    /// Refreshes then returns the subscribers of a playlist.
    pub async fn subscribers(&self, uri: &str) -> Result<Vec<String>> {
        let link = parse_playlist(uri)?;
        self.request(|reply| Request::Subscribers { link, reply })
            .await
    }

    /// Creates a playlist in the session user's container.
    ///
    /// Titles longer than [`MAX_TITLE_LENGTH`] characters are truncated.
    pub async fn create_playlist(&self, title: &str) -> Result<PlaylistSnapshot> {
        if title.trim().is_empty() {
            return Err(Error::BadParameter("title is missing".into()));
        }
        let title: String = title.chars().take(MAX_TITLE_LENGTH).collect();
        self.request(|reply| Request::Create { title, reply }).await
    }

    /// Inserts tracks at `index`. Invalid URIs are skipped; an empty list
    /// leaves the playlist untouched.
    pub async fn add_tracks(
        &self,
        uri: &str,
        index: usize,
        track_uris: &[String],
    ) -> Result<PlaylistSnapshot> {
        let link = parse_playlist(uri)?;
        let tracks = valid_tracks(track_uris);
        if tracks.is_empty() && !track_uris.is_empty() {
            return Err(Error::NoValidTracks);
        }
        self.request(|reply| Request::AddTracks {
            link,
            index,
            tracks,
            reply,
        })
        .await
    }

    /// Removes `count` consecutive tracks starting at `index`.
    pub async fn remove_tracks(
        &self,
        uri: &str,
        index: usize,
        count: usize,
    ) -> Result<PlaylistSnapshot> {
        let link = parse_playlist(uri)?;
        if count == 0 {
            return Err(Error::BadParameter(
                "count must be numeric and positive".into(),
            ));
        }
        if index.checked_add(count).is_none() {
            return Err(Error::BadParameter("index out of range".into()));
        }
        self.request(|reply| Request::RemoveTracks {
            link,
            index,
            count,
            reply,
        })
        .await
    }

    /// Makes the playlist hold exactly the valid tracks of `track_uris`,
    /// with the fewest removals and insertions.
    ///
    /// Invalid URIs are dropped; when none is left the call is a no-op
    /// returning the current playlist. The reply comes once the backing
    /// service confirmed every mutation.
    pub async fn request_patch(&self, uri: &str, track_uris: &[String]) -> Result<PlaylistSnapshot> {
        let link = parse_playlist(uri)?;
        let tracks = valid_tracks(track_uris);
        self.request(|reply| Request::Patch {
            link,
            tracks,
            reply,
        })
        .await
    }

    /// Diff between the playlist and `track_uris`, without touching it.
    pub async fn preview_diff(&self, uri: &str, track_uris: &[String]) -> Result<DiffPreview> {
        let link = parse_playlist(uri)?;
        let tracks = valid_tracks(track_uris);
        self.request(|reply| Request::Diff {
            link,
            tracks,
            reply,
        })
        .await
    }

    /// Published playlists of `user`; see [`UserPlaylists::partial`].
    pub async fn user_playlists(&self, user: &str) -> Result<UserPlaylists> {
        let user = user.to_string();
        self.request(|reply| Request::UserPlaylists { user, reply })
            .await
    }

    pub async fn starred(&self, user: &str) -> Result<PlaylistSnapshot> {
        let user = user.to_string();
        self.request(|reply| Request::Starred { user, reply }).await
    }

    /// Posts tracks to the inbox of `user`, answering once delivered.
    ///
    /// Invalid URIs are skipped. An empty list succeeds without posting.
    pub async fn post_inbox(&self, user: &str, track_uris: &[String], message: &str) -> Result<()> {
        if track_uris.is_empty() {
            return Ok(());
        }
        let tracks = valid_tracks(track_uris);
        if tracks.is_empty() {
            return Err(Error::NoValidTracks);
        }
        let user = user.to_string();
        let message = message.to_string();
        self.request(|reply| Request::PostInbox {
            user,
            tracks,
            message,
            reply,
        })
        .await
    }

    /// Waits, without timeout, until the session user's container loaded.
    pub async fn wait_until_ready(&self) -> Result<()> {
        self.call(None, |reply| Request::Ready { reply }).await
    }

    /// Requests parked on the reactor and continuations it holds.
    pub async fn pending_requests(&self) -> Result<PendingRequests> {
        self.request(|reply| Request::Pending { reply }).await
    }

    /// Logs the session out and stops the reactor. Waiting requests fail
    /// with [`Error::Shutdown`].
    pub async fn shutdown(&self) -> Result<()> {
        let (done, stopped) = oneshot::channel();
        if self.commands.send(Command::Shutdown(done)).await.is_err() {
            debug!("reactor already stopped");
            return Ok(());
        }
        stopped.await.map_err(|_| Error::Shutdown)
    }
}

fn parse_playlist(uri: &str) -> Result<PlaylistLink> {
    PlaylistLink::parse(uri).map_err(|_| Error::InvalidLink(uri.to_string()))
}

fn valid_tracks(uris: &[String]) -> Vec<TrackLink> {
    uris.iter()
        .filter_map(|uri| match TrackLink::parse(uri) {
            Ok(track) => Some(track),
            Err(_) => {
                debug!(uri = %uri, "skipping invalid track");
                None
            }
        })
        .collect()
}
