//! Réacteur des playlists
//!
//! One thread owns the [`Session`] and the continuation registry. Clients
//! send [`Command`]s over a bounded channel and cancellations over an
//! unbounded one; every request is answered exactly once on its oneshot
//! channel, either at once or from the continuation fired when the session
//! reports the awaited state.

use std::{collections::HashMap, ops::ControlFlow};

use plsdiff::{
    AppliedPlan, CollectionStream, OrderedCollection, UnifiedOptions, diff, reconcile, unified,
};
use plsreactor::{
    ContinuationHandle, ContinuationRegistry, EventLoopBridge, Readiness, Registration,
};
use plssession::{Condition, Playlist, PlaylistLink, ResourceKey, Session, SessionEvent, TrackLink};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::{
    error::{Error, Result},
    settings::PatchPolicy,
    snapshot::{Collaborative, DiffPreview, PendingRequests, PlaylistSnapshot, UserPlaylists},
};

pub(crate) type RequestId = u64;
pub(crate) type Reply<T> = oneshot::Sender<Result<T>>;

pub(crate) enum Command {
    Request { id: RequestId, request: Request },
    Shutdown(oneshot::Sender<()>),
}

pub(crate) enum Request {
    Playlist {
        link: PlaylistLink,
        reply: Reply<PlaylistSnapshot>,
    },
    Collaborative {
        link: PlaylistLink,
        reply: Reply<Collaborative>,
    },
    Subscribers {
        link: PlaylistLink,
        reply: Reply<Vec<String>>,
    },
    Create {
        title: String,
        reply: Reply<PlaylistSnapshot>,
    },
    AddTracks {
        link: PlaylistLink,
        index: usize,
        tracks: Vec<TrackLink>,
        reply: Reply<PlaylistSnapshot>,
    },
    RemoveTracks {
        link: PlaylistLink,
        index: usize,
        count: usize,
        reply: Reply<PlaylistSnapshot>,
    },
    Patch {
        link: PlaylistLink,
        tracks: Vec<TrackLink>,
        reply: Reply<PlaylistSnapshot>,
    },
    Diff {
        link: PlaylistLink,
        tracks: Vec<TrackLink>,
        reply: Reply<DiffPreview>,
    },
    UserPlaylists {
        user: String,
        reply: Reply<UserPlaylists>,
    },
    Starred {
        user: String,
        reply: Reply<PlaylistSnapshot>,
    },
    /// Answered once the post reached the recipient's inbox
    PostInbox {
        user: String,
        tracks: Vec<TrackLink>,
        message: String,
        reply: Reply<()>,
    },
    /// Answered once the session user's own container is loaded
    Ready { reply: Reply<()> },
    Pending { reply: Reply<PendingRequests> },
}

impl Request {
    fn name(&self) -> &'static str {
        match self {
            Request::Playlist { .. } => "playlist",
            Request::Collaborative { .. } => "collaborative",
            Request::Subscribers { .. } => "subscribers",
            Request::Create { .. } => "create",
            Request::AddTracks { .. } => "add",
            Request::RemoveTracks { .. } => "remove",
            Request::Patch { .. } => "patch",
            Request::Diff { .. } => "diff",
            Request::UserPlaylists { .. } => "user_playlists",
            Request::Starred { .. } => "starred",
            Request::PostInbox { .. } => "inbox",
            Request::Ready { .. } => "ready",
            Request::Pending { .. } => "pending",
        }
    }
}

fn send<T>(reply: Reply<T>, result: Result<T>) {
    if reply.send(result).is_err() {
        debug!("requester gone before the reply");
    }
}

enum Edit {
    Insert { index: usize, tracks: Vec<TrackLink> },
    Remove { indices: Vec<usize> },
}

impl Edit {
    fn is_empty(&self) -> bool {
        match self {
            Edit::Insert { tracks, .. } => tracks.is_empty(),
            Edit::Remove { indices } => indices.is_empty(),
        }
    }
}

/// Context handed to every continuation
pub(crate) struct Core<S> {
    session: S,
    /// Continuation currently awaited by each request
    pending: HashMap<RequestId, ContinuationHandle>,
    patch_policy: PatchPolicy,
}

impl<S: Session> Readiness for Core<S> {
    type Key = ResourceKey;
    type Condition = Condition;

    fn is_ready(&self, key: &ResourceKey, condition: Condition) -> bool {
        self.session.is_ready(key, condition)
    }
}

type Registry<S> = ContinuationRegistry<Core<S>>;

impl<S: Session + 'static> Core<S> {
    /// Runs `then` once `key` satisfies `condition`; while it waits, the
    /// continuation can be cancelled under `id`.
    fn when<F>(
        &mut self,
        registry: &mut Registry<S>,
        id: RequestId,
        key: ResourceKey,
        condition: Condition,
        then: F,
    ) where
        F: FnOnce(&mut Core<S>, &mut Registry<S>) + 'static,
    {
        let registration = registry.register(self, key, condition, move |core, registry| {
            core.pending.remove(&id);
            then(core, registry);
        });
        if let Registration::Pending(handle) = registration {
            self.pending.insert(id, handle);
        }
    }

    fn loaded(&self, link: &PlaylistLink) -> Result<&Playlist> {
        self.session
            .playlist(link)
            .ok_or_else(|| Error::NotFound(link.to_string()))
    }

    fn snapshot(&self, link: &PlaylistLink) -> Result<PlaylistSnapshot> {
        self.loaded(link).map(PlaylistSnapshot::from)
    }

    fn handle(&mut self, registry: &mut Registry<S>, id: RequestId, request: Request) {
        match request {
            Request::Playlist { link, reply } => {
                self.answer_loaded(registry, id, link, reply, |core, link| core.snapshot(link))
            }
            Request::Collaborative { link, reply } => {
                self.answer_loaded(registry, id, link, reply, |core, link| {
                    core.loaded(link).map(|p| Collaborative {
                        collaborative: p.collaborative,
                    })
                })
            }
            Request::Subscribers { link, reply } => self.subscribers(registry, id, link, reply),
            Request::Create { title, reply } => match self.session.create_playlist(&title) {
                Ok(link) => {
                    self.answer_loaded(registry, id, link, reply, |core, link| core.snapshot(link))
                }
                Err(err) => send(reply, Err(err.into())),
            },
            Request::AddTracks {
                link,
                index,
                tracks,
                reply,
            } => self.mutate(registry, id, link, Edit::Insert { index, tracks }, reply),
            Request::RemoveTracks {
                link,
                index,
                count,
                reply,
            } => {
                let indices = (index..index.saturating_add(count)).collect();
                self.mutate(registry, id, link, Edit::Remove { indices }, reply)
            }
            Request::Patch {
                link,
                tracks,
                reply,
            } => {
                if let Err(err) = self.session.open_playlist(&link) {
                    return send(reply, Err(err.into()));
                }
                let key = ResourceKey::Playlist(link.clone());
                self.when(registry, id, key, Condition::Loaded, move |core, registry| {
                    core.try_patch(registry, id, link, tracks, reply)
                });
            }
            Request::Diff {
                link,
                tracks,
                reply,
            } => self.answer_loaded(registry, id, link, reply, move |core, link| {
                let playlist = core.loaded(link)?;
                let hunks = diff(&playlist.tracks, &tracks);
                let text = unified(&hunks, &playlist.tracks, &tracks, &UnifiedOptions::default());
                Ok(DiffPreview {
                    hunks,
                    unified: text,
                })
            }),
            Request::UserPlaylists { user, reply } => self.user_playlists(registry, id, user, reply),
            Request::Starred { user, reply } => match self.session.starred(&user) {
                Ok(link) => {
                    self.answer_loaded(registry, id, link, reply, |core, link| core.snapshot(link))
                }
                Err(err) => send(reply, Err(err.into())),
            },
            Request::PostInbox {
                user,
                tracks,
                message,
                reply,
            } => match self.session.post_inbox(&user, tracks, &message) {
                Ok(key) => self.when(registry, id, key, Condition::Delivered, move |_, _| {
                    send(reply, Ok(()))
                }),
                Err(err) => {
                    debug!(request = id, user = %user, "inbox post refused: {}", err);
                    send(reply, Err(err.into()))
                }
            },
            Request::Ready { reply } => {
                let key = ResourceKey::Container(self.session.user().to_string());
                self.when(registry, id, key, Condition::Loaded, move |_, _| {
                    send(reply, Ok(()))
                });
            }
            Request::Pending { reply } => send(
                reply,
                Ok(PendingRequests {
                    requests: self.pending.len(),
                    continuations: registry.pending_count(),
                }),
            ),
        }
    }

    /// Opens `link` and answers with `render` once it is loaded.
    fn answer_loaded<T, R>(
        &mut self,
        registry: &mut Registry<S>,
        id: RequestId,
        link: PlaylistLink,
        reply: Reply<T>,
        render: R,
    ) where
        T: 'static,
        R: FnOnce(&Core<S>, &PlaylistLink) -> Result<T> + 'static,
    {
        if let Err(err) = self.session.open_playlist(&link) {
            return send(reply, Err(err.into()));
        }
        let key = ResourceKey::Playlist(link.clone());
        self.when(registry, id, key, Condition::Loaded, move |core, _| {
            send(reply, render(core, &link))
        });
    }

    /// Answers with the playlist once every mutation issued on it settled.
    fn answer_settled(
        &mut self,
        registry: &mut Registry<S>,
        id: RequestId,
        link: PlaylistLink,
        reply: Reply<PlaylistSnapshot>,
    ) {
        let key = ResourceKey::Playlist(link.clone());
        self.when(registry, id, key, Condition::UpdateSettled, move |core, _| {
            send(reply, core.snapshot(&link))
        });
    }

    fn subscribers(
        &mut self,
        registry: &mut Registry<S>,
        id: RequestId,
        link: PlaylistLink,
        reply: Reply<Vec<String>>,
    ) {
        if let Err(err) = self.session.open_playlist(&link) {
            return send(reply, Err(err.into()));
        }
        let key = ResourceKey::Playlist(link.clone());
        self.when(registry, id, key.clone(), Condition::Loaded, move |core, registry| {
            if let Err(err) = core.session.request_subscribers(&link) {
                return send(reply, Err(err.into()));
            }
            core.when(registry, id, key, Condition::SubscribersUpdated, move |core, _| {
                send(reply, core.loaded(&link).map(|p| p.subscribers.clone()))
            });
        });
    }

    fn mutate(
        &mut self,
        registry: &mut Registry<S>,
        id: RequestId,
        link: PlaylistLink,
        edit: Edit,
        reply: Reply<PlaylistSnapshot>,
    ) {
        if let Err(err) = self.session.open_playlist(&link) {
            return send(reply, Err(err.into()));
        }
        let key = ResourceKey::Playlist(link.clone());
        self.when(registry, id, key, Condition::Loaded, move |core, registry| {
            if edit.is_empty() {
                return send(reply, core.snapshot(&link));
            }
            match core.apply_edit(&link, edit) {
                Ok(()) => core.answer_settled(registry, id, link, reply),
                Err(err) => {
                    debug!(request = id, playlist = %link, "edit rejected: {}", err);
                    send(reply, Err(err.into()))
                }
            }
        });
    }

    fn apply_edit(&mut self, link: &PlaylistLink, edit: Edit) -> plssession::Result<()> {
        let mut editor = self.session.playlist_mut(link)?;
        match edit {
            Edit::Insert { index, tracks } => editor.insert_at(index, tracks),
            Edit::Remove { indices } => editor.remove_at(&indices),
        }
    }

    /// Applies a patch on a loaded playlist, or defers it per the patch
    /// policy while earlier changes are still in flight.
    fn try_patch(
        &mut self,
        registry: &mut Registry<S>,
        id: RequestId,
        link: PlaylistLink,
        tracks: Vec<TrackLink>,
        reply: Reply<PlaylistSnapshot>,
    ) {
        if tracks.is_empty() {
            return send(reply, self.snapshot(&link));
        }

        let key = ResourceKey::Playlist(link.clone());
        if !self.session.is_ready(&key, Condition::UpdateSettled) {
            match self.patch_policy {
                PatchPolicy::Reject => {
                    debug!(request = id, playlist = %link, "patch rejected, changes in flight");
                    return send(reply, Err(Error::PatchInFlight(link.to_string())));
                }
                PatchPolicy::Queue => {
                    debug!(request = id, playlist = %link, "patch queued behind pending changes");
                    self.when(registry, id, key, Condition::UpdateSettled, move |core, registry| {
                        core.try_patch(registry, id, link, tracks, reply)
                    });
                    return;
                }
            }
        }

        match self.reconcile_tracks(&link, &tracks) {
            Ok(applied) => {
                info!(
                    request = id,
                    playlist = %link,
                    mutations = applied.mutations,
                    removed = applied.removed,
                    inserted = applied.inserted,
                    "🔀 Playlist patched"
                );
                self.answer_settled(registry, id, link, reply);
            }
            Err(err) => {
                warn!(request = id, playlist = %link, "patch failed: {}", err);
                send(reply, Err(err));
            }
        }
    }

    fn reconcile_tracks(&mut self, link: &PlaylistLink, tracks: &[TrackLink]) -> Result<AppliedPlan> {
        let mut editor = self.session.playlist_mut(link)?;
        let hunks = diff(CollectionStream::new(&editor), tracks);
        Ok(reconcile(&mut editor, &hunks, tracks)?)
    }

    fn user_playlists(
        &mut self,
        registry: &mut Registry<S>,
        id: RequestId,
        user: String,
        reply: Reply<UserPlaylists>,
    ) {
        if let Err(err) = self.session.published_container(&user) {
            return send(reply, Err(err.into()));
        }
        let key = ResourceKey::Container(user.clone());
        self.when(registry, id, key, Condition::Loaded, move |core, _| {
            let mut listing = UserPlaylists {
                playlists: Vec::new(),
                partial: false,
            };
            for link in core.session.container_playlists(&user) {
                match core.session.playlist(&link) {
                    Some(playlist) => listing.playlists.push(PlaylistSnapshot::from(playlist)),
                    None => {
                        listing.partial = true;
                        if let Err(err) = core.session.open_playlist(&link) {
                            debug!(playlist = %link, "cannot open container playlist: {}", err);
                        }
                    }
                }
            }
            send(reply, Ok(listing));
        });
    }
}

pub(crate) struct Reactor<S: Session> {
    core: Core<S>,
    registry: Registry<S>,
    bridge: EventLoopBridge,
    events: Vec<SessionEvent>,
}

impl<S: Session + 'static> Reactor<S> {
    pub(crate) fn new(session: S, bridge: EventLoopBridge, patch_policy: PatchPolicy) -> Self {
        Self {
            core: Core {
                session,
                pending: HashMap::new(),
                patch_policy,
            },
            registry: ContinuationRegistry::new(),
            bridge,
            events: Vec::new(),
        }
    }

    /// Serves commands, cancellations and session events until shutdown or
    /// until every client is gone.
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut cancels: mpsc::UnboundedReceiver<RequestId>,
    ) {
        info!(user = self.core.session.user(), policy = %self.core.patch_policy, "🎛️ Playlist reactor started");
        self.pump();

        loop {
            let flow = tokio::select! {
                command = commands.recv() => self.dispatch(command),
                Some(id) = cancels.recv() => {
                    // La requête annulée peut encore attendre dans la file
                    let mut flow = ControlFlow::Continue(());
                    while flow.is_continue() {
                        match commands.try_recv() {
                            Ok(command) => flow = self.dispatch(Some(command)),
                            Err(_) => break,
                        }
                    }
                    self.cancel(id);
                    flow
                }
                wake = self.bridge.wait() => {
                    trace!(?wake, "reactor woken");
                    self.pump();
                    ControlFlow::Continue(())
                }
            };
            if flow.is_break() {
                break;
            }
        }
        info!("Playlist reactor stopped");
    }

    fn dispatch(&mut self, command: Option<Command>) -> ControlFlow<()> {
        match command {
            Some(Command::Request { id, request }) => {
                trace!(request = id, kind = request.name(), "request received");
                self.core.handle(&mut self.registry, id, request);
                ControlFlow::Continue(())
            }
            Some(Command::Shutdown(done)) => {
                self.shutdown();
                let _ = done.send(());
                ControlFlow::Break(())
            }
            None => {
                self.shutdown();
                ControlFlow::Break(())
            }
        }
    }

    /// Drains the session and dispatches what it reported.
    fn pump(&mut self) {
        self.bridge.drain(&mut self.core.session, &mut self.events);
        for event in self.events.drain(..) {
            let fired = self
                .registry
                .notify(&mut self.core, &event.key, event.condition);
            trace!(key = %event.key, condition = ?event.condition, fired, "session event dispatched");
        }
    }

    fn cancel(&mut self, id: RequestId) {
        let Some(handle) = self.core.pending.remove(&id) else {
            trace!(request = id, "nothing left to cancel");
            return;
        };
        match self.registry.cancel(&handle) {
            Ok(()) => debug!(request = id, "request cancelled"),
            Err(err) => warn!(request = id, "cannot cancel request: {}", err),
        }
    }

    fn shutdown(&mut self) {
        let dropped = self.registry.clear();
        self.core.pending.clear();
        self.core.session.logout();
        info!(dropped, "Playlist service shut down");
    }
}
