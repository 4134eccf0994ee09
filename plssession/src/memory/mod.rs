//! Session en mémoire
//!
//! [`MemorySession`] keeps a catalog of playlists and containers in memory
//! and routes every load and commit through a background worker thread, so
//! readiness changes arrive asynchronously exactly like they would from a
//! remote service. The catalog can be persisted as JSON.

mod editor;
mod worker;

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
    thread::JoinHandle,
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, unbounded};
use plsreactor::{EventProcessor, WakeSignal};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use editor::MemoryEditor;
use worker::{Completion, Job, Worker};

use crate::{
    error::{Result, SessionError},
    link::{PlaylistLink, TrackLink},
    model::{Condition, InboxItem, Playlist, ResourceKey, SessionEvent},
    session::Session,
};

const STARRED_TITLE: &str = "Starred";

/// Réglages de la session mémoire
#[derive(Debug, Clone)]
pub struct MemorySettings {
    pub user_agent: String,
    /// Catalog loaded at login and written back at logout
    pub catalog_path: Option<PathBuf>,
    pub load_latency: Duration,
    pub commit_latency: Duration,
    /// Delay reported by `process_events` when nothing is queued
    pub poll_interval: Duration,
    /// Completions handled per `process_events` call
    pub process_batch_size: usize,
    pub max_playlist_tracks: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            user_agent: "plsserver".to_string(),
            catalog_path: None,
            load_latency: Duration::from_millis(20),
            commit_latency: Duration::from_millis(20),
            poll_interval: Duration::from_secs(1),
            process_batch_size: 16,
            max_playlist_tracks: 10_000,
        }
    }
}

/// Serialisable content of a memory session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub playlists: Vec<Playlist>,
    /// Published containers, keyed by user
    #[serde(default)]
    pub containers: BTreeMap<String, Vec<PlaylistLink>>,
    /// Delivered inbox posts, keyed by recipient
    #[serde(default)]
    pub inboxes: BTreeMap<String, Vec<InboxItem>>,
}

impl Catalog {
    /// Reads a catalog file; a missing file yields an empty catalog.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(data) => serde_json::from_slice(&data)
                .map_err(|e| SessionError::Catalog(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(SessionError::Catalog(format!("{}: {}", path.display(), e))),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| SessionError::Catalog(e.to_string()))?;
        fs::write(path, json).map_err(|e| SessionError::Catalog(format!("{}: {}", path.display(), e)))
    }

    pub fn with_playlist(mut self, playlist: Playlist) -> Self {
        self.playlists.push(playlist);
        self
    }

    pub fn with_container(mut self, user: impl Into<String>, playlists: Vec<PlaylistLink>) -> Self {
        self.containers.insert(user.into(), playlists);
        self
    }

    /// Users known to the catalog: container holders, playlist owners and
    /// inbox recipients
    pub fn users(&self) -> HashSet<String> {
        self.containers
            .keys()
            .chain(self.inboxes.keys())
            .cloned()
            .chain(self.playlists.iter().map(|p| p.owner.clone()))
            .collect()
    }
}

pub(crate) struct Entry {
    pub(crate) playlist: Playlist,
    loaded: bool,
    loading: bool,
    pub(crate) pending_commits: usize,
}

impl Entry {
    fn new(playlist: Playlist) -> Self {
        Self {
            playlist,
            loaded: false,
            loading: false,
            pending_commits: 0,
        }
    }
}

#[derive(Default)]
struct Container {
    playlists: Vec<PlaylistLink>,
    loaded: bool,
    loading: bool,
}

pub struct MemorySession {
    user: String,
    settings: MemorySettings,
    playlists: HashMap<PlaylistLink, Entry>,
    containers: HashMap<String, Container>,
    users: HashSet<String>,
    inboxes: BTreeMap<String, Vec<InboxItem>>,
    /// Inbox posts not delivered yet, with their recipient
    outbox: HashMap<u64, (String, InboxItem)>,
    next_post: u64,
    jobs: Option<Sender<Job>>,
    completions: Receiver<Completion>,
    worker: Option<JoinHandle<()>>,
    next_id: u64,
}

impl MemorySession {
    /// Logs `username` in and starts loading their own container.
    ///
    /// The in-memory backend does not verify the password.
    pub fn login(
        username: &str,
        password: &str,
        settings: MemorySettings,
        catalog: Catalog,
        wake: WakeSignal,
    ) -> Result<Self> {
        if username.trim().is_empty() {
            return Err(SessionError::LoginFailed("username is empty".into()));
        }
        if password.is_empty() {
            debug!(user = username, "logging in without password");
        }

        let (jobs_tx, jobs_rx) = unbounded();
        let (done_tx, done_rx) = unbounded();
        let worker = Worker::new(
            jobs_rx,
            done_tx,
            wake,
            settings.load_latency,
            settings.commit_latency,
        )
        .spawn()
        .map_err(|e| SessionError::LoginFailed(format!("cannot start worker: {e}")))?;

        let mut session = Self {
            user: username.to_string(),
            settings,
            playlists: HashMap::new(),
            containers: HashMap::new(),
            users: HashSet::from([username.to_string()]),
            inboxes: BTreeMap::new(),
            outbox: HashMap::new(),
            next_post: 1,
            jobs: Some(jobs_tx),
            completions: done_rx,
            worker: Some(worker),
            next_id: 1,
        };
        session.import(catalog);
        session.published_container(username)?;

        info!(
            user = username,
            user_agent = %session.settings.user_agent,
            playlists = session.playlists.len(),
            "📀 Memory session logged in"
        );
        Ok(session)
    }

    fn import(&mut self, catalog: Catalog) {
        self.users.extend(catalog.users());
        self.inboxes = catalog.inboxes;
        for playlist in catalog.playlists {
            self.playlists.insert(playlist.link.clone(), Entry::new(playlist));
        }
        for (user, playlists) in catalog.containers {
            self.containers.insert(
                user,
                Container {
                    playlists,
                    ..Container::default()
                },
            );
        }
    }

    /// Current content, including unsaved edits
    pub fn catalog(&self) -> Catalog {
        let mut playlists: Vec<Playlist> =
            self.playlists.values().map(|e| e.playlist.clone()).collect();
        playlists.sort_by(|a, b| a.link.as_str().cmp(b.link.as_str()));
        Catalog {
            playlists,
            containers: self
                .containers
                .iter()
                .map(|(user, c)| (user.clone(), c.playlists.clone()))
                .collect(),
            inboxes: self.inboxes.clone(),
        }
    }

    fn submit(&self, job: Job) -> Result<()> {
        let jobs = self.jobs.as_ref().ok_or(SessionError::LoggedOut)?;
        jobs.send(job).map_err(|_| SessionError::LoggedOut)
    }

    fn load_playlist(&mut self, link: &PlaylistLink) -> Result<()> {
        let needs_load = match self.playlists.get(link) {
            Some(entry) => !entry.loaded && !entry.loading,
            None => return Err(SessionError::NotFound(link.to_string())),
        };
        if needs_load {
            self.submit(Job::Load(ResourceKey::Playlist(link.clone())))?;
            if let Some(entry) = self.playlists.get_mut(link) {
                entry.loading = true;
            }
        }
        Ok(())
    }

    fn fresh_link(&mut self) -> Result<PlaylistLink> {
        loop {
            let id = format!("pls{:019}", self.next_id);
            self.next_id += 1;
            let link = PlaylistLink::for_user(&self.user, &id)?;
            if !self.playlists.contains_key(&link) {
                return Ok(link);
            }
        }
    }

    fn complete(&mut self, completion: Completion, out: &mut Vec<SessionEvent>) {
        match completion {
            Completion::Loaded(ResourceKey::Playlist(link)) => {
                if let Some(entry) = self.playlists.get_mut(&link) {
                    entry.loaded = true;
                    entry.loading = false;
                    debug!(playlist = %link, "playlist loaded");
                    out.push(SessionEvent::new(ResourceKey::Playlist(link), Condition::Loaded));
                }
            }
            Completion::Loaded(ResourceKey::Container(user)) => {
                let members = match self.containers.get_mut(&user) {
                    Some(container) => {
                        container.loaded = true;
                        container.loading = false;
                        container.playlists.clone()
                    }
                    None => return,
                };
                debug!(user = %user, playlists = members.len(), "container loaded");
                out.push(SessionEvent::new(ResourceKey::Container(user), Condition::Loaded));

                // Les playlists du conteneur se chargent ensuite, une par une
                for link in members {
                    if let Err(err) = self.load_playlist(&link) {
                        warn!(playlist = %link, "cannot load container playlist: {}", err);
                    }
                }
            }
            Completion::Loaded(key @ ResourceKey::InboxPost(_)) => {
                warn!(resource = %key, "ignoring load completion for an inbox post");
            }
            Completion::Committed(link) => {
                if let Some(entry) = self.playlists.get_mut(&link) {
                    entry.pending_commits = entry.pending_commits.saturating_sub(1);
                    if entry.pending_commits == 0 {
                        debug!(playlist = %link, "updates settled");
                        out.push(SessionEvent::new(
                            ResourceKey::Playlist(link),
                            Condition::UpdateSettled,
                        ));
                    }
                }
            }
            Completion::SubscribersRefreshed(link) => {
                out.push(SessionEvent::new(
                    ResourceKey::Playlist(link),
                    Condition::SubscribersUpdated,
                ));
            }
            Completion::Delivered(post) => {
                if let Some((user, item)) = self.outbox.remove(&post) {
                    debug!(post, user = %user, tracks = item.tracks.len(), "inbox post delivered");
                    self.inboxes.entry(user).or_default().push(item);
                    out.push(SessionEvent::new(ResourceKey::InboxPost(post), Condition::Delivered));
                }
            }
        }
    }

    fn stop_worker(&mut self) {
        self.jobs = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("session worker panicked");
            }
        }
    }
}

impl EventProcessor for MemorySession {
    type Notification = SessionEvent;

    fn process_events(&mut self, out: &mut Vec<SessionEvent>) -> Duration {
        let batch = self.settings.process_batch_size.max(1);
        for _ in 0..batch {
            match self.completions.try_recv() {
                Ok(completion) => self.complete(completion, out),
                Err(_) => break,
            }
        }

        if self.completions.is_empty() {
            self.settings.poll_interval
        } else {
            Duration::ZERO
        }
    }
}

impl Session for MemorySession {
    type Editor<'a> = MemoryEditor<'a>;

    fn user(&self) -> &str {
        &self.user
    }

    fn is_ready(&self, key: &ResourceKey, condition: Condition) -> bool {
        match (key, condition) {
            (ResourceKey::Playlist(link), Condition::Loaded) => {
                self.playlists.get(link).is_some_and(|e| e.loaded)
            }
            (ResourceKey::Playlist(link), Condition::UpdateSettled) => self
                .playlists
                .get(link)
                .is_some_and(|e| e.loaded && e.pending_commits == 0),
            (ResourceKey::Container(user), Condition::Loaded) => {
                self.containers.get(user).is_some_and(|c| c.loaded)
            }
            (ResourceKey::InboxPost(post), Condition::Delivered) => {
                (1..self.next_post).contains(post) && !self.outbox.contains_key(post)
            }
            _ => false,
        }
    }

    fn open_playlist(&mut self, link: &PlaylistLink) -> Result<()> {
        if self.jobs.is_none() {
            return Err(SessionError::LoggedOut);
        }
        if link.is_starred() && !self.playlists.contains_key(link) {
            let owner = link.user().unwrap_or(&self.user).to_string();
            self.playlists.insert(
                link.clone(),
                Entry::new(Playlist::new(link.clone(), STARRED_TITLE, owner)),
            );
        }
        self.load_playlist(link)
    }

    fn playlist(&self, link: &PlaylistLink) -> Option<&Playlist> {
        self.playlists
            .get(link)
            .filter(|e| e.loaded)
            .map(|e| &e.playlist)
    }

    fn playlist_mut(&mut self, link: &PlaylistLink) -> Result<MemoryEditor<'_>> {
        let MemorySession {
            user,
            settings,
            playlists,
            jobs,
            ..
        } = self;
        let jobs = jobs.as_ref().ok_or(SessionError::LoggedOut)?;
        let entry = playlists
            .get_mut(link)
            .ok_or_else(|| SessionError::NotFound(link.to_string()))?;
        if !entry.loaded {
            return Err(SessionError::NotLoaded(link.to_string()));
        }
        Ok(MemoryEditor {
            entry,
            user: user.as_str(),
            jobs,
            max_tracks: settings.max_playlist_tracks,
        })
    }

    fn create_playlist(&mut self, title: &str) -> Result<PlaylistLink> {
        if self.jobs.is_none() {
            return Err(SessionError::LoggedOut);
        }
        let link = self.fresh_link()?;
        let playlist = Playlist::new(link.clone(), title, self.user.clone());
        self.playlists.insert(link.clone(), Entry::new(playlist));
        self.containers
            .entry(self.user.clone())
            .or_default()
            .playlists
            .push(link.clone());

        info!(playlist = %link, title, "playlist created");
        self.load_playlist(&link)?;
        Ok(link)
    }

    fn starred(&mut self, user: &str) -> Result<PlaylistLink> {
        let link = PlaylistLink::starred(user)?;
        self.open_playlist(&link)?;
        Ok(link)
    }

    fn published_container(&mut self, user: &str) -> Result<()> {
        if self.jobs.is_none() {
            return Err(SessionError::LoggedOut);
        }
        let container = self.containers.entry(user.to_string()).or_default();
        if container.loaded || container.loading {
            return Ok(());
        }
        container.loading = true;
        self.submit(Job::Load(ResourceKey::Container(user.to_string())))
    }

    fn container_playlists(&self, user: &str) -> Vec<PlaylistLink> {
        self.containers
            .get(user)
            .filter(|c| c.loaded)
            .map(|c| c.playlists.clone())
            .unwrap_or_default()
    }

    fn request_subscribers(&mut self, link: &PlaylistLink) -> Result<()> {
        if !self.playlists.contains_key(link) {
            return Err(SessionError::NotFound(link.to_string()));
        }
        self.submit(Job::Subscribers(link.clone()))
    }

    fn post_inbox(&mut self, user: &str, tracks: Vec<TrackLink>, message: &str) -> Result<ResourceKey> {
        if self.jobs.is_none() {
            return Err(SessionError::LoggedOut);
        }
        if !self.users.contains(user) {
            return Err(SessionError::NotFound(format!("user {user}")));
        }

        let post = self.next_post;
        self.submit(Job::Inbox(post))?;
        self.next_post += 1;
        info!(post, user, tracks = tracks.len(), "📨 Tracks posted to inbox");
        self.outbox.insert(
            post,
            (
                user.to_string(),
                InboxItem {
                    sender: self.user.clone(),
                    tracks,
                    message: message.to_string(),
                },
            ),
        );
        Ok(ResourceKey::InboxPost(post))
    }

    fn logout(&mut self) {
        if self.jobs.is_none() {
            return;
        }
        self.stop_worker();

        if let Some(path) = self.settings.catalog_path.clone() {
            match self.catalog().save(&path) {
                Ok(()) => info!(path = %path.display(), "catalog saved"),
                Err(err) => warn!("failed to save catalog: {}", err),
            }
        }
        info!(user = %self.user, "memory session logged out");
    }

    fn is_logged_out(&self) -> bool {
        self.jobs.is_none()
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.stop_worker();
    }
}
