use serde::{Deserialize, Serialize};

use crate::link::{PlaylistLink, TrackLink};

/// Resource whose state changes are watched
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Playlist(PlaylistLink),
    /// Published playlist container of a user
    Container(String),
    /// Tracks posted to a user's inbox, by post id
    InboxPost(u64),
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKey::Playlist(link) => write!(f, "{link}"),
            ResourceKey::Container(user) => write!(f, "container:{user}"),
            ResourceKey::InboxPost(id) => write!(f, "inbox-post:{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// The resource is fully loaded
    Loaded,
    /// Every mutation issued on the playlist has been confirmed
    UpdateSettled,
    /// A subscribers refresh completed
    SubscribersUpdated,
    /// An inbox post reached its recipient
    Delivered,
}

/// State transition reported by the backing service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub key: ResourceKey,
    pub condition: Condition,
}

impl SessionEvent {
    pub fn new(key: ResourceKey, condition: Condition) -> Self {
        Self { key, condition }
    }
}

/// Tracks sent to a user's inbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxItem {
    pub sender: String,
    pub tracks: Vec<TrackLink>,
    #[serde(default)]
    pub message: String,
}

/// Playlist as exposed by the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub link: PlaylistLink,
    pub title: String,
    pub owner: String,
    #[serde(default)]
    pub collaborative: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub subscribers: Vec<String>,
    #[serde(default)]
    pub tracks: Vec<TrackLink>,
}

impl Playlist {
    pub fn new(link: PlaylistLink, title: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            link,
            title: title.into(),
            owner: owner.into(),
            collaborative: false,
            description: None,
            subscribers: Vec::new(),
            tracks: Vec::new(),
        }
    }

    pub fn with_tracks(mut self, tracks: Vec<TrackLink>) -> Self {
        self.tracks = tracks;
        self
    }

    pub fn with_collaborative(mut self, collaborative: bool) -> Self {
        self.collaborative = collaborative;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_subscribers(mut self, subscribers: Vec<String>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Only the owner may edit a playlist, unless it is collaborative.
    pub fn editable_by(&self, user: &str) -> bool {
        self.collaborative || self.owner == user
    }
}
