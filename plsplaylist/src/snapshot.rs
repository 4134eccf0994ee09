//! Vues sérialisables renvoyées par le service

use plsdiff::Hunk;
use plssession::Playlist;
use serde::{Deserialize, Serialize};

/// Loaded playlist, in the JSON shape served by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSnapshot {
    pub uri: String,
    pub title: String,
    pub creator: String,
    pub collaborative: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub subscriber_count: usize,
    /// Track URIs, in playlist order
    pub tracks: Vec<String>,
}

impl From<&Playlist> for PlaylistSnapshot {
    fn from(playlist: &Playlist) -> Self {
        Self {
            uri: playlist.link.to_string(),
            title: playlist.title.clone(),
            creator: playlist.owner.clone(),
            collaborative: playlist.collaborative,
            description: playlist.description.clone(),
            subscriber_count: playlist.subscribers.len(),
            tracks: playlist.tracks.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Requests still parked on the reactor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequests {
    /// Requests waiting on a continuation
    pub requests: usize,
    /// Continuations held by the registry
    pub continuations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct Collaborative {
    pub collaborative: bool,
}

/// Playlists of a published container.
///
/// `partial` is set when some member playlists were not loaded yet and
/// are missing from `playlists`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct UserPlaylists {
    pub playlists: Vec<PlaylistSnapshot>,
    #[serde(skip)]
    pub partial: bool,
}

/// Hunks and unified text between a playlist and a desired track list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct DiffPreview {
    #[cfg_attr(feature = "server", schema(value_type = Vec<Object>))]
    pub hunks: Vec<Hunk>,
    pub unified: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use plssession::{PlaylistLink, TrackLink};

    #[test]
    fn test_snapshot_json_shape() {
        let link = PlaylistLink::for_user("alice", "mix").unwrap();
        let playlist = Playlist::new(link, "Mix", "alice")
            .with_tracks(vec![TrackLink::parse("spotify:track:a1").unwrap()])
            .with_subscribers(vec!["bob".into(), "carol".into()]);

        let json = serde_json::to_value(PlaylistSnapshot::from(&playlist)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "uri": "spotify:user:alice:playlist:mix",
                "title": "Mix",
                "creator": "alice",
                "collaborative": false,
                "subscriberCount": 2,
                "tracks": ["spotify:track:a1"],
            })
        );
    }

    #[test]
    fn test_description_is_serialized_when_present() {
        let link = PlaylistLink::for_user("alice", "mix").unwrap();
        let playlist = Playlist::new(link, "Mix", "alice").with_description("road trip");

        let json = serde_json::to_value(PlaylistSnapshot::from(&playlist)).unwrap();
        assert_eq!(json["description"], "road trip");
    }

    #[test]
    fn test_partial_flag_is_not_serialized() {
        let playlists = UserPlaylists {
            playlists: Vec::new(),
            partial: true,
        };
        let json = serde_json::to_value(&playlists).unwrap();
        assert_eq!(json, serde_json::json!({ "playlists": [] }));
    }
}
