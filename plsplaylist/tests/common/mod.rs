#![allow(dead_code)]

use std::time::Duration;

use plsplaylist::{PatchPolicy, PlaylistService, ServiceSettings};
use plssession::{Catalog, MemorySession, MemorySettings, Playlist, PlaylistLink, TrackLink};

pub const MIX: &str = "spotify:user:alice:playlist:mix";
pub const SHARED: &str = "spotify:user:bob:playlist:shared";
pub const COLLAB: &str = "spotify:user:bob:playlist:collab";

pub fn track(id: &str) -> String {
    format!("spotify:track:{id}")
}

pub fn tracks(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| track(id)).collect()
}

fn links(ids: &[&str]) -> Vec<TrackLink> {
    ids.iter()
        .map(|id| TrackLink::parse(&track(id)).unwrap())
        .collect()
}

/// alice owns `mix`; bob owns `shared` and the collaborative `collab`.
pub fn catalog() -> Catalog {
    let mix = PlaylistLink::parse(MIX).unwrap();
    let shared = PlaylistLink::parse(SHARED).unwrap();
    let collab = PlaylistLink::parse(COLLAB).unwrap();

    Catalog::default()
        .with_playlist(Playlist::new(mix.clone(), "Mix", "alice").with_tracks(links(&["a", "b", "c"])))
        .with_playlist(
            Playlist::new(shared.clone(), "Shared", "bob")
                .with_tracks(links(&["x"]))
                .with_subscribers(vec!["alice".into()]),
        )
        .with_playlist(
            Playlist::new(collab.clone(), "Collab", "bob")
                .with_tracks(links(&["y"]))
                .with_collaborative(true),
        )
        .with_container("alice", vec![mix])
        .with_container("bob", vec![shared, collab])
}

pub fn memory_settings() -> MemorySettings {
    MemorySettings {
        load_latency: Duration::from_millis(5),
        commit_latency: Duration::from_millis(5),
        poll_interval: Duration::from_millis(50),
        max_playlist_tracks: 100,
        ..MemorySettings::default()
    }
}

pub fn service_settings(policy: PatchPolicy) -> ServiceSettings {
    ServiceSettings {
        patch_policy: policy,
        request_timeout: Duration::from_secs(5),
        ..ServiceSettings::default()
    }
}

pub async fn start_with(settings: ServiceSettings, memory: MemorySettings) -> PlaylistService {
    PlaylistService::start(settings, move |wake| {
        MemorySession::login("alice", "secret", memory, catalog(), wake)
    })
    .await
    .unwrap()
}

/// Logged in as alice, own container loaded.
pub async fn start(policy: PatchPolicy) -> PlaylistService {
    let service = start_with(service_settings(policy), memory_settings()).await;
    service.wait_until_ready().await.unwrap();
    service
}
