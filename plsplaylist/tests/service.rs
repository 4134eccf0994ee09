mod common;

use std::time::Duration;

use common::*;
use plsdiff::HunkKind;
use plsplaylist::{Error, MAX_TITLE_LENGTH, PatchPolicy, PendingRequests};
use plssession::{Catalog, SessionError};

#[tokio::test]
async fn test_get_playlist_waits_for_load() {
    let service = start(PatchPolicy::Queue).await;

    let mix = service.get_playlist(MIX).await.unwrap();
    assert_eq!(mix.title, "Mix");
    assert_eq!(mix.creator, "alice");
    assert_eq!(mix.tracks, tracks(&["a", "b", "c"]));

    // Hors du conteneur de la session : chargé à la demande
    let shared = service.get_playlist(SHARED).await.unwrap();
    assert_eq!(shared.tracks, tracks(&["x"]));
    assert_eq!(shared.subscriber_count, 1);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_and_invalid_links() {
    let service = start(PatchPolicy::Queue).await;

    let missing = service.get_playlist("spotify:user:alice:playlist:nope").await;
    assert!(matches!(missing, Err(Error::Session(SessionError::NotFound(_)))));

    let invalid = service.get_playlist("spotify:track:a").await;
    assert!(matches!(invalid, Err(Error::InvalidLink(_))));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_add_tracks_skips_invalid_uris() {
    let service = start(PatchPolicy::Queue).await;

    let mix = service
        .add_tracks(MIX, 1, &[track("x"), "garbage".to_string(), track("y")])
        .await
        .unwrap();
    assert_eq!(mix.tracks, tracks(&["a", "x", "y", "b", "c"]));

    let untouched = service.add_tracks(MIX, 0, &[]).await.unwrap();
    assert_eq!(untouched.tracks, mix.tracks);

    let none_valid = service.add_tracks(MIX, 0, &["garbage".to_string()]).await;
    assert!(matches!(none_valid, Err(Error::NoValidTracks)));

    let out_of_range = service.add_tracks(MIX, 42, &[track("z")]).await;
    assert!(matches!(
        out_of_range,
        Err(Error::Session(SessionError::InvalidIndex { index: 42, len: 5 }))
    ));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_remove_tracks() {
    let service = start(PatchPolicy::Queue).await;

    let mix = service.remove_tracks(MIX, 1, 2).await.unwrap();
    assert_eq!(mix.tracks, tracks(&["a"]));

    assert!(matches!(
        service.remove_tracks(MIX, 0, 0).await,
        Err(Error::BadParameter(_))
    ));
    assert!(matches!(
        service.remove_tracks(MIX, 0, 3).await,
        Err(Error::Session(SessionError::InvalidIndex { .. }))
    ));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_edits_respect_permissions() {
    let service = start(PatchPolicy::Queue).await;

    let denied = service.add_tracks(SHARED, 0, &[track("a")]).await;
    assert!(matches!(
        denied,
        Err(Error::Session(SessionError::PermissionDenied(_)))
    ));

    let collab = service.add_tracks(COLLAB, 1, &[track("a")]).await.unwrap();
    assert_eq!(collab.tracks, tracks(&["y", "a"]));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_patch_reaches_desired_tracks() {
    let service = start(PatchPolicy::Queue).await;

    let desired = tracks(&["c", "a", "a", "d"]);
    let mix = service.request_patch(MIX, &desired).await.unwrap();
    assert_eq!(mix.tracks, desired);

    // Même liste : aucune mutation, la playlist ne change pas
    let again = service.request_patch(MIX, &desired).await.unwrap();
    assert_eq!(again.tracks, desired);

    let reread = service.get_playlist(MIX).await.unwrap();
    assert_eq!(reread.tracks, desired);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_patch_without_valid_tracks_is_a_no_op() {
    let service = start(PatchPolicy::Queue).await;

    let mix = service
        .request_patch(MIX, &["garbage".to_string()])
        .await
        .unwrap();
    assert_eq!(mix.tracks, tracks(&["a", "b", "c"]));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rejected_patch_reports_applied_mutations() {
    let service = start(PatchPolicy::Queue).await;

    let result = service.request_patch(SHARED, &tracks(&["x", "y"])).await;
    assert!(matches!(
        result,
        Err(Error::PatchFailed {
            applied: 0,
            source: SessionError::PermissionDenied(_)
        })
    ));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_queued_patches_run_in_order() {
    let service = start(PatchPolicy::Queue).await;
    service.get_playlist(MIX).await.unwrap();

    let first = tracks(&["b", "d"]);
    let second = tracks(&["e", "b", "d", "f"]);
    let (one, two) = tokio::join!(
        service.request_patch(MIX, &first),
        service.request_patch(MIX, &second)
    );

    assert_eq!(one.unwrap().tracks, first);
    assert_eq!(two.unwrap().tracks, second);
    assert_eq!(service.get_playlist(MIX).await.unwrap().tracks, second);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reject_policy_refuses_patch_in_flight() {
    let memory = plssession::MemorySettings {
        commit_latency: Duration::from_millis(200),
        ..memory_settings()
    };
    let service = start_with(service_settings(PatchPolicy::Reject), memory).await;
    service.wait_until_ready().await.unwrap();
    service.get_playlist(MIX).await.unwrap();

    let added_tracks = [track("d")];
    let patch_tracks = tracks(&["a"]);
    let (added, patched) = tokio::join!(
        service.add_tracks(MIX, 3, &added_tracks),
        service.request_patch(MIX, &patch_tracks)
    );

    assert_eq!(added.unwrap().tracks, tracks(&["a", "b", "c", "d"]));
    assert!(matches!(patched, Err(Error::PatchInFlight(uri)) if uri == MIX));

    // Une fois les changements confirmés, le patch passe
    let mix = service.request_patch(MIX, &tracks(&["a"])).await.unwrap();
    assert_eq!(mix.tracks, tracks(&["a"]));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_preview_diff_leaves_playlist_untouched() {
    let service = start(PatchPolicy::Queue).await;

    let preview = service
        .preview_diff(MIX, &tracks(&["a", "x", "c"]))
        .await
        .unwrap();
    let kinds: Vec<HunkKind> = preview.hunks.iter().map(|h| h.kind).collect();
    assert_eq!(kinds, [HunkKind::Copy, HunkKind::Replace, HunkKind::Copy]);
    assert!(preview.unified.contains("-spotify:track:b"));
    assert!(preview.unified.contains("+spotify:track:x"));

    let mix = service.get_playlist(MIX).await.unwrap();
    assert_eq!(mix.tracks, tracks(&["a", "b", "c"]));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_user_playlists_partial_then_complete() {
    let service = start(PatchPolicy::Queue).await;

    let first = service.user_playlists("bob").await.unwrap();
    assert!(first.partial);

    let complete = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let listing = service.user_playlists("bob").await.unwrap();
            if !listing.partial {
                return listing;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let uris: Vec<&str> = complete.playlists.iter().map(|p| p.uri.as_str()).collect();
    assert_eq!(uris, [SHARED, COLLAB]);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_create_playlist_truncates_title() {
    let service = start(PatchPolicy::Queue).await;

    let created = service.create_playlist(&"t".repeat(300)).await.unwrap();
    assert_eq!(created.title.chars().count(), MAX_TITLE_LENGTH);
    assert_eq!(created.creator, "alice");
    assert!(created.tracks.is_empty());

    let listing = service.user_playlists("alice").await.unwrap();
    assert!(listing.playlists.iter().any(|p| p.uri == created.uri));

    assert!(matches!(
        service.create_playlist("  ").await,
        Err(Error::BadParameter(_))
    ));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_starred_and_subscribers() {
    let service = start(PatchPolicy::Queue).await;

    let starred = service.starred("alice").await.unwrap();
    assert_eq!(starred.uri, "spotify:user:alice:starred");
    assert_eq!(starred.title, "Starred");

    let subscribers = service.subscribers(SHARED).await.unwrap();
    assert_eq!(subscribers, ["alice"]);

    let collaborative = service.collaborative(COLLAB).await.unwrap();
    assert!(collaborative.collaborative);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_request_times_out() {
    let settings = plsplaylist::ServiceSettings {
        request_timeout: Duration::from_millis(50),
        ..service_settings(PatchPolicy::Queue)
    };
    let memory = plssession::MemorySettings {
        load_latency: Duration::from_millis(300),
        ..memory_settings()
    };
    let service = start_with(settings, memory).await;

    let result = service.get_playlist(MIX).await;
    assert!(matches!(result, Err(Error::Timeout(limit)) if limit == Duration::from_millis(50)));

    // La continuation disparaît bien avant la fin du chargement
    let settings = tokio::time::timeout(Duration::from_millis(200), async {
        loop {
            let pending = service.pending_requests().await.unwrap();
            if pending == PendingRequests::default() {
                return pending;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(settings.is_ok(), "timed out request still registered");

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cancellation_survives_a_full_command_queue() {
    let settings = plsplaylist::ServiceSettings {
        request_timeout: Duration::from_millis(50),
        command_capacity: 1,
        ..service_settings(PatchPolicy::Queue)
    };
    let memory = plssession::MemorySettings {
        load_latency: Duration::from_millis(300),
        ..memory_settings()
    };
    let service = start_with(settings, memory).await;

    // Toutes les requêtes expirent en même temps, file de commandes saturée
    let calls = (0..8).map(|_| {
        let service = service.clone();
        tokio::spawn(async move { service.get_playlist(MIX).await })
    });
    for call in calls.collect::<Vec<_>>() {
        assert!(matches!(call.await.unwrap(), Err(Error::Timeout(_))));
    }

    let drained = tokio::time::timeout(Duration::from_millis(200), async {
        loop {
            if service.pending_requests().await.unwrap() == PendingRequests::default() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(drained.is_ok(), "cancellations were lost");

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_fails_waiting_requests() {
    let memory = plssession::MemorySettings {
        load_latency: Duration::from_millis(300),
        ..memory_settings()
    };
    let service = start_with(service_settings(PatchPolicy::Queue), memory).await;

    let waiting = tokio::spawn({
        let service = service.clone();
        async move { service.get_playlist(MIX).await }
    });
    tokio::time::sleep(Duration::from_millis(30)).await;
    service.shutdown().await.unwrap();

    assert!(matches!(waiting.await.unwrap(), Err(Error::Shutdown)));
    assert!(matches!(service.get_playlist(MIX).await, Err(Error::Shutdown)));
    // Déjà arrêté
    assert!(matches!(service.shutdown().await, Ok(()) | Err(Error::Shutdown)));
}

#[tokio::test]
async fn test_shutdown_saves_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    let memory = plssession::MemorySettings {
        catalog_path: Some(path.clone()),
        ..memory_settings()
    };
    let service = start_with(service_settings(PatchPolicy::Queue), memory).await;
    service.wait_until_ready().await.unwrap();

    service.request_patch(MIX, &tracks(&["z"])).await.unwrap();
    service.shutdown().await.unwrap();

    let saved = Catalog::load(&path).unwrap();
    let mix = saved
        .playlists
        .iter()
        .find(|p| p.link.as_str() == MIX)
        .unwrap();
    assert_eq!(mix.tracks.len(), 1);
    assert_eq!(mix.tracks[0].to_string(), track("z"));
}

#[tokio::test]
async fn test_post_inbox_waits_for_delivery() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    let memory = plssession::MemorySettings {
        catalog_path: Some(path.clone()),
        ..memory_settings()
    };
    let service = start_with(service_settings(PatchPolicy::Queue), memory).await;

    service
        .post_inbox("bob", &[track("a"), "garbage".to_string(), track("b")], "pour toi")
        .await
        .unwrap();

    // Liste vide : rien n'est envoyé
    service.post_inbox("bob", &[], "").await.unwrap();

    assert!(matches!(
        service.post_inbox("bob", &["garbage".to_string()], "").await,
        Err(Error::NoValidTracks)
    ));
    assert!(matches!(
        service.post_inbox("nobody", &[track("a")], "").await,
        Err(Error::Session(SessionError::NotFound(_)))
    ));
    service.shutdown().await.unwrap();

    let saved = Catalog::load(&path).unwrap();
    let inbox = &saved.inboxes["bob"];
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].sender, "alice");
    assert_eq!(inbox[0].message, "pour toi");
    let sent: Vec<String> = inbox[0].tracks.iter().map(|t| t.to_string()).collect();
    assert_eq!(sent, tracks(&["a", "b"]));
}
