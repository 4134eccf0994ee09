mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use common::*;
use plsplaylist::{PatchPolicy, api::playlist_api_router};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn call(router: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_get_playlist_json() {
    let service = start(PatchPolicy::Queue).await;
    let router = playlist_api_router(service.clone());

    let (status, body) = call(&router, Method::GET, &format!("/playlist/{MIX}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["uri"], MIX);
    assert_eq!(body["tracks"], json!(tracks(&["a", "b", "c"])));

    let (status, body) = call(&router, Method::GET, "/playlist/not-a-link", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_LINK");

    let (status, body) = call(
        &router,
        Method::GET,
        "/playlist/spotify:user:alice:playlist:nope",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_add_and_remove_over_http() {
    let service = start(PatchPolicy::Queue).await;
    let router = playlist_api_router(service.clone());

    let add = format!("/playlist/{MIX}/add?index=3");
    let body = json!([track("d"), 7, "garbage"]).to_string();
    let (status, playlist) = call(&router, Method::POST, &add, Some(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(playlist["tracks"], json!(tracks(&["a", "b", "c", "d"])));

    // PUT accepté comme POST, liste vide sans effet
    let (status, playlist) = call(&router, Method::PUT, &add, Some("[]")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(playlist["tracks"].as_array().unwrap().len(), 4);

    let (status, body) = call(&router, Method::POST, &add, Some(r#"["garbage"]"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "NO_VALID_TRACKS");

    let (status, body) = call(
        &router,
        Method::POST,
        &format!("/playlist/{MIX}/add?index=first"),
        Some("[]"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("index must be numeric"));

    let (status, playlist) = call(
        &router,
        Method::POST,
        &format!("/playlist/{MIX}/remove?index=0&count=2"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(playlist["tracks"], json!(tracks(&["c", "d"])));

    let (status, _) = call(
        &router,
        Method::POST,
        &format!("/playlist/{MIX}/remove?index=0&count=0"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_malformed_bodies() {
    let service = start(PatchPolicy::Queue).await;
    let router = playlist_api_router(service.clone());
    let patch = format!("/playlist/{MIX}/patch");

    let (status, body) = call(&router, Method::POST, &patch, Some("[oops")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Unable to parse JSON"));

    let (status, body) = call(&router, Method::POST, &patch, Some(r#"{"tracks": []}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Not valid JSON array"));

    let (status, body) = call(&router, Method::POST, "/playlist", Some("{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("title is missing"));

    let (status, body) = call(&router, Method::POST, "/playlist", Some(r#"{"title": 4}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("title is not a string"));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_patch_and_diff_over_http() {
    let service = start(PatchPolicy::Queue).await;
    let router = playlist_api_router(service.clone());

    let desired = json!(tracks(&["b", "z", "a"])).to_string();
    let (status, preview) = call(
        &router,
        Method::POST,
        &format!("/playlist/{MIX}/diff"),
        Some(&desired),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!preview["hunks"].as_array().unwrap().is_empty());
    assert!(preview["unified"].as_str().unwrap().starts_with("--- playlist"));

    let (status, playlist) = call(
        &router,
        Method::PUT,
        &format!("/playlist/{MIX}/patch"),
        Some(&desired),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(playlist["tracks"], json!(tracks(&["b", "z", "a"])));

    let (status, body) = call(
        &router,
        Method::POST,
        &format!("/playlist/{SHARED}/patch"),
        Some(&desired),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "PATCH_FAILED");

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_create_and_list_over_http() {
    let service = start(PatchPolicy::Queue).await;
    let router = playlist_api_router(service.clone());

    let (status, created) = call(&router, Method::POST, "/playlist", Some(r#"{"title": "Road trip"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["title"], "Road trip");

    let (status, listing) = call(&router, Method::GET, "/user/alice/playlists", None).await;
    assert_eq!(status, StatusCode::OK);
    let uris: Vec<&str> = listing["playlists"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["uri"].as_str().unwrap())
        .collect();
    assert_eq!(uris, [MIX, created["uri"].as_str().unwrap()]);

    let (status, listing) = call(&router, Method::GET, "/user/bob/playlists", None).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert!(listing.get("partial").is_none());

    let (status, starred) = call(&router, Method::GET, "/user/alice/starred", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(starred["title"], "Starred");

    let (status, collaborative) = call(
        &router,
        Method::GET,
        &format!("/playlist/{COLLAB}/collaborative"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(collaborative, json!({ "collaborative": true }));

    let (status, subscribers) = call(
        &router,
        Method::GET,
        &format!("/playlist/{SHARED}/subscribers"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(subscribers, json!(["alice"]));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_denied_edit_and_shutdown_statuses() {
    let service = start(PatchPolicy::Queue).await;
    let router = playlist_api_router(service.clone());

    let (status, body) = call(
        &router,
        Method::POST,
        &format!("/playlist/{SHARED}/add?index=0"),
        Some(&json!([track("a")]).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "PERMISSION_DENIED");

    service.shutdown().await.unwrap();
    let (status, _) = call(&router, Method::GET, &format!("/playlist/{MIX}"), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_inbox_over_http() {
    let service = start(PatchPolicy::Queue).await;
    let router = playlist_api_router(service.clone());
    let body = json!({ "tracks": [track("a")], "message": "salut" }).to_string();

    let (status, reply) = call(&router, Method::POST, "/user/bob/inbox", Some(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, Value::Null);

    let (status, _) = call(&router, Method::PUT, "/user/bob/inbox", Some(r#"{"tracks": []}"#)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, reply) = call(
        &router,
        Method::POST,
        "/user/bob/inbox",
        Some(r#"{"tracks": ["garbage", 3]}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["message"], "No valid tracks");

    let (status, reply) = call(&router, Method::POST, "/user/bob/inbox", Some("[]")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(reply["message"].as_str().unwrap().contains("Not valid JSON object"));

    let (status, reply) = call(&router, Method::POST, "/user/nobody/inbox", Some(&body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(reply["error"], "NOT_FOUND");

    service.shutdown().await.unwrap();
}
