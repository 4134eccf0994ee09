//! API REST pour les playlists.
//!
//! Bodies are read as raw JSON so malformed input gets the same
//! `{error, message}` answer as every other failure.

use std::collections::HashMap;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    error::Error,
    service::PlaylistService,
    snapshot::{Collaborative, DiffPreview, PlaylistSnapshot, UserPlaylists},
};
use plssession::SessionError;

/// Router des playlists, à monter sous `/api`.
pub fn playlist_api_router(service: PlaylistService) -> Router {
    Router::new()
        .route("/playlist", post(create_playlist))
        .route("/playlist/{uri}", get(get_playlist))
        .route("/playlist/{uri}/collaborative", get(get_collaborative))
        .route("/playlist/{uri}/subscribers", get(get_subscribers))
        .route("/playlist/{uri}/add", post(add_tracks).put(add_tracks))
        .route("/playlist/{uri}/remove", post(remove_tracks).put(remove_tracks))
        .route("/playlist/{uri}/patch", post(patch_playlist).put(patch_playlist))
        .route("/playlist/{uri}/diff", post(preview_diff))
        .route("/user/{name}/playlists", get(user_playlists))
        .route("/user/{name}/starred", get(starred))
        .route("/user/{name}/inbox", post(post_inbox).put(post_inbox))
        .with_state(service)
}

/// Requête de création de playlist
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePlaylistRequest {
    /// Truncated to 255 characters
    pub title: String,
}

/// Morceaux envoyés dans la boîte de réception d'un utilisateur
#[derive(Debug, ToSchema)]
pub struct InboxRequest {
    /// Track URIs; invalid entries are skipped
    pub tracks: Vec<String>,
    /// Optional note sent along
    pub message: String,
}

impl InboxRequest {
    fn from_body(body: &[u8]) -> Result<Self, Error> {
        let Value::Object(json) = parse_json(body)? else {
            return Err(Error::BadParameter("Not valid JSON object".into()));
        };
        let Some(Value::Array(items)) = json.get("tracks") else {
            return Err(Error::BadParameter("tracks is not valid JSON array".into()));
        };
        Ok(Self {
            tracks: items
                .iter()
                .map(|item| item.as_str().unwrap_or_default().to_string())
                .collect(),
            message: json
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

/// Réponse d'erreur REST générique.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/api/playlist/{uri}",
    tag = "playlists",
    params(("uri" = String, Path, description = "URI de la playlist")),
    responses(
        (status = 200, description = "Playlist chargée", body = PlaylistSnapshot),
        (status = 400, description = "URI invalide", body = ErrorResponse),
        (status = 404, description = "Playlist introuvable", body = ErrorResponse),
        (status = 504, description = "Playlist non chargée à temps", body = ErrorResponse)
    )
)]
pub async fn get_playlist(
    State(service): State<PlaylistService>,
    Path(uri): Path<String>,
) -> Response {
    match service.get_playlist(&uri).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/playlist/{uri}/collaborative",
    tag = "playlists",
    params(("uri" = String, Path, description = "URI de la playlist")),
    responses(
        (status = 200, description = "Statut collaboratif", body = Collaborative),
        (status = 404, description = "Playlist introuvable", body = ErrorResponse)
    )
)]
pub async fn get_collaborative(
    State(service): State<PlaylistService>,
    Path(uri): Path<String>,
) -> Response {
    match service.collaborative(&uri).await {
        Ok(collaborative) => (StatusCode::OK, Json(collaborative)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/playlist/{uri}/subscribers",
    tag = "playlists",
    params(("uri" = String, Path, description = "URI de la playlist")),
    responses(
        (status = 200, description = "Abonnés, après rafraîchissement", body = [String]),
        (status = 404, description = "Playlist introuvable", body = ErrorResponse)
    )
)]
pub async fn get_subscribers(
    State(service): State<PlaylistService>,
    Path(uri): Path<String>,
) -> Response {
    match service.subscribers(&uri).await {
        Ok(subscribers) => (StatusCode::OK, Json(subscribers)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/playlist",
    tag = "playlists",
    request_body = CreatePlaylistRequest,
    responses(
        (status = 200, description = "Playlist créée", body = PlaylistSnapshot),
        (status = 400, description = "Titre absent ou invalide", body = ErrorResponse)
    )
)]
pub async fn create_playlist(State(service): State<PlaylistService>, body: Bytes) -> Response {
    let json = match parse_json(&body) {
        Ok(json) => json,
        Err(err) => return map_error(err),
    };
    match json.get("title") {
        None => return bad_parameter("Invalid playlist: title is missing"),
        Some(Value::String(_)) => {}
        Some(_) => return bad_parameter("Invalid playlist: title is not a string"),
    }
    let request: CreatePlaylistRequest = match serde_json::from_value(json) {
        Ok(request) => request,
        Err(e) => return bad_parameter(&format!("Invalid playlist: {e}")),
    };

    match service.create_playlist(&request.title).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/playlist/{uri}/add",
    tag = "playlists",
    params(
        ("uri" = String, Path, description = "URI de la playlist"),
        ("index" = usize, Query, description = "Position d'insertion")
    ),
    request_body = [String],
    responses(
        (status = 200, description = "Morceaux ajoutés", body = PlaylistSnapshot),
        (status = 400, description = "Index ou morceaux invalides", body = ErrorResponse),
        (status = 403, description = "Playlist non modifiable", body = ErrorResponse)
    )
)]
pub async fn add_tracks(
    State(service): State<PlaylistService>,
    Path(uri): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let Some(index) = numeric(&query, "index") else {
        return bad_parameter("Bad parameter: index must be numeric");
    };
    let tracks = match track_uris(&body) {
        Ok(tracks) => tracks,
        Err(err) => return map_error(err),
    };

    match service.add_tracks(&uri, index, &tracks).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/playlist/{uri}/remove",
    tag = "playlists",
    params(
        ("uri" = String, Path, description = "URI de la playlist"),
        ("index" = usize, Query, description = "Premier morceau retiré"),
        ("count" = usize, Query, description = "Nombre de morceaux retirés, au moins 1")
    ),
    responses(
        (status = 200, description = "Morceaux retirés", body = PlaylistSnapshot),
        (status = 400, description = "Paramètres invalides", body = ErrorResponse)
    )
)]
pub async fn remove_tracks(
    State(service): State<PlaylistService>,
    Path(uri): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let Some(index) = numeric(&query, "index") else {
        return bad_parameter("Bad parameter: index must be numeric");
    };
    let Some(count) = numeric(&query, "count").filter(|&count| count >= 1) else {
        return bad_parameter("Bad parameter: count must be numeric and positive");
    };

    match service.remove_tracks(&uri, index, count).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/playlist/{uri}/patch",
    tag = "playlists",
    params(("uri" = String, Path, description = "URI de la playlist")),
    request_body(content = [String], description = "Liste de morceaux souhaitée"),
    responses(
        (status = 200, description = "Playlist alignée sur la liste", body = PlaylistSnapshot),
        (status = 400, description = "Diff non applicable, relire la playlist", body = ErrorResponse),
        (status = 409, description = "Modifications déjà en cours", body = ErrorResponse)
    )
)]
pub async fn patch_playlist(
    State(service): State<PlaylistService>,
    Path(uri): Path<String>,
    body: Bytes,
) -> Response {
    let tracks = match track_uris(&body) {
        Ok(tracks) => tracks,
        Err(err) => return map_error(err),
    };

    match service.request_patch(&uri, &tracks).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/playlist/{uri}/diff",
    tag = "playlists",
    params(("uri" = String, Path, description = "URI de la playlist")),
    request_body(content = [String], description = "Liste de morceaux à comparer"),
    responses(
        (status = 200, description = "Diff sans modification", body = DiffPreview),
        (status = 404, description = "Playlist introuvable", body = ErrorResponse)
    )
)]
pub async fn preview_diff(
    State(service): State<PlaylistService>,
    Path(uri): Path<String>,
    body: Bytes,
) -> Response {
    let tracks = match track_uris(&body) {
        Ok(tracks) => tracks,
        Err(err) => return map_error(err),
    };

    match service.preview_diff(&uri, &tracks).await {
        Ok(preview) => (StatusCode::OK, Json(preview)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/user/{name}/playlists",
    tag = "playlists",
    params(("name" = String, Path, description = "Nom d'utilisateur")),
    responses(
        (status = 200, description = "Toutes les playlists publiées", body = UserPlaylists),
        (status = 206, description = "Playlists pas encore chargées omises", body = UserPlaylists)
    )
)]
pub async fn user_playlists(
    State(service): State<PlaylistService>,
    Path(name): Path<String>,
) -> Response {
    match service.user_playlists(&name).await {
        Ok(listing) => {
            let status = if listing.partial {
                StatusCode::PARTIAL_CONTENT
            } else {
                StatusCode::OK
            };
            (status, Json(listing)).into_response()
        }
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/user/{name}/starred",
    tag = "playlists",
    params(("name" = String, Path, description = "Nom d'utilisateur")),
    responses(
        (status = 200, description = "Playlist des favoris", body = PlaylistSnapshot)
    )
)]
pub async fn starred(State(service): State<PlaylistService>, Path(name): Path<String>) -> Response {
    match service.starred(&name).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/user/{name}/inbox",
    tag = "playlists",
    params(("name" = String, Path, description = "Destinataire")),
    request_body = InboxRequest,
    responses(
        (status = 200, description = "Morceaux livrés"),
        (status = 400, description = "Corps invalide ou aucun morceau valide", body = ErrorResponse),
        (status = 404, description = "Utilisateur inconnu", body = ErrorResponse)
    )
)]
pub async fn post_inbox(
    State(service): State<PlaylistService>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let request = match InboxRequest::from_body(&body) {
        Ok(request) => request,
        Err(err) => return map_error(err),
    };

    match service
        .post_inbox(&name, &request.tracks, &request.message)
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => map_error(err),
    }
}

fn numeric(query: &HashMap<String, String>, key: &str) -> Option<usize> {
    query.get(key)?.trim().parse().ok()
}

fn parse_json(body: &[u8]) -> Result<Value, Error> {
    if body.is_empty() {
        return Err(Error::BadParameter("No body".into()));
    }
    serde_json::from_slice(body).map_err(|e| Error::BadParameter(format!("Unable to parse JSON: {e}")))
}

/// Entries of a JSON array; non-string items become empty (invalid) URIs.
fn track_uris(body: &[u8]) -> Result<Vec<String>, Error> {
    match parse_json(body)? {
        Value::Array(items) => Ok(items
            .iter()
            .map(|item| item.as_str().unwrap_or_default().to_string())
            .collect()),
        _ => Err(Error::BadParameter("Not valid JSON array".into())),
    }
}

fn bad_parameter(message: &str) -> Response {
    map_error(Error::BadParameter(message.to_string()))
}

fn classify(error: &Error) -> (StatusCode, &'static str) {
    match error {
        Error::NotFound(_) | Error::Session(SessionError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        }
        Error::InvalidLink(_) | Error::Session(SessionError::InvalidLink(_)) => {
            (StatusCode::BAD_REQUEST, "INVALID_LINK")
        }
        Error::NoValidTracks => (StatusCode::BAD_REQUEST, "NO_VALID_TRACKS"),
        Error::BadParameter(_) => (StatusCode::BAD_REQUEST, "BAD_PARAMETER"),
        Error::PatchInFlight(_) => (StatusCode::CONFLICT, "PATCH_IN_FLIGHT"),
        Error::PatchFailed { .. } => (StatusCode::BAD_REQUEST, "PATCH_FAILED"),
        Error::Session(SessionError::PermissionDenied(_)) => {
            (StatusCode::FORBIDDEN, "PERMISSION_DENIED")
        }
        Error::Session(SessionError::LoggedOut) | Error::Shutdown => {
            (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE")
        }
        Error::Session(_) => (StatusCode::BAD_REQUEST, "SESSION_ERROR"),
        Error::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
        Error::Other(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
    }
}

/// Convertit une erreur en réponse JSON `{error, message}`.
pub fn map_error(error: Error) -> Response {
    let (status, code) = classify(&error);
    if status.is_server_error() {
        tracing::warn!(status = %status, "{}", error);
    }
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: error.to_string(),
        }),
    )
        .into_response()
}
