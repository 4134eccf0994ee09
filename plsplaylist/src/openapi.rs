//! Documentation OpenAPI pour les endpoints playlists.

use utoipa::OpenApi;

/// Documentation OpenAPI pour l'API playlist.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::get_playlist,
        crate::api::get_collaborative,
        crate::api::get_subscribers,
        crate::api::create_playlist,
        crate::api::add_tracks,
        crate::api::remove_tracks,
        crate::api::patch_playlist,
        crate::api::preview_diff,
        crate::api::user_playlists,
        crate::api::starred,
        crate::api::post_inbox,
    ),
    components(
        schemas(
            crate::snapshot::PlaylistSnapshot,
            crate::snapshot::Collaborative,
            crate::snapshot::UserPlaylists,
            crate::snapshot::DiffPreview,
            crate::api::CreatePlaylistRequest,
            crate::api::InboxRequest,
            crate::api::ErrorResponse,
        )
    ),
    tags(
        (name = "playlists", description = "Lecture et modification des playlists de la session")
    ),
    info(
        title = "PLS Playlist API",
        version = "0.1.0",
        description = r#"
# Playlists

Lecture, création et modification des playlists de l'utilisateur connecté.

Chaque réponse est rendue une fois l'état attendu atteint :
- lecture : playlist chargée
- modification : changements confirmés par le service distant

`inbox` envoie des morceaux à un autre utilisateur et répond une fois
l'envoi livré.

`patch` aligne une playlist sur une liste de morceaux complète en appliquant
le plus petit ensemble de suppressions et d'insertions. `diff` montre ce
qu'un `patch` ferait, sans rien modifier.

Erreurs : `{ "error": CODE, "message": texte }`.
        "#,
        license(
            name = "MIT",
        ),
    )
)]
pub struct ApiDoc;
