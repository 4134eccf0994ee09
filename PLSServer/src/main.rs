use std::{env, sync::Arc};

use anyhow::bail;
use plsconfig::{Config, get_config};
use plsplaylist::{PlaylistConfigExt, PlaylistService, api::playlist_api_router, openapi::ApiDoc};
use plsserver::{
    ServerBuilder,
    logs::{LogsApiDoc, create_logs_router, init_logging},
};
use plssession::{Catalog, MemorySession};
use tracing::info;
use utoipa::OpenApi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Configuration et logs ==========
    let config = match env::args().nth(1) {
        Some(dir) => Arc::new(Config::load_config(&dir)?),
        None => get_config(),
    };
    let log_state = init_logging(&config)?;
    info!(dir = config.directory(), "⚙️ Configuration loaded");

    // ========== PHASE 2 : Session et réacteur ==========
    let memory = config.memory_settings()?;
    let catalog = match &memory.catalog_path {
        Some(path) => Catalog::load(path)?,
        None => Catalog::default(),
    };
    info!(
        playlists = catalog.playlists.len(),
        containers = catalog.containers.len(),
        "📀 Catalog loaded"
    );

    let username = config.get_session_username()?;
    if username.trim().is_empty() {
        bail!("session.username is not configured");
    }
    let password = config.get_session_password()?;

    info!("🎵 Logging in as {}...", username);
    let service = PlaylistService::start(config.service_settings(), move |wake| {
        MemorySession::login(&username, &password, memory, catalog, wake)
    })
    .await?;
    service.wait_until_ready().await?;
    info!("✅ Session ready");

    // ========== PHASE 3 : Serveur HTTP ==========
    let mut server =
        ServerBuilder::new("PLSServer", config.get_http_host(), config.get_http_port()).build();
    server
        .add_route("/info", || async {
            serde_json::json!({ "name": "PLSServer", "version": env!("CARGO_PKG_VERSION") })
        })
        .await;
    server
        .add_openapi(
            playlist_api_router(service.clone()),
            ApiDoc::openapi(),
            "playlists",
        )
        .await;
    server
        .add_openapi(create_logs_router(log_state), LogsApiDoc::openapi(), "logs")
        .await;

    info!("🌐 Starting HTTP server...");
    server.start().await?;

    info!("✅ {} is ready!", server.name());
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    info!("🛑 Stopping playlist service...");
    service.shutdown().await?;
    Ok(())
}
