//! # Module Server - API de haut niveau pour Axum
//!
//! Le serveur accumule des routers (APIs documentées, handlers) puis les
//! sert tous sur une même adresse.

use std::{
    future::Future,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::{Context, Result};
use axum::{Json, Router, routing::get};
use serde::Serialize;
use tokio::{net::TcpListener, signal, sync::RwLock, task::JoinHandle};
use tracing::{error, info, warn};

/// Serveur principal
pub struct Server {
    name: String,
    http_host: String,
    http_port: u16,
    router: Arc<RwLock<Router>>,
    join_handle: Option<JoinHandle<()>>,
}

impl Server {
    pub fn new(name: impl Into<String>, http_host: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            http_host: http_host.into(),
            http_port,
            router: Arc::new(RwLock::new(Router::new())),
            join_handle: None,
        }
    }

    /// Ajoute une route JSON dynamique
    ///
    /// ```rust,no_run
    /// # use plsserver::Server;
    /// # #[tokio::main]
    /// # async fn main() {
    /// let mut server = Server::new("Test", "127.0.0.1", 3000);
    /// server.add_route("/api/status", || async {
    ///     serde_json::json!({ "status": "online" })
    /// }).await;
    /// # }
    /// ```
    pub async fn add_route<F, Fut, T>(&mut self, path: &str, f: F)
    where
        F: Fn() -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let handler = move || {
            let f = f.clone();
            async move { Json(f().await) }
        };
        self.add_router("/", Router::new().route(path, get(handler)))
            .await;
    }

    /// Ajoute une API documentée
    ///
    /// Les routes de `api_router` sont servies sous `/api`, la
    /// spécification OpenAPI sous `/api-docs/{name}.json`.
    pub async fn add_openapi(
        &mut self,
        api_router: Router,
        openapi: utoipa::openapi::OpenApi,
        name: &str,
    ) {
        let openapi = Arc::new(openapi);
        let docs = Router::new().route(
            &format!("/api-docs/{name}.json"),
            get(move || {
                let openapi = openapi.clone();
                async move { Json(openapi.as_ref().clone()) }
            }),
        );

        let nested = Router::new().nest("/api", api_router).merge(docs);
        self.add_router("/", nested).await;
        info!(api = name, "📚 API registered");
    }

    /// Ajoute un sous-router au serveur
    ///
    /// - Si `path` est "/", merge directement au router principal
    /// - Sinon, nest le router sous le chemin donné
    pub async fn add_router(&mut self, path: &str, sub_router: Router) {
        let mut r = self.router.write().await;
        *r = if path == "/" {
            std::mem::take(&mut *r).merge(sub_router)
        } else {
            let normalized = format!("/{}", path.trim_start_matches('/'));
            std::mem::take(&mut *r).nest(&normalized, sub_router)
        };
    }

    /// Router courant, toutes routes fusionnées
    pub async fn router(&self) -> Router {
        self.router.read().await.clone()
    }

    /// Démarre le serveur HTTP
    ///
    /// Binds the listener before returning, so an unavailable address is
    /// reported here. Serving stops on Ctrl+C; see [`Server::wait`].
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .http_host
            .parse()
            .with_context(|| format!("invalid HTTP host '{}'", self.http_host))?;
        let listener = TcpListener::bind(SocketAddr::new(ip, self.http_port))
            .await
            .with_context(|| format!("cannot bind {}:{}", self.http_host, self.http_port))?;
        let addr = listener.local_addr()?;
        info!("Server {} running at http://{}", self.name, addr);

        let router = self.router().await;
        let server_task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router.into_make_service()).await {
                error!("HTTP server stopped: {}", e);
            }
        });

        let shutdown_task = tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => info!("Ctrl+C reçu, arrêt gracieux"),
                Err(e) => {
                    warn!("cannot listen for Ctrl+C: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        });

        self.join_handle = Some(tokio::spawn(async move {
            tokio::select! {
                _ = server_task => {},
                _ = shutdown_task => {},
            }
        }));
        Ok(addr)
    }

    /// Attend la fin du serveur (Ctrl+C ou arrêt du listener)
    pub async fn wait(&mut self) {
        if let Some(h) = self.join_handle.take() {
            let _ = h.await;
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder pattern
pub struct ServerBuilder {
    name: String,
    http_host: String,
    http_port: u16,
}

impl ServerBuilder {
    pub fn new(name: impl Into<String>, http_host: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            http_host: http_host.into(),
            http_port,
        }
    }

    pub fn build(self) -> Server {
        Server::new(self.name, self.http_host, self.http_port)
    }
}
