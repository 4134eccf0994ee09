//! # plsserver - Serveur web haut niveau basé sur Axum
//!
//! - [`server`] : serveur, builder et montage des APIs documentées
//! - [`logs`] : initialisation de `tracing` et API de réglage du niveau
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use plsserver::{ServerBuilder, logs::{LogsApiDoc, create_logs_router, init_logging}};
//! use utoipa::OpenApi;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let log_state = init_logging(&plsconfig::get_config())?;
//!
//!     let mut server = ServerBuilder::new("MyServer", "127.0.0.1", 8080).build();
//!     server
//!         .add_openapi(create_logs_router(log_state), LogsApiDoc::openapi(), "logs")
//!         .await;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::{LogState, init_logging};
pub use server::{Server, ServerBuilder};
