//! # radioserver - Serveur web de la radio basé sur Axum
//!
//! Cette crate enveloppe Axum pour le backend de la radio :
//!
//! - **API de haut niveau** : routes JSON, routers et handlers avec état
//! - **Fichiers statiques** : le répertoire web servi en repli de toutes les routes
//! - **Logs** : buffer circulaire, flux SSE et réglage du niveau à chaud
//! - **Documentation OpenAPI** : Swagger UI pour les API enregistrées
//! - **Arrêt gracieux** : sur Ctrl+C, partagé avec les tâches de fond via un jeton
//!
//! Les autres crates ajoutent leurs routes par des traits d'extension sur
//! [`Server`], sans que radioserver les connaisse.
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use radioserver::{logs::LoggingOptions, ServerBuilder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new("radio", 8080).build();
//!     server.init_logging(LoggingOptions::default()).await;
//!
//!     server.add_route("/api/status", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!     server.add_dir("/srv/http").await;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::{log_dump, log_sse, LogState, LoggingOptions, SseLayer};
pub use server::{Server, ServerBuilder};
