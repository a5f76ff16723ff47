//! # vtunerserver - Serveur HTTP du tuner basé sur Axum
//!
//! Cette crate fournit le frontal HTTP partagé par les services du tuner :
//!
//! - [`server`] : le [`Server`], son routeur et l'arrêt gracieux piloté par un
//!   `CancellationToken`
//! - [`logs`] : le système de logs (buffer circulaire, SSE, niveau ajustable
//!   à chaud via `/api/log_setup`)
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use vtunerserver::ServerBuilder;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut server = ServerBuilder::new("VTuner", "192.168.1.20", 6077).build();
//!
//! server.add_route("/api/status", || async {
//!     serde_json::json!({"status": "ok"})
//! }).await;
//!
//! server.start().await?;
//! server.wait().await;
//! # Ok(())
//! # }
//! ```

pub mod logs;
pub mod server;

pub use logs::{LogState, LoggingOptions, SseLayer, log_dump, log_sse};
pub use server::{SHUTDOWN_GRACE, Server, ServerBuilder, ServerInfo};
