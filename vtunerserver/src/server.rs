//! # Module Server - API de haut niveau pour Axum
//!
//! Ce module fournit une abstraction simple pour créer le serveur HTTP du
//! tuner, en cachant la configuration d'Axum et du routage.
//!
//! ## Fonctionnalités
//!
//! - **Routes JSON simples** : ajoutez des endpoints avec `add_route()`
//! - **Handlers personnalisés** : `add_handler_with_state()` et `add_router()`
//! - **Documentation API** : OpenAPI/Swagger avec `add_openapi()`
//! - **Arrêt gracieux** : Ctrl+C ou [`Server::shutdown`] déclenchent un
//!   `CancellationToken` partagé avec les autres tâches du processus

use crate::logs::{LogState, LoggingOptions, create_logs_router, init_logging, log_dump, log_sse, LogsApiDoc};
use anyhow::{Context, Result};
use axum::handler::Handler;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{signal, sync::RwLock, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Délai accordé aux connexions en cours après le signal d'arrêt
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Info serveur sérialisable
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct ServerInfo {
    pub name: String,
    pub base_url: String,
    pub http_port: u16,
}

/// Serveur principal
pub struct Server {
    name: String,
    base_url: String,
    listen_address: String,
    http_port: u16,
    router: Arc<RwLock<Router>>,
    shutdown: CancellationToken,
    local_addr: Option<SocketAddr>,
    join_handle: Option<JoinHandle<()>>,
    log_state: Option<LogState>,
}

impl Server {
    /// Crée une nouvelle instance de serveur
    ///
    /// # Arguments
    ///
    /// * `name` - Nom du serveur (pour les logs)
    /// * `base_url` - Hôte annoncé aux clients (ex: "192.168.1.20")
    /// * `http_port` - Port HTTP à écouter
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            listen_address: "0.0.0.0".to_string(),
            http_port,
            router: Arc::new(RwLock::new(Router::new())),
            shutdown: CancellationToken::new(),
            local_addr: None,
            join_handle: None,
            log_state: None,
        }
    }

    /// Jeton d'arrêt du serveur
    ///
    /// Les tâches qui doivent s'arrêter avec le serveur (annonces SSDP,
    /// sessions de streaming) en dérivent un jeton enfant.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Ajoute une route JSON dynamique
    ///
    /// La closure fournie est appelée à chaque requête GET sur `path`.
    ///
    /// ```rust,no_run
    /// # use vtunerserver::Server;
    /// # async fn example(server: &mut Server) {
    /// server.add_route("/api/status", || async {
    ///     serde_json::json!({ "status": "online" })
    /// }).await;
    /// # }
    /// ```
    pub async fn add_route<F, Fut, T>(&mut self, path: &str, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let f = Arc::new(f);
        let handler = move || {
            let f = f.clone();
            async move { Json(f().await) }
        };

        self.merge(Router::new().route(path, get(handler))).await;
    }

    /// Ajoute un handler Axum standard
    pub async fn add_handler<H, T>(&mut self, path: &str, handler: H)
    where
        H: Handler<T, ()> + Clone + 'static,
        T: 'static,
    {
        self.merge(Router::new().route(path, get(handler))).await;
    }

    /// Ajoute un handler avec état
    pub async fn add_handler_with_state<H, T, S>(&mut self, path: &str, handler: H, state: S)
    where
        H: Handler<T, S> + Clone + 'static,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        let route = Router::new().route(path, get(handler)).with_state(state);
        self.merge(route).await;
    }


    /// Ajoute une API documentée avec OpenAPI et Swagger UI
    ///
    /// - les routes de `api_router` sont servies sous `/api`
    /// - `/swagger-ui/{name}` affiche la documentation
    /// - `/api-docs/{name}.json` fournit la spécification OpenAPI
    pub async fn add_openapi(
        &mut self,
        api_router: Router,
        openapi: utoipa::openapi::OpenApi,
        name: &str,
    ) {
        let swagger = SwaggerUi::new(format!("/swagger-ui/{}", name))
            .url(format!("/api-docs/{}.json", name), openapi);

        let nested_router = Router::new().nest("/api", api_router);
        self.merge(nested_router.merge(swagger)).await;
    }

    /// Ajoute un sous-router au serveur
    ///
    /// - Si `path` est "/", merge directement au router principal
    /// - Sinon, nest le router sous le chemin donné
    pub async fn add_router(&mut self, path: &str, sub_router: Router) {
        if path == "/" {
            self.merge(sub_router).await;
        } else {
            let normalized = format!("/{}", path.trim_start_matches('/'));
            self.merge(Router::new().nest(&normalized, sub_router)).await;
        }
    }

    async fn merge(&mut self, route: Router) {
        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).merge(route);
    }

    /// Copie du routeur courant, utilisée par les tests avec `oneshot`
    pub async fn router(&self) -> Router {
        self.router.read().await.clone()
    }

    /// Démarre le serveur HTTP
    ///
    /// Ouvre le port configuré, lance Axum avec arrêt gracieux sur le jeton
    /// d'arrêt, et met en place la gestion de Ctrl+C. Une erreur d'ouverture
    /// du port est retournée à l'appelant.
    pub async fn start(&mut self) -> Result<()> {
        let bind = format!("{}:{}", self.listen_address, self.http_port);
        let listener = tokio::net::TcpListener::bind(&bind)
            .await
            .with_context(|| format!("cannot listen on {}", bind))?;
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);

        info!(
            "Server {} running at http://{}:{} (listening on {})",
            self.name,
            self.base_url,
            local_addr.port(),
            local_addr
        );

        let router = self.router.read().await.clone();
        let token = self.shutdown.clone();
        let server_task = tokio::spawn(async move {
            let graceful = token.clone();
            if let Err(e) = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(async move { graceful.cancelled().await })
                .await
            {
                tracing::error!("HTTP server error: {}", e);
            }
            // le serveur s'est arrêté de lui-même : propager l'arrêt
            token.cancel();
        });

        tokio::spawn(cancel_on_signal(signal::ctrl_c(), self.shutdown.clone()));

        let token = self.shutdown.clone();
        self.join_handle = Some(tokio::spawn(async move {
            token.cancelled().await;
            let abort = server_task.abort_handle();
            if tokio::time::timeout(SHUTDOWN_GRACE, server_task).await.is_err() {
                warn!(
                    "Connections still open after {:?}, aborting",
                    SHUTDOWN_GRACE
                );
                abort.abort();
            }
        }));

        Ok(())
    }

    /// Déclenche l'arrêt du serveur
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Attend la fin du serveur
    pub async fn wait(&mut self) {
        if let Some(h) = self.join_handle.take() {
            let _ = h.await;
        }
        info!("Server {} stopped", self.name);
    }

    /// Adresse effectivement écoutée, connue après [`Server::start`]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// `LogState` enregistré par [`Server::init_logging`]
    pub fn log_state(&self) -> Option<&LogState> {
        self.log_state.as_ref()
    }

    /// Récupère les infos du serveur
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            http_port: self.http_port,
        }
    }

    /// Initialise le système de logging et enregistre les routes de logs
    ///
    /// Routes enregistrées :
    /// - `GET /log-sse` et `GET /log-dump`
    /// - `GET|POST /api/log_setup` avec sa documentation `/swagger-ui/logs`
    pub async fn init_logging(&mut self, options: LoggingOptions) -> LogState {
        let log_state = init_logging(options);
        self.register_log_routes(log_state.clone()).await;
        log_state
    }

    /// Enregistre les routes de logs pour un `LogState` existant
    pub async fn register_log_routes(&mut self, log_state: LogState) {
        self.add_handler_with_state("/log-sse", log_sse, log_state.clone())
            .await;
        self.add_handler_with_state("/log-dump", log_dump, log_state.clone())
            .await;
        self.add_openapi(
            create_logs_router(log_state.clone()),
            LogsApiDoc::openapi(),
            "logs",
        )
        .await;

        self.log_state = Some(log_state);
    }
}

/// Annule `token` à la réception du signal
///
/// Si l'écoute du signal ne peut pas être installée, le serveur continue de
/// tourner : seul un autre déclencheur l'arrêtera.
async fn cancel_on_signal<F>(signal: F, token: CancellationToken)
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        res = signal => match res {
            Ok(()) => {
                info!("Ctrl+C reçu, arrêt gracieux");
                token.cancel();
            }
            Err(e) => warn!("Cannot listen for Ctrl+C: {}", e),
        },
        _ = token.cancelled() => {}
    }
}

/// Builder pattern
pub struct ServerBuilder {
    name: String,
    base_url: String,
    listen_address: String,
    http_port: u16,
}

impl ServerBuilder {
    /// Crée un nouveau builder
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            listen_address: "0.0.0.0".to_string(),
            http_port,
        }
    }

    /// Crée un builder à partir de la configuration
    pub fn from_config(name: impl Into<String>, config: &vtunerconfig::Config) -> Self {
        Self {
            name: name.into(),
            base_url: config.get_base_url(),
            listen_address: config.get_listen_address(),
            http_port: config.get_http_port(),
        }
    }

    /// Adresse d'écoute (par défaut "0.0.0.0")
    pub fn listen_address(mut self, address: impl Into<String>) -> Self {
        self.listen_address = address.into();
        self
    }

    /// Construit le serveur
    pub fn build(self) -> Server {
        let mut server = Server::new(self.name, self.base_url, self.http_port);
        server.listen_address = self.listen_address;
        server
    }
}
