use crate::access::{AccessGate, PermissionRecords, PermissionResolver};
use crate::config::{StorageBackend, TemplateConfig};
use crate::handlers;
use crate::services::{
    HealthProbe, LayoutRepository, LocalStorage, MemoryStorage, MemoryStore, MongoDb,
    PartialTemplateRepository, PermissionRepository, Storage,
};
use crate::templating::{HtmlToPdfRenderer, ProcessPdfRenderer, TemplateRenderer};
use crate::workflow::{LayoutStore, PartialTemplateWorkflow};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Multipart framing on top of the document itself.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// The collaborators the service is assembled from.
pub struct Backends {
    pub layouts: Arc<dyn LayoutRepository>,
    pub partials: Arc<dyn PartialTemplateRepository>,
    pub permissions: Arc<dyn PermissionRepository>,
    pub health: Arc<dyn HealthProbe>,
    pub storage: Arc<dyn Storage>,
    pub pdf: Arc<dyn HtmlToPdfRenderer>,
}

impl Backends {
    /// Everything in process except the PDF renderer.
    pub fn in_memory(pdf: Arc<dyn HtmlToPdfRenderer>) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            layouts: store.clone(),
            partials: store.clone(),
            permissions: store.clone(),
            health: store,
            storage: Arc::new(MemoryStorage::new()),
            pdf,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: TemplateConfig,
    pub health: Arc<dyn HealthProbe>,
    pub renderer: TemplateRenderer,
    pub layouts: LayoutStore,
    pub partials: PartialTemplateWorkflow,
    pub permissions: PermissionRecords,
}

impl AppState {
    pub fn new(config: TemplateConfig, backends: Backends) -> Self {
        let gate = AccessGate::new(PermissionResolver::new(backends.permissions.clone()));
        let renderer = TemplateRenderer::new(
            backends.pdf,
            Duration::from_secs(config.renderer.timeout_secs),
        );
        let layouts = LayoutStore::new(
            backends.layouts,
            backends.partials.clone(),
            backends.storage,
            gate.clone(),
        );
        let partials = PartialTemplateWorkflow::new(
            backends.partials,
            layouts.clone(),
            renderer.clone(),
            gate,
        );

        Self {
            config,
            health: backends.health,
            renderer,
            layouts,
            partials,
            permissions: PermissionRecords::new(backends.permissions),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route(
            "/layouts",
            post(handlers::layouts::upload_layout).get(handlers::layouts::list_layouts),
        )
        .route(
            "/layouts/:id",
            get(handlers::layouts::get_layout).delete(handlers::layouts::delete_layout),
        )
        .route("/layouts/:id/preview", post(handlers::layouts::preview_layout))
        .route("/layouts/:id/generate", post(handlers::layouts::generate_layout))
        .route("/layouts/:id/partials", post(handlers::partials::save_partial))
        .route("/partials", get(handlers::partials::list_partials))
        .route(
            "/partials/:id",
            get(handlers::partials::get_partial).delete(handlers::partials::delete_partial),
        )
        .route("/partials/:id/preview", post(handlers::partials::preview_partial))
        .route("/partials/:id/complete", post(handlers::partials::complete_partial))
        .route(
            "/permissions/:user_id",
            get(handlers::permissions::get_role_permissions)
                .put(handlers::permissions::set_role_permissions),
        )
        .route(
            "/permissions/:user_id/restrictions/:role",
            get(handlers::permissions::get_restrictions)
                .put(handlers::permissions::set_restrictions)
                .delete(handlers::permissions::reset_restrictions),
        )
        .route(
            "/permissions/:user_id/restrictions/:role/toggle",
            post(handlers::permissions::toggle_restriction),
        )
        .route_layer(from_fn(metrics_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    user_id = tracing::field::Empty,
                    role = tracing::field::Empty,
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: TemplateConfig) -> Result<Self, AppError> {
        let pdf: Arc<dyn HtmlToPdfRenderer> = Arc::new(ProcessPdfRenderer::new(
            config.renderer.program.clone(),
            config.renderer.args.clone(),
            Duration::from_secs(config.renderer.timeout_secs),
            config.renderer.temp_dir.clone(),
        ));

        let backends = match config.storage.backend {
            StorageBackend::Mongo => {
                let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database)
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to connect to MongoDB: {}", e);
                        e
                    })?;
                db.initialize_indexes().await.map_err(|e| {
                    tracing::error!("Failed to initialize database indexes: {}", e);
                    e
                })?;

                let storage = LocalStorage::new(&config.storage.local_path)
                    .await
                    .map_err(|e| {
                        tracing::error!(
                            "Failed to initialize local storage at {}: {}",
                            config.storage.local_path,
                            e
                        );
                        e
                    })?;

                let db = Arc::new(db);
                Backends {
                    layouts: db.clone(),
                    partials: db.clone(),
                    permissions: db.clone(),
                    health: db,
                    storage: Arc::new(storage),
                    pdf,
                }
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Backends::in_memory(pdf)
            }
        };

        let state = AppState::new(config.clone(), backends);
        let app = build_router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
