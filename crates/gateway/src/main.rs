//! Labsite API Gateway
//!
//! The single HTTP entry point of the research-group site.
//! Handles:
//! - Research, progress, lecturer material and publication endpoints
//! - Multipart uploads and serving of stored files
//! - Rate limiting
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::get,
    Router,
};
use labsite_common::{
    config::{AppConfig, StorageBackend},
    db::{ensure_schema, DbPool, Repository},
    metrics,
    storage::{create_storage, FileStorage},
    MaterialService, ProgressService,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use tokio::signal;
use tower::{limit::ConcurrencyLimitLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::middleware::{rate_limit, request_metrics};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Repository,
    pub progress: ProgressService,
    pub materials: MaterialService,
    pub storage: Arc<dyn FileStorage>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        pool: DbPool,
        storage: Arc<dyn FileStorage>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let repo = Repository::new(pool.clone());
        Self {
            config,
            progress: ProgressService::new(pool, storage.clone()),
            materials: MaterialService::new(repo.clone(), storage.clone()),
            repo,
            storage,
            metrics,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    // Initialize tracing
    init_tracing(&config.observability.log_level, config.observability.json_logging);

    info!(
        service = %config.observability.service_name,
        "Starting Labsite API Gateway v{}",
        labsite_common::VERSION
    );

    // Initialize metrics
    let metrics_handle = if config.observability.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .set_buckets(metrics::LATENCY_BUCKETS)?
            .install_recorder()?;
        metrics::register_metrics();
        Some(handle)
    } else {
        None
    };

    // Initialize database connection
    info!("Connecting to database...");
    let pool = DbPool::new(&config.database).await?;
    if config.database.auto_migrate {
        ensure_schema(pool.write()).await?;
    }

    let storage = create_storage(&config.storage);
    let state = AppState::new(config.clone(), pool, storage, metrics_handle);

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))
        // Research endpoints
        .route(
            "/research",
            get(handlers::research::list).post(handlers::research::create),
        )
        .route(
            "/research/{research}",
            get(handlers::research::get)
                .put(handlers::research::update)
                .delete(handlers::research::delete),
        )
        // Progress endpoints
        .route(
            "/research/{research}/progress",
            get(handlers::progress::list).post(handlers::progress::create),
        )
        .route(
            "/research/{research}/progress/{progress}",
            get(handlers::progress::get_by_slug)
                // HTML forms cannot send PUT, so updates are accepted on POST too
                .put(handlers::progress::update)
                .post(handlers::progress::update)
                .delete(handlers::progress::delete),
        )
        .route(
            "/research/id/{research}/progress/id/{progress}",
            get(handlers::progress::get_by_id),
        )
        // Lecturer material endpoints
        .route(
            "/materials",
            get(handlers::materials::list).post(handlers::materials::create),
        )
        .route(
            "/materials/{id}",
            get(handlers::materials::get)
                .put(handlers::materials::update)
                .post(handlers::materials::update)
                .delete(handlers::materials::delete),
        )
        // Publication endpoints
        .route(
            "/publications",
            get(handlers::publications::list).post(handlers::publications::create),
        )
        .route(
            "/publications/{id}",
            get(handlers::publications::get)
                .put(handlers::publications::update)
                .delete(handlers::publications::delete),
        );

    let mut api_routes = api_routes
        .layer(DefaultBodyLimit::max(config.storage.max_upload_bytes))
        .route_layer(axum_middleware::from_fn(request_metrics::track_metrics));

    if config.rate_limit.enabled {
        let limiter = rate_limit::RateLimitState::from_config(&config.rate_limit);
        api_routes = api_routes.layer(axum_middleware::from_fn_with_state(
            limiter,
            rate_limit::rate_limit_middleware,
        ));
    }

    let mut app = Router::new().nest("/api", api_routes);

    // Stored files are served straight from disk
    if config.storage.backend == StorageBackend::Local {
        app = app.nest_service(&config.storage.public_prefix, ServeDir::new(&config.storage.root));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(cors)
            .layer(TimeoutLayer::new(config.request_timeout()))
            .layer(ConcurrencyLimitLayer::new(config.server.max_concurrent_requests)),
    )
    .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
