//! Inkwell Backend
//!
//! REST backend for a content site: categories, articles with images, likes,
//! views, comments and portfolio projects, persisted in SQLite.

mod api;
mod config;
mod db;
mod engagement;
mod errors;
mod media;
mod models;
mod slug;
mod validation;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post, put},
    Router,
};
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, LogFormat};
use db::Repository;
use media::{LocalMediaStore, MediaStore};
use models::SeedProject;

/// Multipart overhead allowed on top of the two image parts.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub media: Arc<dyn MediaStore>,
    pub config: Arc<Config>,
    pub started_at: Instant,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!("Starting Inkwell Backend v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {:?}", config.environment);
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if !config.allow_anonymous_likes {
        tracing::info!("Anonymous likes disabled, userId is required");
    }

    // Initialize database
    let pool = match db::init_database(&config.db_path, config.upstream_timeout).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to open database at {:?}: {}", config.db_path, e);
            return Err(e.into());
        }
    };
    let repo = Arc::new(Repository::new(pool));

    if let Some(seed) = &config.projects_seed {
        if let Err(e) = seed_projects(&repo, seed).await {
            tracing::warn!("Skipping project seed {:?}: {}", seed, e);
        }
    }

    // Initialize media store
    let store = LocalMediaStore::open(&config.media_root, &config.media_base_url).await?;
    tracing::info!("Media stored in {:?}", store.root());
    let media: Arc<dyn MediaStore> = Arc::new(store);

    // Create application state
    let state = AppState {
        repo,
        media,
        config: Arc::new(config.clone()),
        started_at: Instant::now(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Load portfolio projects from a JSON file into an empty store.
async fn seed_projects(repo: &Repository, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let raw = tokio::fs::read(path).await?;
    let projects: Vec<SeedProject> = serde_json::from_slice(&raw)?;
    let inserted = repo.seed_projects(&projects).await?;
    if inserted > 0 {
        tracing::info!("Seeded {} projects from {:?}", inserted, path);
    }
    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let origins = state.config.cors_origins.as_ref().map(|origins| {
        origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                    None
                }
            })
            .collect::<Vec<_>>()
    });
    let cors = CorsLayer::new()
        .allow_origin(match origins {
            Some(list) => AllowOrigin::list(list),
            None => AllowOrigin::from(Any),
        })
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.max_upload_bytes * 2 + FORM_OVERHEAD_BYTES;

    // API routes
    let api_routes = Router::new()
        // Categories
        .route("/categories", get(api::list_categories))
        .route("/categories", post(api::create_category))
        .route("/categories/slug/{slug}", get(api::get_category_by_slug))
        .route("/categories/{id}", get(api::get_category))
        .route("/categories/{id}", put(api::update_category))
        .route("/categories/{id}", delete(api::delete_category))
        // Articles
        .route("/articles", get(api::list_articles))
        .route("/articles", post(api::create_article))
        .route("/articles/most-viewed", get(api::most_viewed))
        .route("/articles/slug/{slug}", get(api::get_article_by_slug))
        .route("/articles/{id}", get(api::get_article))
        .route("/articles/{id}", put(api::update_article))
        .route("/articles/{id}", delete(api::delete_article))
        // Engagement
        .route("/articles/{id}/like", post(api::like_article))
        .route("/articles/{id}/unlike", post(api::unlike_article))
        .route("/articles/{id}/like-status", get(api::like_status))
        .route("/articles/{id}/like-stats", get(api::like_stats))
        .route("/articles/{id}/view-stats", get(api::view_stats))
        // Comments
        .route("/articles/{id}/comments", get(api::list_comments))
        .route("/articles/{id}/comments", post(api::create_comment))
        .route("/comments/{id}/like", post(api::like_comment))
        .route("/comments/{id}", delete(api::delete_comment))
        // Projects
        .route("/projects", get(api::list_projects))
        .route("/projects/{id}", get(api::get_project))
        .layer(DefaultBodyLimit::max(body_limit));

    let health_routes = Router::new().route("/health", get(api::health_check));

    let media_files = ServeDir::new(&state.config.media_root);

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .nest_service("/media", media_files)
        .fallback(api::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
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
}
