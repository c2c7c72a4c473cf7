//! Community Forum Backend
//!
//! REST backend for a discussion forum: posts, threaded comments, one-vote-per-user
//! scoring and time-decayed hot ranking, backed by SQLite with Tantivy full-text search.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod ranking;
mod search;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, LogFormat};
use db::Repository;
use search::SearchIndex;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    init_tracing(&config);

    tracing::info!("Starting Forum Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (FORUM_API_PSK). Gateway authentication is disabled!");
    }
    if !config.admin_emails.is_empty() {
        tracing::info!("{} admin email(s) on the allow-list", config.admin_emails.len());
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Initialize search index and build it from the database
    let search = Arc::new(SearchIndex::open(&config.index_path)?);
    tracing::info!("Building search index...");
    let posts = repo.list_published_posts().await?;
    search.rebuild(&posts).await?;

    let state = AppState {
        repo,
        search,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// `RUST_LOG` wins over `FORUM_LOG_LEVEL` when set.
fn init_tracing(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    let api_routes = Router::new()
        // Users
        .route("/me", get(api::get_me))
        .route("/users/{id}/role", put(api::update_user_role))
        .route("/users/{id}/posts", get(api::list_user_posts))
        // Posts
        .route("/posts", get(api::list_posts).post(api::create_post))
        .route("/posts/pinned", get(api::list_pinned_posts))
        .route(
            "/posts/{id}",
            get(api::get_post)
                .put(api::update_post)
                .delete(api::delete_post),
        )
        .route("/posts/{id}/vote", post(api::vote_post))
        .route(
            "/posts/{id}/comments",
            get(api::list_comments).post(api::create_comment),
        )
        .route("/posts/{id}/share", post(api::share_post))
        .route("/posts/{id}/shares", get(api::count_shares))
        // Comments
        .route(
            "/comments/{id}",
            get(api::get_comment)
                .put(api::update_comment)
                .delete(api::delete_comment),
        )
        .route("/comments/{id}/vote", post(api::vote_comment))
        // Votes
        .route("/votes", post(api::cast_vote))
        // Search
        .route("/search", get(api::search_posts))
        // Admin
        .route("/admin/hot-scores/refresh", post(api::refresh_hot_scores))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
