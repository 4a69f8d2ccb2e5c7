//! Postwall - a small social blogging server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Layer (Axum)                       │
//! │  - Posts app pages (HTML)                                   │
//! │  - Account pages (signup/login/logout)                      │
//! │  - REST API (/api/v1)                                       │
//! │  - Activity tracking middleware                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Service + Form Layer                          │
//! │  - Validation, image cropping                               │
//! │  - Feeds, posting, likes and follows                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx) with annotated post queries                │
//! │  - Media storage (local disk or R2)                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `web`: HTML handlers and page rendering
//! - `api`: REST resources and operational endpoints
//! - `auth`: Accounts, sessions, activity tracking
//! - `service`: Business logic layer
//! - `forms`: Submission validation
//! - `data`: Database layer
//! - `storage`: Media storage
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod forms;
pub mod metrics;
pub mod service;
pub mod storage;
pub mod web;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the database pool and media storage.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Media storage (local disk or Cloudflare R2)
    pub storage: Arc<storage::MediaStorage>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database (runs migrations)
    /// 2. Set up media storage
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db = data::Database::connect(&config.database.path).await?;
        tracing::info!(path = %config.database.path.display(), "Database connected");

        let storage =
            storage::MediaStorage::new(&config.media, config.cloudflare.as_ref()).await?;
        tracing::info!(backend = ?config.media.backend, "Media storage initialized");

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            storage: Arc::new(storage),
        })
    }
}

/// Largest request body; image uploads plus form fields
const MAX_BODY_BYTES: usize = web::MAX_IMAGE_UPLOAD_BYTES + 1024 * 1024;

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, extract::DefaultBodyLimit, middleware};
    use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

    let mut router = Router::new()
        .merge(api::ops_router())
        .merge(auth::auth_router())
        .nest("/api", api::rest_api_router())
        .merge(web::posts_router());

    if let Some(root) = state.storage.local_root() {
        let mount = media_mount(&state.config.media.public_url);
        router = router.nest_service(&mount, ServeDir::new(root));
    }

    router
        .fallback(web::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::track_activity,
        ))
        .layer(middleware::from_fn(metrics::track_requests))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Path the local media directory is served under, e.g. "/media"
fn media_mount(public_url: &str) -> String {
    let path = public_url
        .split_once("://")
        .map(|(_, rest)| rest.find('/').map(|i| &rest[i..]).unwrap_or("/"))
        .unwrap_or(public_url);
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        "/media".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
