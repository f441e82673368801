//! Storefront API library
//!
//! Product catalog, shipping quotes and hosted checkout behind a REST surface,
//! plus the storefront client logic (cart, browsing) as plain Rust.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod storefront;
pub mod tracing;

use axum::{http::Uri, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<config::AppConfig>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        services: handlers::AppServices,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            services,
        }
    }
}

/// REST surface mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/produtos", handlers::products::products_routes())
        .nest("/frete", handlers::shipping::shipping_routes())
        .nest("/checkout", handlers::checkout::checkout_routes())
}

async fn route_not_found(uri: Uri) -> errors::ApiError {
    errors::ApiError::NotFound(format!("No route for {}", uri.path()))
}

/// Full application router with request ids, HTTP tracing and compression.
///
/// CORS is left to the caller since it depends on deployment configuration.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::health::health_routes())
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        .fallback(route_not_found)
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
