//! Store Management System - Backend Server
//!
//! Inventory, procurement, sales and dispatch for a multi-branch hardware
//! retailer, with realtime stock and sales notifications over WebSocket.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;
use services::NotificationService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub notifications: NotificationService,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, config: Config) -> Self {
        let notifications = NotificationService::new(config.inventory.event_channel_capacity);
        Self {
            db,
            config: Arc::new(config),
            notifications,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api", routes::api_routes(state.clone()))
        .nest("/ws", routes::ws_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Store Management System API"
}
