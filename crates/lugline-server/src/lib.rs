// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! HTTP/WebSocket server for the Lugline delivery platform: REST routes for
//! customers, drivers, and admins, a broadcast-based socket hub, background
//! assignment/cleanup jobs, and outbound mail and assistant transports.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post, put};
use axum::Router;
use chrono::Utc;
use lugline_model::{Role, User};
use lugline_store::{Store, StoreError};
use tower_http::cors::CorsLayer;

pub mod assistant;
pub mod config;
mod http;
pub mod jobs;
pub mod mail;
mod middleware;
pub mod realtime;
mod security;
pub mod telemetry;

use assistant::AssistantBackend;
use config::AppConfig;
use mail::Mailer;
use middleware::rate_limit::FixedWindowLimiter;
use realtime::Hub;
use telemetry::{JobMetrics, RequestMetrics};

pub const CRATE_NAME: &str = "lugline-server";

/// Everything a handler can reach. Cheap to clone; all fields are shared.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Store,
    pub hub: Hub,
    pub mailer: Arc<dyn Mailer>,
    pub assistant: Arc<dyn AssistantBackend>,
    pub metrics: Arc<RequestMetrics>,
    pub jobs: Arc<JobMetrics>,
    pub(crate) limiter: Arc<FixedWindowLimiter>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Store,
        mailer: Arc<dyn Mailer>,
        assistant: Arc<dyn AssistantBackend>,
    ) -> Self {
        let limiter = FixedWindowLimiter::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        );
        Self {
            config: Arc::new(config),
            store,
            hub: Hub::new(),
            mailer,
            assistant,
            metrics: Arc::new(RequestMetrics::default()),
            jobs: Arc::new(JobMetrics::default()),
            limiter: Arc::new(limiter),
            request_id_seed: Arc::new(AtomicU64::new(1)),
            started_at: Instant::now(),
        }
    }
}

/// Creates the admin account named in the config when it does not exist yet.
/// Returns true when an account was created.
pub async fn seed_admin(store: &Store, email: &str, password: &str) -> Result<bool, StoreError> {
    if store.find_user_by_email(email).await?.is_some() {
        return Ok(false);
    }
    let admin = User::new("Lugline Admin", email, Role::Admin, Utc::now());
    let password_hash = security::hash_password(password);
    store.insert_user(admin, password_hash).await?;
    Ok(true)
}

pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/health", get(http::health::health))
        .route("/metrics", get(http::health::metrics))
        .route("/api/auth/register", post(http::auth::register))
        .route("/api/auth/login", post(http::auth::login))
        .route("/ws", get(realtime::ws::ws_handler));

    let session = Router::new()
        .route("/api/auth/me", get(http::auth::me))
        .route("/api/auth/logout", post(http::auth::logout))
        .route("/api/delivery", post(http::deliveries::create_delivery))
        .route(
            "/api/delivery/my-deliveries",
            get(http::deliveries::my_deliveries),
        )
        .route("/api/delivery/:id", get(http::deliveries::get_delivery))
        .route(
            "/api/delivery/:id/status",
            patch(http::deliveries::update_status),
        )
        .route("/api/ai/lassy", post(http::assistant::lassy))
        .route(
            "/api/ai/suggestions/:context",
            get(http::assistant::suggestions),
        )
        .route(
            "/api/notifications",
            get(http::notifications::list_notifications),
        )
        .route(
            "/api/notifications/read-all",
            put(http::notifications::mark_all_read),
        )
        .route(
            "/api/notifications/:id/read",
            put(http::notifications::mark_read),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_session,
        ));

    let driver = Router::new()
        .route(
            "/api/driver/available-deliveries",
            get(http::drivers::available_deliveries),
        )
        .route(
            "/api/driver/accept/:delivery_id",
            post(http::drivers::accept_delivery),
        )
        .route("/api/driver/location", post(http::drivers::update_location))
        .route(
            "/api/driver/complete/:delivery_id",
            post(http::drivers::complete_delivery),
        )
        .route(
            "/api/driver/availability",
            put(http::drivers::set_availability),
        )
        .route("/api/driver/stats", get(http::drivers::driver_stats))
        .route_layer(axum::middleware::from_fn(middleware::auth::require_driver))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_session,
        ));

    let admin = Router::new()
        .route("/api/admin/dashboard", get(http::admin::dashboard))
        .route("/api/admin/deliveries", get(http::admin::list_deliveries))
        .route(
            "/api/admin/assign-delivery",
            post(http::admin::assign_delivery),
        )
        .route("/api/admin/users", get(http::admin::list_users))
        .route(
            "/api/admin/users/:id/status",
            put(http::admin::set_user_status),
        )
        .route_layer(axum::middleware::from_fn(middleware::auth::require_admin))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_session,
        ));

    // Layers run last-added first: tracing wraps everything, rate limiting
    // sits inside CORS so preflights are never throttled.
    Router::new()
        .merge(public)
        .merge(session)
        .merge(driver)
        .merge(admin)
        .layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::request_tracing::request_tracing_middleware,
        ))
        .with_state(state)
}
