//! HTTP API server with observability for the seat reservation engine.
//!
//! Exposes schedules, seat maps, bookings and payments over REST, with
//! structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use reservation::{LoggingNotificationSink, ReservationCoordinator};
use store::ReservationStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: ReservationStore> {
    pub coordinator: ReservationCoordinator<S, LoggingNotificationSink>,
}

impl<S: ReservationStore> AppState<S> {
    /// Wires a coordinator over `store` using the configured tunables.
    pub fn new(store: S, config: &Config) -> Self {
        let coordinator = ReservationCoordinator::new(store, LoggingNotificationSink)
            .with_config(config.reservation_config());
        Self { coordinator }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: ReservationStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::health::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/schedules", post(routes::schedules::create::<S>))
        .route("/schedules/{id}/seats", get(routes::schedules::seats::<S>))
        .route(
            "/bookings",
            post(routes::bookings::create::<S>).get(routes::bookings::list::<S>),
        )
        .route(
            "/bookings/reference/{reference}",
            get(routes::bookings::get_by_reference::<S>),
        )
        .route("/bookings/{id}", get(routes::bookings::get::<S>))
        .route("/bookings/{id}/payment", get(routes::bookings::payment::<S>))
        .route("/bookings/{id}/cancel", put(routes::bookings::cancel::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
