//! HTTP server for the restaurant order lifecycle.
//!
//! Exposes customer checkout, the payment gateway webhook and the order
//! console over one shared [`OrderService`](domain::OrderService), with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use checkout::{HostedCheckoutGateway, InMemoryPaymentGateway};
use domain::{OrderService, TransitionHandler};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use webhook::SignatureVerifier;

use config::Config;
use state::{AppState, SharedGateway};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/checkout", post(routes::checkout::create::<S>))
        .route("/webhooks/gateway", post(routes::webhooks::receive::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/advance", post(routes::orders::advance::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route(
            "/orders/{id}/payment",
            post(routes::orders::record_payment::<S>),
        )
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

/// Creates the application state for a store, wiring the gateway client and
/// signature verifier from configuration.
///
/// Without hosted checkout settings, gateway checkouts go to an in-memory
/// gateway that only records launches.
pub fn create_default_state<S: OrderStore + 'static>(store: S, config: &Config) -> Arc<AppState<S>> {
    let orders = Arc::new(OrderService::with_handler(
        TransitionHandler::new(store).with_timeout(config.store_timeout),
    ));

    let gateway: SharedGateway = match &config.hosted_checkout {
        Some(hosted) => Arc::new(HostedCheckoutGateway::new(hosted.clone())),
        None => {
            tracing::warn!("hosted checkout not configured, using in-memory payment gateway");
            Arc::new(InMemoryPaymentGateway::new())
        }
    };

    let verifier = SignatureVerifier::new(config.gateway_events_secret.clone())
        .with_tolerance_secs(config.signature_tolerance_secs);

    Arc::new(AppState::new(orders, gateway, verifier))
}
