//! Shared application state.

use std::sync::Arc;

use checkout::{CheckoutCoordinator, PaymentGateway};
use domain::OrderService;
use order_store::OrderStore;
use webhook::{SignatureVerifier, WebhookReceiver};

/// Gateway client chosen at startup.
pub type SharedGateway = Arc<dyn PaymentGateway>;

/// Shared application state accessible from all handlers.
///
/// The checkout coordinator and the webhook receiver share one
/// [`OrderService`], so both go through the same conditional writes.
pub struct AppState<S: OrderStore> {
    pub orders: Arc<OrderService<S>>,
    pub checkout: CheckoutCoordinator<S, SharedGateway>,
    pub receiver: WebhookReceiver<S>,
    pub verifier: SignatureVerifier,
}

impl<S: OrderStore> AppState<S> {
    pub fn new(
        orders: Arc<OrderService<S>>,
        gateway: SharedGateway,
        verifier: SignatureVerifier,
    ) -> Self {
        Self {
            checkout: CheckoutCoordinator::new(Arc::clone(&orders), gateway),
            receiver: WebhookReceiver::new(Arc::clone(&orders)),
            orders,
            verifier,
        }
    }
}
