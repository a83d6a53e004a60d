//! Payment gateway client.

mod hosted;
mod memory;

pub use hosted::{HostedCheckoutConfig, HostedCheckoutGateway};
pub use memory::InMemoryPaymentGateway;

use async_trait::async_trait;
use common::OrderId;
use domain::{GatewayReference, Money};
use serde::Serialize;
use thiserror::Error;

/// Errors raised when opening a hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Checkout launch failed: {0}")]
    Launch(String),

    #[error("Gateway misconfigured: {0}")]
    Configuration(String),
}

/// What the gateway needs to open a hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLaunch {
    pub order_id: OrderId,
    pub reference: GatewayReference,
    pub amount: Money,
    pub customer_email: Option<String>,
    pub customer_phone: String,
}

/// A launched hosted checkout. The customer completes payment at
/// `redirect_url`; the outcome arrives later as a gateway event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub reference: GatewayReference,
    pub redirect_url: String,
}

/// Opens hosted checkouts on the card-payment gateway.
///
/// Implementations return as soon as the checkout is opened and never wait
/// for the payment to complete.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn launch_checkout(&self, launch: CheckoutLaunch)
    -> Result<CheckoutSession, GatewayError>;
}

#[async_trait]
impl<T: PaymentGateway + ?Sized> PaymentGateway for std::sync::Arc<T> {
    async fn launch_checkout(
        &self,
        launch: CheckoutLaunch,
    ) -> Result<CheckoutSession, GatewayError> {
        (**self).launch_checkout(launch).await
    }
}
