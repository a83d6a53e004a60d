//! Checkout coordinator: cart snapshot to stored order to hosted checkout.

use std::sync::Arc;
use std::time::Instant;

use common::OrderId;
use domain::{DeliveryInfo, GatewayReference, NewOrder, Order, OrderService, PaymentMethod};
use order_store::OrderStore;
use serde::{Deserialize, Serialize};

use crate::cart::CartSnapshot;
use crate::error::{CheckoutError, Result, ValidationError};
use crate::gateway::{CheckoutLaunch, CheckoutSession, PaymentGateway};

/// A customer's checkout confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub cart: CartSnapshot,
    pub delivery_info: DeliveryInfo,
    pub payment_method: PaymentMethod,
}

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    /// The stored order, with its reference for gateway payments.
    pub order: Order,

    /// The hosted checkout to send the customer to, for gateway payments.
    pub session: Option<CheckoutSession>,
}

/// Turns a confirmed cart into a stored order and, for gateway payments,
/// opens the hosted checkout.
///
/// For gateway payments the reference is written to the order before the
/// gateway is called, so any event the gateway sends can be matched to the
/// order. The coordinator never waits for the payment itself.
pub struct CheckoutCoordinator<S, G>
where
    S: OrderStore,
    G: PaymentGateway,
{
    orders: Arc<OrderService<S>>,
    gateway: G,
}

impl<S, G> CheckoutCoordinator<S, G>
where
    S: OrderStore,
    G: PaymentGateway,
{
    pub fn new(orders: Arc<OrderService<S>>, gateway: G) -> Self {
        Self { orders, gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Creates an order from a checkout request.
    ///
    /// Failures are returned to the caller as is; there is no internal
    /// retry.
    #[tracing::instrument(
        skip(self, request),
        fields(
            restaurant_id = %request.cart.restaurant_id,
            payment_method = %request.payment_method,
            order_id
        )
    )]
    pub async fn create_order(&self, request: CheckoutRequest) -> Result<CheckoutReceipt> {
        let started = Instant::now();
        let result = self.run(request).await;
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());

        if let Err(ref e) = result {
            tracing::warn!(error = %e, order_id = ?e.order_id(), "Checkout failed");
        }
        result
    }

    async fn run(&self, request: CheckoutRequest) -> Result<CheckoutReceipt> {
        let CheckoutRequest {
            cart,
            delivery_info,
            payment_method,
        } = request;

        cart.validate()?;
        let missing = delivery_info.missing_fields();
        if !missing.is_empty() {
            return Err(ValidationError::IncompleteDeliveryInfo { missing }.into());
        }

        let order_id = OrderId::new();
        tracing::Span::current().record("order_id", tracing::field::display(order_id));

        let new_order = NewOrder {
            order_id,
            restaurant_id: cart.restaurant_id,
            line_items: cart.line_items(),
            totals: cart.totals()?,
            payment_method,
            delivery_info,
        };
        let order = self
            .orders
            .create_order(new_order)
            .await
            .map_err(CheckoutError::OrderCreation)?;

        if !payment_method.is_gateway() {
            return Ok(CheckoutReceipt {
                order,
                session: None,
            });
        }

        let order = self
            .orders
            .attach_reference(order_id)
            .await
            .map_err(|source| CheckoutError::ReferenceWrite { order_id, source })?;

        let reference = order
            .gateway_reference
            .clone()
            .unwrap_or_else(|| GatewayReference::for_order(order_id));

        let launch = CheckoutLaunch {
            order_id,
            reference,
            amount: order.totals.total,
            customer_email: order.delivery_info.email.clone(),
            customer_phone: order.delivery_info.phone.clone(),
        };
        let session = self
            .gateway
            .launch_checkout(launch)
            .await
            .map_err(|source| CheckoutError::Gateway { order_id, source })?;

        tracing::info!(reference = %session.reference, "Hosted checkout launched");
        Ok(CheckoutReceipt {
            order,
            session: Some(session),
        })
    }
}
