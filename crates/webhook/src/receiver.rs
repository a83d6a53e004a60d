//! Webhook receiver: applies gateway events to orders.

use std::sync::Arc;

use common::OrderId;
use domain::{
    DomainError, GatewayReference, Order, OrderError, OrderService, PaymentDisposition,
    PaymentStatus,
};
use order_store::OrderStore;

use crate::envelope::{GatewayEvent, map_status};
use crate::error::WebhookError;

/// Why an event was acknowledged without changing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Not a `transaction.updated` event.
    UnhandledEvent(String),
    /// The event has no transaction.
    MissingTransaction,
    /// The reference is not `ORDER-{uuid}`.
    MalformedReference(String),
    /// The transaction status is not final.
    UnhandledStatus(String),
    /// The order is not paid through the gateway.
    NotGatewayOrder(OrderId),
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::UnhandledEvent(_) => "unhandled_event",
            IgnoreReason::MissingTransaction => "missing_transaction",
            IgnoreReason::MalformedReference(_) => "malformed_reference",
            IgnoreReason::UnhandledStatus(_) => "unhandled_status",
            IgnoreReason::NotGatewayOrder(_) => "not_gateway_order",
        }
    }
}

/// Result of handling an event that the gateway must not retry.
#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    /// The outcome was recorded on the order.
    Applied { order: Order, transaction_id: String },

    /// The same outcome was already recorded.
    Duplicate { order: Order, transaction_id: String },

    /// The outcome contradicts the recorded one. Logged for manual review.
    Conflict {
        order_id: OrderId,
        recorded: PaymentStatus,
        incoming: PaymentStatus,
        transaction_id: String,
    },

    /// Deliberately discarded.
    Ignored(IgnoreReason),
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Applied { .. } => "applied",
            WebhookOutcome::Duplicate { .. } => "duplicate",
            WebhookOutcome::Conflict { .. } => "conflict",
            WebhookOutcome::Ignored(_) => "ignored",
        }
    }

    /// The order the event was applied to, if any.
    pub fn order(&self) -> Option<&Order> {
        match self {
            WebhookOutcome::Applied { order, .. } | WebhookOutcome::Duplicate { order, .. } => {
                Some(order)
            }
            _ => None,
        }
    }
}

/// Applies gateway events through the order state machine.
///
/// Each event is handled to completion in one call. Lookups and writes are
/// bounded by the order service's storage timeout. There is no internal
/// retry: retryable failures are returned as [`WebhookError`] and the
/// gateway redelivers.
pub struct WebhookReceiver<S: OrderStore> {
    orders: Arc<OrderService<S>>,
}

impl<S: OrderStore> WebhookReceiver<S> {
    pub fn new(orders: Arc<OrderService<S>>) -> Self {
        Self { orders }
    }

    #[tracing::instrument(
        skip(self, event),
        fields(event_type = %event.event_type, reference, transaction_id)
    )]
    pub async fn handle(&self, event: GatewayEvent) -> Result<WebhookOutcome, WebhookError> {
        let result = self.process(event).await;

        let label = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(_) => "retry",
        };
        metrics::counter!("webhook_events_total", "outcome" => label).increment(1);

        match &result {
            Ok(WebhookOutcome::Ignored(reason)) => {
                tracing::info!(reason = reason.as_str(), "Webhook event ignored");
            }
            Ok(outcome) => tracing::info!(outcome = outcome.as_str(), "Webhook event handled"),
            Err(e) => tracing::warn!(error = %e, kind = e.kind(), "Webhook event not applied, sender should retry"),
        }
        result
    }

    async fn process(&self, event: GatewayEvent) -> Result<WebhookOutcome, WebhookError> {
        if !event.is_transaction_update() {
            return Ok(WebhookOutcome::Ignored(IgnoreReason::UnhandledEvent(
                event.event_type,
            )));
        }
        let Some(transaction) = event.transaction else {
            return Ok(WebhookOutcome::Ignored(IgnoreReason::MissingTransaction));
        };

        let span = tracing::Span::current();
        span.record("reference", transaction.reference.as_str());
        span.record("transaction_id", transaction.id.as_str());

        let Some((reference, order_id)) = GatewayReference::parse(&transaction.reference)
            .and_then(|r| r.order_id().map(|id| (r, id)))
        else {
            return Ok(WebhookOutcome::Ignored(IgnoreReason::MalformedReference(
                transaction.reference,
            )));
        };

        // The reference is the lookup key. Falling back to the embedded id
        // tells an unknown order apart from one whose reference is not
        // written yet.
        let found = self
            .orders
            .find_by_reference(&reference)
            .await
            .map_err(WebhookError::Storage)?;
        let order = match found {
            Some(order) => order,
            None => self
                .orders
                .get_order(order_id)
                .await
                .map_err(WebhookError::Storage)?
                .ok_or_else(|| WebhookError::OrderNotFound {
                    order_id,
                    reference: transaction.reference.clone(),
                })?,
        };

        let Some(outcome) = map_status(&transaction.status) else {
            return Ok(WebhookOutcome::Ignored(IgnoreReason::UnhandledStatus(
                transaction.status,
            )));
        };

        if !order.payment_method.is_gateway() {
            tracing::warn!(%order_id, payment_method = %order.payment_method, "Gateway event for a non-gateway order");
            return Ok(WebhookOutcome::Ignored(IgnoreReason::NotGatewayOrder(
                order_id,
            )));
        }
        match &order.gateway_reference {
            None => return Err(WebhookError::ReferenceNotAttached { order_id }),
            Some(stored) if *stored != reference => {
                tracing::warn!(
                    %order_id,
                    stored = %stored,
                    "Event reference differs from the stored one"
                );
                return Ok(WebhookOutcome::Ignored(IgnoreReason::MalformedReference(
                    transaction.reference,
                )));
            }
            Some(_) => {}
        }

        if let Some(amount) = transaction.amount
            && amount != order.totals.total.minor()
        {
            metrics::counter!("webhook_amount_mismatch_total").increment(1);
            tracing::warn!(
                %order_id,
                event_amount = amount,
                order_total = order.totals.total.minor(),
                "Gateway amount does not match order total"
            );
        }

        let meta = transaction.payment_meta();
        match self.orders.apply_payment(order_id, outcome, &meta).await {
            Ok(application) => Ok(match application.disposition {
                PaymentDisposition::Applied => WebhookOutcome::Applied {
                    order: application.order,
                    transaction_id: transaction.id,
                },
                PaymentDisposition::Duplicate => WebhookOutcome::Duplicate {
                    order: application.order,
                    transaction_id: transaction.id,
                },
            }),
            Err(DomainError::Order(OrderError::PaymentConflict { recorded, incoming })) => {
                tracing::error!(
                    %order_id,
                    %recorded,
                    %incoming,
                    transaction_id = %transaction.id,
                    "Payment outcome contradicts recorded status, needs manual review"
                );
                Ok(WebhookOutcome::Conflict {
                    order_id,
                    recorded,
                    incoming,
                    transaction_id: transaction.id,
                })
            }
            Err(DomainError::Order(OrderError::PaymentMethodMismatch { .. })) => Ok(
                WebhookOutcome::Ignored(IgnoreReason::NotGatewayOrder(order_id)),
            ),
            Err(DomainError::OrderNotFound(order_id)) => Err(WebhookError::OrderNotFound {
                order_id,
                reference: transaction.reference,
            }),
            Err(e) => Err(WebhookError::Storage(e)),
        }
    }
}
