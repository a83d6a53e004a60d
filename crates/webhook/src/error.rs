//! Webhook error types.

use common::OrderId;
use domain::DomainError;
use thiserror::Error;

/// Failures the gateway should retry.
///
/// Every variant maps to a 5xx response so the gateway redelivers the
/// event later. Events that must not be retried are reported as a
/// [`WebhookOutcome`](crate::WebhookOutcome) instead.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No order exists for the reference yet.
    #[error("No order found for reference {reference}")]
    OrderNotFound { order_id: OrderId, reference: String },

    /// The order exists but its reference write is not visible yet.
    #[error("Order {order_id} has no gateway reference yet")]
    ReferenceNotAttached { order_id: OrderId },

    /// Storage lookup or write failed.
    #[error("Storage error: {0}")]
    Storage(#[source] DomainError),
}

impl WebhookError {
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookError::OrderNotFound { .. } => "order_not_found",
            WebhookError::ReferenceNotAttached { .. } => "reference_not_attached",
            WebhookError::Storage(_) => "storage",
        }
    }
}
