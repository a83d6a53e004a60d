//! Domain error types.

use std::time::Duration;

use common::OrderId;
use order_store::OrderStoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the order store.
    #[error("Order store error: {0}")]
    Store(#[from] OrderStoreError),

    /// The state machine rejected the operation.
    #[error("Order error: {0}")]
    Order(OrderError),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A storage call did not finish in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Concurrent writers kept winning the conditional update.
    #[error("Order {order_id} still conflicting after {attempts} attempts")]
    ConcurrencyExhausted { order_id: OrderId, attempts: u32 },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true for storage failures worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            DomainError::Store(e) => e.is_transient(),
            DomainError::Timeout { .. } | DomainError::ConcurrencyExhausted { .. } => true,
            _ => false,
        }
    }

    /// Returns the state-machine error, if that is what this is.
    pub fn as_order_error(&self) -> Option<&OrderError> {
        match self {
            DomainError::Order(e) => Some(e),
            _ => None,
        }
    }
}

impl From<OrderError> for DomainError {
    fn from(e: OrderError) -> Self {
        DomainError::Order(e)
    }
}
