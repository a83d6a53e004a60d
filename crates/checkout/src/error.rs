//! Checkout error types.

use common::OrderId;
use domain::DomainError;
use thiserror::Error;

use crate::gateway::GatewayError;

/// Reasons a checkout request is rejected before anything is stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid quantity {quantity} for {product_ref} (must be greater than 0)")]
    InvalidQuantity { product_ref: String, quantity: u32 },

    #[error("Invalid price {price} for {product_ref} (must not be negative)")]
    InvalidPrice { product_ref: String, price: i64 },

    #[error("Delivery fee must not be negative")]
    NegativeDeliveryFee,

    /// A line total, the subtotal or the total does not fit in an amount.
    #[error("Cart amounts are too large")]
    AmountOverflow,

    /// Required delivery fields are blank.
    #[error("Incomplete delivery info, missing: {}", missing.join(", "))]
    IncompleteDeliveryInfo { missing: Vec<&'static str> },
}

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The request was rejected before any mutation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The order could not be stored. No gateway call was made.
    #[error("Order creation failed: {0}")]
    OrderCreation(#[source] DomainError),

    /// The order was stored but its gateway reference could not be written.
    /// The order is left as is for manual follow-up.
    #[error("Order {order_id} created but reference write failed: {source}")]
    ReferenceWrite {
        order_id: OrderId,
        #[source]
        source: DomainError,
    },

    /// The order and reference were stored but the hosted checkout could
    /// not be opened.
    #[error("Order {order_id} created but checkout launch failed: {source}")]
    Gateway {
        order_id: OrderId,
        #[source]
        source: GatewayError,
    },
}

impl CheckoutError {
    /// The stored order affected by the failure, if one was created.
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            CheckoutError::ReferenceWrite { order_id, .. }
            | CheckoutError::Gateway { order_id, .. } => Some(*order_id),
            _ => None,
        }
    }

    /// Returns true for storage failures worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            CheckoutError::OrderCreation(e) | CheckoutError::ReferenceWrite { source: e, .. } => {
                e.is_transient()
            }
            _ => false,
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
