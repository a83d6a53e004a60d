//! Order entity, state machine and service.

mod changes;
mod entity;
mod machine;
mod service;
mod state;
mod value_objects;

pub use changes::OrderChange;
pub use entity::{NewOrder, Order};
pub use machine::PaymentMeta;
pub use service::{OrderService, PaymentApplication, PaymentDisposition};
pub use state::{OrderStatus, PaymentOutcome, PaymentStatus};
pub use value_objects::{
    DeliveryInfo, GatewayReference, LineItem, Money, OrderTotals, PaymentMethod, ProductRef,
};

use thiserror::Error;

/// Errors raised by the order state machine.
///
/// None of these leave the record changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The requested status change is not the next step, or the order is
    /// already terminal.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A payment outcome contradicts the one already recorded.
    #[error("Payment conflict: recorded {recorded}, incoming {incoming}")]
    PaymentConflict {
        recorded: PaymentStatus,
        incoming: PaymentStatus,
    },

    /// The operation does not apply to the order's payment method.
    #[error("Cannot {operation} on an order paid by {method}")]
    PaymentMethodMismatch {
        method: PaymentMethod,
        operation: &'static str,
    },

    #[error("Gateway reference is already set and cannot change")]
    ReferenceImmutable,

    /// The acting restaurant does not own the order.
    #[error("Order belongs to another restaurant")]
    NotOwnedByActor,
}

/// A status string that does not name a known status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown status: {0}")]
pub struct UnknownStatus(pub String);
