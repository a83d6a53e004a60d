//! Changes produced by the order state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GatewayReference, OrderStatus, PaymentOutcome};

/// A single change to an order, produced by a state-machine check and
/// applied with [`Order::apply`](super::Order::apply).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderChange {
    /// The gateway reference was written.
    ReferenceAttached { reference: GatewayReference },

    /// The status moved one step forward.
    StatusAdvanced { from: OrderStatus, to: OrderStatus },

    /// A terminal payment outcome was recorded.
    ///
    /// `confirmed` is set when the same write moved a pending order to
    /// confirmed.
    PaymentRecorded {
        outcome: PaymentOutcome,
        transaction_id: Option<String>,
        payment_method_type: Option<String>,
        paid_at: Option<DateTime<Utc>>,
        confirmed: bool,
    },

    /// The order was cancelled.
    OrderCancelled {
        from: OrderStatus,
        refund_required: bool,
    },
}

impl OrderChange {
    /// Returns the change type as a static string.
    pub fn change_type(&self) -> &'static str {
        match self {
            OrderChange::ReferenceAttached { .. } => "ReferenceAttached",
            OrderChange::StatusAdvanced { .. } => "StatusAdvanced",
            OrderChange::PaymentRecorded { .. } => "PaymentRecorded",
            OrderChange::OrderCancelled { .. } => "OrderCancelled",
        }
    }
}
