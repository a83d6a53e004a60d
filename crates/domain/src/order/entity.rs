//! The order record.

use chrono::{DateTime, Utc};
use common::{OrderId, RestaurantId};
use order_store::{OrderDocument, Version};
use serde::{Deserialize, Serialize};

use super::{
    DeliveryInfo, GatewayReference, LineItem, OrderChange, OrderStatus, OrderTotals, PaymentMethod,
    PaymentOutcome, PaymentStatus,
};
use crate::error::DomainError;

/// Input for placing a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub restaurant_id: RestaurantId,
    pub line_items: Vec<LineItem>,
    pub totals: OrderTotals,
    pub payment_method: PaymentMethod,
    pub delivery_info: DeliveryInfo,
}

/// A customer's order, tracked through fulfillment and payment.
///
/// `status` and `payment_status` are only changed through the state machine
/// methods, which return [`OrderChange`]s, and [`Order::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub restaurant_id: RestaurantId,
    pub line_items: Vec<LineItem>,
    #[serde(flatten)]
    pub totals: OrderTotals,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub gateway_reference: Option<GatewayReference>,
    pub gateway_transaction_id: Option<String>,
    pub payment_method_type: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    /// Set when an order ends up both paid and cancelled.
    #[serde(default)]
    pub refund_required: bool,
    pub delivery_info: DeliveryInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip)]
    pub version: Version,
}

impl Order {
    /// Creates a pending order that has not been stored yet.
    pub fn place(new: NewOrder, now: DateTime<Utc>) -> Self {
        Self {
            id: new.order_id,
            restaurant_id: new.restaurant_id,
            line_items: new.line_items,
            totals: new.totals,
            payment_method: new.payment_method,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            gateway_reference: None,
            gateway_transaction_id: None,
            payment_method_type: None,
            paid_at: None,
            refund_required: false,
            delivery_info: new.delivery_info,
            created_at: now,
            updated_at: now,
            version: Version::initial(),
        }
    }

    /// Applies a change to the record.
    pub fn apply(&mut self, change: &OrderChange) {
        match change {
            OrderChange::ReferenceAttached { reference } => {
                self.gateway_reference = Some(reference.clone());
            }
            OrderChange::StatusAdvanced { to, .. } => {
                self.status = *to;
            }
            OrderChange::PaymentRecorded {
                outcome,
                transaction_id,
                payment_method_type,
                paid_at,
                confirmed,
            } => {
                self.payment_status = outcome.as_status();
                if transaction_id.is_some() {
                    self.gateway_transaction_id = transaction_id.clone();
                }
                if payment_method_type.is_some() {
                    self.payment_method_type = payment_method_type.clone();
                }
                self.paid_at = *paid_at;
                if *confirmed {
                    self.status = OrderStatus::Confirmed;
                }
                if *outcome == PaymentOutcome::Paid && self.status == OrderStatus::Cancelled {
                    self.refund_required = true;
                }
            }
            OrderChange::OrderCancelled {
                refund_required, ..
            } => {
                self.status = OrderStatus::Cancelled;
                self.refund_required |= *refund_required;
            }
        }
    }

    /// Converts the order into a store document carrying its current version.
    pub fn to_document(&self) -> Result<OrderDocument, DomainError> {
        let document = OrderDocument::builder()
            .order_id(self.id)
            .restaurant_id(self.restaurant_id)
            .gateway_reference(self.gateway_reference.as_ref().map(|r| r.to_string()))
            .status(self.status.as_str())
            .payment_status(self.payment_status.as_str())
            .version(self.version)
            .created_at(self.created_at)
            .updated_at(self.updated_at)
            .body(self)?
            .build()?;
        Ok(document)
    }

    /// Restores an order from a store document.
    pub fn from_document(document: &OrderDocument) -> Result<Self, DomainError> {
        let mut order: Order = document.decode()?;
        order.version = document.version;
        Ok(order)
    }
}
