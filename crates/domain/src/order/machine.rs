//! Order state machine.
//!
//! Every operation is a pure check against the current record. It returns
//! the changes to apply, an empty list when the request is already
//! satisfied, or an [`OrderError`] when it is not allowed. Nothing here
//! touches storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    GatewayReference, Order, OrderChange, OrderError, OrderStatus, PaymentOutcome, PaymentStatus,
};

/// Details reported alongside a payment outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMeta {
    pub transaction_id: Option<String>,
    pub payment_method_type: Option<String>,
    /// When the payment was finalized according to the payer's side.
    pub finalized_at: Option<DateTime<Utc>>,
}

impl PaymentMeta {
    pub fn new(transaction_id: impl Into<String>) -> Self {
        Self {
            transaction_id: Some(transaction_id.into()),
            ..Self::default()
        }
    }

    pub fn with_method_type(mut self, method_type: impl Into<String>) -> Self {
        self.payment_method_type = Some(method_type.into());
        self
    }

    pub fn finalized_at(mut self, at: DateTime<Utc>) -> Self {
        self.finalized_at = Some(at);
        self
    }
}

impl Order {
    /// Writes the gateway reference. Write-once.
    pub fn attach_reference(
        &self,
        reference: GatewayReference,
    ) -> Result<Vec<OrderChange>, OrderError> {
        if !self.payment_method.is_gateway() {
            return Err(OrderError::PaymentMethodMismatch {
                method: self.payment_method,
                operation: "attach_reference",
            });
        }

        match &self.gateway_reference {
            None => Ok(vec![OrderChange::ReferenceAttached { reference }]),
            Some(existing) if *existing == reference => Ok(vec![]),
            Some(_) => Err(OrderError::ReferenceImmutable),
        }
    }

    /// Moves the order to `next`.
    ///
    /// Only the immediate successor is accepted. `Cancelled` is handled by
    /// [`Order::cancel`].
    pub fn advance(&self, next: OrderStatus) -> Result<Vec<OrderChange>, OrderError> {
        if next == OrderStatus::Cancelled {
            return self.cancel();
        }

        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        Ok(vec![OrderChange::StatusAdvanced {
            from: self.status,
            to: next,
        }])
    }

    /// Cancels the order from any non-terminal status.
    ///
    /// A paid order can still be cancelled; the result is flagged for a
    /// manual refund.
    pub fn cancel(&self) -> Result<Vec<OrderChange>, OrderError> {
        if !self.status.can_cancel() {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: OrderStatus::Cancelled,
            });
        }

        let refund_required = self.payment_status == PaymentStatus::Paid;
        if refund_required {
            tracing::warn!(
                order_id = %self.id,
                transaction_id = ?self.gateway_transaction_id,
                "Cancelling a paid order, refund must be handled manually"
            );
        }

        Ok(vec![OrderChange::OrderCancelled {
            from: self.status,
            refund_required,
        }])
    }

    /// Records a payment outcome reported by the gateway.
    ///
    /// `received_at` is used for `paid_at` only when the event carries no
    /// finalization time.
    pub fn apply_payment(
        &self,
        outcome: PaymentOutcome,
        meta: &PaymentMeta,
        received_at: DateTime<Utc>,
    ) -> Result<Vec<OrderChange>, OrderError> {
        if !self.payment_method.is_gateway() {
            return Err(OrderError::PaymentMethodMismatch {
                method: self.payment_method,
                operation: "apply_payment",
            });
        }

        self.settle(outcome, meta, received_at)
    }

    /// Records a payment settled outside the gateway (cash, bank transfer).
    pub fn record_offline_payment(
        &self,
        outcome: PaymentOutcome,
        at: DateTime<Utc>,
    ) -> Result<Vec<OrderChange>, OrderError> {
        if self.payment_method.is_gateway() {
            return Err(OrderError::PaymentMethodMismatch {
                method: self.payment_method,
                operation: "record_offline_payment",
            });
        }

        let meta = PaymentMeta {
            finalized_at: Some(at),
            ..PaymentMeta::default()
        };
        self.settle(outcome, &meta, at)
    }

    fn settle(
        &self,
        outcome: PaymentOutcome,
        meta: &PaymentMeta,
        received_at: DateTime<Utc>,
    ) -> Result<Vec<OrderChange>, OrderError> {
        let incoming = outcome.as_status();

        if self.payment_status == incoming {
            if meta.transaction_id.is_some() && meta.transaction_id != self.gateway_transaction_id
            {
                tracing::debug!(
                    order_id = %self.id,
                    recorded = ?self.gateway_transaction_id,
                    incoming = ?meta.transaction_id,
                    "Repeated payment outcome with a different transaction id"
                );
            }
            return Ok(vec![]);
        }

        if self.payment_status.is_terminal() {
            return Err(OrderError::PaymentConflict {
                recorded: self.payment_status,
                incoming,
            });
        }

        let paid_at = match outcome {
            PaymentOutcome::Paid => Some(meta.finalized_at.unwrap_or_else(|| {
                tracing::warn!(
                    order_id = %self.id,
                    "Payment has no finalization time, using receipt time"
                );
                received_at
            })),
            PaymentOutcome::Failed => None,
        };

        Ok(vec![OrderChange::PaymentRecorded {
            outcome,
            transaction_id: meta.transaction_id.clone(),
            payment_method_type: meta.payment_method_type.clone(),
            paid_at,
            confirmed: outcome == PaymentOutcome::Paid && self.status == OrderStatus::Pending,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{
        DeliveryInfo, LineItem, Money, NewOrder, OrderTotals, PaymentMethod,
    };
    use chrono::TimeZone;
    use common::{OrderId, RestaurantId};

    fn order_with(method: PaymentMethod) -> Order {
        let line_items = vec![
            LineItem::new("empanada", "Empanada", 2, Money::from_minor(15000)),
            LineItem::new("jugo", "Jugo", 1, Money::from_minor(10000)),
        ];
        let totals = OrderTotals::compute(&line_items, Money::from_minor(5000)).unwrap();
        Order::place(
            NewOrder {
                order_id: OrderId::new(),
                restaurant_id: RestaurantId::new(),
                line_items,
                totals,
                payment_method: method,
                delivery_info: DeliveryInfo::new("Calle 1", "555-0100"),
            },
            Utc::now(),
        )
    }

    fn apply_all(order: &mut Order, changes: Vec<OrderChange>) {
        for change in &changes {
            order.apply(change);
        }
    }

    fn finalized() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_advance_walks_the_sequence() {
        let mut order = order_with(PaymentMethod::Cash);

        for next in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivered,
        ] {
            let changes = order.advance(next).unwrap();
            assert_eq!(changes.len(), 1);
            apply_all(&mut order, changes);
            assert_eq!(order.status, next);
        }
    }

    #[test]
    fn test_advance_rejects_skip() {
        let order = order_with(PaymentMethod::Cash);

        let result = order.advance(OrderStatus::Ready);

        assert!(matches!(
            result,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Ready
            })
        ));
    }

    #[test]
    fn test_advance_rejects_same_status() {
        let order = order_with(PaymentMethod::Cash);
        assert!(order.advance(OrderStatus::Pending).is_err());
    }

    #[test]
    fn test_advance_to_cancelled_routes_to_cancel() {
        let order = order_with(PaymentMethod::Cash);

        let changes = order.advance(OrderStatus::Cancelled).unwrap();

        assert_eq!(
            changes,
            vec![OrderChange::OrderCancelled {
                from: OrderStatus::Pending,
                refund_required: false
            }]
        );
    }

    #[test]
    fn test_cancel_delivered_is_invalid() {
        let mut order = order_with(PaymentMethod::Cash);
        for next in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivered,
        ] {
            let changes = order.advance(next).unwrap();
            apply_all(&mut order, changes);
        }

        let result = order.cancel();

        assert!(matches!(
            result,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Cancelled
            })
        ));
    }

    #[test]
    fn test_cancel_twice_is_invalid() {
        let mut order = order_with(PaymentMethod::Cash);
        let changes = order.cancel().unwrap();
        apply_all(&mut order, changes);

        assert!(order.cancel().is_err());
    }

    #[test]
    fn test_paid_confirms_pending_order() {
        let mut order = order_with(PaymentMethod::Gateway);
        let meta = PaymentMeta::new("tx-1")
            .with_method_type("CARD")
            .finalized_at(finalized());

        let changes = order
            .apply_payment(PaymentOutcome::Paid, &meta, Utc::now())
            .unwrap();
        apply_all(&mut order, changes);

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.paid_at, Some(finalized()));
        assert_eq!(order.gateway_transaction_id.as_deref(), Some("tx-1"));
        assert_eq!(order.payment_method_type.as_deref(), Some("CARD"));
    }

    #[test]
    fn test_failed_keeps_status_pending() {
        let mut order = order_with(PaymentMethod::Gateway);

        let changes = order
            .apply_payment(PaymentOutcome::Failed, &PaymentMeta::new("tx-2"), Utc::now())
            .unwrap();
        apply_all(&mut order, changes);

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Failed);
        assert!(order.paid_at.is_none());
    }

    #[test]
    fn test_paid_without_finalization_time_uses_receipt_time() {
        let order = order_with(PaymentMethod::Gateway);
        let received = finalized();

        let changes = order
            .apply_payment(PaymentOutcome::Paid, &PaymentMeta::new("tx-3"), received)
            .unwrap();

        assert!(matches!(
            &changes[0],
            OrderChange::PaymentRecorded { paid_at: Some(at), .. } if *at == received
        ));
    }

    #[test]
    fn test_paid_on_preparing_order_does_not_touch_status() {
        let mut order = order_with(PaymentMethod::Gateway);
        for next in [OrderStatus::Confirmed, OrderStatus::Preparing] {
            let changes = order.advance(next).unwrap();
            apply_all(&mut order, changes);
        }

        let changes = order
            .apply_payment(PaymentOutcome::Paid, &PaymentMeta::new("tx-4"), Utc::now())
            .unwrap();
        apply_all(&mut order, changes);

        assert_eq!(order.status, OrderStatus::Preparing);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_replaying_same_outcome_is_noop() {
        let mut order = order_with(PaymentMethod::Gateway);
        let meta = PaymentMeta::new("tx-5").finalized_at(finalized());
        let changes = order
            .apply_payment(PaymentOutcome::Paid, &meta, Utc::now())
            .unwrap();
        apply_all(&mut order, changes);
        let before = order.clone();

        let changes = order
            .apply_payment(PaymentOutcome::Paid, &meta, Utc::now())
            .unwrap();

        assert!(changes.is_empty());
        assert_eq!(order, before);
    }

    #[test]
    fn test_contradicting_outcome_is_conflict() {
        let mut order = order_with(PaymentMethod::Gateway);
        let changes = order
            .apply_payment(PaymentOutcome::Paid, &PaymentMeta::new("tx-6"), Utc::now())
            .unwrap();
        apply_all(&mut order, changes);

        let result = order.apply_payment(PaymentOutcome::Failed, &PaymentMeta::new("tx-7"), Utc::now());

        assert!(matches!(
            result,
            Err(OrderError::PaymentConflict {
                recorded: PaymentStatus::Paid,
                incoming: PaymentStatus::Failed
            })
        ));
    }

    #[test]
    fn test_cancel_paid_order_flags_refund() {
        let mut order = order_with(PaymentMethod::Gateway);
        let changes = order
            .apply_payment(PaymentOutcome::Paid, &PaymentMeta::new("tx-8"), Utc::now())
            .unwrap();
        apply_all(&mut order, changes);

        let changes = order.cancel().unwrap();
        apply_all(&mut order, changes);

        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert!(order.refund_required);
    }

    #[test]
    fn test_gateway_payment_rejected_on_cash_order() {
        let order = order_with(PaymentMethod::Cash);

        let result = order.apply_payment(PaymentOutcome::Paid, &PaymentMeta::default(), Utc::now());

        assert!(matches!(
            result,
            Err(OrderError::PaymentMethodMismatch { .. })
        ));
    }

    #[test]
    fn test_offline_payment_on_cash_order() {
        let mut order = order_with(PaymentMethod::BankTransfer);
        let at = finalized();

        let changes = order.record_offline_payment(PaymentOutcome::Paid, at).unwrap();
        apply_all(&mut order, changes);

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.paid_at, Some(at));
        assert!(order.gateway_transaction_id.is_none());
        assert!(order.gateway_reference.is_none());
    }

    #[test]
    fn test_offline_payment_rejected_on_gateway_order() {
        let order = order_with(PaymentMethod::Gateway);
        assert!(matches!(
            order.record_offline_payment(PaymentOutcome::Paid, Utc::now()),
            Err(OrderError::PaymentMethodMismatch { .. })
        ));
    }

    #[test]
    fn test_attach_reference_is_write_once() {
        let mut order = order_with(PaymentMethod::Gateway);
        let reference = GatewayReference::for_order(order.id);

        let changes = order.attach_reference(reference.clone()).unwrap();
        apply_all(&mut order, changes);
        assert_eq!(order.gateway_reference, Some(reference.clone()));

        assert!(order.attach_reference(reference).unwrap().is_empty());
        assert!(matches!(
            order.attach_reference(GatewayReference::for_order(OrderId::new())),
            Err(OrderError::ReferenceImmutable)
        ));
    }

    #[test]
    fn test_attach_reference_rejected_on_cash_order() {
        let order = order_with(PaymentMethod::Cash);
        let reference = GatewayReference::for_order(order.id);
        assert!(order.attach_reference(reference).is_err());
    }
}
