//! Order service providing the operations callers use on orders.

use chrono::Utc;
use common::OrderId;
use order_store::{OrderQuery, OrderStore};

use crate::actor::Actor;
use crate::command::{TransitionHandler, TransitionResult};
use crate::error::DomainError;

use super::{
    GatewayReference, NewOrder, Order, OrderChange, OrderError, OrderStatus, PaymentMeta,
    PaymentOutcome,
};

/// Whether a payment outcome changed the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentDisposition {
    /// The outcome was recorded by this call.
    Applied,

    /// The same outcome was already recorded; nothing was written.
    Duplicate,
}

impl PaymentDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentDisposition::Applied => "applied",
            PaymentDisposition::Duplicate => "duplicate",
        }
    }
}

/// Result of [`OrderService::apply_payment`].
#[derive(Debug, Clone)]
pub struct PaymentApplication {
    pub order: Order,
    pub disposition: PaymentDisposition,
}

/// Service for managing orders.
///
/// The only writer of order status and payment status. Every transition
/// goes through the [`TransitionHandler`], so staff actions and gateway
/// events on the same order never interleave into an invalid state.
pub struct OrderService<S: OrderStore> {
    handler: TransitionHandler<S>,
}

impl<S: OrderStore> OrderService<S> {
    /// Creates a new order service with the given order store.
    pub fn new(store: S) -> Self {
        Self {
            handler: TransitionHandler::new(store),
        }
    }

    /// Creates a service around a configured handler.
    pub fn with_handler(handler: TransitionHandler<S>) -> Self {
        Self { handler }
    }

    /// Returns a reference to the underlying transition handler.
    pub fn handler(&self) -> &TransitionHandler<S> {
        &self.handler
    }

    /// Stores a new pending order.
    #[tracing::instrument(skip(self, new), fields(order_id = %new.order_id, restaurant_id = %new.restaurant_id))]
    pub async fn create_order(&self, new: NewOrder) -> Result<Order, DomainError> {
        let payment_method = new.payment_method;
        let order = self.handler.insert(Order::place(new, Utc::now())).await?;

        metrics::counter!("orders_created_total", "payment_method" => payment_method.as_str())
            .increment(1);
        tracing::info!(total = %order.totals.total, %payment_method, "Order created");
        Ok(order)
    }

    /// Loads an order.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        self.handler.load(order_id).await
    }

    /// Loads an order on behalf of an actor.
    pub async fn get_order_for(
        &self,
        actor: &Actor,
        order_id: OrderId,
    ) -> Result<Order, DomainError> {
        let order = self
            .handler
            .load(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))?;
        actor.authorize(&order)?;
        Ok(order)
    }

    /// Loads the order holding a gateway reference.
    pub async fn find_by_reference(
        &self,
        reference: &GatewayReference,
    ) -> Result<Option<Order>, DomainError> {
        self.handler.load_by_reference(reference.as_str()).await
    }

    /// Lists orders visible to an actor. Restaurants only see their own.
    pub async fn list_orders(
        &self,
        actor: &Actor,
        mut query: OrderQuery,
    ) -> Result<Vec<Order>, DomainError> {
        if let Some(restaurant_id) = actor.restaurant_scope() {
            query.restaurant_id = Some(restaurant_id);
        }
        self.handler.query(query).await
    }

    /// Writes the gateway reference derived from the order id.
    #[tracing::instrument(skip(self))]
    pub async fn attach_reference(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let reference = GatewayReference::for_order(order_id);
        let result = self
            .handler
            .execute(order_id, |order| order.attach_reference(reference.clone()))
            .await?;

        tracing::info!(reference = %reference, "Gateway reference attached");
        Ok(result.order)
    }

    /// Moves an order one step forward, or cancels it.
    #[tracing::instrument(skip(self))]
    pub async fn advance(
        &self,
        actor: &Actor,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<TransitionResult, DomainError> {
        let result = self
            .handler
            .execute(order_id, |order| {
                actor.authorize(order)?;
                order.advance(next)
            })
            .await?;

        record_transitions(&result.changes);
        Ok(result)
    }

    /// Cancels an order from any non-terminal status.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(
        &self,
        actor: &Actor,
        order_id: OrderId,
    ) -> Result<TransitionResult, DomainError> {
        let result = self
            .handler
            .execute(order_id, |order| {
                actor.authorize(order)?;
                order.cancel()
            })
            .await?;

        record_transitions(&result.changes);
        Ok(result)
    }

    /// Records a gateway payment outcome.
    ///
    /// Replaying an outcome that is already recorded succeeds with
    /// [`PaymentDisposition::Duplicate`]. A contradicting outcome fails with
    /// [`OrderError::PaymentConflict`] and is not written.
    #[tracing::instrument(skip(self, meta), fields(transaction_id = ?meta.transaction_id))]
    pub async fn apply_payment(
        &self,
        order_id: OrderId,
        outcome: PaymentOutcome,
        meta: &PaymentMeta,
    ) -> Result<PaymentApplication, DomainError> {
        let received_at = Utc::now();
        let result = self
            .handler
            .execute(order_id, |order| {
                order.apply_payment(outcome, meta, received_at)
            })
            .await;

        let result = match result {
            Ok(result) => result,
            Err(DomainError::Order(e @ OrderError::PaymentConflict { .. })) => {
                metrics::counter!("payment_conflicts_total").increment(1);
                return Err(DomainError::Order(e));
            }
            Err(e) => return Err(e),
        };

        record_transitions(&result.changes);
        let disposition = if result.is_noop() {
            PaymentDisposition::Duplicate
        } else {
            PaymentDisposition::Applied
        };

        Ok(PaymentApplication {
            order: result.order,
            disposition,
        })
    }

    /// Records a cash or bank-transfer payment confirmed by staff.
    #[tracing::instrument(skip(self))]
    pub async fn record_offline_payment(
        &self,
        actor: &Actor,
        order_id: OrderId,
        outcome: PaymentOutcome,
    ) -> Result<TransitionResult, DomainError> {
        let at = Utc::now();
        let result = self
            .handler
            .execute(order_id, |order| {
                actor.authorize(order)?;
                order.record_offline_payment(outcome, at)
            })
            .await?;

        record_transitions(&result.changes);
        Ok(result)
    }
}

fn record_transitions(changes: &[OrderChange]) {
    for change in changes {
        let to = match change {
            OrderChange::StatusAdvanced { to, .. } => *to,
            OrderChange::OrderCancelled { .. } => OrderStatus::Cancelled,
            OrderChange::PaymentRecorded {
                confirmed: true, ..
            } => OrderStatus::Confirmed,
            _ => continue,
        };
        metrics::counter!("order_transitions_total", "to" => to.as_str()).increment(1);
        tracing::info!(change = change.change_type(), status = %to, "Order status changed");
    }
}
