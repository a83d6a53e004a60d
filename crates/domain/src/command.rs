//! Atomic read-check-write against the order store.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use common::OrderId;
use order_store::{OrderQuery, OrderStore, OrderStoreError};

use crate::error::DomainError;
use crate::order::{Order, OrderChange, OrderError};

/// Result of a transition.
#[derive(Debug, Clone)]
pub struct TransitionResult {
    /// The order after the changes, or as loaded when nothing changed.
    pub order: Order,

    /// The changes that were written. Empty when the request was already
    /// satisfied and nothing was stored.
    pub changes: Vec<OrderChange>,
}

impl TransitionResult {
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Runs state-machine checks against stored orders.
///
/// Each transition loads the order, runs the check on that snapshot and
/// writes the result with a conditional update on the loaded version. If
/// another writer got there first, the order is re-read and the check runs
/// again, up to `max_attempts` times. Every store call is bounded by
/// `timeout`.
pub struct TransitionHandler<S: OrderStore> {
    store: S,
    timeout: Duration,
    max_attempts: u32,
}

impl<S: OrderStore> TransitionHandler<S> {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Creates a new handler with the default timeout and retry bound.
    pub fn new(store: S) -> Self {
        Self {
            store,
            timeout: Self::DEFAULT_TIMEOUT,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Returns a reference to the underlying order store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, DomainError>
    where
        F: Future<Output = order_store::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::warn!(operation, timeout = ?self.timeout, "Order store call timed out");
                Err(DomainError::Timeout {
                    operation,
                    after: self.timeout,
                })
            }
        }
    }

    /// Loads an order, returning None if it doesn't exist.
    pub async fn load(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        match self.bounded("get", self.store.get(order_id)).await? {
            Some(document) => Ok(Some(Order::from_document(&document)?)),
            None => Ok(None),
        }
    }

    /// Loads the order holding a gateway reference.
    pub async fn load_by_reference(&self, reference: &str) -> Result<Option<Order>, DomainError> {
        match self
            .bounded("get_by_reference", self.store.get_by_reference(reference))
            .await?
        {
            Some(document) => Ok(Some(Order::from_document(&document)?)),
            None => Ok(None),
        }
    }

    /// Stores a new order and returns it with its stored version.
    pub async fn insert(&self, mut order: Order) -> Result<Order, DomainError> {
        let document = order.to_document()?;
        order.version = self.bounded("insert", self.store.insert(document)).await?;
        Ok(order)
    }

    pub async fn query(&self, query: OrderQuery) -> Result<Vec<Order>, DomainError> {
        self.bounded("query", self.store.query(query))
            .await?
            .iter()
            .map(Order::from_document)
            .collect()
    }

    /// Runs `check` against the stored order and writes the changes it
    /// returns.
    ///
    /// `check` may run more than once if a concurrent writer updates the
    /// order in between; it always sees the latest stored state.
    pub async fn execute<F>(
        &self,
        order_id: OrderId,
        check: F,
    ) -> Result<TransitionResult, DomainError>
    where
        F: Fn(&Order) -> Result<Vec<OrderChange>, OrderError>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let mut order = self
                .load(order_id)
                .await?
                .ok_or(DomainError::OrderNotFound(order_id))?;
            let expected = order.version;

            let changes = check(&order)?;
            if changes.is_empty() {
                return Ok(TransitionResult { order, changes });
            }

            for change in &changes {
                order.apply(change);
            }
            order.updated_at = Utc::now();

            let document = order.to_document()?;
            match self
                .bounded("update", self.store.update(document, expected))
                .await
            {
                Ok(version) => {
                    order.version = version;
                    return Ok(TransitionResult { order, changes });
                }
                Err(DomainError::Store(OrderStoreError::VersionConflict { actual, .. })) => {
                    if attempt >= self.max_attempts {
                        return Err(DomainError::ConcurrencyExhausted {
                            order_id,
                            attempts: attempt,
                        });
                    }
                    tracing::debug!(
                        %order_id,
                        %expected,
                        %actual,
                        attempt,
                        "Concurrent update, re-reading order"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}
