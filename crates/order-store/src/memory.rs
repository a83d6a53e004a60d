use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    OrderDocument, OrderId, OrderQuery, OrderStoreError, Result, Version,
    store::{OrderStore, validate_document},
};

#[derive(Debug, Default)]
struct State {
    orders: HashMap<OrderId, OrderDocument>,
    references: HashMap<String, OrderId>,
}

#[derive(Debug, Default)]
struct Faults {
    unavailable: bool,
    latency: Option<Duration>,
}

/// In-memory order store.
///
/// Provides the same conditional-write semantics as the PostgreSQL
/// implementation. Used by tests and by the server when no database is
/// configured. Clones share the same underlying state.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<State>>,
    faults: Arc<RwLock<Faults>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all orders.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.orders.clear();
        state.references.clear();
    }

    /// Makes every call fail with `Unavailable` until switched back.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.faults.write().await.unavailable = unavailable;
    }

    /// Delays every call by the given duration.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.faults.write().await.latency = latency;
    }

    async fn check_faults(&self) -> Result<()> {
        let (unavailable, latency) = {
            let faults = self.faults.read().await;
            (faults.unavailable, faults.latency)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if unavailable {
            return Err(OrderStoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, mut document: OrderDocument) -> Result<Version> {
        self.check_faults().await?;
        validate_document(&document)?;

        let mut state = self.state.write().await;
        let order_id = document.order_id;

        if state.orders.contains_key(&order_id) {
            return Err(OrderStoreError::AlreadyExists(order_id));
        }
        if let Some(ref reference) = document.gateway_reference {
            if state.references.contains_key(reference) {
                return Err(OrderStoreError::DuplicateReference {
                    reference: reference.clone(),
                });
            }
            state.references.insert(reference.clone(), order_id);
        }

        document.version = Version::first();
        state.orders.insert(order_id, document);
        Ok(Version::first())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<OrderDocument>> {
        self.check_faults().await?;
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn get_by_reference(&self, reference: &str) -> Result<Option<OrderDocument>> {
        self.check_faults().await?;
        let state = self.state.read().await;
        Ok(state
            .references
            .get(reference)
            .and_then(|id| state.orders.get(id))
            .cloned())
    }

    async fn update(&self, mut document: OrderDocument, expected: Version) -> Result<Version> {
        self.check_faults().await?;
        validate_document(&document)?;

        let mut state = self.state.write().await;
        let order_id = document.order_id;

        let current = state
            .orders
            .get(&order_id)
            .ok_or(OrderStoreError::NotFound(order_id))?;

        if current.version != expected {
            return Err(OrderStoreError::VersionConflict {
                order_id,
                expected,
                actual: current.version,
            });
        }

        let previous_reference = current.gateway_reference.clone();
        if let Some(ref reference) = document.gateway_reference
            && let Some(holder) = state.references.get(reference)
            && *holder != order_id
        {
            return Err(OrderStoreError::DuplicateReference {
                reference: reference.clone(),
            });
        }

        if previous_reference != document.gateway_reference {
            if let Some(previous) = previous_reference {
                state.references.remove(&previous);
            }
            if let Some(ref reference) = document.gateway_reference {
                state.references.insert(reference.clone(), order_id);
            }
        }

        let new_version = expected.next();
        document.version = new_version;
        state.orders.insert(order_id, document);
        Ok(new_version)
    }

    async fn query(&self, query: OrderQuery) -> Result<Vec<OrderDocument>> {
        self.check_faults().await?;
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect();

        // Newest first, id as tie-breaker for a stable order
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.order_id.cmp(&b.order_id))
        });

        let offset = query.offset.unwrap_or(0);
        let orders = orders.into_iter().skip(offset);
        let orders = match query.limit {
            Some(limit) => orders.take(limit).collect(),
            None => orders.collect(),
        };

        Ok(orders)
    }
}
