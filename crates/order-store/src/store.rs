use async_trait::async_trait;

use crate::{OrderDocument, OrderId, OrderQuery, OrderStoreError, Result, Version};

/// Core trait for order storage.
///
/// All implementations must be thread-safe (Send + Sync). Every mutation
/// after insert goes through [`OrderStore::update`], a conditional write
/// keyed on the version the caller read.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Stores a new order at [`Version::first`].
    ///
    /// Fails with `AlreadyExists` if the id is taken, or `DuplicateReference`
    /// if the document carries a reference another order already holds.
    async fn insert(&self, document: OrderDocument) -> Result<Version>;

    /// Loads an order by id.
    async fn get(&self, order_id: OrderId) -> Result<Option<OrderDocument>>;

    /// Loads the order holding a gateway reference.
    async fn get_by_reference(&self, reference: &str) -> Result<Option<OrderDocument>>;

    /// Replaces an order if and only if its stored version equals `expected`.
    ///
    /// Returns the new version (`expected.next()`). Fails with
    /// `VersionConflict` when another writer got there first.
    async fn update(&self, document: OrderDocument, expected: Version) -> Result<Version>;

    /// Lists orders matching a query, newest first.
    async fn query(&self, query: OrderQuery) -> Result<Vec<OrderDocument>>;
}

/// Extension trait providing convenience methods for order stores.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Checks if an order exists.
    async fn exists(&self, order_id: OrderId) -> Result<bool> {
        Ok(self.get(order_id).await?.is_some())
    }

    /// Loads an order, failing with `NotFound` if it is missing.
    async fn get_required(&self, order_id: OrderId) -> Result<OrderDocument> {
        self.get(order_id)
            .await?
            .ok_or(OrderStoreError::NotFound(order_id))
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}

/// Checks a document before it is written.
pub fn validate_document(document: &OrderDocument) -> Result<()> {
    if document.status.is_empty() {
        return Err(OrderStoreError::IncompleteDocument("status"));
    }
    if document.payment_status.is_empty() {
        return Err(OrderStoreError::IncompleteDocument("payment_status"));
    }
    if let Some(ref reference) = document.gateway_reference
        && reference.is_empty()
    {
        return Err(OrderStoreError::IncompleteDocument("gateway_reference"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RestaurantId;

    #[test]
    fn validate_rejects_empty_reference() {
        let doc = OrderDocument::builder()
            .order_id(OrderId::new())
            .restaurant_id(RestaurantId::new())
            .status("pending")
            .payment_status("pending")
            .gateway_reference(Some(String::new()))
            .body_raw(serde_json::json!({}))
            .build()
            .unwrap();

        assert!(matches!(
            validate_document(&doc),
            Err(OrderStoreError::IncompleteDocument("gateway_reference"))
        ));
    }
}
