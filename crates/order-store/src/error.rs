use thiserror::Error;

use crate::{OrderId, Version};

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum OrderStoreError {
    /// A conditional write found a different version than the caller read.
    #[error("Version conflict for order {order_id}: expected version {expected}, found {actual}")]
    VersionConflict {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// The order does not exist.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// An order with this id has already been stored.
    #[error("Order already exists: {0}")]
    AlreadyExists(OrderId),

    /// Another order already holds this gateway reference.
    #[error("Gateway reference {reference} is already assigned to another order")]
    DuplicateReference { reference: String },

    /// A document was built without a required field.
    #[error("Incomplete order document: missing {0}")]
    IncompleteDocument(&'static str),

    /// The backing store cannot serve requests right now.
    #[error("Order store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OrderStoreError {
    /// Returns true when retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OrderStoreError::Unavailable(_) | OrderStoreError::Database(_)
        )
    }
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, OrderStoreError>;
