use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OrderId, OrderStoreError, RestaurantId};

/// Version number of a stored order, used for conditional writes.
///
/// A freshly inserted order is at version 1 and every successful update
/// increments it by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) of an order that was never stored.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version (1) assigned on insert.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// A stored order record.
///
/// The store only understands the indexed columns (ids, reference, status
/// strings, timestamps). The full record travels in `body` as JSON and is
/// interpreted by the domain layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDocument {
    pub order_id: OrderId,
    pub restaurant_id: RestaurantId,

    /// Gateway reference, unique across all orders once set.
    pub gateway_reference: Option<String>,

    pub status: String,
    pub payment_status: String,

    /// Version of the record as last read from or written to the store.
    pub version: Version,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// The full order record.
    pub body: serde_json::Value,
}

impl OrderDocument {
    /// Creates a new document builder.
    pub fn builder() -> OrderDocumentBuilder {
        OrderDocumentBuilder::default()
    }

    /// Deserializes the body into a typed record.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }
}

/// Builder for constructing order documents.
#[derive(Debug, Default)]
pub struct OrderDocumentBuilder {
    order_id: Option<OrderId>,
    restaurant_id: Option<RestaurantId>,
    gateway_reference: Option<String>,
    status: Option<String>,
    payment_status: Option<String>,
    version: Option<Version>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    body: Option<serde_json::Value>,
}

impl OrderDocumentBuilder {
    pub fn order_id(mut self, id: OrderId) -> Self {
        self.order_id = Some(id);
        self
    }

    pub fn restaurant_id(mut self, id: RestaurantId) -> Self {
        self.restaurant_id = Some(id);
        self
    }

    pub fn gateway_reference(mut self, reference: Option<String>) -> Self {
        self.gateway_reference = reference;
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn payment_status(mut self, payment_status: impl Into<String>) -> Self {
        self.payment_status = Some(payment_status.into());
        self
    }

    /// Sets the version. Defaults to [`Version::initial`].
    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Sets the creation time. If not set, the current time is used.
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Sets the last update time. Defaults to the creation time.
    pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    /// Sets the body from a serializable value.
    pub fn body<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Sets the body from a raw JSON value.
    pub fn body_raw(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Builds the document, failing if a required field is missing.
    pub fn build(self) -> Result<OrderDocument, OrderStoreError> {
        let created_at = self.created_at.unwrap_or_else(Utc::now);
        Ok(OrderDocument {
            order_id: self
                .order_id
                .ok_or(OrderStoreError::IncompleteDocument("order_id"))?,
            restaurant_id: self
                .restaurant_id
                .ok_or(OrderStoreError::IncompleteDocument("restaurant_id"))?,
            gateway_reference: self.gateway_reference,
            status: self
                .status
                .ok_or(OrderStoreError::IncompleteDocument("status"))?,
            payment_status: self
                .payment_status
                .ok_or(OrderStoreError::IncompleteDocument("payment_status"))?,
            version: self.version.unwrap_or_default(),
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
            body: self
                .body
                .ok_or(OrderStoreError::IncompleteDocument("body"))?,
        })
    }
}
