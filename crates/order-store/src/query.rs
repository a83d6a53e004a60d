use chrono::{DateTime, Utc};

use crate::{OrderDocument, RestaurantId};

/// Builder for listing stored orders.
///
/// Results are ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Filter by owning restaurant.
    pub restaurant_id: Option<RestaurantId>,

    /// Filter by status (any of these).
    pub statuses: Option<Vec<String>>,

    /// Filter by payment status.
    pub payment_status: Option<String>,

    /// Orders created at or after this timestamp.
    pub created_from: Option<DateTime<Utc>>,

    /// Orders created at or before this timestamp.
    pub created_to: Option<DateTime<Utc>>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl OrderQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for one restaurant's orders.
    pub fn for_restaurant(restaurant_id: RestaurantId) -> Self {
        Self {
            restaurant_id: Some(restaurant_id),
            ..Default::default()
        }
    }

    pub fn restaurant_id(mut self, id: RestaurantId) -> Self {
        self.restaurant_id = Some(id);
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.statuses = Some(vec![status.into()]);
        self
    }

    pub fn statuses(mut self, statuses: Vec<String>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    pub fn payment_status(mut self, payment_status: impl Into<String>) -> Self {
        self.payment_status = Some(payment_status.into());
        self
    }

    pub fn created_from(mut self, timestamp: DateTime<Utc>) -> Self {
        self.created_from = Some(timestamp);
        self
    }

    pub fn created_to(mut self, timestamp: DateTime<Utc>) -> Self {
        self.created_to = Some(timestamp);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the document passes every filter of this query.
    ///
    /// Pagination is not considered here.
    pub fn matches(&self, doc: &OrderDocument) -> bool {
        if let Some(id) = self.restaurant_id
            && doc.restaurant_id != id
        {
            return false;
        }
        if let Some(ref statuses) = self.statuses
            && !statuses.contains(&doc.status)
        {
            return false;
        }
        if let Some(ref payment_status) = self.payment_status
            && &doc.payment_status != payment_status
        {
            return false;
        }
        if let Some(from) = self.created_from
            && doc.created_at < from
        {
            return false;
        }
        if let Some(to) = self.created_to
            && doc.created_at > to
        {
            return false;
        }
        true
    }
}
