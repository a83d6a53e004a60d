//! The party performing an operation.

use common::RestaurantId;
use serde::{Deserialize, Serialize};

use crate::order::{Order, OrderError};

/// Who is acting on orders, passed explicitly into every staff operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "restaurant_id", rename_all = "snake_case")]
pub enum Actor {
    /// Restaurant staff, limited to the restaurant's own orders.
    Restaurant(RestaurantId),

    /// Platform administrator.
    Administrator,
}

impl Actor {
    /// Checks that the actor may act on the order.
    pub fn authorize(&self, order: &Order) -> Result<(), OrderError> {
        match self {
            Actor::Administrator => Ok(()),
            Actor::Restaurant(id) if *id == order.restaurant_id => Ok(()),
            Actor::Restaurant(_) => Err(OrderError::NotOwnedByActor),
        }
    }

    /// The restaurant listings must be limited to, if any.
    pub fn restaurant_scope(&self) -> Option<RestaurantId> {
        match self {
            Actor::Restaurant(id) => Some(*id),
            Actor::Administrator => None,
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Restaurant(id) => write!(f, "restaurant:{}", id),
            Actor::Administrator => f.write_str("administrator"),
        }
    }
}
