//! Identifiers shared by every crate of the order core.

mod types;

pub use types::{OrderId, RestaurantId};
