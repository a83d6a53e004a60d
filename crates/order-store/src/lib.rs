pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{OrderId, RestaurantId};
pub use document::{OrderDocument, OrderDocumentBuilder, Version};
pub use error::{OrderStoreError, Result};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use query::OrderQuery;
pub use store::{OrderStore, OrderStoreExt};
