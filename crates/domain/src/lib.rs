//! Domain layer for restaurant orders.
//!
//! This crate provides:
//! - The order record and its value objects
//! - The order state machine (status and payment status transitions)
//! - `TransitionHandler` for atomic read-check-write against the order store
//! - `OrderService`, the only writer of order status and payment status
//! - `Actor`, the explicit caller context for staff operations

pub mod actor;
pub mod command;
pub mod error;
pub mod order;

pub use actor::Actor;
pub use command::{TransitionHandler, TransitionResult};
pub use error::DomainError;
pub use order::{
    DeliveryInfo, GatewayReference, LineItem, Money, NewOrder, Order, OrderChange, OrderError,
    OrderService, OrderStatus, OrderTotals, PaymentApplication, PaymentDisposition, PaymentMeta,
    PaymentMethod, PaymentOutcome, PaymentStatus, ProductRef, UnknownStatus,
};
