//! HTTP route handlers.

pub mod actor;
pub mod checkout;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod webhooks;
