//! Payment gateway webhook handling.
//!
//! The gateway reports transaction status changes asynchronously, possibly
//! more than once and out of order. This crate:
//! - verifies the delivery signature ([`SignatureVerifier`])
//! - parses the event envelope ([`GatewayEvent`])
//! - applies the outcome through the order service ([`WebhookReceiver`])
//!
//! Every event ends in exactly one of: applied, duplicate, conflict,
//! ignored, or a retryable [`WebhookError`].

pub mod envelope;
pub mod error;
pub mod receiver;
pub mod signature;

pub use envelope::{GatewayEvent, TRANSACTION_UPDATED, TransactionData, map_status};
pub use error::WebhookError;
pub use receiver::{IgnoreReason, WebhookOutcome, WebhookReceiver};
pub use signature::{SIGNATURE_HEADER, SignatureError, SignatureVerifier};
