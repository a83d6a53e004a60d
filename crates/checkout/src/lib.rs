//! Checkout for restaurant orders.
//!
//! The checkout coordinator turns a cart snapshot into a stored order. For
//! gateway payments it then writes the order's gateway reference and opens
//! the hosted checkout through a [`PaymentGateway`]:
//! 1. Validate the cart and delivery info
//! 2. Store the order as pending/pending
//! 3. Write the `ORDER-{id}` reference
//! 4. Launch the hosted checkout (does not wait for payment)

pub mod cart;
pub mod coordinator;
pub mod error;
pub mod gateway;

pub use cart::{CartLine, CartSnapshot};
pub use coordinator::{CheckoutCoordinator, CheckoutReceipt, CheckoutRequest};
pub use error::{CheckoutError, ValidationError};
pub use gateway::{
    CheckoutLaunch, CheckoutSession, GatewayError, HostedCheckoutConfig, HostedCheckoutGateway,
    InMemoryPaymentGateway, PaymentGateway,
};
