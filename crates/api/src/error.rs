//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::{DomainError, OrderError};
use order_store::OrderStoreError;
use webhook::{SignatureError, WebhookError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// The caller's identity headers are missing or invalid.
    Unauthenticated(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Checkout failure.
    Checkout(CheckoutError),
    /// Webhook event the gateway should redeliver.
    Webhook(WebhookError),
    /// Webhook signature rejected.
    Signature(SignatureError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Webhook(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
            ApiError::Signature(err) => {
                metrics::counter!("webhook_signature_rejections_total").increment(1);
                tracing::warn!(error = %err, "rejected webhook signature");
                (StatusCode::UNAUTHORIZED, err.to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    if err.is_transient() {
        tracing::warn!(error = %err, "storage unavailable");
        return (StatusCode::SERVICE_UNAVAILABLE, err.to_string());
    }
    match &err {
        DomainError::Order(order_err) => match order_err {
            OrderError::NotOwnedByActor => (StatusCode::FORBIDDEN, err.to_string()),
            OrderError::InvalidTransition { .. }
            | OrderError::PaymentConflict { .. }
            | OrderError::PaymentMethodMismatch { .. }
            | OrderError::ReferenceImmutable => (StatusCode::CONFLICT, err.to_string()),
        },
        DomainError::OrderNotFound(_) | DomainError::Store(OrderStoreError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        _ => {
            tracing::error!(error = %err, "unhandled domain error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match err {
        CheckoutError::Validation(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        CheckoutError::OrderCreation(e) => domain_error_to_response(e),
        e @ CheckoutError::ReferenceWrite { .. } if e.is_transient() => {
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        e @ CheckoutError::ReferenceWrite { .. } => {
            tracing::error!(error = %e, order_id = ?e.order_id(), "order left without reference");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        e @ CheckoutError::Gateway { .. } => (StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        ApiError::Webhook(err)
    }
}

impl From<SignatureError> for ApiError {
    fn from(err: SignatureError) -> Self {
        ApiError::Signature(err)
    }
}
