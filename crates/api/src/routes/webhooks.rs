//! Payment gateway webhook endpoint.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use domain::PaymentStatus;
use order_store::OrderStore;
use serde::Serialize;
use webhook::{GatewayEvent, SIGNATURE_HEADER, SignatureError, WebhookOutcome};

use crate::error::ApiError;
use crate::state::AppState;

/// Acknowledgement for an event the gateway must not redeliver.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    /// False only for conflicting outcomes, which need manual review.
    pub success: bool,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl From<&WebhookOutcome> for WebhookResponse {
    fn from(outcome: &WebhookOutcome) -> Self {
        let mut response = WebhookResponse {
            success: true,
            outcome: outcome.as_str(),
            order_id: None,
            payment_status: None,
            transaction_id: None,
        };
        match outcome {
            WebhookOutcome::Applied {
                order,
                transaction_id,
            }
            | WebhookOutcome::Duplicate {
                order,
                transaction_id,
            } => {
                response.order_id = Some(order.id.to_string());
                response.payment_status = Some(order.payment_status);
                response.transaction_id = Some(transaction_id.clone());
            }
            WebhookOutcome::Conflict {
                order_id,
                recorded,
                transaction_id,
                ..
            } => {
                response.success = false;
                response.order_id = Some(order_id.to_string());
                response.payment_status = Some(*recorded);
                response.transaction_id = Some(transaction_id.clone());
            }
            WebhookOutcome::Ignored(_) => {}
        }
        response
    }
}

/// POST /webhooks/gateway
///
/// The signature is checked against the raw body before anything is
/// parsed. Retryable failures answer 503 so the gateway redelivers.
#[tracing::instrument(skip_all)]
pub async fn receive<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .ok_or(SignatureError::MissingHeader)?
        .to_str()
        .map_err(|_| SignatureError::MalformedHeader)?;
    state.verifier.verify(&body, signature)?;

    let event: GatewayEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid event payload: {e}")))?;

    let outcome = state.receiver.handle(event).await?;
    Ok(Json(WebhookResponse::from(&outcome)))
}
