//! Customer checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use checkout::CheckoutRequest;
use domain::Order;
use order_store::OrderStore;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order: Order,
    /// Hosted checkout page for gateway payments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

/// POST /checkout: stores the order and, for gateway payments, opens the
/// hosted checkout. The payment outcome arrives later as a webhook.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let receipt = state.checkout.create_order(req).await?;

    let response = CheckoutResponse {
        order: receipt.order,
        checkout_url: receipt.session.map(|s| s.redirect_url),
    };
    Ok((StatusCode::CREATED, Json(response)))
}
