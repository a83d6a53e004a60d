//! Order console endpoints.
//!
//! Staff act on orders one at a time: view, advance one step, cancel, or
//! settle a cash or bank-transfer payment. Every handler takes the acting
//! [`ConsoleActor`]; restaurants only see and change their own orders.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::OrderId;
use domain::{Order, OrderChange, OrderStatus, PaymentOutcome, PaymentStatus, TransitionResult};
use order_store::{OrderQuery, OrderStore};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::actor::ConsoleActor;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersParams {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub outcome: PaymentOutcome,
}

// -- Response types --

#[derive(Serialize)]
pub struct TransitionResponse {
    pub order: Order,
    /// Empty when the request changed nothing.
    pub changes: Vec<OrderChange>,
}

impl From<TransitionResult> for TransitionResponse {
    fn from(result: TransitionResult) -> Self {
        Self {
            order: result.order,
            changes: result.changes,
        }
    }
}

// -- Handlers --

/// GET /orders: orders visible to the actor, newest first.
#[tracing::instrument(skip(state, actor, params), fields(actor = %actor.0))]
pub async fn list<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: ConsoleActor,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let mut query = OrderQuery::new();
    if let Some(status) = params.status.as_deref() {
        let status: OrderStatus = status
            .parse()
            .map_err(|e: domain::UnknownStatus| ApiError::BadRequest(e.to_string()))?;
        query = query.status(status.as_str());
    }
    if let Some(payment_status) = params.payment_status.as_deref() {
        let payment_status: PaymentStatus = payment_status
            .parse()
            .map_err(|e: domain::UnknownStatus| ApiError::BadRequest(e.to_string()))?;
        query = query.payment_status(payment_status.as_str());
    }
    if let Some(limit) = params.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = params.offset {
        query = query.offset(offset);
    }

    let orders = state.orders.list_orders(&actor.0, query).await?;
    Ok(Json(orders))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state, actor), fields(actor = %actor.0))]
pub async fn get<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: ConsoleActor,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.orders.get_order_for(&actor.0, order_id).await?;
    Ok(Json(order))
}

/// POST /orders/{id}/advance: moves the order to the requested next status.
#[tracing::instrument(skip(state, actor, req), fields(actor = %actor.0, to = %req.status))]
pub async fn advance<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: ConsoleActor,
    Path(id): Path<String>,
    Json(req): Json<AdvanceRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let result = state.orders.advance(&actor.0, order_id, req.status).await?;
    Ok(Json(result.into()))
}

/// POST /orders/{id}/cancel
#[tracing::instrument(skip(state, actor), fields(actor = %actor.0))]
pub async fn cancel<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: ConsoleActor,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let result = state.orders.cancel(&actor.0, order_id).await?;
    Ok(Json(result.into()))
}

/// POST /orders/{id}/payment: settles a cash or bank-transfer order.
#[tracing::instrument(skip(state, actor, req), fields(actor = %actor.0, outcome = ?req.outcome))]
pub async fn record_payment<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: ConsoleActor,
    Path(id): Path<String>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let result = state
        .orders
        .record_offline_payment(&actor.0, order_id, req.outcome)
        .await?;
    Ok(Json(result.into()))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    OrderId::parse(id).ok_or_else(|| ApiError::BadRequest(format!("Invalid order id: {id}")))
}
