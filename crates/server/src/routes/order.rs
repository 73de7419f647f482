//! Order route handlers.
//!
//! Order placement snapshots the cart contents the client submits, computes
//! the amount server-side, persists the order unpaid, and asks the payment
//! gateway for a hosted checkout session. The cart is cleared only when the
//! later verification call confirms payment, so an abandoned checkout leaves
//! the cart intact for retry.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bistro_core::{Address, OrderId, OrderStatus};

use crate::db::{OrderRepository, orders::CancelOutcome, orders::PaidOutcome};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::{LineItem, Order};
use crate::routes::ApiMessage;
use crate::state::AppState;

/// Place-order request body.
///
/// The client-side cart snapshot: item prices are the cart's last-known
/// prices. Any client-sent amount or user id is ignored; the amount is
/// recomputed here and the user comes from the bearer token.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<LineItem>,
    pub address: Address,
}

/// Place-order response carrying the checkout session URL.
#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub success: bool,
    pub session_url: String,
}

/// Payment verification callback body.
#[derive(Debug, Deserialize)]
pub struct VerifyOrderRequest {
    #[serde(rename = "orderId")]
    pub order_id: OrderId,
    pub success: bool,
}

/// Fulfillment status update body.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(rename = "orderId")]
    pub order_id: OrderId,
    pub status: OrderStatus,
}

/// Order listing response.
#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub success: bool,
    pub data: Vec<Order>,
}

/// Validate the submitted line items and compute the order amount:
/// Σ(price × quantity) plus the flat delivery fee.
fn validate_and_total(items: &[LineItem], delivery_fee: Decimal) -> Result<Decimal> {
    if items.is_empty() {
        return Err(AppError::BadRequest("order has no items".to_owned()));
    }

    let mut total = delivery_fee;
    for item in items {
        if item.quantity < 1 {
            return Err(AppError::BadRequest(format!(
                "item '{}' has quantity 0",
                item.name
            )));
        }
        if item.price < Decimal::ZERO {
            return Err(AppError::BadRequest(format!(
                "item '{}' has a negative price",
                item.name
            )));
        }
        total += item.price * Decimal::from(item.quantity);
    }

    Ok(total)
}

/// Place an order and create a checkout session for it.
#[instrument(skip(state, req))]
pub async fn place(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<Json<PlaceOrderResponse>> {
    let amount = validate_and_total(&req.items, state.config().delivery_fee)?;

    let order = OrderRepository::new(state.pool())
        .insert(user_id, req.items, amount, req.address)
        .await?;

    // The redirect targets embed the order id so /order/verify can find it.
    let frontend = &state.config().frontend_url;
    let success_url = format!("{frontend}/verify?success=true&orderId={}", order.id);
    let cancel_url = format!("{frontend}/verify?success=false&orderId={}", order.id);

    let session_url = state
        .checkout()
        .create_session(
            order.id,
            &order.items,
            state.config().delivery_fee,
            &success_url,
            &cancel_url,
        )
        .await?;

    tracing::info!(order_id = %order.id, %amount, "order placed, awaiting payment");

    Ok(Json(PlaceOrderResponse {
        success: true,
        session_url,
    }))
}

/// Payment provider outcome callback.
///
/// Idempotent in both directions: a repeated success confirmation is a
/// no-op, and a failure callback can never delete a paid order.
#[instrument(skip(state))]
pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyOrderRequest>,
) -> Result<Json<ApiMessage>> {
    let repo = OrderRepository::new(state.pool());

    if req.success {
        match repo.mark_paid(req.order_id).await? {
            PaidOutcome::Transitioned => {
                tracing::info!(order_id = %req.order_id, "payment confirmed, cart cleared");
            }
            PaidOutcome::AlreadyPaid => {
                tracing::debug!(order_id = %req.order_id, "duplicate payment confirmation");
            }
        }
        Ok(Json(ApiMessage::ok("Paid")))
    } else {
        match repo.delete_unpaid(req.order_id).await? {
            CancelOutcome::Deleted => {
                tracing::info!(order_id = %req.order_id, "payment failed, order removed");
            }
            CancelOutcome::AlreadyPaid => {
                tracing::warn!(order_id = %req.order_id, "failure callback for a paid order ignored");
            }
        }
        Ok(Json(ApiMessage::ok("Not Paid")))
    }
}

/// The caller's order history, newest first.
#[instrument(skip(state))]
pub async fn user_orders(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<OrderListResponse>> {
    let data = OrderRepository::new(state.pool())
        .list_for_user(user_id)
        .await?;

    Ok(Json(OrderListResponse {
        success: true,
        data,
    }))
}

/// Every order in the system (administrative view), newest first.
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<OrderListResponse>> {
    let data = OrderRepository::new(state.pool()).list_all().await?;

    Ok(Json(OrderListResponse {
        success: true,
        data,
    }))
}

/// Update an order's fulfillment status. Backward transitions are rejected.
#[instrument(skip(state))]
pub async fn update_status(
    State(state): State<AppState>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ApiMessage>> {
    OrderRepository::new(state.pool())
        .update_status(req.order_id, req.status)
        .await?;

    Ok(Json(ApiMessage::ok("Status Updated")))
}
