// vitrine/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Order, OrderStatus, OrderTransition, User};
use crate::services::OrderEvent;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use crate::web::handlers::success;

#[derive(Debug, Deserialize)]
pub struct ShipPayload {
  pub tracking_code: String,
}

/// Owner, a seller with a line in the order, or an admin.
fn can_view(order: &Order, caller: Uuid, profile: Option<&User>) -> bool {
  order.buyer_id == caller
    || profile.is_some_and(|u| u.is_admin() || (u.can_fulfil() && order.involves_seller(caller)))
}

fn can_fulfil(order: &Order, caller: Uuid, profile: Option<&User>) -> bool {
  profile.is_some_and(|u| u.is_admin() || (u.can_fulfil() && order.involves_seller(caller)))
}

async fn visible_order(app_state: &AppState, order_id: Uuid, caller: Uuid) -> Result<(Order, Option<User>), AppError> {
  let order = app_state
    .store
    .get_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;
  let profile = app_state.store.get_user(caller).await?;
  if !can_view(&order, caller, profile.as_ref()) {
    warn!(%order_id, %caller, "Order requested by a caller who cannot see it.");
    return Err(AppError::NotFound(format!("Order {} not found.", order_id)));
  }
  Ok((order, profile))
}

async fn fulfilment_transition(
  app_state: &AppState,
  order_id: Uuid,
  caller: Uuid,
  transition: OrderTransition,
) -> Result<Order, AppError> {
  let (order, profile) = visible_order(app_state, order_id, caller).await?;
  if !can_fulfil(&order, caller, profile.as_ref()) {
    return Err(AppError::Forbidden("Only the seller or an admin can update fulfilment.".to_string()));
  }
  let updated = app_state.store.apply_transition(order_id, &transition).await?;
  app_state.order_feed.publish(OrderEvent {
    order_id,
    buyer_id: updated.buyer_id,
    from: Some(order.status),
    to: updated.status,
    at: transition.at,
  });
  info!(%order_id, from = %order.status, to = %updated.status, "Fulfilment status updated.");
  Ok(updated)
}

#[instrument(name = "handler::list_orders", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.store.list_orders_for_buyer(auth_user.user_id).await?;
  Ok(success(orders))
}

#[instrument(name = "handler::get_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let (order, _) = visible_order(&app_state, path.into_inner(), auth_user.user_id).await?;
  Ok(success(order))
}

#[instrument(name = "handler::track_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn track_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let (order, _) = visible_order(&app_state, path.into_inner(), auth_user.user_id).await?;
  let tracking_code = order
    .tracking_code
    .as_deref()
    .ok_or_else(|| AppError::NotFound("Order has no tracking code yet.".to_string()))?;
  let seller_id = order.items.first().map(|line| line.seller_id);
  let tracking = app_state.quotes.track(tracking_code, seller_id).await?;
  Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "trackingData": tracking })))
}

#[instrument(name = "handler::ship_order", skip(app_state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn ship_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  payload: web::Json<ShipPayload>,
) -> Result<HttpResponse, AppError> {
  let tracking_code = payload.tracking_code.trim().to_string();
  if tracking_code.is_empty() {
    return Err(AppError::Validation("A tracking code is required to ship.".to_string()));
  }
  let transition = OrderTransition {
    tracking_code: Some(tracking_code),
    ..OrderTransition::to(OrderStatus::Shipping, Utc::now())
  };
  let order = fulfilment_transition(&app_state, path.into_inner(), auth_user.user_id, transition).await?;
  Ok(success(order))
}

#[instrument(name = "handler::deliver_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn deliver_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let transition = OrderTransition::to(OrderStatus::Delivered, Utc::now());
  let order = fulfilment_transition(&app_state, path.into_inner(), auth_user.user_id, transition).await?;
  Ok(success(order))
}
