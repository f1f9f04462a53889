// vitrine/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Cart, CartOwner, ShippingQuote};
use crate::pipelines::contexts::{CheckoutCtxData, ReconcileCtxData};
use crate::services::CartSession;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use crate::web::handlers::success;
use etapa::{ContextData, PipelineResult};

#[derive(Debug, Deserialize)]
pub struct CheckoutPayload {
  #[serde(default)]
  pub address_id: Option<Uuid>,
  #[serde(default)]
  pub shipping_quote: Option<ShippingQuote>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnQuery {
  #[serde(default)]
  pub payment_id: Option<String>,
  #[serde(default)]
  pub status: Option<String>,
  #[serde(default)]
  pub external_reference: Option<String>,
  #[serde(default)]
  pub merchant_order_id: Option<String>,
}

const RETURN_OUTCOMES: [&str; 3] = ["success", "pending", "failure"];

#[instrument(name = "handler::start_checkout", skip(app_state, payload, auth_user), fields(buyer_id = ?auth_user.map(|u| u.user_id)))]
pub async fn start_checkout_handler(
  app_state: web::Data<AppState>,
  auth_user: Option<AuthenticatedUser>,
  payload: web::Json<CheckoutPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let buyer_id = auth_user.map(|u| u.user_id);

  let _permit = match buyer_id {
    Some(buyer_id) => Some(app_state.checkouts.try_begin(buyer_id).ok_or_else(|| {
      warn!(%buyer_id, "Checkout already in progress for buyer.");
      AppError::Conflict("A checkout is already in progress.".to_string())
    })?),
    None => None,
  };

  let cart = match buyer_id {
    Some(buyer_id) => CartSession::open(app_state.store.clone(), CartOwner::Buyer(buyer_id))
      .await?
      .into_cart(),
    None => Cart::default(),
  };

  let ctx_data = ContextData::new(CheckoutCtxData::new(
    app_state.get_ref().clone(),
    buyer_id,
    cart,
    payload.address_id,
    payload.shipping_quote,
  ));
  let result = app_state.registry.run(ctx_data.clone()).await?;
  if result == PipelineResult::Stopped {
    return Err(AppError::Internal("Checkout was halted.".to_string()));
  }

  let ctx = ctx_data.snapshot();
  let checkout_url = ctx
    .checkout_url
    .ok_or_else(|| AppError::Internal("Checkout finished without a checkout URL.".to_string()))?;
  if ctx.order_write_failed {
    error!(external_reference = ?ctx.external_reference, "Checkout URL issued without a recorded order.");
  }
  info!(order_id = ?ctx.order_id, "Checkout started.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "data": {
      "order_id": ctx.order_id,
      "preference_id": ctx.preference.as_ref().map(|p| p.id.clone()),
      "external_reference": ctx.external_reference,
      "checkout_url": checkout_url,
      "order_recorded": !ctx.order_write_failed,
      "total_cents": ctx.total_cents,
    }
  })))
}

/// Landing for the gateway's `back_urls`.
#[instrument(name = "handler::checkout_return", skip(app_state, query, auth_user), fields(outcome = %path.as_str()))]
pub async fn checkout_return_handler(
  app_state: web::Data<AppState>,
  auth_user: Option<AuthenticatedUser>,
  path: web::Path<String>,
  query: web::Query<ReturnQuery>,
) -> Result<HttpResponse, AppError> {
  let outcome = path.into_inner();
  if !RETURN_OUTCOMES.contains(&outcome.as_str()) {
    return Err(AppError::NotFound(format!("Unknown checkout outcome '{}'.", outcome)));
  }
  let query = query.into_inner();
  info!(
    payment_id = ?query.payment_id,
    advisory_status = ?query.status,
    merchant_order_id = ?query.merchant_order_id,
    "Buyer returned from hosted checkout."
  );

  let ctx_data = ContextData::new(ReconcileCtxData::new(
    app_state.get_ref().clone(),
    auth_user.map(|u| u.user_id),
    query.payment_id,
    query.status,
    query.external_reference,
  ));
  let result = app_state.registry.run(ctx_data.clone()).await?;
  if result == PipelineResult::Stopped {
    return Err(AppError::Internal("Reconciliation was halted.".to_string()));
  }

  let outcome_view = ctx_data
    .snapshot()
    .outcome
    .ok_or_else(|| AppError::Internal("Reconciliation finished without an outcome.".to_string()))?;
  Ok(success(json!({ "redirect": outcome, "outcome": outcome_view })))
}
