// vitrine/src/web/handlers/cart_handlers.rs

use crate::errors::AppError;
use crate::models::address::normalize_postal_code;
use crate::models::{Cart, CartOwner};
use crate::pipelines::contexts::AddToCartCtxData;
use crate::services::CartSession;
use crate::state::AppState;
use crate::web::handlers::success;
use actix_web::{web, HttpResponse};
use etapa::{ContextData, PipelineResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

#[derive(Debug, Serialize)]
pub struct CartView<'a> {
  #[serde(flatten)]
  pub cart: &'a Cart,
  pub total_items: i64,
  pub total_price_cents: i64,
}

impl<'a> CartView<'a> {
  pub fn of(cart: &'a Cart) -> Self {
    Self {
      cart,
      total_items: cart.total_items(),
      total_price_cents: cart.total_price_cents(),
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct AddToCartPayload {
  pub product_id: String,
  pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityPayload {
  pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CartQuotePayload {
  pub postal_code: String,
}

#[instrument(name = "handler::get_cart", skip(app_state), fields(owner = %owner))]
pub async fn get_cart_handler(app_state: web::Data<AppState>, owner: CartOwner) -> Result<HttpResponse, AppError> {
  let session = CartSession::open(app_state.store.clone(), owner).await?;
  Ok(success(CartView::of(session.cart())))
}

#[instrument(name = "handler::clear_cart", skip(app_state), fields(owner = %owner))]
pub async fn clear_cart_handler(app_state: web::Data<AppState>, owner: CartOwner) -> Result<HttpResponse, AppError> {
  let mut session = CartSession::open(app_state.store.clone(), owner).await?;
  session.clear().await?;
  Ok(success(CartView::of(session.cart())))
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, payload),
  fields(owner = %owner, product_id = %payload.product_id, quantity = payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  owner: CartOwner,
  payload: web::Json<AddToCartPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let ctx_data = ContextData::new(AddToCartCtxData::new(
    app_state.get_ref().clone(),
    owner,
    payload.product_id,
    payload.quantity,
  ));

  let result = app_state.registry.run(ctx_data.clone()).await?;
  match result {
    PipelineResult::Completed => {
      let guard = ctx_data.read();
      let cart = guard
        .cart
        .as_ref()
        .ok_or_else(|| AppError::Internal("Cart update completed without a cart.".to_string()))?;
      let current = cart.quantity_of(&guard.product_id);
      info!(effective = guard.effective_quantity, "Item added to cart.");
      let body = json!({
        "success": true,
        "data": {
          "requested_quantity": guard.requested_quantity,
          "quantity": current,
          "clamped": guard.clamped,
          "cart": CartView::of(cart),
        }
      });
      drop(guard);
      Ok(HttpResponse::Ok().json(body))
    }
    PipelineResult::Stopped => {
      warn!("Add-to-cart pipeline stopped early.");
      Err(AppError::Internal("Adding to cart was halted.".to_string()))
    }
  }
}

#[instrument(name = "handler::set_cart_quantity", skip(app_state, payload), fields(owner = %owner))]
pub async fn set_quantity_handler(
  app_state: web::Data<AppState>,
  owner: CartOwner,
  path: web::Path<String>,
  payload: web::Json<SetQuantityPayload>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let mut session = CartSession::open(app_state.store.clone(), owner).await?;
  if session.cart().quantity_of(&product_id) == 0 {
    return Err(AppError::NotFound(format!("Product {} is not in the cart.", product_id)));
  }
  let quantity = session.set_quantity(&product_id, payload.quantity).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "data": { "quantity": quantity, "cart": CartView::of(session.cart()) }
  })))
}

#[instrument(name = "handler::remove_cart_item", skip(app_state), fields(owner = %owner))]
pub async fn remove_item_handler(
  app_state: web::Data<AppState>,
  owner: CartOwner,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let mut session = CartSession::open(app_state.store.clone(), owner).await?;
  session.remove(&path.into_inner()).await?;
  Ok(success(CartView::of(session.cart())))
}

#[instrument(name = "handler::cart_shipping_quotes", skip(app_state, payload), fields(owner = %owner))]
pub async fn cart_quotes_handler(
  app_state: web::Data<AppState>,
  owner: CartOwner,
  payload: web::Json<CartQuotePayload>,
) -> Result<HttpResponse, AppError> {
  let destination = normalize_postal_code(&payload.postal_code)?;
  let session = CartSession::open(app_state.store.clone(), owner).await?;
  let quotes = app_state.quotes.quote_for_cart(session.cart(), &destination).await?;
  if quotes.is_empty() {
    info!(%destination, "No carrier serves this destination.");
  }
  Ok(HttpResponse::Ok().json(json!({ "success": true, "quotes": quotes })))
}
