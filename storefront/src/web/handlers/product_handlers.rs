// vitrine/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::handlers::success;

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products = app_state.store.list_active_products().await?;
  info!("Fetched {} active products.", products.len());
  Ok(success(products))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_str()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  match app_state.store.get_product(&product_id).await?.filter(|p| p.is_active()) {
    Some(product) => Ok(success(product)),
    None => {
      warn!("Product {} not found or not active.", product_id);
      Err(AppError::NotFound(format!("Product {} not found.", product_id)))
    }
  }
}
