// vitrine/src/web/handlers/function_handlers.rs

//! Backend-callable operations. Collaborator credentials stay server-side.

use actix_web::{web, HttpResponse};
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::address::normalize_postal_code;
use crate::models::{Dimensions, PreferenceRequest, QuoteRequest};
use crate::state::AppState;
use crate::web::handlers::success;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusPayload {
  pub payment_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DimensionsPayload {
  pub height: f64,
  pub width: f64,
  pub length: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateShippingPayload {
  #[serde(default)]
  pub origin_cep: Option<String>,
  pub destination_cep: String,
  pub weight_kg: f64,
  #[serde(default)]
  pub dimensions: Option<DimensionsPayload>,
  #[serde(default)]
  pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackShipmentPayload {
  pub tracking_code: String,
  #[serde(default)]
  pub user_id: Option<Uuid>,
}

#[instrument(name = "function::create_checkout_preference", skip(app_state, payload), fields(external_reference = %payload.external_reference))]
pub async fn create_checkout_preference(
  app_state: web::Data<AppState>,
  payload: web::Json<PreferenceRequest>,
) -> Result<HttpResponse, AppError> {
  let request = payload.into_inner();
  if request.items.is_empty() {
    return Err(AppError::Validation("At least one item is required.".to_string()));
  }
  if request.items.iter().any(|i| i.quantity < 1 || i.unit_price.is_sign_negative()) {
    return Err(AppError::Validation("Items need a positive quantity and a non-negative price.".to_string()));
  }
  if request.external_reference.trim().is_empty() {
    return Err(AppError::Validation("external_reference is required.".to_string()));
  }
  let preference = app_state.gateway.create_preference(&request).await?;
  Ok(success(preference))
}

#[instrument(name = "function::get_payment_status", skip(app_state))]
pub async fn get_payment_status(
  app_state: web::Data<AppState>,
  payload: web::Json<PaymentStatusPayload>,
) -> Result<HttpResponse, AppError> {
  let payment_id = payload.payment_id.trim();
  if payment_id.is_empty() {
    return Err(AppError::Validation("paymentId is required.".to_string()));
  }
  let payment = app_state.gateway.get_payment(payment_id).await?;
  Ok(success(json!({
    "id": payment.id,
    "status": payment.status,
    "status_detail": payment.status_detail,
    "payment_method_id": payment.payment_method_id,
    "transaction_amount": payment.transaction_amount.and_then(|a| a.to_f64()),
    "external_reference": payment.external_reference,
  })))
}

#[instrument(name = "function::calculate_shipping", skip(app_state, payload), fields(destination = %payload.destination_cep))]
pub async fn calculate_shipping(
  app_state: web::Data<AppState>,
  payload: web::Json<CalculateShippingPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let origin_postal_code = match payload.origin_cep.as_deref() {
    Some(cep) if !cep.trim().is_empty() => normalize_postal_code(cep)?,
    _ => app_state.quotes.origin_postal_code().to_string(),
  };
  let dimensions = match payload.dimensions {
    Some(d) if d.height > 0.0 && d.width > 0.0 && d.length > 0.0 => Dimensions {
      height_cm: d.height,
      width_cm: d.width,
      length_cm: d.length,
    },
    Some(_) => return Err(AppError::Validation("Dimensions must be positive.".to_string())),
    None => app_state.quotes.default_dimensions(),
  };
  let request = QuoteRequest {
    origin_postal_code,
    destination_postal_code: normalize_postal_code(&payload.destination_cep)?,
    weight_kg: payload.weight_kg,
    dimensions,
  };

  let quotes = app_state.quotes.quote(&request, payload.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "quotes": quotes })))
}

#[instrument(name = "function::track_shipment", skip(app_state))]
pub async fn track_shipment(
  app_state: web::Data<AppState>,
  payload: web::Json<TrackShipmentPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let tracking = app_state.quotes.track(&payload.tracking_code, payload.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "trackingData": tracking })))
}
