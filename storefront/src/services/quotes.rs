// vitrine/src/services/quotes.rs

use crate::config::AppConfig;
use crate::errors::{AppError, Result as AppResult};
use crate::models::{Cart, Dimensions, QuoteRequest, ShippingQuote, TrackingData};
use crate::services::shipping::ShippingCarrier;
use crate::store::Store;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Shipping quotes and tracking on top of the carrier, with token resolution and the free fallback.
pub struct QuoteService {
  carrier: Arc<dyn ShippingCarrier>,
  store: Arc<dyn Store>,
  config: Arc<AppConfig>,
}

impl QuoteService {
  pub fn new(carrier: Arc<dyn ShippingCarrier>, store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
    Self { carrier, store, config }
  }

  pub fn origin_postal_code(&self) -> &str {
    &self.config.origin_postal_code
  }

  pub fn default_dimensions(&self) -> Dimensions {
    self.config.default_package_dimensions
  }

  /// The seller's own carrier token when one is stored and still valid, else the platform token.
  async fn access_token_for(&self, user_id: Option<Uuid>) -> AppResult<String> {
    if let Some(user_id) = user_id {
      match self.store.carrier_token(user_id).await? {
        Some(token) if !token.is_expired(Utc::now()) => return Ok(token.access_token),
        Some(_) => warn!(%user_id, "Stored carrier token expired, using platform token."),
        None => debug!(%user_id, "No carrier token stored, using platform token."),
      }
    }
    Ok(self.config.melhor_envio_token.clone())
  }

  /// Quotes a parcel. An empty list means shipping is unavailable for it.
  #[instrument(name = "QuoteService::quote", skip(self, request), fields(to = %request.destination_postal_code))]
  pub async fn quote(&self, request: &QuoteRequest, seller_id: Option<Uuid>) -> AppResult<Vec<ShippingQuote>> {
    if request.weight_kg <= 0.0 {
      return Err(AppError::Validation("Parcel weight must be positive.".to_string()));
    }
    let token = self.access_token_for(seller_id).await?;
    match self.carrier.calculate(request, &token).await {
      Ok(quotes) => Ok(quotes),
      Err(e) if self.config.shipping_free_fallback && e.is_retryable() => {
        warn!(error = %e, "Shipping quote failed, offering free-shipping fallback.");
        Ok(vec![ShippingQuote::free_fallback()])
      }
      Err(e) => Err(e),
    }
  }

  /// Builds the parcel from the cart lines and quotes it from the configured origin.
  pub async fn quote_for_cart(&self, cart: &Cart, destination_postal_code: &str) -> AppResult<Vec<ShippingQuote>> {
    if cart.is_empty() {
      return Err(AppError::Validation("Cart is empty.".to_string()));
    }
    let request = QuoteRequest {
      origin_postal_code: self.config.origin_postal_code.clone(),
      destination_postal_code: destination_postal_code.to_string(),
      weight_kg: cart.total_weight_kg(),
      dimensions: self.config.default_package_dimensions,
    };
    let seller_id = cart.items.first().map(|line| line.seller_id);
    self.quote(&request, seller_id).await
  }

  #[instrument(name = "QuoteService::track", skip(self))]
  pub async fn track(&self, tracking_code: &str, seller_id: Option<Uuid>) -> AppResult<TrackingData> {
    if tracking_code.trim().is_empty() {
      return Err(AppError::Validation("Tracking code is required.".to_string()));
    }
    let token = self.access_token_for(seller_id).await?;
    self.carrier.track(tracking_code.trim(), &token).await
  }
}
