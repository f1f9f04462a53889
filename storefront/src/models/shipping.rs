// vitrine/src/models/shipping.rs

use crate::models::product::Dimensions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const FALLBACK_QUOTE_NAME: &str = "Frete Grátis (estimativa indisponível)";

/// A carrier option for one parcel. Persisted only as an order's shipping snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingQuote {
  pub id: String,
  pub carrier_name: String,
  pub service_name: String,
  pub price_cents: i64,
  pub delivery_estimate_text: String,
  /// Set only on the labelled free-shipping fallback.
  #[serde(default)]
  pub fallback: bool,
}

impl ShippingQuote {
  pub fn free_fallback() -> Self {
    Self {
      id: "fallback-free".to_string(),
      carrier_name: "Loja".to_string(),
      service_name: FALLBACK_QUOTE_NAME.to_string(),
      price_cents: 0,
      delivery_estimate_text: "Prazo a confirmar".to_string(),
      fallback: true,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
  pub origin_postal_code: String,
  pub destination_postal_code: String,
  pub weight_kg: f64,
  pub dimensions: Dimensions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
  pub status: String,
  pub date: String,
  pub description: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingData {
  pub status: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub estimated_delivery: Option<String>,
  pub events: Vec<TrackingEvent>,
}

/// Per-seller carrier credentials. Opaque outside the quote service.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CarrierToken {
  pub user_id: Uuid,
  pub access_token: String,
  pub refresh_token: String,
  pub expires_at: DateTime<Utc>,
}

impl CarrierToken {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at <= now
  }
}
