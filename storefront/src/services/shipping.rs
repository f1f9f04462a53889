// vitrine/src/services/shipping.rs

//! Shipping carrier aggregator (Melhor Envio).

use crate::errors::{AppError, Result as AppResult};
use crate::models::{QuoteRequest, ShippingQuote, TrackingData, TrackingEvent};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

#[async_trait]
pub trait ShippingCarrier: Send + Sync {
  /// Quotes every service the carrier offers for the parcel. Entries flagged with an error are dropped.
  async fn calculate(&self, request: &QuoteRequest, access_token: &str) -> AppResult<Vec<ShippingQuote>>;

  async fn track(&self, tracking_code: &str, access_token: &str) -> AppResult<TrackingData>;
}

#[derive(Debug, Serialize)]
struct PostalCodeRef<'a> {
  postal_code: &'a str,
}

#[derive(Debug, Serialize)]
struct Package {
  height: f64,
  width: f64,
  length: f64,
  weight: f64,
}

#[derive(Debug, Serialize)]
struct CalculateBody<'a> {
  from: PostalCodeRef<'a>,
  to: PostalCodeRef<'a>,
  package: Package,
}

#[derive(Debug, Deserialize)]
struct Company {
  #[serde(default)]
  name: String,
}

#[derive(Debug, Deserialize)]
struct DeliveryRange {
  min: Option<i64>,
  max: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CalculateEntry {
  id: serde_json::Value,
  #[serde(default)]
  name: String,
  #[serde(default)]
  price: Option<serde_json::Value>,
  #[serde(default)]
  delivery_time: Option<i64>,
  #[serde(default)]
  delivery_range: Option<DeliveryRange>,
  #[serde(default)]
  company: Option<Company>,
  #[serde(default)]
  error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackingEntry {
  #[serde(default)]
  status: Option<String>,
  #[serde(default)]
  created_at: Option<String>,
  #[serde(default)]
  paid_at: Option<String>,
  #[serde(default)]
  posted_at: Option<String>,
  #[serde(default)]
  delivered_at: Option<String>,
  #[serde(default)]
  canceled_at: Option<String>,
}

/// Reais as string or number, to centavos.
fn price_to_cents(raw: &serde_json::Value) -> Option<i64> {
  let reais = match raw {
    serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok()?,
    serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok()?,
    _ => return None,
  };
  (reais * Decimal::ONE_HUNDRED).round().to_i64()
}

fn delivery_text(entry: &CalculateEntry) -> String {
  match (&entry.delivery_range, entry.delivery_time) {
    (Some(DeliveryRange { min: Some(min), max: Some(max) }), _) if min != max => {
      format!("{} a {} dias úteis", min, max)
    }
    (_, Some(1)) => "1 dia útil".to_string(),
    (_, Some(days)) => format!("{} dias úteis", days),
    _ => "Prazo a confirmar".to_string(),
  }
}

impl CalculateEntry {
  fn into_quote(self) -> Option<ShippingQuote> {
    if let Some(err) = &self.error {
      debug!(service = %self.name, error = %err, "Carrier service unavailable for this parcel.");
      return None;
    }
    let price_cents = self.price.as_ref().and_then(price_to_cents)?;
    let id = match &self.id {
      serde_json::Value::String(s) => s.clone(),
      other => other.to_string(),
    };
    let delivery_estimate_text = delivery_text(&self);
    Some(ShippingQuote {
      id,
      carrier_name: self.company.map(|c| c.name).unwrap_or_default(),
      service_name: self.name,
      price_cents,
      delivery_estimate_text,
      fallback: false,
    })
  }
}

fn tracking_from_entry(entry: TrackingEntry) -> TrackingData {
  let milestones = [
    ("created", entry.created_at, "Etiqueta criada"),
    ("paid", entry.paid_at, "Etiqueta paga"),
    ("posted", entry.posted_at, "Objeto postado"),
    ("delivered", entry.delivered_at, "Objeto entregue"),
    ("canceled", entry.canceled_at, "Envio cancelado"),
  ];
  let events = milestones
    .into_iter()
    .filter_map(|(status, date, description)| {
      date.map(|date| TrackingEvent {
        status: status.to_string(),
        date,
        description: description.to_string(),
        location: None,
      })
    })
    .collect();
  TrackingData {
    status: entry.status.unwrap_or_else(|| "unknown".to_string()),
    estimated_delivery: None,
    events,
  }
}

#[derive(Clone)]
pub struct MelhorEnvioClient {
  http: reqwest::Client,
  base_url: String,
  user_agent: String,
}

impl MelhorEnvioClient {
  pub fn new(http: reqwest::Client, base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
    Self {
      http,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      user_agent: user_agent.into(),
    }
  }

  async fn send<B: Serialize + Sync>(&self, path: &str, body: &B, access_token: &str) -> AppResult<reqwest::Response> {
    self
      .http
      .post(format!("{}{}", self.base_url, path))
      .bearer_auth(access_token)
      .header(reqwest::header::USER_AGENT, &self.user_agent)
      .header(reqwest::header::ACCEPT, "application/json")
      .json(body)
      .send()
      .await
      .map_err(|e| AppError::Shipping(format!("Shipping provider unreachable: {}", e)))
  }

  async fn ensure_success(response: reqwest::Response, path: &str) -> AppResult<reqwest::Response> {
    if !response.status().is_success() {
      let status = response.status();
      let text = response.text().await.unwrap_or_default();
      warn!(%status, body = %text, path, "Shipping provider rejected request.");
      return Err(AppError::Shipping(format!(
        "Shipping provider answered HTTP {}.",
        status.as_u16()
      )));
    }
    Ok(response)
  }
}

#[async_trait]
impl ShippingCarrier for MelhorEnvioClient {
  #[instrument(name = "MelhorEnvioClient::calculate", skip(self, access_token), fields(to = %request.destination_postal_code, weight_kg = request.weight_kg))]
  async fn calculate(&self, request: &QuoteRequest, access_token: &str) -> AppResult<Vec<ShippingQuote>> {
    let body = CalculateBody {
      from: PostalCodeRef {
        postal_code: &request.origin_postal_code,
      },
      to: PostalCodeRef {
        postal_code: &request.destination_postal_code,
      },
      package: Package {
        height: request.dimensions.height_cm,
        width: request.dimensions.width_cm,
        length: request.dimensions.length_cm,
        weight: request.weight_kg,
      },
    };
    let path = "/api/v2/me/shipment/calculate";
    let response = Self::ensure_success(self.send(path, &body, access_token).await?, path).await?;
    let entries: Vec<CalculateEntry> = response
      .json()
      .await
      .map_err(|e| AppError::Shipping(format!("Unexpected quote response: {}", e)))?;

    let offered = entries.len();
    let quotes: Vec<ShippingQuote> = entries.into_iter().filter_map(CalculateEntry::into_quote).collect();
    info!(offered, usable = quotes.len(), "Shipping quotes received.");
    Ok(quotes)
  }

  #[instrument(name = "MelhorEnvioClient::track", skip(self, access_token))]
  async fn track(&self, tracking_code: &str, access_token: &str) -> AppResult<TrackingData> {
    let body = serde_json::json!({ "orders": [tracking_code] });
    let path = "/api/v2/me/shipment/tracking";
    let response = self.send(path, &body, access_token).await?;
    // Unknown codes come back as HTTP 404.
    if response.status() == reqwest::StatusCode::NOT_FOUND {
      return Err(AppError::NotFound(format!("No tracking data for {}.", tracking_code)));
    }
    let response = Self::ensure_success(response, path).await?;
    let mut entries: HashMap<String, TrackingEntry> = response
      .json()
      .await
      .map_err(|e| AppError::Shipping(format!("Unexpected tracking response: {}", e)))?;

    let entry = entries
      .remove(tracking_code)
      .ok_or_else(|| AppError::NotFound(format!("No tracking data for {}.", tracking_code)))?;
    Ok(tracking_from_entry(entry))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn prices_parse_from_strings_and_numbers() {
    assert_eq!(price_to_cents(&json!("23.50")), Some(2350));
    assert_eq!(price_to_cents(&json!(15.5)), Some(1550));
    assert_eq!(price_to_cents(&json!(null)), None);
  }

  #[test]
  fn errored_entries_are_dropped() {
    let entry: CalculateEntry = serde_json::from_value(json!({
      "id": 3, "name": ".Package", "error": "Transportadora não atende este trecho."
    }))
    .unwrap();
    assert!(entry.into_quote().is_none());

    let entry: CalculateEntry = serde_json::from_value(json!({
      "id": 1, "name": "PAC", "price": "18.90", "delivery_range": { "min": 5, "max": 7 },
      "company": { "name": "Correios" }
    }))
    .unwrap();
    let quote = entry.into_quote().unwrap();
    assert_eq!(quote.id, "1");
    assert_eq!(quote.price_cents, 1890);
    assert_eq!(quote.delivery_estimate_text, "5 a 7 dias úteis");
  }
}
