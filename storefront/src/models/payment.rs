// vitrine/src/models/payment.rs

//! Payment gateway documents and the mapping from gateway status to order status.

use crate::models::order::OrderStatus;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use tracing::warn;

pub const SHIPPING_ITEM_ID: &str = "shipping";
pub const SHIPPING_ITEM_TITLE: &str = "Frete";
pub const CURRENCY: &str = "BRL";
pub const PIX_EXPIRY_MINUTES: i64 = 30;
pub const BOLETO_DUE_BUSINESS_DAYS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceItem {
  pub id: String,
  pub title: String,
  pub quantity: i64,
  #[serde(with = "rust_decimal::serde::float")]
  pub unit_price: Decimal,
  #[serde(default = "default_currency")]
  pub currency_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub picture_url: Option<String>,
}

impl PreferenceItem {
  pub fn from_cents(id: impl Into<String>, title: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
    Self {
      id: id.into(),
      title: title.into(),
      quantity,
      unit_price: Decimal::new(unit_price_cents, 2),
      currency_id: CURRENCY.to_string(),
      picture_url: None,
    }
  }
}

fn default_currency() -> String {
  CURRENCY.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identification {
  #[serde(rename = "type")]
  pub kind: String,
  pub number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payer {
  pub name: String,
  pub surname: String,
  pub email: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub identification: Option<Identification>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackUrls {
  pub success: String,
  pub failure: String,
  pub pending: String,
}

/// Body of a hosted-checkout preference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceRequest {
  pub items: Vec<PreferenceItem>,
  pub payer: Payer,
  pub back_urls: BackUrls,
  pub external_reference: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub auto_return: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub statement_descriptor: Option<String>,
}

impl PreferenceRequest {
  pub fn total(&self) -> Decimal {
    self.items.iter().map(|i| i.unit_price * Decimal::from(i.quantity)).sum()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPreference {
  pub id: String,
  pub init_point: String,
  #[serde(default)]
  pub sandbox_init_point: Option<String>,
}

/// Authoritative payment state as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayment {
  #[serde(deserialize_with = "string_or_number")]
  pub id: String,
  pub status: String,
  #[serde(default)]
  pub status_detail: Option<String>,
  #[serde(default)]
  pub payment_method_id: Option<String>,
  #[serde(default)]
  pub payment_type_id: Option<String>,
  #[serde(default, with = "rust_decimal::serde::float_option")]
  pub transaction_amount: Option<Decimal>,
  #[serde(default)]
  pub external_reference: Option<String>,
}

impl GatewayPayment {
  pub fn kind(&self) -> PaymentKind {
    PaymentKind::classify(self.payment_method_id.as_deref(), self.payment_type_id.as_deref())
  }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  match serde_json::Value::deserialize(deserializer)? {
    serde_json::Value::String(s) => Ok(s),
    serde_json::Value::Number(n) => Ok(n.to_string()),
    other => Err(de::Error::custom(format!("expected payment id, got {}", other))),
  }
}

/// Gateway payment statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
  Approved,
  Pending,
  InProcess,
  Authorized,
  InMediation,
  Rejected,
  Cancelled,
  Refunded,
  ChargedBack,
  Unknown(String),
}

impl GatewayStatus {
  pub fn parse(raw: &str) -> Self {
    match raw.trim().to_ascii_lowercase().as_str() {
      "approved" => Self::Approved,
      "pending" => Self::Pending,
      "in_process" => Self::InProcess,
      "authorized" => Self::Authorized,
      "in_mediation" => Self::InMediation,
      "rejected" => Self::Rejected,
      "cancelled" => Self::Cancelled,
      "refunded" => Self::Refunded,
      "charged_back" => Self::ChargedBack,
      _ => Self::Unknown(raw.to_string()),
    }
  }

  /// Order status the payment leads to. Total over every input.
  pub fn order_status(&self) -> OrderStatus {
    match self {
      Self::Approved => OrderStatus::Confirmed,
      Self::Pending | Self::InProcess | Self::Authorized | Self::InMediation => OrderStatus::PendingPayment,
      Self::Rejected | Self::Cancelled | Self::Refunded | Self::ChargedBack => OrderStatus::Cancelled,
      Self::Unknown(raw) => {
        warn!(gateway_status = %raw, "Unknown gateway payment status, treating as pending.");
        OrderStatus::PendingPayment
      }
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
  Pix,
  Boleto,
  Card,
  Other,
}

impl PaymentKind {
  pub fn classify(method_id: Option<&str>, type_id: Option<&str>) -> Self {
    match (method_id, type_id) {
      (Some("pix"), _) => Self::Pix,
      (_, Some("ticket")) => Self::Boleto,
      (Some(m), _) if m.starts_with("bol") => Self::Boleto,
      (_, Some("credit_card" | "debit_card" | "prepaid_card")) => Self::Card,
      _ => Self::Other,
    }
  }
}

/// What a buyer with a pending payment has to do next.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextSteps {
  pub method: PaymentKind,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub expires_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub due_date: Option<NaiveDate>,
}

impl NextSteps {
  pub fn for_pending(kind: PaymentKind, now: DateTime<Utc>) -> Self {
    match kind {
      PaymentKind::Pix => Self {
        method: kind,
        message: format!(
          "Pague o PIX em até {} minutos usando o QR Code ou o código copia-e-cola.",
          PIX_EXPIRY_MINUTES
        ),
        expires_at: Some(now + Duration::minutes(PIX_EXPIRY_MINUTES)),
        due_date: None,
      },
      PaymentKind::Boleto => Self {
        method: kind,
        message: format!(
          "Pague o boleto em até {} dias úteis. A compensação pode levar até 2 dias úteis.",
          BOLETO_DUE_BUSINESS_DAYS
        ),
        expires_at: None,
        due_date: Some(add_business_days(now.date_naive(), BOLETO_DUE_BUSINESS_DAYS)),
      },
      PaymentKind::Card | PaymentKind::Other => Self {
        method: kind,
        message: "Seu pagamento está em análise. Avisaremos assim que for aprovado.".to_string(),
        expires_at: None,
        due_date: None,
      },
    }
  }
}

/// Adds `days` weekdays to `start`. Holidays are not considered.
pub fn add_business_days(start: NaiveDate, days: u32) -> NaiveDate {
  let mut date = start;
  let mut remaining = days;
  while remaining > 0 {
    date += Duration::days(1);
    if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
      remaining -= 1;
    }
  }
  date
}
