// vitrine/src/models/order.rs

use crate::models::address::AddressSnapshot;
use crate::models::cart::CartLineItem;
use crate::models::shipping::ShippingQuote;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use uuid::Uuid;

/// Order lifecycle. `pending_payment` is the first persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  PendingPayment,
  Confirmed,
  Cancelled,
  Shipping,
  Delivered,
}

impl OrderStatus {
  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
      (self, next),
      (PendingPayment, Confirmed)
        | (PendingPayment, Cancelled)
        | (Cancelled, Confirmed)
        | (Confirmed, Shipping)
        | (Shipping, Delivered)
    )
  }

  /// Payment has been accepted at some point.
  pub fn is_paid(self) -> bool {
    matches!(self, OrderStatus::Confirmed | OrderStatus::Shipping | OrderStatus::Delivered)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::PendingPayment => "pending_payment",
      OrderStatus::Confirmed => "confirmed",
      OrderStatus::Cancelled => "cancelled",
      OrderStatus::Shipping => "shipping",
      OrderStatus::Delivered => "delivered",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
  pub product_id: String,
  pub name: String,
  pub unit_price_cents: i64,
  pub quantity: i64,
  pub seller_id: Uuid,
  pub image_url: Option<String>,
}

impl From<&CartLineItem> for OrderLineItem {
  fn from(line: &CartLineItem) -> Self {
    Self {
      product_id: line.product_id.clone(),
      name: line.name.clone(),
      unit_price_cents: line.unit_price_cents,
      quantity: line.quantity,
      seller_id: line.seller_id,
      image_url: line.image_url.clone(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub buyer_id: Uuid,
  #[sqlx(json)]
  pub items: Vec<OrderLineItem>,
  pub subtotal_cents: i64,
  pub shipping_cents: i64,
  pub total_cents: i64,
  #[sqlx(json)]
  pub shipping_address: AddressSnapshot,
  #[sqlx(json)]
  pub shipping_method: ShippingQuote,
  pub payment_method: Option<String>,
  pub payment_preference_id: String,
  pub payment_id: Option<String>,
  pub status: OrderStatus,
  pub payment_status: Option<String>,
  pub tracking_code: Option<String>,
  pub external_reference: String,
  /// Set once the stock decrement for this order has been applied.
  pub inventory_decremented: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub paid_at: Option<DateTime<Utc>>,
  pub shipped_at: Option<DateTime<Utc>>,
  pub delivered_at: Option<DateTime<Utc>>,
}

impl Order {
  pub fn involves_seller(&self, seller_id: Uuid) -> bool {
    self.items.iter().any(|i| i.seller_id == seller_id)
  }
}

/// A status change plus the payment or shipping facts that come with it.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTransition {
  pub to: OrderStatus,
  pub payment_id: Option<String>,
  pub payment_status: Option<String>,
  pub payment_method: Option<String>,
  pub tracking_code: Option<String>,
  pub at: DateTime<Utc>,
}

impl OrderTransition {
  pub fn to(status: OrderStatus, at: DateTime<Utc>) -> Self {
    Self {
      to: status,
      payment_id: None,
      payment_status: None,
      payment_method: None,
      tracking_code: None,
      at,
    }
  }

  /// Writes the transition into `order`. Callers check `can_transition_to` first.
  pub fn apply(&self, order: &mut Order) {
    order.status = self.to;
    order.updated_at = self.at;
    if self.payment_id.is_some() {
      order.payment_id = self.payment_id.clone();
    }
    if self.payment_status.is_some() {
      order.payment_status = self.payment_status.clone();
    }
    if self.payment_method.is_some() {
      order.payment_method = self.payment_method.clone();
    }
    if self.tracking_code.is_some() {
      order.tracking_code = self.tracking_code.clone();
    }
    match self.to {
      OrderStatus::Confirmed => order.paid_at = Some(self.at),
      OrderStatus::Shipping => order.shipped_at = Some(self.at),
      OrderStatus::Delivered => order.delivered_at = Some(self.at),
      OrderStatus::PendingPayment | OrderStatus::Cancelled => {}
    }
  }
}
