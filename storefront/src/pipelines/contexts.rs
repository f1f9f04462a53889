// vitrine/src/pipelines/contexts.rs

//! Data carried by each workflow. Handlers receive these wrapped in `etapa::ContextData`.

use crate::models::{
  Address, Cart, CartOwner, GatewayPayment, NextSteps, Order, OrderStatus, PaymentPreference, PreferenceItem, Product,
  ShippingQuote, User,
};
use crate::state::AppState;
use etapa::ContextData;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone)]
pub struct AddToCartCtxData {
  pub app_state: AppState,
  pub owner: CartOwner,
  pub product_id: String,
  pub requested_quantity: i64,
  pub product: Option<Product>,
  /// Line quantity after the clamp.
  pub effective_quantity: i64,
  /// Stock kept the line below its previous quantity plus the requested one.
  pub clamped: bool,
  pub cart: Option<Cart>,
}

impl AddToCartCtxData {
  pub fn new(app_state: AppState, owner: CartOwner, product_id: String, requested_quantity: i64) -> Self {
    Self {
      app_state,
      owner,
      product_id,
      requested_quantity,
      product: None,
      effective_quantity: 0,
      clamped: false,
      cart: None,
    }
  }
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub buyer_id: Option<Uuid>,
  pub cart: Cart,
  pub address_id: Option<Uuid>,
  pub shipping_quote: Option<ShippingQuote>,

  pub buyer: Option<User>,
  pub address: Option<Address>,
  pub subtotal_cents: i64,
  pub shipping_cents: i64,
  pub total_cents: i64,
  pub preference_items: Vec<PreferenceItem>,
  pub external_reference: Option<String>,
  pub preference: Option<PaymentPreference>,
  pub order_id: Option<Uuid>,
  /// The preference exists at the gateway but no order row was written for it.
  pub order_write_failed: bool,
  pub checkout_url: Option<String>,
}

impl CheckoutCtxData {
  pub fn new(
    app_state: AppState,
    buyer_id: Option<Uuid>,
    cart: Cart,
    address_id: Option<Uuid>,
    shipping_quote: Option<ShippingQuote>,
  ) -> Self {
    Self {
      app_state,
      buyer_id,
      cart,
      address_id,
      shipping_quote,
      buyer: None,
      address: None,
      subtotal_cents: 0,
      shipping_cents: 0,
      total_cents: 0,
      preference_items: Vec::new(),
      external_reference: None,
      preference: None,
      order_id: None,
      order_write_failed: false,
      checkout_url: None,
    }
  }
}

/// Where the gateway status shown to the buyer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
  Gateway,
  Advisory,
  None,
}

/// Sub-context of the `apply_order_transition` scopes.
#[derive(Clone)]
pub struct TransitionCtxData {
  pub app_state: AppState,
  pub order: Order,
  pub payment: GatewayPayment,
  /// This run moved the order to `confirmed`.
  pub confirmed_now: bool,
  pub inventory_applied: bool,
  pub cart_cleared: bool,
  pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct ReconcileCtxData {
  pub app_state: AppState,
  /// Caller identity. Without one no order is looked up.
  pub buyer_id: Option<Uuid>,
  pub payment_id: Option<String>,
  /// Status from the redirect query. Shown, never acted on.
  pub advisory_status: Option<String>,
  pub query_reference: Option<String>,

  pub payment: Option<GatewayPayment>,
  pub order: Option<Order>,
  pub target_status: Option<OrderStatus>,
  pub transition: Option<ContextData<TransitionCtxData>>,
  pub inventory_applied: bool,
  pub cart_cleared: bool,
  pub warnings: Vec<String>,
  pub outcome: Option<ReconcileOutcome>,
}

impl ReconcileCtxData {
  pub fn new(
    app_state: AppState,
    buyer_id: Option<Uuid>,
    payment_id: Option<String>,
    advisory_status: Option<String>,
    query_reference: Option<String>,
  ) -> Self {
    Self {
      app_state,
      buyer_id,
      payment_id: payment_id.filter(|p| !p.trim().is_empty() && p != "null"),
      advisory_status: advisory_status.filter(|s| !s.trim().is_empty() && s != "null"),
      query_reference: query_reference.filter(|r| !r.trim().is_empty() && r != "null"),
      payment: None,
      order: None,
      target_status: None,
      transition: None,
      inventory_applied: false,
      cart_cleared: false,
      warnings: Vec::new(),
      outcome: None,
    }
  }
}

/// What the buyer sees after returning from the hosted checkout.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
  pub payment_id: Option<String>,
  pub gateway_status: Option<String>,
  pub status_source: StatusSource,
  pub order_id: Option<Uuid>,
  pub order_status: Option<OrderStatus>,
  pub external_reference: Option<String>,
  pub order_found: bool,
  pub inventory_applied: bool,
  pub cart_cleared: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub next_steps: Option<NextSteps>,
  pub warnings: Vec<String>,
}
