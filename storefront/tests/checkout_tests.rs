// tests/checkout_tests.rs
mod common;

use async_trait::async_trait;
use common::*;
use etapa::{ContextData, PipelineResult};
use rust_decimal::Decimal;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use uuid::Uuid;

use vitrine::config::AppConfig;
use vitrine::errors::AppError;
use vitrine::models::{
  Address, Cart, CarrierToken, Order, OrderStatus, OrderTransition, Product, Role, ShippingQuote, User,
};
use vitrine::pipelines::contexts::CheckoutCtxData;
use vitrine::store::{
  AddressStore, CarrierTokenStore, CartStore, MemoryStore, OrderStore, ProductStore, StoreError, StoreResult,
  UserStore,
};

async fn run_checkout_with(
  app: &TestApp,
  buyer_id: Option<Uuid>,
  cart: Cart,
  address_id: Option<Uuid>,
  selected: Option<ShippingQuote>,
) -> (Result<PipelineResult, AppError>, CheckoutCtxData) {
  let ctx_data = ContextData::new(CheckoutCtxData::new(app.state.clone(), buyer_id, cart, address_id, selected));
  let result = app.state.registry.run(ctx_data.clone()).await;
  (result, ctx_data.snapshot())
}

/// Checkout with the carrier offering one quote at `shipping_cents`, which the buyer selects.
async fn run_checkout(
  app: &TestApp,
  buyer_id: Option<Uuid>,
  cart: Cart,
  address_id: Option<Uuid>,
  shipping_cents: Option<i64>,
) -> (Result<PipelineResult, AppError>, CheckoutCtxData) {
  let selected = shipping_cents.map(|cents| offer_quote(app, cents));
  run_checkout_with(app, buyer_id, cart, address_id, selected).await
}

fn cart_with(product: &Product, quantity: i64) -> Cart {
  let mut cart = Cart::default();
  cart.add(product, quantity);
  cart
}

#[tokio::test]
async fn test_checkout_prices_items_and_shipping() {
  let app = build_app(test_config());
  let buyer = seed_user(&app.store, Role::Buyer).await;
  let address = seed_address(&app.store, buyer.id).await;
  let p1 = seed_product(&app.store, "p1", 10_000, 10, 0).await;

  let (result, ctx) = run_checkout(&app, Some(buyer.id), cart_with(&p1, 2), Some(address.id), Some(1_500)).await;
  assert_eq!(result.unwrap(), PipelineResult::Completed);

  assert_eq!(ctx.subtotal_cents, 20_000);
  assert_eq!(ctx.shipping_cents, 1_500);
  assert_eq!(ctx.total_cents, 21_500);

  let request = app.gateway.last_preference().expect("preference requested");
  assert_eq!(request.items.len(), 2);
  assert_eq!(request.items[0].title, "p1");
  assert_eq!(request.items[0].quantity, 2);
  assert_eq!(request.items[0].unit_price, Decimal::new(100, 0));
  assert_eq!(request.items[1].title, "Frete");
  assert_eq!(request.items[1].quantity, 1);
  assert_eq!(request.items[1].unit_price, Decimal::new(15, 0));
  assert_eq!(request.total(), Decimal::new(215, 0));
  assert_eq!(request.payer.identification.as_ref().map(|i| i.number.as_str()), Some("12345678909"));
  assert_eq!(request.back_urls.success, "http://localhost:3000/checkout/success");
  assert_eq!(request.auto_return.as_deref(), Some("approved"));

  let order_id = ctx.order_id.expect("order written");
  let order = app.store.get_order(order_id).await.unwrap().unwrap();
  assert_eq!(order.status, OrderStatus::PendingPayment);
  assert_eq!(order.total_cents, 21_500);
  assert_eq!(order.subtotal_cents + order.shipping_cents, order.total_cents);
  assert_eq!(order.payment_preference_id, "pref-1");
  assert_eq!(Some(order.external_reference.clone()), ctx.external_reference);
  assert_eq!(request.external_reference, order.external_reference);
  assert_eq!(order.shipping_address.postal_code, "01310100");
  assert!(!order.inventory_decremented);

  // Checkout never touches stock.
  assert_eq!(app.store.get_product("p1").await.unwrap().unwrap().stock, 10);
}

#[tokio::test]
async fn test_free_shipping_adds_no_freight_item() {
  let app = build_app(test_config());
  let buyer = seed_user(&app.store, Role::Buyer).await;
  let address = seed_address(&app.store, buyer.id).await;
  let p1 = seed_product(&app.store, "p1", 2_500, 10, 0).await;

  let (result, ctx) = run_checkout(&app, Some(buyer.id), cart_with(&p1, 1), Some(address.id), Some(0)).await;
  assert!(result.is_ok());
  assert_eq!(ctx.total_cents, 2_500);
  let request = app.gateway.last_preference().unwrap();
  assert_eq!(request.items.len(), 1);
  assert!(request.items.iter().all(|i| i.title != "Frete"));
}

#[tokio::test]
async fn test_shipping_price_comes_from_the_carrier() {
  let app = build_app(test_config());
  let buyer = seed_user(&app.store, Role::Buyer).await;
  let address = seed_address(&app.store, buyer.id).await;
  let p1 = seed_product(&app.store, "p1", 10_000, 10, 0).await;
  let offered = offer_quote(&app, 1_500);

  let forged = ShippingQuote {
    price_cents: 0,
    fallback: true,
    ..offered.clone()
  };
  let (result, ctx) = run_checkout_with(&app, Some(buyer.id), cart_with(&p1, 2), Some(address.id), Some(forged)).await;
  assert!(matches!(result, Err(AppError::Validation(_))));
  assert!(ctx.order_id.is_none());

  let (result, _) = run_checkout_with(
    &app,
    Some(buyer.id),
    cart_with(&p1, 2),
    Some(address.id),
    Some(ShippingQuote::free_fallback()),
  )
  .await;
  assert!(matches!(result, Err(AppError::Validation(_))));

  let requests = app.carrier.requests.lock().clone();
  assert_eq!(requests.len(), 2);
  assert_eq!(requests[0].0.destination_postal_code, "01310100");
  assert_eq!(app.gateway.preference_calls(), 0);
  assert!(app.store.list_orders_for_buyer(buyer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_free_fallback_is_accepted_only_when_carrier_fails() {
  let app = build_app(AppConfig {
    shipping_free_fallback: true,
    ..test_config()
  });
  let buyer = seed_user(&app.store, Role::Buyer).await;
  let address = seed_address(&app.store, buyer.id).await;
  let p1 = seed_product(&app.store, "p1", 10_000, 10, 0).await;
  offer_quote(&app, 1_500);

  let (healthy, _) = run_checkout_with(
    &app,
    Some(buyer.id),
    cart_with(&p1, 1),
    Some(address.id),
    Some(ShippingQuote::free_fallback()),
  )
  .await;
  assert!(matches!(healthy, Err(AppError::Validation(_))));

  app.carrier.fail.store(true, Ordering::SeqCst);
  let (result, ctx) = run_checkout_with(
    &app,
    Some(buyer.id),
    cart_with(&p1, 1),
    Some(address.id),
    Some(ShippingQuote::free_fallback()),
  )
  .await;
  assert_eq!(result.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.shipping_cents, 0);
  assert_eq!(ctx.total_cents, 10_000);
  let order = app.store.get_order(ctx.order_id.unwrap()).await.unwrap().unwrap();
  assert!(order.shipping_method.fallback);
}

#[tokio::test]
async fn test_carrier_outage_blocks_checkout_without_fallback() {
  let app = build_app(test_config());
  let buyer = seed_user(&app.store, Role::Buyer).await;
  let address = seed_address(&app.store, buyer.id).await;
  let p1 = seed_product(&app.store, "p1", 10_000, 10, 0).await;
  let offered = offer_quote(&app, 1_500);
  app.carrier.fail.store(true, Ordering::SeqCst);

  let (result, _) = run_checkout_with(&app, Some(buyer.id), cart_with(&p1, 1), Some(address.id), Some(offered)).await;
  let err = result.unwrap_err();
  assert!(matches!(err, AppError::Shipping(_)));
  assert!(err.is_retryable());
  assert_eq!(app.gateway.preference_calls(), 0);
}

#[tokio::test]
async fn test_empty_cart_is_rejected_before_gateway() {
  let app = build_app(test_config());
  let buyer = seed_user(&app.store, Role::Buyer).await;
  let address = seed_address(&app.store, buyer.id).await;

  let (result, ctx) = run_checkout(&app, Some(buyer.id), Cart::default(), Some(address.id), Some(1_500)).await;
  assert!(matches!(result, Err(AppError::Validation(_))));
  assert_eq!(app.gateway.preference_calls(), 0);
  assert!(ctx.order_id.is_none());
  assert!(app.store.list_orders_for_buyer(buyer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_inputs_are_validation_errors() {
  let app = build_app(test_config());
  let buyer = seed_user(&app.store, Role::Buyer).await;
  let address = seed_address(&app.store, buyer.id).await;
  let p1 = seed_product(&app.store, "p1", 1_000, 5, 0).await;

  let (no_buyer, _) = run_checkout(&app, None, cart_with(&p1, 1), Some(address.id), Some(100)).await;
  assert!(matches!(no_buyer, Err(AppError::Validation(_))));

  let (no_address, _) = run_checkout(&app, Some(buyer.id), cart_with(&p1, 1), None, Some(100)).await;
  assert!(matches!(no_address, Err(AppError::Validation(_))));

  let (no_quote, _) = run_checkout(&app, Some(buyer.id), cart_with(&p1, 1), Some(address.id), None).await;
  assert!(matches!(no_quote, Err(AppError::Validation(_))));

  let (negative, _) = run_checkout(&app, Some(buyer.id), cart_with(&p1, 1), Some(address.id), Some(-1)).await;
  assert!(matches!(negative, Err(AppError::Validation(_))));

  assert_eq!(app.gateway.preference_calls(), 0);
}

#[tokio::test]
async fn test_foreign_address_is_not_found() {
  let app = build_app(test_config());
  let buyer = seed_user(&app.store, Role::Buyer).await;
  let other = seed_user(&app.store, Role::Buyer).await;
  let foreign = seed_address(&app.store, other.id).await;
  let p1 = seed_product(&app.store, "p1", 1_000, 5, 0).await;

  let (result, _) = run_checkout(&app, Some(buyer.id), cart_with(&p1, 1), Some(foreign.id), Some(100)).await;
  assert!(matches!(result, Err(AppError::NotFound(_))));
  assert_eq!(app.gateway.preference_calls(), 0);
}

#[tokio::test]
async fn test_gateway_failure_writes_no_order() {
  let app = build_app(test_config());
  app.gateway.fail_preferences.store(true, Ordering::SeqCst);
  let buyer = seed_user(&app.store, Role::Buyer).await;
  let address = seed_address(&app.store, buyer.id).await;
  let p1 = seed_product(&app.store, "p1", 1_000, 5, 0).await;

  let (result, ctx) = run_checkout(&app, Some(buyer.id), cart_with(&p1, 1), Some(address.id), Some(100)).await;
  let err = result.unwrap_err();
  assert!(matches!(err, AppError::Gateway(_)));
  assert!(err.is_retryable());
  assert!(ctx.checkout_url.is_none());
  assert!(app.store.list_orders_for_buyer(buyer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_url_follows_sandbox_flag() {
  let sandbox = build_app(test_config());
  let buyer = seed_user(&sandbox.store, Role::Buyer).await;
  let address = seed_address(&sandbox.store, buyer.id).await;
  let p1 = seed_product(&sandbox.store, "p1", 1_000, 5, 0).await;
  let (_, ctx) = run_checkout(&sandbox, Some(buyer.id), cart_with(&p1, 1), Some(address.id), Some(100)).await;
  assert_eq!(ctx.checkout_url.as_deref(), Some("https://sandbox.pay.example/checkout/pref-1"));

  let production = build_app(AppConfig {
    payment_sandbox: false,
    ..test_config()
  });
  let buyer = seed_user(&production.store, Role::Buyer).await;
  let address = seed_address(&production.store, buyer.id).await;
  let p1 = seed_product(&production.store, "p1", 1_000, 5, 0).await;
  let (_, ctx) = run_checkout(&production, Some(buyer.id), cart_with(&p1, 1), Some(address.id), Some(100)).await;
  assert_eq!(ctx.checkout_url.as_deref(), Some("https://pay.example/checkout/pref-1"));
}

#[tokio::test]
async fn test_each_checkout_gets_a_fresh_reference() {
  let app = build_app(test_config());
  let buyer = seed_user(&app.store, Role::Buyer).await;
  let address = seed_address(&app.store, buyer.id).await;
  let p1 = seed_product(&app.store, "p1", 1_000, 5, 0).await;

  let (_, first) = run_checkout(&app, Some(buyer.id), cart_with(&p1, 1), Some(address.id), Some(100)).await;
  let (_, second) = run_checkout(&app, Some(buyer.id), cart_with(&p1, 1), Some(address.id), Some(100)).await;
  assert_ne!(first.external_reference, second.external_reference);
  assert_eq!(app.store.list_orders_for_buyer(buyer.id).await.unwrap().len(), 2);
}

/// Delegates to a `MemoryStore` but refuses to write orders.
struct OrderWriteFails(Arc<MemoryStore>);

#[async_trait]
impl ProductStore for OrderWriteFails {
  async fn list_active_products(&self) -> StoreResult<Vec<Product>> {
    self.0.list_active_products().await
  }
  async fn get_product(&self, product_id: &str) -> StoreResult<Option<Product>> {
    self.0.get_product(product_id).await
  }
  async fn upsert_product(&self, product: &Product) -> StoreResult<()> {
    self.0.upsert_product(product).await
  }
}

#[async_trait]
impl OrderStore for OrderWriteFails {
  async fn insert_order(&self, _order: &Order) -> StoreResult<()> {
    Err(StoreError::Conflict("orders table unavailable".to_string()))
  }
  async fn get_order(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
    self.0.get_order(order_id).await
  }
  async fn find_order_by_reference(&self, external_reference: &str) -> StoreResult<Option<Order>> {
    self.0.find_order_by_reference(external_reference).await
  }
  async fn list_orders_for_buyer(&self, buyer_id: Uuid) -> StoreResult<Vec<Order>> {
    self.0.list_orders_for_buyer(buyer_id).await
  }
  async fn apply_transition(&self, order_id: Uuid, transition: &OrderTransition) -> StoreResult<Order> {
    self.0.apply_transition(order_id, transition).await
  }
  async fn record_payment(&self, order_id: Uuid, payment_id: &str, payment_status: &str) -> StoreResult<Order> {
    self.0.record_payment(order_id, payment_id, payment_status).await
  }
  async fn claim_inventory_decrement(&self, order_id: Uuid) -> StoreResult<bool> {
    self.0.claim_inventory_decrement(order_id).await
  }
}

#[async_trait]
impl AddressStore for OrderWriteFails {
  async fn list_addresses(&self, owner_user_id: Uuid) -> StoreResult<Vec<Address>> {
    self.0.list_addresses(owner_user_id).await
  }
  async fn get_address(&self, address_id: Uuid) -> StoreResult<Option<Address>> {
    self.0.get_address(address_id).await
  }
  async fn insert_address(&self, address: &Address) -> StoreResult<Address> {
    self.0.insert_address(address).await
  }
  async fn update_address(&self, address: &Address) -> StoreResult<Address> {
    self.0.update_address(address).await
  }
  async fn delete_address(&self, owner_user_id: Uuid, address_id: Uuid) -> StoreResult<()> {
    self.0.delete_address(owner_user_id, address_id).await
  }
  async fn set_default_address(&self, owner_user_id: Uuid, address_id: Uuid) -> StoreResult<Address> {
    self.0.set_default_address(owner_user_id, address_id).await
  }
}

#[async_trait]
impl UserStore for OrderWriteFails {
  async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
    self.0.get_user(user_id).await
  }
  async fn upsert_user(&self, user: &User) -> StoreResult<()> {
    self.0.upsert_user(user).await
  }
}

#[async_trait]
impl CartStore for OrderWriteFails {
  async fn load_cart(&self, owner_key: &str) -> StoreResult<Option<Cart>> {
    self.0.load_cart(owner_key).await
  }
  async fn save_cart(&self, owner_key: &str, cart: &Cart) -> StoreResult<()> {
    self.0.save_cart(owner_key, cart).await
  }
  async fn delete_cart(&self, owner_key: &str) -> StoreResult<()> {
    self.0.delete_cart(owner_key).await
  }
}

#[async_trait]
impl CarrierTokenStore for OrderWriteFails {
  async fn carrier_token(&self, user_id: Uuid) -> StoreResult<Option<CarrierToken>> {
    self.0.carrier_token(user_id).await
  }
  async fn save_carrier_token(&self, token: &CarrierToken) -> StoreResult<()> {
    self.0.save_carrier_token(token).await
  }
}

#[tokio::test]
async fn test_order_write_failure_still_returns_checkout_url() {
  let memory = Arc::new(MemoryStore::new());
  let app = build_app_with_store(test_config(), Arc::new(OrderWriteFails(memory.clone())), memory);
  let buyer = seed_user(&app.store, Role::Buyer).await;
  let address = seed_address(&app.store, buyer.id).await;
  let p1 = seed_product(&app.store, "p1", 1_000, 5, 0).await;

  let (result, ctx) = run_checkout(&app, Some(buyer.id), cart_with(&p1, 1), Some(address.id), Some(100)).await;
  assert_eq!(result.unwrap(), PipelineResult::Completed);
  assert!(ctx.order_write_failed);
  assert!(ctx.order_id.is_none());
  assert!(ctx.checkout_url.is_some());
  assert_eq!(app.gateway.preference_calls(), 1);
  assert!(app.store.list_orders_for_buyer(buyer.id).await.unwrap().is_empty());
}
