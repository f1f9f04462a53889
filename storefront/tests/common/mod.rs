// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

use vitrine::config::AppConfig;
use vitrine::errors::{AppError, Result as AppResult};
use vitrine::models::{
  Address, AddressInput, CartOwner, Dimensions, GatewayPayment, PaymentPreference, PreferenceRequest, Product,
  ProductStatus, QuoteRequest, Role, ShippingQuote, TrackingData, User,
};
use vitrine::services::{CartSession, PaymentGateway, PostalAddress, PostalCodeResolver, ShippingCarrier};
use vitrine::state::AppState;
use vitrine::store::{AddressStore, MemoryStore, ProductStore, Store, UserStore};

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Records preference requests and serves canned payments.
#[derive(Default)]
pub struct FakeGateway {
  pub preference_requests: Mutex<Vec<PreferenceRequest>>,
  pub payments: Mutex<HashMap<String, GatewayPayment>>,
  pub fail_preferences: AtomicBool,
  pub payment_lookups: AtomicUsize,
}

impl FakeGateway {
  pub fn preference_calls(&self) -> usize {
    self.preference_requests.lock().len()
  }

  pub fn last_preference(&self) -> Option<PreferenceRequest> {
    self.preference_requests.lock().last().cloned()
  }

  pub fn set_payment(&self, payment: GatewayPayment) {
    self.payments.lock().insert(payment.id.clone(), payment);
  }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
  async fn create_preference(&self, request: &PreferenceRequest) -> AppResult<PaymentPreference> {
    if self.fail_preferences.load(Ordering::SeqCst) {
      return Err(AppError::Gateway("gateway down".to_string()));
    }
    let mut requests = self.preference_requests.lock();
    requests.push(request.clone());
    let id = format!("pref-{}", requests.len());
    Ok(PaymentPreference {
      init_point: format!("https://pay.example/checkout/{}", id),
      sandbox_init_point: Some(format!("https://sandbox.pay.example/checkout/{}", id)),
      id,
    })
  }

  async fn get_payment(&self, payment_id: &str) -> AppResult<GatewayPayment> {
    self.payment_lookups.fetch_add(1, Ordering::SeqCst);
    self
      .payments
      .lock()
      .get(payment_id)
      .cloned()
      .ok_or_else(|| AppError::NotFound(format!("Payment {} not found.", payment_id)))
  }
}

#[derive(Default)]
pub struct FakeCarrier {
  pub quotes: Mutex<Vec<ShippingQuote>>,
  pub fail: AtomicBool,
  pub requests: Mutex<Vec<(QuoteRequest, String)>>,
  pub tracking: Mutex<HashMap<String, TrackingData>>,
}

#[async_trait]
impl ShippingCarrier for FakeCarrier {
  async fn calculate(&self, request: &QuoteRequest, access_token: &str) -> AppResult<Vec<ShippingQuote>> {
    self.requests.lock().push((request.clone(), access_token.to_string()));
    if self.fail.load(Ordering::SeqCst) {
      return Err(AppError::Shipping("carrier down".to_string()));
    }
    Ok(self.quotes.lock().clone())
  }

  async fn track(&self, tracking_code: &str, _access_token: &str) -> AppResult<TrackingData> {
    self
      .tracking
      .lock()
      .get(tracking_code)
      .cloned()
      .ok_or_else(|| AppError::NotFound(format!("No tracking data for {}.", tracking_code)))
  }
}

#[derive(Default)]
pub struct FakePostalCodes {
  pub known: Mutex<HashMap<String, PostalAddress>>,
}

#[async_trait]
impl PostalCodeResolver for FakePostalCodes {
  async fn lookup(&self, cep: &str) -> AppResult<PostalAddress> {
    self
      .known
      .lock()
      .get(cep)
      .cloned()
      .ok_or_else(|| AppError::NotFound(format!("Postal code {} not found.", cep)))
  }
}

pub struct TestApp {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub gateway: Arc<FakeGateway>,
  pub carrier: Arc<FakeCarrier>,
  pub postal_codes: Arc<FakePostalCodes>,
}

pub fn test_config() -> AppConfig {
  AppConfig {
    melhor_envio_token: "platform-token".to_string(),
    mercado_pago_access_token: "test-token".to_string(),
    ..AppConfig::default()
  }
}

pub fn build_app(config: AppConfig) -> TestApp {
  let store = Arc::new(MemoryStore::new());
  build_app_with_store(config, store.clone(), store)
}

/// `store` is what the application uses; `memory` is the same data for assertions.
pub fn build_app_with_store(config: AppConfig, store: Arc<dyn Store>, memory: Arc<MemoryStore>) -> TestApp {
  setup_tracing();
  let gateway = Arc::new(FakeGateway::default());
  let carrier = Arc::new(FakeCarrier::default());
  let postal_codes = Arc::new(FakePostalCodes::default());
  let state = AppState::new(config, store, gateway.clone(), carrier.clone(), postal_codes.clone());
  TestApp {
    state,
    store: memory,
    gateway,
    carrier,
    postal_codes,
  }
}

pub fn product(id: &str, price_cents: i64, stock: i64, sales_count: i64) -> Product {
  Product {
    id: id.to_string(),
    name: id.to_string(),
    price_cents,
    stock,
    sales_count,
    weight_kg: 0.5,
    dimensions: Dimensions {
      height_cm: 5.0,
      width_cm: 10.0,
      length_cm: 15.0,
    },
    seller_id: Uuid::nil(),
    status: ProductStatus::Active,
    image_url: None,
  }
}

pub async fn seed_product(store: &MemoryStore, id: &str, price_cents: i64, stock: i64, sales_count: i64) -> Product {
  let p = product(id, price_cents, stock, sales_count);
  store.upsert_product(&p).await.unwrap();
  p
}

pub async fn seed_user(store: &MemoryStore, role: Role) -> User {
  let id = Uuid::new_v4();
  let user = User {
    id,
    email: format!("{}@example.com", id.simple()),
    first_name: "Maria".to_string(),
    last_name: "Silva".to_string(),
    cpf: Some("123.456.789-09".to_string()),
    role,
  };
  store.upsert_user(&user).await.unwrap();
  user
}

pub fn address_input() -> AddressInput {
  AddressInput {
    label: "Casa".to_string(),
    street: "Av. Paulista".to_string(),
    number: "1000".to_string(),
    complement: None,
    district: "Bela Vista".to_string(),
    city: "São Paulo".to_string(),
    state: "SP".to_string(),
    postal_code: "01310-100".to_string(),
  }
}

pub async fn seed_address(store: &MemoryStore, owner: Uuid) -> Address {
  let address = address_input()
    .normalized()
    .unwrap()
    .into_address(Uuid::new_v4(), owner, false);
  store.insert_address(&address).await.unwrap()
}

pub async fn fill_cart(app: &TestApp, buyer_id: Uuid, product: &Product, quantity: i64) {
  let mut session = CartSession::open(app.state.store.clone(), CartOwner::Buyer(buyer_id))
    .await
    .unwrap();
  session.add(product, quantity).await.unwrap();
}

pub fn quote(price_cents: i64) -> ShippingQuote {
  ShippingQuote {
    id: "1".to_string(),
    carrier_name: "Correios".to_string(),
    service_name: "PAC".to_string(),
    price_cents,
    delivery_estimate_text: "5 a 7 dias úteis".to_string(),
    fallback: false,
  }
}

/// Makes the carrier offer exactly this quote and returns it.
pub fn offer_quote(app: &TestApp, price_cents: i64) -> ShippingQuote {
  let offered = quote(price_cents);
  *app.carrier.quotes.lock() = vec![offered.clone()];
  offered
}

pub fn payment(id: &str, status: &str, external_reference: &str) -> GatewayPayment {
  GatewayPayment {
    id: id.to_string(),
    status: status.to_string(),
    status_detail: None,
    payment_method_id: Some("visa".to_string()),
    payment_type_id: Some("credit_card".to_string()),
    transaction_amount: None,
    external_reference: Some(external_reference.to_string()),
  }
}
