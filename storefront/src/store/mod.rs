// vitrine/src/store/mod.rs

//! Persistence seams. Every document shape crossing these traits is a typed struct.

pub mod memory;
pub mod postgres;

use crate::models::{Address, CarrierToken, Cart, Order, OrderStatus, OrderTransition, Product, User};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("{0}")]
  NotFound(String),

  #[error("Order cannot move from {from} to {to}")]
  InvalidTransition { from: OrderStatus, to: OrderStatus },

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ProductStore: Send + Sync {
  async fn list_active_products(&self) -> StoreResult<Vec<Product>>;
  async fn get_product(&self, product_id: &str) -> StoreResult<Option<Product>>;
  async fn upsert_product(&self, product: &Product) -> StoreResult<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn insert_order(&self, order: &Order) -> StoreResult<()>;
  async fn get_order(&self, order_id: Uuid) -> StoreResult<Option<Order>>;
  async fn find_order_by_reference(&self, external_reference: &str) -> StoreResult<Option<Order>>;
  /// Newest first.
  async fn list_orders_for_buyer(&self, buyer_id: Uuid) -> StoreResult<Vec<Order>>;

  /// Applies `transition` if the order's current status allows it, atomically with the check.
  async fn apply_transition(&self, order_id: Uuid, transition: &OrderTransition) -> StoreResult<Order>;

  /// Records the latest payment facts without changing status.
  async fn record_payment(&self, order_id: Uuid, payment_id: &str, payment_status: &str) -> StoreResult<Order>;

  /// Claims the order's inventory decrement and applies it to every line's product.
  ///
  /// Returns `false` when the decrement was already claimed. Stock never drops below zero.
  async fn claim_inventory_decrement(&self, order_id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait AddressStore: Send + Sync {
  async fn list_addresses(&self, owner_user_id: Uuid) -> StoreResult<Vec<Address>>;
  async fn get_address(&self, address_id: Uuid) -> StoreResult<Option<Address>>;
  /// The owner's first address becomes the default whatever `is_default` says.
  async fn insert_address(&self, address: &Address) -> StoreResult<Address>;
  async fn update_address(&self, address: &Address) -> StoreResult<Address>;
  async fn delete_address(&self, owner_user_id: Uuid, address_id: Uuid) -> StoreResult<()>;
  /// Makes `address_id` the only default among the owner's addresses.
  async fn set_default_address(&self, owner_user_id: Uuid, address_id: Uuid) -> StoreResult<Address>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
  async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<User>>;
  async fn upsert_user(&self, user: &User) -> StoreResult<()>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
  async fn load_cart(&self, owner_key: &str) -> StoreResult<Option<Cart>>;
  async fn save_cart(&self, owner_key: &str, cart: &Cart) -> StoreResult<()>;
  async fn delete_cart(&self, owner_key: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait CarrierTokenStore: Send + Sync {
  async fn carrier_token(&self, user_id: Uuid) -> StoreResult<Option<CarrierToken>>;
  async fn save_carrier_token(&self, token: &CarrierToken) -> StoreResult<()>;
}

/// Everything the application needs from persistence.
pub trait Store: ProductStore + OrderStore + AddressStore + UserStore + CartStore + CarrierTokenStore {}

impl<T> Store for T where T: ProductStore + OrderStore + AddressStore + UserStore + CartStore + CarrierTokenStore {}
