// vitrine/src/services/cart_session.rs

use crate::models::{Cart, CartOwner, Product};
use crate::store::{Store, StoreResult};
use std::sync::Arc;
use tracing::{debug, instrument};

/// One owner's cart, rehydrated from the store and written back after every mutation.
pub struct CartSession {
  store: Arc<dyn Store>,
  owner: CartOwner,
  cart: Cart,
}

impl CartSession {
  #[instrument(name = "CartSession::open", skip(store), fields(owner = %owner))]
  pub async fn open(store: Arc<dyn Store>, owner: CartOwner) -> StoreResult<Self> {
    let cart = store.load_cart(&owner.storage_key()).await?.unwrap_or_default();
    debug!(lines = cart.items.len(), "Cart rehydrated.");
    Ok(Self { store, owner, cart })
  }

  pub fn owner(&self) -> &CartOwner {
    &self.owner
  }

  pub fn cart(&self) -> &Cart {
    &self.cart
  }

  pub fn into_cart(self) -> Cart {
    self.cart
  }

  async fn persist(&self) -> StoreResult<()> {
    let key = self.owner.storage_key();
    if self.cart.is_empty() {
      self.store.delete_cart(&key).await
    } else {
      self.store.save_cart(&key, &self.cart).await
    }
  }

  /// Returns the line's resulting quantity after clamping.
  pub async fn add(&mut self, product: &Product, quantity: i64) -> StoreResult<i64> {
    let effective = self.cart.add(product, quantity);
    self.persist().await?;
    Ok(effective)
  }

  pub async fn remove(&mut self, product_id: &str) -> StoreResult<()> {
    self.cart.remove(product_id);
    self.persist().await
  }

  pub async fn set_quantity(&mut self, product_id: &str, quantity: i64) -> StoreResult<i64> {
    let effective = self.cart.set_quantity(product_id, quantity);
    self.persist().await?;
    Ok(effective)
  }

  pub async fn clear(&mut self) -> StoreResult<()> {
    self.cart.clear();
    self.persist().await
  }
}
