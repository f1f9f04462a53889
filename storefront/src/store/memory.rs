// vitrine/src/store/memory.rs

//! In-process store for tests and database-less local runs.

use super::{
  AddressStore, CarrierTokenStore, CartStore, OrderStore, ProductStore, StoreError, StoreResult, UserStore,
};
use crate::models::{Address, CarrierToken, Cart, Order, OrderTransition, Product, ProductStatus, User};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
  products: HashMap<String, Product>,
  orders: HashMap<Uuid, Order>,
  addresses: HashMap<Uuid, Address>,
  users: HashMap<Uuid, User>,
  carts: HashMap<String, Cart>,
  carrier_tokens: HashMap<Uuid, CarrierToken>,
}

/// All tables behind one lock, so multi-table writes are atomic.
#[derive(Default)]
pub struct MemoryStore {
  tables: RwLock<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl ProductStore for MemoryStore {
  async fn list_active_products(&self) -> StoreResult<Vec<Product>> {
    let tables = self.tables.read();
    let mut products: Vec<Product> = tables
      .products
      .values()
      .filter(|p| p.status == ProductStatus::Active)
      .cloned()
      .collect();
    products.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(products)
  }

  async fn get_product(&self, product_id: &str) -> StoreResult<Option<Product>> {
    Ok(self.tables.read().products.get(product_id).cloned())
  }

  async fn upsert_product(&self, product: &Product) -> StoreResult<()> {
    self.tables.write().products.insert(product.id.clone(), product.clone());
    Ok(())
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn insert_order(&self, order: &Order) -> StoreResult<()> {
    let mut tables = self.tables.write();
    if tables.orders.values().any(|o| o.external_reference == order.external_reference) {
      return Err(StoreError::Conflict(format!(
        "External reference {} already used",
        order.external_reference
      )));
    }
    tables.orders.insert(order.id, order.clone());
    Ok(())
  }

  async fn get_order(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
    Ok(self.tables.read().orders.get(&order_id).cloned())
  }

  async fn find_order_by_reference(&self, external_reference: &str) -> StoreResult<Option<Order>> {
    let tables = self.tables.read();
    Ok(tables.orders.values().find(|o| o.external_reference == external_reference).cloned())
  }

  async fn list_orders_for_buyer(&self, buyer_id: Uuid) -> StoreResult<Vec<Order>> {
    let tables = self.tables.read();
    let mut orders: Vec<Order> = tables.orders.values().filter(|o| o.buyer_id == buyer_id).cloned().collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }

  #[instrument(name = "MemoryStore::apply_transition", skip(self, transition), fields(to = %transition.to))]
  async fn apply_transition(&self, order_id: Uuid, transition: &OrderTransition) -> StoreResult<Order> {
    let mut tables = self.tables.write();
    let order = tables
      .orders
      .get_mut(&order_id)
      .ok_or_else(|| StoreError::NotFound(format!("Order {} not found", order_id)))?;
    if !order.status.can_transition_to(transition.to) {
      return Err(StoreError::InvalidTransition {
        from: order.status,
        to: transition.to,
      });
    }
    transition.apply(order);
    Ok(order.clone())
  }

  async fn record_payment(&self, order_id: Uuid, payment_id: &str, payment_status: &str) -> StoreResult<Order> {
    let mut tables = self.tables.write();
    let order = tables
      .orders
      .get_mut(&order_id)
      .ok_or_else(|| StoreError::NotFound(format!("Order {} not found", order_id)))?;
    order.payment_id = Some(payment_id.to_string());
    order.payment_status = Some(payment_status.to_string());
    order.updated_at = Utc::now();
    Ok(order.clone())
  }

  #[instrument(name = "MemoryStore::claim_inventory_decrement", skip(self))]
  async fn claim_inventory_decrement(&self, order_id: Uuid) -> StoreResult<bool> {
    let mut tables = self.tables.write();
    let Tables { orders, products, .. } = &mut *tables;
    let order = orders
      .get_mut(&order_id)
      .ok_or_else(|| StoreError::NotFound(format!("Order {} not found", order_id)))?;
    if order.inventory_decremented {
      debug!("Inventory decrement already claimed.");
      return Ok(false);
    }
    order.inventory_decremented = true;
    for line in &order.items {
      if let Some(product) = products.get_mut(&line.product_id) {
        product.stock = (product.stock - line.quantity).max(0);
        product.sales_count += line.quantity;
      }
    }
    Ok(true)
  }
}

#[async_trait]
impl AddressStore for MemoryStore {
  async fn list_addresses(&self, owner_user_id: Uuid) -> StoreResult<Vec<Address>> {
    let tables = self.tables.read();
    let mut addresses: Vec<Address> = tables
      .addresses
      .values()
      .filter(|a| a.owner_user_id == owner_user_id)
      .cloned()
      .collect();
    addresses.sort_by(|a, b| b.is_default.cmp(&a.is_default).then_with(|| a.label.cmp(&b.label)));
    Ok(addresses)
  }

  async fn get_address(&self, address_id: Uuid) -> StoreResult<Option<Address>> {
    Ok(self.tables.read().addresses.get(&address_id).cloned())
  }

  async fn insert_address(&self, address: &Address) -> StoreResult<Address> {
    let mut tables = self.tables.write();
    let is_first = !tables.addresses.values().any(|a| a.owner_user_id == address.owner_user_id);
    let mut stored = address.clone();
    stored.is_default = is_first || address.is_default;
    if stored.is_default {
      for other in tables.addresses.values_mut().filter(|a| a.owner_user_id == address.owner_user_id) {
        other.is_default = false;
      }
    }
    tables.addresses.insert(stored.id, stored.clone());
    Ok(stored)
  }

  async fn update_address(&self, address: &Address) -> StoreResult<Address> {
    let mut tables = self.tables.write();
    let existing = tables
      .addresses
      .get_mut(&address.id)
      .filter(|a| a.owner_user_id == address.owner_user_id)
      .ok_or_else(|| StoreError::NotFound(format!("Address {} not found", address.id)))?;
    let is_default = existing.is_default;
    *existing = Address {
      is_default,
      ..address.clone()
    };
    Ok(existing.clone())
  }

  async fn delete_address(&self, owner_user_id: Uuid, address_id: Uuid) -> StoreResult<()> {
    let mut tables = self.tables.write();
    match tables.addresses.get(&address_id) {
      Some(a) if a.owner_user_id == owner_user_id => {
        tables.addresses.remove(&address_id);
        Ok(())
      }
      _ => Err(StoreError::NotFound(format!("Address {} not found", address_id))),
    }
  }

  async fn set_default_address(&self, owner_user_id: Uuid, address_id: Uuid) -> StoreResult<Address> {
    let mut tables = self.tables.write();
    if !tables
      .addresses
      .get(&address_id)
      .is_some_and(|a| a.owner_user_id == owner_user_id)
    {
      return Err(StoreError::NotFound(format!("Address {} not found", address_id)));
    }
    let mut chosen = None;
    for address in tables.addresses.values_mut().filter(|a| a.owner_user_id == owner_user_id) {
      address.is_default = address.id == address_id;
      if address.is_default {
        chosen = Some(address.clone());
      }
    }
    chosen.ok_or_else(|| StoreError::NotFound(format!("Address {} not found", address_id)))
  }
}

#[async_trait]
impl UserStore for MemoryStore {
  async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
    Ok(self.tables.read().users.get(&user_id).cloned())
  }

  async fn upsert_user(&self, user: &User) -> StoreResult<()> {
    self.tables.write().users.insert(user.id, user.clone());
    Ok(())
  }
}

#[async_trait]
impl CartStore for MemoryStore {
  async fn load_cart(&self, owner_key: &str) -> StoreResult<Option<Cart>> {
    Ok(self.tables.read().carts.get(owner_key).cloned())
  }

  async fn save_cart(&self, owner_key: &str, cart: &Cart) -> StoreResult<()> {
    self.tables.write().carts.insert(owner_key.to_string(), cart.clone());
    Ok(())
  }

  async fn delete_cart(&self, owner_key: &str) -> StoreResult<()> {
    self.tables.write().carts.remove(owner_key);
    Ok(())
  }
}

#[async_trait]
impl CarrierTokenStore for MemoryStore {
  async fn carrier_token(&self, user_id: Uuid) -> StoreResult<Option<CarrierToken>> {
    Ok(self.tables.read().carrier_tokens.get(&user_id).cloned())
  }

  async fn save_carrier_token(&self, token: &CarrierToken) -> StoreResult<()> {
    self.tables.write().carrier_tokens.insert(token.user_id, token.clone());
    Ok(())
  }
}
