// vitrine/src/store/postgres.rs

use super::{
  AddressStore, CarrierTokenStore, CartStore, OrderStore, ProductStore, StoreError, StoreResult, UserStore,
};
use crate::models::{Address, CarrierToken, Cart, CartLineItem, Order, OrderLineItem, OrderStatus, OrderTransition, Product, User};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, buyer_id, items, subtotal_cents, shipping_cents, total_cents, shipping_address, \
  shipping_method, payment_method, payment_preference_id, payment_id, status, payment_status, tracking_code, \
  external_reference, inventory_decremented, created_at, updated_at, paid_at, shipped_at, delivered_at";

const PRODUCT_COLUMNS: &str =
  "id, name, price_cents, stock, sales_count, weight_kg, dimensions, seller_id, status, image_url";

const ADDRESS_COLUMNS: &str =
  "id, owner_user_id, label, street, number, complement, district, city, state, postal_code, is_default";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }
}

fn order_not_found(order_id: Uuid) -> StoreError {
  StoreError::NotFound(format!("Order {} not found", order_id))
}

fn map_unique_violation(e: sqlx::Error, what: &str) -> StoreError {
  if let sqlx::Error::Database(db) = &e {
    if db.is_unique_violation() {
      return StoreError::Conflict(format!("{} already exists", what));
    }
  }
  StoreError::Database(e)
}

#[async_trait]
impl ProductStore for PgStore {
  async fn list_active_products(&self) -> StoreResult<Vec<Product>> {
    let sql = format!("SELECT {} FROM products WHERE status = 'active' ORDER BY name", PRODUCT_COLUMNS);
    Ok(sqlx::query_as::<_, Product>(&sql).fetch_all(&self.pool).await?)
  }

  async fn get_product(&self, product_id: &str) -> StoreResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
    Ok(
      sqlx::query_as::<_, Product>(&sql)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn upsert_product(&self, product: &Product) -> StoreResult<()> {
    sqlx::query(
      r#"
      INSERT INTO products (id, name, price_cents, stock, sales_count, weight_kg, dimensions, seller_id, status, image_url)
      VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
      ON CONFLICT (id) DO UPDATE SET
        name = EXCLUDED.name, price_cents = EXCLUDED.price_cents, stock = EXCLUDED.stock,
        sales_count = EXCLUDED.sales_count, weight_kg = EXCLUDED.weight_kg, dimensions = EXCLUDED.dimensions,
        seller_id = EXCLUDED.seller_id, status = EXCLUDED.status, image_url = EXCLUDED.image_url,
        updated_at = NOW()
      "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(product.price_cents)
    .bind(product.stock)
    .bind(product.sales_count)
    .bind(product.weight_kg)
    .bind(Json(&product.dimensions))
    .bind(product.seller_id)
    .bind(product.status)
    .bind(&product.image_url)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

#[async_trait]
impl OrderStore for PgStore {
  #[instrument(name = "PgStore::insert_order", skip(self, order), fields(order_id = %order.id))]
  async fn insert_order(&self, order: &Order) -> StoreResult<()> {
    sqlx::query(
      r#"
      INSERT INTO orders (id, buyer_id, items, subtotal_cents, shipping_cents, total_cents, shipping_address,
        shipping_method, payment_method, payment_preference_id, payment_id, status, payment_status, tracking_code,
        external_reference, inventory_decremented, created_at, updated_at, paid_at, shipped_at, delivered_at)
      VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
      "#,
    )
    .bind(order.id)
    .bind(order.buyer_id)
    .bind(Json(&order.items))
    .bind(order.subtotal_cents)
    .bind(order.shipping_cents)
    .bind(order.total_cents)
    .bind(Json(&order.shipping_address))
    .bind(Json(&order.shipping_method))
    .bind(&order.payment_method)
    .bind(&order.payment_preference_id)
    .bind(&order.payment_id)
    .bind(order.status)
    .bind(&order.payment_status)
    .bind(&order.tracking_code)
    .bind(&order.external_reference)
    .bind(order.inventory_decremented)
    .bind(order.created_at)
    .bind(order.updated_at)
    .bind(order.paid_at)
    .bind(order.shipped_at)
    .bind(order.delivered_at)
    .execute(&self.pool)
    .await
    .map_err(|e| map_unique_violation(e, "Order reference"))?;
    Ok(())
  }

  async fn get_order(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
    Ok(sqlx::query_as::<_, Order>(&sql).bind(order_id).fetch_optional(&self.pool).await?)
  }

  async fn find_order_by_reference(&self, external_reference: &str) -> StoreResult<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE external_reference = $1", ORDER_COLUMNS);
    Ok(
      sqlx::query_as::<_, Order>(&sql)
        .bind(external_reference)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn list_orders_for_buyer(&self, buyer_id: Uuid) -> StoreResult<Vec<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC", ORDER_COLUMNS);
    Ok(sqlx::query_as::<_, Order>(&sql).bind(buyer_id).fetch_all(&self.pool).await?)
  }

  #[instrument(name = "PgStore::apply_transition", skip(self, transition), fields(to = %transition.to))]
  async fn apply_transition(&self, order_id: Uuid, transition: &OrderTransition) -> StoreResult<Order> {
    let mut tx = self.pool.begin().await?;

    let current: Option<OrderStatus> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
      .bind(order_id)
      .fetch_optional(&mut *tx)
      .await?;
    let current = current.ok_or_else(|| order_not_found(order_id))?;
    if !current.can_transition_to(transition.to) {
      return Err(StoreError::InvalidTransition {
        from: current,
        to: transition.to,
      });
    }

    let sql = format!(
      r#"
      UPDATE orders SET
        status = $2,
        updated_at = $3,
        payment_id = COALESCE($4, payment_id),
        payment_status = COALESCE($5, payment_status),
        payment_method = COALESCE($6, payment_method),
        tracking_code = COALESCE($7, tracking_code),
        paid_at = CASE WHEN $2 = 'confirmed'::order_status THEN $3 ELSE paid_at END,
        shipped_at = CASE WHEN $2 = 'shipping'::order_status THEN $3 ELSE shipped_at END,
        delivered_at = CASE WHEN $2 = 'delivered'::order_status THEN $3 ELSE delivered_at END
      WHERE id = $1
      RETURNING {}
      "#,
      ORDER_COLUMNS
    );
    let order = sqlx::query_as::<_, Order>(&sql)
      .bind(order_id)
      .bind(transition.to)
      .bind(transition.at)
      .bind(&transition.payment_id)
      .bind(&transition.payment_status)
      .bind(&transition.payment_method)
      .bind(&transition.tracking_code)
      .fetch_one(&mut *tx)
      .await?;

    tx.commit().await?;
    Ok(order)
  }

  async fn record_payment(&self, order_id: Uuid, payment_id: &str, payment_status: &str) -> StoreResult<Order> {
    let sql = format!(
      "UPDATE orders SET payment_id = $2, payment_status = $3, updated_at = NOW() WHERE id = $1 RETURNING {}",
      ORDER_COLUMNS
    );
    sqlx::query_as::<_, Order>(&sql)
      .bind(order_id)
      .bind(payment_id)
      .bind(payment_status)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| order_not_found(order_id))
  }

  #[instrument(name = "PgStore::claim_inventory_decrement", skip(self))]
  async fn claim_inventory_decrement(&self, order_id: Uuid) -> StoreResult<bool> {
    let mut tx = self.pool.begin().await?;

    let claimed: Option<Json<Vec<OrderLineItem>>> = sqlx::query_scalar(
      "UPDATE orders SET inventory_decremented = TRUE WHERE id = $1 AND inventory_decremented = FALSE RETURNING items",
    )
    .bind(order_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(Json(items)) = claimed else {
      debug!("Inventory decrement already claimed or order missing.");
      tx.rollback().await?;
      return Ok(false);
    };

    for line in &items {
      sqlx::query(
        "UPDATE products SET stock = GREATEST(stock - $2, 0), sales_count = sales_count + $2, updated_at = NOW() \
         WHERE id = $1",
      )
      .bind(&line.product_id)
      .bind(line.quantity)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(true)
  }
}

#[async_trait]
impl AddressStore for PgStore {
  async fn list_addresses(&self, owner_user_id: Uuid) -> StoreResult<Vec<Address>> {
    let sql = format!(
      "SELECT {} FROM addresses WHERE owner_user_id = $1 ORDER BY is_default DESC, label",
      ADDRESS_COLUMNS
    );
    Ok(sqlx::query_as::<_, Address>(&sql).bind(owner_user_id).fetch_all(&self.pool).await?)
  }

  async fn get_address(&self, address_id: Uuid) -> StoreResult<Option<Address>> {
    let sql = format!("SELECT {} FROM addresses WHERE id = $1", ADDRESS_COLUMNS);
    Ok(sqlx::query_as::<_, Address>(&sql).bind(address_id).fetch_optional(&self.pool).await?)
  }

  async fn insert_address(&self, address: &Address) -> StoreResult<Address> {
    let mut tx = self.pool.begin().await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addresses WHERE owner_user_id = $1")
      .bind(address.owner_user_id)
      .fetch_one(&mut *tx)
      .await?;
    let is_default = existing == 0 || address.is_default;
    if is_default {
      sqlx::query("UPDATE addresses SET is_default = FALSE WHERE owner_user_id = $1")
        .bind(address.owner_user_id)
        .execute(&mut *tx)
        .await?;
    }

    let sql = format!(
      r#"
      INSERT INTO addresses (id, owner_user_id, label, street, number, complement, district, city, state, postal_code, is_default)
      VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
      RETURNING {}
      "#,
      ADDRESS_COLUMNS
    );
    let stored = sqlx::query_as::<_, Address>(&sql)
      .bind(address.id)
      .bind(address.owner_user_id)
      .bind(&address.label)
      .bind(&address.street)
      .bind(&address.number)
      .bind(&address.complement)
      .bind(&address.district)
      .bind(&address.city)
      .bind(&address.state)
      .bind(&address.postal_code)
      .bind(is_default)
      .fetch_one(&mut *tx)
      .await?;

    tx.commit().await?;
    Ok(stored)
  }

  async fn update_address(&self, address: &Address) -> StoreResult<Address> {
    let sql = format!(
      r#"
      UPDATE addresses SET label = $3, street = $4, number = $5, complement = $6, district = $7, city = $8,
        state = $9, postal_code = $10
      WHERE id = $1 AND owner_user_id = $2
      RETURNING {}
      "#,
      ADDRESS_COLUMNS
    );
    sqlx::query_as::<_, Address>(&sql)
      .bind(address.id)
      .bind(address.owner_user_id)
      .bind(&address.label)
      .bind(&address.street)
      .bind(&address.number)
      .bind(&address.complement)
      .bind(&address.district)
      .bind(&address.city)
      .bind(&address.state)
      .bind(&address.postal_code)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| StoreError::NotFound(format!("Address {} not found", address.id)))
  }

  async fn delete_address(&self, owner_user_id: Uuid, address_id: Uuid) -> StoreResult<()> {
    let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND owner_user_id = $2")
      .bind(address_id)
      .bind(owner_user_id)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound(format!("Address {} not found", address_id)));
    }
    Ok(())
  }

  async fn set_default_address(&self, owner_user_id: Uuid, address_id: Uuid) -> StoreResult<Address> {
    let mut tx = self.pool.begin().await?;

    // Clear first: `addresses_one_default` is checked row by row.
    sqlx::query("UPDATE addresses SET is_default = FALSE WHERE owner_user_id = $1 AND is_default AND id <> $2")
      .bind(owner_user_id)
      .bind(address_id)
      .execute(&mut *tx)
      .await?;
    let sql = format!(
      "UPDATE addresses SET is_default = TRUE WHERE owner_user_id = $1 AND id = $2 RETURNING {}",
      ADDRESS_COLUMNS
    );
    let chosen = sqlx::query_as::<_, Address>(&sql)
      .bind(owner_user_id)
      .bind(address_id)
      .fetch_optional(&mut *tx)
      .await?;
    let Some(chosen) = chosen else {
      tx.rollback().await?;
      return Err(StoreError::NotFound(format!("Address {} not found", address_id)));
    };

    tx.commit().await?;
    Ok(chosen)
  }
}

#[async_trait]
impl UserStore for PgStore {
  async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
    Ok(
      sqlx::query_as::<_, User>("SELECT id, email, first_name, last_name, cpf, role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn upsert_user(&self, user: &User) -> StoreResult<()> {
    sqlx::query(
      r#"
      INSERT INTO users (id, email, first_name, last_name, cpf, role)
      VALUES ($1, $2, $3, $4, $5, $6)
      ON CONFLICT (id) DO UPDATE SET
        email = EXCLUDED.email, first_name = EXCLUDED.first_name, last_name = EXCLUDED.last_name,
        cpf = EXCLUDED.cpf, role = EXCLUDED.role
      "#,
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.cpf)
    .bind(user.role)
    .execute(&self.pool)
    .await
    .map_err(|e| map_unique_violation(e, "User email"))?;
    Ok(())
  }
}

#[async_trait]
impl CartStore for PgStore {
  async fn load_cart(&self, owner_key: &str) -> StoreResult<Option<Cart>> {
    let items: Option<Json<Vec<CartLineItem>>> = sqlx::query_scalar("SELECT items FROM carts WHERE owner_key = $1")
      .bind(owner_key)
      .fetch_optional(&self.pool)
      .await?;
    Ok(items.map(|Json(items)| Cart { items }))
  }

  async fn save_cart(&self, owner_key: &str, cart: &Cart) -> StoreResult<()> {
    sqlx::query(
      r#"
      INSERT INTO carts (owner_key, items, updated_at) VALUES ($1, $2, NOW())
      ON CONFLICT (owner_key) DO UPDATE SET items = EXCLUDED.items, updated_at = NOW()
      "#,
    )
    .bind(owner_key)
    .bind(Json(&cart.items))
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn delete_cart(&self, owner_key: &str) -> StoreResult<()> {
    sqlx::query("DELETE FROM carts WHERE owner_key = $1")
      .bind(owner_key)
      .execute(&self.pool)
      .await?;
    Ok(())
  }
}

#[async_trait]
impl CarrierTokenStore for PgStore {
  async fn carrier_token(&self, user_id: Uuid) -> StoreResult<Option<CarrierToken>> {
    Ok(
      sqlx::query_as::<_, CarrierToken>(
        "SELECT user_id, access_token, refresh_token, expires_at FROM melhor_envio_tokens WHERE user_id = $1",
      )
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn save_carrier_token(&self, token: &CarrierToken) -> StoreResult<()> {
    sqlx::query(
      r#"
      INSERT INTO melhor_envio_tokens (user_id, access_token, refresh_token, expires_at) VALUES ($1, $2, $3, $4)
      ON CONFLICT (user_id) DO UPDATE SET
        access_token = EXCLUDED.access_token, refresh_token = EXCLUDED.refresh_token, expires_at = EXCLUDED.expires_at
      "#,
    )
    .bind(token.user_id)
    .bind(&token.access_token)
    .bind(&token.refresh_token)
    .bind(token.expires_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}
