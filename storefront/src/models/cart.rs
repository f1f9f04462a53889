// vitrine/src/models/cart.rs

//! The cart aggregate. Quantities clamp silently to the stock seen at mutation time.

use crate::models::product::Product;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
  pub product_id: String,
  pub name: String,
  pub unit_price_cents: i64,
  pub quantity: i64,
  pub image_url: Option<String>,
  pub weight_kg: f64,
  pub seller_id: Uuid,
  /// Stock ceiling recorded when the line was last touched by `add`.
  pub stock: i64,
}

impl CartLineItem {
  pub fn line_total_cents(&self) -> i64 {
    self.unit_price_cents * self.quantity
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
  pub items: Vec<CartLineItem>,
}

impl Cart {
  /// Adds `quantity` of `product` and returns the line's resulting quantity.
  ///
  /// The result never exceeds `product.stock`. A product without stock adds nothing.
  pub fn add(&mut self, product: &Product, quantity: i64) -> i64 {
    let stock = product.stock.max(0);
    if let Some(idx) = self.position(&product.id) {
      let line = &mut self.items[idx];
      let wanted = line.quantity.saturating_add(quantity.max(0));
      line.stock = stock;
      line.quantity = wanted.min(stock);
      if line.quantity < 1 {
        self.items.remove(idx);
        return 0;
      }
      return line.quantity;
    }

    let effective = quantity.min(stock);
    if effective < 1 {
      return 0;
    }
    self.items.push(CartLineItem {
      product_id: product.id.clone(),
      name: product.name.clone(),
      unit_price_cents: product.price_cents,
      quantity: effective,
      image_url: product.image_url.clone(),
      weight_kg: product.weight_kg,
      seller_id: product.seller_id,
      stock,
    });
    effective
  }

  pub fn remove(&mut self, product_id: &str) {
    self.items.retain(|l| l.product_id != product_id);
  }

  /// `quantity <= 0` removes the line. Otherwise clamps to the line's recorded stock.
  /// Returns the resulting quantity, `0` when the line is gone or was never there.
  pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> i64 {
    if quantity <= 0 {
      self.remove(product_id);
      return 0;
    }
    match self.position(product_id) {
      Some(idx) => {
        let line = &mut self.items[idx];
        line.quantity = quantity.min(line.stock);
        if line.quantity < 1 {
          self.items.remove(idx);
          return 0;
        }
        line.quantity
      }
      None => 0,
    }
  }

  pub fn clear(&mut self) {
    self.items.clear();
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn total_items(&self) -> i64 {
    self.items.iter().map(|l| l.quantity).sum()
  }

  pub fn total_price_cents(&self) -> i64 {
    self.items.iter().map(CartLineItem::line_total_cents).sum()
  }

  pub fn total_weight_kg(&self) -> f64 {
    self.items.iter().map(|l| l.weight_kg * l.quantity as f64).sum()
  }

  pub fn quantity_of(&self, product_id: &str) -> i64 {
    self.position(product_id).map_or(0, |idx| self.items[idx].quantity)
  }

  fn position(&self, product_id: &str) -> Option<usize> {
    self.items.iter().position(|l| l.product_id == product_id)
  }
}

/// Who a persisted cart belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CartOwner {
  Buyer(Uuid),
  Guest(String),
}

impl CartOwner {
  /// Key under which the cart snapshot is stored.
  pub fn storage_key(&self) -> String {
    self.to_string()
  }
}

impl fmt::Display for CartOwner {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CartOwner::Buyer(id) => write!(f, "buyer:{}", id),
      CartOwner::Guest(session) => write!(f, "guest:{}", session),
    }
  }
}
