// vitrine/src/models/product.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

/// Parcel or product dimensions in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
  pub height_cm: f64,
  pub width_cm: f64,
  pub length_cm: f64,
}

impl Dimensions {
  /// Parses `HxWxL`, e.g. `10x15x20`.
  pub fn parse(raw: &str) -> Option<Self> {
    let parts: Vec<f64> = raw
      .split(['x', 'X'])
      .map(|p| p.trim().parse::<f64>())
      .collect::<Result<_, _>>()
      .ok()?;
    match parts.as_slice() {
      [h, w, l] if *h > 0.0 && *w > 0.0 && *l > 0.0 => Some(Self {
        height_cm: *h,
        width_cm: *w,
        length_cm: *l,
      }),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "product_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
  Active,
  Inactive,
  Draft,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
  pub id: String,
  pub name: String,
  pub price_cents: i64,
  /// Only reconciliation mutates `stock` and `sales_count`.
  pub stock: i64,
  pub sales_count: i64,
  pub weight_kg: f64,
  #[sqlx(json)]
  pub dimensions: Dimensions,
  pub seller_id: Uuid,
  pub status: ProductStatus,
  pub image_url: Option<String>,
}

impl Product {
  pub fn is_active(&self) -> bool {
    self.status == ProductStatus::Active
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_box_dimensions() {
    let d = Dimensions::parse("10x15X20").unwrap();
    assert_eq!((d.height_cm, d.width_cm, d.length_cm), (10.0, 15.0, 20.0));
    assert!(Dimensions::parse("10x15").is_none());
    assert!(Dimensions::parse("0x1x1").is_none());
    assert!(Dimensions::parse("axbxc").is_none());
  }
}
