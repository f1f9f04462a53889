// vitrine/src/models/address.rs

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Address {
  pub id: Uuid,
  pub owner_user_id: Uuid,
  pub label: String,
  pub street: String,
  pub number: String,
  pub complement: Option<String>,
  pub district: String,
  pub city: String,
  pub state: String,
  pub postal_code: String,
  pub is_default: bool,
}

/// Copy of an address frozen into an order. Later edits to the address do not reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressSnapshot {
  pub label: String,
  pub street: String,
  pub number: String,
  pub complement: Option<String>,
  pub district: String,
  pub city: String,
  pub state: String,
  pub postal_code: String,
}

impl From<&Address> for AddressSnapshot {
  fn from(a: &Address) -> Self {
    Self {
      label: a.label.clone(),
      street: a.street.clone(),
      number: a.number.clone(),
      complement: a.complement.clone(),
      district: a.district.clone(),
      city: a.city.clone(),
      state: a.state.clone(),
      postal_code: a.postal_code.clone(),
    }
  }
}

/// Body of address create and update requests.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
  pub label: String,
  pub street: String,
  pub number: String,
  #[serde(default)]
  pub complement: Option<String>,
  pub district: String,
  pub city: String,
  pub state: String,
  pub postal_code: String,
}

impl AddressInput {
  /// Trims fields, upper-cases the state and normalizes the postal code.
  pub fn normalized(self) -> Result<Self> {
    let required = [
      ("label", &self.label),
      ("street", &self.street),
      ("number", &self.number),
      ("district", &self.district),
      ("city", &self.city),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
      return Err(AppError::Validation(format!("Address field '{}' is required.", field)));
    }
    let state = self.state.trim().to_uppercase();
    if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
      return Err(AppError::Validation("State must be a two-letter UF code.".to_string()));
    }
    let postal_code = normalize_postal_code(&self.postal_code)?;

    Ok(Self {
      label: self.label.trim().to_string(),
      street: self.street.trim().to_string(),
      number: self.number.trim().to_string(),
      complement: self.complement.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
      district: self.district.trim().to_string(),
      city: self.city.trim().to_string(),
      state,
      postal_code,
    })
  }

  pub fn into_address(self, id: Uuid, owner_user_id: Uuid, is_default: bool) -> Address {
    Address {
      id,
      owner_user_id,
      label: self.label,
      street: self.street,
      number: self.number,
      complement: self.complement,
      district: self.district,
      city: self.city,
      state: self.state,
      postal_code: self.postal_code,
      is_default,
    }
  }
}

/// Strips `-`, `.` and spaces from a CEP and requires exactly eight digits.
pub fn normalize_postal_code(raw: &str) -> Result<String> {
  let digits: String = raw.chars().filter(|c| !matches!(c, '-' | '.' | ' ')).collect();
  if digits.len() != 8 || !digits.chars().all(|c| c.is_ascii_digit()) {
    return Err(AppError::Validation(format!("Invalid postal code '{}': expected 8 digits.", raw)));
  }
  Ok(digits)
}
