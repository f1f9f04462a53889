// vitrine/src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Buyer,
  Seller,
  Admin,
}

/// Profile data owned by the auth provider, mirrored for payer blocks and role checks.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub cpf: Option<String>,
  pub role: Role,
}

impl User {
  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }

  pub fn can_fulfil(&self) -> bool {
    matches!(self.role, Role::Seller | Role::Admin)
  }
}
