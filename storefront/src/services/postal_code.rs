// vitrine/src/services/postal_code.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::address::normalize_postal_code;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Street-level data for a CEP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostalAddress {
  pub postal_code: String,
  pub street: String,
  pub district: String,
  pub city: String,
  pub state: String,
}

#[async_trait]
pub trait PostalCodeResolver: Send + Sync {
  /// `cep` must already be eight digits.
  async fn lookup(&self, cep: &str) -> AppResult<PostalAddress>;
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
  #[serde(default)]
  cep: String,
  #[serde(default)]
  logradouro: String,
  #[serde(default)]
  bairro: String,
  #[serde(default)]
  localidade: String,
  #[serde(default)]
  uf: String,
}

#[derive(Clone)]
pub struct ViaCepClient {
  http: reqwest::Client,
  base_url: String,
}

impl ViaCepClient {
  pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
    Self {
      http,
      base_url: base_url.into().trim_end_matches('/').to_string(),
    }
  }
}

#[async_trait]
impl PostalCodeResolver for ViaCepClient {
  #[instrument(name = "ViaCepClient::lookup", skip(self))]
  async fn lookup(&self, cep: &str) -> AppResult<PostalAddress> {
    let response = self
      .http
      .get(format!("{}/ws/{}/json/", self.base_url, cep))
      .send()
      .await
      .map_err(|e| AppError::PostalCode(format!("Postal code service unreachable: {}", e)))?;

    if response.status() == reqwest::StatusCode::BAD_REQUEST {
      return Err(AppError::Validation(format!("Invalid postal code '{}'.", cep)));
    }
    if !response.status().is_success() {
      return Err(AppError::PostalCode(format!(
        "Postal code service answered HTTP {}.",
        response.status().as_u16()
      )));
    }

    let body: serde_json::Value = response
      .json()
      .await
      .map_err(|e| AppError::PostalCode(format!("Unexpected postal code response: {}", e)))?;
    // `erro` arrives as `true` or `"true"` depending on the API version.
    let not_found = match body.get("erro") {
      Some(serde_json::Value::Bool(b)) => *b,
      Some(serde_json::Value::String(s)) => s == "true",
      _ => false,
    };
    if not_found {
      return Err(AppError::NotFound(format!("Postal code {} not found.", cep)));
    }

    let parsed: ViaCepResponse = serde_json::from_value(body)
      .map_err(|e| AppError::PostalCode(format!("Unexpected postal code response: {}", e)))?;
    Ok(PostalAddress {
      postal_code: normalize_postal_code(&parsed.cep).unwrap_or_else(|_| cep.to_string()),
      street: parsed.logradouro,
      district: parsed.bairro,
      city: parsed.localidade,
      state: parsed.uf,
    })
  }
}
