// vitrine/src/services/payment_gateway.rs

//! Hosted-checkout payment gateway (Mercado Pago).

use crate::config::AppConfig;
use crate::errors::{AppError, Result as AppResult};
use crate::models::{GatewayPayment, PaymentPreference, PreferenceRequest};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{info, instrument, warn};

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Creates a hosted-checkout preference and returns its id and init points.
  async fn create_preference(&self, request: &PreferenceRequest) -> AppResult<PaymentPreference>;

  /// Fetches the authoritative state of a payment.
  async fn get_payment(&self, payment_id: &str) -> AppResult<GatewayPayment>;
}

#[derive(Clone)]
pub struct MercadoPagoClient {
  http: reqwest::Client,
  base_url: String,
  access_token: String,
}

impl MercadoPagoClient {
  pub fn new(http: reqwest::Client, base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
    Self {
      http,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      access_token: access_token.into(),
    }
  }

  pub fn from_config(http: reqwest::Client, config: &AppConfig) -> Self {
    Self::new(http, &config.mercado_pago_api_url, &config.mercado_pago_access_token)
  }
}

async fn gateway_error(action: &str, response: reqwest::Response) -> AppError {
  let status = response.status();
  let body = response.text().await.unwrap_or_default();
  warn!(%status, body = %body, "Payment gateway rejected {}.", action);
  AppError::Gateway(format!("Payment gateway could not {} (HTTP {}).", action, status.as_u16()))
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
  #[instrument(name = "MercadoPagoClient::create_preference", skip(self, request), fields(external_reference = %request.external_reference, items = request.items.len()))]
  async fn create_preference(&self, request: &PreferenceRequest) -> AppResult<PaymentPreference> {
    let response = self
      .http
      .post(format!("{}/checkout/preferences", self.base_url))
      .bearer_auth(&self.access_token)
      .json(request)
      .send()
      .await
      .map_err(|e| AppError::Gateway(format!("Payment gateway unreachable: {}", e)))?;

    if !response.status().is_success() {
      return Err(gateway_error("create the checkout preference", response).await);
    }

    let preference: PaymentPreference = response
      .json()
      .await
      .map_err(|e| AppError::Gateway(format!("Unexpected preference response: {}", e)))?;
    info!(preference_id = %preference.id, "Checkout preference created.");
    Ok(preference)
  }

  #[instrument(name = "MercadoPagoClient::get_payment", skip(self))]
  async fn get_payment(&self, payment_id: &str) -> AppResult<GatewayPayment> {
    let response = self
      .http
      .get(format!("{}/v1/payments/{}", self.base_url, payment_id))
      .bearer_auth(&self.access_token)
      .send()
      .await
      .map_err(|e| AppError::Gateway(format!("Payment gateway unreachable: {}", e)))?;

    if response.status() == StatusCode::NOT_FOUND {
      return Err(AppError::NotFound(format!("Payment {} not found.", payment_id)));
    }
    if !response.status().is_success() {
      return Err(gateway_error("fetch the payment", response).await);
    }

    let payment: GatewayPayment = response
      .json()
      .await
      .map_err(|e| AppError::Gateway(format!("Unexpected payment response: {}", e)))?;
    info!(status = %payment.status, "Payment status fetched.");
    Ok(payment)
  }
}
