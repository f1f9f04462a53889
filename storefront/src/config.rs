// vitrine/src/config.rs

use crate::errors::{AppError, Result};
use crate::models::product::Dimensions;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

pub const MEMORY_DATABASE_URL: &str = "memory";

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// Postgres URL, or `memory` for the in-process store.
  pub database_url: String,
  pub run_migrations: bool,
  pub app_base_url: String,
  /// Where the gateway sends buyers back to (`/checkout/success` and friends).
  pub storefront_base_url: String,

  pub mercado_pago_api_url: String,
  pub mercado_pago_access_token: String,
  /// Selects the sandbox init point for hosted checkout.
  pub payment_sandbox: bool,
  pub payment_statement_descriptor: Option<String>,

  pub melhor_envio_api_url: String,
  pub melhor_envio_token: String,
  pub shipping_user_agent: String,
  pub origin_postal_code: String,
  pub shipping_free_fallback: bool,
  pub default_package_dimensions: Dimensions,

  pub viacep_api_url: String,
  pub http_timeout_secs: u64,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: MEMORY_DATABASE_URL.to_string(),
      run_migrations: true,
      app_base_url: "http://127.0.0.1:8080".to_string(),
      storefront_base_url: "http://localhost:3000".to_string(),
      mercado_pago_api_url: "https://api.mercadopago.com".to_string(),
      mercado_pago_access_token: String::new(),
      payment_sandbox: true,
      payment_statement_descriptor: None,
      melhor_envio_api_url: "https://sandbox.melhorenvio.com.br".to_string(),
      melhor_envio_token: String::new(),
      shipping_user_agent: "Vitrine (contato@vitrine.example)".to_string(),
      origin_postal_code: "01310100".to_string(),
      shipping_free_fallback: false,
      default_package_dimensions: Dimensions {
        height_cm: 10.0,
        width_cm: 15.0,
        length_cm: 20.0,
      },
      viacep_api_url: "https://viacep.com.br".to_string(),
      http_timeout_secs: 10,
    }
  }
}

fn parse_var<T>(var_name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, raw, e)))
}

impl AppConfig {
  /// Reads the environment (and `.env` when present) on top of the local defaults.
  /// `DATABASE_URL` and `MERCADO_PAGO_ACCESS_TOKEN` are required.
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let defaults = Self::default();

    let server_host = get_env("SERVER_HOST").unwrap_or(defaults.server_host);
    let server_port = match get_env("SERVER_PORT") {
      Ok(raw) => parse_var("SERVER_PORT", &raw)?,
      Err(_) => defaults.server_port,
    };
    let database_url = get_env("DATABASE_URL")?;
    let run_migrations = match get_env("RUN_MIGRATIONS") {
      Ok(raw) => parse_var("RUN_MIGRATIONS", &raw)?,
      Err(_) => defaults.run_migrations,
    };
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));
    let storefront_base_url = get_env("STOREFRONT_BASE_URL").unwrap_or(defaults.storefront_base_url);

    let mercado_pago_api_url = get_env("MERCADO_PAGO_API_URL").unwrap_or(defaults.mercado_pago_api_url);
    let mercado_pago_access_token = get_env("MERCADO_PAGO_ACCESS_TOKEN")?;
    let payment_sandbox = match get_env("PAYMENT_SANDBOX") {
      Ok(raw) => parse_var("PAYMENT_SANDBOX", &raw)?,
      Err(_) => defaults.payment_sandbox,
    };
    let payment_statement_descriptor = get_env("PAYMENT_STATEMENT_DESCRIPTOR").ok().filter(|d| !d.trim().is_empty());

    let melhor_envio_api_url = get_env("MELHOR_ENVIO_API_URL").unwrap_or(defaults.melhor_envio_api_url);
    let melhor_envio_token = get_env("MELHOR_ENVIO_TOKEN").unwrap_or_default();
    let shipping_user_agent = get_env("SHIPPING_USER_AGENT").unwrap_or(defaults.shipping_user_agent);
    let origin_postal_code = match get_env("ORIGIN_POSTAL_CODE") {
      Ok(raw) => crate::models::address::normalize_postal_code(&raw)
        .map_err(|e| AppError::Config(format!("Invalid ORIGIN_POSTAL_CODE: {}", e)))?,
      Err(_) => defaults.origin_postal_code,
    };
    let shipping_free_fallback = match get_env("SHIPPING_FREE_FALLBACK") {
      Ok(raw) => parse_var("SHIPPING_FREE_FALLBACK", &raw)?,
      Err(_) => defaults.shipping_free_fallback,
    };
    let default_package_dimensions = match get_env("DEFAULT_PACKAGE_DIMENSIONS") {
      Ok(raw) => Dimensions::parse(&raw)
        .ok_or_else(|| AppError::Config(format!("Invalid DEFAULT_PACKAGE_DIMENSIONS '{}': expected HxWxL", raw)))?,
      Err(_) => defaults.default_package_dimensions,
    };

    let viacep_api_url = get_env("VIACEP_API_URL").unwrap_or(defaults.viacep_api_url);
    let http_timeout_secs = match get_env("HTTP_TIMEOUT_SECS") {
      Ok(raw) => parse_var("HTTP_TIMEOUT_SECS", &raw)?,
      Err(_) => defaults.http_timeout_secs,
    };

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      run_migrations,
      app_base_url,
      storefront_base_url,
      mercado_pago_api_url,
      mercado_pago_access_token,
      payment_sandbox,
      payment_statement_descriptor,
      melhor_envio_api_url,
      melhor_envio_token,
      shipping_user_agent,
      origin_postal_code,
      shipping_free_fallback,
      default_package_dimensions,
      viacep_api_url,
      http_timeout_secs,
    })
  }

  pub fn uses_memory_store(&self) -> bool {
    self.database_url == MEMORY_DATABASE_URL
  }

  /// Gateway redirect targets on the storefront.
  pub fn back_url(&self, outcome: &str) -> String {
    format!("{}/checkout/{}", self.storefront_base_url.trim_end_matches('/'), outcome)
  }
}
