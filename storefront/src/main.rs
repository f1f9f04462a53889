// vitrine/src/main.rs

use anyhow::Context;
use actix_web::{web as actix_data, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use vitrine::config::AppConfig;
use vitrine::services::{MelhorEnvioClient, MercadoPagoClient, ViaCepClient};
use vitrine::state::AppState;
use vitrine::store::{MemoryStore, PgStore, Store};
use vitrine::web::configure_app_routes;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting vitrine server...");

  let app_config = AppConfig::from_env().context("Failed to load application configuration")?;

  let store: Arc<dyn Store> = if app_config.uses_memory_store() {
    tracing::warn!("DATABASE_URL=memory: using the in-memory store, nothing survives a restart.");
    Arc::new(MemoryStore::new())
  } else {
    let pool = PgPoolOptions::new()
      .max_connections(10)
      .connect(&app_config.database_url)
      .await
      .context("Failed to connect to the database")?;
    tracing::info!("Successfully connected to the database.");
    if app_config.run_migrations {
      sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
      tracing::info!("Database migrations applied.");
    }
    Arc::new(PgStore::new(pool))
  };

  let http = reqwest::Client::builder()
    .timeout(Duration::from_secs(app_config.http_timeout_secs))
    .build()
    .context("Failed to build the outbound HTTP client")?;

  let gateway = Arc::new(MercadoPagoClient::from_config(http.clone(), &app_config));
  let carrier = Arc::new(MelhorEnvioClient::new(
    http.clone(),
    &app_config.melhor_envio_api_url,
    &app_config.shipping_user_agent,
  ));
  let postal_codes = Arc::new(ViaCepClient::new(http, &app_config.viacep_api_url));

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  let app_state = AppState::new(app_config, store, gateway, carrier, postal_codes);
  tracing::info!(sandbox = app_state.config.payment_sandbox, "Pipelines registered.");

  tracing::info!("Binding server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await?;

  Ok(())
}
