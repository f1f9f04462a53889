// vitrine/src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::services::{InFlightCheckouts, OrderFeed, PaymentGateway, PostalCodeResolver, QuoteService, ShippingCarrier};
use crate::store::Store;
use etapa::Registry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub quotes: Arc<QuoteService>,
  pub postal_codes: Arc<dyn PostalCodeResolver>,
  pub registry: Arc<Registry<AppError>>,
  pub config: Arc<AppConfig>,
  pub order_feed: OrderFeed,
  pub checkouts: InFlightCheckouts,
}

impl AppState {
  /// Wires the collaborators and registers every workflow pipeline.
  pub fn new(
    config: AppConfig,
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    carrier: Arc<dyn ShippingCarrier>,
    postal_codes: Arc<dyn PostalCodeResolver>,
  ) -> Self {
    let config = Arc::new(config);
    let registry = Arc::new(Registry::<AppError>::new());
    pipelines::register_all(&registry);

    Self {
      quotes: Arc::new(QuoteService::new(carrier, store.clone(), config.clone())),
      store,
      gateway,
      postal_codes,
      registry,
      config,
      order_feed: OrderFeed::new(),
      checkouts: InFlightCheckouts::new(),
    }
  }
}
