// vitrine/src/pipelines/mod.rs

pub mod cart_pipeline;
pub mod checkout_pipeline;
pub mod contexts;
pub mod reconciliation_pipeline;

use crate::errors::AppError;
use etapa::Registry;

/// Registers every workflow the application runs.
pub fn register_all(registry: &Registry<AppError>) {
  cart_pipeline::register_add_to_cart_pipeline(registry);
  checkout_pipeline::register_checkout_pipeline(registry);
  reconciliation_pipeline::register_reconciliation_pipeline(registry);
}
