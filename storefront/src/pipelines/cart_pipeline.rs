// vitrine/src/pipelines/cart_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::AddToCartCtxData;
use crate::services::CartSession;
use etapa::{ContextData, Pipeline, PipelineControl, Registry};
use tracing::{info, warn};

pub fn register_add_to_cart_pipeline(registry: &Registry<AppError>) {
  let mut p = Pipeline::<AddToCartCtxData, AppError>::new(&[
    ("validate_cart_input", false, None),
    ("fetch_product_for_cart", false, None),
    ("add_to_cart_session", false, None),
  ]);

  p.on("validate_cart_input", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let (quantity, product_id) = {
        let guard = ctx_data.read();
        (guard.requested_quantity, guard.product_id.clone())
      };

      if product_id.trim().is_empty() {
        return Err(AppError::Validation("Product id is required.".to_string()));
      }
      if quantity <= 0 {
        warn!(quantity, "Add to Cart: non-positive quantity rejected.");
        return Err(AppError::Validation("Quantity must be a positive number.".to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  });

  p.on("fetch_product_for_cart", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let (product_id, store) = {
        let guard = ctx_data.read();
        (guard.product_id.clone(), guard.app_state.store.clone())
      };

      let product = store
        .get_product(&product_id)
        .await?
        .filter(|p| p.is_active())
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", product_id)))?;

      info!(%product_id, stock = product.stock, "Add to Cart: product loaded.");
      ctx_data.write().product = Some(product);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("add_to_cart_session", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let (store, owner, product, requested) = {
        let guard = ctx_data.read();
        (
          guard.app_state.store.clone(),
          guard.owner.clone(),
          guard.product.clone(),
          guard.requested_quantity,
        )
      };
      let product =
        product.ok_or_else(|| AppError::Internal("Product missing after fetch_product_for_cart.".to_string()))?;

      let mut session = CartSession::open(store, owner).await?;
      let before = session.cart().quantity_of(&product.id);
      let effective = session.add(&product, requested).await?;
      let clamped = effective < before + requested;
      if clamped {
        info!(
          product_id = %product.id,
          requested,
          effective,
          stock = product.stock,
          "Add to Cart: quantity clamped to stock."
        );
      }

      {
        let mut guard = ctx_data.write();
        guard.effective_quantity = effective;
        guard.clamped = clamped;
        guard.cart = Some(session.into_cart());
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
  info!("Add-to-cart pipeline registered.");
}
