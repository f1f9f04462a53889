// vitrine/src/pipelines/checkout_pipeline.rs

use crate::errors::AppError;
use crate::models::payment::{BackUrls, Identification, Payer, SHIPPING_ITEM_ID, SHIPPING_ITEM_TITLE};
use crate::models::{
  AddressSnapshot, ExternalReference, Order, OrderLineItem, OrderStatus, PreferenceItem, PreferenceRequest,
};
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::OrderEvent;
use chrono::Utc;
use etapa::{ContextData, Pipeline, PipelineControl, Registry};
use tracing::{error, info, warn};
use uuid::Uuid;

fn missing(what: &str) -> AppError {
  AppError::Internal(format!("Checkout context is missing {}.", what))
}

pub fn register_checkout_pipeline(registry: &Registry<AppError>) {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(&[
    ("validate_checkout_request", false, None),
    ("load_buyer_and_address", false, None),
    ("verify_shipping_quote", false, None),
    ("price_order", false, None),
    ("generate_external_reference", false, None),
    ("create_payment_preference", false, None),
    ("persist_pending_order", false, None),
    ("resolve_checkout_url", false, None),
  ]);

  p.on("validate_checkout_request", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (cart_empty, buyer_id, address_id, quote_price) = {
        let guard = ctx_data.read();
        (
          guard.cart.is_empty(),
          guard.buyer_id,
          guard.address_id,
          guard.shipping_quote.as_ref().map(|q| q.price_cents),
        )
      };

      if cart_empty {
        return Err(AppError::Validation("Your cart is empty.".to_string()));
      }
      if buyer_id.is_none() {
        return Err(AppError::Validation("Sign in to complete your purchase.".to_string()));
      }
      if address_id.is_none() {
        return Err(AppError::Validation("Select a delivery address.".to_string()));
      }
      match quote_price {
        None => return Err(AppError::Validation("Select a shipping option.".to_string())),
        Some(price) if price < 0 => {
          return Err(AppError::Validation("Shipping price cannot be negative.".to_string()))
        }
        Some(_) => {}
      }
      Ok(PipelineControl::Continue)
    })
  });

  p.on("load_buyer_and_address", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (store, buyer_id, address_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.buyer_id, guard.address_id)
      };
      let buyer_id = buyer_id.ok_or_else(|| missing("the buyer"))?;
      let address_id = address_id.ok_or_else(|| missing("the address"))?;

      let buyer = store
        .get_user(buyer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Buyer {} not found.", buyer_id)))?;
      let address = store
        .get_address(address_id)
        .await?
        .filter(|a| a.owner_user_id == buyer_id)
        .ok_or_else(|| AppError::NotFound(format!("Address {} not found.", address_id)))?;

      {
        let mut guard = ctx_data.write();
        guard.buyer = Some(buyer);
        guard.address = Some(address);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // The buyer picks a quote, but its price always comes from a fresh server-side quote.
  p.on("verify_shipping_quote", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (quotes, cart, address, selected) = {
        let guard = ctx_data.read();
        (
          guard.app_state.quotes.clone(),
          guard.cart.clone(),
          guard.address.clone(),
          guard.shipping_quote.clone(),
        )
      };
      let address = address.ok_or_else(|| missing("the address"))?;
      let selected = selected.ok_or_else(|| missing("the shipping quote"))?;

      let offered = quotes.quote_for_cart(&cart, &address.postal_code).await?;
      let issued = offered
        .into_iter()
        .find(|q| q.id == selected.id && q.price_cents == selected.price_cents && q.fallback == selected.fallback)
        .ok_or_else(|| {
          warn!(
            quote_id = %selected.id,
            price_cents = selected.price_cents,
            fallback = selected.fallback,
            "Checkout: shipping quote does not match a current carrier quote."
          );
          AppError::Validation("The selected shipping option is no longer available. Please quote again.".to_string())
        })?;

      ctx_data.write().shipping_quote = Some(issued);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("price_order", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let shipping_cents = guard.shipping_quote.as_ref().map_or(0, |q| q.price_cents);
      let subtotal_cents = guard.cart.total_price_cents();

      let mut items: Vec<PreferenceItem> = guard
        .cart
        .items
        .iter()
        .map(|line| {
          let mut item = PreferenceItem::from_cents(&line.product_id, &line.name, line.quantity, line.unit_price_cents);
          item.picture_url = line.image_url.clone();
          item
        })
        .collect();
      if shipping_cents > 0 {
        items.push(PreferenceItem::from_cents(SHIPPING_ITEM_ID, SHIPPING_ITEM_TITLE, 1, shipping_cents));
      }

      guard.subtotal_cents = subtotal_cents;
      guard.shipping_cents = shipping_cents;
      guard.total_cents = subtotal_cents + shipping_cents;
      guard.preference_items = items;
      info!(subtotal_cents, shipping_cents, total_cents = guard.total_cents, "Checkout: order priced.");
      drop(guard);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("generate_external_reference", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let buyer_id = ctx_data.read().buyer_id;
      let buyer_id = buyer_id.ok_or_else(|| missing("the buyer"))?;
      let reference = ExternalReference::generate(buyer_id, Utc::now()).to_string();
      ctx_data.write().external_reference = Some(reference);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("create_payment_preference", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (gateway, config, buyer, items, reference) = {
        let guard = ctx_data.read();
        (
          guard.app_state.gateway.clone(),
          guard.app_state.config.clone(),
          guard.buyer.clone(),
          guard.preference_items.clone(),
          guard.external_reference.clone(),
        )
      };
      let buyer = buyer.ok_or_else(|| missing("the buyer profile"))?;
      let external_reference = reference.ok_or_else(|| missing("the external reference"))?;

      let request = PreferenceRequest {
        items,
        payer: Payer {
          name: buyer.first_name.clone(),
          surname: buyer.last_name.clone(),
          email: buyer.email.clone(),
          identification: buyer.cpf.as_ref().map(|cpf| Identification {
            kind: "CPF".to_string(),
            number: cpf.chars().filter(char::is_ascii_digit).collect(),
          }),
        },
        back_urls: BackUrls {
          success: config.back_url("success"),
          failure: config.back_url("failure"),
          pending: config.back_url("pending"),
        },
        external_reference: external_reference.clone(),
        auto_return: Some("approved".to_string()),
        statement_descriptor: config.payment_statement_descriptor.clone(),
      };

      let preference = gateway.create_preference(&request).await.map_err(|e| {
        warn!(%external_reference, error = %e, "Checkout: preference creation failed, no order written.");
        e
      })?;
      ctx_data.write().preference = Some(preference);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("persist_pending_order", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (store, feed, order) = {
        let guard = ctx_data.read();
        let buyer_id = guard.buyer_id.ok_or_else(|| missing("the buyer"))?;
        let address = guard.address.as_ref().ok_or_else(|| missing("the address"))?;
        let shipping_method = guard.shipping_quote.clone().ok_or_else(|| missing("the shipping quote"))?;
        let preference = guard.preference.as_ref().ok_or_else(|| missing("the preference"))?;
        let external_reference = guard.external_reference.clone().ok_or_else(|| missing("the external reference"))?;
        let now = Utc::now();
        let order = Order {
          id: Uuid::new_v4(),
          buyer_id,
          items: guard.cart.items.iter().map(OrderLineItem::from).collect(),
          subtotal_cents: guard.subtotal_cents,
          shipping_cents: guard.shipping_cents,
          total_cents: guard.total_cents,
          shipping_address: AddressSnapshot::from(address),
          shipping_method,
          payment_method: None,
          payment_preference_id: preference.id.clone(),
          payment_id: None,
          status: OrderStatus::PendingPayment,
          payment_status: None,
          tracking_code: None,
          external_reference,
          inventory_decremented: false,
          created_at: now,
          updated_at: now,
          paid_at: None,
          shipped_at: None,
          delivered_at: None,
        };
        (guard.app_state.store.clone(), guard.app_state.order_feed.clone(), order)
      };

      match store.insert_order(&order).await {
        Ok(()) => {
          info!(order_id = %order.id, external_reference = %order.external_reference, "Checkout: pending order written.");
          feed.publish(OrderEvent {
            order_id: order.id,
            buyer_id: order.buyer_id,
            from: None,
            to: OrderStatus::PendingPayment,
            at: order.created_at,
          });
          ctx_data.write().order_id = Some(order.id);
        }
        Err(e) => {
          // The preference already exists at the gateway. Nothing rolls it back.
          error!(
            preference_id = %order.payment_preference_id,
            external_reference = %order.external_reference,
            buyer_id = %order.buyer_id,
            total_cents = order.total_cents,
            error = %e,
            "Checkout: order write failed after preference creation; manual reconciliation needed."
          );
          ctx_data.write().order_write_failed = true;
        }
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("resolve_checkout_url", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (sandbox, preference) = {
        let guard = ctx_data.read();
        (guard.app_state.config.payment_sandbox, guard.preference.clone())
      };
      let preference = preference.ok_or_else(|| missing("the preference"))?;
      let url = if sandbox {
        preference.sandbox_init_point.clone().unwrap_or(preference.init_point)
      } else {
        preference.init_point
      };
      ctx_data.write().checkout_url = Some(url);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
  info!("Checkout pipeline registered.");
}
