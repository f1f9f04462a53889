// vitrine/src/pipelines/reconciliation_pipeline.rs

//! Turns a buyer's return from the hosted checkout into an order transition.
//!
//! Only the status fetched from the gateway moves an order. The status in the
//! redirect query is reported back as advisory and otherwise ignored.

use crate::errors::AppError;
use crate::models::{CartOwner, ExternalReference, GatewayStatus, NextSteps, OrderStatus, OrderTransition};
use crate::pipelines::contexts::{ReconcileCtxData, ReconcileOutcome, StatusSource, TransitionCtxData};
use crate::services::OrderEvent;
use crate::store::StoreError;
use chrono::Utc;
use etapa::{ContextData, EtapaError, Pipeline, PipelineControl, Registry, SkipCondition};
use std::sync::Arc;
use tracing::{debug, info, warn};

fn transition_scope_extractor(
  ctx_data: ContextData<ReconcileCtxData>,
) -> Result<ContextData<TransitionCtxData>, EtapaError> {
  let transition = ctx_data.read().transition.clone();
  transition.ok_or_else(|| EtapaError::ExtractorFailure {
    step_name: "apply_order_transition".to_string(),
    source: anyhow::anyhow!("Transition context was not prepared by map_payment_status."),
  })
}

fn targets(ctx_data: &ContextData<ReconcileCtxData>, status: OrderStatus) -> bool {
  let guard = ctx_data.read();
  let matches = guard.transition.is_some() && guard.target_status == Some(status);
  matches
}

fn publish_transition(ctx: &TransitionCtxData, from: OrderStatus, to: OrderStatus) {
  ctx.app_state.order_feed.publish(OrderEvent {
    order_id: ctx.order.id,
    buyer_id: ctx.order.buyer_id,
    from: Some(from),
    to,
    at: Utc::now(),
  });
}

fn payment_transition(ctx: &TransitionCtxData, to: OrderStatus) -> OrderTransition {
  OrderTransition {
    payment_id: Some(ctx.payment.id.clone()),
    payment_status: Some(ctx.payment.status.clone()),
    payment_method: ctx.payment.payment_method_id.clone(),
    ..OrderTransition::to(to, Utc::now())
  }
}

/// Marks the order confirmed and claims the stock decrement once. The buyer's cart is
/// cleared only by the run that performed the confirmation.
fn confirm_scope() -> Pipeline<TransitionCtxData, AppError> {
  let confirmed_elsewhere: SkipCondition<TransitionCtxData> = Arc::new(|ctx_data: ContextData<TransitionCtxData>| {
    let skip = !ctx_data.read().confirmed_now;
    skip
  });

  let mut p = Pipeline::<TransitionCtxData, AppError>::new(&[
    ("mark_confirmed", false, None),
    ("apply_inventory_decrement", false, None),
    ("clear_buyer_cart", false, Some(confirmed_elsewhere)),
  ]);

  p.on("mark_confirmed", |ctx_data: ContextData<TransitionCtxData>| {
    Box::pin(async move {
      let snapshot = ctx_data.snapshot();
      let from = snapshot.order.status;
      if from.is_paid() {
        debug!(order_id = %snapshot.order.id, %from, "Order already paid, nothing to confirm.");
        return Ok(PipelineControl::Continue);
      }

      let transition = payment_transition(&snapshot, OrderStatus::Confirmed);
      match snapshot.app_state.store.apply_transition(snapshot.order.id, &transition).await {
        Ok(order) => {
          if from == OrderStatus::Cancelled {
            warn!(order_id = %order.id, "Cancelled order confirmed by a later approved payment.");
          }
          info!(order_id = %order.id, payment_id = %snapshot.payment.id, "Order confirmed.");
          publish_transition(&snapshot, from, OrderStatus::Confirmed);
          let mut guard = ctx_data.write();
          guard.order = order;
          guard.confirmed_now = true;
        }
        Err(StoreError::InvalidTransition { from: current, .. }) if current.is_paid() => {
          // Another reconciliation of the same payment got there first.
          debug!(order_id = %snapshot.order.id, "Order confirmed concurrently.");
          if let Some(order) = snapshot.app_state.store.get_order(snapshot.order.id).await? {
            ctx_data.write().order = order;
          }
        }
        Err(e) => return Err(AppError::from(e)),
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("apply_inventory_decrement", |ctx_data: ContextData<TransitionCtxData>| {
    Box::pin(async move {
      let (store, order_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.order.id)
      };
      let claimed = store.claim_inventory_decrement(order_id).await?;
      if claimed {
        info!(%order_id, "Inventory decremented for confirmed order.");
      } else {
        debug!(%order_id, "Inventory decrement already applied.");
      }
      ctx_data.write().inventory_applied = claimed;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("clear_buyer_cart", |ctx_data: ContextData<TransitionCtxData>| {
    Box::pin(async move {
      let (store, buyer_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.order.buyer_id)
      };
      let key = CartOwner::Buyer(buyer_id).storage_key();
      match store.delete_cart(&key).await {
        Ok(()) => ctx_data.write().cart_cleared = true,
        Err(e) => {
          warn!(%buyer_id, error = %e, "Order confirmed but the buyer's cart could not be cleared.");
          ctx_data
            .write()
            .warnings
            .push("Pedido confirmado, mas o carrinho não pôde ser esvaziado.".to_string());
        }
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p
}

/// Cancels a pending order. Paid orders ignore the verdict.
fn cancel_scope() -> Pipeline<TransitionCtxData, AppError> {
  let mut p = Pipeline::<TransitionCtxData, AppError>::new(&[("mark_cancelled", false, None)]);

  p.on("mark_cancelled", |ctx_data: ContextData<TransitionCtxData>| {
    Box::pin(async move {
      let snapshot = ctx_data.snapshot();
      let from = snapshot.order.status;
      let store = snapshot.app_state.store.clone();

      match from {
        OrderStatus::PendingPayment => {
          let transition = payment_transition(&snapshot, OrderStatus::Cancelled);
          let order = store.apply_transition(snapshot.order.id, &transition).await?;
          info!(order_id = %order.id, gateway_status = %snapshot.payment.status, "Order cancelled.");
          publish_transition(&snapshot, from, OrderStatus::Cancelled);
          ctx_data.write().order = order;
        }
        OrderStatus::Cancelled => {
          let order = store
            .record_payment(snapshot.order.id, &snapshot.payment.id, &snapshot.payment.status)
            .await?;
          ctx_data.write().order = order;
        }
        OrderStatus::Confirmed | OrderStatus::Shipping | OrderStatus::Delivered => {
          warn!(
            order_id = %snapshot.order.id,
            order_status = %from,
            gateway_status = %snapshot.payment.status,
            "Cancellation verdict for a paid order ignored."
          );
          ctx_data
            .write()
            .warnings
            .push(format!("Status '{}' ignorado: o pedido já está {}.", snapshot.payment.status, from));
        }
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p
}

/// Records the latest payment facts on a still-open order.
fn pending_scope() -> Pipeline<TransitionCtxData, AppError> {
  let mut p = Pipeline::<TransitionCtxData, AppError>::new(&[("record_payment_status", false, None)]);

  p.on("record_payment_status", |ctx_data: ContextData<TransitionCtxData>| {
    Box::pin(async move {
      let snapshot = ctx_data.snapshot();
      if snapshot.order.status.is_paid() {
        debug!(order_id = %snapshot.order.id, "Pending verdict for a paid order, keeping recorded payment.");
        return Ok(PipelineControl::Continue);
      }
      let order = snapshot
        .app_state
        .store
        .record_payment(snapshot.order.id, &snapshot.payment.id, &snapshot.payment.status)
        .await?;
      debug!(order_id = %order.id, payment_status = %snapshot.payment.status, "Payment still pending.");
      ctx_data.write().order = order;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p
}

pub fn register_reconciliation_pipeline(registry: &Registry<AppError>) {
  let no_payment_id: SkipCondition<ReconcileCtxData> = Arc::new(|ctx_data: ContextData<ReconcileCtxData>| {
    let absent = ctx_data.read().payment_id.is_none();
    absent
  });

  let mut p = Pipeline::<ReconcileCtxData, AppError>::new(&[
    ("fetch_payment_status", false, Some(no_payment_id)),
    ("locate_order", false, None),
    ("map_payment_status", false, None),
    ("apply_order_transition", false, None),
    ("build_outcome", false, None),
  ]);

  p.on("fetch_payment_status", |ctx_data: ContextData<ReconcileCtxData>| {
    Box::pin(async move {
      let (gateway, payment_id) = {
        let guard = ctx_data.read();
        (guard.app_state.gateway.clone(), guard.payment_id.clone())
      };
      let Some(payment_id) = payment_id else {
        return Ok(PipelineControl::Continue);
      };
      let payment = gateway.get_payment(&payment_id).await?;
      ctx_data.write().payment = Some(payment);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("locate_order", |ctx_data: ContextData<ReconcileCtxData>| {
    Box::pin(async move {
      let (store, buyer_id, echoed, queried) = {
        let guard = ctx_data.read();
        (
          guard.app_state.store.clone(),
          guard.buyer_id,
          guard.payment.as_ref().and_then(|p| p.external_reference.clone()),
          guard.query_reference.clone(),
        )
      };

      if let (Some(echoed), Some(queried)) = (&echoed, &queried) {
        if echoed != queried {
          warn!(%echoed, %queried, "Redirect reference differs from the gateway's, using the gateway's.");
        }
      }
      let Some(reference) = echoed.or(queried).filter(|r| !r.is_empty()) else {
        warn!("No external reference to locate the order by.");
        ctx_data.write().warnings.push("Pedido não localizado.".to_string());
        return Ok(PipelineControl::Continue);
      };

      let Some(buyer_id) = buyer_id else {
        info!(%reference, "Anonymous return; reporting gateway status only.");
        ctx_data
          .write()
          .warnings
          .push("Entre na sua conta para acompanhar o pedido.".to_string());
        return Ok(PipelineControl::Continue);
      };

      if let Ok(parsed) = reference.parse::<ExternalReference>() {
        if parsed.buyer_id != buyer_id {
          warn!(%reference, %buyer_id, "External reference belongs to another buyer.");
          ctx_data.write().warnings.push("Pedido não localizado.".to_string());
          return Ok(PipelineControl::Continue);
        }
      }

      let order = store
        .find_order_by_reference(&reference)
        .await?
        .filter(|o| o.buyer_id == buyer_id);
      match order {
        Some(order) => {
          debug!(order_id = %order.id, status = %order.status, "Order located.");
          ctx_data.write().order = Some(order);
        }
        None => {
          warn!(%reference, "No order for external reference; reporting gateway status only.");
          ctx_data.write().warnings.push("Pedido não localizado.".to_string());
        }
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("map_payment_status", |ctx_data: ContextData<ReconcileCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let Some(payment) = guard.payment.clone() else {
        debug!("No gateway status fetched; order left untouched.");
        return Ok(PipelineControl::Continue);
      };
      let target = GatewayStatus::parse(&payment.status).order_status();
      guard.target_status = Some(target);

      if let Some(order) = guard.order.clone() {
        let app_state = guard.app_state.clone();
        guard.transition = Some(ContextData::new(TransitionCtxData {
          app_state,
          order,
          payment,
          confirmed_now: false,
          inventory_applied: false,
          cart_cleared: false,
          warnings: Vec::new(),
        }));
      }
      drop(guard);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  let confirm = Arc::new(confirm_scope());
  let cancel = Arc::new(cancel_scope());
  let pending = Arc::new(pending_scope());
  p.conditional_scopes_for_step("apply_order_transition")
    .add_scope(confirm, transition_scope_extractor)
    .on_condition(|ctx_data| targets(&ctx_data, OrderStatus::Confirmed))
    .add_scope(cancel, transition_scope_extractor)
    .on_condition(|ctx_data| targets(&ctx_data, OrderStatus::Cancelled))
    .add_scope(pending, transition_scope_extractor)
    .on_condition(|ctx_data| targets(&ctx_data, OrderStatus::PendingPayment))
    .if_no_scope_matches(PipelineControl::Continue)
    .finalize_conditional_step(false);

  p.after("apply_order_transition", |ctx_data: ContextData<ReconcileCtxData>| {
    Box::pin(async move {
      let transition = ctx_data.read().transition.clone();
      if let Some(sub) = transition {
        let sub = sub.snapshot();
        let mut guard = ctx_data.write();
        guard.order = Some(sub.order);
        guard.inventory_applied = sub.inventory_applied;
        guard.cart_cleared = sub.cart_cleared;
        guard.warnings.extend(sub.warnings);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("build_outcome", |ctx_data: ContextData<ReconcileCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let (gateway_status, status_source) = match (&guard.payment, &guard.advisory_status) {
        (Some(payment), _) => (Some(payment.status.clone()), StatusSource::Gateway),
        (None, Some(advisory)) => (Some(advisory.clone()), StatusSource::Advisory),
        (None, None) => (None, StatusSource::None),
      };

      let pending = guard.target_status == Some(OrderStatus::PendingPayment);
      let next_steps = match (&guard.payment, pending) {
        (Some(payment), true) => Some(NextSteps::for_pending(payment.kind(), Utc::now())),
        _ => None,
      };

      let outcome = ReconcileOutcome {
        payment_id: guard.payment.as_ref().map(|p| p.id.clone()).or_else(|| guard.payment_id.clone()),
        gateway_status,
        status_source,
        order_id: guard.order.as_ref().map(|o| o.id),
        order_status: guard.order.as_ref().map(|o| o.status),
        external_reference: guard.order.as_ref().map(|o| o.external_reference.clone()),
        order_found: guard.order.is_some(),
        inventory_applied: guard.inventory_applied,
        cart_cleared: guard.cart_cleared,
        next_steps,
        warnings: guard.warnings.clone(),
      };
      info!(
        order_found = outcome.order_found,
        status_source = ?outcome.status_source,
        gateway_status = ?outcome.gateway_status,
        order_status = ?outcome.order_status,
        "Reconciliation finished."
      );
      guard.outcome = Some(outcome);
      drop(guard);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
  info!("Reconciliation pipeline registered.");
}
