// tests/registry_tests.rs
mod common;

use common::*;
use etapa::{ContextData, EtapaError, Pipeline, PipelineControl, PipelineResult, Registry};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct InvoiceCtx {
  number: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct RefundCtx {
  cents: i64,
}

#[tokio::test]
async fn runs_the_pipeline_registered_for_the_context_type() {
  setup_tracing();
  let registry = Registry::<TestError>::new();

  let mut invoices = Pipeline::<InvoiceCtx, TestError>::new(&[("issue", false, None)]);
  invoices.on("issue", |ctx: ContextData<InvoiceCtx>| {
    Box::pin(async move {
      ctx.write().number = "NF-0001".to_string();
      Ok::<PipelineControl, EtapaError>(PipelineControl::Continue)
    })
  });
  registry.register_pipeline(invoices);

  let mut refunds = Pipeline::<RefundCtx, TestError>::new(&[("refund", false, None)]);
  refunds.on("refund", |ctx: ContextData<RefundCtx>| {
    Box::pin(async move {
      ctx.write().cents = 4_990;
      Ok::<PipelineControl, EtapaError>(PipelineControl::Continue)
    })
  });
  registry.register_pipeline(refunds);

  let invoice = ContextData::new(InvoiceCtx::default());
  assert_eq!(registry.run(invoice.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(invoice.read().number, "NF-0001");

  let refund = ContextData::new(RefundCtx::default());
  assert_eq!(registry.run(refund.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(refund.read().cents, 4_990);
}

#[tokio::test]
async fn unregistered_context_type_is_a_configuration_error() {
  setup_tracing();
  let registry = Registry::<TestError>::new();

  let err = registry.run(ContextData::new(InvoiceCtx::default())).await.unwrap_err();

  match err {
    TestError::Engine(msg) => assert!(msg.contains("ConfigurationError"), "{msg}"),
    other => panic!("unexpected error: {other:?}"),
  }
  assert!(!registry.is_registered::<InvoiceCtx>());
}

#[tokio::test]
async fn registering_again_replaces_the_pipeline() {
  setup_tracing();
  let registry = Registry::<TestError>::new();

  let mut first = Pipeline::<InvoiceCtx, TestError>::new(&[("issue", false, None)]);
  first.on("issue", |ctx: ContextData<InvoiceCtx>| async move {
    ctx.write().number = "first".into();
    Ok::<_, TestError>(PipelineControl::Continue)
  });
  registry.register_pipeline(first);

  let mut second = Pipeline::<InvoiceCtx, TestError>::new(&[("issue", false, None)]);
  second.on("issue", |ctx: ContextData<InvoiceCtx>| async move {
    ctx.write().number = "second".into();
    Ok::<_, TestError>(PipelineControl::Continue)
  });
  registry.register_pipeline(second);

  let ctx = ContextData::new(InvoiceCtx::default());
  registry.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().number, "second");
  assert!(registry.is_registered::<InvoiceCtx>());
}

#[tokio::test]
async fn handler_errors_surface_through_the_registry() {
  setup_tracing();
  let registry = Registry::<TestError>::new();
  let mut p = Pipeline::<ParcelFlow, TestError>::new(&[("weigh", false, None)]);
  p.on("weigh", failing_handler("weigh", "scale offline"));
  registry.register_pipeline(p);

  let err = registry.run(ContextData::new(ParcelFlow::default())).await.unwrap_err();
  assert_eq!(err, TestError::Handler("scale offline".into()));
}
