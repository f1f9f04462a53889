// tests/context_management_tests.rs
mod common;

use common::*;
use etapa::{ContextData, Pipeline, PipelineControl};
use serial_test::serial;

#[test]
fn clones_share_the_same_data() {
  let ctx = ContextData::new(ParcelFlow::default());
  let other = ctx.clone();
  other.write().label = "BR-123".into();
  assert_eq!(ctx.read().label, "BR-123");
}

#[test]
fn update_returns_the_closure_result() {
  let ctx = ContextData::new(ParcelFlow {
    weight_grams: 300,
    ..Default::default()
  });
  let doubled = ctx.update(|p| {
    p.weight_grams *= 2;
    p.weight_grams
  });
  assert_eq!(doubled, 600);
  assert_eq!(ctx.snapshot().weight_grams, 600);
}

#[test]
fn map_read_narrows_the_guard() {
  let ctx = ContextData::new(ParcelFlow {
    label: "BR-9".into(),
    ..Default::default()
  });
  let label = ctx.map_read(|p| p.label.as_str());
  assert_eq!(&*label, "BR-9");
}

#[tokio::test]
#[serial]
async fn handlers_see_each_others_writes() {
  setup_tracing();
  let mut p = Pipeline::<ParcelFlow, TestError>::new(&[("weigh", false, None), ("label", false, None)]);
  p.on("weigh", |ctx: ContextData<ParcelFlow>| async move {
    ctx.write().weight_grams = 1_200;
    Ok::<_, TestError>(PipelineControl::Continue)
  });
  p.on("label", |ctx: ContextData<ParcelFlow>| async move {
    let weight = ctx.read().weight_grams;
    tokio::task::yield_now().await;
    ctx.write().label = format!("{}g", weight);
    Ok::<_, TestError>(PipelineControl::Continue)
  });
  let ctx = ContextData::new(ParcelFlow::default());

  p.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().label, "1200g");
}
